//! The UAST parser boundary.
//!
//! The UAST parser itself is an external collaborator (out of scope here,
//! per the engine's PURPOSE & SCOPE): `UastParser` is the interface the
//! `UASTChanges` plumbing analyzer and `CommentSentiment` leaf consume. Any
//! concrete tree-sitter-backed (or other) implementation lives outside this
//! crate and is supplied by the embedder.

use serde::{Deserialize, Serialize};

/// A generic, language-agnostic AST node.
///
/// `kind` carries enough of the source grammar's vocabulary for consumers
/// to recognize comment nodes (e.g. `"comment"`, `"line_comment"`,
/// `"block_comment"`) without this crate knowing anything about any
/// specific grammar.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UastNode {
    pub kind: String,
    pub start_line: u32,
    pub end_line: u32,
    /// Present on leaf/token nodes (identifiers, literals, comment text).
    pub token: Option<String>,
    pub children: Vec<UastNode>,
}

impl UastNode {
    /// Depth-first walk, invoking `f` on every node including `self`.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a UastNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

/// Parses source bytes for one language into a `UastNode` tree.
///
/// Returns `None` when the language is unsupported or the source fails to
/// parse past recovery; this is a transient condition per §7, not an error.
pub trait UastParser: Send + Sync {
    fn parse(&self, language: &str, source: &[u8]) -> Option<UastNode>;

    /// Languages this parser can handle.
    fn supported_languages(&self) -> &[&str];
}

/// A parser that never produces a tree. Used when UAST-dependent analyzers
/// (`UASTChanges`, `CommentSentiment`) are configured but no concrete parser
/// was wired in by the embedder — those analyzers then simply see no
/// comments, which is a valid (if inert) configuration rather than a hard
/// failure.
#[derive(Default)]
pub struct NullUastParser;

impl UastParser for NullUastParser {
    fn parse(&self, _language: &str, _source: &[u8]) -> Option<UastNode> {
        None
    }

    fn supported_languages(&self) -> &[&str] {
        &[]
    }
}
