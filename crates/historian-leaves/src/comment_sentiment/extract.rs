//! Comment extraction and filtering from a UAST tree (§4.6).

use std::sync::OnceLock;

use historian_core::uast::UastNode;
use regex::Regex;

fn is_comment_kind(kind: &str) -> bool {
    let k = kind.to_lowercase();
    k.contains("comment")
}

fn license_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)copyright|licensed under|spdx-license-identifier|all rights reserved")
            .expect("static license regex is valid")
    })
}

/// Walks `root`, collects comment-kind leaf nodes, and merges nodes on
/// consecutive or overlapping line spans into single multi-line strings
/// (S4: two adjacent line comments merge into one).
pub fn merged_comments(root: &UastNode) -> Vec<String> {
    let mut nodes: Vec<(u32, u32, String)> = Vec::new();
    root.walk(&mut |node| {
        if is_comment_kind(&node.kind) {
            if let Some(token) = &node.token {
                nodes.push((node.start_line, node.end_line, token.clone()));
            }
        }
    });
    nodes.sort_by_key(|(start, _, _)| *start);

    let mut merged: Vec<(u32, u32, Vec<String>)> = Vec::new();
    for (start, end, text) in nodes {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 + 1 {
                last.1 = last.1.max(end);
                last.2.push(text);
                continue;
            }
        }
        merged.push((start, end, vec![text]));
    }

    merged.into_iter().map(|(_, _, parts)| parts.join("\n")).collect()
}

/// Applies the §4.6 filter chain. Returns `None` if the comment is
/// rejected at any stage.
pub fn filter_comment(raw: &str, min_comment_length: usize) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let first = trimmed.chars().next()?;
    if !first.is_alphanumeric() {
        return None;
    }

    let stripped = strip_calls_and_punctuation(trimmed);

    let floor = min_comment_length.max(10);
    if stripped.chars().count() < floor {
        return None;
    }

    let collapsed = collapse_whitespace(&stripped);

    let letters = collapsed.chars().filter(|c| c.is_alphabetic()).count();
    let total = collapsed.chars().filter(|c| !c.is_whitespace()).count().max(1);
    let density = letters as f64 / total as f64;
    if density < 0.6 {
        return None;
    }

    if license_regex().is_match(&collapsed) {
        return None;
    }

    Some(collapsed)
}

fn strip_calls_and_punctuation(text: &str) -> String {
    static CALL: OnceLock<Regex> = OnceLock::new();
    let call_re = CALL.get_or_init(|| Regex::new(r"\w+\(\)").expect("static regex is valid"));
    let without_calls = call_re.replace_all(text, "");

    const PERMITTED: &str = ".,!?'\"-:; \n\t";
    without_calls
        .chars()
        .filter(|c| c.is_alphanumeric() || PERMITTED.contains(*c))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(start: u32, end: u32, token: &str) -> UastNode {
        UastNode {
            kind: "line_comment".to_string(),
            start_line: start,
            end_line: end,
            token: Some(token.to_string()),
            children: Vec::new(),
        }
    }

    #[test]
    fn adjacent_comments_merge() {
        let root = UastNode {
            kind: "file".to_string(),
            start_line: 1,
            end_line: 2,
            token: None,
            children: vec![leaf(1, 1, "Line 1 is good"), leaf(2, 2, "Line 2 is nice")],
        };
        let merged = merged_comments(&root);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], "Line 1 is good\nLine 2 is nice");
    }

    #[test]
    fn short_comment_is_rejected() {
        assert_eq!(filter_comment("ok", 20), None);
    }

    #[test]
    fn license_header_is_rejected() {
        assert_eq!(
            filter_comment("Copyright 2024 Example Corp, all rights reserved", 20),
            None
        );
    }

    #[test]
    fn non_alphanumeric_start_is_rejected() {
        assert_eq!(filter_comment("--- this looks like a divider line ---", 10), None);
    }
}
