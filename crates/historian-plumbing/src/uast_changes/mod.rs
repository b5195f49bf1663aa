//! `UASTChanges` (§4.2): pairs the before/after UAST subtrees for each
//! modified file alongside its `Change` entry. The parser itself is an
//! external collaborator (`historian_core::uast::UastParser`); this
//! analyzer only orchestrates calling it and bookkeeping tree ownership.

use std::any::Any;
use std::sync::Arc;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    SerializeFormat,
};
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{CachedBlob, Change, ChangeAction, UastChangePair};
use historian_core::types::Report;
use historian_core::uast::UastParser;

use crate::flags;

pub struct UastChangesAnalyzer {
    parser: Arc<dyn UastParser>,
    current_output: Vec<UastChangePair>,
}

impl UastChangesAnalyzer {
    pub fn new(parser: Arc<dyn UastParser>) -> Self {
        Self {
            parser,
            current_output: Vec::new(),
        }
    }

    fn parse(
        &self,
        blobs: &FxHashMap<[u8; 20], CachedBlob>,
        languages: Option<&FxHashMap<[u8; 20], String>>,
        hash: Option<[u8; 20]>,
    ) -> Option<historian_core::uast::UastNode> {
        let hash = hash?;
        let blob = blobs.get(&hash)?;
        if blob.is_binary() {
            return None;
        }
        let language = languages.and_then(|m| m.get(&hash))?;
        self.parser.parse(language, blob.as_bytes())
    }
}

impl Analyzer for UastChangesAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "UASTChanges",
            mode: Mode::History,
            description: "Before/after UAST subtree pairs for each modified file",
        }
    }

    fn name(&self) -> &str {
        "UASTChanges"
    }

    fn flag(&self) -> &'static str {
        flags::UAST_CHANGES
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[
            flags::TREE_DIFF,
            flags::BLOB_CACHE,
            flags::FILE_DIFF,
            flags::LANGUAGES,
        ]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        Vec::new()
    }

    fn configure(&mut self, _facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.current_output.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let changes = ctx
            .dep::<Vec<Change>>(flags::TREE_DIFF)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing TreeDiff dependency"))?;
        let blobs = ctx
            .dep::<FxHashMap<[u8; 20], CachedBlob>>(flags::BLOB_CACHE)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing BlobCache dependency"))?;
        let languages = ctx.dep::<FxHashMap<[u8; 20], String>>(flags::LANGUAGES);

        self.current_output = changes
            .iter()
            .filter(|c| c.action == ChangeAction::Modify)
            .map(|change| {
                let before = self.parse(blobs, languages, change.from.hash);
                let after = self.parse(blobs, languages, change.to.hash);
                UastChangePair {
                    change: change.clone(),
                    before,
                    after,
                }
            })
            .collect();

        Ok(())
    }

    fn finalize(&mut self) -> Report {
        Report::new()
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        Some(Box::new(self.current_output.clone()))
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(UastChangesAnalyzer {
                    parser: Arc::clone(&self.parser),
                    current_output: Vec::new(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let _ = downcast_branch::<UastChangesAnalyzer>(branch);
        }
    }

    fn sequential_only(&self) -> bool {
        true
    }

    fn cpu_heavy(&self) -> bool {
        true
    }

    fn serialize(
        &self,
        _report: &Report,
        _format: SerializeFormat,
        _writer: &mut dyn std::io::Write,
    ) -> Result<(), AnalyzerError> {
        Ok(())
    }
}
