//! `LanguagesDetection` (§4.2): hash → language string for every blob
//! touched by the current commit. Fast path is the extension table;
//! slow path sniffs content for extension-less files.

pub mod extensions;

use std::any::Any;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    SerializeFormat,
};
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{CachedBlob, Change, Report};

use crate::flags;
use extensions::{detect_by_content, detect_by_extension};

pub struct LanguagesDetectionAnalyzer {
    current_output: FxHashMap<[u8; 20], String>,
}

impl LanguagesDetectionAnalyzer {
    pub fn new() -> Self {
        Self {
            current_output: FxHashMap::default(),
        }
    }
}

impl Analyzer for LanguagesDetectionAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "LanguagesDetection",
            mode: Mode::History,
            description: "Detects each touched blob's programming language",
        }
    }

    fn name(&self) -> &str {
        "LanguagesDetection"
    }

    fn flag(&self) -> &'static str {
        flags::LANGUAGES
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[flags::TREE_DIFF, flags::BLOB_CACHE]
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

        self.current_output.clear();
        for change in changes {
            for (name, hash) in [
                (change.from.name.as_str(), change.from.hash),
                (change.to.name.as_str(), change.to.hash),
            ] {
                let Some(hash) = hash else { continue };
                if self.current_output.contains_key(&hash) {
                    continue;
                }
                let lang = detect_by_extension(name)
                    .or_else(|| blobs.get(&hash).and_then(|b| detect_by_content(b.as_bytes())))
                    .unwrap_or("Unknown");
                self.current_output.insert(hash, lang.to_string());
            }
        }

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
            .map(|_| Box::new(LanguagesDetectionAnalyzer::new()) as Box<dyn Analyzer>)
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let _ = downcast_branch::<LanguagesDetectionAnalyzer>(branch);
        }
    }

    fn sequential_only(&self) -> bool {
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
