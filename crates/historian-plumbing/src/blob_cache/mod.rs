//! `BlobCache` (§4.2): content-addressed blob cache covering every
//! From/To hash referenced by the current commit's `TreeDiff` output.
//! Maintains a two-generation cache so deletes can be satisfied without a
//! redundant object-store read.

use std::any::Any;
use std::sync::Arc;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::BlobCacheConfig;
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{CachedBlob, Change, ChangeAction, Report};
use historian_core::vcs::ObjectStore;

use crate::flags;

pub struct BlobCacheAnalyzer {
    config: BlobCacheConfig,
    store: Arc<dyn ObjectStore>,
    previous_cache: FxHashMap<[u8; 20], CachedBlob>,
    cache: FxHashMap<[u8; 20], CachedBlob>,
}

impl BlobCacheAnalyzer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: BlobCacheConfig::default(),
            store,
            previous_cache: FxHashMap::default(),
            cache: FxHashMap::default(),
        }
    }

    fn load(&mut self, hash: [u8; 20]) -> CachedBlob {
        if let Some(blob) = self.cache.get(&hash) {
            return blob.clone();
        }
        if let Some(blob) = self.previous_cache.get(&hash) {
            return blob.clone();
        }
        match self.store.read_blob(hash) {
            Some(bytes) => {
                if self.store.is_binary(hash).unwrap_or(false) {
                    CachedBlob::binary(hash)
                } else {
                    CachedBlob::text(hash, bytes)
                }
            }
            None => CachedBlob::empty(hash),
        }
    }

    fn hashes_of(change: &Change) -> impl Iterator<Item = [u8; 20]> + '_ {
        [change.from.hash, change.to.hash].into_iter().flatten()
    }
}

impl Analyzer for BlobCacheAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "BlobCache",
            mode: Mode::History,
            description: "Content-addressed cache of blob bytes for the current commit's changes",
        }
    }

    fn name(&self) -> &str {
        "BlobCache"
    }

    fn flag(&self) -> &'static str {
        flags::BLOB_CACHE
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[flags::TREE_DIFF]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![
            ConfigurationOption {
                name: "fail_on_missing_submodules",
                description: "Error instead of substituting an empty blob for a missing submodule object",
                cli_flag: "fail-on-missing-submodules",
                option_type: OptionType::Bool,
                default: ConfigValue::Bool(false),
            },
            ConfigurationOption {
                name: "workers",
                description: "Number of parallel object-store readers",
                cli_flag: "goroutines",
                option_type: OptionType::Int,
                default: ConfigValue::Int(1),
            },
        ]
    }

    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(cfg) =
            historian_core::config::facts::get::<BlobCacheConfig>(facts, "blob_cache.config")
        {
            self.config = cfg.clone();
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.previous_cache.clear();
        self.cache.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let changes = ctx
            .dep::<Vec<Change>>(flags::TREE_DIFF)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing TreeDiff dependency"))?;

        std::mem::swap(&mut self.previous_cache, &mut self.cache);
        self.cache.clear();

        for change in changes {
            if change.action == ChangeAction::Delete {
                // Deletes' hash is the `from` side; satisfy from the
                // previous generation when possible.
                for hash in Self::hashes_of(change) {
                    let blob = self.load(hash);
                    self.cache.insert(hash, blob);
                }
                continue;
            }
            for hash in Self::hashes_of(change) {
                let blob = self.load(hash);
                self.cache.insert(hash, blob);
            }
        }

        Ok(())
    }

    fn finalize(&mut self) -> Report {
        Report::new()
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        Some(Box::new(self.cache.clone()))
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(BlobCacheAnalyzer {
                    config: self.config.clone(),
                    store: Arc::clone(&self.store),
                    previous_cache: FxHashMap::default(),
                    cache: FxHashMap::default(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let _ = downcast_branch::<BlobCacheAnalyzer>(branch);
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
