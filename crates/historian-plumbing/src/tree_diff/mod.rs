//! `TreeDiff` (§4.2): the root of the plumbing DAG. Diffs each commit's
//! tree against its predecessor's and filters the result by vendor
//! blacklist, whitelist regex, and detected language.

use std::sync::Arc;

use historian_core::analyzer::{
    Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode, OptionType,
    SerializeFormat,
};
use historian_core::config::{self, TreeDiffConfig};
use historian_core::errors::AnalyzerError;
use historian_core::types::{Change, Report};
use historian_core::vcs::{ObjectStore, Tree};

use regex::Regex;

use crate::flags;
use crate::languages::extensions::detect_by_extension;

pub struct TreeDiffAnalyzer {
    config: TreeDiffConfig,
    store: Arc<dyn ObjectStore>,
    previous_tree: Option<Box<dyn Tree>>,
    whitelist_re: Option<Regex>,
    current_output: Vec<Change>,
}

impl TreeDiffAnalyzer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            config: TreeDiffConfig::default(),
            store,
            previous_tree: None,
            whitelist_re: None,
            current_output: Vec::new(),
        }
    }

    fn passes_filters(&self, change: &Change) -> bool {
        if self.config.enable_blacklist {
            let names = [change.from.name.as_str(), change.to.name.as_str()];
            for name in names {
                if name.is_empty() {
                    continue;
                }
                if self
                    .config
                    .blacklisted_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
                {
                    return false;
                }
            }
        }

        if let Some(re) = &self.whitelist_re {
            let matches = [change.from.name.as_str(), change.to.name.as_str()]
                .into_iter()
                .any(|name| !name.is_empty() && re.is_match(name));
            if !matches {
                return false;
            }
        }

        if !self.config.languages.iter().any(|l| l == "all") {
            let name = if change.to.name.is_empty() {
                &change.from.name
            } else {
                &change.to.name
            };
            let lang = detect_by_extension(name);
            let allowed = lang
                .map(|l| {
                    self.config
                        .languages
                        .iter()
                        .any(|cfg| cfg.eq_ignore_ascii_case(l))
                })
                .unwrap_or(false);
            if !allowed {
                return false;
            }
        }

        true
    }
}

impl Analyzer for TreeDiffAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "TreeDiff",
            mode: Mode::History,
            description: "Diffs each commit's tree against its predecessor and filters the result",
        }
    }

    fn name(&self) -> &str {
        "TreeDiff"
    }

    fn flag(&self) -> &'static str {
        flags::TREE_DIFF
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![
            ConfigurationOption {
                name: "enable_blacklist",
                description: "Filter changes whose path starts with a blacklisted prefix",
                cli_flag: "skip-blacklist",
                option_type: OptionType::Bool,
                default: ConfigValue::Bool(false),
            },
            ConfigurationOption {
                name: "blacklisted_prefixes",
                description: "Path prefixes to exclude when enable_blacklist is set",
                cli_flag: "blacklisted-prefixes",
                option_type: OptionType::Strings,
                default: ConfigValue::Strings(TreeDiffConfig::default().blacklisted_prefixes),
            },
            ConfigurationOption {
                name: "languages",
                description: "Restrict to these detected languages; \"all\" disables the filter",
                cli_flag: "languages",
                option_type: OptionType::Strings,
                default: ConfigValue::Strings(vec!["all".to_string()]),
            },
            ConfigurationOption {
                name: "whitelist_regex",
                description: "Only include paths matching this regex",
                cli_flag: "whitelist",
                option_type: OptionType::String,
                default: ConfigValue::String(String::new()),
            },
        ]
    }

    fn configure(&mut self, facts: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(pattern) = config::facts::get::<String>(facts, "tree_diff.whitelist_regex") {
            if !pattern.is_empty() {
                let re = Regex::new(pattern)
                    .map_err(|e| AnalyzerError::configuration(self.name(), e))?;
                self.whitelist_re = Some(re);
                self.config.whitelist_regex = Some(pattern.clone());
            }
        }
        if let Some(cfg) = config::facts::get::<TreeDiffConfig>(facts, "tree_diff.config") {
            self.config = cfg.clone();
            if let Some(pattern) = &self.config.whitelist_regex {
                if !pattern.is_empty() {
                    self.whitelist_re = Some(
                        Regex::new(pattern)
                            .map_err(|e| AnalyzerError::configuration(self.name(), e))?,
                    );
                }
            }
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.previous_tree = None;
        self.current_output.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let to_tree = self.store.tree_of(ctx.commit.hash());
        let changes = match (&self.previous_tree, &to_tree) {
            (_, None) => Vec::new(),
            (None, Some(to)) => self.store.diff_tree(None, to.as_ref()),
            (Some(from), Some(to)) => self.store.diff_tree(Some(from.as_ref()), to.as_ref()),
        };

        self.current_output = changes.into_iter().filter(|c| self.passes_filters(c)).collect();
        self.previous_tree = to_tree;
        Ok(())
    }

    fn finalize(&mut self) -> Report {
        Report::new()
    }

    fn plumbing_output(&self) -> Option<Box<dyn std::any::Any + Send + Sync>> {
        Some(Box::new(self.current_output.clone()))
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(TreeDiffAnalyzer {
                    config: self.config.clone(),
                    store: Arc::clone(&self.store),
                    previous_tree: None,
                    whitelist_re: self.whitelist_re.clone(),
                    current_output: Vec::new(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, _branches: Vec<Box<dyn Analyzer>>) {
        // Plumbing output is per-commit and never accumulated, so there is
        // nothing to fold back from a clone's branch.
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
