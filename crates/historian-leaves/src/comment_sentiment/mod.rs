//! `CommentSentiment` (§4.6): scores each tick's comment text for
//! sentiment, combining a VADER-style valence analyzer with
//! software-engineering domain adjustments.

mod extract;
mod vader;

use std::any::Any;
use std::sync::Arc;

use historian_core::analyzer::{
    downcast_branch, Analyzer, ConfigFacts, ConfigurationOption, ConsumeContext, Descriptor, Mode,
    OptionType, SerializeFormat,
};
use historian_core::config::facts::{self, CommitsByTick};
use historian_core::config::CommentSentimentConfig;
use historian_core::errors::AnalyzerError;
use historian_core::types::collections::FxHashMap;
use historian_core::types::{Report, ReportValue, Tick, UastChangePair};
use historian_storage::write_report;

use historian_plumbing::flags as plumbing_flags;

pub const FLAG: &str = "sentiment";

/// Length-weighted sentiment accumulated for one commit's comments, keyed
/// by commit hash so merging clones is a map union (the fork/merge-safe
/// per-commit path, SPEC_FULL §9).
#[derive(Clone, Copy, Debug, Default)]
struct CommitSentiment {
    weighted_sum: f64,
    weight_sum: f64,
}

pub struct CommentSentimentAnalyzer {
    config: CommentSentimentConfig,
    commits_by_tick: Arc<CommitsByTick>,
    commit_sentiment: FxHashMap<[u8; 20], CommitSentiment>,
}

impl CommentSentimentAnalyzer {
    pub fn new() -> Self {
        Self {
            config: CommentSentimentConfig::default(),
            commits_by_tick: Arc::new(FxHashMap::default()),
            commit_sentiment: FxHashMap::default(),
        }
    }

    fn min_length(&self) -> usize {
        self.config.min_comment_length.max(10)
    }

    fn max_weight_ratio(&self) -> f64 {
        if self.config.gap < 0.0 || self.config.gap >= 1.0 {
            0.5
        } else {
            self.config.gap
        }
    }

    fn score_commit(&self, pairs: &[UastChangePair]) -> Option<CommitSentiment> {
        let mut comments: Vec<String> = Vec::new();
        for pair in pairs {
            let Some(after) = &pair.after else { continue };
            for raw in extract::merged_comments(after) {
                if let Some(filtered) = extract::filter_comment(&raw, self.min_length()) {
                    comments.push(filtered);
                }
            }
        }
        if comments.is_empty() {
            return None;
        }

        let avg_len: f64 =
            comments.iter().map(|c| c.chars().count() as f64).sum::<f64>() / comments.len() as f64;
        let max_ratio = self.max_weight_ratio();

        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for comment in &comments {
            let len = comment.chars().count() as f64;
            let weight = (len / avg_len.max(1.0)).min(max_ratio.max(f64::EPSILON));
            let unit_score = vader::to_unit_interval(vader::compound_score(comment));
            weighted_sum += unit_score * weight;
            weight_sum += weight;
        }

        Some(CommitSentiment {
            weighted_sum,
            weight_sum,
        })
    }
}

/// Classification thresholds over an aggregated tick score.
pub fn classify(score: f64) -> &'static str {
    if score >= 0.6 {
        "positive"
    } else if score <= 0.4 {
        "negative"
    } else {
        "neutral"
    }
}

/// Low-sentiment tick risk level.
pub fn risk_level(score: f64) -> Option<&'static str> {
    if score <= 0.2 {
        Some("HIGH")
    } else if score <= 0.4 {
        Some("MEDIUM")
    } else {
        None
    }
}

impl Analyzer for CommentSentimentAnalyzer {
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            id: "CommentSentiment",
            mode: Mode::History,
            description: "Scores each tick's comment text for sentiment",
        }
    }

    fn name(&self) -> &str {
        "CommentSentiment"
    }

    fn flag(&self) -> &'static str {
        FLAG
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[plumbing_flags::UAST_CHANGES]
    }

    fn list_configuration_options(&self) -> Vec<ConfigurationOption> {
        use historian_core::analyzer::ConfigValue;
        vec![
            ConfigurationOption {
                name: "min_length",
                description: "Minimum filtered comment length",
                cli_flag: "min-comment-len",
                option_type: OptionType::Int,
                default: ConfigValue::Int(20),
            },
            ConfigurationOption {
                name: "gap",
                description: "Maximum per-comment length weight ratio",
                cli_flag: "sentiment-gap",
                option_type: OptionType::Float,
                default: ConfigValue::Float(0.5),
            },
        ]
    }

    fn configure(&mut self, facts_map: &ConfigFacts) -> Result<(), AnalyzerError> {
        if let Some(cfg) = facts::get::<CommentSentimentConfig>(facts_map, "comment_sentiment.config")
        {
            self.config = *cfg;
        }
        if let Some(by_tick) = facts::get::<CommitsByTick>(facts_map, facts::COMMITS_BY_TICK) {
            self.commits_by_tick = Arc::new(by_tick.clone());
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), AnalyzerError> {
        self.commit_sentiment.clear();
        Ok(())
    }

    fn consume(&mut self, ctx: &ConsumeContext) -> Result<(), AnalyzerError> {
        if ctx.cancellation.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }

        let pairs = ctx
            .dep::<Vec<UastChangePair>>(plumbing_flags::UAST_CHANGES)
            .ok_or_else(|| AnalyzerError::consume(self.name(), "missing UASTChanges dependency"))?;

        if let Some(sentiment) = self.score_commit(pairs) {
            self.commit_sentiment.insert(ctx.commit.hash().0, sentiment);
        }

        Ok(())
    }

    fn finalize(&mut self) -> Report {
        let mut ticks: Vec<(Tick, f64)> = Vec::new();
        for (&tick, hashes) in self.commits_by_tick.iter() {
            let mut weighted_sum = 0.0;
            let mut weight_sum = 0.0;
            for hash in hashes {
                if let Some(s) = self.commit_sentiment.get(hash) {
                    weighted_sum += s.weighted_sum;
                    weight_sum += s.weight_sum;
                }
            }
            if weight_sum > 0.0 {
                ticks.push((tick, weighted_sum / weight_sum));
            }
        }
        ticks.sort_by_key(|(t, _)| t.0);

        let mut report = Report::new();
        let records: Vec<ReportValue> = ticks
            .iter()
            .map(|(tick, score)| {
                let mut fields = std::collections::BTreeMap::new();
                fields.insert("tick".to_string(), ReportValue::Int(tick.0 as i64));
                fields.insert("score".to_string(), ReportValue::Float(*score));
                fields.insert(
                    "classification".to_string(),
                    ReportValue::Str(classify(*score).to_string()),
                );
                if let Some(risk) = risk_level(*score) {
                    fields.insert("risk".to_string(), ReportValue::Str(risk.to_string()));
                }
                ReportValue::Record(fields)
            })
            .collect();
        report.set("ticks", ReportValue::Seq(records));
        report
    }

    fn plumbing_output(&self) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }

    fn fork(&self, n: usize) -> Vec<Box<dyn Analyzer>> {
        (0..n)
            .map(|_| {
                Box::new(CommentSentimentAnalyzer {
                    config: self.config,
                    commits_by_tick: Arc::clone(&self.commits_by_tick),
                    commit_sentiment: FxHashMap::default(),
                }) as Box<dyn Analyzer>
            })
            .collect()
    }

    fn merge(&mut self, branches: Vec<Box<dyn Analyzer>>) {
        for branch in branches {
            let mut other = downcast_branch::<CommentSentimentAnalyzer>(branch);
            for (hash, sentiment) in other.commit_sentiment.drain() {
                self.commit_sentiment.insert(hash, sentiment);
            }
        }
    }

    fn serialize(
        &self,
        report: &Report,
        format: SerializeFormat,
        writer: &mut dyn std::io::Write,
    ) -> Result<(), AnalyzerError> {
        write_report(self.name(), report, format, writer)
    }
}
