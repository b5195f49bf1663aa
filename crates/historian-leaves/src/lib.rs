//! Leaf analyzers: consume plumbing outputs and the shared per-tick facts
//! to produce reports. Each leaf is fork/merge-safe via independent
//! per-clone state unioned on merge (§4.4-§4.7).

pub mod aggregate;
pub mod comment_sentiment;
pub mod couples;
pub mod temporal_anomaly;
pub mod zscore;

pub use comment_sentiment::CommentSentimentAnalyzer;
pub use couples::CouplesAnalyzer;
pub use temporal_anomaly::TemporalAnomalyAnalyzer;

pub mod flags {
    pub const TEMPORAL_ANOMALY: &str = super::temporal_anomaly::FLAG;
    pub const COMMENT_SENTIMENT: &str = super::comment_sentiment::FLAG;
    pub const COUPLES: &str = super::couples::FLAG;
}
