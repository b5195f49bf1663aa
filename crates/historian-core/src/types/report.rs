//! `Report` — the opaque, typed output of a leaf analyzer's `finalize`.
//!
//! Values are typed rather than raw JSON so that serializers for different
//! formats (JSON, YAML, the CFB1 binary container) can all introspect the
//! same representation without re-parsing. A `BTreeMap` backs both the
//! top-level report and any nested records so serialization is
//! deterministic across runs — this matters for checkpoint round-trip and
//! binary/JSON decode-equality tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single typed value inside a `Report`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ReportValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<ReportValue>),
    /// A mapping of primitive keys to numbers (e.g. a language → LOC
    /// histogram), kept distinct from `Record` so binary decoding can
    /// special-case "integer-keyed map decodes with stringified keys".
    NumMap(BTreeMap<String, f64>),
    /// A tagged record — nested string-keyed fields of arbitrary type.
    Record(BTreeMap<String, ReportValue>),
}

impl ReportValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReportValue::Int(i) => Some(*i as f64),
            ReportValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<i64> for ReportValue {
    fn from(v: i64) -> Self {
        ReportValue::Int(v)
    }
}

impl From<f64> for ReportValue {
    fn from(v: f64) -> Self {
        ReportValue::Float(v)
    }
}

impl From<String> for ReportValue {
    fn from(v: String) -> Self {
        ReportValue::Str(v)
    }
}

impl From<bool> for ReportValue {
    fn from(v: bool) -> Self {
        ReportValue::Bool(v)
    }
}

/// The output of a leaf analyzer's `finalize`: a string-keyed, typed map.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Report {
    pub fields: BTreeMap<String, ReportValue>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ReportValue>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ReportValue> {
        self.fields.get(key)
    }
}

/// Reserved key under which the runner records an analyzer's fatal error,
/// per §7's "its report is omitted... with its error recorded under a
/// reserved key".
pub const ERROR_KEY: &str = "__error__";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_set_get_round_trips() {
        let mut report = Report::new();
        report.set("threshold", 2.0_f64);
        report.set("label", "ok".to_string());
        assert_eq!(report.get("threshold").unwrap().as_f64(), Some(2.0));
        assert!(matches!(report.get("label"), Some(ReportValue::Str(s)) if s == "ok"));
    }

    #[test]
    fn json_round_trip_preserves_fields() {
        let mut report = Report::new();
        report.set("count", 3_i64);
        report.set("ratio", 0.5_f64);
        let json = serde_json::to_string(&report).unwrap();
        let back: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("count").unwrap().as_f64(), Some(3.0));
        assert_eq!(back.get("ratio").unwrap().as_f64(), Some(0.5));
    }
}
