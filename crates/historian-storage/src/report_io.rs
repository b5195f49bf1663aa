//! Bridges `Analyzer::serialize`'s `SerializeFormat` to the codecs in
//! [`crate::codec`] (§6). Every leaf and plumbing analyzer's `Report` output
//! shares this path for `Json`/`Yaml`/`Binary`; `Plot` and `Text` stay
//! analyzer-specific (there's no generic way to turn a `Report` into a plot
//! or prose summary) and are left for each analyzer's own `serialize` match
//! arm to reject or handle.

use std::io::Write;

use historian_core::analyzer::SerializeFormat;
use historian_core::errors::AnalyzerError;
use historian_core::types::Report;

use crate::codec::{BinaryReportCodec, Codec, JsonCodec, YamlCodec};

/// Encodes `report` in `format` through the matching codec, wrapping any
/// encode failure as an [`AnalyzerError::Finalize`] tagged with `analyzer`.
/// Returns `Err(AnalyzerError::UnsupportedFormat)` for `Plot`/`Text`, same as
/// the no-op default every analyzer used before this helper existed.
pub fn write_report(
    analyzer: &str,
    report: &Report,
    format: SerializeFormat,
    writer: &mut dyn Write,
) -> Result<(), AnalyzerError> {
    match format {
        SerializeFormat::Json => JsonCodec::<Report>::new()
            .encode(report, writer)
            .map_err(|e| AnalyzerError::finalize(analyzer, e)),
        SerializeFormat::Yaml => YamlCodec::<Report>::new()
            .encode(report, writer)
            .map_err(|e| AnalyzerError::finalize(analyzer, e)),
        SerializeFormat::Binary => BinaryReportCodec::new()
            .encode(report, writer)
            .map_err(|e| AnalyzerError::finalize(analyzer, e)),
        SerializeFormat::Plot | SerializeFormat::Text => {
            Err(AnalyzerError::UnsupportedFormat(format!("{format:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use historian_core::types::ReportValue;

    fn fixture() -> Report {
        let mut report = Report::default();
        report
            .fields
            .insert("commits".to_string(), ReportValue::Int(42));
        report
    }

    #[test]
    fn json_round_trips_readable_output() {
        let mut buf = Vec::new();
        write_report("fixture", &fixture(), SerializeFormat::Json, &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("\"commits\""));
    }

    #[test]
    fn yaml_round_trips_readable_output() {
        let mut buf = Vec::new();
        write_report("fixture", &fixture(), SerializeFormat::Yaml, &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("commits"));
    }

    #[test]
    fn binary_round_trips_through_the_cfb1_codec() {
        let mut buf = Vec::new();
        write_report("fixture", &fixture(), SerializeFormat::Binary, &mut buf).unwrap();
        assert_eq!(&buf[0..4], b"CFB1");
    }

    #[test]
    fn plot_and_text_are_unsupported() {
        let mut buf = Vec::new();
        assert!(write_report("fixture", &fixture(), SerializeFormat::Plot, &mut buf).is_err());
        assert!(write_report("fixture", &fixture(), SerializeFormat::Text, &mut buf).is_err());
    }
}
