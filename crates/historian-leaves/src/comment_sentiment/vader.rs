//! A small VADER-style valence lexicon and compound-score calculation,
//! with software-engineering domain adjustments (§4.6).

use historian_core::types::collections::FxHashMap;

fn lexicon() -> &'static FxHashMap<&'static str, f64> {
    use std::sync::OnceLock;
    static LEXICON: OnceLock<FxHashMap<&'static str, f64>> = OnceLock::new();
    LEXICON.get_or_init(|| {
        let mut m = FxHashMap::default();
        for (word, score) in [
            ("good", 1.9),
            ("great", 3.1),
            ("excellent", 3.4),
            ("nice", 1.8),
            ("awesome", 3.1),
            ("clean", 1.5),
            ("elegant", 2.0),
            ("simple", 1.0),
            ("fast", 1.2),
            ("works", 1.0),
            ("fixed", 1.3),
            ("improve", 1.2),
            ("improved", 1.3),
            ("bad", -2.5),
            ("wrong", -2.0),
            ("broken", -2.7),
            ("bug", -1.5),
            ("slow", -1.4),
            ("ugly", -2.0),
            ("confusing", -1.8),
            ("fail", -2.2),
            ("failed", -2.2),
            ("error", -1.2),
            ("issue", -1.0),
            ("problem", -1.6),
            ("worst", -3.4),
            ("terrible", -3.0),
            ("horrible", -3.0),
        ] {
            m.insert(word, score);
        }
        m
    })
}

/// Software-engineering terms that read as negative in general English but
/// are routine in code (error handling vocabulary); damp their pull toward
/// zero rather than removing it entirely.
const NEUTRALIZERS: &[&str] = &[
    "kill", "abort", "fatal", "terminate", "panic", "execute", "deprecated",
];

/// Terms that are specifically negative in an SE context but carry no (or
/// a mild) general-English charge; push them toward negative.
const SE_NEGATIVES: &[&str] = &["hacky", "spaghetti", "nightmare", "kludge"];

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}

/// Compound sentiment score in `[-1, 1]` for `text`, VADER-style: sum
/// per-token valence, normalize by `sqrt(sum^2 + alpha)`, then apply the
/// SE-domain adjustments.
pub fn compound_score(text: &str) -> f64 {
    let lex = lexicon();
    let mut sum = 0.0f64;
    for token in tokenize(text) {
        if let Some(v) = lex.get(token.as_str()) {
            sum += v;
        } else if NEUTRALIZERS.contains(&token.as_str()) {
            sum *= 0.5;
        } else if SE_NEGATIVES.contains(&token.as_str()) {
            sum -= 2.0;
        }
    }

    const ALPHA: f64 = 15.0;
    let normalized = sum / (sum * sum + ALPHA).sqrt();
    normalized.clamp(-1.0, 1.0)
}

/// Maps a compound score in `[-1, 1]` to `[0, 1]`.
pub fn to_unit_interval(compound: f64) -> f64 {
    (compound + 1.0) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_text_scores_above_half() {
        let score = to_unit_interval(compound_score("this is a great and elegant fix"));
        assert!(score > 0.5);
    }

    #[test]
    fn negative_text_scores_below_half() {
        let score = to_unit_interval(compound_score("this is a terrible broken hack"));
        assert!(score < 0.5);
    }

    #[test]
    fn neutral_text_scores_near_half() {
        let score = to_unit_interval(compound_score("rename the helper function"));
        assert!((score - 0.5).abs() < 0.1);
    }

    #[test]
    fn neutralizer_dampens_negative_pull() {
        let damped = compound_score("panic on overflow");
        let undamped = compound_score("terrible on overflow");
        assert!(damped.abs() < undamped.abs());
    }
}
