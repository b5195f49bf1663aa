//! Sliding-window Z-score anomaly scoring (§4.5).

use statrs::statistics::Statistics;

/// For each `i`, scores `values[i]` against the population mean/stddev of
/// the half-open window `values[max(0, i-window)..i)` (excludes `values[i]`
/// itself). Population variance (divisor `n`, not `n-1`), via `statrs`.
///
/// Edge cases (Testable Property 4):
/// - empty window → `0.0`
/// - zero stddev, `values[i] == mean` → `0.0`
/// - zero stddev, `values[i] != mean` → `copysign(100.0, values[i] - mean)`
pub fn sliding_window_zscores(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut scores = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = i.saturating_sub(window);
        let slice = &values[start..i];
        scores.push(score_one(values[i], slice));
    }
    scores
}

fn score_one(value: f64, window: &[f64]) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let mean = window.mean();
    let stddev = window.population_std_dev();

    if stddev == 0.0 {
        if value == mean {
            0.0
        } else {
            100.0_f64.copysign(value - mean)
        }
    } else {
        (value - mean) / stddev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_scores_zero() {
        let scores = sliding_window_zscores(&[5.0], 5);
        assert_eq!(scores[0], 0.0);
    }

    #[test]
    fn zero_stddev_matching_value_scores_zero() {
        let values = vec![10.0, 10.0, 10.0, 10.0];
        let scores = sliding_window_zscores(&values, 3);
        assert_eq!(scores[3], 0.0);
    }

    #[test]
    fn zero_stddev_above_mean_saturates_positive() {
        let values = vec![10.0, 10.0, 10.0, 4950.0];
        let scores = sliding_window_zscores(&values, 3);
        assert_eq!(scores[3], 100.0);
    }

    #[test]
    fn zero_stddev_below_mean_saturates_negative() {
        let values = vec![10.0, 10.0, 10.0, -5.0];
        let scores = sliding_window_zscores(&values, 3);
        assert_eq!(scores[3], -100.0);
    }

    #[test]
    fn stable_series_has_no_large_scores() {
        let values = vec![10.0; 15];
        let scores = sliding_window_zscores(&values, 5);
        assert!(scores.iter().all(|s| s.abs() < 2.0));
    }
}
