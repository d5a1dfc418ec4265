//! Robust price statistics.
//!
//! Pure functions over price histories: median, medcouple skewness,
//! double-MAD scoring, and skew-adjusted IQR fences. No shared state, safe
//! to call from any number of threads.

/// Minimum history length for the MAD and IQR detectors.
const MIN_HISTORY: usize = 10;

/// Scale factor that makes the MAD a consistent estimator of the standard
/// deviation under normality.
const MAD_SCALE: f64 = 1.4826;

/// Denominator threshold below which the medcouple kernel substitutes the
/// sign of the numerator.
const KERNEL_EPSILON: f64 = 1e-10;

/// Tuning constant for the adjusted IQR fences.
const IQR_FENCE: f64 = 2.2;

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Median of already-sorted values; `0.0` for an empty slice.
fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Median of `values`: the middle element (odd length) or the average of the
/// two middle elements (even length). Returns `0.0` for an empty input.
pub fn median(values: &[f64]) -> f64 {
    median_sorted(&sorted_copy(values))
}

/// Medcouple: a robust skewness statistic in `[-1, 1]`.
///
/// Requires at least 4 samples, otherwise returns 0. Splits the sorted input
/// at the median and evaluates the medcouple kernel over every (left, right)
/// pair, excluding pairs where both sides equal the median exactly. Kernel
/// denominators below `1e-10` in magnitude are replaced by the sign of the
/// numerator so ties do not blow up the division.
pub fn medcouple(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }

    let sorted = sorted_copy(values);
    let med = median_sorted(&sorted);

    let left: Vec<f64> = sorted.iter().copied().filter(|&v| v <= med).collect();
    let right: Vec<f64> = sorted.iter().copied().filter(|&v| v >= med).collect();

    let mut kernels = Vec::with_capacity(left.len() * right.len());
    for &l in &left {
        for &r in &right {
            if l == med && r == med {
                continue;
            }
            let numerator = (r - med) - (med - l);
            let denominator = r - l;
            let kernel = if denominator.abs() < KERNEL_EPSILON {
                // f64::signum maps 0.0 to 1.0; an exact tie must contribute 0.
                if numerator > 0.0 {
                    1.0
                } else if numerator < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            } else {
                numerator / denominator
            };
            kernels.push(kernel);
        }
    }

    median(&kernels)
}

/// Double-MAD anomaly score for `current` against `history`.
///
/// Requires at least 10 historical samples, otherwise returns 0. The history
/// is split at its median and the MAD is computed independently per side;
/// the side `current` falls on is used, falling back to the other side and
/// then the pooled MAD when a side's dispersion collapses to zero.
///
/// Positive scores mean the current price sits below the expected level.
pub fn double_mad_score(current: f64, history: &[f64]) -> f64 {
    if history.len() < MIN_HISTORY {
        return 0.0;
    }

    let med = median(history);

    let lower_deviations: Vec<f64> = history
        .iter()
        .filter(|&&v| v <= med)
        .map(|&v| (v - med).abs())
        .collect();
    let upper_deviations: Vec<f64> = history
        .iter()
        .filter(|&&v| v > med)
        .map(|&v| (v - med).abs())
        .collect();

    let lower_mad = median(&lower_deviations) * MAD_SCALE;
    let upper_mad = median(&upper_deviations) * MAD_SCALE;

    let (side, other) = if current <= med {
        (lower_mad, upper_mad)
    } else {
        (upper_mad, lower_mad)
    };

    let mut mad = side;
    if mad == 0.0 {
        mad = other;
    }
    if mad == 0.0 {
        let pooled: Vec<f64> = history.iter().map(|&v| (v - med).abs()).collect();
        mad = median(&pooled) * MAD_SCALE;
    }
    if mad == 0.0 {
        return 0.0;
    }

    (med - current) / mad
}

/// Whether `current` falls outside the medcouple-adjusted IQR fences of
/// `history`.
///
/// Requires at least 10 samples, otherwise returns `false`. Quartiles are
/// floor-indexed on the sorted history; a zero IQR disables the check. The
/// fences are widened asymmetrically by the medcouple so a right-skewed
/// history (occasional sale prices) does not flag every discount:
///
/// ```text
/// lower = Q1 - 2.2 * e^(-4 * mc) * IQR
/// upper = Q3 + 2.2 * e^( 3 * mc) * IQR
/// ```
pub fn outside_adjusted_iqr(current: f64, history: &[f64]) -> bool {
    if history.len() < MIN_HISTORY {
        return false;
    }

    let sorted = sorted_copy(history);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[(3 * n) / 4];
    let iqr = q3 - q1;
    if iqr == 0.0 {
        return false;
    }

    let mc = medcouple(&sorted);
    let lower = q1 - IQR_FENCE * (-4.0 * mc).exp() * iqr;
    let upper = q3 + IQR_FENCE * (3.0 * mc).exp() * iqr;

    current < lower || current > upper
}

/// Classic z-score of `current` against `history`, with the same sign
/// convention as [`double_mad_score`]: positive when the price is below the
/// historical mean.
///
/// Requires at least 2 samples and nonzero dispersion, otherwise returns 0.
pub fn z_score(current: f64, history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }

    let n = history.len() as f64;
    let mean = history.iter().sum::<f64>() / n;
    let variance = history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return 0.0;
    }

    (mean - current) / stddev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_empty_is_zero() {
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn median_odd_length_picks_middle() {
        assert_eq!(median(&[1.0, 3.0, 5.0]), 3.0);
    }

    #[test]
    fn median_even_length_averages_middle_pair() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn median_is_invariant_to_input_order() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), median(&[1.0, 3.0, 5.0]));
        assert_eq!(median(&[4.0, 2.0, 1.0, 3.0]), 2.5);
    }

    #[test]
    fn medcouple_requires_four_samples() {
        assert_eq!(medcouple(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn medcouple_of_symmetric_data_is_zero() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(medcouple(&values).abs() < 1e-9);
    }

    #[test]
    fn medcouple_positive_for_right_skew() {
        let values = [1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 10.0, 20.0];
        assert!(medcouple(&values) > 0.0);
    }

    #[test]
    fn medcouple_negative_for_left_skew() {
        let values = [-20.0, -10.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0];
        assert!(medcouple(&values) < 0.0);
    }

    #[test]
    fn medcouple_stays_in_unit_interval() {
        let values = [1.0, 1.0, 1.0, 1.0, 100.0, 200.0];
        let mc = medcouple(&values);
        assert!((-1.0..=1.0).contains(&mc));
    }

    #[test]
    fn double_mad_requires_ten_samples() {
        let history = [100.0; 9];
        assert_eq!(double_mad_score(1.0, &history), 0.0);
    }

    #[test]
    fn double_mad_zero_for_flat_history() {
        // Every fallback MAD collapses to zero: the score must give up.
        let history = [100.0; 12];
        assert_eq!(double_mad_score(1.0, &history), 0.0);
    }

    #[test]
    fn double_mad_scores_deep_drop_high() {
        let history = [
            190.0, 195.0, 198.0, 205.0, 192.0, 196.0, 194.0, 199.0, 193.0, 197.0, 195.0, 196.0,
        ];
        let score = double_mad_score(9.99, &history);
        assert!(score > 3.0, "expected a strong anomaly score, got {score}");
    }

    #[test]
    fn double_mad_positive_below_and_negative_above() {
        let history = [
            90.0, 92.0, 94.0, 96.0, 98.0, 100.0, 102.0, 104.0, 106.0, 108.0, 110.0,
        ];
        assert!(double_mad_score(50.0, &history) > 0.0);
        assert!(double_mad_score(150.0, &history) < 0.0);
    }

    #[test]
    fn adjusted_iqr_requires_ten_samples() {
        let history = [1.0, 2.0, 3.0];
        assert!(!outside_adjusted_iqr(100.0, &history));
    }

    #[test]
    fn adjusted_iqr_false_for_zero_iqr() {
        let history = [100.0; 12];
        assert!(!outside_adjusted_iqr(1.0, &history));
    }

    #[test]
    fn adjusted_iqr_flags_far_outlier() {
        let history = [
            190.0, 195.0, 198.0, 205.0, 192.0, 196.0, 194.0, 199.0, 193.0, 197.0, 195.0, 196.0,
        ];
        assert!(outside_adjusted_iqr(9.99, &history));
    }

    #[test]
    fn adjusted_iqr_accepts_typical_price() {
        let history = [
            190.0, 195.0, 198.0, 205.0, 192.0, 196.0, 194.0, 199.0, 193.0, 197.0, 195.0, 196.0,
        ];
        assert!(!outside_adjusted_iqr(196.5, &history));
    }

    #[test]
    fn z_score_requires_two_samples() {
        assert_eq!(z_score(5.0, &[100.0]), 0.0);
    }

    #[test]
    fn z_score_zero_for_flat_history() {
        assert_eq!(z_score(5.0, &[100.0, 100.0, 100.0]), 0.0);
    }

    #[test]
    fn z_score_positive_when_below_mean() {
        let history = [95.0, 100.0, 105.0, 98.0, 102.0];
        assert!(z_score(50.0, &history) > 3.0);
        assert!(z_score(150.0, &history) < 0.0);
    }
}
