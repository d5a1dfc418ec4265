//! Anomaly detector properties from the component contract.

use glitchwatch::domain::stats::{double_mad_score, median, outside_adjusted_iqr};
use glitchwatch::domain::{detect, AnomalyType};
use glitchwatch::testkit::stable_history;

#[test]
fn short_histories_disable_the_robust_detectors() {
    for len in 0..10 {
        let history: Vec<f64> = (0..len).map(|i| 100.0 + f64::from(i)).collect();
        assert_eq!(
            double_mad_score(1.0, &history),
            0.0,
            "MAD guard failed at {len} samples"
        );
        assert!(
            !outside_adjusted_iqr(1.0, &history),
            "IQR guard failed at {len} samples"
        );
    }
}

#[test]
fn median_matches_reference_values() {
    assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    assert_eq!(median(&[1.0, 3.0, 5.0]), 3.0);
    assert_eq!(median(&[]), 0.0);

    // Order-invariant.
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    assert_eq!(median(&[5.0, 3.0, 1.0]), 3.0);
}

#[test]
fn hundredth_price_is_a_decimal_error_regardless_of_history() {
    let history: Vec<f64> = (0..30).map(|i| 95.0 + (i % 7) as f64).collect();
    let result = detect(0.99, Some(99.00), &history);

    assert!(result.is_anomaly);
    assert_eq!(result.anomaly_type, AnomalyType::DecimalError);
    assert_eq!(result.confidence, 95.0);
}

#[test]
fn no_discount_no_history_means_no_anomaly() {
    let result = detect(25.0, Some(25.0), &[]);

    assert!(!result.is_anomaly);
    assert_eq!(result.anomaly_type, AnomalyType::None);
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn collapsed_price_scores_as_mad_anomaly() {
    let result = detect(9.99, Some(199.99), &stable_history());

    assert!(result.is_anomaly);
    assert!(result.mad_score > 3.0);
    assert_eq!(result.anomaly_type, AnomalyType::MadScore);
    assert!(result.confidence >= 70.0);
}
