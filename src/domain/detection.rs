//! Price-drop anomaly classification.
//!
//! Combines the robust statistics from [`stats`](super::stats) into a single
//! [`DetectionResult`] per observation. Stateless: every observation is
//! classified from scratch, nothing is persisted here.

use serde::{Deserialize, Serialize};

use super::stats;

/// Discount percentage above which a drop is anomalous on its own.
const DISCOUNT_TRIGGER: f64 = 50.0;

/// Double-MAD score above which a drop is anomalous on its own.
const MAD_TRIGGER: f64 = 3.0;

/// Current/original ratio below which the price looks like a slipped decimal
/// point ($199.99 listed as $1.99).
const DECIMAL_RATIO: f64 = 0.01;

/// Z-score threshold for the weakest classification tier.
const Z_TRIGGER: f64 = 3.0;

/// Which statistical signal classified the observation.
///
/// Ordered by precedence: when several signals fire at once the first
/// applicable variant wins. Downstream confidence scoring depends on this
/// exact order, so it must not be reshuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    DecimalError,
    MadScore,
    IqrOutlier,
    PercentageDrop,
    ZScore,
    None,
}

impl AnomalyType {
    /// Stable string form used in stream payloads and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnomalyType::DecimalError => "decimal_error",
            AnomalyType::MadScore => "mad_score",
            AnomalyType::IqrOutlier => "iqr_outlier",
            AnomalyType::PercentageDrop => "percentage_drop",
            AnomalyType::ZScore => "z_score",
            AnomalyType::None => "none",
        }
    }
}

/// Derived classification of a single price observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub is_anomaly: bool,
    pub anomaly_type: AnomalyType,
    pub z_score: f64,
    pub mad_score: f64,
    pub iqr_flag: bool,
    pub discount_percentage: f64,
    /// 0-100 scale; higher means the drop is more likely a genuine glitch.
    pub confidence: f64,
}

/// Classify `current` against the listed `original` price and the item's
/// price history.
///
/// An observation is anomalous when the discount exceeds 50%, the double-MAD
/// score exceeds 3.0, or the price matches the decimal-error pattern. The
/// reported `anomaly_type` is the highest-precedence signal that fired,
/// whether or not it is strong enough to flag the observation on its own.
#[must_use]
pub fn detect(current: f64, original: Option<f64>, history: &[f64]) -> DetectionResult {
    let original = original.unwrap_or(0.0);

    let discount = if original > 0.0 {
        (original - current) / original * 100.0
    } else {
        0.0
    };
    let z = stats::z_score(current, history);
    let mad = stats::double_mad_score(current, history);
    let iqr = stats::outside_adjusted_iqr(current, history);
    let decimal = original > 0.0 && current / original < DECIMAL_RATIO;

    let deep_discount = discount > DISCOUNT_TRIGGER;
    let mad_hit = mad > MAD_TRIGGER;
    let z_hit = z > Z_TRIGGER;

    let is_anomaly = deep_discount || mad_hit || decimal;

    let anomaly_type = if decimal {
        AnomalyType::DecimalError
    } else if mad_hit {
        AnomalyType::MadScore
    } else if iqr {
        AnomalyType::IqrOutlier
    } else if deep_discount {
        AnomalyType::PercentageDrop
    } else if z_hit {
        AnomalyType::ZScore
    } else {
        AnomalyType::None
    };

    let confidence = if decimal {
        95.0
    } else if mad_hit && deep_discount {
        90.0
    } else if mad_hit && iqr {
        85.0
    } else if mad_hit {
        70.0 + (mad * 5.0).min(20.0)
    } else if iqr && deep_discount {
        75.0
    } else if deep_discount {
        50.0 + (discount / 2.0).min(30.0)
    } else if z_hit {
        70.0 + (z * 5.0).min(20.0)
    } else {
        0.0
    };

    DetectionResult {
        is_anomaly,
        anomaly_type,
        z_score: z,
        mad_score: mad,
        iqr_flag: iqr,
        discount_percentage: discount,
        confidence: confidence.min(100.0),
    }
}
