//! Scraped price observations.

use serde::{Deserialize, Serialize};

/// A single scraped price point for a product, as produced by the
/// extraction front-end. Immutable input to detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Retailer-scoped product identifier.
    pub product_id: String,
    /// Product title as listed.
    pub title: String,
    /// Retailer slug (e.g. "amazon", "bestbuy").
    pub retailer: String,
    /// Product category slug.
    pub category: String,
    /// Price currently listed.
    pub current_price: f64,
    /// Original/list price when the retailer shows one.
    pub original_price: Option<f64>,
    /// Historical prices for the same item, oldest first.
    pub price_history: Vec<f64>,
}

impl PriceObservation {
    /// Ratio of original to current price, when both are positive.
    ///
    /// A ratio of 10 or more (or 0.1 or less) is the signature of a slipped
    /// decimal point.
    #[must_use]
    pub fn price_ratio(&self) -> Option<f64> {
        let original = self.original_price?;
        if original > 0.0 && self.current_price > 0.0 {
            Some(original / self.current_price)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ratio_requires_positive_prices() {
        let mut obs = PriceObservation {
            product_id: "p1".into(),
            title: "Widget".into(),
            retailer: "amazon".into(),
            category: "electronics".into(),
            current_price: 1.99,
            original_price: Some(199.99),
            price_history: vec![],
        };
        assert!(obs.price_ratio().unwrap() > 100.0);

        obs.current_price = 0.0;
        assert!(obs.price_ratio().is_none());

        obs.current_price = 1.99;
        obs.original_price = None;
        assert!(obs.price_ratio().is_none());
    }
}
