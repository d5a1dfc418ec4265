//! Subscribers and their notification preferences.
//!
//! Subscription-tier business rules live with the billing collaborator; the
//! core only sees the gating interface: is the subscription active with the
//! realtime entitlement, and do the stored preference filters match.

use serde::{Deserialize, Serialize};

use super::glitch::ConfirmedGlitch;

/// Per-subscriber preference filters applied before fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Minimum discount percentage worth waking the subscriber for.
    #[serde(default)]
    pub min_profit_margin: f64,
    /// Category allow-list; empty means all categories.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Retailer allow-list; empty means all retailers.
    #[serde(default)]
    pub retailers: Vec<String>,
    #[serde(default)]
    pub min_price: f64,
    #[serde(default = "default_max_price")]
    pub max_price: f64,
}

fn default_max_price() -> f64 {
    f64::MAX
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            min_profit_margin: 0.0,
            categories: Vec::new(),
            retailers: Vec::new(),
            min_price: 0.0,
            max_price: default_max_price(),
        }
    }
}

impl NotificationPreferences {
    /// Whether a confirmed glitch passes every stored filter.
    #[must_use]
    pub fn matches(&self, glitch: &ConfirmedGlitch) -> bool {
        if glitch.discount_percentage < self.min_profit_margin {
            return false;
        }
        if !self.categories.is_empty() && !self.categories.contains(&glitch.category) {
            return false;
        }
        if !self.retailers.is_empty() && !self.retailers.contains(&glitch.retailer) {
            return false;
        }
        glitch.price >= self.min_price && glitch.price <= self.max_price
    }
}

/// Delivery targets per channel. A missing target disables that channel for
/// the subscriber.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationTargets {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub telegram_chat_id: Option<i64>,
}

/// A notification recipient as seen by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    /// Active subscription in good standing.
    #[serde(default)]
    pub active: bool,
    /// Plan includes realtime glitch notifications.
    #[serde(default)]
    pub realtime: bool,
    #[serde(default)]
    pub preferences: NotificationPreferences,
    #[serde(default)]
    pub targets: NotificationTargets,
}

impl Subscriber {
    /// Eligibility gate: active subscription with the realtime entitlement
    /// and preference filters that match the glitch.
    #[must_use]
    pub fn eligible_for(&self, glitch: &ConfirmedGlitch) -> bool {
        self.active && self.realtime && self.preferences.matches(glitch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn glitch() -> ConfirmedGlitch {
        ConfirmedGlitch {
            id: Uuid::new_v4(),
            product_id: "sku-1".into(),
            title: "Laptop".into(),
            retailer: "amazon".into(),
            category: "electronics".into(),
            price: 120.0,
            original_price: Some(600.0),
            discount_percentage: 80.0,
            confidence: 88.0,
            reasoning: String::new(),
            validated_at: Utc::now(),
        }
    }

    fn subscriber() -> Subscriber {
        Subscriber {
            id: "sub-1".into(),
            active: true,
            realtime: true,
            preferences: NotificationPreferences::default(),
            targets: NotificationTargets::default(),
        }
    }

    #[test]
    fn default_preferences_match_everything() {
        assert!(subscriber().eligible_for(&glitch()));
    }

    #[test]
    fn inactive_or_non_realtime_subscribers_are_ineligible() {
        let mut sub = subscriber();
        sub.active = false;
        assert!(!sub.eligible_for(&glitch()));

        let mut sub = subscriber();
        sub.realtime = false;
        assert!(!sub.eligible_for(&glitch()));
    }

    #[test]
    fn margin_filter_rejects_shallow_discounts() {
        let mut sub = subscriber();
        sub.preferences.min_profit_margin = 90.0;
        assert!(!sub.eligible_for(&glitch()));

        sub.preferences.min_profit_margin = 50.0;
        assert!(sub.eligible_for(&glitch()));
    }

    #[test]
    fn empty_allow_lists_match_all_but_nonempty_filter() {
        let mut sub = subscriber();
        sub.preferences.categories = vec!["toys".into()];
        assert!(!sub.eligible_for(&glitch()));

        sub.preferences.categories = vec!["toys".into(), "electronics".into()];
        assert!(sub.eligible_for(&glitch()));

        sub.preferences.retailers = vec!["walmart".into()];
        assert!(!sub.eligible_for(&glitch()));
    }

    #[test]
    fn price_range_filters_apply() {
        let mut sub = subscriber();
        sub.preferences.max_price = 100.0;
        assert!(!sub.eligible_for(&glitch()));

        sub.preferences.max_price = 500.0;
        sub.preferences.min_price = 150.0;
        assert!(!sub.eligible_for(&glitch()));

        sub.preferences.min_price = 0.0;
        assert!(sub.eligible_for(&glitch()));
    }
}
