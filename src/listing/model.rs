// region:    --- Imports
use crate::pricing::{self, NoiseSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Sentinels

/// Buyer attribution written when the sweep closes an auction that ran out,
/// as opposed to a real purchase.
pub const EXPIRED_BUYER_ID: &str = "expired";
pub const EXPIRED_BUYER_EMAIL: &str = "expired@system.local";

// endregion: --- Sentinels

// region:    --- Listing Model

/// A declining-price listing.
///
/// `listed_price` and `minimum_price` are fixed for the lifetime of an
/// auction window; `current_price` is the last persisted decay evaluation
/// and always sits in `[minimum_price, listed_price]`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Listing {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub listed_price: f64,
    pub minimum_price: f64,
    pub current_price: f64,
    pub created_at: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_bought: bool,
    pub buyer_id: Option<String>,
    pub buyer_email: Option<String>,
    pub seller_id: String,
    pub seller_email: String,
    pub image_url: Option<String>,
    pub communities: Vec<String>,
}

/// Lifecycle view derived from the terminal flag and buyer attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Active,
    Purchased,
    Expired,
}

impl Listing {
    /// Current lifecycle state. The two terminal states share `is_bought`
    /// and are told apart by the sentinel buyer attribution.
    pub fn state(&self) -> LifecycleState {
        if !self.is_bought {
            LifecycleState::Active
        } else if self.buyer_id.as_deref() == Some(EXPIRED_BUYER_ID) {
            LifecycleState::Expired
        } else {
            LifecycleState::Purchased
        }
    }

    /// Deterministic price of this listing at `at`. Safe for trend display:
    /// two evaluations of the same instant agree.
    pub fn price_at(&self, at: DateTime<Utc>) -> f64 {
        pricing::historical_price(
            self.listed_price,
            self.minimum_price,
            self.created_at,
            self.end_date,
            at,
        )
    }

    /// Live price with market noise applied; used by the periodic
    /// re-pricing loop, never where determinism is required.
    pub fn live_price(&self, now: DateTime<Utc>, noise: &mut impl NoiseSource) -> f64 {
        pricing::decayed_price(
            self.listed_price,
            self.minimum_price,
            self.created_at,
            self.end_date,
            now,
            noise,
        )
    }

    pub fn is_seller(&self, actor: &str) -> bool {
        self.seller_id == actor
    }
}

// endregion: --- Listing Model

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn listing() -> Listing {
        let now = Utc::now();
        Listing {
            id: 1,
            title: "Desk lamp".into(),
            description: "Barely used".into(),
            listed_price: 100.0,
            minimum_price: 20.0,
            current_price: 100.0,
            created_at: now,
            end_date: now + Duration::days(10),
            is_bought: false,
            buyer_id: None,
            buyer_email: None,
            seller_id: "seller-1".into(),
            seller_email: "seller@campus.edu".into(),
            image_url: None,
            communities: vec!["Caltech".into()],
        }
    }

    #[test]
    fn fresh_listing_is_active() {
        assert_eq!(listing().state(), LifecycleState::Active);
    }

    #[test]
    fn bought_listing_with_real_buyer_is_purchased() {
        let mut l = listing();
        l.is_bought = true;
        l.buyer_id = Some("buyer-1".into());
        assert_eq!(l.state(), LifecycleState::Purchased);
    }

    #[test]
    fn bought_listing_with_sentinel_buyer_is_expired() {
        let mut l = listing();
        l.is_bought = true;
        l.buyer_id = Some(EXPIRED_BUYER_ID.into());
        l.buyer_email = Some(EXPIRED_BUYER_EMAIL.into());
        assert_eq!(l.state(), LifecycleState::Expired);
    }

    #[test]
    fn price_at_halfway_matches_quadratic_decay() {
        let l = listing();
        let at = l.created_at + Duration::days(5);
        assert_eq!(l.price_at(at), 80.0);
    }
}

// endregion: --- Tests
