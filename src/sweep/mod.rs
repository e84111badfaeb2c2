/// Expiration sweep policy.
///
/// There is no dedicated job runner for closing overdue auctions; sweeps
/// piggyback on read traffic and on a coarse background tick. Displayed
/// prices are already clamped to the floor once the window has passed, so
/// a listing sitting nominally open past its deadline is a bounded
/// staleness trade-off, not a pricing bug.
// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::listing::model::{EXPIRED_BUYER_EMAIL, EXPIRED_BUYER_ID};
use crate::pricing::MarketNoise;
use crate::query;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

// endregion: --- Imports

// region:    --- Statements

const CLOSE_EXPIRED_LISTING: &str = r#"
    UPDATE listings
    SET is_bought = TRUE, buyer_id = $2, buyer_email = $3, current_price = minimum_price
    WHERE id = $1 AND is_bought = FALSE AND end_date <= $4
"#;

const SWEEP_EXPIRED_LISTINGS: &str = r#"
    UPDATE listings
    SET is_bought = TRUE, buyer_id = $1, buyer_email = $2, current_price = minimum_price
    WHERE is_bought = FALSE AND end_date <= $3
"#;

const UPDATE_CURRENT_PRICE: &str =
    "UPDATE listings SET current_price = $2 WHERE id = $1 AND is_bought = FALSE";

// endregion: --- Statements

// region:    --- Sweep State

/// Throttle record for the batch sweep.
///
/// Passed in explicitly (rather than hidden process-global state) so tests
/// can drive it and deployments can scope one per tenant. `last_run_at` is
/// only stamped after a successful batch write, so a failed sweep retries
/// on the next tick.
#[derive(Debug, Clone)]
pub struct SweepState {
    pub last_run_at: Option<DateTime<Utc>>,
    pub cooldown: Duration,
}

impl SweepState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            last_run_at: None,
            cooldown,
        }
    }

    /// Standard deployment throttle: one batch scan per day.
    pub fn daily() -> Self {
        Self::new(Duration::hours(24))
    }

    /// Whether a batch sweep is allowed at `now`.
    pub fn due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => now - last >= self.cooldown,
        }
    }
}

impl Default for SweepState {
    fn default() -> Self {
        Self::daily()
    }
}

// endregion: --- Sweep State

// region:    --- Sweep Operations

/// Single-item check: close `listing_id` if its window has passed.
///
/// Returns whether a transition occurred. Idempotent: the conditional
/// update matches zero rows once the listing is terminal. A failed persist
/// is logged and reported as "not expired" so the next access retries.
pub async fn close_if_expired(
    db: &DatabaseManager,
    listing_id: i64,
    now: DateTime<Utc>,
) -> Result<bool, MarketError> {
    let listing = query::handlers::get_listing(db, listing_id).await?;
    if listing.is_bought || now < listing.end_date {
        return Ok(false);
    }

    match sqlx::query(CLOSE_EXPIRED_LISTING)
        .bind(listing_id)
        .bind(EXPIRED_BUYER_ID)
        .bind(EXPIRED_BUYER_EMAIL)
        .bind(now)
        .execute(&*db.pool)
        .await
    {
        Ok(result) => {
            let closed = result.rows_affected() > 0;
            if closed {
                info!("{:<12} --> closed expired listing {}", "Sweep", listing_id);
            }
            Ok(closed)
        }
        Err(e) => {
            warn!(
                "{:<12} --> close of listing {} failed, retried on next access: {:?}",
                "Sweep", listing_id, e
            );
            Ok(false)
        }
    }
}

/// Batch sweep: close every open listing whose `end_date` has passed, in
/// one multi-row write, throttled by `state`.
///
/// Returns the number of listings closed; 0 inside the cooldown window.
/// The transition is idempotent, so a duplicate execution when the
/// cooldown check itself races is harmless.
pub async fn sweep_expired(db: &DatabaseManager, state: &mut SweepState, now: DateTime<Utc>) -> u64 {
    if !state.due(now) {
        debug!("{:<12} --> batch sweep skipped (inside cooldown)", "Sweep");
        return 0;
    }

    match sqlx::query(SWEEP_EXPIRED_LISTINGS)
        .bind(EXPIRED_BUYER_ID)
        .bind(EXPIRED_BUYER_EMAIL)
        .bind(now)
        .execute(&*db.pool)
        .await
    {
        Ok(result) => {
            state.last_run_at = Some(now);
            let count = result.rows_affected();
            info!("{:<12} --> batch sweep closed {} listings", "Sweep", count);
            count
        }
        Err(e) => {
            // last_run_at stays unset so the next tick retries
            error!("{:<12} --> batch sweep failed: {:?}", "Sweep", e);
            0
        }
    }
}

// endregion: --- Sweep Operations

// region:    --- Market Scheduler

/// Re-pricing cadence for open listings.
pub const PRICE_REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

/// How often the sweep throttle is consulted (the cooldown decides whether
/// the batch actually runs).
pub const SWEEP_CHECK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Background loops for the marketplace: periodic price re-evaluation and
/// the throttled expiration sweep.
pub struct MarketScheduler {
    db: Arc<DatabaseManager>,
    sweep_state: Arc<Mutex<SweepState>>,
}

/// Handles for the spawned loops; abort them when the service (or the
/// observing frontend session) is torn down so no orphaned timers remain.
#[derive(Debug)]
pub struct SchedulerHandles {
    pub price_refresh: JoinHandle<()>,
    pub sweep: JoinHandle<()>,
}

impl SchedulerHandles {
    pub fn abort(&self) {
        self.price_refresh.abort();
        self.sweep.abort();
    }
}

impl MarketScheduler {
    pub fn new(db: Arc<DatabaseManager>, sweep_state: Arc<Mutex<SweepState>>) -> Self {
        Self { db, sweep_state }
    }

    /// Spawn both loops.
    pub fn start(&self) -> SchedulerHandles {
        let db = Arc::clone(&self.db);
        let price_refresh = tokio::spawn(async move {
            let mut tick = interval(PRICE_REFRESH_INTERVAL);
            loop {
                tick.tick().await;
                match Self::refresh_prices(&db, Utc::now()).await {
                    Ok(count) => {
                        debug!("{:<12} --> re-priced {} open listings", "Scheduler", count)
                    }
                    Err(e) => error!("{:<12} --> price refresh failed: {:?}", "Scheduler", e),
                }
            }
        });

        let db = Arc::clone(&self.db);
        let sweep_state = Arc::clone(&self.sweep_state);
        let sweep = tokio::spawn(async move {
            let mut tick = interval(SWEEP_CHECK_INTERVAL);
            loop {
                tick.tick().await;
                let mut state = sweep_state.lock().await;
                sweep_expired(&db, &mut state, Utc::now()).await;
            }
        });

        SchedulerHandles {
            price_refresh,
            sweep,
        }
    }

    /// Recompute and persist the decayed price of every open listing.
    ///
    /// Each listing is an independent read-compute-write cycle; a failed
    /// write is logged and picked up on the next tick.
    async fn refresh_prices(db: &DatabaseManager, now: DateTime<Utc>) -> Result<u64, MarketError> {
        let listings = query::handlers::get_active_listings(db).await?;
        let mut noise = MarketNoise::new();
        let mut updated = 0u64;
        for listing in listings {
            let price = listing.live_price(now, &mut noise);
            match sqlx::query(UPDATE_CURRENT_PRICE)
                .bind(listing.id)
                .bind(price)
                .execute(&*db.pool)
                .await
            {
                Ok(result) => updated += result.rows_affected(),
                Err(e) => warn!(
                    "{:<12} --> re-pricing listing {} failed: {:?}",
                    "Scheduler", listing.id, e
                ),
            }
        }
        Ok(updated)
    }
}

// endregion: --- Market Scheduler

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_due() {
        let state = SweepState::daily();
        assert!(state.due(Utc::now()));
    }

    #[test]
    fn state_is_not_due_inside_cooldown() {
        let now = Utc::now();
        let mut state = SweepState::daily();
        state.last_run_at = Some(now);
        assert!(!state.due(now + Duration::hours(1)));
        assert!(!state.due(now + Duration::hours(23)));
    }

    #[test]
    fn state_is_due_again_after_cooldown() {
        let now = Utc::now();
        let mut state = SweepState::daily();
        state.last_run_at = Some(now);
        assert!(state.due(now + Duration::hours(24)));
        assert!(state.due(now + Duration::days(3)));
    }

    #[test]
    fn custom_cooldown_is_respected() {
        let now = Utc::now();
        let mut state = SweepState::new(Duration::minutes(10));
        state.last_run_at = Some(now);
        assert!(!state.due(now + Duration::minutes(9)));
        assert!(state.due(now + Duration::minutes(10)));
    }
}

// endregion: --- Tests
