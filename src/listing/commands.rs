/// Listing lifecycle commands.
/// 1. Create
/// 2. Purchase
/// 3. Relist
/// 4. Edit
/// 5. Delete
// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::listing::model::{LifecycleState, Listing};
use crate::query;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Statements

const INSERT_LISTING: &str = r#"
    INSERT INTO listings (title, description, listed_price, minimum_price, current_price,
                          created_at, end_date, is_bought, seller_id, seller_email,
                          image_url, communities)
    VALUES ($1, $2, $3, $4, $3, $5, $6, FALSE, $7, $8, $9, $10)
    RETURNING *
"#;

/// Conditional write: the `is_bought = FALSE` predicate closes the
/// check-then-act window between the guard read and the update, so two
/// racing purchases cannot both land.
const PURCHASE_LISTING: &str = r#"
    UPDATE listings
    SET is_bought = TRUE, buyer_id = $2, buyer_email = $3, current_price = $4
    WHERE id = $1 AND is_bought = FALSE
    RETURNING *
"#;

const RELIST_LISTING: &str = r#"
    UPDATE listings
    SET is_bought = FALSE, buyer_id = NULL, buyer_email = NULL,
        created_at = $2, end_date = $3,
        listed_price = $4, minimum_price = $5, current_price = $4
    WHERE id = $1
    RETURNING *
"#;

const EDIT_LISTING: &str = r#"
    UPDATE listings
    SET title = $2, description = $3, listed_price = $4, minimum_price = $5,
        current_price = $6, end_date = $7, image_url = $8, communities = $9
    WHERE id = $1 AND is_bought = FALSE
    RETURNING *
"#;

const DELETE_LISTING: &str = "DELETE FROM listings WHERE id = $1";

const CLEAR_WISHLIST_FOR_LISTING: &str = "DELETE FROM wishlist WHERE listing_id = $1";

// endregion: --- Statements

// region:    --- Commands

/// Create a new listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListingCommand {
    pub title: String,
    pub description: String,
    pub listed_price: f64,
    pub minimum_price: f64,
    pub end_date: DateTime<Utc>,
    pub seller_id: String,
    pub seller_email: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub communities: Vec<String>,
}

/// Buy a listing at its current decayed price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseCommand {
    pub buyer_id: String,
    pub buyer_email: String,
}

/// Reopen a listing with a fresh auction window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelistCommand {
    pub actor_id: String,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub listed_price: Option<f64>,
    #[serde(default)]
    pub minimum_price: Option<f64>,
}

/// Edit non-identity fields of an active listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditListingCommand {
    pub actor_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub listed_price: Option<f64>,
    #[serde(default)]
    pub minimum_price: Option<f64>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub communities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteListingCommand {
    pub actor_id: String,
}

// endregion: --- Commands

// region:    --- Validation

/// Price-bound invariant: `0 < minimum_price <= listed_price`.
fn validate_price_bounds(listed_price: f64, minimum_price: f64) -> Result<(), MarketError> {
    if !listed_price.is_finite() || !minimum_price.is_finite() {
        return Err(MarketError::InvalidListingParameters(
            "prices must be finite numbers".into(),
        ));
    }
    if minimum_price <= 0.0 {
        return Err(MarketError::InvalidListingParameters(
            "minimum_price must be positive".into(),
        ));
    }
    if minimum_price > listed_price {
        return Err(MarketError::InvalidListingParameters(format!(
            "minimum_price {minimum_price} exceeds listed_price {listed_price}"
        )));
    }
    Ok(())
}

/// Window invariant: `end_date > start`.
fn validate_window(start: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<(), MarketError> {
    if end_date <= start {
        return Err(MarketError::InvalidListingParameters(format!(
            "end_date {end_date} is not after {start}"
        )));
    }
    Ok(())
}

// endregion: --- Validation

// region:    --- Command Handlers

/// 1. Create. The listing starts active with `current_price = listed_price`.
pub async fn create_listing(
    db: &DatabaseManager,
    cmd: CreateListingCommand,
    now: DateTime<Utc>,
) -> Result<Listing, MarketError> {
    info!("{:<12} --> create listing by {}", "Command", cmd.seller_id);
    validate_price_bounds(cmd.listed_price, cmd.minimum_price)?;
    validate_window(now, cmd.end_date)?;

    db.transaction(move |tx| {
        Box::pin(async move {
            let listing = sqlx::query_as::<_, Listing>(INSERT_LISTING)
                .bind(&cmd.title)
                .bind(&cmd.description)
                .bind(cmd.listed_price)
                .bind(cmd.minimum_price)
                .bind(now)
                .bind(cmd.end_date)
                .bind(&cmd.seller_id)
                .bind(&cmd.seller_email)
                .bind(&cmd.image_url)
                .bind(&cmd.communities)
                .fetch_one(&mut **tx)
                .await?;
            Ok(listing)
        })
    })
    .await
}

/// 2. Purchase. Settles at the deterministic decayed price of the purchase
/// instant and clears wishlist references in the same transaction.
pub async fn purchase(
    db: &DatabaseManager,
    listing_id: i64,
    cmd: PurchaseCommand,
    now: DateTime<Utc>,
) -> Result<Listing, MarketError> {
    info!(
        "{:<12} --> purchase listing {} by {}",
        "Command", listing_id, cmd.buyer_id
    );
    let listing = query::handlers::get_listing(db, listing_id).await?;
    if listing.is_seller(&cmd.buyer_id) {
        return Err(MarketError::Unauthorized {
            actor: cmd.buyer_id,
            action: "purchase",
            listing_id,
        });
    }
    if listing.state() != LifecycleState::Active {
        return Err(MarketError::AlreadyTerminal(listing_id));
    }
    let final_price = listing.price_at(now);

    db.transaction(move |tx| {
        Box::pin(async move {
            let updated = sqlx::query_as::<_, Listing>(PURCHASE_LISTING)
                .bind(listing_id)
                .bind(&cmd.buyer_id)
                .bind(&cmd.buyer_email)
                .bind(final_price)
                .fetch_optional(&mut **tx)
                .await?
                // a concurrent purchase or sweep won the race
                .ok_or(MarketError::AlreadyTerminal(listing_id))?;

            sqlx::query(CLEAR_WISHLIST_FOR_LISTING)
                .bind(listing_id)
                .execute(&mut **tx)
                .await?;

            Ok(updated)
        })
    })
    .await
}

/// 3. Relist. Lifecycle reset, not a new entity: the previous terminal
/// state (including sentinel expiry attribution) is fully superseded.
pub async fn relist(
    db: &DatabaseManager,
    listing_id: i64,
    cmd: RelistCommand,
    now: DateTime<Utc>,
) -> Result<Listing, MarketError> {
    info!(
        "{:<12} --> relist listing {} by {}",
        "Command", listing_id, cmd.actor_id
    );
    let listing = query::handlers::get_listing(db, listing_id).await?;
    if !listing.is_seller(&cmd.actor_id) {
        return Err(MarketError::Unauthorized {
            actor: cmd.actor_id,
            action: "relist",
            listing_id,
        });
    }
    let listed_price = cmd.listed_price.unwrap_or(listing.listed_price);
    let minimum_price = cmd.minimum_price.unwrap_or(listing.minimum_price);
    validate_price_bounds(listed_price, minimum_price)?;
    validate_window(now, cmd.end_date)?;

    db.transaction(move |tx| {
        Box::pin(async move {
            let updated = sqlx::query_as::<_, Listing>(RELIST_LISTING)
                .bind(listing_id)
                .bind(now)
                .bind(cmd.end_date)
                .bind(listed_price)
                .bind(minimum_price)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound(listing_id))?;
            Ok(updated)
        })
    })
    .await
}

/// 4. Edit. Active listings only; the current price is re-derived from the
/// merged bounds so the `minimum <= current <= listed` invariant holds.
pub async fn edit_listing(
    db: &DatabaseManager,
    listing_id: i64,
    cmd: EditListingCommand,
    now: DateTime<Utc>,
) -> Result<Listing, MarketError> {
    info!(
        "{:<12} --> edit listing {} by {}",
        "Command", listing_id, cmd.actor_id
    );
    let listing = query::handlers::get_listing(db, listing_id).await?;
    if !listing.is_seller(&cmd.actor_id) {
        return Err(MarketError::Unauthorized {
            actor: cmd.actor_id,
            action: "edit",
            listing_id,
        });
    }
    if listing.state() != LifecycleState::Active {
        return Err(MarketError::AlreadyTerminal(listing_id));
    }

    let title = cmd.title.unwrap_or(listing.title);
    let description = cmd.description.unwrap_or(listing.description);
    let listed_price = cmd.listed_price.unwrap_or(listing.listed_price);
    let minimum_price = cmd.minimum_price.unwrap_or(listing.minimum_price);
    let end_date = cmd.end_date.unwrap_or(listing.end_date);
    let image_url = cmd.image_url.or(listing.image_url);
    let communities = cmd.communities.unwrap_or(listing.communities);

    validate_price_bounds(listed_price, minimum_price)?;
    validate_window(now, end_date)?;

    let current_price = crate::pricing::historical_price(
        listed_price,
        minimum_price,
        listing.created_at,
        end_date,
        now,
    );

    db.transaction(move |tx| {
        Box::pin(async move {
            let updated = sqlx::query_as::<_, Listing>(EDIT_LISTING)
                .bind(listing_id)
                .bind(&title)
                .bind(&description)
                .bind(listed_price)
                .bind(minimum_price)
                .bind(current_price)
                .bind(end_date)
                .bind(&image_url)
                .bind(&communities)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::AlreadyTerminal(listing_id))?;
            Ok(updated)
        })
    })
    .await
}

/// 5. Delete. Irreversible; wishlist rows go with the listing (FK cascade).
pub async fn delete_listing(
    db: &DatabaseManager,
    listing_id: i64,
    cmd: DeleteListingCommand,
) -> Result<(), MarketError> {
    info!(
        "{:<12} --> delete listing {} by {}",
        "Command", listing_id, cmd.actor_id
    );
    let listing = query::handlers::get_listing(db, listing_id).await?;
    if !listing.is_seller(&cmd.actor_id) {
        return Err(MarketError::Unauthorized {
            actor: cmd.actor_id,
            action: "delete",
            listing_id,
        });
    }

    db.transaction(move |tx| {
        Box::pin(async move {
            let result = sqlx::query(DELETE_LISTING)
                .bind(listing_id)
                .execute(&mut **tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MarketError::NotFound(listing_id));
            }
            Ok(())
        })
    })
    .await
}

// endregion: --- Command Handlers

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn bounds_accept_floor_below_listed_price() {
        assert!(validate_price_bounds(100.0, 20.0).is_ok());
        assert!(validate_price_bounds(50.0, 50.0).is_ok());
    }

    #[test]
    fn bounds_reject_floor_above_listed_price() {
        let err = validate_price_bounds(50.0, 80.0).unwrap_err();
        assert!(matches!(err, MarketError::InvalidListingParameters(_)));
    }

    #[test]
    fn bounds_reject_non_positive_floor() {
        assert!(validate_price_bounds(50.0, 0.0).is_err());
        assert!(validate_price_bounds(50.0, -1.0).is_err());
    }

    #[test]
    fn bounds_reject_non_finite_prices() {
        assert!(validate_price_bounds(f64::NAN, 1.0).is_err());
        assert!(validate_price_bounds(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn window_must_end_after_start() {
        let now = Utc::now();
        assert!(validate_window(now, now + Duration::days(1)).is_ok());
        assert!(validate_window(now, now).is_err());
        assert!(validate_window(now, now - Duration::hours(1)).is_err());
    }
}

// endregion: --- Tests
