// region:    --- Imports
use super::queries;
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::listing::model::Listing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// Fetch one listing.
pub async fn get_listing(db: &DatabaseManager, listing_id: i64) -> Result<Listing, MarketError> {
    info!("{:<12} --> get listing id: {}", "Query", listing_id);
    db.transaction(move |tx| {
        Box::pin(async move {
            sqlx::query_as::<_, Listing>(queries::GET_LISTING)
                .bind(listing_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(MarketError::NotFound(listing_id))
        })
    })
    .await
}

/// All listings, newest first.
pub async fn get_all_listings(db: &DatabaseManager) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get all listings", "Query");
    db.transaction(|tx| {
        Box::pin(async move {
            let listings = sqlx::query_as::<_, Listing>(queries::GET_ALL_LISTINGS)
                .fetch_all(&mut **tx)
                .await?;
            Ok(listings)
        })
    })
    .await
}

/// Listings that are still open.
pub async fn get_active_listings(db: &DatabaseManager) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get active listings", "Query");
    db.transaction(|tx| {
        Box::pin(async move {
            let listings = sqlx::query_as::<_, Listing>(queries::GET_ACTIVE_LISTINGS)
                .fetch_all(&mut **tx)
                .await?;
            Ok(listings)
        })
    })
    .await
}

/// Listings tagged with `community`.
pub async fn get_listings_by_community(
    db: &DatabaseManager,
    community: String,
) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get listings community: {}", "Query", community);
    db.transaction(move |tx| {
        Box::pin(async move {
            let listings = sqlx::query_as::<_, Listing>(queries::GET_LISTINGS_BY_COMMUNITY)
                .bind(&community)
                .fetch_all(&mut **tx)
                .await?;
            Ok(listings)
        })
    })
    .await
}

/// Listings owned by `seller_id`.
pub async fn get_listings_by_seller(
    db: &DatabaseManager,
    seller_id: String,
) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get listings seller: {}", "Query", seller_id);
    db.transaction(move |tx| {
        Box::pin(async move {
            let listings = sqlx::query_as::<_, Listing>(queries::GET_LISTINGS_BY_SELLER)
                .bind(&seller_id)
                .fetch_all(&mut **tx)
                .await?;
            Ok(listings)
        })
    })
    .await
}

/// Listings on a user's wishlist, most recently added first.
pub async fn get_wishlist_listings(
    db: &DatabaseManager,
    user_id: String,
) -> Result<Vec<Listing>, MarketError> {
    info!("{:<12} --> get wishlist user: {}", "Query", user_id);
    db.transaction(move |tx| {
        Box::pin(async move {
            let listings = sqlx::query_as::<_, Listing>(queries::GET_WISHLIST_LISTINGS)
                .bind(&user_id)
                .fetch_all(&mut **tx)
                .await?;
            Ok(listings)
        })
    })
    .await
}

// endregion: --- Query Handlers

// region:    --- Price View

/// Point-in-time price evaluation of a stored listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct PriceView {
    pub listing_id: i64,
    pub at: DateTime<Utc>,
    /// Deterministic decayed price at `at`.
    pub price: f64,
    /// Last price persisted by the re-pricing loop.
    pub persisted_price: f64,
}

/// Evaluate the deterministic decay curve for a listing at `at` (defaults
/// to now). Reads the listing, computes in-process; no write.
pub async fn get_listing_price(
    db: &DatabaseManager,
    listing_id: i64,
    at: Option<DateTime<Utc>>,
) -> Result<PriceView, MarketError> {
    let listing = get_listing(db, listing_id).await?;
    let at = at.unwrap_or_else(Utc::now);
    Ok(PriceView {
        listing_id,
        at,
        price: listing.price_at(at),
        persisted_price: listing.current_price,
    })
}

// endregion: --- Price View
