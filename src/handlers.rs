// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::listing::commands::{
    self, CreateListingCommand, DeleteListingCommand, EditListingCommand, PurchaseCommand,
    RelistCommand,
};
use crate::listing::model::Listing;
use crate::media::ImageHost;
use crate::query;
use crate::query::handlers::PriceView;
use crate::sweep::{self, SweepState};
use crate::wishlist::{self, WishlistCommand};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

// endregion: --- Imports

// region:    --- App State

/// Shared service state handed to every route.
pub struct AppState {
    pub db: Arc<DatabaseManager>,
    pub sweep_state: Arc<Mutex<SweepState>>,
    pub image_host: Arc<dyn ImageHost>,
}

// endregion: --- App State

// region:    --- Command Handlers

/// Create a listing.
pub async fn handle_create_listing(
    State(state): State<Arc<AppState>>,
    Json(cmd): Json<CreateListingCommand>,
) -> Result<impl IntoResponse, MarketError> {
    info!("{:<12} --> create listing request: {:?}", "Handler", cmd.title);
    let listing = commands::create_listing(&state.db, cmd, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// Purchase a listing at its current decayed price.
pub async fn handle_purchase(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
    Json(cmd): Json<PurchaseCommand>,
) -> Result<Json<Listing>, MarketError> {
    info!(
        "{:<12} --> purchase request listing {} by {}",
        "Handler", listing_id, cmd.buyer_id
    );
    let listing = commands::purchase(&state.db, listing_id, cmd, Utc::now()).await?;
    Ok(Json(listing))
}

/// Reopen a terminal listing with a fresh window.
pub async fn handle_relist(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
    Json(cmd): Json<RelistCommand>,
) -> Result<Json<Listing>, MarketError> {
    info!("{:<12} --> relist request listing {}", "Handler", listing_id);
    let listing = commands::relist(&state.db, listing_id, cmd, Utc::now()).await?;
    Ok(Json(listing))
}

/// Edit an active listing.
pub async fn handle_edit_listing(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
    Json(cmd): Json<EditListingCommand>,
) -> Result<Json<Listing>, MarketError> {
    info!("{:<12} --> edit request listing {}", "Handler", listing_id);
    let listing = commands::edit_listing(&state.db, listing_id, cmd, Utc::now()).await?;
    Ok(Json(listing))
}

/// Delete a listing.
pub async fn handle_delete_listing(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
    Json(cmd): Json<DeleteListingCommand>,
) -> Result<StatusCode, MarketError> {
    info!("{:<12} --> delete request listing {}", "Handler", listing_id);
    commands::delete_listing(&state.db, listing_id, cmd).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run the throttled batch sweep.
pub async fn handle_sweep(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    info!("{:<12} --> batch sweep request", "Handler");
    let mut sweep_state = state.sweep_state.lock().await;
    let count = sweep::sweep_expired(&state.db, &mut sweep_state, Utc::now()).await;
    Json(serde_json::json!({ "count": count }))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

#[derive(Debug, Deserialize)]
pub struct ListingFilter {
    pub community: Option<String>,
    pub seller: Option<String>,
}

/// Browse listings, optionally filtered by community tag or seller.
pub async fn handle_get_listings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<ListingFilter>,
) -> Result<Json<Vec<Listing>>, MarketError> {
    info!("{:<12} --> browse listings", "Handler");
    let listings = match (filter.community, filter.seller) {
        (Some(community), _) => {
            query::handlers::get_listings_by_community(&state.db, community).await?
        }
        (None, Some(seller)) => query::handlers::get_listings_by_seller(&state.db, seller).await?,
        (None, None) => query::handlers::get_all_listings(&state.db).await?,
    };
    Ok(Json(listings))
}

/// Fetch one listing. Reads piggyback the single-item expiry check, so an
/// overdue listing is closed on first access rather than waiting for the
/// batch sweep.
pub async fn handle_get_listing(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
) -> Result<Json<Listing>, MarketError> {
    info!("{:<12} --> get listing {}", "Handler", listing_id);
    sweep::close_if_expired(&state.db, listing_id, Utc::now()).await?;
    let listing = query::handlers::get_listing(&state.db, listing_id).await?;
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    /// Evaluation instant; defaults to now. Historical instants give the
    /// deterministic "price N minutes ago" used by trend displays.
    pub at: Option<DateTime<Utc>>,
}

/// Deterministic decayed price of a listing at a point in time.
pub async fn handle_get_listing_price(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<i64>,
    Query(q): Query<PriceQuery>,
) -> Result<Json<PriceView>, MarketError> {
    info!("{:<12} --> price lookup listing {}", "Handler", listing_id);
    let view = query::handlers::get_listing_price(&state.db, listing_id, q.at).await?;
    Ok(Json(view))
}

// endregion: --- Query Handlers

// region:    --- Wishlist Handlers

pub async fn handle_add_wishlist(
    State(state): State<Arc<AppState>>,
    Json(cmd): Json<WishlistCommand>,
) -> Result<StatusCode, MarketError> {
    wishlist::add_entry(&state.db, cmd).await?;
    Ok(StatusCode::CREATED)
}

pub async fn handle_remove_wishlist(
    State(state): State<Arc<AppState>>,
    Json(cmd): Json<WishlistCommand>,
) -> Result<StatusCode, MarketError> {
    wishlist::remove_entry(&state.db, cmd).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn handle_get_wishlist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Listing>>, MarketError> {
    let listings = query::handlers::get_wishlist_listings(&state.db, user_id).await?;
    Ok(Json(listings))
}

// endregion: --- Wishlist Handlers

// region:    --- Media Handlers

/// Upload an image, answering with the hosted public URL for use as a
/// listing's `image_url`.
pub async fn handle_upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, MarketError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let url = state.image_host.upload(body.to_vec(), &content_type).await?;
    Ok(Json(serde_json::json!({ "url": url })))
}

// endregion: --- Media Handlers
