// region:    --- Imports
use crate::database::DatabaseManager;
use crate::handlers::AppState;
use crate::media::HttpImageHost;
use crate::sweep::{MarketScheduler, SweepState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod database;
mod error;
mod handlers;
mod listing;
mod media;
mod pricing;
mod query;
mod sweep;
mod wishlist;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging init
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // database setup
    let db = Arc::new(DatabaseManager::new().await?);
    if let Err(e) = db.initialize_database().await {
        error!("{:<12} --> database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> database ready", "Main");

    // explicit throttle state for the batch expiration sweep
    let sweep_state = Arc::new(Mutex::new(SweepState::default()));

    // background loops: periodic re-pricing + throttled expiration sweep
    let scheduler = MarketScheduler::new(Arc::clone(&db), Arc::clone(&sweep_state));
    let scheduler_handles = scheduler.start();
    info!("{:<12} --> scheduler started", "Main");

    let state = Arc::new(AppState {
        db,
        sweep_state,
        image_host: Arc::new(HttpImageHost::from_env()),
    });

    // cors for the browser frontend
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // routes
    let routes_all = Router::new()
        .route(
            "/listings",
            post(handlers::handle_create_listing).get(handlers::handle_get_listings),
        )
        .route(
            "/listings/:id",
            get(handlers::handle_get_listing)
                .put(handlers::handle_edit_listing)
                .delete(handlers::handle_delete_listing),
        )
        .route("/listings/:id/price", get(handlers::handle_get_listing_price))
        .route("/listings/:id/purchase", post(handlers::handle_purchase))
        .route("/listings/:id/relist", post(handlers::handle_relist))
        .route("/sweep", post(handlers::handle_sweep))
        .route(
            "/wishlist",
            post(handlers::handle_add_wishlist).delete(handlers::handle_remove_wishlist),
        )
        .route("/wishlist/:user_id", get(handlers::handle_get_wishlist))
        .route("/images", post(handlers::handle_upload_image))
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 20)) // image uploads (20MB)
        .with_state(state);

    // listener on port 3000
    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // serve
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> server error: {}", "Main", err);
    }

    // stop the background loops with the server
    scheduler_handles.abort();
    Ok(())
}
// endregion: --- Main
