/// Wishlist bookkeeping. Entries reference listings; purchase and delete
/// clear them so nobody keeps watching a closed item.
// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::MarketError;
use crate::query;
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Statements

const ADD_WISHLIST_ENTRY: &str = r#"
    INSERT INTO wishlist (user_id, listing_id)
    VALUES ($1, $2)
    ON CONFLICT (user_id, listing_id) DO NOTHING
"#;

const REMOVE_WISHLIST_ENTRY: &str =
    "DELETE FROM wishlist WHERE user_id = $1 AND listing_id = $2";

// endregion: --- Statements

// region:    --- Commands

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistCommand {
    pub user_id: String,
    pub listing_id: i64,
}

/// Add a listing to a user's wishlist. Idempotent.
pub async fn add_entry(db: &DatabaseManager, cmd: WishlistCommand) -> Result<(), MarketError> {
    info!(
        "{:<12} --> wishlist add listing {} for {}",
        "Wishlist", cmd.listing_id, cmd.user_id
    );
    // surface a clean NotFound instead of a foreign key violation
    query::handlers::get_listing(db, cmd.listing_id).await?;

    db.transaction(move |tx| {
        Box::pin(async move {
            sqlx::query(ADD_WISHLIST_ENTRY)
                .bind(&cmd.user_id)
                .bind(cmd.listing_id)
                .execute(&mut **tx)
                .await?;
            Ok(())
        })
    })
    .await
}

/// Remove a listing from a user's wishlist. Removing an absent entry is a
/// no-op.
pub async fn remove_entry(db: &DatabaseManager, cmd: WishlistCommand) -> Result<(), MarketError> {
    info!(
        "{:<12} --> wishlist remove listing {} for {}",
        "Wishlist", cmd.listing_id, cmd.user_id
    );
    db.transaction(move |tx| {
        Box::pin(async move {
            sqlx::query(REMOVE_WISHLIST_ENTRY)
                .bind(&cmd.user_id)
                .bind(cmd.listing_id)
                .execute(&mut **tx)
                .await?;
            Ok(())
        })
    })
    .await
}

// endregion: --- Commands
