pub mod database;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod media;
pub mod pricing;
pub mod query;
pub mod sweep;
pub mod wishlist;
