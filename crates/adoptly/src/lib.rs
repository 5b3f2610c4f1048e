//! Adoptly: a pet adoption marketplace backend.
//!
//! Accounts, pet listings, adoption requests, encrypted messaging, reviews, and
//! moderation are exposed as an axum router over a pluggable document store.

pub mod config;
pub mod envelope;
pub mod error;
pub mod marketplace;
pub mod security;
pub mod store;
pub mod telemetry;

pub use config::AppConfig;
pub use error::AppError;
pub use marketplace::{marketplace_router, Marketplace, MarketplaceStore};
pub use store::MemoryStore;
