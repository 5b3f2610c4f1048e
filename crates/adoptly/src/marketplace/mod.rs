//! The adoption marketplace: every component's service plus the HTTP surface over them.

pub mod adoption;
pub mod extract;
pub mod messages;
pub mod moderation;
pub mod pets;
pub mod reviews;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use axum::http::Uri;
use axum::Router;

use crate::config::{AdoptionConfig, SecurityConfig};
use crate::envelope::ApiError;
use crate::security::{MessageCipher, TokenSigner};

use adoption::{AdoptionRepository, AdoptionService};
use messages::{MessageRepository, MessageService};
use moderation::{ModerationService, ReportRepository};
use pets::{PetRepository, PetService};
use reviews::{ReviewRepository, ReviewService};
use users::{UserRepository, UserService};

/// A document store able to back every marketplace component.
pub trait MarketplaceStore:
    UserRepository
    + PetRepository
    + AdoptionRepository
    + MessageRepository
    + ReviewRepository
    + ReportRepository
    + 'static
{
}

impl<T> MarketplaceStore for T where
    T: UserRepository
        + PetRepository
        + AdoptionRepository
        + MessageRepository
        + ReviewRepository
        + ReportRepository
        + 'static
{
}

/// Shared application state handed to every router.
pub struct Marketplace<S> {
    pub users: UserService<S>,
    pub pets: PetService<S>,
    pub adoptions: AdoptionService<S>,
    pub messages: MessageService<S>,
    pub reviews: ReviewService<S>,
    pub moderation: ModerationService<S>,
    pub tokens: TokenSigner,
    pub secure_cookies: bool,
}

impl<S: MarketplaceStore> Marketplace<S> {
    pub fn new(store: Arc<S>, security: &SecurityConfig, adoption: AdoptionConfig) -> Self {
        Self {
            users: UserService::new(store.clone(), security),
            pets: PetService::new(store.clone()),
            adoptions: AdoptionService::new(store.clone(), adoption),
            messages: MessageService::new(
                store.clone(),
                MessageCipher::new(&security.message_key),
            ),
            reviews: ReviewService::new(store.clone()),
            moderation: ModerationService::new(store),
            tokens: TokenSigner::new(&security.token_secret, security.token_ttl_minutes),
            secure_cookies: security.secure_cookies,
        }
    }
}

/// Router builder exposing every marketplace endpoint under `/api/v1`.
pub fn marketplace_router<S: MarketplaceStore>(marketplace: Arc<Marketplace<S>>) -> Router {
    Router::new()
        .merge(users::router::routes::<S>())
        .merge(pets::router::routes::<S>())
        .merge(adoption::router::routes::<S>())
        .merge(messages::router::routes::<S>())
        .merge(reviews::router::routes::<S>())
        .merge(moderation::router::routes::<S>())
        .fallback(unknown_route)
        .with_state(marketplace)
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::not_found(format!("route {} not found", uri.path()))
}
