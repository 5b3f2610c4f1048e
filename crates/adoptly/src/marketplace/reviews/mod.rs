//! Pet reviews: one per author and pet, with per-pet rating aggregates.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{NewReview, PetReviews, Review, ReviewId, ReviewSummary, ReviewUpdate};
pub use repository::ReviewRepository;
pub use service::{ReviewService, ReviewServiceError};
