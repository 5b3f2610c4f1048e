use chrono::{DateTime, Utc};

use crate::marketplace::pets::PetId;
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{Review, ReviewId, ReviewSummary};

/// Storage abstraction for pet reviews.
pub trait ReviewRepository: Send + Sync {
    /// `Conflict` when the author already reviewed the pet, `NotFound` when the pet is gone.
    fn insert_review(&self, review: Review) -> Result<Review, RepositoryError>;
    fn fetch_review(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn update_review(&self, review: Review) -> Result<Review, RepositoryError>;
    /// Open reports against the review are dismissed in the same write.
    fn delete_review(&self, id: &ReviewId, now: DateTime<Utc>) -> Result<Review, RepositoryError>;
    /// Newest reviews first.
    fn reviews_for_pet(&self, pet: &PetId, page: Page) -> Result<Paged<Review>, RepositoryError>;
    fn review_summary(&self, pet: &PetId) -> Result<ReviewSummary, RepositoryError>;
}
