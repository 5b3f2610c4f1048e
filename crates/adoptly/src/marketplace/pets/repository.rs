use chrono::{DateTime, Utc};

use crate::store::{Page, Paged, RepositoryError};

use super::domain::{Pet, PetFilter, PetId};

/// Storage abstraction for pet listings.
pub trait PetRepository: Send + Sync {
    fn insert_pet(&self, pet: Pet) -> Result<Pet, RepositoryError>;
    fn fetch_pet(&self, id: &PetId) -> Result<Option<Pet>, RepositoryError>;
    /// Replace descriptive fields. The stored adoption status is kept as-is; only the adoption
    /// workflow's guarded writes move it.
    fn update_pet_details(&self, pet: Pet) -> Result<Pet, RepositoryError>;
    /// Remove the pet together with its adoption requests and reviews, dismissing open reports
    /// against those reviews. Without `force` the pet must still be available, otherwise `Stale`
    /// is returned.
    fn remove_pet(
        &self,
        id: &PetId,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<Pet, RepositoryError>;
    /// Newest listings first.
    fn search_pets(&self, filter: &PetFilter, page: Page) -> Result<Paged<Pet>, RepositoryError>;
}
