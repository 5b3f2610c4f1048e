use chrono::{DateTime, Utc};

use crate::marketplace::pets::PetId;
use crate::marketplace::users::UserId;
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{AdoptionFilter, AdoptionRequest, PetTransition, RequestId, RequestStatus};

/// Storage abstraction for adoption requests.
///
/// Every write that touches both a request and its pet is a single guarded operation: the store
/// applies it only when the pet (and, for existing requests, the request) still hold the
/// expected status, and answers `Stale` otherwise.
pub trait AdoptionRepository: Send + Sync {
    fn fetch_request(&self, id: &RequestId) -> Result<Option<AdoptionRequest>, RepositoryError>;
    fn find_request(
        &self,
        requester: &UserId,
        pet: &PetId,
    ) -> Result<Option<AdoptionRequest>, RepositoryError>;
    /// Newest requests first.
    fn query_requests(
        &self,
        filter: &AdoptionFilter,
        page: Page,
    ) -> Result<Paged<AdoptionRequest>, RepositoryError>;
    /// Insert a new request and move the pet. `Conflict` when the requester already has a
    /// request for the pet, `NotFound` when the pet is gone.
    fn open_request(
        &self,
        request: AdoptionRequest,
        pet: PetTransition,
    ) -> Result<AdoptionRequest, RepositoryError>;
    /// Replace a request whose stored status is `expected` and move the pet.
    fn settle_request(
        &self,
        request: AdoptionRequest,
        expected: RequestStatus,
        pet: PetTransition,
    ) -> Result<AdoptionRequest, RepositoryError>;
    /// Remove a request whose stored status is `expected` and move the pet.
    fn withdraw_request(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        pet: PetTransition,
        now: DateTime<Utc>,
    ) -> Result<AdoptionRequest, RepositoryError>;
}
