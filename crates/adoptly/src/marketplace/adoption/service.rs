use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{AdoptionConfig, DeleteAuthority};
use crate::marketplace::pets::{AdoptionStatus, Pet, PetId, PetRepository};
use crate::marketplace::users::{User, UserId};
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{
    AdoptionFilter, AdoptionRequest, NewAdoptionRequest, PetTransition, RequestId, RequestStatus,
    StatusChange,
};
use super::repository::AdoptionRepository;

const MAX_MESSAGE_LENGTH: usize = 1000;

/// Coordinates adoption requests with the status of the pets they target.
pub struct AdoptionService<R> {
    repository: Arc<R>,
    config: AdoptionConfig,
}

impl<R> AdoptionService<R>
where
    R: AdoptionRepository + PetRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: AdoptionConfig) -> Self {
        Self { repository, config }
    }

    /// Open a pending request and move the pet from `available` to `pending`.
    pub fn create(
        &self,
        requester: &UserId,
        new_request: NewAdoptionRequest,
        now: DateTime<Utc>,
    ) -> Result<AdoptionRequest, AdoptionServiceError> {
        let message = validate_message(new_request.message.as_deref())?;
        let pet = self.pet(&new_request.pet_id)?;

        if &pet.owner_id == requester {
            return Err(AdoptionServiceError::OwnPet);
        }
        if self.repository.find_request(requester, &pet.id)?.is_some() {
            return Err(AdoptionServiceError::AlreadyRequested);
        }
        if pet.adoption_status != AdoptionStatus::Available {
            return Err(AdoptionServiceError::PetUnavailable(pet.adoption_status));
        }

        let request = AdoptionRequest {
            id: RequestId::generate(),
            requester_id: requester.clone(),
            pet_id: pet.id.clone(),
            status: RequestStatus::Pending,
            message,
            requested_at: now,
            approved_at: None,
            decided_at: None,
        };
        let transition = PetTransition::new(
            pet.id.clone(),
            AdoptionStatus::Available,
            AdoptionStatus::Pending,
        );

        let stored = self
            .repository
            .open_request(request, transition)
            .map_err(|err| match err {
                RepositoryError::Conflict => AdoptionServiceError::AlreadyRequested,
                RepositoryError::NotFound => AdoptionServiceError::PetNotFound,
                other => stale_or_repository(other, "open"),
            })?;
        info!(
            request_id = %stored.id,
            pet_id = %stored.pet_id,
            requester_id = %requester,
            "adoption request opened"
        );
        Ok(stored)
    }

    /// Approve or reject a pending request on behalf of the pet's owner.
    pub fn update_status(
        &self,
        actor: &UserId,
        id: &RequestId,
        change: StatusChange,
        now: DateTime<Utc>,
    ) -> Result<AdoptionRequest, AdoptionServiceError> {
        let request = self.request(id)?;
        let pet = self.pet(&request.pet_id)?;
        if &pet.owner_id != actor {
            return Err(AdoptionServiceError::NotPetOwner);
        }

        let target = RequestStatus::parse(&change.status)
            .filter(|status| status.is_terminal())
            .ok_or(AdoptionServiceError::InvalidStatus(change.status))?;
        if request.status != RequestStatus::Pending {
            return Err(AdoptionServiceError::AlreadyDecided(request.status));
        }

        let mut settled = request;
        settled.status = target;
        settled.decided_at = Some(now);
        if target == RequestStatus::Approved {
            settled.approved_at = Some(now);
        }
        let transition = PetTransition::new(pet.id, AdoptionStatus::Pending, target.pet_status());

        let stored = self
            .repository
            .settle_request(settled, RequestStatus::Pending, transition)
            .map_err(|err| match err {
                RepositoryError::NotFound => AdoptionServiceError::RequestNotFound,
                other => stale_or_repository(other, "settle"),
            })?;
        info!(
            request_id = %stored.id,
            pet_id = %stored.pet_id,
            status = %stored.status,
            "adoption request settled"
        );
        Ok(stored)
    }

    /// Withdraw a pending request and return the pet to `available`.
    pub fn delete(
        &self,
        actor: &UserId,
        id: &RequestId,
        now: DateTime<Utc>,
    ) -> Result<AdoptionRequest, AdoptionServiceError> {
        let request = self.request(id)?;
        let pet = self.pet(&request.pet_id)?;

        let is_requester = &request.requester_id == actor;
        let is_owner = &pet.owner_id == actor;
        let allowed = match self.config.delete_authority {
            DeleteAuthority::Requester => is_requester,
            DeleteAuthority::PetOwner => is_owner,
            DeleteAuthority::Either => is_requester || is_owner,
        };
        if !allowed {
            return Err(AdoptionServiceError::NotAuthorized);
        }
        if request.status != RequestStatus::Pending {
            return Err(AdoptionServiceError::NotPending(request.status));
        }

        let transition =
            PetTransition::new(pet.id, AdoptionStatus::Pending, AdoptionStatus::Available);
        let removed = self
            .repository
            .withdraw_request(id, RequestStatus::Pending, transition, now)
            .map_err(|err| match err {
                RepositoryError::NotFound => AdoptionServiceError::RequestNotFound,
                other => stale_or_repository(other, "withdraw"),
            })?;
        info!(request_id = %removed.id, actor_id = %actor, "adoption request withdrawn");
        Ok(removed)
    }

    /// Visible to the requester, the pet's owner, and admins.
    pub fn get(&self, viewer: &User, id: &RequestId) -> Result<AdoptionRequest, AdoptionServiceError> {
        let request = self.request(id)?;
        if viewer.is_admin() || request.requester_id == viewer.id {
            return Ok(request);
        }
        let pet = self.pet(&request.pet_id)?;
        if pet.owner_id == viewer.id {
            Ok(request)
        } else {
            Err(AdoptionServiceError::NotAuthorized)
        }
    }

    pub fn list(
        &self,
        filter: &AdoptionFilter,
        page: Page,
    ) -> Result<Paged<AdoptionRequest>, AdoptionServiceError> {
        Ok(self.repository.query_requests(filter, page)?)
    }

    /// Requests on one pet, for its owner or an admin.
    pub fn list_for_pet(
        &self,
        viewer: &User,
        pet_id: &PetId,
        status: Option<RequestStatus>,
        page: Page,
    ) -> Result<Paged<AdoptionRequest>, AdoptionServiceError> {
        let pet = self.pet(pet_id)?;
        if !viewer.is_admin() && pet.owner_id != viewer.id {
            return Err(AdoptionServiceError::NotPetOwner);
        }
        let filter = AdoptionFilter {
            pet: Some(pet.id),
            status,
            ..AdoptionFilter::default()
        };
        self.list(&filter, page)
    }

    fn request(&self, id: &RequestId) -> Result<AdoptionRequest, AdoptionServiceError> {
        self.repository
            .fetch_request(id)?
            .ok_or(AdoptionServiceError::RequestNotFound)
    }

    fn pet(&self, id: &PetId) -> Result<Pet, AdoptionServiceError> {
        self.repository
            .fetch_pet(id)?
            .ok_or(AdoptionServiceError::PetNotFound)
    }
}

fn validate_message(raw: Option<&str>) -> Result<Option<String>, AdoptionServiceError> {
    let message = match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(message) => message,
        None => return Ok(None),
    };
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AdoptionServiceError::Invalid(format!(
            "message must be at most {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(Some(message.to_string()))
}

fn stale_or_repository(error: RepositoryError, operation: &str) -> AdoptionServiceError {
    match error {
        RepositoryError::Stale => {
            warn!(operation, "adoption write lost a race");
            AdoptionServiceError::Concurrent
        }
        other => AdoptionServiceError::Repository(other),
    }
}

/// Error raised by the adoption service.
#[derive(Debug, thiserror::Error)]
pub enum AdoptionServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("pet not found")]
    PetNotFound,
    #[error("adoption request not found")]
    RequestNotFound,
    #[error("pet is not available for adoption (currently {0})")]
    PetUnavailable(AdoptionStatus),
    #[error("you cannot request to adopt your own pet")]
    OwnPet,
    #[error("adoption request already exists")]
    AlreadyRequested,
    #[error("only the pet's owner can do that")]
    NotPetOwner,
    #[error("not authorized to access this adoption request")]
    NotAuthorized,
    #[error("invalid status '{0}': expected approved or rejected")]
    InvalidStatus(String),
    #[error("adoption request has already been {0}")]
    AlreadyDecided(RequestStatus),
    #[error("only pending requests can be deleted (request is {0})")]
    NotPending(RequestStatus),
    #[error("adoption request was modified concurrently, retry")]
    Concurrent,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
