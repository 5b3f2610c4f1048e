//! Adoption requests and their `pending → approved | rejected` workflow.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AdoptionFilter, AdoptionRequest, NewAdoptionRequest, PetTransition, RequestId, RequestStatus,
    StatusChange,
};
pub use repository::AdoptionRepository;
pub use service::{AdoptionService, AdoptionServiceError};
