//! Pet listings and search.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{AdoptionStatus, NewPet, Pet, PetFilter, PetId, PetSearchQuery, PetUpdate};
pub use repository::PetRepository;
pub use service::{PetService, PetServiceError};
