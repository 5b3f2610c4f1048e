use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::marketplace::users::{User, UserId};
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{AdoptionStatus, NewPet, Pet, PetFilter, PetId, PetUpdate};
use super::repository::PetRepository;

const MAX_NAME_LENGTH: usize = 50;
const MAX_SPECIES_LENGTH: usize = 30;
const MAX_BREED_LENGTH: usize = 50;
const MAX_DESCRIPTION_LENGTH: usize = 2000;
const MAX_AGE_YEARS: u8 = 40;
const MAX_IMAGES: usize = 10;

/// Listing management for pet owners plus the public catalog search.
pub struct PetService<R> {
    repository: Arc<R>,
}

impl<R> PetService<R>
where
    R: PetRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create(
        &self,
        owner: &UserId,
        new_pet: NewPet,
        now: DateTime<Utc>,
    ) -> Result<Pet, PetServiceError> {
        let pet = Pet {
            id: PetId::generate(),
            owner_id: owner.clone(),
            name: required_text("name", &new_pet.name, MAX_NAME_LENGTH)?,
            species: required_text("species", &new_pet.species, MAX_SPECIES_LENGTH)?,
            breed: optional_breed(new_pet.breed.as_deref())?,
            age: validate_age(new_pet.age)?,
            description: validate_description(new_pet.description.as_deref().unwrap_or(""))?,
            image_urls: validate_images(new_pet.image_urls)?,
            adoption_status: AdoptionStatus::Available,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.insert_pet(pet)?;
        info!(pet_id = %stored.id, owner_id = %owner, "pet listed");
        Ok(stored)
    }

    pub fn get(&self, id: &PetId) -> Result<Pet, PetServiceError> {
        self.repository
            .fetch_pet(id)?
            .ok_or(PetServiceError::NotFound)
    }

    pub fn search(&self, filter: &PetFilter, page: Page) -> Result<Paged<Pet>, PetServiceError> {
        if let (Some(min), Some(max)) = (filter.min_age, filter.max_age) {
            if min > max {
                return Err(PetServiceError::Invalid(
                    "minAge cannot exceed maxAge".to_string(),
                ));
            }
        }
        Ok(self.repository.search_pets(filter, page)?)
    }

    pub fn owned_by(&self, owner: &UserId, page: Page) -> Result<Paged<Pet>, PetServiceError> {
        let filter = PetFilter {
            owner: Some(owner.clone()),
            ..PetFilter::default()
        };
        Ok(self.repository.search_pets(&filter, page)?)
    }

    pub fn update(
        &self,
        actor: &UserId,
        id: &PetId,
        update: PetUpdate,
        now: DateTime<Utc>,
    ) -> Result<Pet, PetServiceError> {
        let mut pet = self.get(id)?;
        if &pet.owner_id != actor {
            return Err(PetServiceError::NotOwner);
        }

        if let Some(name) = update.name {
            pet.name = required_text("name", &name, MAX_NAME_LENGTH)?;
        }
        if let Some(species) = update.species {
            pet.species = required_text("species", &species, MAX_SPECIES_LENGTH)?;
        }
        if let Some(breed) = update.breed {
            pet.breed = optional_breed(Some(&breed))?;
        }
        if let Some(age) = update.age {
            pet.age = validate_age(age)?;
        }
        if let Some(description) = update.description {
            pet.description = validate_description(&description)?;
        }
        if let Some(image_urls) = update.image_urls {
            pet.image_urls = validate_images(image_urls)?;
        }
        pet.updated_at = now;

        self.repository
            .update_pet_details(pet)
            .map_err(|err| match err {
                RepositoryError::NotFound => PetServiceError::NotFound,
                other => PetServiceError::Repository(other),
            })
    }

    /// Owners may remove listings that are still available; admins may remove any listing.
    pub fn remove(
        &self,
        actor: &User,
        id: &PetId,
        now: DateTime<Utc>,
    ) -> Result<Pet, PetServiceError> {
        let pet = self.get(id)?;
        let force = actor.is_admin();
        if !force && pet.owner_id != actor.id {
            return Err(PetServiceError::NotOwner);
        }
        if !force && pet.adoption_status != AdoptionStatus::Available {
            return Err(PetServiceError::Locked(pet.adoption_status));
        }

        let removed = self.repository.remove_pet(id, force, now).map_err(|err| match err {
            RepositoryError::NotFound => PetServiceError::NotFound,
            RepositoryError::Stale => PetServiceError::Locked(AdoptionStatus::Pending),
            other => PetServiceError::Repository(other),
        })?;
        info!(pet_id = %id, actor_id = %actor.id, forced = force, "pet removed");
        Ok(removed)
    }
}

fn required_text(field: &str, raw: &str, max: usize) -> Result<String, PetServiceError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(PetServiceError::Invalid(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(PetServiceError::Invalid(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(value.to_string())
}

fn optional_breed(raw: Option<&str>) -> Result<String, PetServiceError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(breed) => required_text("breed", breed, MAX_BREED_LENGTH),
        None => Ok("mixed".to_string()),
    }
}

fn validate_age(age: u8) -> Result<u8, PetServiceError> {
    if age > MAX_AGE_YEARS {
        return Err(PetServiceError::Invalid(format!(
            "age must be at most {MAX_AGE_YEARS} years"
        )));
    }
    Ok(age)
}

fn validate_description(raw: &str) -> Result<String, PetServiceError> {
    let description = raw.trim();
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(PetServiceError::Invalid(format!(
            "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(description.to_string())
}

fn validate_images(urls: Vec<String>) -> Result<Vec<String>, PetServiceError> {
    if urls.len() > MAX_IMAGES {
        return Err(PetServiceError::Invalid(format!(
            "at most {MAX_IMAGES} images are allowed"
        )));
    }
    urls.into_iter()
        .map(|url| {
            let url = url.trim().to_string();
            if url.starts_with("https://") || url.starts_with("http://") {
                Ok(url)
            } else {
                Err(PetServiceError::Invalid(format!(
                    "image url must be http(s): {url}"
                )))
            }
        })
        .collect()
}

/// Error raised by the pet service.
#[derive(Debug, thiserror::Error)]
pub enum PetServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("pet not found")]
    NotFound,
    #[error("only the pet's owner can do that")]
    NotOwner,
    #[error("pet cannot be removed while its adoption is {0}")]
    Locked(AdoptionStatus),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::testing::{admin, list_pet, new_pet, register, store};
    use crate::marketplace::adoption::AdoptionRepository;

    #[test]
    fn create_validates_and_defaults() {
        let store = store();
        let service = PetService::new(store.clone());
        let owner = register(&store, "owner");
        let now = Utc::now();

        let pet = service
            .create(&owner.id, new_pet("Biscuit", "dog"), now)
            .expect("pet created");
        assert_eq!(pet.adoption_status, AdoptionStatus::Available);
        assert_eq!(pet.owner_id, owner.id);
        assert_eq!(pet.breed, "mixed");

        let mut bad = new_pet("   ", "dog");
        assert!(matches!(
            service.create(&owner.id, bad.clone(), now),
            Err(PetServiceError::Invalid(_))
        ));
        bad.name = "Rex".to_string();
        bad.image_urls = vec!["ftp://example.com/rex.png".to_string()];
        assert!(matches!(
            service.create(&owner.id, bad, now),
            Err(PetServiceError::Invalid(_))
        ));
    }

    #[test]
    fn update_is_owner_only_and_keeps_status() {
        let store = store();
        let service = PetService::new(store.clone());
        let owner = register(&store, "owner");
        let stranger = register(&store, "stranger");
        let pet = list_pet(&store, &owner, "Biscuit");

        let update = PetUpdate {
            age: Some(4),
            description: Some("Loves long walks".to_string()),
            ..PetUpdate::default()
        };
        assert!(matches!(
            service.update(&stranger.id, &pet.id, update.clone(), Utc::now()),
            Err(PetServiceError::NotOwner)
        ));

        let updated = service
            .update(&owner.id, &pet.id, update, Utc::now())
            .expect("owner can update");
        assert_eq!(updated.age, 4);
        assert_eq!(updated.description, "Loves long walks");
        assert_eq!(updated.adoption_status, AdoptionStatus::Available);
    }

    #[test]
    fn search_filters_and_paginates() {
        let store = store();
        let service = PetService::new(store.clone());
        let owner = register(&store, "owner");
        for name in ["Ace", "Bolt", "Comet"] {
            list_pet(&store, &owner, name);
        }
        service
            .create(&owner.id, new_pet("Whiskers", "cat"), Utc::now())
            .expect("cat listed");

        let dogs = service
            .search(
                &PetFilter {
                    species: Some("DOG".to_string()),
                    ..PetFilter::default()
                },
                Page::new(Some(1), Some(2)),
            )
            .expect("search");
        assert_eq!(dogs.total, 3);
        assert_eq!(dogs.items.len(), 2);
        assert_eq!(dogs.items[0].name, "Comet", "newest listings first");

        let by_name = service
            .search(
                &PetFilter {
                    q: Some("whisk".to_string()),
                    ..PetFilter::default()
                },
                Page::default(),
            )
            .expect("search");
        assert_eq!(by_name.total, 1);

        assert!(matches!(
            service.search(
                &PetFilter {
                    min_age: Some(5),
                    max_age: Some(2),
                    ..PetFilter::default()
                },
                Page::default(),
            ),
            Err(PetServiceError::Invalid(_))
        ));
    }

    #[test]
    fn remove_respects_adoption_state() {
        let store = store();
        let service = PetService::new(store.clone());
        let owner = register(&store, "owner");
        let adopter = register(&store, "adopter");
        let moderator = admin(&store, "moderator");
        let pet = list_pet(&store, &owner, "Biscuit");

        crate::marketplace::testing::open_request(&store, &adopter, &pet);
        assert!(matches!(
            service.remove(&owner, &pet.id, Utc::now()),
            Err(PetServiceError::Locked(AdoptionStatus::Pending))
        ));

        service
            .remove(&moderator, &pet.id, Utc::now())
            .expect("admins can force removal");
        assert!(matches!(
            service.get(&pet.id),
            Err(PetServiceError::NotFound)
        ));
        assert!(store
            .find_request(&adopter.id, &pet.id)
            .expect("query")
            .is_none());
    }
}
