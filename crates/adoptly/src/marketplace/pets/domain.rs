use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::users::UserId;
use crate::store::Page;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetId(pub String);

impl PetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a pet stands in the adoption workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdoptionStatus {
    Available,
    Pending,
    Adopted,
}

impl AdoptionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AdoptionStatus::Available => "available",
            AdoptionStatus::Pending => "pending",
            AdoptionStatus::Adopted => "adopted",
        }
    }
}

impl fmt::Display for AdoptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: PetId,
    pub owner_id: UserId,
    pub name: String,
    pub species: String,
    pub breed: String,
    /// Age in whole years.
    pub age: u8,
    pub description: String,
    pub image_urls: Vec<String>,
    pub adoption_status: AdoptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPet {
    pub name: String,
    pub species: String,
    #[serde(default)]
    pub breed: Option<String>,
    pub age: u8,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Partial update of a listing's descriptive fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct PetFilter {
    pub species: Option<String>,
    pub breed: Option<String>,
    pub status: Option<AdoptionStatus>,
    pub q: Option<String>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub owner: Option<UserId>,
}

impl PetFilter {
    pub fn matches(&self, pet: &Pet) -> bool {
        if let Some(species) = &self.species {
            if !pet.species.eq_ignore_ascii_case(species.trim()) {
                return false;
            }
        }
        if let Some(breed) = &self.breed {
            if !pet.breed.eq_ignore_ascii_case(breed.trim()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if pet.adoption_status != status {
                return false;
            }
        }
        if let Some(min_age) = self.min_age {
            if pet.age < min_age {
                return false;
            }
        }
        if let Some(max_age) = self.max_age {
            if pet.age > max_age {
                return false;
            }
        }
        if let Some(owner) = &self.owner {
            if &pet.owner_id != owner {
                return false;
            }
        }
        match &self.q {
            Some(q) => {
                let needle = q.trim().to_lowercase();
                pet.name.to_lowercase().contains(&needle)
                    || pet.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Query string accepted by the pet search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetSearchQuery {
    pub species: Option<String>,
    pub breed: Option<String>,
    pub status: Option<AdoptionStatus>,
    pub q: Option<String>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    pub owner: Option<UserId>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PetSearchQuery {
    pub fn into_parts(self) -> (PetFilter, Page) {
        let page = Page::new(self.page, self.limit);
        let filter = PetFilter {
            species: self.species.filter(|value| !value.trim().is_empty()),
            breed: self.breed.filter(|value| !value.trim().is_empty()),
            status: self.status,
            q: self.q.filter(|value| !value.trim().is_empty()),
            min_age: self.min_age,
            max_age: self.max_age,
            owner: self.owner,
        };
        (filter, page)
    }
}
