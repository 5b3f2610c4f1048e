//! Fixtures shared by the marketplace unit tests.

use std::sync::{Arc, OnceLock};

use chrono::Utc;

use crate::config::{AdoptionConfig, SecurityConfig};
use crate::security::hash_password;
use crate::store::MemoryStore;

use super::adoption::{AdoptionRequest, AdoptionService, NewAdoptionRequest};
use super::pets::{NewPet, Pet, PetService};
use super::users::{Role, User, UserId, UserRepository};
use super::Marketplace;

pub(crate) const PASSWORD: &str = "correct-horse-battery";

pub(crate) fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub(crate) fn store_with_service_config() -> (Arc<MemoryStore>, SecurityConfig) {
    (store(), SecurityConfig::development())
}

pub(crate) fn marketplace(store: &Arc<MemoryStore>) -> Arc<Marketplace<MemoryStore>> {
    Arc::new(Marketplace::new(
        store.clone(),
        &SecurityConfig::development(),
        AdoptionConfig::default(),
    ))
}

/// Argon2 is slow on purpose; hash the shared password once per test binary.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash test password"))
        .clone()
}

fn account(username: &str, role: Role) -> User {
    let now = Utc::now();
    User {
        id: UserId::generate(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        full_name: String::new(),
        password_hash: password_hash(),
        role,
        banned: false,
        ban_reason: None,
        suspended_until: None,
        reset_digest: None,
        reset_expires_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// Insert an adopter whose password is [`PASSWORD`].
pub(crate) fn register(store: &Arc<MemoryStore>, username: &str) -> User {
    store
        .insert_user(account(username, Role::Adopter))
        .expect("insert test user")
}

pub(crate) fn admin(store: &Arc<MemoryStore>, username: &str) -> User {
    store
        .insert_user(account(username, Role::Admin))
        .expect("insert test admin")
}

pub(crate) fn new_pet(name: &str, species: &str) -> NewPet {
    NewPet {
        name: name.to_string(),
        species: species.to_string(),
        breed: None,
        age: 2,
        description: Some(format!("{name} is looking for a home")),
        image_urls: vec!["https://images.example.com/pet.png".to_string()],
    }
}

pub(crate) fn list_pet(store: &Arc<MemoryStore>, owner: &User, name: &str) -> Pet {
    PetService::new(store.clone())
        .create(&owner.id, new_pet(name, "dog"), Utc::now())
        .expect("list test pet")
}

pub(crate) fn open_request(
    store: &Arc<MemoryStore>,
    requester: &User,
    pet: &Pet,
) -> AdoptionRequest {
    AdoptionService::new(store.clone(), AdoptionConfig::default())
        .create(
            &requester.id,
            NewAdoptionRequest {
                pet_id: pet.id.clone(),
                message: Some("We have a big garden".to_string()),
            },
            Utc::now(),
        )
        .expect("open test request")
}

/// `Authorization` header value for `user`.
pub(crate) fn bearer(app: &Marketplace<MemoryStore>, user: &User) -> String {
    let issued = app
        .tokens
        .issue(&user.id, user.role, Utc::now())
        .expect("issue token");
    format!("Bearer {}", issued.token)
}
