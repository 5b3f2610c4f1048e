use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::config::{AdoptionConfig, DeleteAuthority};
use crate::marketplace::adoption::AdoptionService;
use crate::marketplace::pets::{AdoptionStatus, Pet, PetId, PetRepository};
use crate::marketplace::testing::{list_pet, register, store};
use crate::marketplace::users::User;
use crate::marketplace::{marketplace_router, testing};
use crate::store::MemoryStore;

/// An owner with one listed pet and a prospective adopter.
pub(super) struct Scenario {
    pub(super) store: Arc<MemoryStore>,
    pub(super) owner: User,
    pub(super) adopter: User,
    pub(super) pet: Pet,
}

pub(super) fn scenario() -> Scenario {
    let store = store();
    let owner = register(&store, "owner");
    let adopter = register(&store, "adopter");
    let pet = list_pet(&store, &owner, "Biscuit");
    Scenario {
        store,
        owner,
        adopter,
        pet,
    }
}

pub(super) fn service(
    store: &Arc<MemoryStore>,
    delete_authority: DeleteAuthority,
) -> AdoptionService<MemoryStore> {
    AdoptionService::new(store.clone(), AdoptionConfig { delete_authority })
}

pub(super) fn pet_status(store: &Arc<MemoryStore>, id: &PetId) -> AdoptionStatus {
    store
        .fetch_pet(id)
        .expect("fetch pet")
        .expect("pet present")
        .adoption_status
}

/// Router over the full marketplace plus a token factory bound to the same signer.
pub(super) fn router(store: &Arc<MemoryStore>) -> (Router, impl Fn(&User) -> String) {
    let app = testing::marketplace(store);
    let tokens = app.clone();
    let router = marketplace_router(app);
    (router, move |user: &User| testing::bearer(&tokens, user))
}

pub(super) fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub(super) fn empty_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, token)
        .body(Body::empty())
        .expect("valid request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
