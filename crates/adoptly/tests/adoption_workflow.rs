use std::sync::Arc;

use adoptly::config::{AdoptionConfig, SecurityConfig};
use adoptly::marketplace::pets::{AdoptionStatus, PetId, PetRepository};
use adoptly::marketplace::{marketplace_router, Marketplace};
use adoptly::store::MemoryStore;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let marketplace = Arc::new(Marketplace::new(
        store.clone(),
        &SecurityConfig::development(),
        AdoptionConfig::default(),
    ));
    (marketplace_router(marketplace), store)
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("valid request");
    router.clone().oneshot(request).await.expect("route executes")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Register an account over HTTP and return `(user id, access token)`.
async fn sign_up(router: &Router, username: &str) -> (String, String) {
    let registered = send(
        router,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.org"),
            "password": "a-long-enough-password",
        })),
    )
    .await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let id = json_body(registered).await["data"]["id"]
        .as_str()
        .expect("user id")
        .to_string();

    let login = send(
        router,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({
            "email": format!("{username}@example.org"),
            "password": "a-long-enough-password",
        })),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);
    assert!(login.headers().contains_key(header::SET_COOKIE));
    let token = json_body(login).await["data"]["accessToken"]
        .as_str()
        .expect("access token")
        .to_string();
    (id, token)
}

fn status_of(store: &MemoryStore, pet_id: &str) -> AdoptionStatus {
    store
        .fetch_pet(&PetId(pet_id.to_string()))
        .expect("store readable")
        .expect("pet exists")
        .adoption_status
}

#[tokio::test]
async fn listing_to_adoption_to_review() {
    let (router, store) = app();
    let (_, owner) = sign_up(&router, "shelter").await;
    let (adopter_id, adopter) = sign_up(&router, "adopter").await;

    let listed = send(
        &router,
        "POST",
        "/api/v1/pets",
        Some(&owner),
        Some(json!({
            "name": "Miso",
            "species": "cat",
            "age": 4,
            "imageUrls": ["https://img.example.org/miso.jpg"],
        })),
    )
    .await;
    assert_eq!(listed.status(), StatusCode::CREATED);
    let pet = json_body(listed).await["data"].clone();
    let pet_id = pet["id"].as_str().expect("pet id").to_string();
    assert_eq!(pet["breed"], "mixed");
    assert_eq!(pet["adoptionStatus"], "available");

    let search = send(
        &router,
        "GET",
        "/api/v1/pets?species=CAT&status=available",
        None,
        None,
    )
    .await;
    assert_eq!(search.status(), StatusCode::OK);
    assert_eq!(json_body(search).await["data"]["total"], 1);

    let requested = send(
        &router,
        "POST",
        "/api/v1/adoptions",
        Some(&adopter),
        Some(json!({ "petId": pet_id, "message": "Quiet flat, lots of sun" })),
    )
    .await;
    assert_eq!(requested.status(), StatusCode::CREATED);
    let request = json_body(requested).await["data"].clone();
    assert_eq!(request["requesterId"], adopter_id.as_str());
    assert_eq!(status_of(&store, &pet_id), AdoptionStatus::Pending);

    let hidden = send(&router, "GET", "/api/v1/pets?status=available", None, None).await;
    assert_eq!(json_body(hidden).await["data"]["total"], 0);

    let request_uri = format!("/api/v1/adoptions/{}", request["id"].as_str().expect("id"));
    let approved = send(
        &router,
        "PATCH",
        &request_uri,
        Some(&owner),
        Some(json!({ "status": "approved" })),
    )
    .await;
    assert_eq!(approved.status(), StatusCode::OK);
    assert_eq!(status_of(&store, &pet_id), AdoptionStatus::Adopted);

    let late = send(
        &router,
        "PATCH",
        &request_uri,
        Some(&owner),
        Some(json!({ "status": "rejected" })),
    )
    .await;
    assert_eq!(late.status(), StatusCode::BAD_REQUEST);
    assert_eq!(status_of(&store, &pet_id), AdoptionStatus::Adopted);

    let reviews_uri = format!("/api/v1/pets/{pet_id}/reviews");
    let reviewed = send(
        &router,
        "POST",
        &reviews_uri,
        Some(&adopter),
        Some(json!({ "rating": 4, "comment": "Settled in within a day" })),
    )
    .await;
    assert_eq!(reviewed.status(), StatusCode::CREATED);

    let again = send(
        &router,
        "POST",
        &reviews_uri,
        Some(&adopter),
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);

    let own = send(
        &router,
        "POST",
        &reviews_uri,
        Some(&owner),
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(own.status(), StatusCode::BAD_REQUEST);

    let listing = json_body(send(&router, "GET", &reviews_uri, None, None).await).await;
    assert_eq!(listing["data"]["summary"]["count"], 1);
    assert_eq!(listing["data"]["summary"]["averageRating"], 4.0);
}

#[tokio::test]
async fn competing_requests_only_one_gets_the_pet() {
    let (router, store) = app();
    let (_, owner) = sign_up(&router, "owner").await;
    let (_, first) = sign_up(&router, "first_family").await;
    let (_, second) = sign_up(&router, "second_family").await;

    let listed = send(
        &router,
        "POST",
        "/api/v1/pets",
        Some(&owner),
        Some(json!({ "name": "Rex", "species": "dog", "age": 1 })),
    )
    .await;
    let pet_id = json_body(listed).await["data"]["id"]
        .as_str()
        .expect("pet id")
        .to_string();

    let winner = send(
        &router,
        "POST",
        "/api/v1/adoptions",
        Some(&first),
        Some(json!({ "petId": pet_id })),
    )
    .await;
    assert_eq!(winner.status(), StatusCode::CREATED);

    let loser = send(
        &router,
        "POST",
        "/api/v1/adoptions",
        Some(&second),
        Some(json!({ "petId": pet_id })),
    )
    .await;
    assert_eq!(loser.status(), StatusCode::BAD_REQUEST);
    let body = json_body(loser).await;
    assert_eq!(body["success"], false);
    assert_eq!(status_of(&store, &pet_id), AdoptionStatus::Pending);

    let locked = send(
        &router,
        "DELETE",
        &format!("/api/v1/pets/{pet_id}"),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(locked.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_routes_and_bad_tokens_use_the_envelope() {
    let (router, _) = app();

    let tampered = send(&router, "GET", "/api/v1/users/me", Some("not.a.token"), None).await;
    assert_eq!(tampered.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(tampered).await;
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["success"], false);

    let missing = send(&router, "GET", "/api/v1/pets/does-not-exist", None, None).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(missing).await["message"], "pet not found");

    let unknown = send(&router, "GET", "/api/v1/kennels", None, None).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let body = json_body(unknown).await;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
}
