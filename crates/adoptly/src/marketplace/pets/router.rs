use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde_json::Value;

use crate::envelope::{ApiError, ApiResponse};
use crate::marketplace::extract::{CurrentUser, JsonBody, PageQuery, QueryParams};
use crate::marketplace::{Marketplace, MarketplaceStore};
use crate::store::Paged;

use super::domain::{NewPet, Pet, PetId, PetSearchQuery, PetUpdate};
use super::service::PetServiceError;

pub(crate) fn routes<S: MarketplaceStore>() -> Router<Arc<Marketplace<S>>> {
    Router::new()
        .route(
            "/api/v1/pets",
            get(search_handler::<S>).post(create_handler::<S>),
        )
        .route("/api/v1/pets/mine", get(mine_handler::<S>))
        .route(
            "/api/v1/pets/:pet_id",
            get(get_handler::<S>)
                .patch(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
}

pub(crate) async fn search_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    QueryParams(query): QueryParams<PetSearchQuery>,
) -> Result<ApiResponse<Paged<Pet>>, ApiError> {
    let (filter, page) = query.into_parts();
    let pets = app.pets.search(&filter, page)?;
    Ok(ApiResponse::ok(pets, "pets fetched"))
}

pub(crate) async fn mine_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ApiResponse<Paged<Pet>>, ApiError> {
    let pets = app.pets.owned_by(&user.id, query.page())?;
    Ok(ApiResponse::ok(pets, "your pets fetched"))
}

pub(crate) async fn create_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(new_pet): JsonBody<NewPet>,
) -> Result<ApiResponse<Pet>, ApiError> {
    let pet = app.pets.create(&user.id, new_pet, Utc::now())?;
    Ok(ApiResponse::created(pet, "pet created successfully"))
}

pub(crate) async fn get_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    Path(pet_id): Path<String>,
) -> Result<ApiResponse<Pet>, ApiError> {
    let pet = app.pets.get(&PetId(pet_id))?;
    Ok(ApiResponse::ok(pet, "pet fetched"))
}

pub(crate) async fn update_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(pet_id): Path<String>,
    JsonBody(update): JsonBody<PetUpdate>,
) -> Result<ApiResponse<Pet>, ApiError> {
    let pet = app
        .pets
        .update(&user.id, &PetId(pet_id), update, Utc::now())?;
    Ok(ApiResponse::ok(pet, "pet updated successfully"))
}

pub(crate) async fn delete_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(pet_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.pets.remove(&user, &PetId(pet_id), Utc::now())?;
    Ok(ApiResponse::ok(Value::Null, "pet deleted successfully"))
}

impl From<PetServiceError> for ApiError {
    fn from(error: PetServiceError) -> Self {
        match error {
            PetServiceError::Invalid(_) | PetServiceError::Locked(_) => {
                ApiError::bad_request(error.to_string())
            }
            PetServiceError::NotFound => ApiError::not_found(error.to_string()),
            PetServiceError::NotOwner => ApiError::forbidden(error.to_string()),
            PetServiceError::Repository(_) => ApiError::internal(error),
        }
    }
}
