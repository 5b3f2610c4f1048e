use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::envelope::{ApiError, ApiResponse};
use crate::marketplace::extract::{AdminUser, CurrentUser, JsonBody, QueryParams};
use crate::marketplace::pets::PetId;
use crate::marketplace::users::UserId;
use crate::marketplace::{Marketplace, MarketplaceStore};
use crate::store::{Page, Paged};

use super::domain::{
    AdoptionFilter, AdoptionRequest, NewAdoptionRequest, RequestId, RequestStatus, StatusChange,
};
use super::service::AdoptionServiceError;

pub(crate) fn routes<S: MarketplaceStore>() -> Router<Arc<Marketplace<S>>> {
    Router::new()
        .route("/api/v1/adoptions", post(create_handler::<S>))
        .route("/api/v1/adoptions/mine", get(mine_handler::<S>))
        .route("/api/v1/adoptions/received", get(received_handler::<S>))
        .route(
            "/api/v1/adoptions/:request_id",
            get(get_handler::<S>)
                .patch(update_status_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/api/v1/pets/:pet_id/adoptions",
            get(pet_requests_handler::<S>),
        )
        .route("/api/v1/admin/adoptions", get(admin_list_handler::<S>))
}

/// Filters and paging accepted by the listing endpoints; `requester` and `pet` are admin-only.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestQuery {
    status: Option<RequestStatus>,
    requester: Option<UserId>,
    pet: Option<PetId>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl RequestQuery {
    fn page(&self) -> Page {
        Page::new(self.page, self.limit)
    }
}

pub(crate) async fn create_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(new_request): JsonBody<NewAdoptionRequest>,
) -> Result<ApiResponse<AdoptionRequest>, ApiError> {
    let request = app.adoptions.create(&user.id, new_request, Utc::now())?;
    Ok(ApiResponse::created(
        request,
        "adoption request created successfully",
    ))
}

pub(crate) async fn mine_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<RequestQuery>,
) -> Result<ApiResponse<Paged<AdoptionRequest>>, ApiError> {
    let filter = AdoptionFilter {
        requester: Some(user.id),
        status: query.status,
        ..AdoptionFilter::default()
    };
    let requests = app.adoptions.list(&filter, query.page())?;
    Ok(ApiResponse::ok(requests, "adoption requests fetched"))
}

pub(crate) async fn received_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    QueryParams(query): QueryParams<RequestQuery>,
) -> Result<ApiResponse<Paged<AdoptionRequest>>, ApiError> {
    let filter = AdoptionFilter {
        pet_owner: Some(user.id),
        status: query.status,
        ..AdoptionFilter::default()
    };
    let requests = app.adoptions.list(&filter, query.page())?;
    Ok(ApiResponse::ok(requests, "received adoption requests fetched"))
}

pub(crate) async fn get_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<AdoptionRequest>, ApiError> {
    let request = app.adoptions.get(&user, &RequestId(request_id))?;
    Ok(ApiResponse::ok(request, "adoption request fetched"))
}

pub(crate) async fn update_status_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<String>,
    JsonBody(change): JsonBody<StatusChange>,
) -> Result<ApiResponse<AdoptionRequest>, ApiError> {
    let request =
        app.adoptions
            .update_status(&user.id, &RequestId(request_id), change, Utc::now())?;
    let message = format!("adoption request {}", request.status);
    Ok(ApiResponse::ok(request, message))
}

pub(crate) async fn delete_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.adoptions
        .delete(&user.id, &RequestId(request_id), Utc::now())?;
    Ok(ApiResponse::ok(
        Value::Null,
        "adoption request deleted successfully",
    ))
}

pub(crate) async fn pet_requests_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(pet_id): Path<String>,
    QueryParams(query): QueryParams<RequestQuery>,
) -> Result<ApiResponse<Paged<AdoptionRequest>>, ApiError> {
    let requests =
        app.adoptions
            .list_for_pet(&user, &PetId(pet_id), query.status, query.page())?;
    Ok(ApiResponse::ok(requests, "adoption requests fetched"))
}

pub(crate) async fn admin_list_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<RequestQuery>,
) -> Result<ApiResponse<Paged<AdoptionRequest>>, ApiError> {
    let page = query.page();
    let filter = AdoptionFilter {
        requester: query.requester,
        pet: query.pet,
        pet_owner: None,
        status: query.status,
    };
    let requests = app.adoptions.list(&filter, page)?;
    Ok(ApiResponse::ok(requests, "adoption requests fetched"))
}

impl From<AdoptionServiceError> for ApiError {
    fn from(error: AdoptionServiceError) -> Self {
        match error {
            AdoptionServiceError::PetNotFound | AdoptionServiceError::RequestNotFound => {
                ApiError::not_found(error.to_string())
            }
            AdoptionServiceError::Invalid(_)
            | AdoptionServiceError::PetUnavailable(_)
            | AdoptionServiceError::OwnPet
            | AdoptionServiceError::AlreadyRequested
            | AdoptionServiceError::InvalidStatus(_)
            | AdoptionServiceError::AlreadyDecided(_)
            | AdoptionServiceError::NotPending(_) => ApiError::bad_request(error.to_string()),
            AdoptionServiceError::NotPetOwner | AdoptionServiceError::NotAuthorized => {
                ApiError::forbidden(error.to_string())
            }
            AdoptionServiceError::Concurrent => ApiError::conflict(error.to_string()),
            AdoptionServiceError::Repository(_) => ApiError::internal(error),
        }
    }
}
