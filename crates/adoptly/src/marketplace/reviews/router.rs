use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::Router;
use chrono::Utc;
use serde_json::Value;

use crate::envelope::{ApiError, ApiResponse};
use crate::marketplace::extract::{CurrentUser, JsonBody, PageQuery, QueryParams};
use crate::marketplace::pets::PetId;
use crate::marketplace::{Marketplace, MarketplaceStore};

use super::domain::{NewReview, PetReviews, Review, ReviewId, ReviewUpdate};
use super::service::ReviewServiceError;

pub(crate) fn routes<S: MarketplaceStore>() -> Router<Arc<Marketplace<S>>> {
    Router::new()
        .route(
            "/api/v1/pets/:pet_id/reviews",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/api/v1/reviews/:review_id",
            patch(update_handler::<S>).delete(delete_handler::<S>),
        )
}

pub(crate) async fn list_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    Path(pet_id): Path<String>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ApiResponse<PetReviews>, ApiError> {
    let reviews = app.reviews.list_for_pet(&PetId(pet_id), query.page())?;
    Ok(ApiResponse::ok(reviews, "reviews fetched"))
}

pub(crate) async fn create_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(pet_id): Path<String>,
    JsonBody(new_review): JsonBody<NewReview>,
) -> Result<ApiResponse<Review>, ApiError> {
    let review = app
        .reviews
        .create(&user, &PetId(pet_id), new_review, Utc::now())?;
    Ok(ApiResponse::created(review, "review created successfully"))
}

pub(crate) async fn update_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(review_id): Path<String>,
    JsonBody(update): JsonBody<ReviewUpdate>,
) -> Result<ApiResponse<Review>, ApiError> {
    let review = app
        .reviews
        .update(&user, &ReviewId(review_id), update, Utc::now())?;
    Ok(ApiResponse::ok(review, "review updated successfully"))
}

pub(crate) async fn delete_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(review_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.reviews
        .delete(&user, &ReviewId(review_id), Utc::now())?;
    Ok(ApiResponse::ok(Value::Null, "review deleted successfully"))
}

impl From<ReviewServiceError> for ApiError {
    fn from(error: ReviewServiceError) -> Self {
        match error {
            ReviewServiceError::Invalid(_)
            | ReviewServiceError::OwnPet
            | ReviewServiceError::AlreadyReviewed => ApiError::bad_request(error.to_string()),
            ReviewServiceError::PetNotFound | ReviewServiceError::ReviewNotFound => {
                ApiError::not_found(error.to_string())
            }
            ReviewServiceError::NotAuthor => ApiError::forbidden(error.to_string()),
            ReviewServiceError::Repository(_) => ApiError::internal(error),
        }
    }
}
