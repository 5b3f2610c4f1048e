use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::envelope::{ApiError, ApiResponse};
use crate::marketplace::extract::{cleared_cookie, session_cookie, CurrentUser, JsonBody};
use crate::marketplace::{Marketplace, MarketplaceStore};
use crate::store::RepositoryError;

use super::domain::{
    Credentials, PasswordChange, PasswordReset, ProfileUpdate, PublicProfile, Registration,
    ResetRequest, UserId, UserProfile,
};
use super::service::UserServiceError;

pub(crate) fn routes<S: MarketplaceStore>() -> Router<Arc<Marketplace<S>>> {
    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<S>))
        .route("/api/v1/auth/login", post(login_handler::<S>))
        .route("/api/v1/auth/logout", post(logout_handler::<S>))
        .route(
            "/api/v1/auth/forgot-password",
            post(forgot_password_handler::<S>),
        )
        .route(
            "/api/v1/auth/reset-password",
            post(reset_password_handler::<S>),
        )
        .route(
            "/api/v1/users/me",
            get(me_handler).patch(update_me_handler::<S>),
        )
        .route(
            "/api/v1/users/me/password",
            post(change_password_handler::<S>),
        )
        .route("/api/v1/users/:user_id", get(public_profile_handler::<S>))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginView {
    pub user: UserProfile,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

pub(crate) async fn register_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    JsonBody(registration): JsonBody<Registration>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let user = app.users.register(registration, Utc::now())?;
    Ok(ApiResponse::created(
        user.profile(),
        "user registered successfully",
    ))
}

pub(crate) async fn login_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let user = app.users.authenticate(credentials, now)?;
    let issued = app
        .tokens
        .issue(&user.id, user.role, now)
        .map_err(ApiError::internal)?;

    let cookie = session_cookie(
        &issued.token,
        app.tokens.ttl().num_seconds(),
        app.secure_cookies,
    );
    let view = LoginView {
        user: user.profile(),
        access_token: issued.token,
        expires_at: issued.expires_at,
    };
    Ok(([(SET_COOKIE, cookie)], ApiResponse::ok(view, "login successful")))
}

pub(crate) async fn logout_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
) -> impl IntoResponse {
    (
        [(SET_COOKIE, cleared_cookie(app.secure_cookies))],
        ApiResponse::ok(Value::Null, "logged out"),
    )
}

pub(crate) async fn forgot_password_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    JsonBody(request): JsonBody<ResetRequest>,
) -> Result<ApiResponse<Value>, ApiError> {
    let token = app.users.request_password_reset(request, Utc::now())?;
    let data = match token {
        Some(token) => json!({ "resetToken": token }),
        None => json!({}),
    };
    Ok(ApiResponse::ok(
        data,
        "if the account exists, a reset link has been issued",
    ))
}

pub(crate) async fn reset_password_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    JsonBody(reset): JsonBody<PasswordReset>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.users.reset_password(reset, Utc::now())?;
    Ok(ApiResponse::ok(Value::Null, "password has been reset"))
}

pub(crate) async fn me_handler(CurrentUser(user): CurrentUser) -> ApiResponse<UserProfile> {
    ApiResponse::ok(user.profile(), "current user fetched")
}

pub(crate) async fn update_me_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let updated = app.users.update_profile(&user.id, update, Utc::now())?;
    Ok(ApiResponse::ok(updated.profile(), "profile updated"))
}

pub(crate) async fn change_password_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(change): JsonBody<PasswordChange>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.users.change_password(&user.id, change, Utc::now())?;
    Ok(ApiResponse::ok(Value::Null, "password changed"))
}

pub(crate) async fn public_profile_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    _viewer: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<PublicProfile>, ApiError> {
    let user = app.users.get(&UserId(user_id))?;
    Ok(ApiResponse::ok(user.public_profile(), "user fetched"))
}

impl From<UserServiceError> for ApiError {
    fn from(error: UserServiceError) -> Self {
        match error {
            UserServiceError::Invalid(_)
            | UserServiceError::UsernameTaken
            | UserServiceError::EmailTaken
            | UserServiceError::InvalidResetToken => ApiError::bad_request(error.to_string()),
            UserServiceError::InvalidCredentials => ApiError::unauthorized(error.to_string()),
            UserServiceError::Banned { ref reason } => {
                let errors = reason.iter().cloned().collect();
                ApiError::forbidden(error.to_string()).with_errors(errors)
            }
            UserServiceError::Suspended { .. } => ApiError::forbidden(error.to_string()),
            UserServiceError::NotFound => ApiError::not_found(error.to_string()),
            UserServiceError::Repository(RepositoryError::Stale) => {
                ApiError::conflict("account changed concurrently; retry")
            }
            UserServiceError::Password(_) | UserServiceError::Repository(_) => {
                ApiError::internal(error)
            }
        }
    }
}
