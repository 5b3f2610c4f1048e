use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use crate::envelope::{ApiError, ApiResponse};
use crate::marketplace::extract::{AdminUser, CurrentUser, JsonBody, QueryParams};
use crate::marketplace::pets::PetId;
use crate::marketplace::reviews::ReviewId;
use crate::marketplace::users::{Role, UserFilter, UserId, UserProfile};
use crate::marketplace::{Marketplace, MarketplaceStore};
use crate::store::{Page, Paged};

use super::domain::{
    BanRequest, DashboardCounts, NewReviewReport, NewUserReport, Report, ReportDecision,
    ReportFilter, ReportId, ReportKind, ReportStatus, SuspendRequest,
};
use super::service::ModerationServiceError;

pub(crate) fn routes<S: MarketplaceStore>() -> Router<Arc<Marketplace<S>>> {
    Router::new()
        .route("/api/v1/reports/users", post(report_user_handler::<S>))
        .route("/api/v1/reports/reviews", post(report_review_handler::<S>))
        .route("/api/v1/admin/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/admin/users", get(list_users_handler::<S>))
        .route("/api/v1/admin/users/:user_id/ban", post(ban_handler::<S>))
        .route(
            "/api/v1/admin/users/:user_id/unban",
            post(unban_handler::<S>),
        )
        .route(
            "/api/v1/admin/users/:user_id/suspend",
            post(suspend_handler::<S>),
        )
        .route("/api/v1/admin/reports", get(list_reports_handler::<S>))
        .route(
            "/api/v1/admin/reports/:report_id",
            patch(decide_report_handler::<S>),
        )
        .route(
            "/api/v1/admin/pets/:pet_id",
            delete(remove_pet_handler::<S>),
        )
        .route(
            "/api/v1/admin/reviews/:review_id",
            delete(remove_review_handler::<S>),
        )
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UserQuery {
    q: Option<String>,
    role: Option<Role>,
    banned: Option<bool>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    kind: Option<ReportKind>,
    status: Option<ReportStatus>,
    page: Option<u32>,
    limit: Option<u32>,
}

pub(crate) async fn report_user_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(report): JsonBody<NewUserReport>,
) -> Result<ApiResponse<Report>, ApiError> {
    let report = app.moderation.report_user(&user.id, report, Utc::now())?;
    Ok(ApiResponse::created(report, "user reported successfully"))
}

pub(crate) async fn report_review_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(report): JsonBody<NewReviewReport>,
) -> Result<ApiResponse<Report>, ApiError> {
    let report = app
        .moderation
        .report_review(&user.id, report, Utc::now())?;
    Ok(ApiResponse::created(report, "review reported successfully"))
}

pub(crate) async fn dashboard_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(_admin): AdminUser,
) -> Result<ApiResponse<DashboardCounts>, ApiError> {
    let counts = app.moderation.dashboard(Utc::now())?;
    Ok(ApiResponse::ok(counts, "dashboard fetched"))
}

pub(crate) async fn list_users_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<UserQuery>,
) -> Result<ApiResponse<Paged<UserProfile>>, ApiError> {
    let page = Page::new(query.page, query.limit);
    let filter = UserFilter {
        q: query.q.filter(|q| !q.trim().is_empty()),
        role: query.role,
        banned: query.banned,
    };
    let users = app.moderation.list_users(&filter, page)?;
    Ok(ApiResponse::ok(users, "users fetched"))
}

pub(crate) async fn ban_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<BanRequest>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let user = app
        .moderation
        .ban(&admin, &UserId(user_id), request, Utc::now())?;
    Ok(ApiResponse::ok(user.profile(), "user banned"))
}

pub(crate) async fn unban_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let user = app.moderation.unban(&admin, &UserId(user_id), Utc::now())?;
    Ok(ApiResponse::ok(user.profile(), "user unbanned"))
}

pub(crate) async fn suspend_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
    JsonBody(request): JsonBody<SuspendRequest>,
) -> Result<ApiResponse<UserProfile>, ApiError> {
    let user = app
        .moderation
        .suspend(&admin, &UserId(user_id), request, Utc::now())?;
    Ok(ApiResponse::ok(user.profile(), "user suspended"))
}

pub(crate) async fn list_reports_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(_admin): AdminUser,
    QueryParams(query): QueryParams<ReportQuery>,
) -> Result<ApiResponse<Paged<Report>>, ApiError> {
    let filter = ReportFilter {
        kind: query.kind,
        status: query.status,
    };
    let reports = app
        .moderation
        .list_reports(&filter, Page::new(query.page, query.limit))?;
    Ok(ApiResponse::ok(reports, "reports fetched"))
}

pub(crate) async fn decide_report_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(admin): AdminUser,
    Path(report_id): Path<String>,
    JsonBody(decision): JsonBody<ReportDecision>,
) -> Result<ApiResponse<Report>, ApiError> {
    let report =
        app.moderation
            .decide_report(&admin, &ReportId(report_id), decision, Utc::now())?;
    Ok(ApiResponse::ok(report, "report updated"))
}

pub(crate) async fn remove_pet_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(admin): AdminUser,
    Path(pet_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.moderation
        .remove_pet(&admin, &PetId(pet_id), Utc::now())?;
    Ok(ApiResponse::ok(Value::Null, "pet removed"))
}

pub(crate) async fn remove_review_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    AdminUser(admin): AdminUser,
    Path(review_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    app.moderation
        .remove_review(&admin, &ReviewId(review_id), Utc::now())?;
    Ok(ApiResponse::ok(Value::Null, "review removed"))
}

impl From<ModerationServiceError> for ApiError {
    fn from(error: ModerationServiceError) -> Self {
        match error {
            ModerationServiceError::Invalid(_)
            | ModerationServiceError::AlreadyReported
            | ModerationServiceError::InvalidTransition { .. } => {
                ApiError::bad_request(error.to_string())
            }
            ModerationServiceError::UserNotFound
            | ModerationServiceError::ReviewNotFound
            | ModerationServiceError::PetNotFound
            | ModerationServiceError::ReportNotFound => ApiError::not_found(error.to_string()),
            ModerationServiceError::ProtectedAccount => ApiError::forbidden(error.to_string()),
            ModerationServiceError::Concurrent => ApiError::conflict(error.to_string()),
            ModerationServiceError::Repository(_) => ApiError::internal(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::marketplace::marketplace_router;
    use crate::marketplace::testing::{admin, bearer, marketplace, register, store};

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn banned_user_loses_access_immediately() {
        let store = store();
        let app = marketplace(&store);
        let moderator = admin(&store, "moderator");
        let target = register(&store, "target");
        let target_token = bearer(&app, &target);
        let admin_token = bearer(&app, &moderator);
        let router = marketplace_router(app);

        let banned = router
            .clone()
            .oneshot(
                Request::post(format!("/api/v1/admin/users/{}/ban", target.id))
                    .header(header::AUTHORIZATION, &admin_token)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "reason": "spam" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(banned.status(), StatusCode::OK);
        assert_eq!(body_json(banned).await["data"]["banned"], true);

        let me = router
            .oneshot(
                Request::get("/api/v1/users/me")
                    .header(header::AUTHORIZATION, &target_token)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(me.status(), StatusCode::FORBIDDEN);
        let body = body_json(me).await;
        assert_eq!(body["errors"][0], "spam");
    }

    #[tokio::test]
    async fn dashboard_is_admin_only() {
        let store = store();
        let app = marketplace(&store);
        let moderator = admin(&store, "moderator");
        let regular = register(&store, "regular");
        let tokens = (bearer(&app, &moderator), bearer(&app, &regular));
        let router = marketplace_router(app);

        let denied = router
            .clone()
            .oneshot(
                Request::get("/api/v1/admin/dashboard")
                    .header(header::AUTHORIZATION, &tokens.1)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let allowed = router
            .oneshot(
                Request::get("/api/v1/admin/dashboard")
                    .header(header::AUTHORIZATION, &tokens.0)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(allowed.status(), StatusCode::OK);
        let body = body_json(allowed).await;
        assert_eq!(body["data"]["users"]["total"], 2);
        assert_eq!(body["data"]["openReports"]["users"], 0);
    }
}
