use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};

use crate::envelope::{ApiError, ApiResponse};
use crate::marketplace::extract::{CurrentUser, JsonBody, PageQuery, QueryParams};
use crate::marketplace::users::UserId;
use crate::marketplace::{Marketplace, MarketplaceStore};
use crate::store::Paged;

use super::domain::{ConversationSummary, MessageId, MessageRemoval, MessageView, OutgoingMessage};
use super::service::MessageServiceError;

pub(crate) fn routes<S: MarketplaceStore>() -> Router<Arc<Marketplace<S>>> {
    Router::new()
        .route("/api/v1/messages", post(send_handler::<S>))
        .route("/api/v1/messages/:message_id", delete(delete_handler::<S>))
        .route("/api/v1/conversations", get(inbox_handler::<S>))
        .route(
            "/api/v1/conversations/:user_id",
            get(conversation_handler::<S>),
        )
}

pub(crate) async fn send_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    JsonBody(outgoing): JsonBody<OutgoingMessage>,
) -> Result<ApiResponse<MessageView>, ApiError> {
    let message = app.messages.send(&user.id, outgoing, Utc::now())?;
    Ok(ApiResponse::created(message, "message sent successfully"))
}

pub(crate) async fn inbox_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<ConversationSummary>>, ApiError> {
    let inbox = app.messages.inbox(&user.id)?;
    Ok(ApiResponse::ok(inbox, "conversations fetched"))
}

pub(crate) async fn conversation_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<String>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<ApiResponse<Paged<MessageView>>, ApiError> {
    let messages = app
        .messages
        .conversation(&user.id, &UserId(user_id), query.page())?;
    Ok(ApiResponse::ok(messages, "conversation fetched"))
}

pub(crate) async fn delete_handler<S: MarketplaceStore>(
    State(app): State<Arc<Marketplace<S>>>,
    CurrentUser(user): CurrentUser,
    Path(message_id): Path<String>,
) -> Result<ApiResponse<Value>, ApiError> {
    let removal = app.messages.delete(&user.id, &MessageId(message_id))?;
    let purged = removal == MessageRemoval::Purged;
    Ok(ApiResponse::ok(
        json!({ "purged": purged }),
        "message deleted successfully",
    ))
}

impl From<MessageServiceError> for ApiError {
    fn from(error: MessageServiceError) -> Self {
        match error {
            MessageServiceError::Invalid(_) => ApiError::bad_request(error.to_string()),
            MessageServiceError::RecipientNotFound
            | MessageServiceError::UserNotFound
            | MessageServiceError::MessageNotFound => ApiError::not_found(error.to_string()),
            MessageServiceError::NotParticipant => ApiError::forbidden(error.to_string()),
            MessageServiceError::Cipher(_) | MessageServiceError::Repository(_) => {
                ApiError::internal(error)
            }
        }
    }
}
