//! Message handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::mailing::MailingService;
use crate::web::dto::{ApiResponse, MessageRequest, MessageResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<MessageResponse>>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let messages = MailingService::new(&state.db).list_messages(&actor).await?;

    Ok(Json(ApiResponse::new(
        messages.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/messages/:id
pub async fn get_message(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let message = MailingService::new(&state.db).get_message(&actor, id).await?;

    Ok(Json(ApiResponse::new(message.into())))
}

/// POST /api/messages
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<MessageRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let message = MailingService::new(&state.db)
        .create_message(&actor, &req.into())
        .await?;

    Ok(Json(ApiResponse::new(message.into())))
}

/// PUT /api/messages/:id
pub async fn update_message(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MessageRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let message = MailingService::new(&state.db)
        .update_message(&actor, id, &req.into())
        .await?;

    Ok(Json(ApiResponse::new(message.into())))
}

/// DELETE /api/messages/:id - Also deletes the mailings using the message.
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let actor = state.actor(&claims).await?;
    MailingService::new(&state.db)
        .delete_message(&actor, id)
        .await?;

    Ok(Json(ApiResponse::new(())))
}
