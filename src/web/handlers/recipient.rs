//! Recipient handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::mailing::MailingService;
use crate::web::dto::{ApiResponse, RecipientRequest, RecipientResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/recipients - Recipients visible to the user.
pub async fn list_recipients(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<RecipientResponse>>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let recipients = MailingService::new(&state.db)
        .list_recipients(&actor)
        .await?;

    Ok(Json(ApiResponse::new(
        recipients.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/recipients/:id
pub async fn get_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RecipientResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let recipient = MailingService::new(&state.db)
        .get_recipient(&actor, id)
        .await?;

    Ok(Json(ApiResponse::new(recipient.into())))
}

/// POST /api/recipients
pub async fn create_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<RecipientRequest>,
) -> Result<Json<ApiResponse<RecipientResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let recipient = MailingService::new(&state.db)
        .create_recipient(&actor, &req.into())
        .await?;

    Ok(Json(ApiResponse::new(recipient.into())))
}

/// PUT /api/recipients/:id
pub async fn update_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RecipientRequest>,
) -> Result<Json<ApiResponse<RecipientResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let recipient = MailingService::new(&state.db)
        .update_recipient(&actor, id, &req.into())
        .await?;

    Ok(Json(ApiResponse::new(recipient.into())))
}

/// DELETE /api/recipients/:id
pub async fn delete_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let actor = state.actor(&claims).await?;
    MailingService::new(&state.db)
        .delete_recipient(&actor, id)
        .await?;

    Ok(Json(ApiResponse::new(())))
}
