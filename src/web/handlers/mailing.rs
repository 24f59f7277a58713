//! Mailing handlers, including dispatch.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::mailing::MailingService;
use crate::web::dto::{
    ApiResponse, AttemptResponse, DispatchResponse, MailingDetailResponse, MailingRequest,
    MailingResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// GET /api/mailings
pub async fn list_mailings(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<MailingResponse>>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let mailings = MailingService::new(&state.db).list_mailings(&actor).await?;

    Ok(Json(ApiResponse::new(
        mailings.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/mailings/:id - Mailing with message and recipients.
pub async fn get_mailing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MailingDetailResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let details = MailingService::new(&state.db)
        .get_mailing_details(&actor, id)
        .await?;

    Ok(Json(ApiResponse::new(details.into())))
}

/// POST /api/mailings
pub async fn create_mailing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<MailingRequest>,
) -> Result<Json<ApiResponse<MailingResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let mailing = MailingService::new(&state.db)
        .create_mailing(&actor, &req.into())
        .await?;

    Ok(Json(ApiResponse::new(mailing.into())))
}

/// PUT /api/mailings/:id - Replace message, schedule and recipients.
pub async fn update_mailing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MailingRequest>,
) -> Result<Json<ApiResponse<MailingResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let mailing = MailingService::new(&state.db)
        .update_mailing(&actor, id, &req.into())
        .await?;

    Ok(Json(ApiResponse::new(mailing.into())))
}

/// DELETE /api/mailings/:id
pub async fn delete_mailing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let actor = state.actor(&claims).await?;
    MailingService::new(&state.db)
        .delete_mailing(&actor, id)
        .await?;

    Ok(Json(ApiResponse::new(())))
}

/// POST /api/mailings/:id/send - Send the mailing now. Owner only.
pub async fn send_mailing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DispatchResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let summary = state.engine.dispatch(id, &actor).await?;

    Ok(Json(ApiResponse::new(summary.into())))
}

/// POST /api/mailings/:id/finish - Close a started mailing. Owner only.
pub async fn finish_mailing(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MailingResponse>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let mailing = state.engine.finish(id, &actor).await?;

    Ok(Json(ApiResponse::new(mailing.into())))
}

/// GET /api/mailings/:id/attempts
pub async fn list_mailing_attempts(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<AttemptResponse>>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let attempts = MailingService::new(&state.db)
        .mailing_attempts(&actor, id)
        .await?;

    Ok(Json(ApiResponse::new(
        attempts.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/attempts - Attempt log visible to the user.
pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<Vec<AttemptResponse>>>, ApiError> {
    let actor = state.actor(&claims).await?;
    let attempts = MailingService::new(&state.db).list_attempts(&actor).await?;

    Ok(Json(ApiResponse::new(
        attempts.into_iter().map(Into::into).collect(),
    )))
}
