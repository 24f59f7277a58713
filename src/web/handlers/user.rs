//! Profile handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::auth::me_response;
use crate::auth::validation::{validate_country, validate_email, validate_phone};
use crate::db::{UserRepository, UserUpdate};
use crate::web::dto::{ApiResponse, MeResponse, UpdateProfileRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// Empty input clears an optional profile field.
fn optional(value: String) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// GET /api/users/me - Current user's profile.
pub async fn get_my_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    Ok(Json(ApiResponse::new(me_response(&state, user).await?)))
}

/// PUT /api/users/me - Update email, phone and country.
pub async fn update_my_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    let users = UserRepository::new(state.db.pool());
    let mut update = UserUpdate::new();

    if let Some(email) = req.email {
        let email = optional(email).map(|e| e.to_lowercase());
        if let Some(ref email) = email {
            validate_email(email).map_err(|e| ApiError::unprocessable(e.to_string()))?;
            if let Some(existing) = users.get_by_email(email).await? {
                if existing.id != user.id {
                    return Err(ApiError::conflict("Email already registered"));
                }
            }
        }
        update = update.email(email);
    }

    if let Some(phone) = req.phone {
        let phone = optional(phone);
        if let Some(ref phone) = phone {
            validate_phone(phone).map_err(|e| ApiError::unprocessable(e.to_string()))?;
        }
        update = update.phone(phone);
    }

    if let Some(country) = req.country {
        let country = optional(country);
        if let Some(ref country) = country {
            validate_country(country).map_err(|e| ApiError::unprocessable(e.to_string()))?;
        }
        update = update.country(country);
    }

    let user = users
        .update(user.id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    tracing::info!(user_id = user.id, "Profile updated");

    Ok(Json(ApiResponse::new(me_response(&state, user).await?)))
}
