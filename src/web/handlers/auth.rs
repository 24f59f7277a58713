//! Authentication handlers.

use axum::{extract::State, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use std::sync::Arc;

use crate::auth::{
    register as register_user, verify_password, Actor, PasswordReset, PermissionError,
    RegistrationRequest,
};
use crate::config::WebConfig;
use crate::datetime::to_sqlite;
use crate::db::{
    Database, GroupRepository, NewRefreshToken, RefreshTokenRepository, User, UserRepository,
};
use crate::dispatch::DispatchEngine;
use crate::transport::Mailer;
use crate::web::dto::{
    ApiResponse, LoginRequest, LoginResponse, LogoutRequest, MeResponse, NoticeResponse,
    PasswordResetConfirmRequest, PasswordResetRequest, RefreshRequest, RefreshResponse,
    RegisterRequest, UserInfo, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, JwtClaims};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub encoding_key: EncodingKey,
    /// Access token lifetime in seconds.
    pub access_token_expiry: u64,
    /// Refresh token lifetime in days.
    pub refresh_token_expiry: u64,
    /// Password reset token lifetime in seconds.
    pub password_reset_expiry: u64,
    pub mailer: Arc<dyn Mailer>,
    pub engine: DispatchEngine,
}

impl AppState {
    pub fn new(
        db: Database,
        config: &WebConfig,
        mailer: Arc<dyn Mailer>,
        engine: DispatchEngine,
    ) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_expiry: config.jwt_access_token_expiry_secs,
            refresh_token_expiry: config.jwt_refresh_token_expiry_days,
            password_reset_expiry: config.password_reset_expiry_secs,
            mailer,
            engine,
        }
    }

    /// Sign an access token for a user.
    pub fn generate_access_token(&self, user_id: i64, username: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    pub fn generate_refresh_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Create an access token and a stored refresh token.
    async fn issue_tokens(&self, user: &User) -> Result<(String, String), ApiError> {
        let access_token = self.generate_access_token(user.id, &user.username)?;
        let refresh_token = self.generate_refresh_token();

        let expires_at =
            chrono::Utc::now() + chrono::Duration::days(self.refresh_token_expiry as i64);
        RefreshTokenRepository::new(self.db.pool())
            .create(&NewRefreshToken {
                user_id: user.id,
                token: refresh_token.clone(),
                expires_at: to_sqlite(&expires_at),
            })
            .await
            .map_err(|e| {
                tracing::error!("Failed to store refresh token: {}", e);
                ApiError::internal("Failed to create session")
            })?;

        Ok((access_token, refresh_token))
    }

    /// The active user behind a token.
    pub async fn current_user(&self, claims: &JwtClaims) -> Result<User, ApiError> {
        let user = UserRepository::new(self.db.pool())
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;

        if !user.is_active {
            return Err(ApiError::forbidden(PermissionError::AccountInactive.to_string()));
        }
        Ok(user)
    }

    /// Resolve the token holder for access checks.
    pub async fn actor(&self, claims: &JwtClaims) -> Result<Actor, ApiError> {
        let user = self.current_user(claims).await?;
        Ok(Actor::load(self.db.pool(), user.id).await?)
    }

    fn login_response(&self, user: User, access_token: String, refresh_token: String) -> LoginResponse {
        LoginResponse {
            access_token,
            refresh_token,
            expires_in: self.access_token_expiry,
            user: UserInfo {
                id: user.id,
                username: user.username,
            },
        }
    }
}

/// POST /api/auth/login - User login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Username and password are required"));
    }

    let users = UserRepository::new(state.db.pool());
    let user = users
        .get_by_username(&req.username)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::unauthorized("Invalid username or password"))?;

    if !user.is_active {
        return Err(ApiError::forbidden(PermissionError::AccountInactive.to_string()));
    }

    let (access_token, refresh_token) = state.issue_tokens(&user).await?;

    if let Err(e) = users.update_last_login(user.id).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to update last login");
    }
    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(ApiResponse::new(state.login_response(
        user,
        access_token,
        refresh_token,
    ))))
}

/// POST /api/auth/logout - Revoke a refresh token.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    RefreshTokenRepository::new(state.db.pool())
        .revoke(&req.refresh_token)
        .await?;

    Ok(Json(ApiResponse::new(())))
}

/// POST /api/auth/refresh - Rotate the refresh token and issue a new access token.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, ApiError> {
    let tokens = RefreshTokenRepository::new(state.db.pool());
    let token = tokens
        .get_valid_token(&req.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let user = UserRepository::new(state.db.pool())
        .get_by_id(token.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::forbidden(PermissionError::AccountInactive.to_string()));
    }

    tokens.revoke(&req.refresh_token).await?;
    let (access_token, refresh_token) = state.issue_tokens(&user).await?;

    Ok(Json(ApiResponse::new(RefreshResponse {
        access_token,
        refresh_token,
        expires_in: state.access_token_expiry,
    })))
}

/// POST /api/auth/register - Create an account and log it in.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let mut request = RegistrationRequest::new(req.username, req.password);
    if let Some(email) = req.email {
        request = request.with_email(email);
    }
    if let Some(phone) = req.phone {
        request = request.with_phone(phone);
    }
    if let Some(country) = req.country {
        request = request.with_country(country);
    }

    let user = register_user(&UserRepository::new(state.db.pool()), request).await?;
    let (access_token, refresh_token) = state.issue_tokens(&user).await?;

    Ok(Json(ApiResponse::new(state.login_response(
        user,
        access_token,
        refresh_token,
    ))))
}

/// GET /api/auth/me - Current user with group membership.
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = state.current_user(&claims).await?;
    Ok(Json(ApiResponse::new(me_response(&state, user).await?)))
}

pub(crate) async fn me_response(state: &AppState, user: User) -> Result<MeResponse, ApiError> {
    let groups = GroupRepository::new(state.db.pool())
        .names_for_user(user.id)
        .await?;
    let actor = Actor::load(state.db.pool(), user.id).await?;
    Ok(MeResponse::new(user, groups, actor.is_manager))
}

/// POST /api/auth/password-reset - Email a reset token.
///
/// Always answers with the same notice, whether or not the address is known.
pub async fn request_password_reset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<Json<ApiResponse<NoticeResponse>>, ApiError> {
    let reset = PasswordReset::new(
        state.db.pool(),
        state.mailer.as_ref(),
        state.engine.sender(),
        state.password_reset_expiry,
    );
    reset.request(&req.email).await?;

    Ok(Json(ApiResponse::new(NoticeResponse {
        message: "Если адрес зарегистрирован, на него отправлено письмо с кодом.".to_string(),
    })))
}

/// POST /api/auth/password-reset/confirm - Set a new password with a token.
pub async fn confirm_password_reset(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<PasswordResetConfirmRequest>,
) -> Result<Json<ApiResponse<NoticeResponse>>, ApiError> {
    let reset = PasswordReset::new(
        state.db.pool(),
        state.mailer.as_ref(),
        state.engine.sender(),
        state.password_reset_expiry,
    );
    reset.confirm(&req.token, &req.new_password).await?;

    Ok(Json(ApiResponse::new(NoticeResponse {
        message: "Пароль изменён.".to_string(),
    })))
}
