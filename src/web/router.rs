//! Router configuration for the Web API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    confirm_password_reset, create_mailing, create_message, create_recipient, delete_mailing,
    delete_message, delete_recipient, finish_mailing, get_mailing, get_message, get_my_profile,
    get_recipient, list_attempts, list_mailing_attempts, list_mailings, list_messages,
    list_recipients, login, logout, me, refresh, register, request_password_reset, send_mailing,
    update_mailing, update_message, update_my_profile, update_recipient, AppState,
};
use super::middleware::{create_cors_layer, jwt_auth, JwtState};

/// Create the `/api` router.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: &[String],
) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh", post(refresh))
        .route("/register", post(register))
        .route("/password-reset", post(request_password_reset))
        .route("/password-reset/confirm", post(confirm_password_reset))
        .route("/me", get(me));

    let user_routes = Router::new().route("/me", get(get_my_profile).put(update_my_profile));

    let recipient_routes = Router::new()
        .route("/", get(list_recipients).post(create_recipient))
        .route(
            "/:id",
            get(get_recipient)
                .put(update_recipient)
                .delete(delete_recipient),
        );

    let message_routes = Router::new()
        .route("/", get(list_messages).post(create_message))
        .route(
            "/:id",
            get(get_message).put(update_message).delete(delete_message),
        );

    let mailing_routes = Router::new()
        .route("/", get(list_mailings).post(create_mailing))
        .route(
            "/:id",
            get(get_mailing).put(update_mailing).delete(delete_mailing),
        )
        .route("/:id/send", post(send_mailing))
        .route("/:id/finish", post(finish_mailing))
        .route("/:id/attempts", get(list_mailing_attempts));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/recipients", recipient_routes)
        .nest("/messages", message_routes)
        .nest("/mailings", mailing_routes)
        .route("/attempts", get(list_attempts));

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// `GET /health`.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}
