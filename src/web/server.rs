//! Web server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;

use crate::config::{SchedulerConfig, WebConfig};
use crate::db::{Database, OneTimeTokenRepository, RefreshTokenRepository};
use crate::dispatch::DispatchEngine;
use crate::transport::Mailer;
use crate::{MailcastError, Result};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router};

/// Token cleanup interval.
const CLEANUP_INTERVAL_SECS: u64 = 3600;

/// HTTP server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: Vec<String>,
    scheduler: SchedulerConfig,
}

impl WebServer {
    pub fn new(
        config: &WebConfig,
        db: Database,
        mailer: Arc<dyn Mailer>,
        engine: DispatchEngine,
    ) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| MailcastError::Config(format!("invalid web server address: {e}")))?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, config, mailer, engine)),
            jwt_state: Arc::new(JwtState::new(&config.jwt_secret)),
            cors_origins: config.cors_origins.clone(),
            scheduler: SchedulerConfig::default(),
        })
    }

    /// Run scheduled dispatch in the background while serving.
    pub fn with_scheduler(mut self, scheduler: &SchedulerConfig) -> Self {
        self.scheduler = scheduler.clone();
        self
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The full application router.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.cors_origins,
        )
        .merge(create_health_router())
        .layer(CompressionLayer::new())
    }

    /// Periodically drop expired and revoked tokens.
    fn start_token_cleanup_task(db: Database) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            // The first tick fires immediately.
            interval.tick().await;

            loop {
                interval.tick().await;

                match RefreshTokenRepository::new(db.pool()).cleanup_expired().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Cleaned up refresh tokens")
                    }
                    Ok(_) => tracing::debug!("No expired refresh tokens to clean up"),
                    Err(e) => tracing::warn!(error = %e, "Failed to cleanup refresh tokens"),
                }

                match OneTimeTokenRepository::new(db.pool()).cleanup().await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Cleaned up one-time tokens")
                    }
                    Ok(_) => tracing::debug!("No expired one-time tokens to clean up"),
                    Err(e) => tracing::warn!(error = %e, "Failed to cleanup one-time tokens"),
                }
            }
        });
    }

    /// Run the scheduled dispatch path every `interval_secs`.
    fn start_scheduler_task(engine: DispatchEngine, interval_secs: u64) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

            loop {
                interval.tick().await;

                let mut log = Vec::new();
                match engine.dispatch_scheduled(&mut log).await {
                    Ok(results) => {
                        for line in String::from_utf8_lossy(&log).lines() {
                            tracing::debug!("{}", line);
                        }
                        tracing::info!(mailings = results.len(), "Scheduled dispatch finished");
                    }
                    Err(e) => tracing::error!(error = %e, "Scheduled dispatch failed"),
                }
            }
        });
    }

    fn start_background_tasks(&self) {
        Self::start_token_cleanup_task(self.app_state.db.clone());
        if self.scheduler.enabled {
            Self::start_scheduler_task(self.app_state.engine.clone(), self.scheduler.interval_secs);
            tracing::info!(
                interval_secs = self.scheduler.interval_secs,
                "Mailing scheduler started"
            );
        }
    }

    /// Serve until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.start_background_tasks();
        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, self.router()).await
    }

    /// Serve in the background and return the bound address.
    ///
    /// Useful with port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        self.start_background_tasks();
        tracing::info!("Web server listening on http://{}", local_addr);

        let router = self.router();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::transport::MemoryMailer;

    fn test_config() -> WebConfig {
        WebConfig {
            port: 0,
            jwt_secret: "test-secret-key".to_string(),
            ..Default::default()
        }
    }

    async fn server(config: &WebConfig) -> Result<WebServer> {
        let db = Database::open_in_memory().await?;
        let mailer: Arc<dyn Mailer> = Arc::new(MemoryMailer::new());
        let engine = DispatchEngine::new(db.clone(), mailer.clone(), &MailConfig::default());
        WebServer::new(config, db, mailer, engine)
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let server = server(&test_config()).await.unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let config = WebConfig {
            host: "not an address".to_string(),
            ..test_config()
        };
        assert!(matches!(
            server(&config).await,
            Err(MailcastError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_run_with_addr_binds() {
        let server = server(&test_config()).await.unwrap();
        let addr = server.run_with_addr().await.unwrap();
        assert_ne!(addr.port(), 0);
    }
}
