pub mod attempts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod retry;
pub mod room;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

use attempts::{AttemptLedger, CampaignPolicies, MemoryAttemptLedger};
use auth::{
    AuthGate, MemorySessionStore, MemoryUserDirectory, RateLimitConfig, RateLimiter, RefreshFlow,
    SessionStore, TokenCodec, UserDirectory,
};
use config::StorageBackend;
use db::{DbOperations, User};
use room::{CredentialStore, MemoryCredentialStore, RoomCredentialIssuer};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: Arc<TokenCodec>,
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserDirectory>,
    pub ledger: Arc<dyn AttemptLedger>,
    pub campaigns: Arc<CampaignPolicies>,
    pub rooms: Arc<RoomCredentialIssuer>,
    pub refresh: Arc<RefreshFlow>,
    pub gate: Arc<AuthGate>,
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Builds state for the configured storage backend, running migrations
    /// and seeding users as needed.
    pub async fn new(config: Settings) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Memory => Self::in_memory(config).await,
            StorageBackend::Postgres => {
                let db = DbOperations::new_with_options(
                    &config.database.url,
                    config.database.max_connections,
                    Duration::from_secs(config.database.acquire_timeout_seconds),
                )
                .await?;
                db.migrate().await?;

                for seed in &config.seed_users {
                    if db.find_by_email(&seed.email).await?.is_none() {
                        let hash = auth::users::hash_password(&seed.password)?;
                        db.create_user(&User::new(&seed.email, &seed.name, &hash, seed.is_admin)).await?;
                        info!("Seeded user {}", seed.email);
                    }
                }

                let db = Arc::new(db);
                Self::assemble(config, db.clone(), db.clone(), db.clone(), db)
            }
        }
    }

    /// Builds state backed entirely by in-process stores.
    pub async fn in_memory(config: Settings) -> Result<Self> {
        let users = MemoryUserDirectory::new();
        for seed in &config.seed_users {
            users.insert(&seed.email, &seed.name, &seed.password, seed.is_admin).await?;
            info!("Seeded user {}", seed.email);
        }

        Self::assemble(
            config,
            Arc::new(MemorySessionStore::new()),
            Arc::new(users),
            Arc::new(MemoryAttemptLedger::new()),
            Arc::new(MemoryCredentialStore::new()),
        )
    }

    /// Wires the components over caller-provided stores.
    pub fn assemble(
        config: Settings,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserDirectory>,
        ledger: Arc<dyn AttemptLedger>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        let tokens = Arc::new(TokenCodec::new(&config.auth)?);
        let rooms = RoomCredentialIssuer::new(&config.room, ledger.clone(), credentials)?;
        let refresh = RefreshFlow::new(
            tokens.clone(),
            sessions.clone(),
            users.clone(),
            config.auth.rotate_refresh_tokens,
        );
        let gate = AuthGate::new(&config.gate, tokens.clone());

        Ok(Self {
            campaigns: Arc::new(CampaignPolicies::new(&config.attempts)),
            login_limiter: Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit))),
            rooms: Arc::new(rooms),
            refresh: Arc::new(refresh),
            gate: Arc::new(gate),
            config: Arc::new(config),
            tokens,
            sessions,
            users,
            ledger,
        })
    }
}

/// Registers every route. Callers wrap the app in `AuthGateLayer` themselves.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/login", web::post().to(auth::handlers::login))
        .service(
            web::scope("/api")
                .route("/refresh", web::post().to(auth::handlers::refresh))
                .route("/auth/me", web::get().to(auth::handlers::me))
                .route("/logout", web::post().to(auth::handlers::logout))
                .route("/submissions", web::get().to(attempts::handlers::list_submissions))
                .route("/submissions", web::post().to(attempts::handlers::create_submission))
                .route("/submissions/status", web::get().to(attempts::handlers::submission_status))
                .route(
                    "/submissions/{submission_id}/complete",
                    web::post().to(attempts::handlers::complete_submission),
                )
                .route("/livekit/token", web::get().to(room::handlers::token_from_query))
                .route("/livekit/token", web::post().to(room::handlers::token_from_body))
                .route("/generate_token", web::post().to(room::handlers::token_from_body))
                .route(
                    "/livekit/token/{submission_id}",
                    web::delete().to(room::handlers::revoke_token),
                ),
        );
}
