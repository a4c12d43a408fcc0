//! A PostgreSQL-backed user directory service with JWT authentication.
//!
//! The service exposes a REST API for the auth lifecycle (register, login,
//! refresh, logout) and admin-only user management. Access tokens are
//! short-lived bearer tokens; refresh tokens live in an HttpOnly cookie
//! scoped to the auth endpoints.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod types;

pub use config::Config;
pub use errors::{Error, Result};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use bon::Builder;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api::models::users::Role;
use crate::db::handlers::{Repository, Users};
use crate::db::models::users::UserCreateDBRequest;

/// Shared application state injected into every handler.
///
/// The pool is constructed once at startup and cloned (cheaply) per request;
/// there is no process-global database client.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Embedded sqlx migrator for the `migrations/` directory.
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Liveness probe.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

fn build_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config.cors.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();

    if origins.is_empty() {
        // Wildcard origins cannot be combined with credentials
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(config.cors.allow_credentials)
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.config);

    let auth_routes = Router::new()
        .route("/register", post(api::handlers::auth::register))
        .route("/login", post(api::handlers::auth::login))
        .route("/refresh", post(api::handlers::auth::refresh))
        .route("/logout", post(api::handlers::auth::logout));

    let user_routes = Router::new()
        .route("/", get(api::handlers::users::list_users).post(api::handlers::users::create_user))
        .route(
            "/{id}",
            get(api::handlers::users::get_user)
                .patch(api::handlers::users::update_user)
                .delete(api::handlers::users::delete_user),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .merge(Scalar::with_url("/docs", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Create the initial admin user on first startup, if configured.
///
/// Idempotent: if a user with the configured email already exists, nothing
/// happens. Without this a fresh deployment has no ADMIN account and the
/// user management endpoints are unreachable.
pub async fn create_initial_admin_user(state: &AppState) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password) else {
        return Ok(());
    };
    let email = email.trim().to_lowercase();

    let mut tx = state.db.begin().await?;
    let mut user_repo = Users::new(&mut tx);

    if user_repo.get_user_by_email(&email).await?.is_some() {
        tracing::debug!("Initial admin user {email} already exists");
        return Ok(());
    }

    let password = password.clone();
    let cost = state.config.auth.bcrypt_cost;
    let password_hash = tokio::task::spawn_blocking(move || auth::password::hash_password(&password, cost)).await??;

    user_repo
        .create(&UserCreateDBRequest {
            email: email.clone(),
            password_hash,
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            role: Role::Admin,
        })
        .await?;
    tx.commit().await?;

    tracing::info!("Created initial admin user {email}");
    Ok(())
}

/// The running application: pool connected, migrations applied, admin seeded.
pub struct Application {
    state: AppState,
}

impl Application {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("database_url is required"))?;

        let db = PgPoolOptions::new()
            .max_connections(config.max_db_connections)
            .connect(url)
            .await?;

        migrator().run(&db).await?;

        let state = AppState::builder().db(db).config(config).build();
        create_initial_admin_user(&state).await?;

        Ok(Self { state })
    }

    /// Bind and serve until the shutdown future resolves, then close the pool.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {addr}");

        let db = self.state.db.clone();
        let router = build_router(self.state);

        axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

        db.close().await;
        Ok(())
    }
}
