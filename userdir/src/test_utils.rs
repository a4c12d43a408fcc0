//! Shared helpers for unit and database tests.
//!
//! Router-level tests come in two flavors. Assertions that resolve before any
//! query (validation, auth extraction, role checks, cookie handling) run over
//! a lazily-connecting pool and never touch a database. Everything that needs
//! a live store runs under `#[sqlx::test]`, which provisions an isolated
//! database per test and applies `migrations/` before handing over the pool.

use axum_test::TestServer;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::{
    AppState, Config, build_router,
    api::models::users::{CurrentUser, Role, UserResponse},
    auth::{password, tokens},
    db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
};

/// Config with test secrets and a fast bcrypt cost.
pub fn create_test_config() -> Config {
    let mut config = Config {
        database_url: Some("postgres://localhost:5432/userdir_test".to_string()),
        ..Default::default()
    };
    config.auth.access_secret = Some("test-access-secret".to_string());
    config.auth.refresh_secret = Some("test-refresh-secret".to_string());
    config.auth.bcrypt_cost = 4;
    config
}

/// App state over a lazy pool; no connection is made until a query runs.
pub fn create_test_state() -> AppState {
    let config = create_test_config();
    let db = PgPoolOptions::new()
        .connect_lazy(config.database_url.as_deref().unwrap())
        .expect("lazy pool creation cannot fail on a well-formed URL");
    AppState::builder().db(db).config(config).build()
}

/// A test server over the full application router, without a database.
pub fn create_test_server() -> TestServer {
    TestServer::new(build_router(create_test_state())).unwrap()
}

/// A test server over the full application router and a live test pool.
pub fn create_test_server_with_pool(pool: PgPool) -> TestServer {
    let state = AppState::builder().db(pool).config(create_test_config()).build();
    TestServer::new(build_router(state)).unwrap()
}

/// Seed a user directly through the repository.
///
/// The email must already be lowercase, exactly as the handlers would store it.
pub async fn create_test_user(pool: &PgPool, role: Role, email: &str, plain_password: &str) -> UserResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);

    let password_hash = password::hash_password(plain_password, 4).expect("Failed to hash test password");
    let user = users_repo
        .create(&UserCreateDBRequest {
            email: email.to_string(),
            password_hash,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
        })
        .await
        .expect("Failed to create test user");

    UserResponse::from(user)
}

/// A valid access token for an ADMIN user.
pub fn admin_token() -> String {
    let config = create_test_config();
    let user = CurrentUser {
        id: 1,
        email: "admin@example.com".to_string(),
        role: Role::Admin,
    };
    tokens::create_access_token(&user, &config).unwrap()
}

/// A valid access token for a regular USER.
pub fn user_token() -> String {
    let config = create_test_config();
    let user = CurrentUser {
        id: 2,
        email: "user@example.com".to_string(),
        role: Role::User,
    };
    tokens::create_access_token(&user, &config).unwrap()
}
