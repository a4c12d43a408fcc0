//! Authentication endpoints: register, login, refresh, logout.

use axum::{extract::State, http::HeaderMap};

use crate::{
    AppState,
    api::{
        extract::Json,
        models::{
            auth::{AuthResponse, LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse},
            users::{CurrentUser, Role, UserResponse},
        },
    },
    auth::{password, tokens},
    config::Config,
    db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    errors::Error,
};

/// Name of the cookie carrying the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<RegisterResponse, Error> {
    let email = validate_email(&request.email)?;
    let first_name = validate_name(&request.first_name, "firstName")?;
    let last_name = validate_name(&request.last_name, "lastName")?;
    validate_password(&request.password, &state.config)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Friendly early 409; the unique index on email catches the race loser
    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email address already exists".to_string(),
        });
    }

    let password_hash = hash_password_blocking(request.password, state.config.auth.bcrypt_cost).await?;

    // Self-registration never grants Admin
    let create_request = UserCreateDBRequest {
        email,
        password_hash,
        first_name,
        last_name,
        role: Role::User,
    };
    let created_user = user_repo.create(&create_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    let user_response = UserResponse::from(created_user);
    let (auth_response, cookie) = issue_token_pair(user_response, &state.config)?;

    Ok(RegisterResponse { auth_response, cookie })
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid credentials"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<LoginResponse, Error> {
    let email = validate_email(&request.email)?;
    if request.password.is_empty() {
        return Err(Error::BadRequest {
            message: "password is required".to_string(),
        });
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // Unknown email and wrong password produce the same response, so the
    // endpoint cannot be used to probe which addresses are registered
    let user = user_repo
        .get_user_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let password = request.password;
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        return Err(invalid_credentials());
    }

    let user_response = UserResponse::from(user);
    let (auth_response, cookie) = issue_token_pair(user_response, &state.config)?;

    Ok(LoginResponse { auth_response, cookie })
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "authentication",
    responses(
        (status = 200, description = "New token pair issued", body = AuthResponse),
        (status = 401, description = "Missing, invalid, or expired refresh token"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<LoginResponse, Error> {
    let token = refresh_token_from_headers(&headers).ok_or(Error::Unauthenticated { message: None })?;
    let claims = tokens::verify_refresh_token(&token, &state.config)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // The account may have been deleted since the refresh token was issued
    let user = user_repo
        .get_by_id(claims.sub)
        .await?
        .ok_or(Error::Unauthenticated { message: None })?;

    let user_response = UserResponse::from(user);
    let (auth_response, cookie) = issue_token_pair(user_response, &state.config)?;

    Ok(LoginResponse { auth_response, cookie })
}

/// Logout (clear the refresh cookie)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "authentication",
    responses(
        (status = 204, description = "Refresh cookie cleared"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<LogoutResponse, Error> {
    // Stateless: nothing to revoke server-side, just expire the cookie
    Ok(LogoutResponse {
        cookie: clear_refresh_cookie(&state.config),
    })
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid credentials".to_string()),
    }
}

/// Normalize and validate an email address. Stored emails are always lowercase.
pub(crate) fn validate_email(email: &str) -> Result<String, Error> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::BadRequest {
            message: "A valid email address is required".to_string(),
        });
    }
    Ok(email)
}

pub(crate) fn validate_name(value: &str, field: &str) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::BadRequest {
            message: format!("{field} is required"),
        });
    }
    Ok(value.to_string())
}

pub(crate) fn validate_password(password: &str, config: &Config) -> Result<(), Error> {
    if password.len() < config.auth.password_min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", config.auth.password_min_length),
        });
    }
    Ok(())
}

/// Hash a password on a blocking thread to avoid blocking the async runtime.
pub(crate) async fn hash_password_blocking(password: String, cost: u32) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || password::hash_password(&password, cost))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Sign a fresh access/refresh pair and build the refresh cookie.
fn issue_token_pair(user: UserResponse, config: &Config) -> Result<(AuthResponse, String), Error> {
    let current_user: CurrentUser = user.clone().into();
    let access_token = tokens::create_access_token(&current_user, config)?;
    let refresh_token = tokens::create_refresh_token(&current_user, config)?;
    let cookie = create_refresh_cookie(&refresh_token, config);

    Ok((AuthResponse { user, access_token }, cookie))
}

/// Build the refresh cookie. Scoped to /api/auth so it is only ever sent to
/// the refresh and logout endpoints.
fn create_refresh_cookie(token: &str, config: &Config) -> String {
    let max_age = config.auth.refresh_expiry.as_secs();
    let mut cookie = format!("{REFRESH_COOKIE_NAME}={token}; Path=/api/auth; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.environment.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Build an expired refresh cookie to clear the session client-side.
fn clear_refresh_cookie(config: &Config) -> String {
    let mut cookie = format!("{REFRESH_COOKIE_NAME}=; Path=/api/auth; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.environment.is_production() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Pull the refresh token out of the Cookie header, if present.
fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookie_str = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == REFRESH_COOKIE_NAME && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
