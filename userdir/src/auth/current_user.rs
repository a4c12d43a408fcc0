//! Bearer token extraction for authenticated routes.

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role},
    auth::tokens,
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Extract the bearer access token from the Authorization header.
///
/// Any missing or malformed header is a uniform 401; no distinction is made
/// between "no token", "not a bearer token", and "invalid token".
fn bearer_token(parts: &Parts) -> Result<&str> {
    let header_value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(Error::Unauthenticated { message: None })?;

    header_value
        .strip_prefix("Bearer ")
        .ok_or(Error::Unauthenticated { message: None })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    /// Authenticate a request from its access token.
    ///
    /// The token is self-contained, so no database round-trip happens here. A
    /// deleted user keeps a working access token until it expires.
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?;
        tokens::verify_access_token(token, &state.config)
    }
}

/// Require the exact Admin role.
///
/// Role checks are exact-match; there is no hierarchy between the two roles.
pub fn require_admin(user: &CurrentUser) -> Result<()> {
    if user.role == Role::Admin {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions { required: Role::Admin })
    }
}
