//! Request and response models for the authentication endpoints.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::users::UserResponse;

/// Self-service registration request. New users always get the USER role.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful authentication payload.
///
/// The refresh token never appears in a body; it travels only in the
/// HttpOnly cookie set alongside this response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
}

/// Registration response: 201 with the auth payload and the refresh cookie.
#[derive(Debug)]
pub struct RegisterResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::CREATED,
            [(header::SET_COOKIE, self.cookie)],
            axum::Json(self.auth_response),
        )
            .into_response()
    }
}

/// Login and refresh response: 200 with the auth payload and a fresh cookie.
#[derive(Debug)]
pub struct LoginResponse {
    pub auth_response: AuthResponse,
    pub cookie: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::SET_COOKIE, self.cookie)],
            axum::Json(self.auth_response),
        )
            .into_response()
    }
}

/// Logout response: 204 with an expired cookie.
#[derive(Debug)]
pub struct LogoutResponse {
    pub cookie: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        (StatusCode::NO_CONTENT, [(header::SET_COOKIE, self.cookie)]).into_response()
    }
}
