//! Database-facing user models.

use crate::api::models::users::Role;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Request to insert a new user row.
///
/// The email must already be normalized to lowercase by the caller.
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Partial update of a user row. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

/// Full user row, including the password hash.
///
/// This type never crosses the API boundary; handlers project it into
/// `api::models::users::UserResponse` before serializing.
#[derive(Debug, Clone, FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub signup_date: DateTime<Utc>,
}
