//! API-facing user models.
//!
//! The wire format is camelCase (`userId`, `firstName`, `signupDate`) and the
//! public projection has no password hash field at all, so it cannot leak.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// User role. Checks are exact-match: Admin does not imply User.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// The authenticated caller, as carried in the access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

/// Public projection of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub signup_date: DateTime<Utc>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(user: UserDBResponse) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            signup_date: user.signup_date,
        }
    }
}

impl From<UserResponse> for CurrentUser {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.user_id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Admin request to create a user. Unlike registration, an explicit role is allowed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Admin request to partially update a user. At least one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
    }
}

/// Optional search term for the user list endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring match against email, first name, and last name
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db_user() -> UserDBResponse {
        UserDBResponse {
            id: 1,
            email: "jane@example.com".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: Role::User,
            signup_date: Utc::now(),
        }
    }

    #[test]
    fn test_user_response_serializes_camel_case_without_hash() {
        let response = UserResponse::from(sample_db_user());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["userId"], 1);
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["firstName"], "Jane");
        assert_eq!(json["lastName"], "Doe");
        assert_eq!(json["role"], "USER");
        assert!(json.get("signupDate").is_some());

        // The projection type has no hash field, so none can appear in any casing
        let raw = json.to_string();
        assert!(!raw.contains("password"));
        assert!(!raw.contains("hash"));
    }

    #[test]
    fn test_role_serde_uppercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::from_str::<Role>("\"USER\"").unwrap(), Role::User);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn test_user_update_is_empty() {
        assert!(UserUpdate::default().is_empty());
        assert!(
            !UserUpdate {
                first_name: Some("Janet".to_string()),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
