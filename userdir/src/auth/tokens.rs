//! JWT access and refresh token creation and verification.
//!
//! The two token kinds are signed with separate secrets. Refresh tokens
//! additionally carry a `typ: "refresh"` claim so that an access token can
//! never be replayed against the refresh endpoint even though both are HS256.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    api::models::users::{CurrentUser, Role},
    config::Config,
    errors::Error,
    types::UserId,
};

/// Type marker carried by refresh tokens.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Claims carried by short-lived access tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,   // Subject (user ID)
    pub email: String, // User email
    pub role: Role,    // User role
    pub exp: i64,      // Expiration time
    pub iat: i64,      // Issued at
}

impl AccessClaims {
    pub fn new(user: &CurrentUser, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.auth.access_expiry;

        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

impl From<AccessClaims> for CurrentUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Claims carried by refresh tokens.
///
/// `typ` defaults to empty when absent so that a signed token without the
/// marker still decodes and then fails the explicit marker check.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub typ: String,
    pub exp: i64,
    pub iat: i64,
}

impl RefreshClaims {
    pub fn new(user: &CurrentUser, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + config.auth.refresh_expiry;

        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            typ: REFRESH_TOKEN_TYPE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Create a short-lived access token for a user
pub fn create_access_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    let claims = AccessClaims::new(user, config);
    let secret = config.auth.access_secret.as_ref().ok_or_else(|| Error::Internal {
        operation: "JWT: access_secret is required".to_string(),
    })?;

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create access token: {e}"),
    })
}

/// Create a refresh token for a user
pub fn create_refresh_token(user: &CurrentUser, config: &Config) -> Result<String, Error> {
    let claims = RefreshClaims::new(user, config);
    let secret = config.auth.refresh_secret.as_ref().ok_or_else(|| Error::Internal {
        operation: "JWT: refresh_secret is required".to_string(),
    })?;

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create refresh token: {e}"),
    })
}

/// Verify and decode an access token
pub fn verify_access_token(token: &str, config: &Config) -> Result<CurrentUser, Error> {
    let secret = config.auth.access_secret.as_ref().ok_or_else(|| Error::Internal {
        operation: "JWT: access_secret is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<AccessClaims>(token, &key, &Validation::default()).map_err(map_token_error)?;

    Ok(CurrentUser::from(token_data.claims))
}

/// Verify and decode a refresh token, including the type marker check
pub fn verify_refresh_token(token: &str, config: &Config) -> Result<RefreshClaims, Error> {
    let secret = config.auth.refresh_secret.as_ref().ok_or_else(|| Error::Internal {
        operation: "JWT: refresh_secret is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<RefreshClaims>(token, &key, &Validation::default()).map_err(map_token_error)?;

    // A token signed with the refresh secret but missing the marker is still rejected
    if token_data.claims.typ != REFRESH_TOKEN_TYPE {
        return Err(Error::Unauthenticated { message: None });
    }

    Ok(token_data.claims)
}

/// Map jsonwebtoken errors onto the service error model.
///
/// Anything the client can cause (tampered, expired, malformed) is a uniform 401;
/// key and serialization failures are server errors.
fn map_token_error(e: jsonwebtoken::errors::Error) -> Error {
    match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("JWT verification: {e}"),
        },

        // Catch-all for any future error variants (default to server error for safety)
        _ => Error::Internal {
            operation: format!("JWT verification (unknown error): {e}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    fn create_test_user() -> CurrentUser {
        CurrentUser {
            id: 42,
            email: "test@example.com".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn test_create_and_verify_access_token() {
        let config = create_test_config();
        let user = create_test_user();

        let token = create_access_token(&user, &config).unwrap();
        assert!(!token.is_empty());

        let verified = verify_access_token(&token, &config).unwrap();
        assert_eq!(verified.id, user.id);
        assert_eq!(verified.email, user.email);
        assert_eq!(verified.role, user.role);
    }

    #[test]
    fn test_create_and_verify_refresh_token() {
        let config = create_test_config();
        let user = create_test_user();

        let token = create_refresh_token(&user, &config).unwrap();
        let claims = verify_refresh_token(&token, &config).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.typ, REFRESH_TOKEN_TYPE);
    }

    #[test]
    fn test_access_token_rejected_by_refresh_verification() {
        let config = create_test_config();
        let user = create_test_user();

        // Signed with the access secret, so the refresh secret check fails first
        let token = create_access_token(&user, &config).unwrap();
        let result = verify_refresh_token(&token, &config);
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_refresh_token_rejected_by_access_verification() {
        let config = create_test_config();
        let user = create_test_user();

        let token = create_refresh_token(&user, &config).unwrap();
        let result = verify_access_token(&token, &config);
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_token_without_type_marker_rejected_by_refresh_verification() {
        let config = create_test_config();
        let user = create_test_user();

        // Sign access-shaped claims with the *refresh* secret. The signature
        // verifies, so only the marker check stands between the two token kinds.
        let claims = AccessClaims::new(&user, &config);
        let secret = config.auth.refresh_secret.as_ref().unwrap();
        let key = EncodingKey::from_secret(secret.as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = verify_refresh_token(&token, &config);
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_verify_token_wrong_secret() {
        let mut config = create_test_config();
        let user = create_test_user();

        let token = create_access_token(&user, &config).unwrap();

        config.auth.access_secret = Some("different-secret".to_string());
        let result = verify_access_token(&token, &config);
        // Should be Unauthenticated (InvalidSignature), not Internal error
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_verify_expired_token() {
        let config = create_test_config();
        let user = create_test_user();

        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: (now - chrono::Duration::seconds(3600)).timestamp(), // 1 hour ago
            iat: now.timestamp(),
        };

        let secret = config.auth.access_secret.as_ref().unwrap();
        let key = EncodingKey::from_secret(secret.as_bytes());
        let token = encode(&Header::default(), &claims, &key).unwrap();

        let result = verify_access_token(&token, &config);
        // Should be Unauthenticated (ExpiredSignature), not Internal error
        assert!(matches!(result, Err(Error::Unauthenticated { .. })));
    }

    #[test]
    fn test_verify_malformed_tokens() {
        let config = create_test_config();

        let malformed_tokens = vec!["not.a.token", "invalid", "", "too.many.parts.in.this.token"];

        for token in malformed_tokens {
            let result = verify_access_token(token, &config);
            assert!(
                matches!(result, Err(Error::Unauthenticated { .. })),
                "Expected Unauthenticated error for token: {}",
                token
            );
        }
    }
}
