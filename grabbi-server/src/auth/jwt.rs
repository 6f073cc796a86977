//! Access and refresh token service
//!
//! Both token kinds are HS256 over the same server secret. They differ in TTL
//! and issuer claim, and validation pins the issuer, so one kind can never be
//! replayed as the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Role, User};
use thiserror::Error;
use uuid::Uuid;

pub const ACCESS_ISSUER: &str = "grabbi-backend";
pub const REFRESH_ISSUER: &str = "grabbi-refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn issuer(&self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_ISSUER,
            TokenKind::Refresh => REFRESH_ISSUER,
        }
    }

    pub fn ttl(&self) -> Duration {
        match self {
            TokenKind::Access => Duration::hours(2),
            TokenKind::Refresh => Duration::days(7),
        }
    }
}

/// Claims carried by both token kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub franchise_id: Option<Uuid>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("token expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("token generation failed: {0}")]
    Generation(String),
}

impl From<JwtError> for AppError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AppError::new(ErrorCode::TokenExpired),
            JwtError::Invalid(_) => AppError::new(ErrorCode::TokenInvalid),
            JwtError::Generation(msg) => {
                tracing::error!(error = %msg, "Token generation failed");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

/// Token issuing and validation
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_access(&self, user: &User) -> Result<String, JwtError> {
        self.issue_at(TokenKind::Access, user, Utc::now())
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String, JwtError> {
        self.issue_at(TokenKind::Refresh, user, Utc::now())
    }

    pub fn issue_at(
        &self,
        kind: TokenKind,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            franchise_id: user.franchise_id,
            iat: now.timestamp(),
            exp: (now + kind.ttl()).timestamp(),
            iss: kind.issuer().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Generation(e.to_string()))
    }

    pub fn validate_access(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(TokenKind::Access, token)
    }

    pub fn validate_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate(TokenKind::Refresh, token)
    }

    fn validate(&self, kind: TokenKind, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[kind.issuer()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }
}

/// Token part of an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn user(role: Role, franchise_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "shopper@example.com".into(),
            password_hash: String::new(),
            name: "Shopper".into(),
            phone: None,
            role,
            franchise_id,
            loyalty_points: 0,
            is_blocked: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service() -> TokenService {
        TokenService::new("test-secret-that-is-long-enough-for-hs256")
    }

    #[test]
    fn test_access_roundtrip_preserves_identity() {
        let franchise = Uuid::new_v4();
        let u = user(Role::FranchiseStaff, Some(franchise));
        let token = service().issue_access(&u).unwrap();
        let claims = service().validate_access(&token).unwrap();

        assert_eq!(claims.user_id, u.id);
        assert_eq!(claims.email, u.email);
        assert_eq!(claims.role, Role::FranchiseStaff);
        assert_eq!(claims.franchise_id, Some(franchise));
        assert_eq!(claims.iss, ACCESS_ISSUER);
        assert_eq!(claims.exp - claims.iat, 2 * 3600);
    }

    #[test]
    fn test_refresh_ttl_is_seven_days() {
        let u = user(Role::Customer, None);
        let token = service().issue_refresh(&u).unwrap();
        let claims = service().validate_refresh(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
        assert_eq!(claims.franchise_id, None);
    }

    #[test]
    fn test_kinds_are_not_interchangeable() {
        let u = user(Role::Customer, None);
        let access = service().issue_access(&u).unwrap();
        let refresh = service().issue_refresh(&u).unwrap();

        assert!(matches!(
            service().validate_refresh(&access),
            Err(JwtError::Invalid(_))
        ));
        assert!(matches!(
            service().validate_access(&refresh),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_expired_token() {
        let u = user(Role::Customer, None);
        let issued = Utc::now() - Duration::hours(3);
        let token = service().issue_at(TokenKind::Access, &u, issued).unwrap();
        assert!(matches!(
            service().validate_access(&token),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let u = user(Role::Admin, None);
        let token = TokenService::new("another-secret").issue_access(&u).unwrap();
        assert!(matches!(
            service().validate_access(&token),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let u = user(Role::Admin, None);
        let now = Utc::now();
        let claims = Claims {
            user_id: u.id,
            email: u.email.clone(),
            role: u.role,
            franchise_id: None,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
            iss: ACCESS_ISSUER.into(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret-that-is-long-enough-for-hs256"),
        )
        .unwrap();
        assert!(service().validate_access(&token).is_err());
    }

    #[test]
    fn test_malformed_token() {
        assert!(matches!(
            service().validate_access("not.a.jwt"),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Basic dXNlcg=="), None);
        assert_eq!(extract_bearer("bearer abc"), None);
    }

    #[test]
    fn test_error_mapping() {
        let app: AppError = JwtError::Expired.into();
        assert_eq!(app.code, ErrorCode::TokenExpired);
        let app: AppError = JwtError::Invalid("x".into()).into();
        assert_eq!(app.http_status(), http::StatusCode::UNAUTHORIZED);
    }
}
