//! Signed session tokens.

use chrono::{Duration, Utc};
use civic_common::{AppError, AppResult, config::AuthConfig};
use civic_db::entities::user::UserRole;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::access::Caller;

/// JWT session claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Role at issue time.
    pub role: UserRole,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl From<SessionClaims> for Caller {
    fn from(claims: SessionClaims) -> Self {
        Self::new(claims.sub, claims.role)
    }
}

/// HS256 signing and verification keys plus the token lifetime.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl SessionKeys {
    /// Build keys from the auth configuration.
    pub fn from_config(config: &AuthConfig) -> AppResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::Config("auth.jwt_secret must be set".to_string()));
        }
        Ok(Self::new(
            config.jwt_secret.as_bytes(),
            Duration::days(config.token_expiry_days),
        ))
    }

    /// Build keys from a raw secret.
    #[must_use]
    pub fn new(secret: &[u8], expiry: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            expiry,
        }
    }

    /// Issue a token for a user.
    pub fn issue(&self, user_id: &str, role: UserRole) -> AppResult<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("create JWT: {e}")))
    }

    /// Verify a token and return the caller it names.
    ///
    /// Expiry is checked against the token's own `exp` claim.
    pub fn verify(&self, token: &str) -> AppResult<Caller> {
        let token_data = decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidToken
                | ErrorKind::InvalidSignature
                | ErrorKind::ExpiredSignature
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidSubject
                | ErrorKind::ImmatureSignature
                | ErrorKind::Base64(_)
                | ErrorKind::Json(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::InvalidAlgorithm => AppError::Unauthorized,

                _ => AppError::Internal(format!("JWT verification: {e}")),
            })?;

        Ok(token_data.claims.into())
    }
}
