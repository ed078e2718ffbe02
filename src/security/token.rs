use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Missing bearer credential")]
    MissingCredential,

    #[error("Malformed authorization header: {0}")]
    MalformedHeader(String),

    #[error("Invalid bearer token")]
    InvalidToken,

    #[error("Bearer token expired")]
    TokenExpired,

    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Session claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since the epoch; tokens without one never expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Verifies `Bearer <jwt>` credentials signed with a shared HS256 secret
#[derive(Clone)]
pub struct BearerAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl BearerAuth {
    pub fn from_secret(secret: &str) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret("secret is empty".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign `claims`, stamping `iat` and an expiry `ttl` from now
    pub fn issue(&self, mut claims: Claims, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        claims.iat = Some(now.timestamp());
        claims.exp = Some((now + ttl).timestamp());

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Check an `Authorization` header value and return its claims
    pub fn verify(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingCredential)?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AuthError::MalformedHeader("expected 'Bearer <token>'".to_string())
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MalformedHeader("empty token".to_string()));
        }

        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}
