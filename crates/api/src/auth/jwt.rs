//! Validation of access tokens issued by the identity provider.
//!
//! Tokens are HS256 JWTs whose `sub` claim is the acting user's id. The
//! service never issues tokens in production; [`issue_token`] exists for
//! tests and local tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tessera_core::types::DbId;
use uuid::Uuid;

/// Allowed clock skew between the identity provider and this service.
const DEFAULT_LEEWAY_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Acting user id.
    pub sub: DbId,
    pub exp: i64,
    pub iat: i64,
    /// Token id, logged for audit.
    pub jti: String,
}

/// Shared-secret settings for token validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// Read `JWT_SECRET` (required, non-empty) and `JWT_LEEWAY_SECS` (default 60).
    ///
    /// # Panics
    ///
    /// When the secret is missing or empty, or the leeway is not a number.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let leeway_secs = std::env::var("JWT_LEEWAY_SECS")
            .ok()
            .map(|v| v.parse().expect("JWT_LEEWAY_SECS must be a non-negative integer"))
            .unwrap_or(DEFAULT_LEEWAY_SECS);

        Self { secret, leeway_secs }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation
    }
}

/// Sign a token for `user_id` valid for `ttl`.
pub fn issue_token(
    user_id: DbId,
    ttl: Duration,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry, returning the claims.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )
    .map(|data| data.claims)
}
