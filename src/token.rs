//! Manage json web tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;

/// Tolerance, in seconds, applied to `exp` and `iat` checks.
const LEEWAY: u64 = 5;

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Principal email, the natural key used for federated reconciliation.
    pub sub: String,
    /// Principal numeric identifier.
    pub id: i64,
    /// Token identifier, fresh on every mint.
    pub jti: String,
}

/// Manage JWT tokens.
///
/// Holds the issuer and the shared symmetric secret, both injected at
/// construction and immutable afterwards. Minting and validation are pure
/// CPU-bound operations, safe to run concurrently.
#[derive(Clone)]
pub struct TokenManager {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance.
    pub fn new(issuer: &str, secret: &str) -> Self {
        Self {
            issuer: issuer.to_owned(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Create a new signed token bound to `principal`.
    ///
    /// Access and refresh tokens share this structure; only `lifetime`
    /// differs between the two kinds.
    pub fn create(
        &self,
        principal: &Principal,
        lifetime: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            exp: (now + lifetime.num_seconds()).max(0) as u64,
            iat: now.max(0) as u64,
            iss: self.issuer.clone(),
            sub: principal.email.clone(),
            id: principal.id,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// Check signature and lifetime of a token.
    ///
    /// Every failure mode, whether malformed input, wrong signature, expiry
    /// or a future `iat`, collapses to `false` so callers cannot tell them
    /// apart.
    pub fn validate(&self, token: &str) -> bool {
        match self.decode(token) {
            Ok(claims) => claims.iat <= Utc::now().timestamp().max(0) as u64 + LEEWAY,
            Err(_) => false,
        }
    }

    /// Decode and check a token.
    ///
    /// Accessor path over claims: call it only on tokens [`Self::validate`]
    /// accepted.
    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = LEEWAY;

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}
