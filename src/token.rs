//! Manage json web tokens.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::Role;
use crate::config::DEFAULT_TOKEN_LIFETIME;
use crate::error::Result;

const DEFAULT_AUDIENCE: &str = "barberx";

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// Account ID.
    pub sub: Uuid,
    /// Account role.
    pub role: Role,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    name: String,
    audience: String,
    lifetime: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] instance signing with HMAC-SHA256.
    pub fn new(name: &str, secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            name: name.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Set `audience` field on JWT.
    pub fn audience(&mut self, audience: &str) {
        self.audience = audience.to_owned();
    }

    /// Set token lifetime, in seconds.
    pub fn lifetime(&mut self, seconds: u64) {
        self.lifetime = seconds;
    }

    /// Token lifetime, in seconds.
    pub fn expires_in(&self) -> u64 {
        self.lifetime
    }

    /// Create a new [`jsonwebtoken`].
    pub fn create(&self, account_id: Uuid, role: Role) -> Result<String> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            aud: self.audience.clone(),
            exp: now.saturating_add(self.lifetime),
            iat: now,
            iss: self.name.clone(),
            sub: account_id,
            role,
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}
