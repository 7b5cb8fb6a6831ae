//! Signed, time-limited session tokens.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::users::Role;
use crate::{Error, Result};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the token holder.
    pub sub: String,
    /// Role granted at issue time.
    pub role: Role,
    /// Issue time, seconds since UNIX epoch.
    pub iat: u64,
    /// Expiry time, seconds since UNIX epoch.
    pub exp: u64,
}

/// Issues and verifies HS256 tokens under a shared secret.
///
/// Tokens are stateless: nothing is recorded server-side, and there is no
/// revocation. A token stops verifying once `exp` is reached.
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_duration: Duration,
}

impl TokenManager {
    /// Creates a manager signing with `secret`, issuing tokens valid for
    /// `token_duration`.
    pub fn new(secret: &[u8], token_duration: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `verify_at`.
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_duration,
        }
    }

    /// Lifetime of newly issued tokens.
    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Issues a token for `username` with `role`, valid from now.
    pub fn issue(&self, username: &str, role: Role) -> Result<String> {
        self.issue_at(username, role, unix_now())
    }

    /// Issues a token as if the current time were `now` (seconds).
    pub fn issue_at(&self, username: &str, role: Role, now: u64) -> Result<String> {
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now,
            exp: now.saturating_add(self.token_duration.as_secs()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| Error::Internal("cannot generate access token".to_string()))
    }

    /// Verifies `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, unix_now())
    }

    /// Verifies signature, structure and expiry of `token` at time `now`.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| invalid_token())?;

        if now >= data.claims.exp {
            return Err(invalid_token());
        }

        Ok(data.claims)
    }
}

fn invalid_token() -> Error {
    Error::Unauthenticated("access token is invalid".to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| unreachable!("System time is after UNIX_EPOCH"))
        .as_secs()
}
