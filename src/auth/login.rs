use std::sync::Arc;

use tracing::debug;

use super::jwt::TokenManager;
use super::users::{check_password, UserStore};
use crate::{Error, Result};

/// Exchanges username/password for a session token.
#[derive(Clone)]
pub struct Authenticator {
    users: UserStore,
    tokens: Arc<TokenManager>,
}

impl Authenticator {
    /// Creates an authenticator over the given credential store.
    pub fn new(users: UserStore, tokens: Arc<TokenManager>) -> Self {
        Self { users, tokens }
    }

    /// Verifies the password and issues a token.
    ///
    /// Unknown users and wrong passwords produce the same error after the
    /// same amount of hashing work.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let account = self.users.find(username).await;
        let verified = check_password(account.as_ref(), password).await?;

        match account {
            Some(account) if verified => {
                debug!(username, role = %account.role, "issuing access token");
                self.tokens.issue(&account.username, account.role)
            }
            _ => Err(Error::Unauthenticated(
                "incorrect username or password".to_string(),
            )),
        }
    }
}

fn bad_credentials() -> Error {
    Error::Unauthenticated("incorrect username or password".to_string())
}
