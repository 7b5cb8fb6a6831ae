use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Error, Result};

/// Role carried by an account and embedded in its session tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May create laptops, upload images and rate.
    Admin,
    /// May rate laptops.
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(Error::InvalidArgument(format!("unknown role '{other}'"))),
        }
    }
}

/// Stored account record.
#[derive(Clone, Debug)]
pub struct Account {
    /// Unique login name.
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Role granted to the account.
    pub role: Role,
}

impl Account {
    /// Creates an account, hashing `password` with a fresh salt.
    ///
    /// Hashing is CPU-bound; async callers should use [`Account::hashed`].
    pub fn new(username: impl Into<String>, password: &str, role: Role) -> Result<Self> {
        Ok(Self {
            username: username.into(),
            password_hash: hash_password(password)?,
            role,
        })
    }

    /// Like [`Account::new`], hashing on the blocking pool.
    pub async fn hashed(username: impl Into<String>, password: &str, role: Role) -> Result<Self> {
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| Error::Internal(format!("password hashing task failed: {e}")))??;

        Ok(Self {
            username: username.into(),
            password_hash,
            role,
        })
    }

    /// Checks `password` against the stored hash.
    pub fn is_correct_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| Error::Internal("cannot hash password".to_string()))
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Hash of a random secret with the same parameters as every account hash.
/// Checked when no account matches, so a miss costs as much as a wrong
/// password.
fn absent_account_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(&Uuid::new_v4().to_string()).unwrap_or_default())
}

/// Verifies `password` against `account` on the blocking pool.
///
/// A missing account is verified against a throwaway hash and always
/// fails.
pub async fn check_password(account: Option<&Account>, password: &str) -> Result<bool> {
    let hash = account.map(|account| account.password_hash.clone());
    let password = password.to_string();

    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&hash, &password),
        None => {
            let _ = verify_password(absent_account_hash(), &password);
            false
        }
    })
    .await
    .map_err(|e| Error::Internal(format!("password check task failed: {e}")))
}

/// In-memory credential store keyed by username.
#[derive(Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<HashMap<String, Account>>>,
}

impl UserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account. Fails if the username is taken.
    pub async fn save(&self, account: Account) -> Result<()> {
        let mut users = self.users.write().await;

        if users.contains_key(&account.username) {
            return Err(Error::AlreadyExists(format!(
                "user '{}' already exists",
                account.username
            )));
        }

        users.insert(account.username.clone(), account);
        Ok(())
    }

    /// Looks up an account by username.
    pub async fn find(&self, username: &str) -> Option<Account> {
        self.users.read().await.get(username).cloned()
    }

    /// Number of stored accounts.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store has no accounts.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
