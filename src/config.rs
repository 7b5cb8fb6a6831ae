use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Default location of the TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address to bind to.
    pub host: String,
    /// Port number to listen on.
    pub port: u16,
    /// Token signing settings.
    pub auth: AuthSettings,
    /// Image storage settings.
    pub storage: StorageSettings,
    /// Accounts created at startup.
    pub users: Vec<SeedUser>,
    /// Metrics exporter configuration.
    pub metrics: MetricsSettings,
    /// TLS configuration.
    pub tls: TlsSettings,
}

/// Token signing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC secret used to sign access tokens.
    pub secret_key: String,
    /// Lifetime of an issued token, in seconds.
    pub token_duration_secs: u64,
}

impl AuthSettings {
    /// Token lifetime.
    pub fn token_duration(&self) -> Duration {
        Duration::from_secs(self.token_duration_secs)
    }
}

/// Image storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Folder uploaded images are written to.
    pub image_folder: String,
    /// Largest accepted upload, in bytes.
    pub max_image_size: usize,
}

/// An account created at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeedUser {
    /// Login name.
    pub username: String,
    /// Plaintext password, hashed before it is stored.
    pub password: String,
    /// Granted role.
    pub role: Role,
}

/// Metrics exporter settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Whether metrics export is enabled.
    pub enabled: bool,
    /// Hostname or IP address for metrics server.
    pub host: String,
    /// Port number for metrics server.
    pub port: u16,
}

impl MetricsSettings {
    /// Socket address of the metrics endpoint.
    pub fn addr(&self) -> Result<SocketAddr, String> {
        parse_addr(&self.host, self.port)
    }
}

/// TLS configuration settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Whether TLS is enabled.
    pub enabled: bool,
    /// Path to TLS certificate file (PEM format).
    pub cert_path: String,
    /// Path to TLS private key file (PEM format).
    pub key_path: String,
    /// CA bundle for client certificates. When set, clients must present a
    /// certificate signed by it.
    #[serde(default)]
    pub client_ca_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            auth: AuthSettings {
                secret_key: "secret".to_string(),
                token_duration_secs: 15 * 60,
            },
            storage: StorageSettings {
                image_folder: "img".to_string(),
                max_image_size: 1 << 20,
            },
            users: vec![
                SeedUser {
                    username: "admin1".to_string(),
                    password: "secret".to_string(),
                    role: Role::Admin,
                },
                SeedUser {
                    username: "user1".to_string(),
                    password: "secret".to_string(),
                    role: Role::User,
                },
            ],
            metrics: MetricsSettings {
                enabled: false,
                host: "127.0.0.1".to_string(),
                port: 9090,
            },
            tls: TlsSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Socket address the gRPC server listens on.
    pub fn addr(&self) -> Result<SocketAddr, String> {
        parse_addr(&self.host, self.port)
    }

    /// Built-in defaults as a figment provider chain.
    pub fn defaults() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// Defaults, then the TOML file at `config_path` if it exists, then
    /// `SERVER_`-prefixed environment variables (`__` separates nested keys,
    /// e.g. `SERVER_AUTH__SECRET_KEY`).
    pub fn figment(config_path: impl AsRef<Path>) -> Figment {
        Self::defaults()
            .merge(Toml::file(config_path.as_ref()))
            .merge(Env::prefixed("SERVER_").split("__"))
    }

    /// Loads configuration from `.env` file, TOML file, and environment variables.
    ///
    /// The TOML file path can be set via `SERVER_CONFIG_PATH`; it defaults
    /// to `config/server.toml` and is skipped when missing.
    ///
    /// # Errors
    /// Returns an error if a source is malformed or a value has the wrong type.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> figment::error::Result<Self> {
        let _ = dotenvy::dotenv();

        let config_path = std::env::var("SERVER_CONFIG_PATH")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::figment(config_path).extract()
    }

    /// Validates the configuration before the server starts.
    ///
    /// # Errors
    /// Returns a message naming the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.addr()?;

        if self.auth.secret_key.is_empty() {
            return Err("auth.secret_key cannot be empty".to_string());
        }

        if self.auth.token_duration_secs == 0 {
            return Err("auth.token_duration_secs cannot be zero".to_string());
        }

        if self.storage.max_image_size == 0 {
            return Err("storage.max_image_size cannot be zero".to_string());
        }

        if self.users.is_empty() {
            return Err("at least one seed user is required".to_string());
        }

        let mut seen = HashSet::new();
        for user in &self.users {
            if user.username.is_empty() {
                return Err("seed user name cannot be empty".to_string());
            }
            if !seen.insert(user.username.as_str()) {
                return Err(format!("duplicate seed user '{}'", user.username));
            }
        }

        if self.metrics.enabled {
            self.metrics.addr()?;
        }

        if self.tls.enabled {
            if self.tls.cert_path.is_empty() {
                return Err("TLS is enabled but cert_path is empty".to_string());
            }
            if self.tls.key_path.is_empty() {
                return Err("TLS is enabled but key_path is empty".to_string());
            }

            let files = [
                Some(&self.tls.cert_path),
                Some(&self.tls.key_path),
                self.tls.client_ca_path.as_ref(),
            ];
            for path in files.into_iter().flatten() {
                if !Path::new(path).exists() {
                    return Err(format!("TLS file does not exist: {path}"));
                }
            }
        }

        Ok(())
    }
}

fn parse_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid address {host}:{port}: {e}"))
}
