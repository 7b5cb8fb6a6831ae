use tonic::transport::Channel;
use tracing::debug;

use crate::proto::auth_service_client::AuthServiceClient;
use crate::proto::LoginRequest;
use crate::Result;

/// Anything that can produce a fresh access token.
#[tonic::async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// Obtains a new token.
    async fn login(&self) -> Result<String>;
}

/// Calls `AuthService/Login` with fixed credentials.
#[derive(Clone)]
pub struct AuthClient {
    client: AuthServiceClient<Channel>,
    username: String,
    password: String,
}

impl AuthClient {
    /// Creates a client logging in as `username` over `channel`.
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Username this client logs in as.
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[tonic::async_trait]
impl TokenSource for AuthClient {
    async fn login(&self) -> Result<String> {
        let mut client = self.client.clone();
        let response = client
            .login(LoginRequest {
                username: self.username.clone(),
                password: self.password.clone(),
            })
            .await?;

        debug!(username = %self.username, "logged in");
        Ok(response.into_inner().access_token)
    }
}
