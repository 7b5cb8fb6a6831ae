//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use pcbook::auth::{
    AccessPolicy, Account, AuthInterceptor, Authenticator, MethodPathLayer, Role, TokenManager,
    UserStore,
};
use pcbook::client::{AuthClient, LaptopClient, TokenRefresher};
use pcbook::proto::auth_service_server::AuthServiceServer;
use pcbook::proto::laptop_service_server::LaptopServiceServer;
use pcbook::service::{AuthServiceImpl, LaptopServiceImpl};
use pcbook::store::{Catalog, DiskImageStore};
use tempfile::TempDir;
use tonic::transport::{Channel, Endpoint, Server};

/// Largest image the test server accepts.
pub const MAX_IMAGE_SIZE: usize = 4 * 1024;

/// Initialize test tracing (call once at the beginning of tests).
///
/// Only logs from this crate are shown, filtering out HTTP/2 and tower noise.
/// Subsequent calls are safe and will be ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new("pcbook=debug,integration_tests=info");

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter)
        .try_init();
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub url: String,
    pub images: TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts a server seeded with `admin1`/`secret` (admin) and
/// `user1`/`secret` (user).
pub async fn start_test_server() -> TestServer {
    let users = UserStore::new();
    users
        .save(Account::hashed("admin1", "secret", Role::Admin).await.unwrap())
        .await
        .unwrap();
    users
        .save(Account::hashed("user1", "secret", Role::User).await.unwrap())
        .await
        .unwrap();

    let tokens = Arc::new(TokenManager::new(
        b"integration-secret",
        Duration::from_secs(60),
    ));
    let interceptor = AuthInterceptor::new(
        Arc::clone(&tokens),
        AccessPolicy::laptop_service(),
    );

    let images = tempfile::tempdir().unwrap();
    let catalog = Catalog::new(Arc::new(DiskImageStore::new(images.path())));

    let auth_service = AuthServiceImpl::new(Authenticator::new(users, tokens));
    let laptop_service = LaptopServiceImpl::new(catalog, MAX_IMAGE_SIZE);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let local_addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        Server::builder()
            .layer(MethodPathLayer)
            .add_service(AuthServiceServer::with_interceptor(
                auth_service,
                interceptor.clone(),
            ))
            .add_service(LaptopServiceServer::with_interceptor(
                laptop_service,
                interceptor,
            ))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer {
        url: format!("http://{local_addr}"),
        images,
        handle,
    }
}

/// Opens a channel to `url`.
pub async fn connect(url: &str) -> Channel {
    Endpoint::from_shared(url.to_string())
        .unwrap()
        .connect()
        .await
        .expect("Failed to connect to server")
}

/// Logs in as `username` and returns an authenticated catalog client.
pub async fn laptop_client(
    url: &str,
    username: &str,
    password: &str,
) -> (TokenRefresher, LaptopClient) {
    let channel = connect(url).await;
    let refresher = TokenRefresher::start(
        AuthClient::new(channel.clone(), username, password),
        Duration::from_secs(30),
    )
    .await
    .expect("Login should succeed");

    let interceptor = refresher.interceptor(AccessPolicy::laptop_service().protected_methods());
    (refresher, LaptopClient::new(channel, interceptor))
}
