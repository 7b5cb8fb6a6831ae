use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pcbook::auth::{
    AccessPolicy, Account, AuthInterceptor, Authenticator, MethodPathLayer, TokenManager,
    UserStore,
};
use pcbook::config::ServerConfig;
use pcbook::proto::auth_service_server::AuthServiceServer;
use pcbook::proto::laptop_service_server::LaptopServiceServer;
use pcbook::service::{AuthServiceImpl, LaptopServiceImpl};
use pcbook::store::{Catalog, DiskImageStore};
use tokio::signal;
use tonic::transport::{Certificate, Identity, Server, ServerTlsConfig};
use tonic_health::server::{health_reporter, HealthReporter};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Laptop catalog gRPC server", long_about = None)]
#[command(version)]
struct Args {
    /// Host to bind to (overrides the configuration)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on (overrides the configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable metrics endpoint
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ServerConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {e}");
        format!("Invalid configuration: {e}")
    })?;

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.metrics {
        config.metrics.enabled = true;
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {e}");
        return Err(format!("Invalid configuration: {e}").into());
    }

    if config.auth.secret_key == ServerConfig::default().auth.secret_key {
        warn!("Using the built-in token secret; set SERVER_AUTH__SECRET_KEY in production");
    }

    let users = UserStore::new();
    for seed in &config.users {
        users
            .save(Account::hashed(&seed.username, &seed.password, seed.role).await?)
            .await?;
        info!(username = %seed.username, role = %seed.role, "seeded user");
    }

    let tokens = Arc::new(TokenManager::new(
        config.auth.secret_key.as_bytes(),
        config.auth.token_duration(),
    ));
    let interceptor = AuthInterceptor::new(
        Arc::clone(&tokens),
        AccessPolicy::laptop_service(),
    );

    let auth_service = AuthServiceImpl::new(Authenticator::new(users, tokens));
    let catalog = Catalog::new(Arc::new(DiskImageStore::new(&config.storage.image_folder)));
    let laptop_service = LaptopServiceImpl::new(catalog, config.storage.max_image_size);

    if config.metrics.enabled {
        let metrics_addr = config.metrics.addr()?;
        if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
        {
            error!("Failed to start metrics server: {e}");
        } else {
            info!("Metrics server started on {metrics_addr}");
        }
    }

    let (mut health_reporter, health_service) = health_reporter();
    health_reporter
        .set_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<LaptopServiceServer<LaptopServiceImpl>>()
        .await;

    let mut builder = Server::builder();

    if config.tls.enabled {
        let cert = tokio::fs::read(&config.tls.cert_path).await?;
        let key = tokio::fs::read(&config.tls.key_path).await?;
        let mut tls = ServerTlsConfig::new().identity(Identity::from_pem(cert, key));

        if let Some(ca_path) = &config.tls.client_ca_path {
            let ca = tokio::fs::read(ca_path).await?;
            tls = tls.client_ca_root(Certificate::from_pem(ca));
            info!("Mutual TLS enabled");
        }

        builder = builder.tls_config(tls)?;
    }

    let addr = config.addr()?;
    info!(
        %addr,
        tls = config.tls.enabled,
        metrics = config.metrics.enabled,
        image_folder = %config.storage.image_folder,
        "Server starting"
    );

    builder
        .layer(MethodPathLayer)
        .add_service(health_service)
        .add_service(AuthServiceServer::with_interceptor(
            auth_service,
            interceptor.clone(),
        ))
        .add_service(LaptopServiceServer::with_interceptor(
            laptop_service,
            interceptor,
        ))
        .serve_with_shutdown(addr, shutdown_signal(health_reporter))
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(mut health_reporter: HealthReporter) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    health_reporter
        .set_not_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;
    health_reporter
        .set_not_serving::<LaptopServiceServer<LaptopServiceImpl>>()
        .await;

    info!("Initiating graceful shutdown (allowing in-flight requests to complete)");

    tokio::time::sleep(Duration::from_secs(2)).await;
}
