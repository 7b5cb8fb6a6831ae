use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use pcbook::auth::AccessPolicy;
use pcbook::client::{AuthClient, LaptopClient, TokenRefresher};
use pcbook::proto::memory::Unit;
use pcbook::proto::{Filter, Memory};
use pcbook::sample;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "Laptop catalog client", long_about = None)]
struct Cli {
    /// Server address
    #[arg(short, long, env = "PCBOOK_ADDRESS", default_value = "http://127.0.0.1:50051")]
    address: String,

    /// Account to log in as
    #[arg(short, long, env = "PCBOOK_USERNAME", default_value = "admin1")]
    username: String,

    /// Account password
    #[arg(short, long, env = "PCBOOK_PASSWORD", default_value = "secret")]
    password: String,

    /// Seconds between token refreshes
    #[arg(long, env = "PCBOOK_REFRESH_SECS", default_value = "30")]
    refresh_secs: u64,

    /// CA certificate for a TLS connection (PEM)
    #[arg(long, env = "PCBOOK_CA_CERT")]
    ca_cert: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create random laptops
    Create {
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Create random laptops, then search the catalog
    Search {
        #[arg(long, default_value = "10")]
        create: usize,

        #[arg(long, default_value = "3000")]
        max_price: f64,

        #[arg(long, default_value = "4")]
        min_cores: u32,

        #[arg(long, default_value = "2.5")]
        min_ghz: f64,

        #[arg(long, default_value = "8", help = "Minimum RAM in gigabytes")]
        min_ram_gb: u64,
    },

    /// Upload an image for a laptop (a new random one unless --laptop-id is given)
    Upload {
        #[arg(short, long)]
        image: PathBuf,

        #[arg(long)]
        laptop_id: Option<String>,
    },

    /// Create random laptops and rate them with random scores
    Rate {
        #[arg(short, long, default_value = "3")]
        count: usize,

        #[arg(short, long, default_value = "1")]
        rounds: usize,
    },
}

async fn connect(cli: &Cli) -> Result<Channel, Box<dyn std::error::Error>> {
    let mut endpoint = Endpoint::from_shared(cli.address.clone())?;

    if let Some(ca_path) = &cli.ca_cert {
        let ca = tokio::fs::read(ca_path).await?;
        let tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(ca));
        endpoint = endpoint.tls_config(tls)?;
    }

    Ok(endpoint.connect().await?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(address = %cli.address, "dial server");
    let channel = connect(&cli).await?;

    let refresher = TokenRefresher::start(
        AuthClient::new(channel.clone(), cli.username.clone(), cli.password.clone()),
        Duration::from_secs(cli.refresh_secs),
    )
    .await?;
    let interceptor = refresher.interceptor(AccessPolicy::laptop_service().protected_methods());
    let laptops = LaptopClient::new(channel, interceptor);

    match cli.command {
        Commands::Create { count } => {
            for _ in 0..count {
                let id = laptops.create_laptop(sample::new_laptop()).await?;
                println!("Created laptop {id}");
            }
        }

        Commands::Search {
            create,
            max_price,
            min_cores,
            min_ghz,
            min_ram_gb,
        } => {
            for _ in 0..create {
                laptops.create_laptop(sample::new_laptop()).await?;
            }

            let filter = Filter {
                max_price_usd: max_price,
                min_cpu_cores: min_cores,
                min_cpu_ghz: min_ghz,
                min_ram: Some(Memory {
                    value: min_ram_gb,
                    unit: Unit::Gigabyte as i32,
                }),
            };

            let found = laptops.search_laptop(filter).await?;
            println!("Found {} laptop(s)", found.len());
            for laptop in found {
                let cpu = laptop.cpu.unwrap_or_default();
                println!(
                    "  {} {} {}: {} cores @ {:.2}GHz, ${:.2}",
                    laptop.id,
                    laptop.brand,
                    laptop.name,
                    cpu.number_cores,
                    cpu.min_ghz,
                    laptop.price_usd
                );
            }
        }

        Commands::Upload { image, laptop_id } => {
            let laptop_id = match laptop_id {
                Some(id) => id,
                None => laptops.create_laptop(sample::new_laptop()).await?,
            };

            let response = laptops.upload_image_file(&laptop_id, &image).await?;
            println!(
                "Uploaded image {} ({} bytes) for laptop {laptop_id}",
                response.id, response.size
            );
        }

        Commands::Rate { count, rounds } => {
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                ids.push(laptops.create_laptop(sample::new_laptop()).await?);
            }

            for round in 1..=rounds {
                let scores = ids
                    .iter()
                    .map(|id| (id.clone(), sample::random_laptop_score()))
                    .collect();

                println!("Round {round}");
                for response in laptops.rate_laptops(scores).await? {
                    println!(
                        "  {}: rated {} time(s), average {:.2}",
                        response.laptop_id, response.rated_count, response.average_score
                    );
                }
            }
        }
    }

    refresher.shutdown().await;
    Ok(())
}
