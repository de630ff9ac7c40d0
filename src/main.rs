use clap::{Parser, Subcommand};
use phone_lookup::config::AppConfig;
use phone_lookup::logging::init_logging;
use phone_lookup::posts::PostStore;
use phone_lookup::provider::VeriphoneClient;
use phone_lookup::resolver::Resolver;
use phone_lookup::server::{start_server, AppState};
use phone_lookup::storage::memory::InMemoryCacheBackend;
use phone_lookup::storage::sqlite::SqliteRecordBackend;
use phone_lookup::storage::{DurableStore, FastCache};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "phone_lookup")]
#[command(about = "Phone number lookup service with tiered caching")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP lookup service
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Resolve a single number and print the payload as JSON
    Lookup {
        /// Raw phone number, quoted if it contains spaces
        number: String,
        /// Region assumed for numbers without a country code
        #[arg(long)]
        region: Option<String>,
    },
}

fn build_resolver(config: &AppConfig) -> Result<Resolver, Box<dyn std::error::Error>> {
    let cache = FastCache::new(
        Arc::new(InMemoryCacheBackend::new()),
        config.cache_ttl_seconds,
        config.cache_path_prefix.clone(),
    );
    let store = DurableStore::new(Arc::new(SqliteRecordBackend::open(&config.database_path)?));
    let provider = Arc::new(VeriphoneClient::new(config)?);
    Ok(Resolver::new(
        cache,
        store,
        provider,
        config.default_region.clone(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Serve { port } => {
            let state = Arc::new(AppState {
                resolver: build_resolver(&config)?,
                posts: PostStore::new(config.posts_dir.clone()),
            });
            let port = port.unwrap_or(config.port);
            info!("Starting lookup service on port {}", port);
            start_server(state, port).await?;
        }
        Commands::Lookup { number, region } => {
            let mut config = config;
            if let Some(region) = region {
                config.default_region = region;
            }
            let resolver = build_resolver(&config)?;
            match resolver.lookup(&number).await {
                Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
                Err(err) => {
                    error!("Lookup failed: {}", err);
                    eprintln!("Lookup failed ({}): {}", err.http_status(), err);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
