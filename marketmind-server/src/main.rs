use clap::Parser;
use marketmind_core::{ContentRepository, MarketMindConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "marketmind.toml")]
    config: String,

    /// Check that the content directory is readable and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match MarketMindConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.health {
        let repository = ContentRepository::from_config(&config.storage);
        match repository.list(None).await {
            Ok(records) => {
                println!("✅ Content directory: {}", repository.location());
                println!("✅ Stored records: {}", records.len());
            }
            Err(e) => {
                println!("❌ Content directory check failed: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    marketmind_server::http::start_http_server(config, tx.subscribe()).await?;

    Ok(())
}
