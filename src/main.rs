//! Ascent API Server Binary

use ascent::api::ApiServer;
use ascent::config::ConfigLoader;
use ascent::session_store::SessionStore;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ascent")]
#[command(about = "Crash game API server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// API server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// API server port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ascent=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    ConfigLoader::validate(&config)?;

    let engine = config.game.build_engine()?;
    info!(
        house_edge = %engine.house_edge(),
        source = engine.source().name(),
        "Round engine ready"
    );
    if let Some(key) = engine.source().public_key_hex() {
        info!("VRF public key: {}", key);
    }

    let sessions = SessionStore::new(
        engine,
        config.game.starting_amount()?,
        config.game.history_limit,
    )
    .with_limits(config.game.session_limits());

    ApiServer::new(config.api, sessions).run().await
}
