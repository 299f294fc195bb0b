use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod codec;
mod config;
mod error;
mod filters;
mod server;
mod storage;

#[derive(Parser, Debug)]
#[command(name = "drawkiss-server")]
#[command(about = "Turns photos into black-and-white sketch references")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "DRAWKISS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "DRAWKISS_PORT", default_value = "8000")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 20MB)
    #[arg(long, env = "DRAWKISS_MAX_FILE_SIZE", default_value = "20971520")]
    pub max_file_size: usize,

    /// Supabase project URL used for publishing sketch references
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service role key
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: Option<String>,

    /// Storage bucket holding the published references
    #[arg(long, env = "STORAGE_BUCKET", default_value = "sketch-refs")]
    pub storage_bucket: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);

    tracing::info!("Starting drawkiss-server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Binding to {}:{}", config.host, config.port);
    if config.storage.is_none() {
        tracing::warn!("SUPABASE_URL/SUPABASE_SERVICE_KEY not set, /upload and /current are disabled");
    }

    server::run(config).await
}
