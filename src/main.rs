use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use campaignd::bootstrap::Server;
use campaignd::config::Config;
use campaignd::telemetry::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(name = "campaignd")]
#[command(author, version, about = "Rate-limited bulk campaign dispatch engine")]
struct Args {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate config and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration first (to get log settings)
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let tracing_config = TracingConfig {
        service_name: "campaignd".to_string(),
        log_level: config.settings.log_level.clone(),
        json_logs: config.settings.json_logs,
    };
    init_tracing(&tracing_config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args
            .config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string()),
        "starting campaignd"
    );

    // Validate only mode
    if args.validate {
        config.validate()?;
        info!("configuration is valid");
        return Ok(());
    }

    let server = Server::new(config);
    server.run().await?;

    Ok(())
}
