use clap::Parser;
use scriptbin::{config::Config, start_server_with_config};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// In-memory script and snippet hosting server
#[derive(Debug, Parser)]
#[command(name = "scriptbin", version, about)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overrides the configuration file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides the configuration file
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of static files served for unmatched paths
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.static_dir.is_some() {
            config.static_dir = self.static_dir;
        }
        config
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = Config::load(args.config.as_deref())?;
    let config = args.apply(config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let port = start_server_with_config(config, shutdown_rx).await?;
    info!("scriptbin ready on port {}", port);

    // Wait for Ctrl-C
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, stopping server...");

    let _ = shutdown_tx.send(());
    // Give in-flight requests a short grace period
    tokio::time::sleep(Duration::from_millis(200)).await;

    info!("server stopped");
    Ok(())
}
