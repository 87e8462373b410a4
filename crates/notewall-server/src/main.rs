use std::path::PathBuf;

use clap::Parser;
use notewall_server::ServerConfig;
use tracing_subscriber::EnvFilter;

/// Anonymous message wall server.
#[derive(Parser, Debug)]
#[command(name = "notewall", version, about)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding config and environment
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    notewall_server::run(config).await
}
