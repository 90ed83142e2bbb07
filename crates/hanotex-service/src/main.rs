//! hanotexd: HANOTEX contract confirmation service

use anyhow::Context;
use clap::Parser;
use hanotex_service::config::ServiceConfig;
use hanotex_service::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hanotexd")]
#[command(about = "HANOTEX contract confirmation service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HANOTEX_CONFIG")]
    config: Option<String>,

    /// Listen address, overrides `server.listen_addr`
    #[arg(short, long, env = "HANOTEX_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log filter, overrides `logging.level`
    #[arg(long, env = "HANOTEX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "HANOTEX_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .with_context(|| format!("invalid listen address '{listen}'"))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    init_tracing(&config.logging.level, config.logging.json);

    let server = Server::new(config).await?;
    server.run().await?;
    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
