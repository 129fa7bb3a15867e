//! Hub API Server - REST surface for the application inventory hub.
//!
//! Opens (and seeds) the hub database, then serves the REST API until a
//! shutdown signal arrives.

mod error;
mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use hub_core::{Hub, HubSettings};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hub-api")]
#[command(about = "REST server for the application inventory hub")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// SQLite database file (overrides DB_PATH)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Seed directory (overrides DB_SEED_PATH)
    #[arg(long)]
    seed_path: Option<PathBuf>,

    /// Root of stored files (overrides BUCKET_PATH)
    #[arg(long)]
    bucket_path: Option<PathBuf>,

    /// Build string; a new build forces reseeding (overrides BUILD)
    #[arg(long)]
    build: Option<String>,
}

impl Args {
    fn settings(&self) -> hub_core::Result<HubSettings> {
        let mut settings = HubSettings::from_env()?;
        if let Some(path) = &self.db_path {
            settings.db_path = path.clone();
        }
        if let Some(path) = &self.seed_path {
            settings.seed_path = path.clone();
        }
        if let Some(path) = &self.bucket_path {
            settings.bucket_path = path.clone();
        }
        if let Some(build) = &self.build {
            settings.build = build.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Hub API Server");

    let settings = args.settings()?;
    info!(
        "Database: {}, seed: {}",
        settings.db_path.display(),
        settings.seed_path.display()
    );

    // Opening applies the seed bundle, which touches disk.
    let hub = tokio::task::spawn_blocking(move || Hub::open(settings)).await??;

    let addr = server::start_server(hub, &args.host, args.port).await?;

    // Port line for supervisors and tests started with --port 0.
    println!("HUB_PORT={}", addr.port());

    info!("Hub API running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
