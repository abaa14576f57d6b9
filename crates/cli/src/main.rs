//! CLI application for the waste collection tracking service.

mod import;

use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use tracing::{error, info};
use wastetrack_api::{build_router, AppState};
use wastetrack_db::{drivers, DbPool};
use wastetrack_telemetry::{init_logging, Metrics};

#[derive(Parser)]
#[command(name = "wastetrack")]
#[command(about = "Waste collection tracking and route optimization service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// SQLite database URL or path
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite://wastetrack.db")]
        database_url: String,

        /// API bind address
        #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8001")]
        bind_address: String,

        /// Log level
        #[arg(long, env = "LOG_LEVEL")]
        log_level: Option<String>,

        /// JSON-lines file receiving one sample per stored route
        #[arg(long, env = "AUDIT_PATH")]
        audit_path: Option<PathBuf>,
    },
    /// Create the schema and the sample drivers
    InitDb {
        /// SQLite database URL or path
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite://wastetrack.db")]
        database_url: String,
    },
    /// Import customer locations from a CSV file
    ImportCustomers {
        /// SQLite database URL or path
        #[arg(long, env = "DATABASE_URL", default_value = "sqlite://wastetrack.db")]
        database_url: String,

        /// Customer locations CSV path
        #[arg(long)]
        csv_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            database_url,
            bind_address,
            log_level,
            audit_path,
        } => {
            init_logging(log_level.as_deref())?;
            serve(&database_url, &bind_address, audit_path).await?;
        }
        Commands::InitDb { database_url } => {
            init_logging(None)?;
            let db = open(&database_url).await?;
            let created = drivers::seed_sample_drivers(&db).await?;
            info!("Database ready, {} sample drivers created", created);
        }
        Commands::ImportCustomers {
            database_url,
            csv_path,
        } => {
            init_logging(None)?;
            let db = open(&database_url).await?;
            let summary = import::import_customers(&db, &csv_path).await?;
            info!(
                "Imported {} customer locations, skipped {}",
                summary.imported, summary.skipped
            );
        }
    }

    Ok(())
}

async fn open(database_url: &str) -> anyhow::Result<DbPool> {
    let db = DbPool::new(database_url).await?;
    db.migrate().await?;
    Ok(db)
}

async fn serve(database_url: &str, bind_address: &str, audit_path: Option<PathBuf>) -> anyhow::Result<()> {
    info!("Starting waste collection tracking service");

    let db = open(database_url).await?;
    drivers::seed_sample_drivers(&db).await?;

    let metrics = Metrics::new()?;
    let app = build_router(AppState::new(db, metrics, audit_path));

    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("API listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// Resolve once `signal` fires. A listener that fails to install never
/// resolves, so the server keeps running instead of shutting down at once.
async fn wait_for_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_serving() {
        let failed = async { Err::<(), _>(std::io::Error::other("no signal handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(50), wait_for_signal(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_delivered_signal_shuts_down() {
        let delivered = async { Ok::<(), std::io::Error>(()) };
        let waited = tokio::time::timeout(Duration::from_secs(1), wait_for_signal(delivered)).await;
        assert!(waited.is_ok());
    }
}
