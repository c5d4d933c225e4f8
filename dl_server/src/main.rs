//! Live dance-competition server.
//!
//! Serves the competition API over HTTP, backed by PostgreSQL when a database
//! URL is configured and by an in-memory store otherwise.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use dance_live::CompetitionManager;
use dance_live::db::{
    Database, InMemoryStore, PgCompetitionStore, PgParticipantRepository, PgProfileDirectory,
};
use dl_server::{api, config::ServerConfig, logging, metrics};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the live dance-competition server

USAGE:
  dl_server [OPTIONS]

OPTIONS:
  --bind          IP:PORT  Server socket bind address    [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url        URL      Database connection string    [default: env DATABASE_URL, in-memory if unset]
  --metrics-bind  IP:PORT  Prometheus scrape address     [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  METRICS_BIND             Prometheus exporter address
  RUST_LOG                 Log filter [default: info,sqlx=warn]
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;
    let metrics_bind: Option<SocketAddr> = pargs.opt_value_from_str("--metrics-bind")?;

    let config = ServerConfig::from_env(bind, database_url, metrics_bind)?;
    config.validate()?;

    logging::init();
    info!("Starting dance competition server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exposed on {}", addr);
    }

    let (manager, db) = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .context("Failed to connect to database")?;
            db.health_check()
                .await
                .context("Database health check failed")?;
            db.apply_schema()
                .await
                .context("Failed to apply database schema")?;
            info!("Database connected successfully");

            let pool = db.pool().clone();
            let manager = CompetitionManager::new(
                Arc::new(PgCompetitionStore::new(pool.clone())),
                Arc::new(PgParticipantRepository::new(pool.clone())),
                Arc::new(PgProfileDirectory::new(pool)),
            );
            (manager, Some(db))
        }
        None => {
            warn!("No DATABASE_URL configured, state is kept in memory and lost on exit");
            let manager = CompetitionManager::in_memory(Arc::new(InMemoryStore::new()));
            (manager, None)
        }
    };

    let app = api::create_router(api::AppState::new(manager));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    if let Some(db) = db {
        db.close().await;
        info!("Database pool closed");
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
