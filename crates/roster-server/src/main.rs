//! roster server binary.
//!
//! Reads `roster.toml` (or the path specified with `--config`), applies
//! `ROSTER__*` environment overrides, connects to the configured document
//! store once, and serves the student API over HTTP until Ctrl-C or SIGTERM.
//!
//! Credentials belong in the environment, never in the config file under
//! version control:
//!
//! ```sh
//! ROSTER__STORE__URI='mongodb+srv://cluster0.example.net/' \
//! ROSTER__STORE__USERNAME=roster ROSTER__STORE__PASSWORD=... roster
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use roster_api::AppState;
use roster_core::store::DocumentStore;
use roster_server::{ServerConfig, StoreBackend};
use roster_store_mongo::MongoStore;
use roster_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Roster student records server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "roster.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  tracing::debug!(?config, "loaded configuration");

  match config.store.backend {
    StoreBackend::Mongo => {
      let mongo = config.store.mongo()?;
      let store = MongoStore::connect(&mongo)
        .await
        .context("failed to connect to mongodb")?;
      serve(store, &config).await
    }
    StoreBackend::Sqlite => {
      let path = &config.store.path;
      let store = SqliteStore::open(path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      serve(store, &config).await
    }
  }
}

/// Serve until shutdown, then release the store.
async fn serve<S>(store: S, config: &ServerConfig) -> anyhow::Result<()>
where
  S: DocumentStore + 'static,
{
  let store = Arc::new(store);
  let state = AppState::new(Arc::clone(&store), config.collection.as_str());
  let app = roster_server::app(state, config)?;

  let address = format!("{}:{}", config.host, config.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(roster_server::shutdown_signal())
    .await
    .context("server error")?;

  match Arc::try_unwrap(store) {
    Ok(store) => store.close().await.context("failed to close store")?,
    Err(_) => tracing::warn!("store still in use at shutdown; not closing it"),
  }
  tracing::info!("server stopped");
  Ok(())
}
