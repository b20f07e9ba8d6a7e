//! HTTP server wiring for Roster.
//!
//! Loads [`ServerConfig`], wraps the [`roster_api`] router in CORS and
//! request-tracing middleware, and provides the shutdown signal used by the
//! `roster` binary.

pub mod error;

pub use error::{Error, Result};

use std::{fmt, path::{Path, PathBuf}};

use axum::{
  Router,
  http::{HeaderValue, Method},
};
use roster_api::AppState;
use roster_core::store::DocumentStore;
use roster_store_mongo::MongoConfig;
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  trace::TraceLayer,
};

/// Prefix of environment variables that override the configuration file,
/// e.g. `ROSTER__STORE__PASSWORD`.
pub const ENV_PREFIX: &str = "ROSTER";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `roster.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  /// Name of the collection holding student documents.
  #[serde(default = "default_collection")]
  pub collection:      String,
  /// Origins allowed by CORS; empty means any origin. Accepts a list or a
  /// comma-separated string.
  #[serde(default, deserialize_with = "origins")]
  pub allowed_origins: Vec<String>,
  #[serde(default)]
  pub store:           StoreConfig,
}

/// Which document store backs the service.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
  #[default]
  Mongo,
  Sqlite,
}

#[derive(Deserialize, Clone)]
pub struct StoreConfig {
  #[serde(default)]
  pub backend:  StoreBackend,
  /// MongoDB connection string. Required for the mongo backend.
  pub uri:      Option<String>,
  #[serde(default = "default_database")]
  pub database: String,
  pub username: Option<String>,
  pub password: Option<String>,
  /// SQLite database file for the sqlite backend.
  #[serde(default = "default_sqlite_path")]
  pub path:     PathBuf,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      backend:  StoreBackend::default(),
      uri:      None,
      database: default_database(),
      username: None,
      password: None,
      path:     default_sqlite_path(),
    }
  }
}

// Credentials stay out of logs.
impl fmt::Debug for StoreConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StoreConfig")
      .field("backend", &self.backend)
      .field("uri", &self.uri.as_ref().map(|_| "<redacted>"))
      .field("database", &self.database)
      .field("username", &self.username)
      .field("password", &self.password.as_ref().map(|_| "<redacted>"))
      .field("path", &self.path)
      .finish()
  }
}

impl StoreConfig {
  /// MongoDB connection settings; fails if no URI is configured.
  pub fn mongo(&self) -> Result<MongoConfig> {
    Ok(MongoConfig {
      uri:      self.uri.clone().ok_or(Error::MissingStoreUri)?,
      database: self.database.clone(),
      username: self.username.clone(),
      password: self.password.clone(),
    })
  }
}

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 8000 }
fn default_collection() -> String { "students".to_owned() }
fn default_database() -> String { "studentsDB".to_owned() }
fn default_sqlite_path() -> PathBuf { PathBuf::from("roster.db") }

fn origins<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Origins {
    List(Vec<String>),
    Csv(String),
  }

  Ok(match Origins::deserialize(deserializer)? {
    Origins::List(list) => list,
    Origins::Csv(s) => s
      .split(',')
      .map(str::trim)
      .filter(|o| !o.is_empty())
      .map(str::to_owned)
      .collect(),
  })
}

impl ServerConfig {
  /// Read `path` (if it exists), then apply `ROSTER__*` environment
  /// overrides.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
      .build()?;
    Self::from_settings(settings)
  }

  pub fn from_settings(settings: config::Config) -> Result<Self> {
    Ok(settings.try_deserialize()?)
  }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The complete application: the API router plus CORS and tracing layers.
pub fn app<S>(state: AppState<S>, config: &ServerConfig) -> Result<Router>
where
  S: DocumentStore + 'static,
{
  Ok(
    roster_api::api_router(state)
      .layer(cors_layer(&config.allowed_origins)?)
      .layer(TraceLayer::new_for_http()),
  )
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
  let origin = if allowed_origins.is_empty() {
    AllowOrigin::from(Any)
  } else {
    let origins = allowed_origins
      .iter()
      .map(|o| HeaderValue::from_str(o).map_err(|_| Error::InvalidOrigin(o.clone())))
      .collect::<Result<Vec<_>>>()?;
    AllowOrigin::list(origins)
  };

  Ok(
    CorsLayer::new()
      .allow_origin(origin)
      .allow_methods([
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
      ])
      .allow_headers(Any),
  )
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!("failed to listen for ctrl-c: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        tracing::error!("failed to listen for SIGTERM: {e}");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    () = ctrl_c => {}
    () = terminate => {}
  }
  tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use config::{File, FileFormat};
  use roster_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  fn settings(toml: &str) -> config::Config {
    config::Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
  }

  #[test]
  fn defaults_apply_to_empty_config() {
    let cfg = ServerConfig::from_settings(settings("")).unwrap();
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.collection, "students");
    assert!(cfg.allowed_origins.is_empty());
    assert_eq!(cfg.store.backend, StoreBackend::Mongo);
    assert_eq!(cfg.store.database, "studentsDB");
  }

  #[test]
  fn mongo_backend_requires_uri() {
    let cfg = ServerConfig::from_settings(settings("")).unwrap();
    assert!(matches!(cfg.store.mongo(), Err(Error::MissingStoreUri)));
  }

  #[test]
  fn full_config_parses() {
    let cfg = ServerConfig::from_settings(settings(
      r#"
        port = 9000
        allowed_origins = ["http://localhost:3000"]

        [store]
        backend  = "mongo"
        uri      = "mongodb://db.internal:27017/"
        username = "svc"
        password = "p@ss:word"
      "#,
    ))
    .unwrap();
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.allowed_origins, ["http://localhost:3000"]);

    let mongo = cfg.store.mongo().unwrap();
    assert_eq!(mongo.uri, "mongodb://db.internal:27017/");
    assert_eq!(mongo.username.as_deref(), Some("svc"));
    assert_eq!(mongo.password.as_deref(), Some("p@ss:word"));
  }

  #[test]
  fn origins_accept_comma_separated_string() {
    let cfg = ServerConfig::from_settings(settings(
      r#"allowed_origins = "http://a.test, http://b.test""#,
    ))
    .unwrap();
    assert_eq!(cfg.allowed_origins, ["http://a.test", "http://b.test"]);
  }

  #[test]
  fn debug_output_redacts_credentials() {
    let cfg = ServerConfig::from_settings(settings(
      r#"
        [store]
        uri      = "mongodb://user:hunter2@db/"
        password = "hunter2"
      "#,
    ))
    .unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("hunter2"), "{rendered}");
  }

  #[test]
  fn invalid_origin_is_rejected() {
    let origins = vec!["http://ok.test".to_owned(), "bad\norigin".to_owned()];
    assert!(matches!(cors_layer(&origins), Err(Error::InvalidOrigin(_))));
  }

  async fn sqlite_app(toml: &str) -> Router {
    let cfg = ServerConfig::from_settings(settings(toml)).unwrap();
    let store = SqliteStore::open_in_memory().await.unwrap();
    let state = AppState::new(Arc::new(store), cfg.collection.as_str());
    app(state, &cfg).unwrap()
  }

  #[tokio::test]
  async fn app_serves_api_routes() {
    let app = sqlite_app("").await;
    let req = Request::builder()
      .uri("/students/")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn preflight_allows_patch_from_any_origin() {
    let app = sqlite_app("").await;
    let req = Request::builder()
      .method("OPTIONS")
      .uri("/students/abc")
      .header(header::ORIGIN, "http://example.test")
      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("PATCH"), "allowed methods: {methods}");
    assert!(methods.contains("DELETE"), "allowed methods: {methods}");
  }

  #[tokio::test]
  async fn configured_origins_are_enforced() {
    let app = sqlite_app(r#"allowed_origins = ["http://app.test"]"#).await;

    let req = Request::builder()
      .uri("/students/")
      .header(header::ORIGIN, "http://app.test")
      .body(Body::empty())
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(
      resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
      "http://app.test"
    );

    let req = Request::builder()
      .uri("/students/")
      .header(header::ORIGIN, "http://evil.test")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
  }
}
