//! Configuration and router assembly for the GreenOrb server binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use axum::Router;
use greenorb_api::{ApiState, api_router};
use greenorb_core::store::EsgStore;
use greenorb_llm::{GeminiConfig, TextGenerator};
use greenorb_pipeline::PipelineConfig;
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Prefix for environment overrides, e.g. `GREENORB_PORT=8080` or
/// `GREENORB_GEMINI__API_KEY=...`.
pub const ENV_PREFIX: &str = "GREENORB";

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  /// SQLite database file. Required.
  pub store_path: PathBuf,
  /// Start all four stages on boot.
  #[serde(default)]
  pub autostart:  bool,
  #[serde(default)]
  pub gemini:     GeminiConfig,
  #[serde(default)]
  pub pipeline:   PipelineConfig,
}

fn default_host() -> String { "0.0.0.0".to_owned() }

fn default_port() -> u16 { 5000 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Layer the optional TOML file at `path` under `GREENORB_*` variables.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .with_context(|| format!("failed to read config from {}", path.display()))?;

  let mut config: ServerConfig =
    settings.try_deserialize().context("failed to deserialise ServerConfig")?;
  config.store_path = expand_tilde(&config.store_path);
  Ok(config)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the API under `/api`, request tracing and
/// permissive CORS.
pub fn router<S, G>(state: ApiState<S, G>) -> Router
where
  S: EsgStore + 'static,
  G: TextGenerator + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use greenorb_llm::GeminiClient;
  use greenorb_pipeline::Pipeline;
  use greenorb_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("greenorb-{}-{name}.toml", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn file_values_and_defaults() {
    let path = write_config(
      "full",
      r#"
        store_path = "/var/lib/greenorb/esg.db"
        port = 8080
        autostart = true

        [gemini]
        api_key = "k"

        [pipeline]
        record_delay_ms = 100
      "#,
    );
    let config = load_config(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(config.address(), "0.0.0.0:8080");
    assert!(config.autostart);
    assert!(config.gemini.has_api_key());
    assert_eq!(config.gemini.model, "gemini-2.0-flash");
    assert_eq!(config.pipeline.record_delay_ms, 100);
    assert_eq!(config.pipeline.history_cap, 500);
  }

  #[test]
  fn store_path_is_required() {
    let path = write_config("empty", "port = 5000\n");
    let err = load_config(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(format!("{err:#}").contains("store_path"), "{err:#}");
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/esg.db")), PathBuf::from(home).join("esg.db"));
    assert_eq!(expand_tilde(Path::new("/abs/esg.db")), PathBuf::from("/abs/esg.db"));
  }

  #[tokio::test]
  async fn api_is_mounted_with_cors() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let generator = Arc::new(GeminiClient::new(GeminiConfig::default()).unwrap());
    let config = PipelineConfig::default();
    let pipeline = Arc::new(Pipeline::new(store.clone(), generator.clone(), &config));
    let app = router(ApiState::new(store, generator, pipeline, &config));

    let req = Request::builder()
      .uri("/api/agents")
      .header(header::ORIGIN, "http://localhost:5173")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
  }
}
