//! greenorb server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite event store, wires the four stage controllers to Gemini and
//! serves the JSON API over HTTP.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use greenorb_api::ApiState;
use greenorb_llm::GeminiClient;
use greenorb_pipeline::Pipeline;
use greenorb_server::{load_config, router};
use greenorb_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "GreenOrb ESG discovery server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
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
  let config = load_config(&cli.config)?;

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?
    .with_feed_cap(config.pipeline.feed_cap);
  let store = Arc::new(store);

  if !config.gemini.has_api_key() {
    tracing::warn!(
      "no Gemini API key configured (set gemini.api_key or GREENORB_GEMINI__API_KEY); \
       generation calls will fail"
    );
  }
  let generator =
    Arc::new(GeminiClient::new(config.gemini.clone()).context("failed to build Gemini client")?);

  let pipeline = Arc::new(Pipeline::new(store.clone(), generator.clone(), &config.pipeline));
  if config.autostart {
    let started = pipeline.start_all();
    tracing::info!(?started, "autostarted stages");
  }

  let state = ApiState::new(store, generator, pipeline.clone(), &config.pipeline);
  let app = router(state);
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  pipeline.shutdown().await;
  tracing::info!("shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}
