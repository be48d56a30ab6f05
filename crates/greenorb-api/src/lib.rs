//! JSON REST API for GreenOrb.
//!
//! Exposes an axum [`Router`] backed by any [`EsgStore`], the stage
//! [`Pipeline`] and a [`TextGenerator`] for document scans and live
//! lookups. TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", greenorb_api::api_router(state))
//! ```

pub mod agents;
pub mod error;
pub mod etag;
pub mod live;
pub mod records;
pub mod scan;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use greenorb_core::store::EsgStore;
use greenorb_llm::TextGenerator;
use greenorb_pipeline::{Pipeline, PipelineConfig, SyncBridge, scan::MAX_DOCUMENT_BYTES};
use tokio::sync::{Mutex, MutexGuard};

pub use error::ApiError;

/// Room for multipart framing or a slightly oversized upload, so the scan
/// handler can report the size itself.
const SCAN_BODY_SLACK: usize = 64 * 1024;

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, G> {
  pub store:     Arc<S>,
  pub generator: Arc<G>,
  pub pipeline:  Arc<Pipeline>,
  /// Upper bound for `?limit` on the feed.
  pub feed_cap:  usize,
  /// The API's own view of the event log, refreshed on every read.
  view:          Arc<Mutex<SyncBridge<S>>>,
}

impl<S, G> Clone for ApiState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      generator: self.generator.clone(),
      pipeline:  self.pipeline.clone(),
      feed_cap:  self.feed_cap,
      view:      self.view.clone(),
    }
  }
}

impl<S: EsgStore, G> ApiState<S, G> {
  pub fn new(
    store: Arc<S>,
    generator: Arc<G>,
    pipeline: Arc<Pipeline>,
    config: &PipelineConfig,
  ) -> Self {
    let view = SyncBridge::new(store.clone(), config.history_cap);
    Self {
      store,
      generator,
      pipeline,
      feed_cap: config.feed_cap,
      view: Arc::new(Mutex::new(view)),
    }
  }

  /// The projection, caught up with the log.
  pub(crate) async fn view(&self) -> Result<MutexGuard<'_, SyncBridge<S>>, ApiError> {
    let mut view = self.view.lock().await;
    view.pull().await.map_err(ApiError::store)?;
    Ok(view)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router. Paths are relative; mount it under `/api`.
pub fn api_router<S, G>(state: ApiState<S, G>) -> Router<()>
where
  S: EsgStore + 'static,
  G: TextGenerator + 'static,
{
  Router::new()
    // Records
    .route("/scout", post(records::upsert_company::<S, G>))
    .route("/analyze", post(records::upsert_analysis::<S, G>))
    .route("/risk", post(records::upsert_risk::<S, G>))
    .route("/strategy", post(records::upsert_strategy::<S, G>))
    .route("/data", get(records::data::<S, G>).delete(records::clear::<S, G>))
    .route("/state/{key}", get(records::state::<S, G>))
    .route("/feed", get(records::feed::<S, G>))
    .route("/companies/{name}/live", get(live::handler::<S, G>))
    // Stage controllers
    .route("/agents", get(agents::list::<S, G>))
    .route("/agents/start", post(agents::start_all::<S, G>))
    .route("/agents/stop", post(agents::stop_all::<S, G>))
    .route("/agents/{stage}/start", post(agents::start_one::<S, G>))
    .route("/agents/{stage}/stop", post(agents::stop_one::<S, G>))
    // Document scan
    .route(
      "/scan",
      post(scan::handler::<S, G>)
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + SCAN_BODY_SLACK)),
    )
    .with_state(state)
}
