//! Handlers for `/agents` endpoints: the stage controllers.
//!
//! | Method | Path                    | Notes |
//! |--------|-------------------------|-------|
//! | `GET`  | `/agents`               | Every controller's status |
//! | `POST` | `/agents/start`         | Start every stopped controller |
//! | `POST` | `/agents/stop`          | Stop every running controller |
//! | `POST` | `/agents/{stage}/start` | 409 when already running |
//! | `POST` | `/agents/{stage}/stop`  | 409 when not running |

use axum::{
  Json,
  extract::{Path, State},
};
use greenorb_core::stage::StageKind;
use greenorb_pipeline::StageStatus;
use serde::Serialize;

use crate::{ApiState, error::ApiError};

/// Response of the bulk start/stop calls.
#[derive(Debug, Serialize)]
pub struct Changed {
  /// Stages whose state this call changed.
  pub changed:  Vec<StageKind>,
  pub statuses: Vec<StageStatus>,
}

fn stage(raw: &str) -> Result<StageKind, ApiError> {
  raw.parse().map_err(|_| ApiError::NotFound(format!("unknown stage {raw:?}")))
}

/// `GET /agents`
pub async fn list<S, G>(State(state): State<ApiState<S, G>>) -> Json<Vec<StageStatus>> {
  Json(state.pipeline.statuses())
}

/// `POST /agents/start`
pub async fn start_all<S, G>(State(state): State<ApiState<S, G>>) -> Json<Changed> {
  let changed = state.pipeline.start_all();
  Json(Changed { changed, statuses: state.pipeline.statuses() })
}

/// `POST /agents/stop`
pub async fn stop_all<S, G>(State(state): State<ApiState<S, G>>) -> Json<Changed> {
  let changed = state.pipeline.stop_all();
  Json(Changed { changed, statuses: state.pipeline.statuses() })
}

/// `POST /agents/{stage}/start`
pub async fn start_one<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(raw): Path<String>,
) -> Result<Json<StageStatus>, ApiError> {
  let kind = stage(&raw)?;
  if !state.pipeline.start(kind) {
    return Err(ApiError::Conflict(format!("{kind} agent is already running")));
  }
  Ok(Json(state.pipeline.status(kind)))
}

/// `POST /agents/{stage}/stop`: the item in flight still finishes.
pub async fn stop_one<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(raw): Path<String>,
) -> Result<Json<StageStatus>, ApiError> {
  let kind = stage(&raw)?;
  if !state.pipeline.stop(kind) {
    return Err(ApiError::Conflict(format!("{kind} agent is not running")));
  }
  Ok(Json(state.pipeline.status(kind)))
}
