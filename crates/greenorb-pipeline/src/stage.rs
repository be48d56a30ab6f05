//! The `Stage` trait and controller status types.

use std::time::Duration;

use greenorb_core::{
  activity::ActivityLevel, event::EventKind, projection::Projection, stage::StageKind,
};
use greenorb_llm::GenerationRequest;
use serde::Serialize;

// ─── Stage ───────────────────────────────────────────────────────────────────

/// What a stage made of one answer: events to append and feed lines to
/// record once they are persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
  pub events: Vec<EventKind>,
  pub feed:   Vec<(ActivityLevel, String)>,
}

/// The stage-specific half of a controller. It picks the work and builds
/// each request, then turns the answer into events.
pub trait Stage: Send + Sync + 'static {
  /// One unit of work, owned so it can outlive the projection it came from.
  type Item: Send + Sync + 'static;

  fn kind(&self) -> StageKind;

  /// Pending work, in processing order. Must not include items that
  /// already have output downstream.
  fn backlog(&self, projection: &Projection) -> Vec<Self::Item>;

  /// A short label for logs and the feed.
  fn describe(&self, item: &Self::Item) -> String;

  /// Whether `item` still needs work, checked against a fresh projection
  /// right before it is processed.
  fn is_pending(&self, _item: &Self::Item, _projection: &Projection) -> bool { true }

  fn request(&self, item: &Self::Item) -> GenerationRequest;

  /// Use the streaming call instead of the single-response one.
  fn streaming(&self) -> bool { false }

  /// Turn the generated text into events. `None` when nothing usable was
  /// found.
  fn absorb(&self, item: &Self::Item, text: &str) -> Option<Outcome>;

  /// Events to append when the item failed, e.g. to move a cursor on.
  fn on_failure(&self, _item: &Self::Item) -> Vec<EventKind> { Vec::new() }
}

/// Delays between units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimings {
  /// After each processed item.
  pub delay: Duration,
  /// When the backlog is empty.
  pub poll:  Duration,
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// What a running controller is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Polling,
  Generating,
  Parsing,
  Persisting,
}

/// `idle → running(phase) → stopped`; `stopped → running` on restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "phase", rename_all = "snake_case")]
pub enum RunState {
  Idle,
  Running(Phase),
  Stopped,
}

impl RunState {
  pub fn is_running(self) -> bool { matches!(self, Self::Running(_)) }
}

/// A controller's published status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageStatus {
  pub stage:      StageKind,
  #[serde(flatten)]
  pub state:      RunState,
  /// Items turned into events since the process started.
  pub processed:  u64,
  pub failed:     u64,
  pub last_error: Option<String>,
  /// The item currently being worked on.
  pub current:    Option<String>,
}

impl StageStatus {
  pub fn idle(stage: StageKind) -> Self {
    Self { stage, state: RunState::Idle, processed: 0, failed: 0, last_error: None, current: None }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_serializes_flat() {
    let mut status = StageStatus::idle(StageKind::Risk);
    status.state = RunState::Running(Phase::Generating);
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["stage"], "risk");
    assert_eq!(json["state"], "running");
    assert_eq!(json["phase"], "generating");

    let json = serde_json::to_value(StageStatus::idle(StageKind::Scout)).unwrap();
    assert_eq!(json["state"], "idle");
    assert!(json.get("phase").is_none());
  }
}
