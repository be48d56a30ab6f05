//! The supervisor over all four stage controllers.

use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;
use greenorb_core::{stage::StageKind, store::EsgStore};
use greenorb_llm::TextGenerator;
use serde::Deserialize;
use tokio::sync::watch;

use crate::{
  controller::{Controller, StageControl},
  stage::{StageStatus, StageTimings},
  stages::{Analyst, Risk, Scout, Strategy},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Deserialised from the `[pipeline]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// Per-collection record cap; the oldest records are evicted beyond it.
  pub history_cap:      usize,
  /// Activity feed lines kept by the store.
  pub feed_cap:         usize,
  /// Pause between Scout searches.
  pub scout_delay_ms:   u64,
  /// Pause between records in the downstream stages.
  pub record_delay_ms:  u64,
  /// How often an idle downstream stage looks for new work.
  pub poll_interval_ms: u64,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      history_cap:      500,
      feed_cap:         50,
      scout_delay_ms:   5_000,
      record_delay_ms:  3_000,
      poll_interval_ms: 15_000,
    }
  }
}

impl PipelineConfig {
  pub fn timings(&self, kind: StageKind) -> StageTimings {
    let poll = Duration::from_millis(self.poll_interval_ms);
    match kind {
      // Scout's backlog is never empty; it only ever waits its own delay.
      StageKind::Scout => StageTimings { delay: Duration::from_millis(self.scout_delay_ms), poll },
      _ => StageTimings { delay: Duration::from_millis(self.record_delay_ms), poll },
    }
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Owns one controller per [`StageKind`], in [`StageKind::ALL`] order.
pub struct Pipeline {
  controllers: [Box<dyn StageControl>; 4],
}

impl Pipeline {
  pub fn new<S, G>(store: Arc<S>, generator: Arc<G>, config: &PipelineConfig) -> Self
  where
    S: EsgStore + 'static,
    G: TextGenerator + 'static,
  {
    let cap = config.history_cap;
    let controllers: [Box<dyn StageControl>; 4] = [
      Box::new(Controller::new(
        Scout,
        store.clone(),
        generator.clone(),
        config.timings(StageKind::Scout),
        cap,
      )),
      Box::new(Controller::new(
        Analyst,
        store.clone(),
        generator.clone(),
        config.timings(StageKind::Analyst),
        cap,
      )),
      Box::new(Controller::new(
        Risk,
        store.clone(),
        generator.clone(),
        config.timings(StageKind::Risk),
        cap,
      )),
      Box::new(Controller::new(
        Strategy,
        store,
        generator,
        config.timings(StageKind::Strategy),
        cap,
      )),
    ];
    Self { controllers }
  }

  fn controller(&self, kind: StageKind) -> &dyn StageControl {
    self.controllers[kind as usize].as_ref()
  }

  /// Returns `false` when the stage was already running.
  pub fn start(&self, kind: StageKind) -> bool { self.controller(kind).start() }

  /// Returns `false` when the stage was not running.
  pub fn stop(&self, kind: StageKind) -> bool { self.controller(kind).stop() }

  /// The stages that were started by this call.
  pub fn start_all(&self) -> Vec<StageKind> {
    self.controllers.iter().filter(|c| c.start()).map(|c| c.kind()).collect()
  }

  /// The stages that were asked to stop by this call.
  pub fn stop_all(&self) -> Vec<StageKind> {
    self.controllers.iter().filter(|c| c.stop()).map(|c| c.kind()).collect()
  }

  pub fn status(&self, kind: StageKind) -> StageStatus { self.controller(kind).status() }

  pub fn statuses(&self) -> Vec<StageStatus> {
    self.controllers.iter().map(|c| c.status()).collect()
  }

  pub fn subscribe(&self, kind: StageKind) -> watch::Receiver<StageStatus> {
    self.controller(kind).subscribe()
  }

  /// Stop every loop and wait for them to exit.
  pub async fn shutdown(&self) {
    tracing::info!("stopping all stages");
    join_all(self.controllers.iter().map(|c| c.shutdown())).await;
  }
}
