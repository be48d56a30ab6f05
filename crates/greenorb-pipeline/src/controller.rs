//! The generic stage controller.
//!
//! ```text
//! loop (until the pacer is cancelled)
//!   polling      bridge.pull(); backlog = stage.backlog(projection)
//!   empty?       wait poll interval, go again
//!   per item     generating → parsing → persisting, then wait delay
//! ```
//!
//! Generation is never aborted once started. Stopping cancels the pacer;
//! the loop notices between steps, so the item in flight finishes and no
//! new one starts.

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::{StreamExt as _, future::BoxFuture};
use greenorb_core::{
  activity::{ActivityLevel, NewActivity},
  stage::StageKind,
  store::EsgStore,
};
use greenorb_llm::TextGenerator;
use tokio::{sync::watch, task::JoinHandle};
use tracing::Instrument as _;

use crate::{
  bridge::SyncBridge,
  schedule::Pacer,
  stage::{Phase, RunState, Stage, StageStatus, StageTimings},
};

/// Longest error text copied into a feed line.
const FEED_ERROR_CHARS: usize = 80;

// ─── StageControl ────────────────────────────────────────────────────────────

/// Object-safe control surface over a [`Controller`], so controllers for
/// different stages can live side by side.
pub trait StageControl: Send + Sync {
  fn kind(&self) -> StageKind;

  /// Spawn the loop. Returns `false` (and does nothing) when already running.
  fn start(&self) -> bool;

  /// Ask the loop to stop after its current step. Returns `false` when it
  /// was not running.
  fn stop(&self) -> bool;

  fn status(&self) -> StageStatus;

  fn subscribe(&self) -> watch::Receiver<StageStatus>;

  /// Stop and wait for the loop to exit.
  fn shutdown(&self) -> BoxFuture<'_, ()>;
}

// ─── Controller ──────────────────────────────────────────────────────────────

struct Run {
  pacer:  Pacer,
  handle: JoinHandle<()>,
}

pub struct Controller<St, S, G> {
  shared: Arc<Shared<St, S, G>>,
  run:    Mutex<Option<Run>>,
}

struct Shared<St, S, G> {
  stage:       St,
  store:       Arc<S>,
  generator:   Arc<G>,
  timings:     StageTimings,
  history_cap: usize,
  status:      watch::Sender<StageStatus>,
}

impl<St, S, G> Controller<St, S, G>
where
  St: Stage,
  S: EsgStore + 'static,
  G: TextGenerator + 'static,
{
  pub fn new(
    stage: St,
    store: Arc<S>,
    generator: Arc<G>,
    timings: StageTimings,
    history_cap: usize,
  ) -> Self {
    let (status, _) = watch::channel(StageStatus::idle(stage.kind()));
    Self {
      shared: Arc::new(Shared { stage, store, generator, timings, history_cap, status }),
      run:    Mutex::new(None),
    }
  }
}

impl<St, S, G> StageControl for Controller<St, S, G>
where
  St: Stage,
  S: EsgStore + 'static,
  G: TextGenerator + 'static,
{
  fn kind(&self) -> StageKind { self.shared.stage.kind() }

  fn start(&self) -> bool {
    let mut slot = self.run.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(run) = slot.as_ref()
      && !run.pacer.is_cancelled()
      && !run.handle.is_finished()
    {
      return false;
    }

    // A loop that is still winding down finishes its item first.
    let previous = slot.take().map(|run| run.handle);
    let pacer = Pacer::new();
    let shared = self.shared.clone();
    let loop_pacer = pacer.clone();
    let span = tracing::info_span!("stage", stage = %self.kind());

    self.shared.status.send_modify(|s| s.state = RunState::Running(Phase::Polling));
    let handle = tokio::spawn(
      async move {
        if let Some(previous) = previous {
          let _ = previous.await;
        }
        shared.run(loop_pacer).await;
      }
      .instrument(span),
    );
    *slot = Some(Run { pacer, handle });
    true
  }

  fn stop(&self) -> bool {
    let slot = self.run.lock().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
      Some(run) if !run.pacer.is_cancelled() => {
        tracing::info!(stage = %self.kind(), "stop requested");
        run.pacer.cancel();
        true
      }
      _ => false,
    }
  }

  fn status(&self) -> StageStatus { self.shared.status.borrow().clone() }

  fn subscribe(&self) -> watch::Receiver<StageStatus> { self.shared.status.subscribe() }

  fn shutdown(&self) -> BoxFuture<'_, ()> {
    let run = self.run.lock().unwrap_or_else(PoisonError::into_inner).take();
    Box::pin(async move {
      if let Some(run) = run {
        run.pacer.cancel();
        if let Err(e) = run.handle.await {
          tracing::warn!(stage = %self.kind(), error = %e, "controller task failed");
        }
      }
    })
  }
}

// ─── Loop ────────────────────────────────────────────────────────────────────

impl<St, S, G> Shared<St, S, G>
where
  St: Stage,
  S: EsgStore + 'static,
  G: TextGenerator + 'static,
{
  fn kind(&self) -> StageKind { self.stage.kind() }

  async fn run(&self, pacer: Pacer) {
    tracing::info!("controller started");
    self.set_phase(Phase::Polling);
    self.record(ActivityLevel::System, format!("{} agent started", self.kind())).await;

    let mut bridge = SyncBridge::new(self.store.clone(), self.history_cap);

    'poll: while !pacer.is_cancelled() {
      self.set_phase(Phase::Polling);
      if let Err(e) = bridge.pull().await {
        tracing::warn!(error = %e, "reading the event log failed");
        if !pacer.wait(self.timings.poll).await {
          break;
        }
        continue;
      }

      let items = self.stage.backlog(bridge.projection());
      if items.is_empty() {
        tracing::trace!("backlog empty");
        if !pacer.wait(self.timings.poll).await {
          break;
        }
        continue;
      }
      tracing::debug!(pending = items.len(), "backlog");

      for item in items {
        if pacer.is_cancelled() {
          break 'poll;
        }
        // The snapshot may be stale: another writer may have covered the
        // item, or the records may have been cleared.
        if let Err(e) = bridge.pull().await {
          tracing::warn!(error = %e, "reading the event log failed");
        }
        if !self.stage.is_pending(&item, bridge.projection()) {
          continue;
        }
        self.process(&mut bridge, item).await;
        if !pacer.wait(self.timings.delay).await {
          break 'poll;
        }
      }
    }

    self.status.send_modify(|s| {
      s.state = RunState::Stopped;
      s.current = None;
    });
    self.record(ActivityLevel::System, format!("{} agent stopped", self.kind())).await;
    tracing::info!("controller stopped");
  }

  async fn process(&self, bridge: &mut SyncBridge<S>, item: St::Item) {
    let label = self.stage.describe(&item);
    self.status.send_modify(|s| {
      s.state = RunState::Running(Phase::Generating);
      s.current = Some(label.clone());
    });
    tracing::debug!(item = %label, "generating");
    self.record(ActivityLevel::Search, format!("🔍 {label}")).await;

    let text = match self.generate(&item).await {
      Ok(text) => text,
      Err(e) => return self.fail(bridge, &item, &label, e.to_string()).await,
    };

    self.set_phase(Phase::Parsing);
    let Some(outcome) = self.stage.absorb(&item, &text) else {
      let reason = "no parseable records in response".to_owned();
      return self.fail(bridge, &item, &label, reason).await;
    };

    self.set_phase(Phase::Persisting);
    if let Err(e) = bridge.push(outcome.events).await {
      return self.fail(bridge, &item, &label, format!("persisting failed: {e}")).await;
    }
    for (level, message) in outcome.feed {
      self.record(level, message).await;
    }

    tracing::debug!(item = %label, "done");
    self.status.send_modify(|s| {
      s.processed += 1;
      s.current = None;
    });
  }

  async fn generate(&self, item: &St::Item) -> greenorb_llm::Result<String> {
    let request = self.stage.request(item);
    if !self.stage.streaming() {
      return Ok(self.generator.generate(request).await?.text);
    }
    let mut stream = self.generator.stream(request).await?;
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
      text.push_str(&fragment?);
    }
    Ok(text)
  }

  async fn fail(&self, bridge: &mut SyncBridge<S>, item: &St::Item, label: &str, reason: String) {
    tracing::warn!(item = %label, %reason, "item failed");
    let short: String = reason.chars().take(FEED_ERROR_CHARS).collect();
    self.status.send_modify(|s| {
      s.failed += 1;
      s.last_error = Some(reason);
      s.current = None;
    });
    self.record(ActivityLevel::Error, format!("⚠ Error: {short}")).await;

    let events = self.stage.on_failure(item);
    if let Err(e) = bridge.push(events).await {
      tracing::warn!(error = %e, "recording the failure failed");
    }
  }

  fn set_phase(&self, phase: Phase) {
    self.status.send_if_modified(|s| {
      let next = RunState::Running(phase);
      let changed = s.state != next;
      s.state = next;
      changed
    });
  }

  /// Feed writes never stop the loop.
  async fn record(&self, level: ActivityLevel, message: String) {
    let entry = NewActivity::new(self.kind(), level, message);
    if let Err(e) = self.store.record_activity(entry).await {
      tracing::warn!(error = %e, "writing the activity feed failed");
    }
  }
}
