//! One execution context's view of the store.

use std::sync::Arc;

use greenorb_core::{
  event::{Event, EventKind},
  projection::Projection,
  store::EsgStore,
};

/// Local projection kept in step with the shared event log.
///
/// Each controller owns one bridge. Reads never touch another context's
/// memory: [`SyncBridge::pull`] copies new events out of the store, and
/// [`SyncBridge::push`] writes through the store and pulls straight after,
/// so the owner sees its own write plus anything appended in between.
pub struct SyncBridge<S> {
  store:      Arc<S>,
  projection: Projection,
}

impl<S: EsgStore> SyncBridge<S> {
  pub fn new(store: Arc<S>, history_cap: usize) -> Self {
    Self { store, projection: Projection::new(history_cap) }
  }

  pub fn projection(&self) -> &Projection { &self.projection }

  /// Fold in every event appended since the last pull. Returns how many
  /// were new.
  pub async fn pull(&mut self) -> Result<usize, S::Error> {
    let events = self.store.events_after(self.projection.last_seq()).await?;
    for event in &events {
      self.projection.apply(event);
    }
    Ok(events.len())
  }

  /// Append `kinds` as one batch, then pull.
  pub async fn push(&mut self, kinds: Vec<EventKind>) -> Result<Vec<Event>, S::Error> {
    if kinds.is_empty() {
      return Ok(Vec::new());
    }
    let written = self.store.append(kinds).await?;
    self.pull().await?;
    Ok(written)
  }
}
