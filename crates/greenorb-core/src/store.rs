//! The `EsgStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `greenorb-store-sqlite`).
//! Higher layers (`greenorb-pipeline`, `greenorb-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  activity::{ActivityEntry, NewActivity},
  event::{Event, EventKind},
  projection::Projection,
};

/// Abstraction over a GreenOrb store backend.
///
/// The event log is append-only. The only destructive operation is
/// [`EsgStore::clear`], which is itself recorded as an event and may drop
/// the events it supersedes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait EsgStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Event log ─────────────────────────────────────────────────────────────

  /// Append `kinds` as one atomic batch and return the persisted events, in
  /// order. Either every event is written or none is.
  fn append(
    &self,
    kinds: Vec<EventKind>,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// All events with `seq > after`, in `seq` order.
  fn events_after(
    &self,
    after: u64,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Record that every record was deleted, and empty the activity feed.
  /// Earlier events may be discarded as long as replaying the log still
  /// yields the same projection.
  fn clear(&self) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  // ── Activity feed ─────────────────────────────────────────────────────────

  /// Append a feed line. The store keeps only the newest entries, up to its
  /// configured feed cap.
  fn record_activity(
    &self,
    entry: NewActivity,
  ) -> impl Future<Output = Result<ActivityEntry, Self::Error>> + Send + '_;

  /// The newest `limit` feed lines, oldest first.
  fn recent_activity(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + '_;
}

/// Replay the whole log into a fresh [`Projection`].
pub async fn materialize<S: EsgStore>(store: &S, cap: usize) -> Result<Projection, S::Error> {
  let events = store.events_after(0).await?;
  Ok(Projection::replay(cap, &events))
}
