//! [`SqliteStore`]: the SQLite implementation of [`EsgStore`].

use std::path::Path;

use chrono::Utc;
use greenorb_core::{
  activity::{ActivityEntry, NewActivity},
  event::{Event, EventKind},
  store::EsgStore,
};

use crate::{
  Result,
  encode::{PendingEvent, RawActivity, RawEvent, decode_seq, encode_dt},
  error::Error,
  schema::SCHEMA,
};

/// Feed entries kept when no cap is configured.
pub const DEFAULT_FEED_CAP: usize = 50;

/// The one event kind that outlives a clear.
const SECTOR_ADVANCED: &str = "sector_advanced";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A GreenOrb store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  feed_cap: usize,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, feed_cap: DEFAULT_FEED_CAP };
    store.init_schema().await?;
    tracing::info!(path = %path.display(), "store opened");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, feed_cap: DEFAULT_FEED_CAP };
    store.init_schema().await?;
    Ok(store)
  }

  /// Keep at most `cap` activity entries (minimum 1).
  pub fn with_feed_cap(mut self, cap: usize) -> Self {
    self.feed_cap = cap.max(1);
    self
  }

  pub fn feed_cap(&self) -> usize { self.feed_cap }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert `pending` in one transaction. Returns the assigned sequence
  /// numbers in order.
  ///
  /// With `clearing`, the same transaction wipes the feed and drops every
  /// earlier event except the newest `sector_advanced`. Replaying what is
  /// left gives the same projection, and readers that already hold a later
  /// `seq` never see the gap.
  async fn insert_events(&self, pending: &[PendingEvent], clearing: bool) -> Result<Vec<u64>> {
    let rows: Vec<[String; 4]> = pending
      .iter()
      .map(|p| {
        [
          p.columns.event_id.clone(),
          p.columns.recorded_at.clone(),
          p.columns.kind.clone(),
          p.columns.payload.clone(),
        ]
      })
      .collect();

    let raw_seqs: Vec<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut seqs = Vec::with_capacity(rows.len());
        {
          let mut stmt = tx.prepare(
            "INSERT INTO events (event_id, recorded_at, kind, payload)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for [event_id, recorded_at, kind, payload] in &rows {
            seqs.push(stmt.insert(rusqlite::params![event_id, recorded_at, kind, payload])?);
          }
        }
        if clearing && let Some(&cleared) = seqs.last() {
          tx.execute(
            "DELETE FROM events
             WHERE seq < ?1
               AND seq IS NOT (SELECT MAX(seq) FROM events WHERE kind = ?2)",
            rusqlite::params![cleared, SECTOR_ADVANCED],
          )?;
          tx.execute("DELETE FROM activity", [])?;
        }
        tx.commit()?;
        Ok(seqs)
      })
      .await?;

    raw_seqs.into_iter().map(decode_seq).collect()
  }
}

// ─── EsgStore impl ───────────────────────────────────────────────────────────

impl EsgStore for SqliteStore {
  type Error = Error;

  // ── Event log ─────────────────────────────────────────────────────────────

  async fn append(&self, kinds: Vec<EventKind>) -> Result<Vec<Event>> {
    if kinds.is_empty() {
      return Ok(Vec::new());
    }
    let now = Utc::now();
    let pending = kinds
      .into_iter()
      .map(|kind| PendingEvent::new(kind, now))
      .collect::<Result<Vec<_>>>()?;

    let seqs = self.insert_events(&pending, false).await?;
    tracing::debug!(count = seqs.len(), last_seq = ?seqs.last(), "appended events");

    Ok(pending.into_iter().zip(seqs).map(|(p, seq)| p.into_event(seq)).collect())
  }

  async fn events_after(&self, after: u64) -> Result<Vec<Event>> {
    let after = i64::try_from(after).unwrap_or(i64::MAX);

    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT seq, event_id, recorded_at, kind, payload
           FROM events
           WHERE seq > ?1
           ORDER BY seq",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![after], |row| {
            Ok(RawEvent {
              seq:         row.get(0)?,
              event_id:    row.get(1)?,
              recorded_at: row.get(2)?,
              kind:        row.get(3)?,
              payload:     row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn clear(&self) -> Result<Event> {
    let pending = PendingEvent::new(EventKind::Cleared, Utc::now())?;
    // One row in, one sequence number out.
    let seqs = self.insert_events(std::slice::from_ref(&pending), true).await?;
    let event = pending.into_event(seqs[0]);
    tracing::info!(seq = event.seq, "all records cleared, event log compacted");
    Ok(event)
  }

  // ── Activity feed ─────────────────────────────────────────────────────────

  async fn record_activity(&self, entry: NewActivity) -> Result<ActivityEntry> {
    let recorded_at = Utc::now();
    let at_str = encode_dt(recorded_at);
    let stage_str = entry.stage.map(|s| s.as_str().to_owned());
    let level_str = entry.level.as_str().to_owned();
    let message = entry.message.clone();
    let cap = i64::try_from(self.feed_cap).unwrap_or(i64::MAX);

    let entry_id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO activity (recorded_at, stage, level, message)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![at_str, stage_str, level_str, message],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
          "DELETE FROM activity
           WHERE entry_id NOT IN (
             SELECT entry_id FROM activity ORDER BY entry_id DESC LIMIT ?1
           )",
          rusqlite::params![cap],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(ActivityEntry {
      entry_id: decode_seq(entry_id)?,
      recorded_at,
      stage: entry.stage,
      level: entry.level,
      message: entry.message,
    })
  }

  async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT entry_id, recorded_at, stage, level, message
           FROM activity
           ORDER BY entry_id DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawActivity {
              entry_id:    row.get(0)?,
              recorded_at: row.get(1)?,
              stage:       row.get(2)?,
              level:       row.get(3)?,
              message:     row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    // Newest-first from SQL; callers want oldest first.
    let mut entries = raws
      .into_iter()
      .map(RawActivity::into_entry)
      .collect::<Result<Vec<_>>>()?;
    entries.reverse();
    Ok(entries)
  }
}
