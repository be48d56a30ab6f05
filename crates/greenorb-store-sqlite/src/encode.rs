//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings and
//! event payloads compact JSON.

use chrono::{DateTime, Utc};
use greenorb_core::{
  activity::{ActivityEntry, ActivityLevel},
  event::{Event, EventKind},
  stage::StageKind,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_seq(raw: i64) -> Result<u64> {
  u64::try_from(raw).map_err(|_| Error::SeqRange(raw))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// An event prepared for insertion; everything fallible happens before the
/// database call.
pub struct PendingEvent {
  pub event_id:    Uuid,
  pub recorded_at: DateTime<Utc>,
  pub kind:        EventKind,
  pub columns:     EventColumns,
}

/// The text columns of an `events` row.
pub struct EventColumns {
  pub event_id:    String,
  pub recorded_at: String,
  pub kind:        String,
  pub payload:     String,
}

impl PendingEvent {
  pub fn new(kind: EventKind, recorded_at: DateTime<Utc>) -> Result<Self> {
    let event_id = Uuid::new_v4();
    let columns = EventColumns {
      event_id:    encode_uuid(event_id),
      recorded_at: encode_dt(recorded_at),
      kind:        kind.discriminant().to_owned(),
      payload:     kind.to_json()?.to_string(),
    };
    Ok(Self { event_id, recorded_at, kind, columns })
  }

  pub fn into_event(self, seq: u64) -> Event {
    Event { seq, event_id: self.event_id, recorded_at: self.recorded_at, kind: self.kind }
  }
}

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub seq:         i64,
  pub event_id:    String,
  pub recorded_at: String,
  pub kind:        String,
  pub payload:     String,
}

impl RawEvent {
  pub fn into_event(self) -> Result<Event> {
    let payload: serde_json::Value = serde_json::from_str(&self.payload)?;
    Ok(Event {
      seq:         decode_seq(self.seq)?,
      event_id:    decode_uuid(&self.event_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      kind:        EventKind::from_parts(&self.kind, payload)?,
    })
  }
}

/// Raw strings read directly from an `activity` row.
pub struct RawActivity {
  pub entry_id:    i64,
  pub recorded_at: String,
  pub stage:       Option<String>,
  pub level:       String,
  pub message:     String,
}

impl RawActivity {
  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      entry_id:    decode_seq(self.entry_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      stage:       self.stage.as_deref().map(str::parse::<StageKind>).transpose()?,
      level:       self.level.parse::<ActivityLevel>()?,
      message:     self.message,
    })
  }
}
