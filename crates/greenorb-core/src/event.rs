//! Event types: the append-only log every piece of state is derived from.
//!
//! Records are never written in place. Stages and API handlers append
//! events; readers fold them into a [`crate::projection::Projection`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  record::{Analysis, Company, Record, Risk, Strategy},
};

// ─── EventKind ───────────────────────────────────────────────────────────────

/// The typed payload of an event. The variant name serves as the `kind`
/// discriminant stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventKind {
  /// A Scout batch. Only names not already present are kept.
  Discovered(Vec<Company>),
  /// A stage output. The first record per name wins.
  Analyzed(Analysis),
  RiskAssessed(Risk),
  StrategyDrafted(Strategy),
  /// An externally submitted record that replaces any same-named record.
  Upserted(Record),
  /// The Scout stage moved on to the sector query at `index`.
  SectorAdvanced { index: usize },
  /// Every record was deleted. The Scout cursor is kept.
  Cleared,
}

impl EventKind {
  /// The discriminant string stored in the `kind` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn discriminant(&self) -> &'static str {
    match self {
      Self::Discovered(_) => "discovered",
      Self::Analyzed(_) => "analyzed",
      Self::RiskAssessed(_) => "risk_assessed",
      Self::StrategyDrafted(_) => "strategy_drafted",
      Self::Upserted(_) => "upserted",
      Self::SectorAdvanced { .. } => "sector_advanced",
      Self::Cleared => "cleared",
    }
  }

  /// Serialise the inner payload (without the type tag) for the `payload`
  /// database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from the discriminant string and JSON payload stored in the
  /// database.
  pub fn from_parts(discriminant: &str, data: serde_json::Value) -> Result<Self> {
    const KNOWN: [&str; 7] = [
      "discovered",
      "analyzed",
      "risk_assessed",
      "strategy_drafted",
      "upserted",
      "sector_advanced",
      "cleared",
    ];
    if !KNOWN.contains(&discriminant) {
      return Err(Error::UnknownEventKind(discriminant.to_owned()));
    }
    // Unit variants carry no content; an explicit `null` would not decode.
    let wrapped = if data.is_null() {
      serde_json::json!({ "type": discriminant })
    } else {
      serde_json::json!({ "type": discriminant, "data": data })
    };
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// One entry of the log. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  /// Store-assigned, strictly increasing position in the log.
  pub seq:         u64,
  pub event_id:    Uuid,
  /// Server-assigned timestamp.
  pub recorded_at: DateTime<Utc>,
  pub kind:        EventKind,
}
