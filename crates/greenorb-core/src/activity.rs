//! Activity feed entries.
//!
//! The feed is the only user-visible failure signal in the pipeline: every
//! swallowed generation, parse or persistence error ends up here as one line.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, stage::StageKind};

/// The kind of line, used by clients for colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
  Search,
  Success,
  Data,
  Info,
  Error,
  System,
}

impl ActivityLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Search => "search",
      Self::Success => "success",
      Self::Data => "data",
      Self::Info => "info",
      Self::Error => "error",
      Self::System => "system",
    }
  }
}

impl fmt::Display for ActivityLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ActivityLevel {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "search" => Ok(Self::Search),
      "success" => Ok(Self::Success),
      "data" => Ok(Self::Data),
      "info" => Ok(Self::Info),
      "error" => Ok(Self::Error),
      "system" => Ok(Self::System),
      other => Err(Error::UnknownVariant { kind: "activity level", value: other.to_owned() }),
    }
  }
}

/// A persisted feed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub entry_id:    u64,
  pub recorded_at: DateTime<Utc>,
  /// `None` for entries not tied to a stage (e.g. "all data cleared").
  pub stage:       Option<StageKind>,
  pub level:       ActivityLevel,
  pub message:     String,
}

/// Input to [`crate::store::EsgStore::record_activity`]; the id and
/// timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub stage:   Option<StageKind>,
  pub level:   ActivityLevel,
  pub message: String,
}

impl NewActivity {
  pub fn new(stage: StageKind, level: ActivityLevel, message: impl Into<String>) -> Self {
    Self { stage: Some(stage), level, message: message.into() }
  }

  pub fn system(message: impl Into<String>) -> Self {
    Self { stage: None, level: ActivityLevel::System, message: message.into() }
  }
}
