//! The four pipeline stages, in dependency order.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
  Scout,
  Analyst,
  Risk,
  Strategy,
}

impl StageKind {
  pub const ALL: [StageKind; 4] =
    [Self::Scout, Self::Analyst, Self::Risk, Self::Strategy];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Scout => "scout",
      Self::Analyst => "analyst",
      Self::Risk => "risk",
      Self::Strategy => "strategy",
    }
  }
}

impl fmt::Display for StageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for StageKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "scout" => Ok(Self::Scout),
      "analyst" | "analyze" => Ok(Self::Analyst),
      "risk" => Ok(Self::Risk),
      "strategy" => Ok(Self::Strategy),
      _ => Err(Error::UnknownVariant { kind: "stage", value: s.to_owned() }),
    }
  }
}
