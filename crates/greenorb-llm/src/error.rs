//! Error type for `greenorb-llm`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("prompt is empty")]
  EmptyPrompt,

  /// Transport failure, non-2xx status, unreadable body or missing key.
  #[error("generation failed: {reason}")]
  GenerationFailed { reason: String },
}

impl Error {
  pub fn failed(reason: impl std::fmt::Display) -> Self {
    Self::GenerationFailed { reason: reason.to_string() }
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self { Self::failed(e) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
