//! Error types for the greenorb-wire codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("line has no `|||` separator")]
  NoSentinel,

  #[error("{schema} line has {found} fields, at least {expected} required")]
  TooFewFields { schema: &'static str, expected: usize, found: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
