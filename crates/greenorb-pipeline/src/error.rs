//! Error type for `greenorb-pipeline`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Generation(#[from] greenorb_llm::Error),

  #[error("document is {size} bytes, limit is {limit}")]
  DocumentTooLarge { size: usize, limit: usize },

  #[error("document is not a PDF")]
  NotPdf,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
