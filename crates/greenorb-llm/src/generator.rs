//! The `TextGenerator` trait and its request/response types.

use std::future::Future;

use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::{Error, Result};

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A lazy, finite stream of text fragments. Not restartable.
pub type TextStream = BoxStream<'static, Result<String>>;

/// A binary attachment sent inline with the prompt (e.g. a PDF).
#[derive(Debug, Clone, PartialEq)]
pub struct InlineData {
  pub mime_type: String,
  pub data:      Bytes,
}

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  pub prompt:            String,
  pub system:            Option<String>,
  pub attachment:        Option<InlineData>,
  pub max_output_tokens: u32,
  pub temperature:       f32,
}

impl GenerationRequest {
  pub fn new(prompt: impl Into<String>) -> Self {
    Self {
      prompt:            prompt.into(),
      system:            None,
      attachment:        None,
      max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
      temperature:       DEFAULT_TEMPERATURE,
    }
  }

  pub fn with_system(mut self, system: impl Into<String>) -> Self {
    self.system = Some(system.into());
    self
  }

  pub fn with_attachment(mut self, mime_type: impl Into<String>, data: Bytes) -> Self {
    self.attachment = Some(InlineData { mime_type: mime_type.into(), data });
    self
  }

  pub fn with_max_output_tokens(mut self, max: u32) -> Self {
    self.max_output_tokens = max;
    self
  }

  /// Reject requests that must not reach the network.
  pub fn validate(&self) -> Result<()> {
    if self.prompt.trim().is_empty() {
      return Err(Error::EmptyPrompt);
    }
    Ok(())
  }
}

/// A complete, non-streamed answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
  /// Concatenated text of the first candidate.
  pub text: String,
  /// The full response document.
  pub raw:  serde_json::Value,
}

/// A remote text-generation service.
///
/// Calls are never cancelled once started; callers that need to stop check
/// their own flag between calls.
pub trait TextGenerator: Send + Sync {
  /// One request, one complete answer.
  fn generate(
    &self,
    request: GenerationRequest,
  ) -> impl Future<Output = Result<Generation>> + Send + '_;

  /// One request, answered as a stream of fragments.
  fn stream(
    &self,
    request: GenerationRequest,
  ) -> impl Future<Output = Result<TextStream>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_the_service_settings() {
    let req = GenerationRequest::new("hi");
    assert_eq!(req.max_output_tokens, 4096);
    assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    assert!(req.system.is_none());
  }

  #[test]
  fn blank_prompt_is_rejected() {
    assert!(matches!(GenerationRequest::new("  \n").validate(), Err(Error::EmptyPrompt)));
    assert!(GenerationRequest::new("x").validate().is_ok());
  }
}
