//! Remote text generation for GreenOrb.
//!
//! [`TextGenerator`] is the seam the pipeline depends on; [`GeminiClient`]
//! implements it against the Gemini REST API, either as one JSON response or
//! as a server-sent-event stream of text fragments.

pub mod error;
mod gemini;
mod generator;
mod sse;

pub use error::{Error, Result};
pub use gemini::{GeminiClient, GeminiConfig};
pub use generator::{
  DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE, Generation, GenerationRequest, InlineData,
  TextGenerator, TextStream,
};
pub use sse::{SseDecoder, candidate_text};
