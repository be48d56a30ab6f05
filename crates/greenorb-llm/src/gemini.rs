//! [`GeminiClient`]: the Gemini REST implementation of [`TextGenerator`].

use std::{collections::VecDeque, fmt, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use futures_util::{Stream, StreamExt as _, stream};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  Error, Result,
  generator::{Generation, GenerationRequest, TextGenerator, TextStream},
  sse::{SseDecoder, candidate_text},
};

/// How much of an error body to keep in the failure reason.
const ERROR_BODY_LIMIT: usize = 200;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection settings, deserialised from the `[gemini]` config section.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
  pub api_key:              Option<String>,
  pub model:                String,
  pub base_url:             String,
  /// Applies to establishing connections only; generations have no timeout.
  pub connect_timeout_secs: u64,
}

impl Default for GeminiConfig {
  fn default() -> Self {
    Self {
      api_key:              None,
      model:                "gemini-2.0-flash".to_owned(),
      base_url:             "https://generativelanguage.googleapis.com/v1beta".to_owned(),
      connect_timeout_secs: 10,
    }
  }
}

impl GeminiConfig {
  pub fn has_api_key(&self) -> bool {
    self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
  }
}

impl fmt::Debug for GeminiConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GeminiConfig")
      .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
      .field("model", &self.model)
      .field("base_url", &self.base_url)
      .field("connect_timeout_secs", &self.connect_timeout_secs)
      .finish()
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Cloning is cheap: `reqwest::Client` is reference-counted.
#[derive(Clone, Debug)]
pub struct GeminiClient {
  http:   reqwest::Client,
  config: GeminiConfig,
}

impl GeminiClient {
  pub fn new(config: GeminiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
      .build()?;
    Ok(Self { http, config })
  }

  pub fn config(&self) -> &GeminiConfig { &self.config }

  fn endpoint(&self, streaming: bool) -> String {
    let call = if streaming { "streamGenerateContent?alt=sse" } else { "generateContent" };
    format!("{}/models/{}:{call}", self.config.base_url.trim_end_matches('/'), self.config.model)
  }

  async fn send(&self, request: &GenerationRequest, streaming: bool) -> Result<reqwest::Response> {
    request.validate()?;
    let key = self
      .config
      .api_key
      .as_deref()
      .filter(|k| !k.trim().is_empty())
      .ok_or_else(|| Error::failed("no Gemini API key configured"))?;

    tracing::debug!(model = %self.config.model, streaming, "sending generation request");
    let response = self
      .http
      .post(self.endpoint(streaming))
      .header("x-goog-api-key", key)
      .json(&request_body(request))
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
      return Err(Error::failed(format!("Gemini API error {status}: {snippet}")));
    }
    Ok(response)
  }
}

/// The JSON document for a `generateContent` call.
pub(crate) fn request_body(request: &GenerationRequest) -> Value {
  let mut parts = Vec::with_capacity(2);
  if let Some(att) = &request.attachment {
    parts.push(json!({
      "inlineData": { "mimeType": att.mime_type, "data": B64.encode(&att.data) }
    }));
  }
  parts.push(json!({ "text": request.prompt }));

  let mut body = json!({
    "contents": [{ "role": "user", "parts": parts }],
    "generationConfig": {
      "maxOutputTokens": request.max_output_tokens,
      "temperature": request.temperature,
    },
  });
  if let Some(system) = &request.system {
    body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
  }
  body
}

// ─── Streaming ───────────────────────────────────────────────────────────────

struct StreamState<S> {
  body:    S,
  decoder: SseDecoder,
  pending: VecDeque<String>,
  done:    bool,
}

fn text_stream<S, E>(body: S) -> TextStream
where
  S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Send + Unpin + 'static,
  E: Into<Error>,
{
  let state = StreamState { body, decoder: SseDecoder::new(), pending: VecDeque::new(), done: false };
  stream::unfold(state, |mut st| async move {
    loop {
      if let Some(text) = st.pending.pop_front() {
        return Some((Ok(text), st));
      }
      if st.done {
        return None;
      }
      match st.body.next().await {
        Some(Ok(chunk)) => st.pending.extend(st.decoder.push(&chunk)),
        Some(Err(e)) => {
          st.done = true;
          let err: Error = e.into();
          return Some((Err(err), st));
        }
        None => {
          st.done = true;
          st.pending.extend(st.decoder.finish());
        }
      }
    }
  })
  .boxed()
}

// ─── TextGenerator impl ──────────────────────────────────────────────────────

impl TextGenerator for GeminiClient {
  async fn generate(&self, request: GenerationRequest) -> Result<Generation> {
    let response = self.send(&request, false).await?;
    let raw: Value = response.json().await?;
    let text = candidate_text(&raw).unwrap_or_default();
    Ok(Generation { text, raw })
  }

  async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
    let response = self.send(&request, true).await?;
    Ok(text_stream(Box::pin(response.bytes_stream())))
  }
}
