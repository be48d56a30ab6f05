//! In-test text generators and helpers.

use std::{
  collections::VecDeque,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use futures_util::{StreamExt as _, stream};
use greenorb_llm::{Error, Generation, GenerationRequest, Result, TextGenerator, TextStream};
use tokio::sync::{Notify, Semaphore, watch};

use crate::stage::StageStatus;

/// Wait (at most five seconds) for a status matching `pred`.
pub async fn wait_for(
  rx: &mut watch::Receiver<StageStatus>,
  pred: impl FnMut(&StageStatus) -> bool,
) -> StageStatus {
  tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
    .await
    .expect("timed out waiting for status")
    .expect("status sender dropped")
    .clone()
}

// ─── ScriptedGenerator ───────────────────────────────────────────────────────

/// Answers from a queue of scripted replies, then with a fixed fallback.
pub struct ScriptedGenerator {
  replies:  Mutex<VecDeque<std::result::Result<String, String>>>,
  fallback: String,
  prompts:  Mutex<Vec<String>>,
}

impl ScriptedGenerator {
  pub fn new(fallback: impl Into<String>) -> Self {
    Self {
      replies:  Mutex::new(VecDeque::new()),
      fallback: fallback.into(),
      prompts:  Mutex::new(Vec::new()),
    }
  }

  pub fn reply(self, text: impl Into<String>) -> Self {
    self.replies.lock().unwrap().push_back(Ok(text.into()));
    self
  }

  pub fn fail(self, reason: impl Into<String>) -> Self {
    self.replies.lock().unwrap().push_back(Err(reason.into()));
    self
  }

  /// Every prompt received, in order.
  pub fn prompts(&self) -> Vec<String> { self.prompts.lock().unwrap().clone() }

  fn next(&self, request: &GenerationRequest) -> Result<String> {
    self.prompts.lock().unwrap().push(request.prompt.clone());
    match self.replies.lock().unwrap().pop_front() {
      Some(Ok(text)) => Ok(text),
      Some(Err(reason)) => Err(Error::failed(reason)),
      None => Ok(self.fallback.clone()),
    }
  }
}

impl TextGenerator for ScriptedGenerator {
  async fn generate(&self, request: GenerationRequest) -> Result<Generation> {
    let text = self.next(&request)?;
    Ok(Generation { text, raw: serde_json::Value::Null })
  }

  async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
    let text = self.next(&request)?;
    // Split mid-text so callers have to reassemble fragments.
    let cut = text.char_indices().nth(text.chars().count() / 2).map_or(0, |(i, _)| i);
    let fragments = vec![Ok(text[..cut].to_owned()), Ok(text[cut..].to_owned())];
    Ok(stream::iter(fragments).boxed())
  }
}

// ─── GatedGenerator ──────────────────────────────────────────────────────────

/// Blocks every call until released, counting calls.
pub struct GatedGenerator {
  reply:   String,
  calls:   AtomicUsize,
  entered: Notify,
  gate:    Semaphore,
}

impl GatedGenerator {
  pub fn new(reply: impl Into<String>) -> Self {
    Self {
      reply:   reply.into(),
      calls:   AtomicUsize::new(0),
      entered: Notify::new(),
      gate:    Semaphore::new(0),
    }
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  /// Resolves once a call is blocked on the gate.
  pub async fn entered(&self) {
    tokio::time::timeout(Duration::from_secs(5), self.entered.notified())
      .await
      .expect("no generation call started");
  }

  pub fn release(&self, calls: usize) { self.gate.add_permits(calls) }

  async fn pass(&self) -> Result<String> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.entered.notify_one();
    let permit = self.gate.acquire().await.map_err(Error::failed)?;
    permit.forget();
    Ok(self.reply.clone())
  }
}

impl TextGenerator for GatedGenerator {
  async fn generate(&self, _request: GenerationRequest) -> Result<Generation> {
    Ok(Generation { text: self.pass().await?, raw: serde_json::Value::Null })
  }

  async fn stream(&self, _request: GenerationRequest) -> Result<TextStream> {
    let text = self.pass().await?;
    Ok(stream::iter([Ok(text)]).boxed())
  }
}

// ─── RoutedGenerator ─────────────────────────────────────────────────────────

/// Picks a reply by looking for a marker in the system instruction, so one
/// generator can serve every stage.
pub struct RoutedGenerator {
  routes: Vec<(&'static str, String)>,
}

impl RoutedGenerator {
  pub fn new() -> Self { Self { routes: Vec::new() } }

  pub fn route(mut self, marker: &'static str, reply: impl Into<String>) -> Self {
    self.routes.push((marker, reply.into()));
    self
  }

  fn answer(&self, request: &GenerationRequest) -> Result<String> {
    let system = request.system.as_deref().unwrap_or_default();
    self
      .routes
      .iter()
      .find(|(marker, _)| system.contains(marker))
      .map(|(_, reply)| reply.clone())
      .ok_or_else(|| Error::failed("no route for request"))
  }
}

impl TextGenerator for RoutedGenerator {
  async fn generate(&self, request: GenerationRequest) -> Result<Generation> {
    Ok(Generation { text: self.answer(&request)?, raw: serde_json::Value::Null })
  }

  async fn stream(&self, request: GenerationRequest) -> Result<TextStream> {
    let text = self.answer(&request)?;
    Ok(stream::iter([Ok(text)]).boxed())
  }
}
