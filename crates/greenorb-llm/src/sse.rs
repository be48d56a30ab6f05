//! Server-sent-event decoding for streamed generations.

use serde_json::Value;

/// The concatenated `candidates[0].content.parts[*].text` of a response
/// document, or `None` when it has no text.
pub fn candidate_text(doc: &Value) -> Option<String> {
  let parts = doc
    .get("candidates")?
    .get(0)?
    .get("content")?
    .get("parts")?
    .as_array()?;
  let text: String = parts
    .iter()
    .filter_map(|p| p.get("text").and_then(Value::as_str))
    .collect();
  (!text.is_empty()).then_some(text)
}

/// Incremental decoder for a `text/event-stream` body.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// character split across network chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct SseDecoder {
  buf: Vec<u8>,
}

impl SseDecoder {
  pub fn new() -> Self { Self::default() }

  /// Feed one network chunk; returns the text fragments it completed.
  pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
    self.buf.extend_from_slice(chunk);
    let mut out = Vec::new();
    while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
      let line: Vec<u8> = self.buf.drain(..=pos).collect();
      if let Some(text) = decode_line(&line) {
        out.push(text);
      }
    }
    out
  }

  /// Flush a final line that had no trailing newline.
  pub fn finish(&mut self) -> Option<String> {
    let line = std::mem::take(&mut self.buf);
    decode_line(&line)
  }
}

fn decode_line(raw: &[u8]) -> Option<String> {
  let line = String::from_utf8_lossy(raw);
  let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim();
  if data.is_empty() || data == "[DONE]" {
    return None;
  }
  match serde_json::from_str::<Value>(data) {
    Ok(doc) => candidate_text(&doc),
    Err(e) => {
      tracing::debug!(error = %e, "skipping unparseable event payload");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn event(text: &str) -> String {
    let doc = serde_json::json!({
      "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    });
    format!("data: {doc}\n\n")
  }

  #[test]
  fn fragments_are_yielded_in_order() {
    let body = format!("{}{}data: [DONE]\n", event("Acme|||"), event("Energy"));
    let mut dec = SseDecoder::new();
    assert_eq!(dec.push(body.as_bytes()), ["Acme|||", "Energy"]);
    assert_eq!(dec.finish(), None);
  }

  #[test]
  fn lines_split_across_chunks_are_reassembled() {
    let body = event("Société Générale");
    let bytes = body.as_bytes();
    // Split inside the two-byte 'é'.
    let cut = body.find('é').unwrap() + 1;

    let mut dec = SseDecoder::new();
    assert!(dec.push(&bytes[..cut]).is_empty());
    assert_eq!(dec.push(&bytes[cut..]), ["Société Générale"]);
  }

  #[test]
  fn noise_is_skipped() {
    let body = "event: ping\n: comment\ndata: \ndata: {not json\ndata: {\"candidates\":[]}\n";
    let mut dec = SseDecoder::new();
    assert!(dec.push(body.as_bytes()).is_empty());
  }

  #[test]
  fn unterminated_last_line_is_flushed() {
    let body = event("tail");
    let mut dec = SseDecoder::new();
    assert!(dec.push(body.trim_end().as_bytes()).is_empty());
    assert_eq!(dec.finish().as_deref(), Some("tail"));
  }

  #[test]
  fn all_parts_of_the_first_candidate_are_joined() {
    let doc = serde_json::json!({
      "candidates": [
        { "content": { "parts": [{ "text": "a" }, { "inlineData": {} }, { "text": "b" }] } },
        { "content": { "parts": [{ "text": "ignored" }] } }
      ]
    });
    assert_eq!(candidate_text(&doc).as_deref(), Some("ab"));
  }
}
