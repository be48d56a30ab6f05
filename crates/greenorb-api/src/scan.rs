//! Handler for `POST /scan`: a one-shot carbon report for an uploaded PDF.

use axum::{
  Json,
  extract::{State, rejection::BytesRejection},
  http::{HeaderMap, StatusCode, header},
};
use bytes::Bytes;
use greenorb_core::{
  activity::{ActivityLevel, NewActivity},
  store::EsgStore,
};
use greenorb_llm::TextGenerator;
use greenorb_pipeline::{ScanReport, scan_document};

use crate::{ApiState, error::ApiError};

/// Content types accepted besides the PDF one; the magic bytes decide.
const ACCEPTED_TYPES: [&str; 2] = ["application/pdf", "application/octet-stream"];

/// `POST /scan`: body is the raw PDF.
pub async fn handler<S, G>(
  State(state): State<ApiState<S, G>>,
  headers: HeaderMap,
  body: Result<Bytes, BytesRejection>,
) -> Result<Json<ScanReport>, ApiError>
where
  S: EsgStore,
  G: TextGenerator,
{
  if let Some(ct) = headers.get(header::CONTENT_TYPE) {
    let mime = ct.to_str().unwrap_or_default().split(';').next().unwrap_or_default().trim();
    if !ACCEPTED_TYPES.iter().any(|t| mime.eq_ignore_ascii_case(t)) {
      return Err(ApiError::UnsupportedMediaType(format!("expected application/pdf, got {mime:?}")));
    }
  }

  let body = body.map_err(|r| match r.status() {
    StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(r.body_text()),
    _ => ApiError::BadRequest(r.body_text()),
  })?;
  let report = scan_document(state.generator.as_ref(), body).await?;

  let summary = match report.greendex {
    Some(score) => format!("📄 Document scanned: Greendex {score}/100"),
    None => "📄 Document scanned".to_owned(),
  };
  let entry = NewActivity { stage: None, level: ActivityLevel::Info, message: summary };
  if let Err(e) = state.store.record_activity(entry).await {
    tracing::warn!(error = %e, "writing the activity feed failed");
  }
  Ok(Json(report))
}
