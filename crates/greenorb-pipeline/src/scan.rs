//! One-shot carbon report for an uploaded PDF.

use bytes::Bytes;
use greenorb_llm::{GenerationRequest, TextGenerator};
use serde::Serialize;

use crate::{Error, Result};

/// Largest document accepted for inline upload.
pub const MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

const SCAN_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Lines kept per marker.
const MARKED_LINES: usize = 5;

/// Shorter marked lines are decoration, not content.
const MIN_MARKED_CHARS: usize = 5;

const RISK_MARKER: char = '⚠';
const ACTION_MARKER: char = '✅';

const SYSTEM: &str = "You are GreenOrb's Carbon Intelligence Engine. Analyze any document and \
  produce a structured carbon footprint report with these ## sections: Executive Summary, \
  Greendex Score (write \"Greendex Score: XX/100\"), Scope 1 Emissions (write \"X.X tCO2e\"), \
  Scope 2 Emissions, Scope 3 Emissions, Carbon Hotspots, Regulatory Compliance (EU DPP/CBAM/BRSR), \
  ⚠ Risk Flags (prefix each with ⚠), ✅ Recommended Actions (prefix each with ✅), Calculation \
  Methodology Used. Be quantitative: estimate from industry benchmarks if direct data is absent, \
  labeling estimates clearly.";

const PROMPT: &str = "Analyze this document. Produce the full GreenOrb carbon & ESG report.";

/// Band a Greendex score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Compliant,
  NeedsAction,
  HighRisk,
}

impl Verdict {
  pub fn from_score(score: u8) -> Self {
    match score {
      75.. => Self::Compliant,
      50..=74 => Self::NeedsAction,
      _ => Self::HighRisk,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
  pub greendex:   Option<u8>,
  pub verdict:    Option<Verdict>,
  pub risk_flags: Vec<String>,
  pub actions:    Vec<String>,
  /// The full markdown report.
  pub report:     String,
}

impl ScanReport {
  pub fn from_text(report: String) -> Self {
    let greendex = greendex_score(&report);
    Self {
      greendex,
      verdict: greendex.map(Verdict::from_score),
      risk_flags: marked_lines(&report, RISK_MARKER),
      actions: marked_lines(&report, ACTION_MARKER),
      report,
    }
  }
}

/// Send `pdf` inline and summarise the report that comes back.
pub async fn scan_document<G: TextGenerator>(generator: &G, pdf: Bytes) -> Result<ScanReport> {
  if pdf.len() > MAX_DOCUMENT_BYTES {
    return Err(Error::DocumentTooLarge { size: pdf.len(), limit: MAX_DOCUMENT_BYTES });
  }
  if !pdf.starts_with(b"%PDF") {
    return Err(Error::NotPdf);
  }

  tracing::info!(bytes = pdf.len(), "scanning document");
  let request = GenerationRequest::new(PROMPT)
    .with_system(SYSTEM)
    .with_attachment("application/pdf", pdf)
    .with_max_output_tokens(SCAN_MAX_OUTPUT_TOKENS);
  let generation = generator.generate(request).await?;
  Ok(ScanReport::from_text(generation.text))
}

/// The first integer after "greendex" (any case), capped at 100.
pub fn greendex_score(text: &str) -> Option<u8> {
  let lower = text.to_ascii_lowercase();
  let tail = &lower[lower.find("greendex")? + "greendex".len()..];
  let start = tail.find(|c: char| c.is_ascii_digit())?;
  let digits: &str = &tail[start..];
  let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
  let score = digits[..end].parse::<u64>().map_or(100, |n| n.min(100));
  Some(score as u8)
}

/// Lines containing `marker`, with leading markdown decoration and the
/// marker itself stripped.
pub fn marked_lines(text: &str, marker: char) -> Vec<String> {
  text
    .lines()
    .filter(|line| line.contains(marker))
    .map(|line| {
      line
        .trim_start_matches(|c: char| {
          matches!(c, '#' | '-' | '•' | '*' | '\u{FE0F}') || c == marker || c.is_whitespace()
        })
        .trim()
        .to_owned()
    })
    .filter(|line| line.chars().count() > MIN_MARKED_CHARS)
    .take(MARKED_LINES)
    .collect()
}
