//! Pipe-delimited record codec for GreenOrb.
//!
//! The generation service is asked to answer with one record per line, fields
//! separated by the `|||` sentinel:
//!
//! ```text
//! Acme Corp|||Energy|||USA|||120|||B|||http://x|||Solar panels
//! ```
//!
//! This crate turns such text into [`greenorb_core`] records and back. Pure
//! synchronous; no HTTP or database dependencies.
//!
//! # Escaping
//!
//! A backslash escapes the character after it, so `\|` is a literal pipe and
//! `\\` a literal backslash. An escaped pipe never starts a sentinel.
//! [`format_line`] escapes accordingly, so any field value survives a
//! serialize → parse round trip. Text without backslashes is split exactly
//! on every `|||`.
//!
//! # Quick start
//!
//! ```no_run
//! use greenorb_wire::{SCOUT, parse};
//!
//! let rows = parse("Acme Corp|||Energy|||USA|||120", &SCOUT);
//! assert_eq!(rows[0].get("name"), Some("Acme Corp"));
//! ```

mod decode;
pub mod error;
mod parse;
pub mod schema;
mod serialize;

pub use decode::{decode_analysis, decode_company, decode_risk, decode_strategy, parse_number};
pub use error::{Error, Result};
pub use parse::{SENTINEL, parse, parse_line};
pub use schema::{ANALYST, RISK, SCOUT, STRATEGY, Schema};
pub use serialize::{analysis_line, company_line, format_line, risk_line, strategy_line};

use chrono::{DateTime, Utc};
use greenorb_core::record::{Analysis, Company, Risk, Strategy};

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One parsed line: trimmed field values in schema order.
///
/// Fields the line did not supply are absent, as are values the model uses
/// to say "nothing here" (`-`, `N/A`, `unknown`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
  schema: &'static Schema,
  values: Vec<String>,
}

impl Row {
  pub fn schema(&self) -> &'static Schema { self.schema }

  /// Raw values, including any beyond the schema's field list.
  pub fn values(&self) -> &[String] { &self.values }

  /// The value of `field`, or `None` when missing or a placeholder.
  pub fn get(&self, field: &str) -> Option<&str> {
    let idx = self.schema.index_of(field)?;
    let value = self.values.get(idx)?.as_str();
    if is_placeholder(value) { None } else { Some(value) }
  }
}

fn is_placeholder(value: &str) -> bool {
  const PLACEHOLDERS: [&str; 9] =
    ["", "-", "—", "n/a", "na", "none", "null", "unknown", "undefined"];
  let lower = value.trim().to_ascii_lowercase();
  PLACEHOLDERS.contains(&lower.as_str())
}

// ─── Typed shortcuts ─────────────────────────────────────────────────────────

/// Parse Scout output into companies stamped with `discovered_at`.
pub fn parse_companies(text: &str, discovered_at: DateTime<Utc>) -> Vec<Company> {
  parse(text, &SCOUT)
    .iter()
    .filter_map(|row| decode_company(row, discovered_at))
    .collect()
}

/// Parse Analyst output.
pub fn parse_analyses(text: &str) -> Vec<Analysis> {
  parse(text, &ANALYST).iter().filter_map(decode_analysis).collect()
}

/// Parse Risk output.
pub fn parse_risks(text: &str) -> Vec<Risk> {
  parse(text, &RISK).iter().filter_map(decode_risk).collect()
}

/// Parse Strategy output.
pub fn parse_strategies(text: &str) -> Vec<Strategy> {
  parse(text, &STRATEGY).iter().filter_map(decode_strategy).collect()
}
