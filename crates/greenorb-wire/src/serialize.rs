//! Record → line serializer.
//!
//! Used to show upstream records to later stages in the same format they
//! are asked to answer in.

use greenorb_core::record::{Analysis, Company, Risk, Strategy};
use serde::Serialize;

use crate::parse::SENTINEL;

/// Join field values with the sentinel, escaping `\` and `|` and folding
/// line breaks to spaces so each record stays on one line. Absent values
/// become empty fields.
pub fn format_line<'a>(fields: impl IntoIterator<Item = Option<&'a str>>) -> String {
  let escaped: Vec<String> = fields
    .into_iter()
    .map(|field| escape(field.unwrap_or_default()))
    .collect();
  escaped.join(SENTINEL)
}

fn escape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '\\' | '|' => {
        out.push('\\');
        out.push(c);
      }
      '\r' | '\n' => out.push(' '),
      _ => out.push(c),
    }
  }
  out
}

/// The serde name of an enum value, e.g. `Trend::Up` → `"UP"`.
fn label<T: Serialize>(value: Option<&T>) -> Option<String> {
  let json = serde_json::to_value(value?).ok()?;
  json.as_str().map(str::to_owned)
}

fn number(value: Option<f64>) -> Option<String> { value.map(|n| n.to_string()) }

fn int(value: Option<u8>) -> Option<String> { value.map(|n| n.to_string()) }

fn owned_line(fields: &[Option<String>]) -> String {
  format_line(fields.iter().map(|f| f.as_deref()))
}

pub fn company_line(c: &Company) -> String {
  let scope = if c.scopes.s1.is_none() && c.scopes.s2.is_none() && c.scopes.s3.is_none() {
    None
  } else {
    let parts = [c.scopes.s1, c.scopes.s2, c.scopes.s3]
      .map(|s| s.map(|n| n.to_string()).unwrap_or_default());
    Some(parts.join("/"))
  };
  owned_line(&[
    Some(c.name.clone()),
    c.sector.clone(),
    c.country.clone(),
    number(c.co2_mt),
    c.grade.clone(),
    c.url.clone(),
    c.products.clone(),
    c.methodology.clone(),
    scope,
  ])
}

pub fn analysis_line(a: &Analysis) -> String {
  owned_line(&[
    Some(a.company.clone()),
    int(a.score),
    int(a.e_score),
    int(a.s_score),
    int(a.g_score),
    label(a.trend.as_ref()),
    label(a.peer.as_ref()),
    a.strengths.clone(),
    a.weaknesses.clone(),
    label(a.recommendation.as_ref()),
  ])
}

pub fn risk_line(r: &Risk) -> String {
  owned_line(&[
    Some(r.company.clone()),
    label(r.greenwash.as_ref()),
    label(r.reg_risk.as_ref()),
    label(r.climate_exp.as_ref()),
    label(r.data_quality.as_ref()),
    r.red_flags.clone(),
    r.compliance.clone(),
  ])
}

pub fn strategy_line(s: &Strategy) -> String {
  owned_line(&[
    Some(s.company.clone()),
    label(s.action.as_ref()),
    int(s.confidence),
    s.rationale.clone(),
    s.price_impact.clone(),
    s.catalyst.clone(),
    label(s.timeline.as_ref()),
  ])
}
