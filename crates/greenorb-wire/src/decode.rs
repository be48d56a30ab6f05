//! Row → record decoding.
//!
//! Decoding is lenient: an unparseable number or unknown enum value leaves
//! that field empty instead of rejecting the record. Only a missing key
//! field (the company name) drops the row.

use chrono::{DateTime, Utc};
use greenorb_core::record::{Analysis, Company, Risk, Scopes, Strategy, clamp_score};

use crate::Row;

/// Read the leading number out of free text: `"120"`, `"1,234.5 Mt"`,
/// `"~45"`, `"72/100"`. A `-` only counts as a sign when it does not follow
/// a letter or digit, so `"Scope-1"` reads as `1`.
pub fn parse_number(raw: &str) -> Option<f64> {
  let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '_').collect();
  let bytes = cleaned.as_bytes();
  let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
  let start = (0..bytes.len()).find(|&i| match bytes[i] {
    b'0'..=b'9' => true,
    b'.' => digit_at(i + 1),
    b'-' => {
      let signed = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
      signed && (digit_at(i + 1) || (bytes.get(i + 1) == Some(&b'.') && digit_at(i + 2)))
    }
    _ => false,
  })?;
  let tail = &cleaned[start..];
  let end = tail
    .char_indices()
    .skip(1)
    .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
    .map_or(tail.len(), |(i, _)| i);
  tail[..end].parse::<f64>().ok().filter(|n| n.is_finite())
}

fn score(row: &Row, field: &str) -> Option<u8> {
  row
    .get(field)
    .and_then(parse_number)
    .map(|n| clamp_score(n.round() as i64))
}

fn text(row: &Row, field: &str) -> Option<String> { row.get(field).map(str::to_owned) }

fn variant<T: std::str::FromStr>(row: &Row, field: &str) -> Option<T> {
  row.get(field).and_then(|v| v.parse().ok())
}

/// `"12.1/4/98.2"` → scope 1, 2 and 3. Missing parts stay empty.
fn scopes(row: &Row) -> Scopes {
  let Some(raw) = row.get("scope") else {
    return Scopes::default();
  };
  let mut parts = raw.split('/').map(parse_number);
  Scopes {
    s1: parts.next().flatten(),
    s2: parts.next().flatten(),
    s3: parts.next().flatten(),
  }
}

pub fn decode_company(row: &Row, discovered_at: DateTime<Utc>) -> Option<Company> {
  let name = row.get("name")?;
  Some(Company {
    name: name.to_owned(),
    sector: text(row, "sector"),
    country: text(row, "country"),
    co2_mt: row.get("co2").and_then(parse_number),
    grade: text(row, "grade"),
    url: text(row, "url"),
    products: text(row, "products"),
    methodology: text(row, "methodology"),
    scopes: scopes(row),
    report_year: None,
    discovered_at,
  })
}

pub fn decode_analysis(row: &Row) -> Option<Analysis> {
  let company = row.get("company")?;
  Some(Analysis {
    company:        company.to_owned(),
    score:          score(row, "score"),
    e_score:        score(row, "e_score"),
    s_score:        score(row, "s_score"),
    g_score:        score(row, "g_score"),
    trend:          variant(row, "trend"),
    peer:           variant(row, "peer"),
    strengths:      text(row, "strengths"),
    weaknesses:     text(row, "weaknesses"),
    recommendation: variant(row, "recommendation"),
  })
}

pub fn decode_risk(row: &Row) -> Option<Risk> {
  let company = row.get("company")?;
  Some(Risk {
    company:      company.to_owned(),
    greenwash:    variant(row, "greenwash"),
    reg_risk:     variant(row, "reg_risk"),
    climate_exp:  variant(row, "climate_exp"),
    data_quality: variant(row, "data_quality"),
    red_flags:    text(row, "red_flags"),
    compliance:   text(row, "compliance"),
  })
}

pub fn decode_strategy(row: &Row) -> Option<Strategy> {
  let company = row.get("company")?;
  Some(Strategy {
    company:      company.to_owned(),
    action:       variant(row, "action"),
    confidence:   score(row, "confidence"),
    rationale:    text(row, "rationale"),
    price_impact: text(row, "price_impact"),
    catalyst:     text(row, "catalyst"),
    timeline:     variant(row, "timeline"),
  })
}

#[cfg(test)]
mod tests {
  use greenorb_core::record::{Action, DataQuality, RiskLevel, Timeline, Trend};

  use super::*;
  use crate::{
    parse,
    schema::{ANALYST, RISK, SCOUT, STRATEGY},
  };

  #[test]
  fn numbers_tolerate_units_and_separators() {
    assert_eq!(parse_number("120"), Some(120.0));
    assert_eq!(parse_number("1,234.5 Mt"), Some(1234.5));
    assert_eq!(parse_number("~45"), Some(45.0));
    assert_eq!(parse_number("72/100"), Some(72.0));
    assert_eq!(parse_number("-3.5"), Some(-3.5));
    assert_eq!(parse_number("Mt"), None);
    assert_eq!(parse_number("-"), None);
  }

  #[test]
  fn stray_dots_and_hyphens_do_not_start_a_number() {
    assert_eq!(parse_number("approx. 120"), Some(120.0));
    assert_eq!(parse_number("Scope-1 12"), Some(1.0));
    assert_eq!(parse_number("- 7"), Some(7.0));
    assert_eq!(parse_number(".5 Mt"), Some(0.5));
    assert_eq!(parse_number("(-.25)"), Some(-0.25));
  }

  #[test]
  fn company_scopes_are_split() {
    let row = &parse("Acme|||Energy|||USA|||120|||B|||u|||p|||GHG Protocol|||12.1/4/98.2", &SCOUT)[0];
    let c = decode_company(row, Utc::now()).unwrap();
    assert_eq!(c.methodology.as_deref(), Some("GHG Protocol"));
    assert_eq!(c.scopes, Scopes { s1: Some(12.1), s2: Some(4.0), s3: Some(98.2) });
  }

  #[test]
  fn analysis_decodes_scores_and_enums() {
    let row = &parse(
      "Acme|||72|||80/100|||65|||140|||improving|||Top|||Solar|||Coal legacy|||Buy",
      &ANALYST,
    )[0];
    let a = decode_analysis(row).unwrap();
    assert_eq!(a.score, Some(72));
    assert_eq!(a.e_score, Some(80));
    assert_eq!(a.g_score, Some(100));
    assert_eq!(a.trend, Some(Trend::Up));
    assert_eq!(a.weaknesses.as_deref(), Some("Coal legacy"));
  }

  #[test]
  fn unknown_enum_values_leave_the_field_empty() {
    let row = &parse("Acme|||extreme|||HIGH|||medium|||good|||none", &RISK)[0];
    let r = decode_risk(row).unwrap();
    assert_eq!(r.greenwash, None);
    assert_eq!(r.reg_risk, Some(RiskLevel::High));
    assert_eq!(r.climate_exp, Some(RiskLevel::Med));
    assert_eq!(r.data_quality, Some(DataQuality::Good));
    assert_eq!(r.red_flags, None);
  }

  #[test]
  fn strategy_decodes() {
    let row = &parse("Acme|||SELL|||85%|||Overvalued|||-5%|||Q3 report|||long-term", &STRATEGY)[0];
    let s = decode_strategy(row).unwrap();
    assert_eq!(s.action, Some(Action::Sell));
    assert_eq!(s.confidence, Some(85));
    assert_eq!(s.price_impact.as_deref(), Some("-5%"));
    assert_eq!(s.timeline, Some(Timeline::Long));
  }
}
