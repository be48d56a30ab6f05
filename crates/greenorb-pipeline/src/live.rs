//! On-demand ESG snapshot for a single company.
//!
//! The model is asked for one JSON object. Whatever sits between the first
//! `{` and the last `}` is read leniently, field by field; an answer with no
//! usable object keeps its opening text as the news line.

use greenorb_core::record::{RiskLevel, clamp_score};
use greenorb_llm::{GenerationRequest, TextGenerator};
use greenorb_wire::parse_number;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;

/// Characters of a non-JSON answer kept as the news line.
const FALLBACK_NEWS_CHARS: usize = 200;

const SYSTEM: &str = "You are a carbon intelligence analyst. Search for the latest ESG data for \
  the given company. Return ONLY a valid JSON object (no markdown fences, no extra text):\n\
  {\"news\":\"one sentence about latest sustainability news or initiative\",\"target\":\"net \
  zero target year e.g. 2050\",\"renewable_pct\":75,\"cbam_risk\":\"High or Med or Low\",\
  \"controversy\":\"one sentence about any controversy or empty string\"}";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveInsight {
  pub company:       String,
  pub news:          Option<String>,
  /// Net-zero target, usually a year.
  pub target:        Option<String>,
  pub renewable_pct: Option<u8>,
  pub cbam_risk:     Option<RiskLevel>,
  pub controversy:   Option<String>,
}

impl LiveInsight {
  /// Read a model answer for `company`.
  pub fn from_text(company: &str, text: &str) -> Self {
    let mut insight = match json_object(text) {
      Some(fields) => Self {
        news: text_field(&fields, "news"),
        target: text_field(&fields, "target"),
        renewable_pct: fields
          .get("renewable_pct")
          .and_then(number)
          .map(|n| clamp_score(n.round() as i64)),
        cbam_risk: text_field(&fields, "cbam_risk").and_then(|s| s.parse().ok()),
        controversy: text_field(&fields, "controversy"),
        ..Self::default()
      },
      None => {
        let news: String = text.trim().chars().take(FALLBACK_NEWS_CHARS).collect();
        Self { news: (!news.is_empty()).then_some(news), ..Self::default() }
      }
    };
    insight.company = company.to_owned();
    insight
  }
}

/// Ask for the latest ESG news and targets for `company`.
pub async fn live_insight<G: TextGenerator>(generator: &G, company: &str) -> Result<LiveInsight> {
  tracing::info!(company, "fetching live ESG data");
  let prompt = format!(
    "Search for the latest 2024/2025 ESG news, net zero targets, and sustainability data for \
     {company}. Return only the JSON object."
  );
  let generation = generator.generate(GenerationRequest::new(prompt).with_system(SYSTEM)).await?;
  Ok(LiveInsight::from_text(company, &generation.text))
}

fn json_object(text: &str) -> Option<Map<String, Value>> {
  let start = text.find('{')?;
  let end = text.rfind('}')?;
  if end < start {
    return None;
  }
  match serde_json::from_str(&text[start..=end]) {
    Ok(Value::Object(fields)) => Some(fields),
    Ok(_) => None,
    Err(e) => {
      tracing::debug!(error = %e, "live answer is not a JSON object");
      None
    }
  }
}

/// A non-empty string, or a number written out.
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
  match fields.get(key)? {
    Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => parse_number(s),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use crate::testing::ScriptedGenerator;

  use super::*;

  #[test]
  fn object_is_cut_out_of_surrounding_text() {
    let text = "Here you go:\n```json\n{\"news\":\"Opened a 2 GW solar farm\",\"target\":2040,\
      \"renewable_pct\":\"62%\",\"cbam_risk\":\"Medium\",\"controversy\":\"\"}\n```";
    let insight = LiveInsight::from_text("Acme Corp", text);
    assert_eq!(insight, LiveInsight {
      company:       "Acme Corp".into(),
      news:          Some("Opened a 2 GW solar farm".into()),
      target:        Some("2040".into()),
      renewable_pct: Some(62),
      cbam_risk:     Some(RiskLevel::Med),
      controversy:   None,
    });
  }

  #[test]
  fn odd_values_are_dropped_or_clamped() {
    let text = r#"{"renewable_pct":140,"cbam_risk":"severe","news":["a"]}"#;
    let insight = LiveInsight::from_text("Acme", text);
    assert_eq!(insight.renewable_pct, Some(100));
    assert_eq!(insight.cbam_risk, None);
    assert_eq!(insight.news, None);
  }

  #[test]
  fn text_without_an_object_becomes_the_news_line() {
    let long = "No structured data found. ".repeat(20);
    let insight = LiveInsight::from_text("Acme", &long);
    assert_eq!(insight.news.as_deref().map(|n| n.chars().count()), Some(200));
    assert_eq!(insight.target, None);

    let broken = LiveInsight::from_text("Acme", "} backwards {");
    assert_eq!(broken.news.as_deref(), Some("} backwards {"));

    let invalid = LiveInsight::from_text("Acme", "{news: unquoted}");
    assert_eq!(invalid.news.as_deref(), Some("{news: unquoted}"));

    assert_eq!(LiveInsight::from_text("Acme", "  ").news, None);
  }

  #[tokio::test]
  async fn asks_about_the_named_company() {
    let generator = ScriptedGenerator::new(r#"{"target":"2050"}"#).fail("quota exceeded");

    let err = live_insight(&generator, "Globex").await.unwrap_err();
    assert!(matches!(err, crate::Error::Generation(_)));

    let insight = live_insight(&generator, "Globex").await.unwrap();
    assert_eq!(insight.company, "Globex");
    assert_eq!(insight.target.as_deref(), Some("2050"));
    assert!(generator.prompts().iter().all(|p| p.contains("Globex")));
  }
}
