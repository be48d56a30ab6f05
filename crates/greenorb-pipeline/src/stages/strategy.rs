//! Strategy: turns each risk assessment into a trade idea.

use greenorb_core::{
  activity::ActivityLevel,
  event::EventKind,
  projection::Projection,
  record::{self, Analysis, Keyed as _},
  stage::StageKind,
};
use greenorb_llm::GenerationRequest;
use greenorb_wire::{ANALYST, RISK, STRATEGY, analysis_line, parse_strategies, risk_line};

use super::{label, one_line_instruction};
use crate::stage::{Outcome, Stage};

#[derive(Debug, Clone)]
pub struct StrategyItem {
  pub risk:     record::Risk,
  pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Strategy;

impl Stage for Strategy {
  type Item = StrategyItem;

  fn kind(&self) -> StageKind { StageKind::Strategy }

  fn backlog(&self, projection: &Projection) -> Vec<StrategyItem> {
    projection
      .strategy_backlog()
      .into_iter()
      .map(|r| StrategyItem {
        risk:     r.clone(),
        analysis: projection.analysis(&r.key()).cloned(),
      })
      .collect()
  }

  fn describe(&self, item: &StrategyItem) -> String {
    format!("Drafting strategy for {}", item.risk.company)
  }

  fn is_pending(&self, item: &StrategyItem, projection: &Projection) -> bool {
    let key = item.risk.key();
    projection.risk(&key).is_some() && !projection.strategies().contains(&key)
  }

  fn request(&self, item: &StrategyItem) -> GenerationRequest {
    let system = one_line_instruction(
      "an ESG investment strategist",
      &STRATEGY,
      "ACTION is BUY, HOLD, SELL or AVOID. CONFIDENCE is an integer from 0 to 100. TIMELINE is \
       SHORT, MED or LONG.",
    );
    let mut prompt = String::from("Recommend a position in this company.\n");
    if let Some(analysis) = &item.analysis {
      prompt.push_str(&format!("Analyst view:\n{}\n{}\n", ANALYST.header(), analysis_line(analysis)));
    }
    prompt.push_str(&format!("Risk assessment:\n{}\n{}", RISK.header(), risk_line(&item.risk)));
    GenerationRequest::new(prompt).with_system(system)
  }

  fn absorb(&self, item: &StrategyItem, text: &str) -> Option<Outcome> {
    let mut strategy = parse_strategies(text).into_iter().next()?;
    strategy.company = item.risk.company.clone();

    let confidence = strategy.confidence.map_or_else(|| "?".to_owned(), |c| format!("{c}%"));
    let line = format!(
      "✓ Strategy for {}: {} ({confidence} confidence)",
      strategy.company,
      label(strategy.action),
    );
    Some(Outcome {
      events: vec![EventKind::StrategyDrafted(strategy)],
      feed:   vec![(ActivityLevel::Success, line)],
    })
  }
}

#[cfg(test)]
mod tests {
  use greenorb_core::record::{Action, Timeline};

  use super::*;

  fn item(name: &str) -> StrategyItem {
    StrategyItem {
      risk:     record::Risk { company: name.into(), ..Default::default() },
      analysis: Some(Analysis { company: name.into(), score: Some(81), ..Default::default() }),
    }
  }

  #[test]
  fn absorb_drafts_a_strategy() {
    let text = "Here you go:\n```\nAcme Holdings|||BUY|||85|||Leader|||+5%|||Q3 report|||LONG\n```";
    let outcome = Strategy.absorb(&item("Acme"), text).unwrap();

    let EventKind::StrategyDrafted(s) = &outcome.events[0] else { panic!("{outcome:?}") };
    assert_eq!(s.company, "Acme");
    assert_eq!(s.action, Some(Action::Buy));
    assert_eq!(s.confidence, Some(85));
    assert_eq!(s.timeline, Some(Timeline::Long));
    assert_eq!(outcome.feed[0].1, "✓ Strategy for Acme: BUY (85% confidence)");
  }

  #[test]
  fn prompt_carries_analysis_and_risk() {
    let req = Strategy.request(&item("Acme"));
    assert!(req.prompt.contains("Acme|||81"));
    assert!(req.prompt.contains("COMPANY|||GREENWASH"));
    assert!(req.system.unwrap().contains("COMPANY|||ACTION|||CONFIDENCE"));
  }

  #[test]
  fn pending_only_while_the_risk_is_uncovered() {
    use greenorb_core::event::Event;
    use uuid::Uuid;

    let it = item("Acme");
    let mut p = Projection::new(500);
    assert!(!Strategy.is_pending(&it, &p));

    let event =
      |seq, kind| Event { seq, event_id: Uuid::new_v4(), recorded_at: chrono::Utc::now(), kind };
    p.apply(&event(1, EventKind::RiskAssessed(it.risk.clone())));
    assert!(Strategy.is_pending(&it, &p));
    assert_eq!(Strategy.backlog(&p).len(), 1);

    let drafted = record::Strategy { company: "ACME".into(), ..Default::default() };
    p.apply(&event(2, EventKind::StrategyDrafted(drafted)));
    assert!(!Strategy.is_pending(&it, &p));
    assert!(Strategy.backlog(&p).is_empty());
  }
}
