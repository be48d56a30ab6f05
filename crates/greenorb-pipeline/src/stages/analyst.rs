//! Analyst: scores each discovered company.

use greenorb_core::{
  activity::ActivityLevel,
  event::EventKind,
  projection::Projection,
  record::{Company, Keyed as _},
  stage::StageKind,
};
use greenorb_llm::GenerationRequest;
use greenorb_wire::{ANALYST, SCOUT, company_line, parse_analyses};

use super::{label, one_line_instruction};
use crate::stage::{Outcome, Stage};

#[derive(Debug, Clone, Copy, Default)]
pub struct Analyst;

impl Stage for Analyst {
  type Item = Company;

  fn kind(&self) -> StageKind { StageKind::Analyst }

  fn backlog(&self, projection: &Projection) -> Vec<Company> {
    projection.analyst_backlog().into_iter().cloned().collect()
  }

  fn describe(&self, item: &Company) -> String { format!("Analyzing {}", item.name) }

  fn is_pending(&self, item: &Company, projection: &Projection) -> bool {
    let key = item.key();
    projection.company(&key).is_some() && !projection.analyses().contains(&key)
  }

  fn request(&self, item: &Company) -> GenerationRequest {
    let system = one_line_instruction(
      "an ESG analyst",
      &ANALYST,
      "SCORE, E_SCORE, S_SCORE and G_SCORE are integers from 0 to 100. TREND is UP, DOWN or \
       STABLE. PEER is top, middle or bottom within the sector. RECOMMENDATION is BUY, HOLD or \
       AVOID.",
    );
    GenerationRequest::new(format!(
      "Analyze the ESG performance of this company:\n{}\n{}",
      SCOUT.header(),
      company_line(item)
    ))
    .with_system(system)
  }

  fn absorb(&self, item: &Company, text: &str) -> Option<Outcome> {
    let mut analysis = parse_analyses(text).into_iter().next()?;
    // Keyed on the upstream record, whatever the model wrote.
    analysis.company = item.name.clone();

    let line = format!(
      "✓ Analyzed {}: score {} ({})",
      analysis.company,
      analysis.score.map_or_else(|| "?".to_owned(), |s| s.to_string()),
      label(analysis.recommendation),
    );
    Some(Outcome {
      events: vec![EventKind::Analyzed(analysis)],
      feed:   vec![(ActivityLevel::Success, line)],
    })
  }
}
