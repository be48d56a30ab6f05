//! Risk: assesses greenwashing and regulatory exposure for each analysis.

use greenorb_core::{
  activity::ActivityLevel,
  event::EventKind,
  projection::Projection,
  record::{Analysis, Company, Keyed as _, RiskLevel},
  stage::StageKind,
};
use greenorb_llm::GenerationRequest;
use greenorb_wire::{ANALYST, RISK, SCOUT, analysis_line, company_line, parse_risks};

use super::{label, one_line_instruction};
use crate::stage::{Outcome, Stage};

/// An analysis awaiting assessment, with the company it was made for when
/// that is still known.
#[derive(Debug, Clone)]
pub struct RiskItem {
  pub analysis: Analysis,
  pub company:  Option<Company>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Risk;

impl Stage for Risk {
  type Item = RiskItem;

  fn kind(&self) -> StageKind { StageKind::Risk }

  fn backlog(&self, projection: &Projection) -> Vec<RiskItem> {
    projection
      .risk_backlog()
      .into_iter()
      .map(|a| RiskItem {
        analysis: a.clone(),
        company:  projection.company(&a.key()).cloned(),
      })
      .collect()
  }

  fn describe(&self, item: &RiskItem) -> String {
    format!("Assessing risk for {}", item.analysis.company)
  }

  fn is_pending(&self, item: &RiskItem, projection: &Projection) -> bool {
    let key = item.analysis.key();
    projection.analysis(&key).is_some() && !projection.risks().contains(&key)
  }

  fn request(&self, item: &RiskItem) -> GenerationRequest {
    let system = one_line_instruction(
      "an ESG risk auditor looking for greenwashing",
      &RISK,
      "GREENWASH, REG_RISK and CLIMATE_EXP are LOW, MED or HIGH. DATA_QUALITY is GOOD, FAIR or \
       POOR. RED_FLAGS and COMPLIANCE are short phrases.",
    );
    let mut prompt = String::from("Assess the ESG risks of this company.\n");
    if let Some(company) = &item.company {
      prompt.push_str(&format!("Disclosed data:\n{}\n{}\n", SCOUT.header(), company_line(company)));
    }
    prompt.push_str(&format!(
      "Analyst view:\n{}\n{}",
      ANALYST.header(),
      analysis_line(&item.analysis)
    ));
    GenerationRequest::new(prompt).with_system(system)
  }

  fn absorb(&self, item: &RiskItem, text: &str) -> Option<Outcome> {
    let mut risk = parse_risks(text).into_iter().next()?;
    risk.company = item.analysis.company.clone();

    let line = format!(
      "✓ Risk for {}: greenwash {}, regulatory {}",
      risk.company,
      label(risk.greenwash),
      label(risk.reg_risk),
    );
    let level = if risk.greenwash == Some(RiskLevel::High) {
      ActivityLevel::Error
    } else {
      ActivityLevel::Success
    };
    Some(Outcome { events: vec![EventKind::RiskAssessed(risk)], feed: vec![(level, line)] })
  }
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, time::Duration};

  use chrono::Utc;
  use greenorb_core::{
    record::DataQuality,
    store::{EsgStore as _, materialize},
  };
  use greenorb_store_sqlite::SqliteStore;

  use super::*;
  use crate::{
    Controller, StageControl as _,
    stage::StageTimings,
    testing::{ScriptedGenerator, wait_for},
  };

  fn item(name: &str) -> RiskItem {
    RiskItem {
      analysis: Analysis { company: name.into(), score: Some(64), ..Default::default() },
      company:  None,
    }
  }

  #[test]
  fn absorb_keys_on_the_analysis() {
    let outcome = Risk
      .absorb(&item("Globex"), "globex inc|||medium|||LOW|||HIGH|||fair|||Offsets only|||CSRD")
      .unwrap();
    let EventKind::RiskAssessed(r) = &outcome.events[0] else { panic!("{outcome:?}") };
    assert_eq!(r.company, "Globex");
    assert_eq!(r.greenwash, Some(RiskLevel::Med));
    assert_eq!(r.climate_exp, Some(RiskLevel::High));
    assert_eq!(r.data_quality, Some(DataQuality::Fair));
    assert_eq!(outcome.feed[0], (
      ActivityLevel::Success,
      "✓ Risk for Globex: greenwash MED, regulatory LOW".to_owned()
    ));
  }

  #[test]
  fn high_greenwashing_is_flagged() {
    let outcome = Risk.absorb(&item("Acme"), "Acme|||HIGH|||HIGH|||HIGH|||POOR").unwrap();
    assert_eq!(outcome.feed[0].0, ActivityLevel::Error);
  }

  #[test]
  fn prompt_includes_upstream_records() {
    let mut it = item("Acme");
    let req = Risk.request(&it);
    assert!(req.prompt.contains("Acme|||64"));
    assert!(!req.prompt.contains("Disclosed data"));

    it.company = Some(Company::new("Acme", Utc::now()));
    assert!(Risk.request(&it).prompt.contains("Disclosed data"));
  }

  #[tokio::test]
  async fn risk_follows_the_analyses() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let now = Utc::now();
    store
      .append(vec![
        EventKind::Discovered(vec![Company::new("Acme", now), Company::new("Globex", now)]),
        EventKind::Analyzed(item("Acme").analysis),
      ])
      .await
      .unwrap();

    let generator = Arc::new(ScriptedGenerator::new("x|||LOW|||LOW|||LOW|||GOOD|||none|||ok"));
    let timings = StageTimings { delay: Duration::from_millis(5), poll: Duration::from_millis(20) };
    let ctl = Controller::new(Risk, store.clone(), generator.clone(), timings, 500);
    let mut rx = ctl.subscribe();

    ctl.start();
    wait_for(&mut rx, |s| s.processed == 1).await;
    // A later analysis is picked up on the next poll.
    store.append(vec![EventKind::Analyzed(item("Globex").analysis)]).await.unwrap();
    wait_for(&mut rx, |s| s.processed == 2).await;
    ctl.shutdown().await;

    let p = materialize(store.as_ref(), 500).await.unwrap();
    let names: Vec<_> = p.risks().iter().map(|r| r.company.clone()).collect();
    assert_eq!(names, ["Acme", "Globex"]);
    assert!(generator.prompts()[0].contains("Disclosed data"));
  }
}
