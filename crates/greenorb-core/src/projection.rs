//! The materialised read model: every record currently in the store,
//! computed by folding the event log. Never stored, always derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  accumulator::Accumulator,
  event::{Event, EventKind},
  record::{
    Action, Analysis, Company, DataQuality, Keyed, NameKey, PeerRank, Recommendation, Record,
    Risk, RiskLevel, Strategy, Timeline, Trend,
  },
};

// ─── Backlog ─────────────────────────────────────────────────────────────────

/// Upstream records, in collection order, that have no downstream record
/// with the same key.
///
/// With N upstream records of which M already have downstream output, the
/// result has exactly N − M entries.
pub fn backlog<'a, U: Keyed, D: Keyed>(
  upstream: &'a Accumulator<U>,
  downstream: &Accumulator<D>,
) -> Vec<&'a U> {
  upstream.iter().filter(|u| !downstream.contains(&u.key())).collect()
}

// ─── Projection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Projection {
  companies:    Accumulator<Company>,
  analyses:     Accumulator<Analysis>,
  risks:        Accumulator<Risk>,
  strategies:   Accumulator<Strategy>,
  sector_index: usize,
  last_seq:     u64,
}

impl Projection {
  /// An empty projection whose collections each hold at most `cap` records.
  pub fn new(cap: usize) -> Self {
    Self {
      companies:    Accumulator::new(cap),
      analyses:     Accumulator::new(cap),
      risks:        Accumulator::new(cap),
      strategies:   Accumulator::new(cap),
      sector_index: 0,
      last_seq:     0,
    }
  }

  /// Fold `events` (in `seq` order) into a fresh projection.
  pub fn replay<'a>(cap: usize, events: impl IntoIterator<Item = &'a Event>) -> Self {
    let mut projection = Self::new(cap);
    for event in events {
      projection.apply(event);
    }
    projection
  }

  /// Apply one event. Events at or below [`Self::last_seq`] were already
  /// folded in and are skipped, so overlapping reads are harmless.
  pub fn apply(&mut self, event: &Event) {
    if event.seq != 0 && event.seq <= self.last_seq {
      return;
    }
    match &event.kind {
      EventKind::Discovered(batch) => {
        self.companies.merge(batch.iter().cloned());
      }
      EventKind::Analyzed(a) => {
        self.analyses.merge([a.clone()]);
      }
      EventKind::RiskAssessed(r) => {
        self.risks.merge([r.clone()]);
      }
      EventKind::StrategyDrafted(s) => {
        self.strategies.merge([s.clone()]);
      }
      EventKind::Upserted(record) => match record {
        Record::Company(c) => {
          self.companies.upsert(c.clone());
        }
        Record::Analysis(a) => {
          self.analyses.upsert(a.clone());
        }
        Record::Risk(r) => {
          self.risks.upsert(r.clone());
        }
        Record::Strategy(s) => {
          self.strategies.upsert(s.clone());
        }
      },
      EventKind::SectorAdvanced { index } => self.sector_index = *index,
      EventKind::Cleared => {
        self.companies.clear();
        self.analyses.clear();
        self.risks.clear();
        self.strategies.clear();
      }
    }
    self.last_seq = self.last_seq.max(event.seq);
  }

  // ── Accessors ─────────────────────────────────────────────────────────────

  pub fn last_seq(&self) -> u64 { self.last_seq }

  pub fn sector_index(&self) -> usize { self.sector_index }

  pub fn companies(&self) -> &Accumulator<Company> { &self.companies }

  pub fn analyses(&self) -> &Accumulator<Analysis> { &self.analyses }

  pub fn risks(&self) -> &Accumulator<Risk> { &self.risks }

  pub fn strategies(&self) -> &Accumulator<Strategy> { &self.strategies }

  pub fn company(&self, key: &NameKey) -> Option<&Company> { self.companies.get(key) }

  pub fn analysis(&self, key: &NameKey) -> Option<&Analysis> { self.analyses.get(key) }

  pub fn risk(&self, key: &NameKey) -> Option<&Risk> { self.risks.get(key) }

  // ── Backlogs ──────────────────────────────────────────────────────────────

  /// Companies the Analyst stage has not scored yet.
  pub fn analyst_backlog(&self) -> Vec<&Company> { backlog(&self.companies, &self.analyses) }

  /// Analysed companies the Risk stage has not assessed yet.
  pub fn risk_backlog(&self) -> Vec<&Analysis> { backlog(&self.analyses, &self.risks) }

  /// Risk-assessed companies the Strategy stage has not covered yet.
  pub fn strategy_backlog(&self) -> Vec<&Risk> { backlog(&self.risks, &self.strategies) }

  // ── Joined view ───────────────────────────────────────────────────────────

  /// Every company left-joined with its analysis, risk and strategy,
  /// newest discovery first.
  pub fn data_rows(&self) -> Vec<DataRow> {
    let mut rows: Vec<DataRow> = self
      .companies
      .iter()
      .map(|c| {
        let key = c.key();
        DataRow::join(
          c,
          self.analyses.get(&key),
          self.risks.get(&key),
          self.strategies.get(&key),
        )
      })
      .collect();
    rows.sort_by(|a, b| b.company.discovered_at.cmp(&a.company.discovered_at));
    rows
  }
}

// ─── DataRow ─────────────────────────────────────────────────────────────────

/// One flat row of `GET /api/data`: company columns followed by the
/// (nullable) columns of the three downstream records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
  #[serde(flatten)]
  pub company:        Company,
  // analysis
  pub score:          Option<u8>,
  pub e_score:        Option<u8>,
  pub s_score:        Option<u8>,
  pub g_score:        Option<u8>,
  pub trend:          Option<Trend>,
  pub peer:           Option<PeerRank>,
  pub strengths:      Option<String>,
  pub weaknesses:     Option<String>,
  pub recommendation: Option<Recommendation>,
  // risk
  pub greenwash:      Option<RiskLevel>,
  pub reg_risk:       Option<RiskLevel>,
  pub climate_exp:    Option<RiskLevel>,
  pub data_quality:   Option<DataQuality>,
  pub red_flags:      Option<String>,
  pub compliance:     Option<String>,
  // strategy
  pub action:         Option<Action>,
  pub confidence:     Option<u8>,
  pub rationale:      Option<String>,
  pub price_impact:   Option<String>,
  pub catalyst:       Option<String>,
  pub timeline:       Option<Timeline>,
}

impl DataRow {
  pub fn join(
    company: &Company,
    analysis: Option<&Analysis>,
    risk: Option<&Risk>,
    strategy: Option<&Strategy>,
  ) -> Self {
    Self {
      company:        company.clone(),
      score:          analysis.and_then(|a| a.score),
      e_score:        analysis.and_then(|a| a.e_score),
      s_score:        analysis.and_then(|a| a.s_score),
      g_score:        analysis.and_then(|a| a.g_score),
      trend:          analysis.and_then(|a| a.trend),
      peer:           analysis.and_then(|a| a.peer),
      strengths:      analysis.and_then(|a| a.strengths.clone()),
      weaknesses:     analysis.and_then(|a| a.weaknesses.clone()),
      recommendation: analysis.and_then(|a| a.recommendation),
      greenwash:      risk.and_then(|r| r.greenwash),
      reg_risk:       risk.and_then(|r| r.reg_risk),
      climate_exp:    risk.and_then(|r| r.climate_exp),
      data_quality:   risk.and_then(|r| r.data_quality),
      red_flags:      risk.and_then(|r| r.red_flags.clone()),
      compliance:     risk.and_then(|r| r.compliance.clone()),
      action:         strategy.and_then(|s| s.action),
      confidence:     strategy.and_then(|s| s.confidence),
      rationale:      strategy.and_then(|s| s.rationale.clone()),
      price_impact:   strategy.and_then(|s| s.price_impact.clone()),
      catalyst:       strategy.and_then(|s| s.catalyst.clone()),
      timeline:       strategy.and_then(|s| s.timeline),
    }
  }

  pub fn discovered_at(&self) -> DateTime<Utc> { self.company.discovered_at }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use uuid::Uuid;

  use super::*;

  fn event(seq: u64, kind: EventKind) -> Event {
    Event { seq, event_id: Uuid::new_v4(), recorded_at: Utc::now(), kind }
  }

  fn company(name: &str, secs: i64) -> Company {
    Company::new(name, Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap())
  }

  fn analysis(name: &str) -> Analysis {
    Analysis { company: name.into(), score: Some(60), ..Default::default() }
  }

  #[test]
  fn backlog_has_n_minus_m_entries() {
    let events = vec![
      event(1, EventKind::Discovered(vec![
        company("A", 0),
        company("B", 1),
        company("C", 2),
        company("D", 3),
        company("E", 4),
      ])),
      event(2, EventKind::Analyzed(analysis("b"))),
      event(3, EventKind::Analyzed(analysis("D"))),
    ];
    let p = Projection::replay(100, &events);

    let pending: Vec<&str> = p.analyst_backlog().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(pending, ["A", "C", "E"]);
  }

  #[test]
  fn stage_backlogs_chain_through_upstream_outputs() {
    let events = vec![
      event(1, EventKind::Discovered(vec![company("A", 0), company("B", 1)])),
      event(2, EventKind::Analyzed(analysis("A"))),
      event(3, EventKind::RiskAssessed(Risk { company: "A".into(), ..Default::default() })),
    ];
    let p = Projection::replay(100, &events);

    assert_eq!(p.analyst_backlog().len(), 1);
    assert!(p.risk_backlog().is_empty());
    assert_eq!(p.strategy_backlog().len(), 1);
  }

  #[test]
  fn stage_output_keeps_first_writer_but_upsert_replaces() {
    let mut second = analysis("A");
    second.score = Some(10);
    let mut upserted = analysis("A");
    upserted.score = Some(99);

    let mut p = Projection::replay(100, &[
      event(1, EventKind::Analyzed(analysis("A"))),
      event(2, EventKind::Analyzed(second)),
    ]);
    assert_eq!(p.analysis(&NameKey::new("a")).unwrap().score, Some(60));

    p.apply(&event(3, EventKind::Upserted(Record::Analysis(upserted))));
    assert_eq!(p.analysis(&NameKey::new("a")).unwrap().score, Some(99));
    assert_eq!(p.analyses().len(), 1);
  }

  #[test]
  fn already_applied_events_are_skipped() {
    let e = event(1, EventKind::Discovered(vec![company("A", 0)]));
    let mut p = Projection::new(100);
    p.apply(&e);
    p.apply(&event(2, EventKind::Cleared));
    p.apply(&e);
    assert!(p.companies().is_empty());
    assert_eq!(p.last_seq(), 2);
  }

  #[test]
  fn cleared_keeps_the_sector_cursor() {
    let p = Projection::replay(100, &[
      event(1, EventKind::Discovered(vec![company("A", 0)])),
      event(2, EventKind::SectorAdvanced { index: 4 }),
      event(3, EventKind::Cleared),
    ]);
    assert!(p.companies().is_empty());
    assert_eq!(p.sector_index(), 4);
  }

  #[test]
  fn data_rows_are_joined_and_newest_first() {
    let p = Projection::replay(100, &[
      event(1, EventKind::Discovered(vec![company("Old", 0), company("New", 60)])),
      event(2, EventKind::Analyzed(analysis("old"))),
      event(3, EventKind::StrategyDrafted(Strategy {
        company: "NEW".into(),
        confidence: Some(80),
        ..Default::default()
      })),
    ]);

    let rows = p.data_rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].company.name, "New");
    assert_eq!(rows[0].confidence, Some(80));
    assert_eq!(rows[0].score, None);
    assert_eq!(rows[1].score, Some(60));
    assert!(rows[0].discovered_at() - rows[1].discovered_at() == Duration::seconds(60));

    let json = serde_json::to_value(&rows[1]).unwrap();
    assert_eq!(json["name"], "Old");
    assert_eq!(json["score"], 60);
    assert!(json["action"].is_null());
  }
}
