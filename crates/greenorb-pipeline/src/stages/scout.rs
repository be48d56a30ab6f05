//! Scout: discovers companies, one sector query at a time.

use chrono::Utc;
use greenorb_core::{
  activity::ActivityLevel, event::EventKind, projection::Projection, stage::StageKind,
};
use greenorb_llm::GenerationRequest;
use greenorb_wire::{SCOUT, parse_companies};

use crate::stage::{Outcome, Stage};

/// The sector/region searches Scout cycles through.
pub const SECTOR_QUERIES: [&str; 10] = [
  "Technology companies Asia ESG carbon report 2024",
  "European manufacturing ESG carbon reports 2024",
  "Indian MSME sustainability carbon footprint",
  "African energy companies carbon emissions",
  "South American food agriculture ESG report",
  "Middle East petrochemical sustainability 2024",
  "Global fashion brands ESG carbon footprint 2024",
  "Healthcare companies carbon footprint ESG",
  "Mining companies sustainability report 2024",
  "Global logistics shipping carbon emissions 2024",
];

/// Sample companies echoed to the feed after each search.
const FEED_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorQuery {
  pub index: usize,
  pub query: &'static str,
}

impl SectorQuery {
  fn at(index: usize) -> Self {
    let index = index % SECTOR_QUERIES.len();
    Self { index, query: SECTOR_QUERIES[index] }
  }

  fn advance(self) -> EventKind {
    EventKind::SectorAdvanced { index: (self.index + 1) % SECTOR_QUERIES.len() }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scout;

impl Stage for Scout {
  type Item = SectorQuery;

  fn kind(&self) -> StageKind { StageKind::Scout }

  /// Always exactly one item: the query under the cursor.
  fn backlog(&self, projection: &Projection) -> Vec<SectorQuery> {
    vec![SectorQuery::at(projection.sector_index())]
  }

  fn describe(&self, item: &SectorQuery) -> String { format!("Searching: \"{}\"", item.query) }

  fn request(&self, item: &SectorQuery) -> GenerationRequest {
    let system = format!(
      "You are an ESG data extraction agent. Search for companies in the given sector/region \
       and extract their carbon emissions data and ESG report URLs. For each company found, \
       output one line in this EXACT format:\n\
       {header}\n\
       CO2 is the estimated annual emissions in Mt. SCOPE is scope1/scope2/scope3 in Mt. \
       Extract at least 8-12 companies. Only output these pipe-delimited lines, nothing else. \
       No headers, no markdown.",
      header = SCOUT.header(),
    );
    GenerationRequest::new(format!(
      "Search for ESG reports and carbon emissions data for: {}. Extract company names, CO2 \
       emissions (in Mt), ESG grades, and report URLs.",
      item.query
    ))
    .with_system(system)
  }

  fn streaming(&self) -> bool { true }

  fn absorb(&self, item: &SectorQuery, text: &str) -> Option<Outcome> {
    let companies = parse_companies(text, Utc::now());
    if companies.is_empty() {
      return None;
    }

    let mut feed = vec![(
      ActivityLevel::Success,
      format!("✓ Found {} companies with ESG data", companies.len()),
    )];
    feed.extend(companies.iter().take(FEED_SAMPLES).map(|c| {
      let country = c.country.as_deref().unwrap_or("—");
      let co2 = c.co2_mt.map_or_else(|| "?".to_owned(), |n| n.to_string());
      (ActivityLevel::Data, format!("📊 {} ({country}): {co2} Mt CO₂", c.name))
    }));

    Some(Outcome { events: vec![EventKind::Discovered(companies), item.advance()], feed })
  }

  /// A failed search still moves on to the next sector.
  fn on_failure(&self, item: &SectorQuery) -> Vec<EventKind> { vec![item.advance()] }
}
