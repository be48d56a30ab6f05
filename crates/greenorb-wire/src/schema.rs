//! Per-stage field layouts.

use crate::serialize::format_line;

/// The positional layout of one stage's records.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
  pub name:       &'static str,
  /// Field names in wire order.
  pub fields:     &'static [&'static str],
  /// Lines with fewer fields than this are dropped whole.
  pub min_fields: usize,
}

impl Schema {
  pub fn index_of(&self, field: &str) -> Option<usize> {
    self.fields.iter().position(|f| *f == field)
  }

  /// The upper-cased field names joined by the sentinel, for prompts:
  /// `NAME|||SECTOR|||...`.
  pub fn header(&self) -> String {
    let upper: Vec<String> = self.fields.iter().map(|f| f.to_ascii_uppercase()).collect();
    format_line(upper.iter().map(|f| Some(f.as_str())))
  }
}

/// `name|||sector|||country|||co2|||grade|||url|||products|||methodology|||scope`
///
/// `co2` is in megatonnes; `scope` is `s1/s2/s3`.
pub static SCOUT: Schema = Schema {
  name:       "scout",
  fields:     &[
    "name",
    "sector",
    "country",
    "co2",
    "grade",
    "url",
    "products",
    "methodology",
    "scope",
  ],
  min_fields: 4,
};

pub static ANALYST: Schema = Schema {
  name:       "analyst",
  fields:     &[
    "company",
    "score",
    "e_score",
    "s_score",
    "g_score",
    "trend",
    "peer",
    "strengths",
    "weaknesses",
    "recommendation",
  ],
  min_fields: 5,
};

pub static RISK: Schema = Schema {
  name:       "risk",
  fields:     &[
    "company",
    "greenwash",
    "reg_risk",
    "climate_exp",
    "data_quality",
    "red_flags",
    "compliance",
  ],
  min_fields: 5,
};

pub static STRATEGY: Schema = Schema {
  name:       "strategy",
  fields:     &[
    "company",
    "action",
    "confidence",
    "rationale",
    "price_impact",
    "catalyst",
    "timeline",
  ],
  min_fields: 4,
};
