//! Record types: the four kinds of row the pipeline produces.
//!
//! Every record is flat and keyed by company name. Keys compare
//! case-insensitively; see [`NameKey`]. JSON field names follow the public
//! HTTP API (`co2`, `esg`, `e_score`, `reg_risk`, ...).

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// The case-insensitive identity of a company: trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameKey(String);

impl NameKey {
  pub fn new(name: &str) -> Self { Self(name.trim().to_lowercase()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<&str> for NameKey {
  fn from(name: &str) -> Self { Self::new(name) }
}

impl fmt::Display for NameKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Anything that is identified by a company name.
pub trait Keyed {
  fn name(&self) -> &str;

  fn key(&self) -> NameKey { NameKey::new(self.name()) }
}

/// Clamp an integer into the 0–100 score range.
pub fn clamp_score(value: i64) -> u8 { value.clamp(0, 100) as u8 }

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Upper-cases and strips everything but ASCII letters and digits, so that
/// `"Short-term"`, `"SHORT TERM"` and `"short_term"` compare equal.
fn normalize(raw: &str) -> String {
  raw
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_uppercase())
    .collect()
}

fn unknown(kind: &'static str, value: &str) -> Error {
  Error::UnknownVariant { kind, value: value.to_owned() }
}

/// Direction of a company's ESG trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
  Up,
  Down,
  Stable,
}

impl FromStr for Trend {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "UP" | "UPWARD" | "IMPROVING" | "RISING" => Ok(Self::Up),
      "DOWN" | "DOWNWARD" | "DECLINING" | "FALLING" => Ok(Self::Down),
      "STABLE" | "FLAT" | "NEUTRAL" => Ok(Self::Stable),
      _ => Err(unknown("trend", s)),
    }
  }
}

/// Where a company sits relative to its sector peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRank {
  Top,
  Middle,
  Bottom,
}

impl FromStr for PeerRank {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "TOP" | "LEADER" | "HIGH" => Ok(Self::Top),
      "MIDDLE" | "MID" | "AVERAGE" => Ok(Self::Middle),
      "BOTTOM" | "LAGGARD" | "LOW" => Ok(Self::Bottom),
      _ => Err(unknown("peer ranking", s)),
    }
  }
}

/// The Analyst stage's investment view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
  Buy,
  Hold,
  Avoid,
}

impl FromStr for Recommendation {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "BUY" => Ok(Self::Buy),
      "HOLD" => Ok(Self::Hold),
      "AVOID" | "SELL" => Ok(Self::Avoid),
      _ => Err(unknown("recommendation", s)),
    }
  }
}

/// Greenwashing, regulatory and climate-exposure levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
  Low,
  Med,
  High,
}

impl FromStr for RiskLevel {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "LOW" => Ok(Self::Low),
      "MED" | "MEDIUM" | "MODERATE" => Ok(Self::Med),
      "HIGH" => Ok(Self::High),
      _ => Err(unknown("risk level", s)),
    }
  }
}

/// How trustworthy the disclosed data looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataQuality {
  Good,
  Fair,
  Poor,
}

impl FromStr for DataQuality {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "GOOD" | "HIGH" => Ok(Self::Good),
      "FAIR" | "MEDIUM" | "MED" => Ok(Self::Fair),
      "POOR" | "LOW" => Ok(Self::Poor),
      _ => Err(unknown("data quality", s)),
    }
  }
}

/// The Strategy stage's trade action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
  Buy,
  Hold,
  Sell,
  Avoid,
}

impl FromStr for Action {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "BUY" => Ok(Self::Buy),
      "HOLD" => Ok(Self::Hold),
      "SELL" => Ok(Self::Sell),
      "AVOID" => Ok(Self::Avoid),
      _ => Err(unknown("action", s)),
    }
  }
}

/// Horizon over which a strategy is expected to play out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeline {
  Short,
  Med,
  Long,
}

impl FromStr for Timeline {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match normalize(s).as_str() {
      "SHORT" | "SHORTTERM" => Ok(Self::Short),
      "MED" | "MEDIUM" | "MEDIUMTERM" | "MID" | "MIDTERM" => Ok(Self::Med),
      "LONG" | "LONGTERM" => Ok(Self::Long),
      _ => Err(unknown("timeline", s)),
    }
  }
}

// ─── Company ─────────────────────────────────────────────────────────────────

/// Scope 1/2/3 emission breakdown, in the same unit as the headline figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scopes {
  pub s1: Option<f64>,
  pub s2: Option<f64>,
  pub s3: Option<f64>,
}

/// A discovered company. Produced by the Scout stage or `POST /api/scout`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
  pub name:          String,
  pub sector:        Option<String>,
  pub country:       Option<String>,
  /// Annual CO2 estimate in megatonnes.
  #[serde(rename = "co2")]
  pub co2_mt:        Option<f64>,
  /// ESG letter grade, e.g. `"B+"`.
  #[serde(rename = "esg", alias = "grade")]
  pub grade:         Option<String>,
  pub url:           Option<String>,
  pub products:      Option<String>,
  pub methodology:   Option<String>,
  #[serde(flatten)]
  pub scopes:        Scopes,
  pub report_year:   Option<i32>,
  /// When the company entered the store.
  #[serde(rename = "ts")]
  pub discovered_at: DateTime<Utc>,
}

impl Company {
  /// Convenience constructor with every optional field empty.
  pub fn new(name: impl Into<String>, discovered_at: DateTime<Utc>) -> Self {
    Self {
      name: name.into(),
      sector: None,
      country: None,
      co2_mt: None,
      grade: None,
      url: None,
      products: None,
      methodology: None,
      scopes: Scopes::default(),
      report_year: None,
      discovered_at,
    }
  }
}

impl Keyed for Company {
  fn name(&self) -> &str { &self.name }
}

// ─── Analysis ────────────────────────────────────────────────────────────────

/// The Analyst stage's scoring of one company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
  pub company:        String,
  /// Overall score, 0–100.
  pub score:          Option<u8>,
  pub e_score:        Option<u8>,
  pub s_score:        Option<u8>,
  pub g_score:        Option<u8>,
  pub trend:          Option<Trend>,
  pub peer:           Option<PeerRank>,
  pub strengths:      Option<String>,
  pub weaknesses:     Option<String>,
  pub recommendation: Option<Recommendation>,
}

impl Keyed for Analysis {
  fn name(&self) -> &str { &self.company }
}

// ─── Risk ────────────────────────────────────────────────────────────────────

/// The Risk stage's assessment of one company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
  pub company:      String,
  pub greenwash:    Option<RiskLevel>,
  pub reg_risk:     Option<RiskLevel>,
  pub climate_exp:  Option<RiskLevel>,
  pub data_quality: Option<DataQuality>,
  pub red_flags:    Option<String>,
  pub compliance:   Option<String>,
}

impl Keyed for Risk {
  fn name(&self) -> &str { &self.company }
}

// ─── Strategy ────────────────────────────────────────────────────────────────

/// The Strategy stage's recommendation for one company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
  pub company:      String,
  pub action:       Option<Action>,
  /// 0–100.
  pub confidence:   Option<u8>,
  pub rationale:    Option<String>,
  pub price_impact: Option<String>,
  pub catalyst:     Option<String>,
  pub timeline:     Option<Timeline>,
}

impl Keyed for Strategy {
  fn name(&self) -> &str { &self.company }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Any one of the four record types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Record {
  Company(Company),
  Analysis(Analysis),
  Risk(Risk),
  Strategy(Strategy),
}

impl Keyed for Record {
  fn name(&self) -> &str {
    match self {
      Self::Company(c) => c.name(),
      Self::Analysis(a) => a.name(),
      Self::Risk(r) => r.name(),
      Self::Strategy(s) => s.name(),
    }
  }
}
