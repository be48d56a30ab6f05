//! The four concrete stages.

mod analyst;
mod risk;
mod scout;
mod strategy;

pub use analyst::Analyst;
pub use risk::{Risk, RiskItem};
pub use scout::{SECTOR_QUERIES, Scout, SectorQuery};
pub use strategy::{Strategy, StrategyItem};

use greenorb_wire::Schema;

/// The system instruction shared by the per-company stages: one line, in
/// `schema`'s field order, nothing else.
fn one_line_instruction(role: &str, schema: &Schema, rules: &str) -> String {
  format!(
    "You are {role}. For the company given, output exactly one line in this EXACT format:\n\
     {header}\n\
     {rules}\n\
     Keep the company name exactly as given. Only output that pipe-delimited line, nothing \
     else. No headers, no markdown.",
    header = schema.header(),
  )
}

/// `Some(Action::Buy)` → `"BUY"`, `None` → `"?"`, for feed lines.
fn label<T: std::fmt::Debug>(value: Option<T>) -> String {
  value.map_or_else(|| "?".to_owned(), |v| format!("{v:?}").to_uppercase())
}
