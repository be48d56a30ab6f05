//! Line splitter.
//!
//! Pipeline:
//!   raw &str
//!     └─ lines containing the sentinel
//!          └─ strip_decoration()  → bare record text
//!               └─ split_fields() → Vec<String> (escape-aware)
//!                    └─ field-count gate → Row

use crate::{
  Row,
  error::{Error, Result},
  schema::Schema,
};

/// The field separator.
pub const SENTINEL: &str = "|||";

/// Parse every record line in `text` against `schema`.
///
/// Lines without the sentinel are ignored; lines with fewer than
/// `schema.min_fields` fields are dropped whole. Order is preserved.
pub fn parse(text: &str, schema: &'static Schema) -> Vec<Row> {
  text
    .lines()
    .filter(|line| line.contains(SENTINEL))
    .filter_map(|line| parse_line(line, schema).ok())
    .collect()
}

/// Parse one line, reporting why it was rejected.
pub fn parse_line(line: &str, schema: &'static Schema) -> Result<Row> {
  let bare = strip_decoration(line);
  if !bare.contains(SENTINEL) {
    return Err(Error::NoSentinel);
  }
  let values = split_fields(bare);
  if values.len() < schema.min_fields {
    return Err(Error::TooFewFields {
      schema:   schema.name,
      expected: schema.min_fields,
      found:    values.len(),
    });
  }
  Ok(Row { schema, values })
}

// ─── Low-level helpers ───────────────────────────────────────────────────────

/// Remove the decoration models like to add around record lines: code
/// fences and backticks, list bullets, and `1.` / `1)` numbering.
fn strip_decoration(line: &str) -> &str {
  let mut s = line.trim().trim_matches('`').trim();
  for bullet in ["- ", "* ", "• "] {
    if let Some(rest) = s.strip_prefix(bullet) {
      s = rest.trim_start();
      break;
    }
  }
  let digits = s.bytes().take_while(u8::is_ascii_digit).count();
  if digits > 0
    && let Some(rest) = s[digits..].strip_prefix(". ").or_else(|| s[digits..].strip_prefix(") "))
  {
    s = rest.trim_start();
  }
  s
}

/// Split on the sentinel, honouring backslash escapes, and trim each field.
pub(crate) fn split_fields(line: &str) -> Vec<String> {
  let mut fields = Vec::new();
  let mut current = String::new();
  let mut rest = line;

  loop {
    if let Some(after) = rest.strip_prefix(SENTINEL) {
      fields.push(std::mem::take(&mut current));
      rest = after;
      continue;
    }
    let mut chars = rest.chars();
    match chars.next() {
      None => break,
      Some('\\') => match chars.next() {
        Some(escaped) => current.push(escaped),
        // A trailing lone backslash is kept literally.
        None => current.push('\\'),
      },
      Some(c) => current.push(c),
    }
    rest = chars.as_str();
  }
  fields.push(current);

  fields.into_iter().map(|f| f.trim().to_owned()).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{RISK, SCOUT, STRATEGY};

  #[test]
  fn lines_without_the_sentinel_are_ignored() {
    let text = "Here are the companies:\nAcme|||Energy|||USA|||1\n\nThat is all.";
    assert_eq!(parse(text, &SCOUT).len(), 1);
  }

  #[test]
  fn short_lines_are_dropped_not_partially_parsed() {
    let text = "Acme|||Energy|||USA\nGlobex|||Energy|||USA|||2";
    let rows = parse(text, &SCOUT);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some("Globex"));

    let err = parse_line("Acme|||Energy|||USA", &SCOUT).unwrap_err();
    assert!(matches!(err, Error::TooFewFields { expected: 4, found: 3, .. }));
  }

  #[test]
  fn order_of_appearance_is_preserved() {
    let text = "C|||BUY|||70|||r\nA|||HOLD|||50|||r\nB|||SELL|||30|||r";
    let names: Vec<_> = parse(text, &STRATEGY)
      .iter()
      .map(|r| r.get("company").unwrap().to_owned())
      .collect();
    assert_eq!(names, ["C", "A", "B"]);
  }

  #[test]
  fn empty_input_yields_nothing() {
    assert!(parse("", &RISK).is_empty());
    assert!(parse("no records here", &RISK).is_empty());
  }

  #[test]
  fn fields_are_trimmed_and_extras_kept_raw() {
    let rows = parse("  Acme |||  Energy|||USA |||1|||B|||u|||p|||m|||1/2/3|||extra ", &SCOUT);
    let row = &rows[0];
    assert_eq!(row.get("name"), Some("Acme"));
    assert_eq!(row.get("sector"), Some("Energy"));
    assert_eq!(row.values().len(), 10);
    assert_eq!(row.values()[9], "extra");
  }

  #[test]
  fn list_decoration_is_stripped() {
    for line in [
      "- Acme|||Energy|||USA|||1",
      "* Acme|||Energy|||USA|||1",
      "3. Acme|||Energy|||USA|||1",
      "`Acme|||Energy|||USA|||1`",
    ] {
      let row = parse_line(line, &SCOUT).unwrap();
      assert_eq!(row.get("name"), Some("Acme"), "{line}");
    }
    // A name that merely starts with digits is left alone.
    let row = parse_line("3M|||Industrials|||USA|||9", &SCOUT).unwrap();
    assert_eq!(row.get("name"), Some("3M"));
  }

  #[test]
  fn escaped_pipes_stay_inside_a_field() {
    let fields = split_fields(r"Acme\|\|\|Beta|||Energy|||a\\b");
    assert_eq!(fields, ["Acme|||Beta", "Energy", r"a\b"]);
  }

  #[test]
  fn unescaped_text_splits_on_every_sentinel() {
    assert_eq!(split_fields("a||||b"), ["a", "|b"]);
    assert_eq!(split_fields("a|||"), ["a", ""]);
  }
}
