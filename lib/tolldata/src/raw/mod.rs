use std::borrow::Cow;
use anyhow::Context;
use crate::{Error, Result, Map};

pub trait FromRaw<T> where Self: Sized {
  fn from_raw(raw: T, id: Cow<str>) -> Result<Self>;
}

/// One data line of a CSV table. `line` is the 1-based line number in the source text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CsvRow {
  pub line: usize,
  pub fields: Vec<String>,
}

/// A tokenized CSV table: header names plus data rows.  Blank lines are dropped, field values
/// are trimmed.  No typing happens at this level.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct CsvTable {
  pub header: Vec<String>,
  pub rows: Vec<CsvRow>,
}

impl CsvTable {
  /// Map from header name to column index.
  pub fn columns(&self) -> Map<&str, usize> {
    self.header.iter().enumerate().map(|(k, name)| (name.as_str(), k)).collect()
  }

  /// Index of the column `name`, or [`Error::MissingColumn`].
  pub fn column(&self, name: &str) -> Result<usize> {
    self.header.iter()
      .position(|h| h == name)
      .ok_or(Error::MissingColumn)
      .with_context(|| format!("missing column `{}` (header: {:?})", name, &self.header))
  }

  /// Fails with [`Error::RaggedRow`] if any row does not have one field per header column.
  pub fn check_width(&self) -> Result<()> {
    let width = self.header.len();
    for row in &self.rows {
      if row.fields.len() != width {
        return Err(Error::RaggedRow)
          .with_context(|| format!("line {}: expected {} fields, found {}", row.line, width, row.fields.len()));
      }
    }
    Ok(())
  }
}

/// Parse a single field of `row`, attaching line/column context on failure.
pub fn parse_field<T>(row: &CsvRow, col: usize, name: &str) -> Result<T>
  where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
  let raw = &row.fields[col];
  match raw.parse::<T>() {
    Ok(v) => Ok(v),
    Err(e) => Err(Error::InvalidField)
      .with_context(|| format!("line {}: invalid value {:?} in column `{}`: {}", row.line, raw, name, e)),
  }
}
