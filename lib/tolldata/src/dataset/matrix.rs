use super::*;
use std::fmt::Display;
use std::str::FromStr;
use crate::raw::{CsvTable, FromRaw, parse_field};

/// A distance table as read from disk.  Cells are `None` where the table was empty.  Squareness is
/// not checked here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMatrix<L> {
  pub id: String,
  pub columns: Vec<L>,
  pub rows: Vec<(L, Vec<Option<f64>>)>,
}

impl<L> FromRaw<CsvTable> for RawMatrix<L>
  where
    L: FromStr,
    L::Err: Display,
{
  fn from_raw(raw: CsvTable, id: Cow<str>) -> Result<RawMatrix<L>> {
    raw.check_width()?;
    let columns: Result<Vec<L>> = raw.header.iter()
      .skip(1)
      .map(|name| name.parse::<L>()
        .map_err(|e| anyhow::anyhow!("invalid column id {:?}: {}", name, e)))
      .collect();

    let rows: Result<Vec<_>> = raw.rows.iter()
      .map(|row| {
        let loc: L = parse_field(row, 0, "row id")?;
        let cells: Result<Vec<Option<f64>>> = (1..row.fields.len())
          .map(|k| {
            if row.fields[k].is_empty() {
              Ok(None)
            } else {
              parse_field(row, k, &raw.header[k]).map(Some)
            }
          })
          .collect();
        Ok((loc, cells?))
      })
      .collect();

    Ok(RawMatrix { id: id.into_owned(), columns: columns?, rows: rows? })
  }
}
