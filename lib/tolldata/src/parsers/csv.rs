use std::borrow::Cow;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use anyhow::Context;
use ::csv::{ReaderBuilder, StringRecord, Trim};
use crate::{Error, Result};
use crate::raw::{CsvRow, CsvTable, FromRaw};
use crate::dataset::{edges::EdgeList, trips::TripList, matrix::RawMatrix};
use super::ParseInstance;

/// Dataset A: `id_start,id_end,distance`
#[derive(Debug, Copy, Clone)]
pub struct EdgeCsvFmt<P>(pub P);

/// Dataset B: `id,id_2,startDay,startTime,endDay,endTime`
#[derive(Debug, Copy, Clone)]
pub struct TripCsvFmt<P>(pub P);

/// A square distance table with row ids in the first column and column ids in the header.
#[derive(Debug, Copy, Clone)]
pub struct MatrixCsvFmt<P>(pub P);

fn fields(record: &StringRecord) -> Vec<String> {
  record.iter().map(String::from).collect()
}

/// Every record must have as many fields as the header.
fn ragged_row(err: ::csv::Error) -> anyhow::Error {
  match err.kind() {
    ::csv::ErrorKind::UnequalLengths { pos, expected_len, len } => {
      let line = pos.as_ref().map_or(0, |p| p.line());
      anyhow::Error::new(Error::RaggedRow)
        .context(format!("line {}: expected {} fields, found {}", line, expected_len, len))
    }
    _ => err.into(),
  }
}

/// Tokenize CSV text into a [`CsvTable`].  The first record is the header; quoted fields may
/// contain separators, blank lines are skipped and fields are trimmed.
pub fn parse_csv(data: &str) -> Result<CsvTable> {
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .trim(Trim::All)
    .flexible(false)
    .from_reader(data.as_bytes());

  let header = fields(reader.headers()?);
  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record.map_err(ragged_row)?;
    let line = record.position().map_or(0, |p| p.line() as usize);
    rows.push(CsvRow { line, fields: fields(&record) });
  }
  Ok(CsvTable { header, rows })
}

fn read_table(path: &Path) -> Result<(CsvTable, Cow<str>)> {
  let data = std::fs::read_to_string(path).with_context(|| format!("failed to read {:?}", path))?;
  let table = parse_csv(&data).with_context(|| format!("failed to tokenize {:?}", path))?;
  let id = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or(Cow::Borrowed(""));
  Ok((table, id))
}

impl<P, L> ParseInstance<EdgeCsvFmt<P>> for EdgeList<L>
  where
    P: AsRef<Path>,
    L: FromStr,
    L::Err: Display,
{
  fn parse(path: EdgeCsvFmt<P>) -> Result<EdgeList<L>> {
    let path = path.0.as_ref();
    let (table, id) = read_table(path)?;
    EdgeList::from_raw(table, id).with_context(|| format!("failed to load {:?}", path))
  }
}

impl<P, L> ParseInstance<TripCsvFmt<P>> for TripList<L>
  where
    P: AsRef<Path>,
    L: FromStr,
    L::Err: Display,
{
  fn parse(path: TripCsvFmt<P>) -> Result<TripList<L>> {
    let path = path.0.as_ref();
    let (table, id) = read_table(path)?;
    TripList::from_raw(table, id).with_context(|| format!("failed to load {:?}", path))
  }
}

impl<P, L> ParseInstance<MatrixCsvFmt<P>> for RawMatrix<L>
  where
    P: AsRef<Path>,
    L: FromStr,
    L::Err: Display,
{
  fn parse(path: MatrixCsvFmt<P>) -> Result<RawMatrix<L>> {
    let path = path.0.as_ref();
    let (table, id) = read_table(path)?;
    RawMatrix::from_raw(table, id).with_context(|| format!("failed to load {:?}", path))
  }
}
