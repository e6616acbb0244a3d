use super::*;
use std::fmt::Display;
use std::str::FromStr;
use crate::parsers::{ParseInstance, EdgeCsvFmt};
use crate::raw::{CsvTable, FromRaw, parse_field};
use crate::LocId;

pub type Distance = f64;

/// A directly observed, bidirectional distance between two locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<L> {
  pub origin: L,
  pub destination: L,
  pub distance: Distance,
}

impl<L> Edge<L> {
  pub fn new(origin: impl Into<L>, destination: impl Into<L>, distance: Distance) -> Self {
    Edge { origin: origin.into(), destination: destination.into(), distance }
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeList<L> {
  pub id: String,
  pub edges: Vec<Edge<L>>,
}

impl<L> FromRaw<CsvTable> for EdgeList<L>
  where
    L: FromStr,
    L::Err: Display,
{
  fn from_raw(raw: CsvTable, id: Cow<str>) -> Result<EdgeList<L>> {
    let c_start = raw.column("id_start")?;
    let c_end = raw.column("id_end")?;
    let c_dist = raw.column("distance")?;
    raw.check_width()?;

    let edges: Result<Vec<_>> = raw.rows.iter()
      .map(|row| Ok(Edge {
        origin: parse_field(row, c_start, "id_start")?,
        destination: parse_field(row, c_end, "id_end")?,
        distance: parse_field(row, c_dist, "distance")?,
      }))
      .collect();

    Ok(EdgeList { id: id.into_owned(), edges: edges? })
  }
}

pub enum EdgeCsv {}

impl Dataset for StdLayout<EdgeCsv> {
  type Instance = EdgeList<LocId>;

  fn load_instance(&self, idx: usize) -> Result<Self::Instance> {
    let path = self.table_path(idx)?;
    EdgeList::parse(EdgeCsvFmt(&path))
  }
}
