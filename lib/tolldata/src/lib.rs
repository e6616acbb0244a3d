pub use anyhow::Result;

use std::fmt;
use fnv::FnvHashMap as Map;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Error {
  UnknownTableName,
  IndexOutOfRange,
  MissingColumn,
  RaggedRow,
  InvalidField,
}


impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

impl std::error::Error for Error {}


pub mod dataset;
pub mod loc;
pub mod raw;

mod parsers;

pub use loc::LocId;
pub use parsers::{EdgeCsvFmt, TripCsvFmt, MatrixCsvFmt, ParseInstance, parse_csv};
pub use dataset::{
  edges::{Distance, Edge, EdgeList, EdgeCsv},
  trips::{Trip, TripList, TripCsv, WeekTime, day_name},
  matrix::RawMatrix,
};
