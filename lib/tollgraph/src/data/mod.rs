use std::path::Path;
use anyhow::Result;
use tolldata::dataset::{Dataset, StdLayout};
use tolldata::{EdgeCsv, EdgeCsvFmt, MatrixCsvFmt, ParseInstance, TripCsv, TripCsvFmt};

pub use tolldata::{Edge, EdgeList, LocId, RawMatrix, Trip, TripList, WeekTime, day_name};

/// Load dataset A from a CSV file.
pub fn load_edges(path: impl AsRef<Path>) -> Result<EdgeList<LocId>> {
    EdgeList::parse(EdgeCsvFmt(path))
}

/// Load the table `name` from a dataset directory of edge tables.
pub fn get_edges_by_name(dir: impl AsRef<Path>, name: &str) -> Result<EdgeList<LocId>> {
    let layout: StdLayout<EdgeCsv> = StdLayout::new(dir, "csv")?;
    layout.load_by_name(name)
}

/// Load dataset B from a CSV file.
pub fn load_trips(path: impl AsRef<Path>) -> Result<TripList<LocId>> {
    TripList::parse(TripCsvFmt(path))
}

pub fn get_trips_by_name(dir: impl AsRef<Path>, name: &str) -> Result<TripList<LocId>> {
    let layout: StdLayout<TripCsv> = StdLayout::new(dir, "csv")?;
    layout.load_by_name(name)
}

pub fn load_matrix(path: impl AsRef<Path>) -> Result<RawMatrix<LocId>> {
    RawMatrix::parse(MatrixCsvFmt(path))
}
