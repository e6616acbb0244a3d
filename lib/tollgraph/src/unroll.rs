use tracing::*;

use crate::*;
use crate::data::Edge;
use crate::matrix::{DistanceMatrix, PathLen};

/// One off-diagonal matrix cell as an `(id_start, id_end, distance)` row.
#[derive(Debug, Clone, PartialEq)]
pub struct UnrolledRecord<L> {
    pub origin: L,
    pub destination: L,
    pub distance: PathLen,
}

impl<L> UnrolledRecord<L> {
    pub fn new(origin: impl Into<L>, destination: impl Into<L>, distance: PathLen) -> Self {
        UnrolledRecord { origin: origin.into(), destination: destination.into(), distance }
    }
}

impl<L> From<Edge<L>> for UnrolledRecord<L> {
    fn from(e: Edge<L>) -> Self {
        UnrolledRecord { origin: e.origin, destination: e.destination, distance: PathLen::Finite(e.distance) }
    }
}

/// Flatten `matrix` into one record per ordered pair of distinct locations: origins in row order,
/// destinations in column order.  No path is recomputed, unreachable cells stay unreachable.
#[instrument(level="debug", skip(matrix), fields(locations=matrix.len()))]
pub fn unroll<L: Location>(matrix: &DistanceMatrix<L>) -> Vec<UnrolledRecord<L>> {
    let n = matrix.len();
    let locs = matrix.locations();
    let mut records = Vec::with_capacity(n * n.saturating_sub(1));
    for i in 0..n {
        for (j, &distance) in matrix.row(i).iter().enumerate() {
            if i == j {
                continue;
            }
            records.push(UnrolledRecord { origin: locs[i].clone(), destination: locs[j].clone(), distance });
        }
    }
    debug!(records = records.len(), "matrix unrolled");
    records
}
