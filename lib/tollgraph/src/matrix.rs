use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use itertools::Itertools;
use rayon::prelude::*;
use tracing::*;

use crate::*;
use crate::data::{Edge, RawMatrix};
use crate::graph::{build_graph, Graph};
use crate::unroll::UnrolledRecord;

/// A matrix cell: either a shortest-path length or the explicit absence of any path.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathLen {
    Finite(Distance),
    Unreachable,
}

impl PathLen {
    #[inline]
    pub fn finite(self) -> Option<Distance> {
        match self {
            PathLen::Finite(d) => Some(d),
            PathLen::Unreachable => None,
        }
    }

    #[inline]
    pub fn is_reachable(self) -> bool {
        matches!(self, PathLen::Finite(_))
    }

    /// The distance, or [`Error::Unreachable`] for numeric consumers that cannot skip the cell.
    pub fn try_finite(self) -> anyhow::Result<Distance> {
        self.finite().ok_or_else(|| Error::Unreachable.into())
    }
}

impl From<Option<Distance>> for PathLen {
    fn from(d: Option<Distance>) -> Self {
        match d {
            Some(d) => PathLen::Finite(d),
            None => PathLen::Unreachable,
        }
    }
}

/// Empty for [`PathLen::Unreachable`], so it reads back as such from CSV.
impl fmt::Display for PathLen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathLen::Finite(d) => write!(f, "{}", d),
            PathLen::Unreachable => Ok(()),
        }
    }
}


/// Square, location-indexed matrix of [`PathLen`] cells, stored row-major.
#[derive(Debug, Clone)]
pub struct DistanceMatrix<L> {
    locations: Vec<L>,
    index: Map<L, usize>,
    cells: Vec<PathLen>,
}

impl<L: PartialEq> PartialEq for DistanceMatrix<L> {
    fn eq(&self, other: &Self) -> bool {
        self.locations == other.locations && self.cells == other.cells
    }
}

impl<L: Location> DistanceMatrix<L> {
    fn from_parts(locations: Vec<L>, cells: Vec<PathLen>) -> Self {
        debug_assert_eq!(cells.len(), locations.len() * locations.len());
        let index = locations.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();
        DistanceMatrix { locations, index, cells }
    }

    /// Row (and column) labels, in order.
    pub fn locations(&self) -> &[L] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn index_of(&self, loc: &L) -> Option<usize> {
        self.index.get(loc).copied()
    }

    #[inline]
    pub fn cell(&self, i: usize, j: usize) -> PathLen {
        self.cells[i * self.len() + j]
    }

    pub fn row(&self, i: usize) -> &[PathLen] {
        let n = self.len();
        &self.cells[i * n..(i + 1) * n]
    }

    /// Cell for `(origin, destination)`, `None` if either is not a row of this matrix.
    pub fn get(&self, origin: &L, destination: &L) -> Option<PathLen> {
        Some(self.cell(self.index_of(origin)?, self.index_of(destination)?))
    }

    fn pivot(locations: Vec<L>, index: Map<L, usize>, records: &[UnrolledRecord<L>]) -> Self {
        let n = locations.len();
        let mut cells = vec![PathLen::Unreachable; n * n];
        for i in 0..n {
            cells[i * n + i] = PathLen::Finite(0.0);
        }
        for r in records {
            let (i, j) = (index[&r.origin], index[&r.destination]);
            if i == j {
                trace!(location=%r.origin, "self-pair record ignored");
                continue;
            }
            cells[i * n + j] = r.distance;
        }
        DistanceMatrix { locations, index, cells }
    }

    /// Pivot an edge list back into a matrix.  Locations are the sorted union of all origins and
    /// destinations, the diagonal is zero, and pairs without a record are unreachable.  If a pair
    /// occurs more than once the last record wins.
    pub fn from_records(records: &[UnrolledRecord<L>]) -> Self {
        let locations: Vec<L> = records.iter()
            .flat_map(|r| vec![r.origin.clone(), r.destination.clone()])
            .sorted()
            .dedup()
            .collect();
        let index = locations.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();
        Self::pivot(locations, index, records)
    }

    /// Like [`from_records`](Self::from_records) over a known location set, in the given order.
    /// Locations without any record survive as isolated rows, so `unroll` followed by this is
    /// lossless for every matrix.  Fails with [`Error::ShapeMismatch`] if `locations` has
    /// duplicates or a record names a location outside it.
    pub fn from_records_over(locations: Vec<L>, records: &[UnrolledRecord<L>]) -> anyhow::Result<Self> {
        let index: Map<L, usize> = locations.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();
        if index.len() != locations.len() {
            warn!("duplicate locations");
            return Err(Error::ShapeMismatch.into());
        }
        if let Some(r) = records.iter().find(|r| !index.contains_key(&r.origin) || !index.contains_key(&r.destination)) {
            warn!(origin=%r.origin, destination=%r.destination, "record outside the location set");
            return Err(Error::ShapeMismatch.into());
        }
        Ok(Self::pivot(locations, index, records))
    }

    /// Validate a tabular matrix.  Rows and columns must carry the same set of distinct ids and
    /// every row must have one cell per column, otherwise [`Error::ShapeMismatch`].  Columns are
    /// reordered to match the row order.
    pub fn from_table(rows: Vec<L>, columns: Vec<L>, cells: Vec<Vec<PathLen>>) -> anyhow::Result<Self> {
        let n = rows.len();
        if columns.len() != n || cells.len() != n {
            warn!(rows=n, columns=columns.len(), cell_rows=cells.len(), "matrix is not square");
            return Err(Error::ShapeMismatch.into());
        }
        if let Some(k) = cells.iter().position(|r| r.len() != n) {
            warn!(row=%rows[k], len=cells[k].len(), expected=n, "matrix row has wrong length");
            return Err(Error::ShapeMismatch.into());
        }

        let index: Map<L, usize> = rows.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();
        if index.len() != n {
            warn!("duplicate row ids");
            return Err(Error::ShapeMismatch.into());
        }
        let col_pos: Option<Vec<usize>> = columns.iter().map(|c| index.get(c).copied()).collect();
        let col_pos = match col_pos {
            Some(p) if p.iter().collect::<Set<_>>().len() == n => p,
            _ => {
                warn!(?rows, ?columns, "row and column ids differ");
                return Err(Error::ShapeMismatch.into());
            }
        };

        let mut flat = vec![PathLen::Unreachable; n * n];
        for (i, row) in cells.into_iter().enumerate() {
            for (k, c) in row.into_iter().enumerate() {
                flat[i * n + col_pos[k]] = c;
            }
        }
        Ok(DistanceMatrix { locations: rows, index, cells: flat })
    }

    /// [`from_table`](Self::from_table) for a table read from disk; empty cells are unreachable.
    pub fn from_raw(raw: RawMatrix<L>) -> anyhow::Result<Self> {
        let (rows, cells): (Vec<L>, Vec<Vec<PathLen>>) = raw.rows.into_iter()
            .map(|(loc, row)| (loc, row.into_iter().map(PathLen::from).collect()))
            .unzip();
        Self::from_table(rows, raw.columns, cells)
    }

    /// Scale every finite cell according to `rule`.  Unreachable cells are left as they are.
    pub fn adjust(&self, rule: &AdjustRule) -> Self {
        let cells = self.cells.iter()
            .map(|c| match *c {
                PathLen::Finite(d) => PathLen::Finite(rule.apply(d)),
                PathLen::Unreachable => PathLen::Unreachable,
            })
            .collect();
        Self::from_parts(self.locations.clone(), cells)
    }
}


/// Piecewise scaling of distances: values above `threshold` are multiplied by `above`, all others
/// by `at_or_below`, and the result is rounded to `decimals` places.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AdjustRule {
    pub threshold: Distance,
    pub above: f64,
    pub at_or_below: f64,
    pub decimals: i32,
}

impl Default for AdjustRule {
    fn default() -> Self {
        AdjustRule { threshold: 20.0, above: 0.75, at_or_below: 1.25, decimals: 1 }
    }
}

impl AdjustRule {
    pub fn apply(&self, d: Distance) -> Distance {
        let scaled = if d > self.threshold { d * self.above } else { d * self.at_or_below };
        let p = 10f64.powi(self.decimals);
        (scaled * p).round() / p
    }
}


/// Priority queue entry, ordered so that `BinaryHeap` pops the smallest key first.
#[derive(Copy, Clone, Debug, PartialEq)]
struct State {
    key: Distance,
    node: usize,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.total_cmp(&self.key).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Single-source shortest path lengths from `source`; `None` where no path exists.
fn dijkstra<L: Location>(graph: &Graph<L>, source: usize) -> Vec<Option<Distance>> {
    let mut dist: Vec<Option<Distance>> = vec![None; graph.locations().len()];
    let mut queue = BinaryHeap::new();
    dist[source] = Some(0.0);
    queue.push(State { key: 0.0, node: source });

    while let Some(State { key, node }) = queue.pop() {
        if matches!(dist[node], Some(d) if key > d) {
            continue;
        }
        for &(next, w) in graph.neighbours(node) {
            let tentative = key + w;
            match dist[next] {
                Some(d) if d <= tentative => {}
                _ => {
                    dist[next] = Some(tentative);
                    queue.push(State { key: tentative, node: next });
                }
            }
        }
    }
    dist
}

/// All-pairs shortest path closure of `graph`.
///
/// One Dijkstra run per source, executed on the rayon pool.  Each unordered pair is taken from the
/// run of its lower-indexed endpoint and mirrored, so the result is exactly symmetric.  The
/// diagonal is always zero.
#[instrument(level="info", name="shortest_path_matrix", skip(graph), fields(locations=graph.locations().len()))]
pub fn shortest_path_matrix<L: Location>(graph: &Graph<L>) -> anyhow::Result<DistanceMatrix<L>> {
    if graph.is_empty() {
        error!("no edges to build a matrix from");
        return Err(Error::EmptyGraph.into());
    }
    let n = graph.locations().len();
    let runs: Vec<Vec<Option<Distance>>> = (0..n).into_par_iter()
        .map(|s| dijkstra(graph, s))
        .collect();

    let mut cells = vec![PathLen::Unreachable; n * n];
    let mut unreachable = 0usize;
    for i in 0..n {
        cells[i * n + i] = PathLen::Finite(0.0);
        for j in (i + 1)..n {
            let c = PathLen::from(runs[i][j]);
            if !c.is_reachable() {
                unreachable += 1;
            }
            cells[i * n + j] = c;
            cells[j * n + i] = c;
        }
    }
    info!(locations = n, unreachable_pairs = unreachable, "distance matrix computed");
    Ok(DistanceMatrix::from_parts(graph.locations().to_vec(), cells))
}

/// Graph construction followed by the shortest path closure.
pub fn calculate_distance_matrix<L: Location>(edges: &[Edge<L>]) -> anyhow::Result<DistanceMatrix<L>> {
    let graph = build_graph(edges)?;
    shortest_path_matrix(&graph)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::unroll::unroll;
    use crate::data::LocId;
    use proptest::prelude::*;

    fn e(a: &str, b: &str, d: Distance) -> Edge<String> {
        Edge::new(a, b, d)
    }

    fn s(x: &str) -> String { x.to_string() }

    #[test]
    fn closure() {
        init_test_logging(None::<&str>);
        let m = calculate_distance_matrix(&[
            e("A", "B", 4.0),
            e("B", "C", 6.0),
            e("A", "C", 12.0),
            e("C", "D", 1.0),
        ]).unwrap();
        assert_eq!(m.locations(), &["A", "B", "C", "D"]);
        assert_eq!(m.get(&s("A"), &s("C")), Some(PathLen::Finite(10.0)));
        assert_eq!(m.get(&s("D"), &s("A")), Some(PathLen::Finite(11.0)));
        assert_eq!(m.get(&s("B"), &s("B")), Some(PathLen::Finite(0.0)));
        assert_eq!(m.get(&s("A"), &s("Z")), None);
    }

    #[test]
    fn disconnected_components() {
        let m = calculate_distance_matrix(&[e("A", "B", 1.0), e("X", "Y", 2.0)]).unwrap();
        assert_eq!(m.get(&s("A"), &s("X")), Some(PathLen::Unreachable));
        assert_eq!(m.get(&s("Y"), &s("B")), Some(PathLen::Unreachable));
        assert_eq!(m.get(&s("X"), &s("Y")), Some(PathLen::Finite(2.0)));
        let err = m.get(&s("A"), &s("Y")).unwrap().try_finite().unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::Unreachable));
    }

    #[test]
    fn self_loops_keep_zero_diagonal() {
        let m = calculate_distance_matrix(&[e("A", "A", 3.0), e("A", "B", 1.0)]).unwrap();
        assert_eq!(m.cell(0, 0), PathLen::Finite(0.0));
        assert_eq!(m.cell(0, 1), PathLen::Finite(1.0));
    }

    #[test]
    fn empty_graph() {
        let err = calculate_distance_matrix::<String>(&[]).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::EmptyGraph));
    }

    #[test]
    fn sample_matrix() {
        let edges = crate::data::load_edges("../../data/edges/sample.csv").unwrap();
        let m = calculate_distance_matrix(&edges.edges).unwrap();
        assert_eq!(m.len(), 11);
        let (a, b, c) = (LocId::Int(1001400), LocId::Int(1001404), LocId::Int(1001406));
        // duplicate observation 1001402-1001404 overwritten by 19.9
        let ab = m.get(&a, &b).unwrap().finite().unwrap();
        assert!((ab - 29.6).abs() < 1e-9);
        // 9.7 + 19.9 + 16.0 is longer than the direct 38.0
        assert_eq!(m.get(&a, &c), Some(PathLen::Finite(38.0)));
    }

    #[test]
    fn table_shape_checks() {
        let f = PathLen::Finite;
        let rows = vec![s("A"), s("B")];
        let ok = DistanceMatrix::from_table(rows.clone(), vec![s("B"), s("A")],
            vec![vec![f(3.0), f(0.0)], vec![f(0.0), f(3.0)]]).unwrap();
        assert_eq!(ok.locations(), &["A", "B"]);
        assert_eq!(ok.row(0), &[f(0.0), f(3.0)]);

        let bad = [
            DistanceMatrix::from_table(rows.clone(), vec![s("A")], vec![vec![f(0.0)], vec![f(0.0)]]),
            DistanceMatrix::from_table(rows.clone(), vec![s("A"), s("C")], vec![vec![f(0.0); 2]; 2]),
            DistanceMatrix::from_table(rows.clone(), vec![s("A"), s("A")], vec![vec![f(0.0); 2]; 2]),
            DistanceMatrix::from_table(rows.clone(), vec![s("A"), s("B")], vec![vec![f(0.0); 2], vec![f(0.0)]]),
            DistanceMatrix::from_table(vec![s("A"), s("A")], vec![s("A"), s("B")], vec![vec![f(0.0); 2]; 2]),
        ];
        for r in bad.iter() {
            let err = r.as_ref().unwrap_err();
            assert_eq!(err.downcast_ref::<Error>(), Some(&Error::ShapeMismatch));
        }
    }

    #[test]
    fn matrix_file_matches_computed() {
        let raw = crate::data::load_matrix("../../data/matrix/islands.csv").unwrap();
        let from_file = DistanceMatrix::from_raw(raw).unwrap();
        let edges = crate::data::load_edges("../../data/edges/islands.csv").unwrap();
        let computed = calculate_distance_matrix(&edges.edges).unwrap();
        assert_eq!(from_file, computed);
    }

    #[test]
    fn adjust_cells() {
        let m = calculate_distance_matrix(&[e("A", "B", 30.0), e("B", "C", 7.3), e("X", "Y", 1.0)]).unwrap();
        let adj = m.adjust(&AdjustRule::default());
        assert_eq!(adj.get(&s("A"), &s("B")), Some(PathLen::Finite(22.5)));
        assert_eq!(adj.get(&s("B"), &s("C")), Some(PathLen::Finite(9.1)));
        assert_eq!(adj.get(&s("A"), &s("C")), Some(PathLen::Finite(28.0)));
        assert_eq!(adj.get(&s("A"), &s("X")), Some(PathLen::Unreachable));
        assert_eq!(adj.get(&s("A"), &s("A")), Some(PathLen::Finite(0.0)));
    }

    #[test]
    fn display_cells() {
        assert_eq!(PathLen::Finite(9.7).to_string(), "9.7");
        assert_eq!(PathLen::Unreachable.to_string(), "");
    }

    fn graph_edges() -> impl Strategy<Value=Vec<Edge<u32>>> {
        // k == 0 gives a self-loop; short lists of them give one-location graphs
        prop::collection::vec((0..12u32, 0..12u32, 0..50u32), 1..40)
            .prop_map(|v| v.into_iter()
                .map(|(a, k, d)| Edge::new(a, (a + k) % 12, d as f64))
                .collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn matrix_properties(edges in graph_edges()) {
            init_test_logging(None::<&str>);
            let m = calculate_distance_matrix(&edges).unwrap();
            let n = m.len();

            for a in 0..n {
                prop_assert_eq!(m.cell(a, a), PathLen::Finite(0.0));
                for b in 0..n {
                    prop_assert_eq!(m.cell(a, b), m.cell(b, a));
                    for c in 0..n {
                        if let (Some(ab), Some(bc)) = (m.cell(a, b).finite(), m.cell(b, c).finite()) {
                            let ac = m.cell(a, c).finite();
                            prop_assert!(ac.is_some());
                            prop_assert!(ac.unwrap() <= ab + bc);
                        }
                    }
                }
            }

            // never longer than the surviving direct observation
            let g = build_graph(&edges).unwrap();
            for e in &edges {
                let d = m.get(&e.origin, &e.destination).unwrap().finite().unwrap();
                prop_assert!(d <= g.weight(&e.origin, &e.destination).unwrap());
            }

            let rebuilt = DistanceMatrix::from_records_over(m.locations().to_vec(), &unroll(&m)).unwrap();
            prop_assert_eq!(&rebuilt, &m);
            if n > 1 {
                prop_assert_eq!(DistanceMatrix::from_records(&unroll(&m)), m);
            }
        }
    }
}
