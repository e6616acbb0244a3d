use std::collections::BTreeSet;
use tracing::*;

use crate::*;
use crate::data::Edge;

/// Collects direct observations into an undirected weighted graph.
///
/// If the same unordered pair is observed more than once, the most recently added weight wins;
/// duplicates are neither summed nor averaged.
#[derive(Debug, Clone)]
pub struct GraphBuilder<L> {
    weights: Map<(L, L), Distance>,
    locations: BTreeSet<L>,
    num_observations: usize,
}

impl<L: Location> Default for GraphBuilder<L> {
    fn default() -> Self {
        GraphBuilder { weights: Map::default(), locations: BTreeSet::new(), num_observations: 0 }
    }
}

impl<L: Location> GraphBuilder<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, edge: &Edge<L>) -> anyhow::Result<&mut Self> {
        if !(edge.distance >= 0.0 && edge.distance.is_finite()) {
            warn!(origin=%edge.origin, destination=%edge.destination, distance=edge.distance, "rejected edge weight");
            return Err(Error::InvalidDistance.into());
        }
        let key = if edge.origin <= edge.destination {
            (edge.origin.clone(), edge.destination.clone())
        } else {
            (edge.destination.clone(), edge.origin.clone())
        };
        self.locations.insert(edge.origin.clone());
        self.locations.insert(edge.destination.clone());
        if let Some(old) = self.weights.insert(key, edge.distance) {
            debug!(origin=%edge.origin, destination=%edge.destination, old, new=edge.distance, "duplicate edge overwritten");
        }
        self.num_observations += 1;
        Ok(self)
    }

    pub fn extend<'a, I>(&mut self, edges: I) -> anyhow::Result<&mut Self>
        where
            I: IntoIterator<Item=&'a Edge<L>>,
            L: 'a,
    {
        for e in edges {
            self.add_edge(e)?;
        }
        Ok(self)
    }

    pub fn finish(self) -> Graph<L> {
        let locations: Vec<L> = self.locations.into_iter().collect();
        let index: Map<L, usize> = locations.iter().enumerate().map(|(i, l)| (l.clone(), i)).collect();

        let mut adjacency = vec![Vec::new(); locations.len()];
        let mut num_edges = 0;
        for ((a, b), &w) in &self.weights {
            let (i, j) = (index[a], index[b]);
            num_edges += 1;
            if i == j {
                trace!(location=%a, "self-loop ignored");
                continue;
            }
            adjacency[i].push((j, w));
            adjacency[j].push((i, w));
        }
        // deterministic relaxation order
        for adj in adjacency.iter_mut() {
            adj.sort_by_key(|&(j, _)| j);
        }

        debug!(locations=locations.len(), edges=num_edges, observations=self.num_observations, "graph built");
        Graph { locations, index, adjacency, weights: self.weights, num_edges }
    }
}

/// Undirected weighted graph over a sorted location universe.  Node `i` is `locations()[i]`.
#[derive(Debug, Clone)]
pub struct Graph<L> {
    locations: Vec<L>,
    index: Map<L, usize>,
    adjacency: Vec<Vec<(usize, Distance)>>,
    weights: Map<(L, L), Distance>,
    num_edges: usize,
}

impl<L: Location> Graph<L> {
    /// Sorted, distinct locations seen as origin or destination.
    pub fn locations(&self) -> &[L] {
        &self.locations
    }

    pub fn index_of(&self, loc: &L) -> Option<usize> {
        self.index.get(loc).copied()
    }

    /// Number of distinct unordered pairs, self-loops included.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn is_empty(&self) -> bool {
        self.num_edges == 0
    }

    /// Directly observed weight between `a` and `b`, in either direction.
    pub fn weight(&self, a: &L, b: &L) -> Option<Distance> {
        let key = if a <= b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
        self.weights.get(&key).copied()
    }

    #[inline]
    pub(crate) fn neighbours(&self, i: usize) -> &[(usize, Distance)] {
        &self.adjacency[i]
    }
}

/// Build a graph from `edges`, failing on the first invalid weight.
#[instrument(level="debug", skip(edges))]
pub fn build_graph<L: Location>(edges: &[Edge<L>]) -> anyhow::Result<Graph<L>> {
    let mut builder = GraphBuilder::new();
    builder.extend(edges)?;
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(a: &str, b: &str, d: Distance) -> Edge<String> {
        Edge::new(a, b, d)
    }

    #[test]
    fn last_write_wins() {
        init_test_logging(None::<&str>);
        let g = build_graph(&[e("A", "B", 5.0), e("B", "A", 8.0)]).unwrap();
        assert_eq!(g.weight(&"A".to_string(), &"B".to_string()), Some(8.0));
        assert_eq!(g.weight(&"B".to_string(), &"A".to_string()), Some(8.0));
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.neighbours(0), &[(1, 8.0)]);
    }

    #[test]
    fn sorted_universe() {
        let g = build_graph(&[e("C", "A", 1.0), e("B", "B", 0.5), e("D", "C", 2.0)]).unwrap();
        assert_eq!(g.locations(), &["A", "B", "C", "D"]);
        assert_eq!(g.index_of(&"C".to_string()), Some(2));
        assert!(g.neighbours(1).is_empty());
        assert_eq!(g.num_edges(), 3);
    }

    #[test]
    fn reject_negative() {
        let err = build_graph(&[e("A", "B", 1.0), e("B", "C", -0.1)]).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidDistance));
        let err = build_graph(&[e("A", "B", f64::NAN)]).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::InvalidDistance));
    }

    #[test]
    fn no_edges() {
        let g = build_graph::<String>(&[]).unwrap();
        assert!(g.is_empty());
        assert!(g.locations().is_empty());
    }
}
