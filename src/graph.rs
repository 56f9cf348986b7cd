//! Associative graph memory: store an entire edge list in one hypervector,
//! recover edges by similarity, and self-correct with an error-mitigation
//! loop.

use std::collections::BTreeMap;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument, warn};

use crate::error::GraphError;
use crate::hypervector::{derive_seed, Alphabet, DistanceMethod, Hypervector};
use crate::space::Space;

type GResult<T> = std::result::Result<T, GraphError>;

const WEIGHT_START: f64 = 0.0;
const WEIGHT_END: f64 = 1.0;
const WEIGHT_STEP: f64 = 0.01;

fn weight_vector_name(w: f64) -> String {
    format!("__weight__{w:.2}")
}

/// One entry of a graph's edge list. `weight` is `None` for unweighted
/// graphs (the spec's "unweighted" sentinel).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub u: String,
    pub v: String,
    pub weight: Option<f64>,
}

impl Edge {
    pub fn new(u: impl Into<String>, v: impl Into<String>, weight: Option<f64>) -> Self {
        Self {
            u: u.into(),
            v: v.into(),
            weight,
        }
    }
}

/// An associative memory over a graph: one hypervector per node, one per
/// discretised weight bucket, and an aggregate `__graph__` hypervector that
/// `fit` derives from them.
#[derive(Debug)]
pub struct Graph {
    space: Space,
    dim: usize,
    directed: bool,
    weighted: bool,
    nodes_count: usize,
    edges_count: usize,
    seed: Option<u64>,
    rng: ChaCha8Rng,
    adjacency: BTreeMap<String, Vec<(String, Option<f64>)>>,
    fit: bool,
}

impl Graph {
    /// Create an empty graph over a fresh `Space` of the given dimension.
    /// Always bipolar internally (Q3): bind must be self-inverse for the
    /// decode path to recover node memories.
    pub fn new(dim: usize, directed: bool, weighted: bool, seed: Option<u64>) -> GResult<Self> {
        let space = Space::create(dim, Alphabet::Bipolar);
        // `Space::create` doesn't validate dim; the first node insertion will
        // surface `HvError::SizeTooSmall` if the caller under-sized it.
        let rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or(0x6772_6170_6800_0000));
        Ok(Self {
            space,
            dim,
            directed,
            weighted,
            nodes_count: 0,
            edges_count: 0,
            seed,
            rng,
            adjacency: BTreeMap::new(),
            fit: false,
        })
    }

    pub fn directed(&self) -> bool {
        self.directed
    }

    pub fn weighted(&self) -> bool {
        self.weighted
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes_count
    }

    pub fn edges_count(&self) -> usize {
        self.edges_count
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    fn ensure_node(&mut self, name: &str) -> GResult<()> {
        if !self.space.contains(name) {
            let seed = derive_seed(self.seed.unwrap_or(0), self.nodes_count as u64);
            let vector = Hypervector::random(name, self.dim, Alphabet::Bipolar, Some(seed))?;
            self.space.insert(vector)?;
            self.nodes_count += 1;
        }
        Ok(())
    }

    fn add_edge(&mut self, u: &str, v: &str, weight: Option<f64>) -> GResult<()> {
        self.ensure_node(u)?;
        self.ensure_node(v)?;
        self.adjacency.entry(u.to_string()).or_default().push((v.to_string(), weight));
        self.edges_count += 1;
        if !self.directed {
            self.adjacency.entry(v.to_string()).or_default().push((u.to_string(), weight));
            self.edges_count += 1;
        }
        Ok(())
    }

    fn has_child(&self, u: &str, v: &str) -> bool {
        self.adjacency
            .get(u)
            .map(|ns| ns.iter().any(|(n, _)| n == v))
            .unwrap_or(false)
    }

    /// Build the `__weight__<w>` codebook: one vector per bucket, each a
    /// small number of sign-flips away from its neighbor so distance is
    /// monotone in |delta weight|.
    #[instrument(skip(self))]
    fn build_weight_memory(&mut self) -> GResult<()> {
        let levels = ((WEIGHT_END - WEIGHT_START) / WEIGHT_STEP).round() as usize;
        let flips_per_level = self.dim / (2 * levels.max(1));
        let mut base = vec![-1i32; self.dim];

        let mut w = WEIGHT_START;
        while w < WEIGHT_END {
            for _ in 0..flips_per_level {
                let idx = self.rng.gen_range(0..self.dim);
                base[idx] *= -1;
            }
            let name = weight_vector_name(w);
            let vector = Hypervector::from_raw(name, self.dim, Alphabet::Bipolar, base.clone());
            self.space.insert(vector)?;
            w += WEIGHT_STEP;
        }
        debug!(levels, "built weight codebook");
        Ok(())
    }

    fn contribution(&self, v: &str, weight: Option<f64>) -> GResult<Hypervector> {
        let node_v = self.space.require(v)?;
        let raw = if self.weighted {
            let w = weight.ok_or_else(|| GraphError::MissingWeight {
                u: String::new(),
                v: v.to_string(),
            })?;
            let wv_name = weight_vector_name(w);
            let weight_vector = self
                .space
                .get(&wv_name)
                .ok_or(GraphError::WeightVectorMissing { weight: w })?;
            weight_vector.bind(node_v)?
        } else {
            node_v.clone()
        };
        Ok(if self.directed { raw.permute(1) } else { raw })
    }

    /// Recompute one node's memory from its current adjacency list.
    fn build_node_memory(&mut self, name: &str) -> GResult<()> {
        let neighbors = self.adjacency.get(name).cloned().unwrap_or_default();
        let mut memory = Hypervector::from_raw(format!("{name}::memory"), self.dim, Alphabet::Bipolar, vec![0; self.dim]);
        for (neighbor, weight) in &neighbors {
            let contrib = self.contribution(neighbor, *weight)?;
            memory = memory.bundle(&contrib)?;
        }
        let node = self
            .space
            .get_mut(name)
            .ok_or_else(|| GraphError::NodeNotFound { name: name.to_string() })?;
        node.attach_memory(memory);
        Ok(())
    }

    /// Rebuild the aggregate `__graph__` vector from current node memories.
    fn rebuild_graph_vector(&mut self) -> GResult<()> {
        let mut acc = Hypervector::from_raw("__graph__", self.dim, Alphabet::Bipolar, vec![0; self.dim]);
        for name in self.space.names().map(str::to_string).collect::<Vec<_>>() {
            if name == "__graph__" || name.starts_with("__weight__") {
                continue;
            }
            let node = self.space.require(&name)?;
            let memory = node.memory().ok_or_else(|| GraphError::NodeNotFound { name: name.clone() })?;
            let contrib = node.bind(memory)?;
            acc = acc.bundle(&contrib)?;
        }
        if !self.directed {
            // Q4: truncating division, losing parity on odd sums. Lossy by
            // design, consistent with HDC's approximate recall elsewhere.
            let halved: Vec<i32> = acc.elements().iter().map(|e| e / 2).collect();
            acc = Hypervector::from_raw("__graph__", self.dim, Alphabet::Bipolar, halved);
        }
        self.space.remove("__graph__");
        self.space.insert(acc)?;
        Ok(())
    }

    /// Ingest an edge list and build the graph memory: per-node memories,
    /// the weight codebook if weighted, and the aggregate `__graph__` vector.
    #[instrument(skip(self, edges), fields(dim = self.dim, directed = self.directed, weighted = self.weighted))]
    pub fn fit(&mut self, edges: &[Edge]) -> GResult<()> {
        if edges.is_empty() {
            return Err(GraphError::NoEdges);
        }
        for edge in edges {
            match (self.weighted, edge.weight) {
                (true, None) => {
                    return Err(GraphError::MissingWeight {
                        u: edge.u.clone(),
                        v: edge.v.clone(),
                    })
                }
                (false, Some(_)) => {
                    return Err(GraphError::UnexpectedWeight {
                        u: edge.u.clone(),
                        v: edge.v.clone(),
                    })
                }
                (true, Some(w)) if !(0.0..1.0).contains(&w) => {
                    return Err(GraphError::WeightOutOfRange { weight: w })
                }
                _ => {}
            }
        }
        for edge in edges {
            self.add_edge(&edge.u, &edge.v, edge.weight)?;
        }
        if self.weighted {
            self.build_weight_memory()?;
        }
        let names: Vec<String> = self.space.names().map(str::to_string).collect();
        for name in &names {
            if name == "__graph__" || name.starts_with("__weight__") {
                continue;
            }
            self.build_node_memory(name)?;
        }
        self.rebuild_graph_vector()?;
        self.fit = true;
        info!(nodes = self.nodes_count, edges = self.edges_count, "graph fit complete");
        Ok(())
    }

    /// Query whether edge (u, v[, weight]) exists, returning `(exists, distance)`.
    pub fn edge_exists(&self, u: &str, v: &str, weight: Option<f64>, threshold: f64) -> GResult<(bool, f64)> {
        if !self.fit {
            return Err(GraphError::NotFit);
        }
        let graph_vector = self.space.require("__graph__")?;
        let node_u = self
            .space
            .get(u)
            .ok_or_else(|| GraphError::NodeNotFound { name: u.to_string() })?;
        let _node_v = self
            .space
            .get(v)
            .ok_or_else(|| GraphError::NodeNotFound { name: v.to_string() })?;

        let mut probe = node_u.bind(graph_vector)?;
        if self.directed {
            probe = probe.permute(-1);
        }
        let target = self.contribution_for_query(v, weight)?;
        let d = probe.distance(&target, DistanceMethod::Cosine)?;
        Ok((d < threshold, d))
    }

    fn contribution_for_query(&self, v: &str, weight: Option<f64>) -> GResult<Hypervector> {
        let node_v = self.space.require(v)?;
        if self.weighted {
            let w = weight.ok_or_else(|| GraphError::MissingWeight {
                u: String::new(),
                v: v.to_string(),
            })?;
            let wv_name = weight_vector_name(w);
            let weight_vector = self
                .space
                .get(&wv_name)
                .ok_or(GraphError::WeightVectorMissing { weight: w })?;
            Ok(weight_vector.bind(node_v)?)
        } else {
            Ok(node_v.clone())
        }
    }

    /// Error rate of the given edge set at `threshold`: fraction that are
    /// false positives (query says yes, not actually an edge) or false
    /// negatives (query says no, but it is an edge). Returns
    /// `(error_rate, false_positives, false_negatives)`.
    pub fn error_rate(&self, edges: &[Edge], threshold: f64) -> GResult<(f64, Vec<Edge>, Vec<Edge>)> {
        if edges.is_empty() {
            return Err(GraphError::NoEdges);
        }
        let mut fp = Vec::new();
        let mut fn_ = Vec::new();
        for edge in edges {
            let (exists, _) = self.edge_exists(&edge.u, &edge.v, edge.weight, threshold)?;
            let actual = self.has_child(&edge.u, &edge.v);
            if exists && !actual {
                fp.push(edge.clone());
            } else if !exists && actual {
                fn_.push(edge.clone());
            }
        }
        let rate = (fp.len() + fn_.len()) as f64 / edges.len() as f64;
        Ok((rate, fp, fn_))
    }

    /// Iteratively reweight per-node memories to reduce decoded edge errors.
    /// Bounded by `max_iter`; stops as soon as a step fails to strictly
    /// improve the measured error, without rolling back that step.
    #[instrument(skip(self, edges))]
    pub fn error_mitigation(&mut self, edges: &[Edge], threshold: f64, max_iter: usize) -> GResult<f64> {
        let (mut prev_rate, _, _) = self.error_rate(edges, threshold)?;
        let mut iterations = 0;
        while iterations < max_iter {
            let (rate, fp, fn_) = self.error_rate(edges, threshold)?;
            if rate >= prev_rate && iterations > 0 {
                break;
            }
            for edge in &fp {
                let contrib = self.contribution(&edge.v, edge.weight)?;
                let node = self.space.require(&edge.u)?.clone();
                let memory = node.memory().ok_or(GraphError::NotFit)?;
                let adjusted = memory.subtract(&contrib)?;
                self.space
                    .get_mut(&edge.u)
                    .ok_or_else(|| GraphError::NodeNotFound { name: edge.u.clone() })?
                    .attach_memory(adjusted);
            }
            for edge in &fn_ {
                let contrib = self.contribution(&edge.v, edge.weight)?;
                let node = self.space.require(&edge.u)?.clone();
                let memory = node.memory().ok_or(GraphError::NotFit)?;
                let adjusted = memory.bundle(&contrib)?;
                self.space
                    .get_mut(&edge.u)
                    .ok_or_else(|| GraphError::NodeNotFound { name: edge.u.clone() })?
                    .attach_memory(adjusted);
            }
            self.rebuild_graph_vector()?;
            let (new_rate, _, _) = self.error_rate(edges, threshold)?;
            iterations += 1;
            if new_rate >= prev_rate {
                warn!(new_rate, prev_rate, "error mitigation stopped: no improvement");
                break;
            }
            prev_rate = new_rate;
        }
        Ok(prev_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 10_000;

    fn triangle() -> Vec<Edge> {
        vec![
            Edge::new("A", "B", None),
            Edge::new("B", "C", None),
            Edge::new("C", "A", None),
        ]
    }

    #[test]
    fn fit_rejects_empty_edge_list() {
        let mut g = Graph::new(DIM, false, false, Some(1)).unwrap();
        let err = g.fit(&[]).unwrap_err();
        assert!(matches!(err, GraphError::NoEdges));
    }

    #[test]
    fn query_before_fit_is_missing_prerequisite() {
        let g = Graph::new(DIM, false, false, Some(1)).unwrap();
        let err = g.edge_exists("A", "B", None, 0.5).unwrap_err();
        assert!(matches!(err, GraphError::NotFit));
    }

    /// S2 / P5: undirected unweighted triangle recovers its own edges.
    #[test]
    fn undirected_triangle_recovers_edges() {
        let mut g = Graph::new(DIM, false, false, Some(7)).unwrap();
        g.fit(&triangle()).unwrap();
        let (exists, d) = g.edge_exists("A", "B", None, 0.5).unwrap();
        assert!(exists, "distance was {d}");
    }

    #[test]
    fn query_against_absent_node_is_missing_prerequisite() {
        let mut g = Graph::new(DIM, false, false, Some(7)).unwrap();
        g.fit(&triangle()).unwrap();
        let err = g.edge_exists("A", "D", None, 0.5).unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound { .. }));
    }

    /// P6: error_rate right after fit is comfortably below 0.5.
    #[test]
    fn error_rate_after_fit_is_low() {
        let mut g = Graph::new(DIM, false, false, Some(7)).unwrap();
        g.fit(&triangle()).unwrap();
        let (rate, _, _) = g.error_rate(&triangle(), 0.5).unwrap();
        assert!(rate < 0.5, "rate was {rate}");
    }

    #[test]
    fn error_mitigation_never_increases_error() {
        let mut g = Graph::new(DIM, false, false, Some(7)).unwrap();
        let edges = triangle();
        g.fit(&edges).unwrap();
        let (before, _, _) = g.error_rate(&edges, 0.5).unwrap();
        let after = g.error_mitigation(&edges, 0.5, 5).unwrap();
        assert!(after <= before);
    }

    #[test]
    fn weighted_graph_requires_weights() {
        let mut g = Graph::new(DIM, false, true, Some(1)).unwrap();
        let err = g.fit(&[Edge::new("A", "B", None)]).unwrap_err();
        assert!(matches!(err, GraphError::MissingWeight { .. }));
    }

    #[test]
    fn unweighted_graph_rejects_weights() {
        let mut g = Graph::new(DIM, false, false, Some(1)).unwrap();
        let err = g.fit(&[Edge::new("A", "B", Some(0.5))]).unwrap_err();
        assert!(matches!(err, GraphError::UnexpectedWeight { .. }));
    }

    #[test]
    fn weighted_graph_fits_and_queries() {
        let mut g = Graph::new(DIM, false, true, Some(3)).unwrap();
        g.fit(&[Edge::new("A", "B", Some(0.42)), Edge::new("B", "C", Some(0.10))]).unwrap();
        let (exists, d) = g.edge_exists("A", "B", Some(0.42), 0.6).unwrap();
        assert!(exists, "distance was {d}");
    }

    #[test]
    fn directed_graph_does_not_mirror_edges() {
        let mut g = Graph::new(DIM, true, false, Some(9)).unwrap();
        g.fit(&[Edge::new("A", "B", None)]).unwrap();
        assert!(!g.has_child("B", "A"));
        assert!(g.has_child("A", "B"));
    }
}
