//! End-to-end literal scenarios against the public crate API.

use hdvsa::classifier::{self, MLModel};
use hdvsa::dataset;
use hdvsa::graph::{Edge, Graph};
use hdvsa::hypervector::{Alphabet, DistanceMethod, Hypervector};
use std::io::Write;

/// S1: seed=1/seed=2 bipolar dim=10000 vectors are near-orthogonal, and
/// bind is exactly self-inverse.
#[test]
fn s1_hypervectors_cosine_and_bind_inverse() {
    let a = Hypervector::random("A", 10_000, Alphabet::Bipolar, Some(1)).unwrap();
    let b = Hypervector::random("B", 10_000, Alphabet::Bipolar, Some(2)).unwrap();

    let d = a.distance(&b, DistanceMethod::Cosine).unwrap();
    assert!((0.98..=1.02).contains(&d), "cosine distance was {d}");

    let round_trip = a.bind(&b).unwrap().bind(&b).unwrap();
    assert_eq!(a.elements(), round_trip.elements());
}

/// S2: an undirected unweighted triangle {A-B, B-C, C-A} recovers A-B and
/// rejects a query against an absent node D with MissingPrerequisite.
#[test]
fn s2_triangle_graph_recovers_edges_and_rejects_absent_node() {
    let mut g = Graph::new(10_000, false, false, Some(0)).unwrap();
    let edges = vec![
        Edge::new("A", "B", None),
        Edge::new("B", "C", None),
        Edge::new("C", "A", None),
    ];
    g.fit(&edges).unwrap();

    let (exists, _) = g.edge_exists("A", "B", None, 0.5).unwrap();
    assert!(exists);

    let err = g.edge_exists("A", "D", None, 0.5).unwrap_err();
    assert!(matches!(err, hdvsa::error::GraphError::NodeNotFound { .. }));
}

/// S3: a 6-row, 2-feature, linearly-separable dataset gets leave-one-out
/// cross-validated accuracy of 1.0.
#[test]
fn s3_classifier_leave_one_out_is_perfect() {
    let points = vec![
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        vec![2.0, 2.0],
        vec![10.0, 10.0],
        vec![11.0, 11.0],
        vec![12.0, 12.0],
    ];
    let labels: Vec<String> = vec!["x", "x", "x", "y", "y", "y"].into_iter().map(String::from).collect();

    let mut model = MLModel::new(10_000, 10, Some(0)).unwrap();
    model.fit(&points, &labels).unwrap();
    let cv = model.cross_val_predict(points.len(), Some(0)).unwrap();
    assert!((cv.mean_accuracy - 1.0).abs() < 1e-9, "accuracy was {}", cv.mean_accuracy);
}

/// S4: auto-tune over sizes {10000,20000} x levels {5,10} on the S3 data
/// picks the combination with the best accuracy, tied toward (10000, 10).
#[test]
fn s4_autotune_picks_best_combo() {
    let points = vec![
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        vec![2.0, 2.0],
        vec![10.0, 10.0],
        vec![11.0, 11.0],
        vec![12.0, 12.0],
    ];
    let labels: Vec<String> = vec!["x", "x", "x", "y", "y", "y"].into_iter().map(String::from).collect();

    let result = classifier::auto_tune(&points, &labels, &[10_000, 20_000], &[5, 10], 6, Some(0)).unwrap();
    assert!(result.mean_accuracy >= 0.9, "accuracy was {}", result.mean_accuracy);
    assert_eq!(result.levels, 10);
}

/// S5: literal TSV parse.
#[test]
fn s5_load_dataset_literal_values() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "id\tf1\tf2\tclass\nA\t0.1\t0.2\tx\nB\t0.9\t0.8\ty\n").unwrap();

    let ds = dataset::load_dataset(f.path(), "\t").unwrap();
    assert_eq!(ds.samples, vec!["A", "B"]);
    assert_eq!(ds.features, vec!["f1", "f2"]);
    assert_eq!(ds.matrix, vec![vec![0.1, 0.2], vec![0.9, 0.8]]);
    assert_eq!(ds.classes, vec!["x", "y"]);
}

/// S6: percentage_split(50%, seed=0) on 4+4 labels returns exactly 4 sorted
/// indices with two from each class.
#[test]
fn s6_percentage_split_literal_selection() {
    let labels: Vec<String> = vec!["x", "x", "x", "x", "y", "y", "y", "y"].into_iter().map(String::from).collect();
    let indices = dataset::percentage_split(&labels, 50.0, 0).unwrap();

    assert_eq!(indices.len(), 4);
    let mut sorted = indices.clone();
    sorted.sort_unstable();
    assert_eq!(indices, sorted);
    assert_eq!(indices.iter().filter(|&&i| i < 4).count(), 2);
    assert_eq!(indices.iter().filter(|&&i| i >= 4).count(), 2);
}
