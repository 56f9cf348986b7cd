//! # hdvsa
//!
//! A hyperdimensional computing (HDC) library: very-high-dimensional random
//! vectors with algebra that preserves approximate similarity under noise,
//! and two applications built on that algebra.
//!
//! ## Architecture
//!
//! - **Hypervector algebra** (`hypervector`): bind/bundle/subtract/permute/normalize and three distances
//! - **Space** (`space`): a named, dimension/alphabet-homogeneous container of hypervectors
//! - **Graph Engine** (`graph`): encodes an edge list into one hypervector, decodes edges by similarity
//! - **Classifier** (`classifier`): level-encoding nearest-prototype classifier with cross-validation and auto-tuning
//! - **Dataset I/O** (`dataset`): delimited-text loading and stratified splitting
//!
//! ## Library usage
//!
//! ```
//! use hdvsa::hypervector::{Alphabet, DistanceMethod, Hypervector};
//!
//! let a = Hypervector::random("A", 10_000, Alphabet::Bipolar, Some(1)).unwrap();
//! let b = Hypervector::random("B", 10_000, Alphabet::Bipolar, Some(2)).unwrap();
//! let d = a.distance(&b, DistanceMethod::Cosine).unwrap();
//! assert!((0.9..=1.1).contains(&d));
//!
//! let round_trip = a.bind(&b).unwrap().bind(&b).unwrap();
//! assert_eq!(a.elements(), round_trip.elements());
//! ```

pub mod classifier;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod hypervector;
pub mod space;
