//! A named, dimension/alphabet-homogeneous container of hypervectors.
//!
//! A [`Space`] exclusively owns every [`Hypervector`] inserted into it:
//! there is no back-reference from vector to space, and removing or
//! dropping the `Space` drops its vectors with it.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use crate::error::SpaceError;
use crate::hypervector::{Alphabet, Hypervector};

type SpResult<T> = std::result::Result<T, SpaceError>;

/// A named-indexed container of same-dimension, same-alphabet hypervectors.
#[derive(Debug)]
pub struct Space {
    dim: usize,
    alphabet: Alphabet,
    vectors: BTreeMap<String, Hypervector>,
    order: Vec<String>,
}

impl Space {
    /// Create an empty space fixed to `dim` and `alphabet`.
    pub fn create(dim: usize, alphabet: Alphabet) -> Self {
        Self {
            dim,
            alphabet,
            vectors: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert a hypervector. Fails on dimension mismatch, alphabet mismatch,
    /// or a name collision.
    #[instrument(skip(self, vector), fields(space_dim = self.dim, name = vector.name()))]
    pub fn insert(&mut self, vector: Hypervector) -> SpResult<()> {
        let name = vector.name().to_string();
        if self.vectors.contains_key(&name) {
            return Err(SpaceError::DuplicateName { name });
        }
        if vector.dim() != self.dim {
            return Err(SpaceError::DimensionMismatch {
                name,
                space_dim: self.dim,
                vector_dim: vector.dim(),
            });
        }
        if vector.alphabet() != self.alphabet {
            return Err(SpaceError::AlphabetMismatch {
                name,
                space_alphabet: self.alphabet.to_string(),
                vector_alphabet: vector.alphabet().to_string(),
            });
        }
        debug!("inserted vector into space");
        self.order.push(name.clone());
        self.vectors.insert(name, vector);
        Ok(())
    }

    /// Look up a vector by name.
    pub fn get(&self, name: &str) -> Option<&Hypervector> {
        self.vectors.get(name)
    }

    /// Look up a vector by name, requiring it to exist.
    pub fn require(&self, name: &str) -> SpResult<&Hypervector> {
        self.get(name).ok_or_else(|| SpaceError::NotFound { name: name.to_string() })
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Hypervector> {
        self.vectors.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vectors.contains_key(name)
    }

    /// Enumerate vectors in insertion order.
    pub fn iterate(&self) -> impl Iterator<Item = &Hypervector> {
        self.order.iter().map(move |name| &self.vectors[name])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Remove a vector by name. Used by stepwise feature selection to drop a
    /// feature's contribution; the caller is responsible for rebuilding any
    /// derived vectors (codebooks, prototypes) that referenced it.
    pub fn remove(&mut self, name: &str) -> Option<Hypervector> {
        if let Some(v) = self.vectors.remove(name) {
            self.order.retain(|n| n != name);
            Some(v)
        } else {
            None
        }
    }
}
