//! Hypervector algebra: the fundamental unit of hyperdimensional computing.
//!
//! A [`Hypervector`] is a fixed-dimension integer array over one of two
//! alphabets (binary `{0,1}` or bipolar `{-1,+1}`). [`bind`](Hypervector::bind),
//! [`bundle`](Hypervector::bundle), [`subtract`](Hypervector::subtract) and
//! [`permute`](Hypervector::permute) are the algebraic primitives everything
//! else in this crate is built from; [`distance`](Hypervector::distance)
//! measures approximate similarity under noise.

use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::HvError;

/// Minimum dimension a hypervector may have. Below this, HDC's
/// noise-tolerance guarantees (the law-of-large-numbers argument behind
/// `bind`/`bundle`) no longer hold in any meaningful sense.
pub const MIN_DIM: usize = 10_000;

/// Result type for hypervector algebra operations.
pub type HvResult<T> = std::result::Result<T, HvError>;

/// The alphabet a hypervector's components are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alphabet {
    /// Components in `{0, 1}`.
    Binary,
    /// Components in `{-1, +1}`.
    Bipolar,
}

impl std::fmt::Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alphabet::Binary => write!(f, "binary"),
            Alphabet::Bipolar => write!(f, "bipolar"),
        }
    }
}

/// Distance metric used by [`Hypervector::distance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMethod {
    /// `1 - cos(theta)`, in `[0, 2]`.
    Cosine,
    /// Count of differing components, in `[0, dim]`.
    Hamming,
    /// Euclidean (L2) distance.
    Euclidean,
}

impl std::str::FromStr for DistanceMethod {
    type Err = HvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine" => Ok(DistanceMethod::Cosine),
            "hamming" => Ok(DistanceMethod::Hamming),
            "euclidean" => Ok(DistanceMethod::Euclidean),
            other => Err(HvError::UnknownDistanceMethod { method: other.to_string() }),
        }
    }
}

/// A hypervector: a named, tagged, fixed-dimension integer array.
///
/// `elements` is always `Vec<i32>` rather than a bit-packed representation,
/// because intermediate results of `bundle`/`subtract` may temporarily
/// leave the alphabet before a caller calls [`normalize`](Hypervector::normalize).
#[derive(Debug, Clone)]
pub struct Hypervector {
    name: String,
    dim: usize,
    alphabet: Alphabet,
    elements: Vec<i32>,
    tags: BTreeSet<String>,
    seed: Option<u64>,
    memory: Option<Box<Hypervector>>,
}

/// Deterministically mix a master seed with a task index into a fresh u64
/// seed (splitmix64), so parallel tasks that each need their own RNG stream
/// still produce bit-identical output regardless of scheduling order.
pub(crate) fn derive_seed(master: u64, index: u64) -> u64 {
    let mut z = master.wrapping_add(index.wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn check_dim(dim: usize) -> HvResult<()> {
    if dim < MIN_DIM {
        return Err(HvError::SizeTooSmall { actual: dim });
    }
    Ok(())
}

fn check_compatible(a: &Hypervector, b: &Hypervector) -> HvResult<()> {
    if a.dim != b.dim {
        return Err(HvError::DimensionMismatch {
            expected: a.dim,
            actual: b.dim,
        });
    }
    if a.alphabet != b.alphabet {
        return Err(HvError::AlphabetMismatch {
            expected: a.alphabet.to_string(),
            actual: b.alphabet.to_string(),
        });
    }
    Ok(())
}

impl Hypervector {
    /// Create a hypervector from already-computed raw elements, bypassing
    /// random generation. Used internally by the algebra operators and by
    /// the level-vector/weight-vector codebook builders. The caller is
    /// responsible for `elements.len() == dim`.
    pub(crate) fn from_raw(name: impl Into<String>, dim: usize, alphabet: Alphabet, elements: Vec<i32>) -> Self {
        debug_assert_eq!(elements.len(), dim);
        Self {
            name: name.into(),
            dim,
            alphabet,
            elements,
            tags: BTreeSet::new(),
            seed: None,
            memory: None,
        }
    }

    /// Generate a new random hypervector.
    ///
    /// Same `seed` + `dim` + `alphabet` yields bit-identical elements.
    /// `seed = None` falls back to a wall-clock seed (the "unseeded"
    /// sentinel of spec §5).
    pub fn random(name: impl Into<String>, dim: usize, alphabet: Alphabet, seed: Option<u64>) -> HvResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(HvError::EmptyName);
        }
        check_dim(dim)?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or_else(wall_clock_seed));
        let elements = (0..dim)
            .map(|_| {
                let bit = rng.gen_range(0..2u32);
                match alphabet {
                    Alphabet::Binary => bit as i32,
                    Alphabet::Bipolar => if bit == 0 { -1 } else { 1 },
                }
            })
            .collect();

        Ok(Self {
            name,
            dim,
            alphabet,
            elements,
            tags: BTreeSet::new(),
            seed,
            memory: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn elements(&self) -> &[i32] {
        &self.elements
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Attach a "memory" sub-vector to this node, exclusively owned by it
    /// (spec §9: per-node memory is owned by the node, not re-inserted into
    /// the Space under a derived name).
    pub fn attach_memory(&mut self, memory: Hypervector) {
        self.memory = Some(Box::new(memory));
    }

    pub fn memory(&self) -> Option<&Hypervector> {
        self.memory.as_deref()
    }

    /// Element-wise product. Self-inverse in bipolar: `bind(bind(a,b),b) == a`.
    pub fn bind(&self, other: &Hypervector) -> HvResult<Hypervector> {
        check_compatible(self, other)?;
        let elements = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| a * b)
            .collect();
        Ok(Hypervector::from_raw("bind", self.dim, self.alphabet, elements))
    }

    /// Element-wise sum. May leave the alphabet; call [`normalize`](Self::normalize) before
    /// treating the result as alphabet-valid.
    pub fn bundle(&self, other: &Hypervector) -> HvResult<Hypervector> {
        check_compatible(self, other)?;
        let elements = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(Hypervector::from_raw("bundle", self.dim, self.alphabet, elements))
    }

    /// Element-wise difference. Used by error mitigation to weaken a component.
    pub fn subtract(&self, other: &Hypervector) -> HvResult<Hypervector> {
        check_compatible(self, other)?;
        let elements = self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| a - b)
            .collect();
        Ok(Hypervector::from_raw("subtract", self.dim, self.alphabet, elements))
    }

    /// Cyclic rotation: `result[(i + k) mod dim] = self[i]`. `k` may be negative.
    pub fn permute(&self, k: i64) -> Hypervector {
        let dim = self.dim as i64;
        let shift = ((k % dim) + dim) % dim;
        let shift = shift as usize;
        let mut elements = vec![0i32; self.dim];
        for (i, &v) in self.elements.iter().enumerate() {
            elements[(i + shift) % self.dim] = v;
        }
        Hypervector::from_raw("permute", self.dim, self.alphabet, elements)
    }

    /// Threshold each element back into the alphabet: `>0 -> 1`,
    /// otherwise `0` (binary) or `-1` (bipolar).
    pub fn normalize(&mut self) {
        let floor = match self.alphabet {
            Alphabet::Binary => 0,
            Alphabet::Bipolar => -1,
        };
        for e in self.elements.iter_mut() {
            *e = if *e > 0 { 1 } else { floor };
        }
    }

    /// Distance to another hypervector under the given metric.
    pub fn distance(&self, other: &Hypervector, method: DistanceMethod) -> HvResult<f64> {
        check_compatible(self, other)?;
        let d = match method {
            DistanceMethod::Cosine => {
                let mut dot = 0i64;
                let mut norm_a = 0i64;
                let mut norm_b = 0i64;
                for (&a, &b) in self.elements.iter().zip(other.elements.iter()) {
                    dot += (a as i64) * (b as i64);
                    norm_a += (a as i64) * (a as i64);
                    norm_b += (b as i64) * (b as i64);
                }
                if norm_a == 0 || norm_b == 0 {
                    1.0
                } else {
                    1.0 - (dot as f64) / ((norm_a as f64).sqrt() * (norm_b as f64).sqrt())
                }
            }
            DistanceMethod::Hamming => self
                .elements
                .iter()
                .zip(other.elements.iter())
                .filter(|(a, b)| a != b)
                .count() as f64,
            DistanceMethod::Euclidean => {
                let sum_sq: i64 = self
                    .elements
                    .iter()
                    .zip(other.elements.iter())
                    .map(|(&a, &b)| {
                        let diff = (a as i64) - (b as i64);
                        diff * diff
                    })
                    .sum();
                (sum_sq as f64).sqrt()
            }
        };
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hv(seed: u64, dim: usize, alphabet: Alphabet) -> Hypervector {
        Hypervector::random("v", dim, alphabet, Some(seed)).unwrap()
    }

    #[test]
    fn size_below_minimum_is_rejected() {
        let err = Hypervector::random("v", 100, Alphabet::Bipolar, Some(0)).unwrap_err();
        assert!(matches!(err, HvError::SizeTooSmall { actual: 100 }));
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = Hypervector::random("", MIN_DIM, Alphabet::Bipolar, Some(0)).unwrap_err();
        assert!(matches!(err, HvError::EmptyName));
    }

    #[test]
    fn same_seed_is_deterministic() {
        let a = hv(42, MIN_DIM, Alphabet::Bipolar);
        let b = hv(42, MIN_DIM, Alphabet::Bipolar);
        assert_eq!(a.elements(), b.elements());
    }

    #[test]
    fn binary_alphabet_is_zero_one() {
        let v = hv(1, MIN_DIM, Alphabet::Binary);
        assert!(v.elements().iter().all(|&e| e == 0 || e == 1));
    }

    #[test]
    fn bipolar_alphabet_is_pm_one() {
        let v = hv(1, MIN_DIM, Alphabet::Bipolar);
        assert!(v.elements().iter().all(|&e| e == -1 || e == 1));
    }

    /// P1: bind is self-inverse in bipolar.
    #[test]
    fn bind_is_self_inverse_in_bipolar() {
        let a = hv(1, MIN_DIM, Alphabet::Bipolar);
        let k = hv(2, MIN_DIM, Alphabet::Bipolar);
        let bound = a.bind(&k).unwrap();
        let recovered = bound.bind(&k).unwrap();
        assert_eq!(a.elements(), recovered.elements());
    }

    /// P2: permute composes additively.
    #[test]
    fn permute_composes() {
        let a = hv(1, MIN_DIM, Alphabet::Bipolar);
        let composed = a.permute(37).permute(-12);
        let direct = a.permute(25);
        assert_eq!(composed.elements(), direct.elements());
    }

    /// P3: cosine(H,H) == 0, symmetric, independent random vectors ~1.
    #[test]
    fn cosine_self_distance_is_zero() {
        let a = hv(1, MIN_DIM, Alphabet::Bipolar);
        let d = a.distance(&a, DistanceMethod::Cosine).unwrap();
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = hv(1, MIN_DIM, Alphabet::Bipolar);
        let b = hv(2, MIN_DIM, Alphabet::Bipolar);
        let d_ab = a.distance(&b, DistanceMethod::Cosine).unwrap();
        let d_ba = b.distance(&a, DistanceMethod::Cosine).unwrap();
        assert!((d_ab - d_ba).abs() < 1e-9);
    }

    #[test]
    fn independent_bipolar_vectors_are_roughly_orthogonal() {
        let mut total = 0.0;
        let trials = 100;
        for i in 0..trials {
            let a = Hypervector::random("a", MIN_DIM, Alphabet::Bipolar, Some(i * 2)).unwrap();
            let b = Hypervector::random("b", MIN_DIM, Alphabet::Bipolar, Some(i * 2 + 1)).unwrap();
            total += a.distance(&b, DistanceMethod::Cosine).unwrap();
        }
        let mean = total / trials as f64;
        assert!((0.9..=1.1).contains(&mean), "mean cosine distance was {mean}");
    }

    #[test]
    fn s1_scenario_bind_and_distance() {
        let a = Hypervector::random("A", 10_000, Alphabet::Bipolar, Some(1)).unwrap();
        let b = Hypervector::random("B", 10_000, Alphabet::Bipolar, Some(2)).unwrap();
        let d = a.distance(&b, DistanceMethod::Cosine).unwrap();
        assert!((0.98..=1.02).contains(&d), "distance was {d}");
        let round_trip = a.bind(&b).unwrap().bind(&b).unwrap();
        assert_eq!(a.elements(), round_trip.elements());
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let a = hv(1, MIN_DIM, Alphabet::Bipolar);
        let b = hv(2, MIN_DIM + 1, Alphabet::Bipolar);
        assert!(matches!(a.bind(&b), Err(HvError::DimensionMismatch { .. })));
    }

    #[test]
    fn alphabet_mismatch_is_rejected() {
        let a = hv(1, MIN_DIM, Alphabet::Bipolar);
        let b = hv(2, MIN_DIM, Alphabet::Binary);
        assert!(matches!(a.bind(&b), Err(HvError::AlphabetMismatch { .. })));
    }

    #[test]
    fn normalize_bipolar_clamps_to_alphabet() {
        let mut v = Hypervector::from_raw("x", MIN_DIM, Alphabet::Bipolar, vec![3, -2, 0, 1]);
        v.elements.resize(MIN_DIM, -4);
        v.normalize();
        assert!(v.elements().iter().all(|&e| e == 1 || e == -1));
        assert_eq!(v.elements()[2], -1); // zero normalizes to the bipolar floor
    }

    #[test]
    fn derive_seed_is_deterministic_and_index_sensitive() {
        let a = derive_seed(7, 3);
        let b = derive_seed(7, 3);
        let c = derive_seed(7, 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn unknown_distance_method_is_rejected() {
        let err = "manhattan".parse::<DistanceMethod>().unwrap_err();
        assert!(matches!(err, HvError::UnknownDistanceMethod { .. }));
    }
}
