//! Level-encoding classifier: quantise continuous features into a
//! hypervector codebook, encode samples, build per-class prototypes by
//! bundling, and predict by nearest prototype.

use std::collections::BTreeSet;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::error::{HvError, ModelError};
use crate::hypervector::{derive_seed, Alphabet, DistanceMethod, Hypervector};
use crate::space::Space;

type MResult<T> = std::result::Result<T, ModelError>;

/// Outcome of [`MLModel::predict`].
#[derive(Debug, Clone)]
pub struct Prediction {
    pub labels: Vec<String>,
    /// Count of error-mitigation retraining rounds layered on top; the base
    /// predictor never retrains, so this is always 0.
    pub retraining_iterations: usize,
    pub error_rate: Option<f64>,
}

/// Outcome of [`MLModel::cross_val_predict`].
#[derive(Debug, Clone, Copy)]
pub struct CvResult {
    pub mean_accuracy: f64,
    pub mean_error_rate: f64,
}

/// Outcome of [`auto_tune`].
#[derive(Debug, Clone, Copy)]
pub struct AutoTuneResult {
    pub size: usize,
    pub levels: usize,
    pub mean_accuracy: f64,
}

/// Outcome of [`stepwise_regression`].
#[derive(Debug, Clone)]
pub struct StepwiseResult {
    pub features: Vec<String>,
    pub score: f64,
}

/// Direction of [`stepwise_regression`]'s greedy search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepwiseMethod {
    Forward,
    Backward,
}

fn bucket(value: f64, min_value: f64, max_value: f64, gap: f64, levels: usize) -> usize {
    if value <= min_value {
        return 0;
    }
    if value >= max_value {
        return levels - 1;
    }
    for l in 0..levels {
        let left = min_value + (l as f64 - 1.0) * gap;
        let right = min_value + l as f64 * gap;
        if left <= value && value < right {
            return l;
        }
    }
    levels - 1
}

/// A level-encoding nearest-prototype classifier.
#[derive(Debug)]
pub struct MLModel {
    space: Space,
    dim: usize,
    levels: usize,
    classes: Vec<String>,
    seed: Option<u64>,
    rng: ChaCha8Rng,
    min_value: f64,
    max_value: f64,
    gap: f64,
    num_points: usize,
    point_labels: Vec<String>,
    fit: bool,
}

impl MLModel {
    /// Create a model with an empty codebook. Always bipolar internally
    /// (Q3): the nearest-prototype decision needs bind/distance behavior
    /// that only the bipolar alphabet gives cleanly.
    pub fn new(dim: usize, levels: usize, seed: Option<u64>) -> MResult<Self> {
        if levels < 2 {
            return Err(ModelError::LevelsTooSmall { actual: levels });
        }
        if dim < crate::hypervector::MIN_DIM {
            return Err(HvError::SizeTooSmall { actual: dim }.into());
        }
        let space = Space::create(dim, Alphabet::Bipolar);
        let rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or(0x6D6F_6465_6C00_0000));
        Ok(Self {
            space,
            dim,
            levels,
            classes: Vec::new(),
            seed,
            rng,
            min_value: 0.0,
            max_value: 0.0,
            gap: 0.0,
            num_points: 0,
            point_labels: Vec::new(),
            fit: false,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    fn build_level_codebook(&mut self) -> MResult<()> {
        let change = self.dim / 2;
        let next_level = (self.dim / 2) / self.levels;
        let mut base = vec![-1i32; self.dim];
        for level in 0..self.levels {
            let flips = if level == 0 { change } else { next_level };
            for _ in 0..flips {
                let idx = self.rng.gen_range(0..self.dim);
                base[idx] *= -1;
            }
            let name = format!("level_{level}");
            let vector = Hypervector::from_raw(name, self.dim, Alphabet::Bipolar, base.clone());
            self.space.insert(vector)?;
        }
        Ok(())
    }

    /// Build the level codebook, encode every training row, and tag each
    /// encoded point with its class label.
    #[instrument(skip(self, points, labels), fields(dim = self.dim, levels = self.levels))]
    pub fn fit(&mut self, points: &[Vec<f64>], labels: &[String]) -> MResult<()> {
        if points.len() < 3 {
            return Err(ModelError::TooFewRows { actual: points.len() });
        }
        if labels.len() != points.len() {
            return Err(ModelError::LabelMismatch {
                labels: labels.len(),
                points: points.len(),
            });
        }
        let mut classes = Vec::new();
        for l in labels {
            if !classes.contains(l) {
                classes.push(l.clone());
            }
        }
        if classes.len() < 2 {
            return Err(ModelError::TooFewClasses { actual: classes.len() });
        }

        let mut min_value = f64::INFINITY;
        let mut max_value = f64::NEG_INFINITY;
        for row in points {
            for &v in row {
                min_value = min_value.min(v);
                max_value = max_value.max(v);
            }
        }
        let gap = (max_value - min_value) / self.levels as f64;

        self.build_level_codebook()?;

        let levels_snapshot: Vec<Hypervector> = (0..self.levels)
            .map(|l| self.space.require(&format!("level_{l}")).cloned())
            .collect::<Result<Vec<_>, _>>()?;

        let encoded: Vec<Hypervector> = points
            .par_iter()
            .enumerate()
            .map(|(i, row)| -> MResult<Hypervector> {
                let mut sum = Hypervector::from_raw(format!("point_{i}"), self.dim, Alphabet::Bipolar, vec![0; self.dim]);
                for (j, &value) in row.iter().enumerate() {
                    let level = bucket(value, min_value, max_value, gap, self.levels);
                    let rolled = levels_snapshot[level].permute(j as i64);
                    sum = sum.bundle(&rolled)?;
                }
                Ok(sum)
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        for (i, mut sum) in encoded.into_iter().enumerate() {
            sum.add_tag(labels[i].clone());
            self.space.insert(sum)?;
        }

        self.min_value = min_value;
        self.max_value = max_value;
        self.gap = gap;
        self.num_points = points.len();
        self.point_labels = labels.to_vec();
        self.classes = classes;
        self.fit = true;
        info!(points = self.num_points, classes = self.classes.len(), "classifier fit complete");
        Ok(())
    }

    fn class_prototypes(&self, excluded: &BTreeSet<usize>) -> MResult<Vec<Hypervector>> {
        let mut prototypes = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            let mut proto: Option<Hypervector> = None;
            for i in 0..self.num_points {
                if excluded.contains(&i) || self.point_labels[i] != *class {
                    continue;
                }
                let point = self.space.require(&format!("point_{i}"))?;
                proto = Some(match proto {
                    None => point.clone(),
                    Some(acc) => acc.bundle(point)?,
                });
            }
            prototypes.push(proto.ok_or_else(|| ModelError::EmptyClass { class: class.clone() })?);
        }
        Ok(prototypes)
    }

    /// Predict the class of each test index using prototypes built from
    /// every other training point. Also reports the error rate against the
    /// ground-truth tags carried by the test points themselves.
    pub fn predict(&self, test_indices: &[usize]) -> MResult<Prediction> {
        if !self.fit {
            return Err(ModelError::NotFit);
        }
        if test_indices.is_empty() {
            return Err(ModelError::EmptyTestSet);
        }
        let excluded: BTreeSet<usize> = test_indices.iter().copied().collect();
        let prototypes = self.class_prototypes(&excluded)?;

        let mut labels = Vec::with_capacity(test_indices.len());
        let mut correct = 0usize;
        for &i in test_indices {
            let point = self.space.require(&format!("point_{i}"))?;
            let mut best_idx = 0;
            let mut best_dist = f64::INFINITY;
            for (ci, proto) in prototypes.iter().enumerate() {
                let d = point.distance(proto, DistanceMethod::Cosine)?;
                if d < best_dist {
                    best_dist = d;
                    best_idx = ci;
                }
            }
            let predicted = self.classes[best_idx].clone();
            if predicted == self.point_labels[i] {
                correct += 1;
            }
            labels.push(predicted);
        }
        let error_rate = 1.0 - (correct as f64 / test_indices.len() as f64);
        Ok(Prediction {
            labels,
            retraining_iterations: 0,
            error_rate: Some(error_rate),
        })
    }

    fn stratified_folds(&self, k: usize, seed: Option<u64>) -> Vec<Vec<usize>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.unwrap_or(0));
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
        for class in &self.classes {
            let mut idxs: Vec<usize> = (0..self.num_points).filter(|&i| self.point_labels[i] == *class).collect();
            for i in (1..idxs.len()).rev() {
                let j = rng.gen_range(0..=i);
                idxs.swap(i, j);
            }
            for (pos, idx) in idxs.into_iter().enumerate() {
                folds[pos % k].push(idx);
            }
        }
        for fold in folds.iter_mut() {
            fold.sort_unstable();
        }
        folds
    }

    /// k-fold cross-validated accuracy and error rate, stratified so each
    /// fold contains every class where possible.
    #[instrument(skip(self))]
    pub fn cross_val_predict(&self, k: usize, seed: Option<u64>) -> MResult<CvResult> {
        if !self.fit {
            return Err(ModelError::NotFit);
        }
        if k < 2 {
            return Err(ModelError::CvTooSmall { actual: k });
        }
        let folds = self.stratified_folds(k, seed);
        let mut accuracies = Vec::new();
        let mut error_rates = Vec::new();
        for fold in &folds {
            if fold.is_empty() {
                continue;
            }
            let result = self.predict(fold)?;
            let err = result.error_rate.expect("predict always reports an error rate");
            accuracies.push(1.0 - err);
            error_rates.push(err);
        }
        debug!(folds = accuracies.len(), "cross validation complete");
        Ok(CvResult {
            mean_accuracy: accuracies.iter().sum::<f64>() / accuracies.len() as f64,
            mean_error_rate: error_rates.iter().sum::<f64>() / error_rates.len() as f64,
        })
    }
}

/// Grid search over (size, levels) pairs, rebuilding a model for each
/// combination. Ties are broken by smaller size, then smaller levels.
#[instrument(skip(points, labels, sizes, levels_list))]
pub fn auto_tune(
    points: &[Vec<f64>],
    labels: &[String],
    sizes: &[usize],
    levels_list: &[usize],
    cv: usize,
    seed: Option<u64>,
) -> MResult<AutoTuneResult> {
    let mut best: Option<AutoTuneResult> = None;
    for (combo_idx, &size) in sizes.iter().enumerate() {
        for &levels in levels_list {
            let combo_seed = seed.map(|s| derive_seed(s, combo_idx as u64));
            let mut model = MLModel::new(size, levels, combo_seed)?;
            model.fit(points, labels)?;
            let cv_result = model.cross_val_predict(cv, combo_seed)?;
            let candidate = AutoTuneResult {
                size,
                levels,
                mean_accuracy: cv_result.mean_accuracy,
            };
            let better = match &best {
                None => true,
                Some(b) => {
                    candidate.mean_accuracy > b.mean_accuracy
                        || (candidate.mean_accuracy == b.mean_accuracy
                            && (candidate.size < b.size || (candidate.size == b.size && candidate.levels < b.levels)))
                }
            };
            if better {
                best = Some(candidate);
            }
        }
    }
    best.ok_or(ModelError::EmptyTestSet)
}

/// Map a feature name to its column index, for callers driving stepwise
/// selection over a named subset of columns.
pub fn feature_index(feature_names: &[String], name: &str) -> MResult<usize> {
    feature_names
        .iter()
        .position(|f| f == name)
        .ok_or_else(|| ModelError::UnknownFeature { feature: name.to_string() })
}

/// Forward or backward greedy feature selection by cross-validated accuracy.
/// Rebuilds and re-encodes the model from scratch on every candidate set,
/// since the permutation-by-column-index gives every surviving feature a
/// different role.
#[instrument(skip(points, feature_names, labels))]
pub fn stepwise_regression(
    points: &[Vec<f64>],
    feature_names: &[String],
    labels: &[String],
    method: StepwiseMethod,
    dim: usize,
    levels: usize,
    cv: usize,
    seed: Option<u64>,
) -> MResult<StepwiseResult> {
    let score = |selected: &[usize]| -> MResult<f64> {
        let subset: Vec<Vec<f64>> = points.iter().map(|row| selected.iter().map(|&j| row[j]).collect()).collect();
        let mut model = MLModel::new(dim, levels, seed)?;
        model.fit(&subset, labels)?;
        Ok(model.cross_val_predict(cv, seed)?.mean_accuracy)
    };

    let all_features: Vec<usize> = (0..feature_names.len()).collect();

    let selected = match method {
        StepwiseMethod::Forward => {
            let mut selected: Vec<usize> = Vec::new();
            let mut best_score = f64::NEG_INFINITY;
            loop {
                let mut round_best: Option<(usize, f64)> = None;
                for &f in &all_features {
                    if selected.contains(&f) {
                        continue;
                    }
                    let mut candidate = selected.clone();
                    candidate.push(f);
                    let s = score(&candidate)?;
                    if round_best.map(|(_, rs)| s > rs).unwrap_or(true) {
                        round_best = Some((f, s));
                    }
                }
                match round_best {
                    Some((f, s)) if s > best_score => {
                        selected.push(f);
                        best_score = s;
                    }
                    _ => break,
                }
            }
            selected
        }
        StepwiseMethod::Backward => {
            let mut selected: Vec<usize> = all_features.clone();
            let mut best_score = score(&selected)?;
            loop {
                if selected.len() <= 1 {
                    break;
                }
                let mut round_best: Option<(usize, f64)> = None;
                for &f in &selected {
                    let candidate: Vec<usize> = selected.iter().copied().filter(|&x| x != f).collect();
                    let s = score(&candidate)?;
                    if round_best.map(|(_, rs)| s > rs).unwrap_or(true) {
                        round_best = Some((f, s));
                    }
                }
                match round_best {
                    Some((f, s)) if s >= best_score => {
                        selected.retain(|&x| x != f);
                        best_score = s;
                    }
                    _ => break,
                }
            }
            let score_final = best_score;
            return Ok(StepwiseResult {
                features: selected.iter().map(|&i| feature_names[i].clone()).collect(),
                score: score_final,
            });
        }
    };

    let final_score = score(&selected)?;
    Ok(StepwiseResult {
        features: selected.iter().map(|&i| feature_names[i].clone()).collect(),
        score: final_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 10_000;

    fn toy_dataset() -> (Vec<Vec<f64>>, Vec<String>) {
        let points = vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![10.0, 10.0],
            vec![11.0, 11.0],
            vec![12.0, 12.0],
        ];
        let labels = vec!["x", "x", "x", "y", "y", "y"].into_iter().map(String::from).collect();
        (points, labels)
    }

    #[test]
    fn new_rejects_too_few_levels() {
        let err = MLModel::new(DIM, 1, Some(0)).unwrap_err();
        assert!(matches!(err, ModelError::LevelsTooSmall { actual: 1 }));
    }

    #[test]
    fn fit_rejects_too_few_rows() {
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        let err = m
            .fit(&[vec![0.0], vec![1.0]], &["x".to_string(), "y".to_string()])
            .unwrap_err();
        assert!(matches!(err, ModelError::TooFewRows { actual: 2 }));
    }

    #[test]
    fn fit_rejects_label_mismatch() {
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        let err = m
            .fit(&[vec![0.0], vec![1.0], vec![2.0]], &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, ModelError::LabelMismatch { .. }));
    }

    #[test]
    fn fit_rejects_single_class() {
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        let labels = vec!["x".to_string(), "x".to_string(), "x".to_string()];
        let err = m.fit(&[vec![0.0], vec![1.0], vec![2.0]], &labels).unwrap_err();
        assert!(matches!(err, ModelError::TooFewClasses { actual: 1 }));
    }

    /// P7: adjacent level vectors are close, endpoints are far.
    #[test]
    fn level_codebook_has_monotone_gradient() {
        let (points, labels) = toy_dataset();
        let mut m = MLModel::new(DIM, 10, Some(5)).unwrap();
        m.fit(&points, &labels).unwrap();
        let l0 = m.space.require("level_0").unwrap();
        let l9 = m.space.require("level_9").unwrap();
        let l1 = m.space.require("level_1").unwrap();
        let d_ends = l0.distance(l9, DistanceMethod::Hamming).unwrap();
        let d_adjacent = l0.distance(l1, DistanceMethod::Hamming).unwrap();
        assert!((d_ends - (DIM as f64 / 2.0)).abs() < DIM as f64 * 0.1);
        assert!(d_adjacent < d_ends / 2.0);
    }

    /// P8 / S3: fit then predict on training indices recovers labels with
    /// high accuracy on linearly-separable toy data.
    #[test]
    fn predict_on_training_points_is_accurate() {
        let (points, labels) = toy_dataset();
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        m.fit(&points, &labels).unwrap();
        let result = m.predict(&[0, 1, 2, 3, 4, 5]).unwrap();
        let err = result.error_rate.unwrap();
        assert!(err <= 0.1, "error rate was {err}");
    }

    #[test]
    fn predict_before_fit_is_missing_prerequisite() {
        let m = MLModel::new(DIM, 10, Some(0)).unwrap();
        let err = m.predict(&[0]).unwrap_err();
        assert!(matches!(err, ModelError::NotFit));
    }

    #[test]
    fn predict_with_empty_test_set_is_rejected() {
        let (points, labels) = toy_dataset();
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        m.fit(&points, &labels).unwrap();
        let err = m.predict(&[]).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTestSet));
    }

    #[test]
    fn cross_val_predict_rejects_small_k() {
        let (points, labels) = toy_dataset();
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        m.fit(&points, &labels).unwrap();
        let err = m.cross_val_predict(1, Some(0)).unwrap_err();
        assert!(matches!(err, ModelError::CvTooSmall { actual: 1 }));
    }

    /// S3: leave-one-out (k == n) cv accuracy is 1.0 on this toy data.
    #[test]
    fn leave_one_out_cv_is_perfect_on_separable_data() {
        let (points, labels) = toy_dataset();
        let mut m = MLModel::new(DIM, 10, Some(0)).unwrap();
        m.fit(&points, &labels).unwrap();
        let cv = m.cross_val_predict(points.len(), Some(0)).unwrap();
        assert!((cv.mean_accuracy - 1.0).abs() < 1e-9, "accuracy was {}", cv.mean_accuracy);
    }

    /// S4: auto-tune picks the best accuracy, tie-broken toward smaller
    /// size then smaller levels.
    #[test]
    fn auto_tune_picks_best_combo() {
        let (points, labels) = toy_dataset();
        let result = auto_tune(&points, &labels, &[10_000, 20_000], &[5, 10], 6, Some(0)).unwrap();
        assert!(result.mean_accuracy >= 0.9, "accuracy was {}", result.mean_accuracy);
    }

    #[test]
    fn feature_index_rejects_unknown_name() {
        let names = vec!["f1".to_string(), "f2".to_string()];
        let err = feature_index(&names, "ghost").unwrap_err();
        assert!(matches!(err, ModelError::UnknownFeature { .. }));
    }

    #[test]
    fn forward_stepwise_selects_informative_features() {
        let points = vec![
            vec![0.0, 5.0],
            vec![1.0, 5.0],
            vec![2.0, 5.0],
            vec![10.0, 5.0],
            vec![11.0, 5.0],
            vec![12.0, 5.0],
        ];
        let labels: Vec<String> = vec!["x", "x", "x", "y", "y", "y"].into_iter().map(String::from).collect();
        let names = vec!["informative".to_string(), "constant".to_string()];
        let result = stepwise_regression(&points, &names, &labels, StepwiseMethod::Forward, DIM, 10, 6, Some(0)).unwrap();
        assert!(result.features.contains(&"informative".to_string()));
    }
}
