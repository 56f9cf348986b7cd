//! Labelled dataset loading and stratified splitting — the external,
//! non-HDC collaborator the core relies on for turning a delimited text
//! file into a numeric matrix plus class labels.

use std::fs;
use std::path::Path;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::error::DatasetError;

type DResult<T> = std::result::Result<T, DatasetError>;

/// A loaded dataset: sample ids, feature names, the n x d numeric matrix,
/// and each row's class label.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub samples: Vec<String>,
    pub features: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
    pub classes: Vec<String>,
}

/// Parse a delimited text file: header `Sample_ID <feat>... [# ...]`, then
/// one row per sample of `<id> <num>... <class>`. Lines starting with `#`
/// and blank lines are ignored. Non-numeric feature cells are fatal.
#[instrument(skip(sep), fields(path = %path.as_ref().display()))]
pub fn load_dataset(path: impl AsRef<Path>, sep: &str) -> DResult<Dataset> {
    let path_ref = path.as_ref();
    let path_str = path_ref.display().to_string();
    let text = fs::read_to_string(path_ref).map_err(|source| DatasetError::Io {
        path: path_str.clone(),
        source,
    })?;

    let mut lines = text.lines();
    let header = lines.next().ok_or_else(|| DatasetError::EmptyFile { path: path_str.clone() })?;

    let mut header_fields = header.split(sep);
    header_fields.next(); // Sample_ID column
    let mut features = Vec::new();
    for field in header_fields {
        if field.is_empty() {
            continue;
        }
        if field == "#" {
            break;
        }
        features.push(field.to_string());
    }
    let num_features = features.len();

    let mut samples = Vec::new();
    let mut matrix = Vec::new();
    let mut classes = Vec::new();

    for (offset, raw_line) in lines.enumerate() {
        let line_num = offset + 2; // 1-indexed, after the header
        if raw_line.is_empty() || raw_line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = raw_line.split(sep).collect();
        if fields.is_empty() {
            continue;
        }
        let (sample_id, rest) = fields.split_first().expect("fields is non-empty");
        if rest.len() != num_features + 1 {
            return Err(DatasetError::FieldCountMismatch {
                line: line_num,
                expected: num_features + 1,
                actual: rest.len(),
            });
        }
        let mut row = Vec::with_capacity(num_features);
        for (col_idx, raw_value) in rest[..num_features].iter().enumerate() {
            let value: f64 = raw_value.parse().map_err(|_| DatasetError::NonNumeric {
                line: line_num,
                column: features[col_idx].clone(),
                value: raw_value.to_string(),
            })?;
            row.push(value);
        }
        let class_label = rest[num_features].to_string();

        samples.push(sample_id.to_string());
        matrix.push(row);
        classes.push(class_label);
    }

    info!(samples = samples.len(), features = num_features, "dataset loaded");
    Ok(Dataset {
        samples,
        features,
        matrix,
        classes,
    })
}

/// Stratified percentage split: independently for each class, choose
/// `floor(percentage * count(class) / 100)` indices uniformly without
/// replacement; return their union, sorted ascending.
#[instrument(skip(labels))]
pub fn percentage_split(labels: &[String], percentage: f64, seed: u64) -> DResult<Vec<usize>> {
    if !(0.0..=100.0).contains(&percentage) || percentage <= 0.0 {
        return Err(DatasetError::BadPercentage { actual: percentage });
    }

    let mut unique = Vec::new();
    for l in labels {
        if !unique.contains(l) {
            unique.push(l.clone());
        }
    }
    if unique.len() < 2 {
        return Err(DatasetError::TooFewClasses { actual: unique.len() });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut selection = Vec::new();
    for class in &unique {
        let mut class_indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == class)
            .map(|(i, _)| i)
            .collect();
        let take = ((percentage * class_indices.len() as f64) / 100.0).floor() as usize;
        // Fisher-Yates partial shuffle, then take the first `take` indices.
        let n = class_indices.len();
        for i in (1..n).rev() {
            let j = rng.gen_range(0..=i);
            class_indices.swap(i, j);
        }
        selection.extend(class_indices.into_iter().take(take));
    }
    selection.sort_unstable();
    Ok(selection)
}
