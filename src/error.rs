//! Rich diagnostic error types for the hdvsa library.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. Every variant also maps to
//! exactly one of the four error kinds this system recognizes at the
//! contract level: `ContractViolation`, `MissingPrerequisite`, `DataShape`,
//! `Io`. None of these are retried internally.

use miette::Diagnostic;
use thiserror::Error;

/// The coarse kind of a failure, independent of which subsystem raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input outside a declared range or contract (dim, alphabet, duplicate name, ...).
    ContractViolation,
    /// An operation that requires a prior `fit`/`insert` was called too early.
    MissingPrerequisite,
    /// Row/label counts, non-numeric cells, empty test sets, too few classes/rows.
    DataShape,
    /// File not found or unreadable.
    Io,
}

/// Top-level error type for the hdvsa library.
#[derive(Debug, Error, Diagnostic)]
pub enum HdcError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Hv(#[from] HvError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Space(#[from] SpaceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dataset(#[from] DatasetError),
}

impl HdcError {
    /// The coarse kind this error belongs to, per spec §7.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HdcError::Hv(e) => e.kind(),
            HdcError::Space(e) => e.kind(),
            HdcError::Graph(e) => e.kind(),
            HdcError::Model(e) => e.kind(),
            HdcError::Dataset(e) => e.kind(),
        }
    }
}

/// Convenience alias for functions returning hdvsa results.
pub type HdcResult<T> = std::result::Result<T, HdcError>;

// ---------------------------------------------------------------------------
// Hypervector algebra errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum HvError {
    #[error("dimension must be >= 10000, got {actual}")]
    #[diagnostic(
        code(hdc::hv::size_too_small),
        help("Hypervectors need at least 10,000 components for HDC's noise-tolerance guarantees to hold. Use a larger `dim`.")
    )]
    SizeTooSmall { actual: usize },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(hdc::hv::dim_mismatch),
        help("Both operands of an algebra operation must share the same dimension. Check how each was created.")
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("alphabet mismatch: expected {expected:?}, got {actual:?}")]
    #[diagnostic(
        code(hdc::hv::alphabet_mismatch),
        help("Both operands must use the same alphabet (binary or bipolar).")
    )]
    AlphabetMismatch { expected: String, actual: String },

    #[error("vector name must not be empty")]
    #[diagnostic(code(hdc::hv::empty_name), help("Give the hypervector a non-empty name before inserting it into a Space."))]
    EmptyName,

    #[error("distance method \"{method}\" is not supported")]
    #[diagnostic(
        code(hdc::hv::unknown_distance),
        help("Supported distance methods are: cosine, hamming, euclidean.")
    )]
    UnknownDistanceMethod { method: String },
}

impl HvError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ContractViolation
    }
}

// ---------------------------------------------------------------------------
// Space errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SpaceError {
    #[error("vector \"{name}\" already exists in this space")]
    #[diagnostic(
        code(hdc::space::duplicate_name),
        help("Names must be unique within a Space. Pick a different name, or look up the existing vector with `get`.")
    )]
    DuplicateName { name: String },

    #[error("dimension mismatch inserting \"{name}\": space is {space_dim}, vector is {vector_dim}")]
    #[diagnostic(
        code(hdc::space::dim_mismatch),
        help("Every vector inserted into a Space must share the Space's dimension.")
    )]
    DimensionMismatch {
        name: String,
        space_dim: usize,
        vector_dim: usize,
    },

    #[error("alphabet mismatch inserting \"{name}\": space is {space_alphabet:?}, vector is {vector_alphabet:?}")]
    #[diagnostic(
        code(hdc::space::alphabet_mismatch),
        help("Every vector inserted into a Space must share the Space's alphabet.")
    )]
    AlphabetMismatch {
        name: String,
        space_alphabet: String,
        vector_alphabet: String,
    },

    #[error("vector \"{name}\" not found in space")]
    #[diagnostic(
        code(hdc::space::not_found),
        help("Insert the vector first, or check the name for typos.")
    )]
    NotFound { name: String },
}

impl SpaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpaceError::NotFound { .. } => ErrorKind::MissingPrerequisite,
            _ => ErrorKind::ContractViolation,
        }
    }
}

// ---------------------------------------------------------------------------
// Graph engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("must provide at least one edge")]
    #[diagnostic(code(hdc::graph::no_edges), help("`fit` requires a non-empty edge list."))]
    NoEdges,

    #[error("graph is weighted but edge ({u}, {v}) has no weight")]
    #[diagnostic(
        code(hdc::graph::missing_weight),
        help("Every edge of a weighted graph needs a weight in [0, 1).")
    )]
    MissingWeight { u: String, v: String },

    #[error("graph is unweighted but edge ({u}, {v}) specifies a weight")]
    #[diagnostic(
        code(hdc::graph::unexpected_weight),
        help("Unweighted graphs must use the unweighted sentinel for every edge.")
    )]
    UnexpectedWeight { u: String, v: String },

    #[error("edge weight {weight} is out of range [0, 1)")]
    #[diagnostic(code(hdc::graph::weight_out_of_range), help("Weighted-graph edge weights must fall in [0, 1)."))]
    WeightOutOfRange { weight: f64 },

    #[error("graph has not been fit yet")]
    #[diagnostic(
        code(hdc::graph::not_fit),
        help("Call `Graph::fit` with the edge list before querying edges or computing error rates.")
    )]
    NotFit,

    #[error("node \"{name}\" is not in the graph")]
    #[diagnostic(
        code(hdc::graph::node_not_found),
        help("Query only nodes that appeared in the edge list passed to `fit`.")
    )]
    NodeNotFound { name: String },

    #[error("no weight vector for bucket {weight}")]
    #[diagnostic(
        code(hdc::graph::weight_vector_missing),
        help("The queried weight does not land in any discretised bucket built by `fit`.")
    )]
    WeightVectorMissing { weight: f64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hv(#[from] HvError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Space(#[from] SpaceError),
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::NotFit | GraphError::NodeNotFound { .. } | GraphError::WeightVectorMissing { .. } => {
                ErrorKind::MissingPrerequisite
            }
            GraphError::Hv(e) => e.kind(),
            GraphError::Space(e) => e.kind(),
            _ => ErrorKind::ContractViolation,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier (MLModel) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("levels must be >= 2, got {actual}")]
    #[diagnostic(code(hdc::model::levels_too_small), help("A level codebook needs at least 2 levels to be meaningful."))]
    LevelsTooSmall { actual: usize },

    #[error("not enough training rows: need >= 3, got {actual}")]
    #[diagnostic(code(hdc::model::too_few_rows), help("Provide at least 3 labelled training rows."))]
    TooFewRows { actual: usize },

    #[error("labels length ({labels}) does not match points length ({points})")]
    #[diagnostic(code(hdc::model::label_mismatch), help("Every training row needs exactly one class label."))]
    LabelMismatch { labels: usize, points: usize },

    #[error("need >= 2 distinct classes, got {actual}")]
    #[diagnostic(code(hdc::model::too_few_classes), help("Supervised classification requires at least two distinct labels."))]
    TooFewClasses { actual: usize },

    #[error("class \"{class}\" has no training samples")]
    #[diagnostic(
        code(hdc::model::empty_class),
        help("Every class named in the training labels must have at least one encoded sample.")
    )]
    EmptyClass { class: String },

    #[error("no test indices provided")]
    #[diagnostic(code(hdc::model::empty_test_set), help("Provide at least one index to predict on."))]
    EmptyTestSet,

    #[error("model has not been fit yet")]
    #[diagnostic(
        code(hdc::model::not_fit),
        help("Call `MLModel::fit` before predicting, cross-validating, or tuning.")
    )]
    NotFit,

    #[error("cv fold count must be >= 2, got {actual}")]
    #[diagnostic(code(hdc::model::cv_too_small), help("Cross-validation needs at least 2 folds."))]
    CvTooSmall { actual: usize },

    #[error("feature \"{feature}\" is not a column of the training matrix")]
    #[diagnostic(
        code(hdc::model::unknown_feature),
        help("Stepwise selection only operates over the feature names passed alongside the training matrix.")
    )]
    UnknownFeature { feature: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Hv(#[from] HvError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Space(#[from] SpaceError),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::NotFit => ErrorKind::MissingPrerequisite,
            ModelError::TooFewRows { .. }
            | ModelError::LabelMismatch { .. }
            | ModelError::TooFewClasses { .. }
            | ModelError::EmptyClass { .. }
            | ModelError::EmptyTestSet => ErrorKind::DataShape,
            ModelError::Hv(e) => e.kind(),
            ModelError::Space(e) => e.kind(),
            _ => ErrorKind::ContractViolation,
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset loader / split errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DatasetError {
    #[error("could not read dataset file {path}: {source}")]
    #[diagnostic(code(hdc::dataset::io), help("Check the path exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset file {path} is empty")]
    #[diagnostic(code(hdc::dataset::empty_file), help("A dataset file needs at least a header line."))]
    EmptyFile { path: String },

    #[error("non-numeric value \"{value}\" at line {line}, column \"{column}\"")]
    #[diagnostic(
        code(hdc::dataset::non_numeric),
        help("Every feature cell must parse as a floating point number.")
    )]
    NonNumeric { line: usize, column: String, value: String },

    #[error("line {line} has {actual} feature fields, expected {expected}")]
    #[diagnostic(
        code(hdc::dataset::field_count_mismatch),
        help("Every data row must have exactly one field per feature column, plus a trailing class label.")
    )]
    FieldCountMismatch { line: usize, expected: usize, actual: usize },

    #[error("percentage must be in (0, 100], got {actual}")]
    #[diagnostic(code(hdc::dataset::bad_percentage), help("Pass a percentage strictly greater than 0 and at most 100."))]
    BadPercentage { actual: f64 },

    #[error("labels must contain at least 2 distinct classes, got {actual}")]
    #[diagnostic(code(hdc::dataset::too_few_classes), help("Stratified splitting needs at least two classes."))]
    TooFewClasses { actual: usize },
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::Io { .. } => ErrorKind::Io,
            DatasetError::EmptyFile { .. } | DatasetError::NonNumeric { .. } | DatasetError::FieldCountMismatch { .. } => {
                ErrorKind::DataShape
            }
            DatasetError::BadPercentage { .. } => ErrorKind::ContractViolation,
            DatasetError::TooFewClasses { .. } => ErrorKind::DataShape,
        }
    }
}
