//! Error taxonomy for the inference chain.
//!
//! Loader failures are fatal to the session. Everything downstream of a
//! loaded artifact degrades into one of the recoverable variants below.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to produce a usable [`ModelArtifact`](crate::ModelArtifact).
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("model artifact not found: {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("model artifact {} is malformed: {source}", path.display())]
    ArtifactMalformed {
        path: PathBuf,
        #[source]
        source: ArtifactError,
    },

    #[error("failed to read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why an artifact document was rejected.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("top-level value must be an object")]
    NotAnObject,

    #[error("bundle is missing required key '{0}'")]
    MissingBundleKey(&'static str),

    #[error("invalid {shape}: {source}")]
    Decode {
        shape: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("random forest has no trees")]
    EmptyForest,

    #[error("tree {tree} splits on feature {feature} but the estimator has {n_features} features")]
    SplitOutOfRange {
        tree: usize,
        feature: usize,
        n_features: usize,
    },
}

/// Failure raised while running the pipeline on a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("column '{0}' is required by the model but missing from the input")]
    MissingColumn(String),

    #[error("could not convert value '{value}' of column '{column}' to a number")]
    TypeMismatch { column: String, value: String },

    #[error("found unknown category '{value}' in column '{column}' during transform")]
    UnseenCategory { column: String, value: String },

    #[error("model expects {expected} features but the input has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("transformer '{transformer}' is inconsistent: {reason}")]
    InvalidTransformer { transformer: String, reason: String },

    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
}

/// Reason no importance chart can be drawn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributionUnavailable {
    #[error("this model does not expose feature importances")]
    NotSupported,

    #[error("no feature names could be resolved for {weights} importance weights")]
    NoFeatureNames { weights: usize },
}
