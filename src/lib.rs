//! House price inference from a pre-trained regression artifact.
//!
//! Loads a model artifact exported by a training job, shapes user-entered
//! property attributes into the record the model expects, predicts a price,
//! and pairs the model's feature importances with readable feature names.

pub mod artifact;
pub mod attribution;
pub mod error;
pub mod estimator;
pub mod features;
pub mod pipeline;
pub mod predictor;
pub mod record;
pub mod report;
pub mod state;
pub mod transform;
pub mod tree;

pub use artifact::{Bundle, ModelArtifact};
pub use attribution::{align, attribute, Attribution, ImportanceVector, LengthMismatch, NameSource};
pub use error::{ArtifactError, AttributionUnavailable, LoadError, PredictionError};
pub use features::{normalize, normalize_for, ColumnSchema};
pub use predictor::{predict, Config, PredictionResult, PricePredictor};
pub use record::{InputRecord, RawInputs, Value};

/// Library-wide error type.
pub type Result<T> = anyhow::Result<T>;
