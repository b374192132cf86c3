//! Model artifact loading.
//!
//! Artifacts are JSON documents exported by the training job, in one of two
//! shapes:
//!
//! - a **bundle**: `pipeline`, `feature_columns`, `numeric_features`,
//!   `categorical_features` and `model_name`, all required;
//! - a **bare model**: either a pipeline object (`estimator` plus optional
//!   `preprocessor` / `feature_names_in`) or a single estimator tagged by
//!   `kind`.

use crate::error::{ArtifactError, LoadError};
use crate::estimator::Estimator;
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Keys every bundle must carry.
pub const BUNDLE_KEYS: [&str; 5] = [
    "pipeline",
    "feature_columns",
    "numeric_features",
    "categorical_features",
    "model_name",
];

/// Pipeline plus the column schema it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub pipeline: Pipeline,
    pub feature_columns: Vec<String>,
    pub numeric_features: BTreeSet<String>,
    pub categorical_features: BTreeSet<String>,
    /// Display only
    pub model_name: String,
}

/// A loaded artifact. Read-only after load.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelArtifact {
    Bare(Pipeline),
    Bundle(Bundle),
}

impl ModelArtifact {
    /// Read and validate an artifact file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LoadError::ArtifactNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => LoadError::ArtifactNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let artifact = Self::from_json(&content).map_err(|source| LoadError::ArtifactMalformed {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            path = %path.display(),
            shape = artifact.shape_name(),
            model = artifact.model_name(),
            estimator = artifact.pipeline().estimator.kind_name(),
            columns = artifact.expected_columns().map(<[String]>::len).unwrap_or(0),
            "Loaded model artifact"
        );
        Ok(artifact)
    }

    /// Parse an artifact document.
    pub fn from_json(content: &str) -> Result<Self, ArtifactError> {
        let doc: serde_json::Value = serde_json::from_str(content)?;
        let obj = doc.as_object().ok_or(ArtifactError::NotAnObject)?;

        let artifact = if BUNDLE_KEYS.iter().any(|k| obj.contains_key(*k)) {
            if let Some(missing) = BUNDLE_KEYS.iter().find(|k| !obj.contains_key(**k)) {
                return Err(ArtifactError::MissingBundleKey(*missing));
            }
            let bundle: Bundle = decode(doc, "bundle")?;
            bundle.check_schema();
            ModelArtifact::Bundle(bundle)
        } else if obj.contains_key("estimator") {
            ModelArtifact::Bare(decode(doc, "pipeline")?)
        } else {
            let estimator: Estimator = decode(doc, "estimator")?;
            ModelArtifact::Bare(Pipeline::from(estimator))
        };

        artifact.pipeline().estimator.validate()?;
        Ok(artifact)
    }

    pub fn pipeline(&self) -> &Pipeline {
        match self {
            ModelArtifact::Bare(pipeline) => pipeline,
            ModelArtifact::Bundle(bundle) => &bundle.pipeline,
        }
    }

    pub fn bundle(&self) -> Option<&Bundle> {
        match self {
            ModelArtifact::Bundle(bundle) => Some(bundle),
            ModelArtifact::Bare(_) => None,
        }
    }

    /// Ordered input columns: the bundle schema, else whatever the pipeline
    /// declares.
    pub fn expected_columns(&self) -> Option<&[String]> {
        match self {
            ModelArtifact::Bundle(bundle) => Some(&bundle.feature_columns),
            ModelArtifact::Bare(pipeline) => pipeline.expected_columns(),
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            ModelArtifact::Bundle(bundle) => &bundle.model_name,
            ModelArtifact::Bare(pipeline) => pipeline.estimator.kind_name(),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            ModelArtifact::Bundle(_) => "bundle",
            ModelArtifact::Bare(_) => "bare",
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    doc: serde_json::Value,
    shape: &'static str,
) -> Result<T, ArtifactError> {
    serde_json::from_value(doc).map_err(|source| ArtifactError::Decode { shape, source })
}

impl Bundle {
    /// Typed columns outside `feature_columns` never reach the model.
    fn check_schema(&self) {
        for column in self
            .numeric_features
            .iter()
            .chain(self.categorical_features.iter())
        {
            if !self.feature_columns.contains(column) {
                warn!(
                    column = %column,
                    "Typed feature is not in feature_columns and will be ignored"
                );
            }
        }
    }
}
