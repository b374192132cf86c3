//! Feature importance attribution.
//!
//! Pairs the estimator's importance weights with human-readable feature
//! names. Names are recovered by trying an ordered list of resolvers; the
//! first one that yields a non-empty list wins. Count mismatches between
//! names and weights are repaired by truncation, never by failing.

use crate::artifact::ModelArtifact;
use crate::error::AttributionUnavailable;
use crate::record::InputRecord;
use crate::transform::FeatureNames;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Where a resolved name list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    /// Expanded from the preprocessing stage
    Transformers,
    /// The artifact's flat column list
    DeclaredColumns,
    /// The input record's own columns
    RecordColumns,
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameSource::Transformers => "preprocessor output",
            NameSource::DeclaredColumns => "declared columns",
            NameSource::RecordColumns => "input record columns",
        };
        f.write_str(s)
    }
}

/// Everything a resolver may look at.
pub struct ResolveContext<'a> {
    pub artifact: &'a ModelArtifact,
    pub record: Option<&'a InputRecord>,
}

/// One strategy for recovering feature names.
pub trait NameResolver {
    fn source(&self) -> NameSource;
    fn resolve(&self, ctx: &ResolveContext<'_>) -> Option<Vec<String>>;
}

/// Names reported by the pipeline's column transformer.
pub struct TransformerNames;

impl NameResolver for TransformerNames {
    fn source(&self) -> NameSource {
        NameSource::Transformers
    }

    fn resolve(&self, ctx: &ResolveContext<'_>) -> Option<Vec<String>> {
        let preprocessor = ctx.artifact.pipeline().preprocessor.as_ref()?;
        preprocessor.output_names(&[])
    }
}

/// `feature_columns` of a bundle or `feature_names_in` of a bare model.
pub struct DeclaredColumns;

impl NameResolver for DeclaredColumns {
    fn source(&self) -> NameSource {
        NameSource::DeclaredColumns
    }

    fn resolve(&self, ctx: &ResolveContext<'_>) -> Option<Vec<String>> {
        ctx.artifact.expected_columns().map(<[String]>::to_vec)
    }
}

/// Columns of the record the prediction ran on.
pub struct RecordColumns;

impl NameResolver for RecordColumns {
    fn source(&self) -> NameSource {
        NameSource::RecordColumns
    }

    fn resolve(&self, ctx: &ResolveContext<'_>) -> Option<Vec<String>> {
        ctx.record.map(|r| r.columns().to_vec())
    }
}

/// Resolvers in priority order.
pub fn default_resolvers() -> Vec<Box<dyn NameResolver + Send + Sync>> {
    vec![
        Box::new(TransformerNames),
        Box::new(DeclaredColumns),
        Box::new(RecordColumns),
    ]
}

/// Parallel name/weight arrays of equal length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceVector {
    names: Vec<String>,
    weights: Vec<f64>,
}

impl ImportanceVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// The `n` heaviest features, descending by weight. Ties keep input order.
    pub fn top(&self, n: usize) -> Vec<(&str, f64)> {
        let mut pairs: Vec<(&str, f64)> = self.iter().collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(n);
        pairs
    }
}

/// Name and weight counts that disagreed before truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthMismatch {
    pub names: usize,
    pub weights: usize,
}

impl fmt::Display for LengthMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} feature names but {} importance weights; showing the first {}",
            self.names,
            self.weights,
            self.names.min(self.weights)
        )
    }
}

/// Pair names with weights, truncating both to the shorter length.
pub fn align(
    mut names: Vec<String>,
    mut weights: Vec<f64>,
) -> (ImportanceVector, Option<LengthMismatch>) {
    let mismatch = (names.len() != weights.len()).then_some(LengthMismatch {
        names: names.len(),
        weights: weights.len(),
    });
    let n = names.len().min(weights.len());
    names.truncate(n);
    weights.truncate(n);
    (ImportanceVector { names, weights }, mismatch)
}

/// A displayable attribution result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub importances: ImportanceVector,
    pub source: NameSource,
    /// Set when names and weights had to be truncated
    pub mismatch: Option<LengthMismatch>,
}

/// Attribute with the default resolver order.
pub fn attribute(
    artifact: &ModelArtifact,
    record: Option<&InputRecord>,
) -> Result<Attribution, AttributionUnavailable> {
    attribute_with(artifact, record, &default_resolvers())
}

/// Attribute with an explicit resolver order.
pub fn attribute_with<R>(
    artifact: &ModelArtifact,
    record: Option<&InputRecord>,
    resolvers: &[R],
) -> Result<Attribution, AttributionUnavailable>
where
    R: AsRef<dyn NameResolver + Send + Sync>,
{
    let weights = artifact
        .pipeline()
        .estimator
        .feature_importances()
        .ok_or(AttributionUnavailable::NotSupported)?;

    let ctx = ResolveContext { artifact, record };
    let resolved = resolvers.iter().map(|r| r.as_ref()).find_map(|resolver| {
        match resolver.resolve(&ctx) {
            Some(names) if !names.is_empty() => Some((resolver.source(), names)),
            _ => {
                debug!(source = %resolver.source(), "Name resolver yielded nothing");
                None
            }
        }
    });

    let Some((source, names)) = resolved else {
        return Err(AttributionUnavailable::NoFeatureNames {
            weights: weights.len(),
        });
    };
    debug!(%source, names = names.len(), weights = weights.len(), "Resolved feature names");

    let (importances, mismatch) = align(names, weights);
    if let Some(m) = mismatch {
        warn!(
            names = m.names,
            weights = m.weights,
            "Feature name/importance count mismatch; truncating"
        );
    }
    if importances.is_empty() {
        return Err(AttributionUnavailable::NoFeatureNames { weights: 0 });
    }

    Ok(Attribution {
        importances,
        source,
        mismatch,
    })
}
