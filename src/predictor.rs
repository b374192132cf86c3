//! Price prediction interface.
//!
//! [`PricePredictor`] runs the whole chain for one request: normalize the
//! raw inputs, predict, then attribute. Nothing is kept between requests;
//! the artifact is shared read-only.

use crate::artifact::ModelArtifact;
use crate::attribution::{attribute, Attribution};
use crate::error::{AttributionUnavailable, LoadError, PredictionError};
use crate::features::normalize_for;
use crate::record::{InputRecord, RawInputs};
use crate::report::ChartConfig;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Configuration for the price predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the model artifact
    pub model_path: PathBuf,

    /// Symbol prefixed to formatted prices
    pub currency_symbol: String,

    /// Compute and display feature importances
    pub show_importances: bool,

    /// Importance chart layout
    pub chart: ChartConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("best_model.json"),
            currency_symbol: "$".to_string(),
            show_importances: true,
            chart: ChartConfig::default(),
        }
    }
}

impl Config {
    /// Load a TOML configuration file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Outcome of one request.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    /// The record the model saw
    pub record: InputRecord,

    /// Price estimate or the reason it failed
    pub price: std::result::Result<f64, PredictionError>,

    /// Importances, when requested
    pub attribution: Option<std::result::Result<Attribution, AttributionUnavailable>>,
}

impl PredictionResult {
    pub fn is_success(&self) -> bool {
        self.price.is_ok()
    }
}

/// Runs requests against one loaded artifact.
#[derive(Debug, Clone)]
pub struct PricePredictor {
    artifact: Arc<ModelArtifact>,
    config: Config,
}

impl PricePredictor {
    /// Load the artifact at `model_path` and build a predictor.
    ///
    /// # Example
    /// ```no_run
    /// use house_price_inference::{Config, PricePredictor};
    /// use std::path::Path;
    ///
    /// let predictor =
    ///     PricePredictor::new(Path::new("best_model.json"), Config::default()).unwrap();
    /// ```
    pub fn new(model_path: &Path, config: Config) -> std::result::Result<Self, LoadError> {
        let artifact = ModelArtifact::load(model_path)?;
        Ok(Self::from_artifact(Arc::new(artifact), config))
    }

    /// Build a predictor over an already loaded artifact.
    pub fn from_artifact(artifact: Arc<ModelArtifact>, config: Config) -> Self {
        Self { artifact, config }
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shape raw inputs for the model.
    pub fn normalize(&self, raw: &RawInputs) -> InputRecord {
        normalize_for(&self.artifact, raw)
    }

    /// Predict one price for an already normalized record.
    pub fn predict(&self, record: &InputRecord) -> std::result::Result<f64, PredictionError> {
        predict(&self.artifact, record)
    }

    /// Run the full chain for one request.
    pub fn estimate(&self, raw: &RawInputs) -> PredictionResult {
        let record = self.normalize(raw);
        let price = self.predict(&record);
        if let Err(e) = &price {
            debug!(error = %e, "Prediction failed");
        }
        let attribution = self
            .config
            .show_importances
            .then(|| attribute(&self.artifact, Some(&record)));

        PredictionResult {
            record,
            price,
            attribution,
        }
    }
}

/// Run the artifact's pipeline on one record.
pub fn predict(
    artifact: &ModelArtifact,
    record: &InputRecord,
) -> std::result::Result<f64, PredictionError> {
    artifact.pipeline().predict(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::tests::bundle_json;
    use crate::record::Value;

    fn bundle_predictor(config: Config) -> PricePredictor {
        let artifact = ModelArtifact::from_json(&bundle_json().to_string()).unwrap();
        PricePredictor::from_artifact(Arc::new(artifact), config)
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.currency_symbol, "$");
        assert!(config.show_importances);
        assert_eq!(config.chart.top_n, 10);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            model_path = "models/house.json"
            show_importances = false

            [chart]
            top_n = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/house.json"));
        assert!(!config.show_importances);
        assert_eq!(config.chart.top_n, 5);
        assert_eq!(config.chart.bar_width, ChartConfig::default().bar_width);
        assert_eq!(config.currency_symbol, "$");
    }

    #[test]
    fn test_estimate_full_chain() {
        let predictor = bundle_predictor(Config::default());
        let raw = RawInputs::new()
            .with("LotArea", 8000.0)
            .with("OverallQual", "7")
            .with("Neighborhood", "CollgCr");

        let result = predictor.estimate(&raw);
        assert_eq!(result.price, Ok(5.0 * 8000.0 + 10000.0 * 7.0 + 20000.0 + 30000.0));
        // Linear models carry no importances.
        assert_eq!(
            result.attribution,
            Some(Err(AttributionUnavailable::NotSupported))
        );
        assert_eq!(result.record.get("OverallQual"), Some(&Value::Number(7.0)));
    }

    #[test]
    fn test_estimate_skips_attribution_when_disabled() {
        let config = Config {
            show_importances: false,
            ..Config::default()
        };
        let result = bundle_predictor(config).estimate(&RawInputs::new());
        assert!(result.attribution.is_none());
        // Missing categorical defaults to "" which the encoder ignores.
        assert_eq!(result.price, Ok(30000.0));
    }

    #[test]
    fn test_predict_is_idempotent() {
        let predictor = bundle_predictor(Config::default());
        let record = predictor.normalize(&RawInputs::new().with("LotArea", 9600.0));
        assert_eq!(predictor.predict(&record), predictor.predict(&record));
    }
}
