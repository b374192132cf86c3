//! `house-price` command line front end.

use anyhow::Context;
use clap::{Parser, Subcommand};
use house_price_inference::report::render;
use house_price_inference::{state, Config, PricePredictor, RawInputs, Value};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "house-price")]
#[command(version)]
#[command(about = "Predict house prices from a trained model artifact", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true, env = "HOUSE_PRICE_CONFIG")]
    config: Option<PathBuf>,

    /// Model artifact path (overrides the config file)
    #[arg(short, long, global = true, env = "HOUSE_PRICE_MODEL")]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict a price for one property
    Predict {
        /// Field value as NAME=VALUE; repeatable
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,

        /// JSON object of field values, applied before --field entries
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Skip the feature importance chart
        #[arg(long)]
        no_importances: bool,

        /// Number of features shown in the chart
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Describe the loaded model artifact
    Inspect,
}

fn parse_field(s: &str) -> Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    let value = match value.trim().parse::<f64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::Text(value.to_string()),
    };
    Ok((name.to_string(), value))
}

fn read_request(path: &Path) -> anyhow::Result<RawInputs> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request {}", path.display()))?;
    let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("request {} must be a JSON object", path.display()))?;

    let mut raw = RawInputs::new();
    for (name, value) in fields {
        let value = match value {
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Null => continue,
            other => Value::Text(other.to_string()),
        };
        raw.insert(name, value);
    }
    Ok(raw)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(model) = cli.model {
        config.model_path = model;
    }

    // Loader failures end the session before any request is served.
    let artifact = state::init(&config.model_path)?;

    match cli.command {
        Commands::Predict {
            fields,
            input,
            no_importances,
            top_n,
        } => {
            if no_importances {
                config.show_importances = false;
            }
            if let Some(n) = top_n {
                config.chart.top_n = n;
            }

            let mut raw = match &input {
                Some(path) => read_request(path)?,
                None => RawInputs::new(),
            };
            for (name, value) in fields {
                raw.insert(name, value);
            }

            let predictor = PricePredictor::from_artifact(artifact, config);
            let result = predictor.estimate(&raw);
            let config = predictor.config();
            print!("{}", render(&result, &config.currency_symbol, &config.chart));

            if !result.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Inspect => {
            info!(path = %config.model_path.display(), "Inspecting model artifact");
            println!("Model:      {}", artifact.model_name());
            println!("Shape:      {}", artifact.shape_name());
            let estimator = &artifact.pipeline().estimator;
            println!("Estimator:  {}", estimator.kind_name());
            if let Some(depth) = estimator.max_depth() {
                println!("Trees:      {} (max depth {depth})", estimator.trees().len());
            }
            let preprocess = if artifact.pipeline().preprocessor.is_some() {
                "column transformer"
            } else {
                "none"
            };
            println!("Preprocess: {preprocess}");
            match artifact.expected_columns() {
                Some(columns) => println!("Columns:    {}", columns.join(", ")),
                None => println!("Columns:    (not declared)"),
            }
            if let Some(bundle) = artifact.bundle() {
                let numeric: Vec<&str> =
                    bundle.numeric_features.iter().map(String::as_str).collect();
                let categorical: Vec<&str> =
                    bundle.categorical_features.iter().map(String::as_str).collect();
                println!("Numeric:    {}", numeric.join(", "));
                println!("Categorical: {}", categorical.join(", "));
            }
            let importances = if estimator.feature_importances().is_some() {
                "available"
            } else {
                "not supported"
            };
            println!("Importances: {importances}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("LotArea=8000").unwrap(),
            ("LotArea".to_string(), Value::Number(8000.0))
        );
        assert_eq!(
            parse_field("Neighborhood=CollgCr").unwrap(),
            ("Neighborhood".to_string(), Value::from("CollgCr"))
        );
        assert_eq!(
            parse_field("Alley=").unwrap(),
            ("Alley".to_string(), Value::from(""))
        );
        assert!(parse_field("LotArea").is_err());
        assert!(parse_field("=5").is_err());
    }
}
