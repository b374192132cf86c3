//! Caller-facing response rendering: currency strings and a text bar chart.

use crate::attribution::{Attribution, ImportanceVector};
use crate::predictor::PredictionResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Importance chart layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Number of features shown, heaviest first
    pub top_n: usize,

    /// Width in characters of the longest bar
    pub bar_width: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            bar_width: 40,
        }
    }
}

/// `1234567.891` → `$1,234,567.89`; negatives as `-$…`.
pub fn format_currency(value: f64, symbol: &str) -> String {
    let cents = (value.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc() as u128;
    let frac = (cents % 100.0) as u8;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("{sign}{symbol}{grouped}.{frac:02}")
}

/// Horizontal bars scaled to the heaviest shown feature.
pub fn render_chart(importances: &ImportanceVector, config: &ChartConfig) -> String {
    let rows = importances.top(config.top_n);
    let label_width = rows.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(|(_, w)| *w).fold(0.0_f64, f64::max);

    let mut out = String::new();
    for (name, weight) in rows {
        let len = if max > 0.0 {
            ((weight.max(0.0) / max) * config.bar_width as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "{name:<label_width$} | {bar:<width$} {weight:.4}",
            bar = "█".repeat(len),
            width = config.bar_width,
        );
    }
    out
}

/// Chart section for an attribution, including any truncation warning.
pub fn render_attribution(attribution: &Attribution, config: &ChartConfig) -> String {
    let mut out = format!("Feature importances (names from {}):\n", attribution.source);
    if let Some(mismatch) = attribution.mismatch {
        let _ = writeln!(out, "warning: {mismatch}");
    }
    out.push_str(&render_chart(&attribution.importances, config));
    out
}

/// Full text response for one request.
pub fn render(result: &PredictionResult, symbol: &str, chart: &ChartConfig) -> String {
    let mut out = match &result.price {
        Ok(price) => format!("Predicted house price: {}\n", format_currency(*price, symbol)),
        Err(e) => format!("Prediction failed: {e}\n"),
    };

    match &result.attribution {
        Some(Ok(attribution)) => {
            out.push('\n');
            out.push_str(&render_attribution(attribution, chart));
        }
        Some(Err(reason)) => {
            let _ = writeln!(out, "\nFeature importances unavailable: {reason}");
        }
        None => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{align, NameSource};

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0, "$"), "$0.00");
        assert_eq!(format_currency(999.999, "$"), "$1,000.00");
        assert_eq!(format_currency(208500.0, "$"), "$208,500.00");
        assert_eq!(format_currency(1234567.891, "$"), "$1,234,567.89");
        assert_eq!(format_currency(-1500.5, "$"), "-$1,500.50");
        assert_eq!(format_currency(-0.001, "$"), "$0.00");
        assert_eq!(format_currency(12.3, "€"), "€12.30");
    }

    #[test]
    fn test_render_chart_scales_bars() {
        let (v, _) = align(
            vec!["OverallQual".into(), "LotArea".into()],
            vec![0.25, 0.75],
        );
        let config = ChartConfig {
            top_n: 10,
            bar_width: 4,
        };
        let chart = render_chart(&v, &config);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("LotArea     | ████ 0.7500"));
        assert!(lines[1].starts_with("OverallQual | █    0.2500"));
    }

    #[test]
    fn test_render_attribution_warns_on_mismatch() {
        let (importances, mismatch) =
            align(vec!["A".into(), "B".into(), "C".into()], vec![0.7, 0.3]);
        let attribution = Attribution {
            importances,
            source: NameSource::DeclaredColumns,
            mismatch,
        };
        let text = render_attribution(&attribution, &ChartConfig::default());
        assert!(text.contains("warning: 3 feature names but 2 importance weights"));
        assert!(!text.contains("C "));
    }
}
