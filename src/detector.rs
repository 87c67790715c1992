use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::CellValue;
use crate::formula;
use crate::schema::SheetInfo;
use crate::utils;

/// Relative tolerance for seasonality: every observation must sit
/// within this fraction of its phase mean for the pattern to count.
pub const DEFAULT_SEASONALITY_TOLERANCE: f64 = 0.2;

/// Cycle lengths probed for repeating patterns: half-yearly pairs,
/// quarterly, bimonthly-in-a-year and monthly-in-a-year.
pub const DEFAULT_CANDIDATE_PERIODS: &[usize] = &[2, 4, 6, 12];

/// Minimum spread between phase means, relative to the series scale.
/// A flat series repeats trivially and must not report seasonality.
const MIN_PHASE_SPREAD: f64 = 0.05;

/// Result of growth analysis over a numeric series.
///
/// A series that cannot be analyzed reports `error` and leaves the
/// numeric fields at their empty defaults; no analysis failure is ever
/// raised as a crate error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GrowthAnalysis {
    #[schemars(description = "Period-over-period growth rates in series order; pairs with a zero predecessor are skipped")]
    pub growth_rates: Vec<f64>,

    #[schemars(description = "Arithmetic mean of the growth rates, 0.0 when no rate was computable")]
    pub average_growth_rate: f64,

    #[schemars(description = "Number of period pairs that produced a usable rate")]
    pub periods_used: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Why the series could not be analyzed, when it could not")]
    pub error: Option<String>,
}

impl GrowthAnalysis {
    fn failed(error: String) -> Self {
        Self {
            growth_rates: Vec::new(),
            average_growth_rate: 0.0,
            periods_used: 0,
            error: Some(error),
        }
    }
}

/// Result of seasonality detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SeasonalityResult {
    #[schemars(description = "True when at least one candidate period repeats")]
    pub has_seasonality: bool,

    #[schemars(description = "All candidate periods found to repeat, in ascending order")]
    pub seasonal_periods: BTreeSet<usize>,
}

/// A declared model input with optional plausibility bounds. This is
/// the shape external callers supply; [`Assumption::schema_as_json`]
/// publishes it for them.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Assumption {
    #[schemars(description = "Name of the model input, e.g. 'Revenue growth'")]
    pub name: String,

    #[schemars(description = "Declared value. Numbers and numeric text ('4.5%', '$1,200') are accepted")]
    pub value: Value,

    #[serde(default)]
    #[schemars(description = "Inclusive lower plausibility bound")]
    pub min: Option<f64>,

    #[serde(default)]
    #[schemars(description = "Inclusive upper plausibility bound")]
    pub max: Option<f64>,
}

impl Assumption {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(Assumption)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Outcome of checking a batch of assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AssumptionValidationResult {
    #[schemars(description = "True when every assumption coerced and sat within its bounds")]
    pub is_valid: bool,

    #[schemars(description = "One entry per failing assumption, naming it and the problem")]
    pub errors: Vec<String>,
}

/// Detects forecast-relevant parameters in parsed workbook data:
/// period-over-period growth, repeating seasonal patterns, formula
/// dependencies and assumption plausibility.
///
/// Detection runs on whatever data is available; it is never gated on
/// validation having passed.
pub struct ParameterDetector {
    seasonality_tolerance: f64,
    candidate_periods: Vec<usize>,
}

impl Default for ParameterDetector {
    fn default() -> Self {
        Self {
            seasonality_tolerance: DEFAULT_SEASONALITY_TOLERANCE,
            candidate_periods: DEFAULT_CANDIDATE_PERIODS.to_vec(),
        }
    }
}

impl ParameterDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(seasonality_tolerance: f64, candidate_periods: Vec<usize>) -> Self {
        Self {
            seasonality_tolerance,
            candidate_periods,
        }
    }

    /// Computes period-over-period growth over a cell series.
    ///
    /// Empty cells are skipped as gaps in a sparse series. Numbers and
    /// numeric text are coerced; any other value aborts the analysis
    /// into the `error` field. A pair whose predecessor is zero yields
    /// no rate, so `[0, 0, 10]` produces an empty analysis rather than
    /// a division error.
    pub fn detect_growth_patterns(&self, series: &[CellValue]) -> GrowthAnalysis {
        let mut values = Vec::with_capacity(series.len());
        for (index, value) in series.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            match value.as_number() {
                Some(n) if n.is_finite() => values.push(n),
                _ => {
                    return GrowthAnalysis::failed(format!(
                        "Series value at position {} is not numeric: {:?}",
                        index, value
                    ));
                }
            }
        }

        let mut growth_rates = Vec::new();
        for pair in values.windows(2) {
            if pair[0] == 0.0 {
                continue;
            }
            growth_rates.push((pair[1] - pair[0]) / pair[0]);
        }

        let periods_used = growth_rates.len();
        let average_growth_rate = if growth_rates.is_empty() {
            0.0
        } else {
            growth_rates.iter().sum::<f64>() / periods_used as f64
        };

        GrowthAnalysis {
            growth_rates,
            average_growth_rate,
            periods_used,
            error: None,
        }
    }

    /// Probes the series for repeating cycles at each candidate period.
    ///
    /// A period counts only when the series covers at least two full
    /// cycles, every observation sits near its phase mean, and the
    /// phase means actually differ from one another.
    pub fn detect_seasonality(&self, series: &[f64]) -> SeasonalityResult {
        let mut seasonal_periods = BTreeSet::new();

        if series.iter().all(|v| v.is_finite()) {
            for &period in &self.candidate_periods {
                if period >= 2 && series.len() >= period * 2 && self.period_repeats(series, period)
                {
                    seasonal_periods.insert(period);
                }
            }
        }

        SeasonalityResult {
            has_seasonality: !seasonal_periods.is_empty(),
            seasonal_periods,
        }
    }

    fn period_repeats(&self, series: &[f64], period: usize) -> bool {
        let cycles = series.len() / period;
        let usable = &series[..cycles * period];

        let scale = usable.iter().map(|v| v.abs()).sum::<f64>() / usable.len() as f64;
        if scale <= f64::EPSILON {
            return false;
        }

        let mut phase_means = vec![0.0; period];
        for (index, value) in usable.iter().enumerate() {
            phase_means[index % period] += value;
        }
        for mean in &mut phase_means {
            *mean /= cycles as f64;
        }

        for (index, value) in usable.iter().enumerate() {
            let mean = phase_means[index % period];
            let allowed = self.seasonality_tolerance * mean.abs().max(scale);
            if (value - mean).abs() > allowed {
                return false;
            }
        }

        let max_mean = phase_means.iter().cloned().fold(f64::MIN, f64::max);
        let min_mean = phase_means.iter().cloned().fold(f64::MAX, f64::min);
        (max_mean - min_mean) > MIN_PHASE_SPREAD * scale
    }

    /// Checks that each assumption's value coerces to a number and sits
    /// within its declared bounds. Failures are reported per assumption;
    /// the batch never raises an error.
    pub fn validate_assumptions(&self, assumptions: &[Assumption]) -> AssumptionValidationResult {
        let mut errors = Vec::new();

        for assumption in assumptions {
            let numeric = match &assumption.value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => utils::extract_numeric_value(s),
                _ => None,
            };

            let value = match numeric {
                Some(v) => v,
                None => {
                    errors.push(format!(
                        "Assumption '{}' has a non-numeric value: {}",
                        assumption.name, assumption.value
                    ));
                    continue;
                }
            };

            if let Some(min) = assumption.min {
                if value < min {
                    errors.push(format!(
                        "Assumption '{}' is {} but must be at least {}",
                        assumption.name, value, min
                    ));
                }
            }
            if let Some(max) = assumption.max {
                if value > max {
                    errors.push(format!(
                        "Assumption '{}' is {} but must be at most {}",
                        assumption.name, value, max
                    ));
                }
            }
        }

        AssumptionValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// See [`formula::parse_formula_dependencies`].
    pub fn parse_formula_dependencies(
        &self,
        formula_text: &str,
        sheet_name: &str,
    ) -> BTreeSet<String> {
        formula::parse_formula_dependencies(formula_text, sheet_name)
    }

    /// See [`utils::extract_numeric_value`].
    pub fn extract_numeric_value(&self, text: &str) -> Option<f64> {
        utils::extract_numeric_value(text)
    }

    /// Pulls the value series out of one sheet row, dropping a leading
    /// non-numeric label cell so the caller can feed the row straight
    /// into [`ParameterDetector::detect_growth_patterns`].
    pub fn series_from_row(&self, sheet: &SheetInfo, row: u32) -> Vec<CellValue> {
        let cells = sheet.row_cells(row);
        let mut values: Vec<CellValue> = cells.iter().map(|c| c.value.clone()).collect();

        let leading_label = values
            .first()
            .map(|first| matches!(first, CellValue::Text(_)) && first.as_number().is_none())
            .unwrap_or(false);
        if leading_label {
            values.remove(0);
        }

        values
    }
}
