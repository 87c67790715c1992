//! # Financial Model Ingest
//!
//! A library for ingesting spreadsheet financial models (profit and loss,
//! balance sheet, cash flow) into validated, typed, JSON-serializable
//! structures, with best-effort repair of the problems real workbooks have.
//!
//! ## Core Concepts
//!
//! - **Parsed Workbook**: every sheet's populated cells in typed form, with formulas kept alongside their cached values
//! - **Sheet Classification**: sheet names and row labels map each sheet to profit-and-loss, balance-sheet or cash-flow semantics
//! - **Validation**: structural checks (dimensions, duplicate names, header rows) plus per-statement template checks
//! - **Parameter Detection**: period-over-period growth, seasonality cycles, formula dependency sets and assumption bounds
//! - **Partial Repair**: confidence-scored automatic fixes with full provenance; what cannot be fixed becomes a recommendation
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_model_ingest::*;
//!
//! let report = ingest_workbook("models/forecast.xlsx")?;
//!
//! for sheet in &report.parsed.sheets {
//!     println!("{} -> {:?}", sheet.name, sheet.sheet_type);
//! }
//!
//! if let Some(repair) = &report.repair {
//!     for fix in &repair.applied_fixes {
//!         println!(
//!             "fixed {:?} in '{}' with confidence {:.2}",
//!             fix.kind, fix.sheet, fix.confidence
//!         );
//!     }
//! }
//!
//! let detector = ParameterDetector::new();
//! let revenue = detector.series_from_row(&report.parsed.sheets[0], 1);
//! let growth = detector.detect_growth_patterns(&revenue);
//! println!("average growth: {:?}", growth.average_growth_rate);
//! ```

pub mod cell;
pub mod classify;
pub mod detector;
pub mod error;
pub mod formula;
pub mod parser;
pub mod repair;
pub mod schema;
pub mod template;
pub mod utils;
pub mod validation;

pub use cell::*;
pub use classify::{classify_sheet, label_vocabulary};
pub use detector::{
    Assumption, AssumptionValidationResult, GrowthAnalysis, ParameterDetector, SeasonalityResult,
};
pub use error::{IngestError, Result};
pub use formula::parse_formula_dependencies;
pub use parser::WorkbookParser;
pub use repair::{AppliedFix, FileValidationResult, FixKind, PartialProcessor};
pub use schema::*;
pub use template::{AdvancedValidator, TemplateValidationResult};
pub use utils::*;
pub use validation::{
    StructuralValidator, ValidationError, ValidationSeverity, ValidationSummary,
};

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything one pipeline run produced: the parsed workbook with its
/// structural summary attached, the template verdict, and the repair
/// outcome when one was attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngestionReport {
    #[schemars(description = "The parsed workbook, with its structural validation summary attached")]
    pub parsed: ParsedWorkbook,

    #[schemars(description = "Template validation verdict for the classified statement sheets")]
    pub template: TemplateValidationResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "Repair outcome; present only when validation found problems")]
    pub repair: Option<FileValidationResult>,
}

impl IngestionReport {
    /// True when validation passed outright and no repair was attempted.
    pub fn is_clean(&self) -> bool {
        self.repair.is_none()
    }

    /// The workbook to hand downstream: the repaired copy when a repair
    /// succeeded, otherwise the originally parsed one.
    pub fn effective_workbook(&self) -> &ParsedWorkbook {
        match &self.repair {
            Some(repair) if repair.success => repair.repaired.as_ref().unwrap_or(&self.parsed),
            _ => &self.parsed,
        }
    }
}

/// Runs the full ingestion sequence over one workbook file: parse,
/// validate structure, validate statement templates, and repair when
/// either validation stage objects.
pub struct IngestionPipeline {
    parser: WorkbookParser,
    processor: PartialProcessor,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self {
            parser: WorkbookParser::new(),
            processor: PartialProcessor::new(),
        }
    }
}

impl IngestionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, path: impl AsRef<Path>) -> Result<IngestionReport> {
        let path = path.as_ref();
        info!("Ingesting workbook '{}'", path.display());

        let mut parsed = self.parser.parse_path(path)?;
        let structural = StructuralValidator::validate_and_attach(&mut parsed);
        let template = AdvancedValidator::validate_template(&parsed);

        debug!(
            "Validation of '{}': structural valid={}, template valid={}",
            parsed.file_name, structural.is_valid, template.is_valid
        );

        let repair = if structural.is_valid && template.is_valid {
            None
        } else {
            let mut findings = structural.errors.clone();
            findings.extend(template.validation_errors.iter().cloned());
            let combined =
                ValidationSummary::from_errors(findings, structural.recommendations.clone());
            Some(self.processor.process_with_issues(path, &combined))
        };

        info!(
            "Ingestion of '{}' complete: {} sheets, repair {}",
            parsed.file_name,
            parsed.sheets.len(),
            match &repair {
                Some(outcome) if outcome.success => "succeeded",
                Some(_) => "incomplete",
                None => "not needed",
            }
        );

        Ok(IngestionReport {
            parsed,
            template,
            repair,
        })
    }
}

/// Convenience wrapper over [`IngestionPipeline`] with default settings.
pub fn ingest_workbook(path: impl AsRef<Path>) -> Result<IngestionReport> {
    IngestionPipeline::new().run(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_workbook() -> ParsedWorkbook {
        ParsedWorkbook {
            file_name: "model.xlsx".to_string(),
            file_path: "model.xlsx".to_string(),
            file_size: 128,
            sheets: vec![SheetInfo {
                name: "P&L".to_string(),
                sheet_type: SheetType::ProfitLoss,
                max_row: 2,
                max_column: 2,
                header_row: Some(0),
                cells: vec![
                    Cell::new(0, 0, CellValue::Text("Line Item".to_string())),
                    Cell::new(1, 0, CellValue::Text("Revenue".to_string())),
                    Cell::new(1, 1, CellValue::Number(100.0)),
                ],
            }],
            validation: None,
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ingest_workbook("/nonexistent/deeply/model.xlsx");
        assert!(result.is_err());
    }

    #[test]
    fn test_clean_report_has_no_repair() {
        let report = IngestionReport {
            parsed: minimal_workbook(),
            template: TemplateValidationResult {
                is_valid: true,
                validation_errors: Vec::new(),
            },
            repair: None,
        };

        assert!(report.is_clean());
        assert_eq!(report.effective_workbook().file_name, "model.xlsx");
    }

    #[test]
    fn test_effective_workbook_prefers_successful_repair() {
        let parsed = minimal_workbook();
        let mut repaired = parsed.clone();
        repaired.file_name = "model-repaired.xlsx".to_string();

        let report = IngestionReport {
            parsed,
            template: TemplateValidationResult {
                is_valid: false,
                validation_errors: Vec::new(),
            },
            repair: Some(FileValidationResult {
                success: true,
                recommendations: Vec::new(),
                repaired: Some(repaired),
                applied_fixes: Vec::new(),
            }),
        };

        assert!(!report.is_clean());
        assert_eq!(report.effective_workbook().file_name, "model-repaired.xlsx");
    }

    #[test]
    fn test_effective_workbook_ignores_failed_repair() {
        let parsed = minimal_workbook();

        let report = IngestionReport {
            parsed,
            template: TemplateValidationResult {
                is_valid: false,
                validation_errors: Vec::new(),
            },
            repair: Some(FileValidationResult {
                success: false,
                recommendations: vec!["Unresolved after repair: bad dimensions".to_string()],
                repaired: None,
                applied_fixes: Vec::new(),
            }),
        };

        assert_eq!(report.effective_workbook().file_name, "model.xlsx");
    }
}
