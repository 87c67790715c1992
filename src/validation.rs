use std::collections::HashSet;

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::ParsedWorkbook;

/// Fixed prefix of the diagnostic emitted for a workbook with no
/// worksheets. Callers match on this prefix, so it must not change.
pub const NO_WORKSHEETS_PREFIX: &str = "No worksheets";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ValidationSeverity {
    #[schemars(description = "Advisory finding; does not block onward processing")]
    Warning,

    #[schemars(description = "Blocking finding; the workbook is not structurally sound")]
    Error,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationSeverity::Warning => "Warning",
            ValidationSeverity::Error => "Error",
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    #[schemars(description = "Human-readable description of the finding")]
    pub message: String,

    #[schemars(description = "Whether the finding blocks onward processing")]
    pub severity: ValidationSeverity,
}

impl ValidationError {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }
}

/// Aggregated result of structural validation.
///
/// Built only through [`ValidationSummary::from_errors`] so that
/// `is_valid` and `total_errors` always agree with the error list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationSummary {
    #[schemars(description = "True when no blocking (Error severity) finding exists")]
    pub is_valid: bool,

    #[schemars(description = "All findings, warnings included, in discovery order")]
    pub errors: Vec<ValidationError>,

    #[schemars(description = "Length of the findings list")]
    pub total_errors: usize,

    #[schemars(description = "Remediation hints for the caller")]
    pub recommendations: Vec<String>,
}

impl ValidationSummary {
    pub fn from_errors(errors: Vec<ValidationError>, recommendations: Vec<String>) -> Self {
        let is_valid = !errors.iter().any(ValidationError::is_blocking);
        Self {
            is_valid,
            total_errors: errors.len(),
            errors,
            recommendations,
        }
    }

    pub fn valid() -> Self {
        Self::from_errors(Vec::new(), Vec::new())
    }

    pub fn blocking_count(&self) -> usize {
        self.errors.iter().filter(|e| e.is_blocking()).count()
    }
}

/// Checks a parsed workbook for structural soundness: worksheets exist,
/// declared dimensions agree with the populated grid, names are unique
/// and header rows are where the model says they are.
///
/// Validation is a pure function of the workbook content; it never
/// reads or mutates the attached summary, so running it repeatedly
/// always reproduces the same result.
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn validate(workbook: &ParsedWorkbook) -> ValidationSummary {
        if workbook.sheets.is_empty() {
            let message = format!(
                "{} found in workbook '{}'",
                NO_WORKSHEETS_PREFIX, workbook.file_name
            );
            return ValidationSummary::from_errors(
                vec![ValidationError::error(message)],
                vec![
                    "The file may be empty or corrupt; re-export it from the source application"
                        .to_string(),
                ],
            );
        }

        let mut errors = Vec::new();
        let mut recommendations = Vec::new();
        let mut seen_names: HashSet<&str> = HashSet::new();

        for sheet in &workbook.sheets {
            if !seen_names.insert(sheet.name.as_str()) {
                errors.push(ValidationError::error(format!(
                    "Duplicate worksheet name '{}'",
                    sheet.name
                )));
            }

            if sheet.is_empty() {
                errors.push(ValidationError::warning(format!(
                    "Sheet '{}' contains no data",
                    sheet.name
                )));
                continue;
            }

            if sheet.max_row == 0 || sheet.max_column == 0 {
                errors.push(ValidationError::error(format!(
                    "Sheet '{}' contains {} cells but declares a {}x{} grid",
                    sheet.name,
                    sheet.cells.len(),
                    sheet.max_row,
                    sheet.max_column
                )));
                continue;
            }

            if let Some((rows, columns)) = sheet.grid_bounds() {
                if rows > sheet.max_row || columns > sheet.max_column {
                    errors.push(ValidationError::error(format!(
                        "Sheet '{}' declares a {}x{} grid but cells extend to {}x{}",
                        sheet.name, sheet.max_row, sheet.max_column, rows, columns
                    )));
                }
            }

            match sheet.header_row {
                Some(row) if row >= sheet.max_row => {
                    errors.push(ValidationError::error(format!(
                        "Sheet '{}' places its header at row {} outside the {}-row grid",
                        sheet.name, row, sheet.max_row
                    )));
                }
                Some(_) => {}
                None => {
                    errors.push(ValidationError::warning(format!(
                        "No header row detected in sheet '{}'",
                        sheet.name
                    )));
                    recommendations.push(format!(
                        "Add a header row to sheet '{}', or let repair synthesize positional column names",
                        sheet.name
                    ));
                }
            }
        }

        let summary = ValidationSummary::from_errors(errors, recommendations);
        debug!(
            "Structural validation of '{}': {} findings, {} blocking",
            workbook.file_name,
            summary.total_errors,
            summary.blocking_count()
        );
        summary
    }

    /// Validates and stores the summary on the workbook, returning a copy.
    pub fn validate_and_attach(workbook: &mut ParsedWorkbook) -> ValidationSummary {
        let summary = Self::validate(workbook);
        workbook.validation = Some(summary.clone());
        summary
    }
}
