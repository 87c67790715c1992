use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use log::{debug, info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue, KNOWN_ERROR_MARKERS};
use crate::parser::WorkbookParser;
use crate::schema::{ParsedWorkbook, SheetInfo};
use crate::template::AdvancedValidator;
use crate::utils;
use crate::validation::{StructuralValidator, ValidationSummary};

/// Fixes below this confidence are withheld and reported instead.
pub const DEFAULT_MIN_FIX_CONFIDENCE: f64 = 0.5;

/// The kinds of automatic fix the repair stage can apply. Each kind
/// carries a fixed confidence reflecting how safe it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum FixKind {
    #[schemars(description = "Numeric text replaced by its number, e.g. '$1,250' -> 1250")]
    TypeCoercion,

    #[schemars(description = "Positional header labels synthesized for a sheet without a header row")]
    HeaderSynthesis,

    #[schemars(description = "A spreadsheet error marker replaced by a neutral zero")]
    FormulaErrorSubstitution,

    #[schemars(description = "A text date replaced by its parsed calendar date")]
    DateNormalization,
}

impl FixKind {
    pub fn confidence(&self) -> f64 {
        match self {
            FixKind::TypeCoercion => 0.9,
            FixKind::HeaderSynthesis => 0.6,
            FixKind::FormulaErrorSubstitution => 0.7,
            FixKind::DateNormalization => 0.8,
        }
    }
}

/// Provenance for one applied fix: where, what kind, the value before
/// and after, and the confidence it was applied with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppliedFix {
    #[schemars(description = "Name of the sheet the fix was applied to")]
    pub sheet: String,

    #[schemars(description = "Zero-based row for cell fixes; absent for sheet-level fixes")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,

    #[schemars(description = "Zero-based column for cell fixes; absent for sheet-level fixes")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    #[schemars(description = "A1-style address for cell fixes; absent for sheet-level fixes")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,

    #[schemars(description = "The kind of fix applied")]
    pub kind: FixKind,

    #[schemars(description = "Value before the fix; Empty for sheet-level fixes")]
    pub original: CellValue,

    #[schemars(description = "Value after the fix; for header synthesis, the joined label list")]
    pub fixed: CellValue,

    #[schemars(description = "Confidence the fix was applied with")]
    pub confidence: f64,
}

/// Outcome of a repair attempt. `success` means the repaired workbook
/// passes structural validation with no blocking findings; a partial
/// outcome keeps every fix that did succeed and lists the rest as
/// recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileValidationResult {
    #[schemars(description = "True when the repaired workbook is structurally sound")]
    pub success: bool,

    #[schemars(description = "Issues that could not be fixed automatically; never empty on failure")]
    pub recommendations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(description = "The repaired workbook with a fresh validation summary attached")]
    pub repaired: Option<ParsedWorkbook>,

    #[schemars(description = "Provenance for every fix that was applied")]
    pub applied_fixes: Vec<AppliedFix>,
}

/// Best-effort repair over a parsed workbook. Every fix is attempted
/// independently: coercing numeric text, normalizing text dates,
/// substituting error markers and synthesizing missing headers. Nothing
/// here raises a crate error; an unusable source is itself reported as
/// a failed result.
pub struct PartialProcessor {
    parser: WorkbookParser,
    min_confidence: f64,
}

impl Default for PartialProcessor {
    fn default() -> Self {
        Self {
            parser: WorkbookParser::new(),
            min_confidence: DEFAULT_MIN_FIX_CONFIDENCE,
        }
    }
}

impl PartialProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_confidence(min_confidence: f64) -> Self {
        Self {
            parser: WorkbookParser::new(),
            min_confidence,
        }
    }

    /// Re-reads the source and repairs whatever it can, guided by the
    /// validation result that triggered the repair.
    ///
    /// This never returns an error: a source that cannot be reopened
    /// produces a failed result whose recommendations say so.
    pub fn process_with_issues(
        &self,
        path: impl AsRef<Path>,
        validation: &ValidationSummary,
    ) -> FileValidationResult {
        let path = path.as_ref();
        info!("Attempting partial repair of '{}'", path.display());

        let workbook = match self.parser.parse_path(path) {
            Ok(workbook) => workbook,
            Err(e) => {
                warn!("Repair could not reopen '{}': {}", path.display(), e);
                return FileValidationResult {
                    success: false,
                    recommendations: vec![
                        format!("The source could not be reopened for repair: {}", e),
                        "Re-export the workbook from its source application and try again"
                            .to_string(),
                    ],
                    repaired: None,
                    applied_fixes: Vec::new(),
                };
            }
        };

        self.repair_workbook(workbook, validation)
    }

    /// Repairs an already-parsed workbook. The repaired copy is
    /// re-validated, structurally and against the statement templates,
    /// and every blocking finding that survives repair is enumerated in
    /// `recommendations`; `success` reflects the fresh structural
    /// summary, not the one that triggered the repair.
    pub fn repair_workbook(
        &self,
        mut workbook: ParsedWorkbook,
        validation: &ValidationSummary,
    ) -> FileValidationResult {
        debug!(
            "Repair of '{}' triggered by {} validation findings",
            workbook.file_name, validation.total_errors
        );

        let mut applied_fixes = Vec::new();
        let mut recommendations = Vec::new();

        for sheet in &mut workbook.sheets {
            self.repair_sheet(sheet, &mut applied_fixes, &mut recommendations);
        }

        // Re-validating the repaired workbook, rather than echoing the
        // triggering summary, keeps resolved findings out of the report.
        let summary = StructuralValidator::validate_and_attach(&mut workbook);
        let template = AdvancedValidator::validate_template(&workbook);
        let success = summary.is_valid;
        let unresolved = summary
            .errors
            .iter()
            .chain(template.validation_errors.iter())
            .filter(|e| e.is_blocking());
        for finding in unresolved {
            recommendations.push(format!("Unresolved after repair: {}", finding.message));
        }

        info!(
            "Repair of '{}': {} fixes applied, success={}",
            workbook.file_name,
            applied_fixes.len(),
            success
        );

        FileValidationResult {
            success,
            recommendations,
            repaired: Some(workbook),
            applied_fixes,
        }
    }

    fn repair_sheet(
        &self,
        sheet: &mut SheetInfo,
        fixes: &mut Vec<AppliedFix>,
        recommendations: &mut Vec<String>,
    ) {
        if sheet.is_empty() {
            return;
        }

        self.synthesize_headers(sheet, fixes, recommendations);

        // Column make-up from the pre-repair grid: text stranded in a
        // mostly-numeric column is a data problem, not a label.
        let mut column_counts: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
        for cell in &sheet.cells {
            if Some(cell.row) == sheet.header_row {
                continue;
            }
            let entry = column_counts.entry(cell.column).or_insert((0, 0));
            match &cell.value {
                CellValue::Number(_) | CellValue::Date(_) => entry.0 += 1,
                CellValue::Text(_) => entry.1 += 1,
                _ => {}
            }
        }

        for index in 0..sheet.cells.len() {
            if Some(sheet.cells[index].row) == sheet.header_row {
                continue;
            }

            let (kind, fixed) = match &sheet.cells[index].value {
                CellValue::Error(_) => {
                    (FixKind::FormulaErrorSubstitution, CellValue::Number(0.0))
                }
                CellValue::Text(s) if is_error_marker(s) => {
                    (FixKind::FormulaErrorSubstitution, CellValue::Number(0.0))
                }
                CellValue::Formula(f) if contains_error_marker(f) => (
                    FixKind::FormulaErrorSubstitution,
                    CellValue::Formula(self.auto_fix_formula_errors(f)),
                ),
                CellValue::Text(s) => {
                    if let Some(number) = self.auto_fix_text_to_number(s) {
                        (FixKind::TypeCoercion, CellValue::Number(number))
                    } else if let Some(date) = self.auto_fix_date_format(s) {
                        (FixKind::DateNormalization, CellValue::Date(date))
                    } else {
                        let numeric_column = column_counts
                            .get(&sheet.cells[index].column)
                            .map(|(numeric, text)| *numeric >= 2 && *numeric >= 2 * *text)
                            .unwrap_or(false);
                        if numeric_column {
                            recommendations.push(format!(
                                "Sheet '{}' cell {} contains non-numeric text '{}' in a numeric column; manual correction needed",
                                sheet.name,
                                sheet.cells[index].address(),
                                s
                            ));
                        }
                        continue;
                    }
                }
                _ => continue,
            };

            let confidence = kind.confidence();
            if confidence < self.min_confidence {
                recommendations.push(format!(
                    "A {:?} fix for sheet '{}' cell {} was withheld (confidence {:.2} below threshold {:.2})",
                    kind,
                    sheet.name,
                    sheet.cells[index].address(),
                    confidence,
                    self.min_confidence
                ));
                continue;
            }

            let original = std::mem::replace(&mut sheet.cells[index].value, fixed.clone());
            sheet.cells[index].data_type = fixed.data_type();
            fixes.push(AppliedFix {
                sheet: sheet.name.clone(),
                row: Some(sheet.cells[index].row),
                column: Some(sheet.cells[index].column),
                cell: Some(sheet.cells[index].address()),
                kind,
                original,
                fixed,
                confidence,
            });
        }
    }

    fn synthesize_headers(
        &self,
        sheet: &mut SheetInfo,
        fixes: &mut Vec<AppliedFix>,
        recommendations: &mut Vec<String>,
    ) {
        if sheet.header_row.is_some() || sheet.max_column == 0 {
            return;
        }

        let labels = self.auto_fix_missing_headers(sheet);

        if FixKind::HeaderSynthesis.confidence() < self.min_confidence {
            recommendations.push(format!(
                "Sheet '{}' needs a header row, but HeaderSynthesis confidence {:.2} is below threshold {:.2}",
                sheet.name,
                FixKind::HeaderSynthesis.confidence(),
                self.min_confidence
            ));
            return;
        }

        let row_zero_free = sheet.cells.iter().all(|c| c.row != 0);
        if !row_zero_free {
            recommendations.push(format!(
                "Sheet '{}' has no header row and its first row already contains data; suggested names: {}",
                sheet.name,
                labels.join(", ")
            ));
            return;
        }

        let mut cells: Vec<Cell> = labels
            .iter()
            .enumerate()
            .map(|(column, label)| {
                Cell::new(0, column as u32, CellValue::Text(label.clone()))
            })
            .collect();
        cells.extend(sheet.cells.drain(..));
        sheet.cells = cells;
        sheet.header_row = Some(0);

        fixes.push(AppliedFix {
            sheet: sheet.name.clone(),
            row: None,
            column: None,
            cell: None,
            kind: FixKind::HeaderSynthesis,
            original: CellValue::Empty,
            fixed: CellValue::Text(labels.join(", ")),
            confidence: FixKind::HeaderSynthesis.confidence(),
        });
    }

    /// Numeric text to number, tolerating currency symbols, thousands
    /// separators, percents and parenthesized negatives.
    pub fn auto_fix_text_to_number(&self, text: &str) -> Option<f64> {
        utils::extract_numeric_value(text)
    }

    /// Text date to calendar date, trying the crate's accepted formats.
    pub fn auto_fix_date_format(&self, text: &str) -> Option<NaiveDate> {
        utils::parse_flexible_date(text)
    }

    /// Replaces every known error marker in a formula with a neutral
    /// zero, e.g. "=A1/#DIV/0!" becomes "=A1/0".
    pub fn auto_fix_formula_errors(&self, formula_text: &str) -> String {
        let mut cleaned = formula_text.to_string();
        for marker in KNOWN_ERROR_MARKERS {
            if cleaned.contains(marker) {
                cleaned = cleaned.replace(marker, "0");
            }
        }
        cleaned
    }

    /// Positional header labels sized to the sheet's column count:
    /// "Column_1" through "Column_N".
    pub fn auto_fix_missing_headers(&self, sheet: &SheetInfo) -> Vec<String> {
        (1..=sheet.max_column)
            .map(|column| format!("Column_{}", column))
            .collect()
    }
}

fn is_error_marker(text: &str) -> bool {
    let trimmed = text.trim();
    KNOWN_ERROR_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

fn contains_error_marker(formula: &str) -> bool {
    KNOWN_ERROR_MARKERS
        .iter()
        .any(|marker| formula.contains(marker))
}
