use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classify::{
    ASSET_ROW_KEYWORDS, CASH_ACTIVITY_ROW_KEYWORDS, EQUITY_ROW_KEYWORDS, EXPENSE_ROW_KEYWORDS,
    LIABILITY_ROW_KEYWORDS, REVENUE_ROW_KEYWORDS,
};
use crate::schema::{ParsedWorkbook, SheetInfo, SheetType};
use crate::utils::label_contains_any;
use crate::validation::ValidationError;

/// Outcome of template validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateValidationResult {
    #[schemars(description = "True when every classified sheet carries its required semantic rows")]
    pub is_valid: bool,

    #[schemars(description = "Template findings; warnings do not affect validity")]
    pub validation_errors: Vec<ValidationError>,
}

/// Checks classified sheets against financial-statement templates: a
/// profit & loss sheet must carry revenue and expense rows, a balance
/// sheet assets and liabilities, a cash flow sheet at least one
/// activity section.
///
/// Template validation is layered on top of structural validation and
/// only adds findings; it never rewrites the structural summary
/// attached to the workbook.
pub struct AdvancedValidator;

impl AdvancedValidator {
    pub fn validate_template(workbook: &ParsedWorkbook) -> TemplateValidationResult {
        let mut errors = Vec::new();

        if workbook.sheets.is_empty() {
            errors.push(ValidationError::error(
                "No worksheets available for template validation",
            ));
        }

        for sheet in &workbook.sheets {
            Self::check_sheet(sheet, &mut errors);
        }

        let is_valid = !errors.iter().any(ValidationError::is_blocking);
        debug!(
            "Template validation of '{}': {} findings, valid={}",
            workbook.file_name,
            errors.len(),
            is_valid
        );

        TemplateValidationResult {
            is_valid,
            validation_errors: errors,
        }
    }

    fn check_sheet(sheet: &SheetInfo, errors: &mut Vec<ValidationError>) {
        match sheet.sheet_type {
            SheetType::ProfitLoss => {
                if !Self::has_row_label(sheet, REVENUE_ROW_KEYWORDS) {
                    errors.push(ValidationError::error(format!(
                        "Profit & loss sheet '{}' has no recognizable revenue row",
                        sheet.name
                    )));
                }
                if !Self::has_row_label(sheet, EXPENSE_ROW_KEYWORDS) {
                    errors.push(ValidationError::error(format!(
                        "Profit & loss sheet '{}' has no recognizable expense row",
                        sheet.name
                    )));
                }
            }
            SheetType::BalanceSheet => {
                if !Self::has_row_label(sheet, ASSET_ROW_KEYWORDS) {
                    errors.push(ValidationError::error(format!(
                        "Balance sheet '{}' has no recognizable asset row",
                        sheet.name
                    )));
                }
                if !Self::has_row_label(sheet, LIABILITY_ROW_KEYWORDS) {
                    errors.push(ValidationError::error(format!(
                        "Balance sheet '{}' has no recognizable liability row",
                        sheet.name
                    )));
                }
                if !Self::has_row_label(sheet, EQUITY_ROW_KEYWORDS) {
                    errors.push(ValidationError::warning(format!(
                        "Balance sheet '{}' has no recognizable equity row",
                        sheet.name
                    )));
                }
            }
            SheetType::CashFlow => {
                if !Self::has_row_label(sheet, CASH_ACTIVITY_ROW_KEYWORDS) {
                    errors.push(ValidationError::error(format!(
                        "Cash flow sheet '{}' has no recognizable activity section",
                        sheet.name
                    )));
                }
            }
            SheetType::Other => {}
        }
    }

    fn has_row_label(sheet: &SheetInfo, keywords: &[&str]) -> bool {
        sheet
            .text_values()
            .iter()
            .any(|label| label_contains_any(label, keywords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellValue};

    fn sheet_with_labels(name: &str, sheet_type: SheetType, labels: &[&str]) -> SheetInfo {
        let mut cells = Vec::new();
        for (index, label) in labels.iter().enumerate() {
            cells.push(Cell::new(
                index as u32,
                0,
                CellValue::Text(label.to_string()),
            ));
            cells.push(Cell::new(index as u32, 1, CellValue::Number(100.0)));
        }
        SheetInfo {
            name: name.to_string(),
            sheet_type,
            max_row: labels.len() as u32,
            max_column: 2,
            header_row: Some(0),
            cells,
        }
    }

    fn workbook(sheets: Vec<SheetInfo>) -> ParsedWorkbook {
        ParsedWorkbook {
            file_name: "model.xlsx".to_string(),
            file_path: "model.xlsx".to_string(),
            file_size: 100,
            sheets,
            validation: None,
        }
    }

    #[test]
    fn test_complete_profit_loss_passes() {
        let wb = workbook(vec![sheet_with_labels(
            "P&L",
            SheetType::ProfitLoss,
            &["Revenue", "Cost of Sales", "Net Profit"],
        )]);

        let result = AdvancedValidator::validate_template(&wb);
        assert!(result.is_valid, "findings: {:?}", result.validation_errors);
    }

    #[test]
    fn test_profit_loss_missing_expense_row() {
        let wb = workbook(vec![sheet_with_labels(
            "P&L",
            SheetType::ProfitLoss,
            &["Revenue", "Gross Margin"],
        )]);

        let result = AdvancedValidator::validate_template(&wb);
        assert!(!result.is_valid);
        assert!(result
            .validation_errors
            .iter()
            .any(|e| e.message.contains("no recognizable expense row")));
    }

    #[test]
    fn test_balance_sheet_missing_liabilities() {
        let wb = workbook(vec![sheet_with_labels(
            "Balance Sheet",
            SheetType::BalanceSheet,
            &["Cash", "Receivables", "Equity"],
        )]);

        let result = AdvancedValidator::validate_template(&wb);
        assert!(!result.is_valid);
        assert!(result
            .validation_errors
            .iter()
            .any(|e| e.message.contains("no recognizable liability row")));
    }

    #[test]
    fn test_balance_sheet_missing_equity_only_warns() {
        let wb = workbook(vec![sheet_with_labels(
            "Balance Sheet",
            SheetType::BalanceSheet,
            &["Total Assets", "Accounts Payable"],
        )]);

        let result = AdvancedValidator::validate_template(&wb);
        assert!(result.is_valid);
        assert!(result
            .validation_errors
            .iter()
            .any(|e| !e.is_blocking() && e.message.contains("equity")));
    }

    #[test]
    fn test_cash_flow_requires_activity_section() {
        let wb = workbook(vec![sheet_with_labels(
            "Cash Flow",
            SheetType::CashFlow,
            &["Some notes", "More notes"],
        )]);

        let result = AdvancedValidator::validate_template(&wb);
        assert!(!result.is_valid);
        assert!(result
            .validation_errors
            .iter()
            .any(|e| e.message.contains("activity section")));
    }

    #[test]
    fn test_other_sheets_are_not_checked() {
        let wb = workbook(vec![sheet_with_labels(
            "Notes",
            SheetType::Other,
            &["Anything at all"],
        )]);

        let result = AdvancedValidator::validate_template(&wb);
        assert!(result.is_valid);
        assert!(result.validation_errors.is_empty());
    }

    #[test]
    fn test_empty_workbook_fails_template_validation() {
        let result = AdvancedValidator::validate_template(&workbook(vec![]));
        assert!(!result.is_valid);
        assert_eq!(result.validation_errors.len(), 1);
    }

    #[test]
    fn test_template_validation_does_not_touch_structural_summary() {
        let mut wb = workbook(vec![sheet_with_labels(
            "P&L",
            SheetType::ProfitLoss,
            &["Revenue"],
        )]);
        wb.validation = None;

        let _ = AdvancedValidator::validate_template(&wb);
        assert!(wb.validation.is_none());
    }
}
