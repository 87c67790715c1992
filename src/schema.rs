use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::cell::{Cell, CellValue};
use crate::validation::ValidationSummary;

/// Financial-statement classification of a worksheet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetType {
    #[schemars(description = "Profit & loss / income statement: revenue, costs and margins")]
    ProfitLoss,

    #[schemars(description = "Balance sheet: assets, liabilities and equity at a point in time")]
    BalanceSheet,

    #[schemars(description = "Cash flow statement: operating, investing and financing activities")]
    CashFlow,

    #[schemars(description = "A worksheet that matched no financial-statement vocabulary")]
    Other,
}

impl SheetType {
    /// The wire form used in exports, e.g. "PROFIT_LOSS".
    pub fn as_str(&self) -> &'static str {
        match self {
            SheetType::ProfitLoss => "PROFIT_LOSS",
            SheetType::BalanceSheet => "BALANCE_SHEET",
            SheetType::CashFlow => "CASH_FLOW",
            SheetType::Other => "OTHER",
        }
    }
}

impl Default for SheetType {
    fn default() -> Self {
        Self::Other
    }
}

/// A parsed worksheet: its classification, grid dimensions and the
/// non-empty cells in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SheetInfo {
    #[schemars(description = "Worksheet name exactly as it appears in the workbook")]
    pub name: String,

    #[schemars(description = "Classification inferred from the sheet name and its labels")]
    pub sheet_type: SheetType,

    #[schemars(description = "Row count of the used grid; zero for an empty sheet")]
    pub max_row: u32,

    #[schemars(description = "Column count of the used grid; zero for an empty sheet")]
    pub max_column: u32,

    #[serde(default)]
    #[schemars(description = "Zero-based index of the detected header row, if any")]
    pub header_row: Option<u32>,

    #[schemars(description = "All non-empty cells, ordered by row then column")]
    pub cells: Vec<Cell>,
}

impl SheetInfo {
    pub fn cell_at(&self, row: u32, column: u32) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.column == column)
    }

    /// Cells of one row, in column order.
    pub fn row_cells(&self, row: u32) -> Vec<&Cell> {
        self.cells.iter().filter(|c| c.row == row).collect()
    }

    /// Values of one column, in row order.
    pub fn column_values(&self, column: u32) -> Vec<&CellValue> {
        self.cells
            .iter()
            .filter(|c| c.column == column)
            .map(|c| &c.value)
            .collect()
    }

    /// Text labels in the detected header row, in column order.
    pub fn header_labels(&self) -> Vec<String> {
        match self.header_row {
            Some(row) => self
                .row_cells(row)
                .iter()
                .filter_map(|c| match &c.value {
                    CellValue::Text(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Every text value in the sheet, in row-major order. Used for
    /// vocabulary matching against row labels.
    pub fn text_values(&self) -> Vec<&str> {
        self.cells
            .iter()
            .filter_map(|c| match &c.value {
                CellValue::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Actual bounds of the populated grid as (rows, columns) counts,
    /// or `None` when the sheet has no cells.
    pub fn grid_bounds(&self) -> Option<(u32, u32)> {
        self.cells
            .iter()
            .map(|c| (c.row + 1, c.column + 1))
            .reduce(|(r1, c1), (r2, c2)| (r1.max(r2), c1.max(c2)))
    }
}

/// A fully parsed workbook plus the structural validation attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedWorkbook {
    #[schemars(description = "File name without directories, e.g. 'model.xlsx'")]
    pub file_name: String,

    #[schemars(description = "Path or source identifier the workbook was read from")]
    pub file_path: String,

    #[schemars(description = "Source size in bytes")]
    pub file_size: u64,

    #[schemars(description = "Parsed worksheets in workbook order")]
    pub sheets: Vec<SheetInfo>,

    #[serde(default)]
    #[schemars(description = "Structural validation summary, once validation has run")]
    pub validation: Option<ValidationSummary>,
}

impl ParsedWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&SheetInfo> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Serializes the workbook into the plain nested mapping consumed by
    /// API layers. The shape is part of the crate's contract: exactly the
    /// top-level keys `file_info`, `sheets` and `validation`, with a
    /// permissive default validation block when validation has not run.
    pub fn export_to_dict(&self) -> Value {
        let sheets: Vec<Value> = self
            .sheets
            .iter()
            .map(|sheet| {
                json!({
                    "name": sheet.name,
                    "sheet_type": sheet.sheet_type.as_str(),
                    "max_row": sheet.max_row,
                    "max_column": sheet.max_column,
                })
            })
            .collect();

        let validation = match &self.validation {
            Some(summary) => json!({
                "is_valid": summary.is_valid,
                "errors": summary
                    .errors
                    .iter()
                    .map(|e| {
                        json!({
                            "message": e.message,
                            "severity": e.severity.as_str(),
                        })
                    })
                    .collect::<Vec<Value>>(),
                "total_errors": summary.total_errors,
            }),
            None => json!({
                "is_valid": true,
                "errors": [],
                "total_errors": 0,
            }),
        };

        json!({
            "file_info": {
                "name": self.file_name,
                "path": self.file_path,
                "size": self.file_size,
            },
            "sheets": sheets,
            "validation": validation,
        })
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ParsedWorkbook)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
