use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use log::{debug, info, warn};

use crate::cell::{Cell, CellValue};
use crate::classify::classify_sheet;
use crate::error::{IngestError, Result};
use crate::schema::{ParsedWorkbook, SheetInfo};

/// Grid caps. Financial models are small; anything past these bounds is
/// exported data dumps, and excess cells are dropped with a warning.
pub const MAX_ROWS: u32 = 65_536;
pub const MAX_COLUMNS: u32 = 256;

/// Rows inspected when looking for a header row.
const HEADER_SCAN_ROWS: u32 = 10;

/// Leading rows whose first-column labels feed sheet classification.
const LABEL_SAMPLE_ROWS: u32 = 30;

/// Reads workbook files into [`ParsedWorkbook`] values: typed cells,
/// per-sheet grid dimensions, a detected header row and a
/// financial-statement classification for every sheet.
///
/// Format detection, decompression and cell decoding are delegated to
/// calamine; this stage only shapes its output into the crate's model.
pub struct WorkbookParser {
    max_rows: u32,
    max_columns: u32,
}

impl Default for WorkbookParser {
    fn default() -> Self {
        Self {
            max_rows: MAX_ROWS,
            max_columns: MAX_COLUMNS,
        }
    }
}

impl WorkbookParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a workbook from disk. Fails only when the file cannot be
    /// opened or a worksheet cannot be decoded; content problems are
    /// left for validation.
    pub fn parse_path(&self, path: impl AsRef<Path>) -> Result<ParsedWorkbook> {
        let path = path.as_ref();
        let file_size = std::fs::metadata(path)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let workbook = open_workbook_auto(path)?;
        self.build_workbook(workbook, file_name, path.display().to_string(), file_size)
    }

    /// Parses a workbook already held in memory, e.g. an upload body.
    /// The format is sniffed from the bytes rather than a file name.
    pub fn parse_bytes(&self, file_name: &str, bytes: Vec<u8>) -> Result<ParsedWorkbook> {
        let file_size = bytes.len() as u64;
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        self.build_workbook(
            workbook,
            file_name.to_string(),
            file_name.to_string(),
            file_size,
        )
    }

    fn build_workbook<RS>(
        &self,
        mut workbook: Sheets<RS>,
        file_name: String,
        file_path: String,
        file_size: u64,
    ) -> Result<ParsedWorkbook>
    where
        RS: Read + Seek,
    {
        let sheet_names = workbook.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(sheet_names.len());

        for name in &sheet_names {
            let range = workbook
                .worksheet_range(name)
                .map_err(|e| IngestError::SheetRead {
                    sheet: name.clone(),
                    details: e.to_string(),
                })?;
            // Formula extraction is best-effort; legacy formats may not
            // carry formula source at all.
            let formulas = workbook.worksheet_formula(name).ok();

            let sheet = self.build_sheet(name, &range, formulas.as_ref());
            debug!(
                "Parsed sheet '{}': {} cells, {:?}, header row {:?}",
                sheet.name,
                sheet.cells.len(),
                sheet.sheet_type,
                sheet.header_row
            );
            sheets.push(sheet);
        }

        info!(
            "Parsed workbook '{}': {} sheets, {} bytes",
            file_name,
            sheets.len(),
            file_size
        );

        Ok(ParsedWorkbook {
            file_name,
            file_path,
            file_size,
            sheets,
            validation: None,
        })
    }

    fn build_sheet(
        &self,
        name: &str,
        range: &Range<Data>,
        formulas: Option<&Range<String>>,
    ) -> SheetInfo {
        let mut grid: BTreeMap<(u32, u32), CellValue> = BTreeMap::new();
        let mut truncated = false;

        let (start_row, start_column) = range.start().unwrap_or((0, 0));
        for (row_offset, row) in range.rows().enumerate() {
            let row_index = start_row + row_offset as u32;
            if row_index >= self.max_rows {
                truncated = true;
                break;
            }
            for (column_offset, data) in row.iter().enumerate() {
                let column_index = start_column + column_offset as u32;
                if column_index >= self.max_columns {
                    truncated = true;
                    break;
                }
                let value = CellValue::from_data(data);
                if value.is_empty() {
                    continue;
                }
                grid.insert((row_index, column_index), value);
            }
        }

        // Second pass: formula source replaces cached results so the
        // cell is visibly a formula, normalized to carry a leading '='.
        if let Some(formula_range) = formulas {
            let (f_start_row, f_start_column) = formula_range.start().unwrap_or((0, 0));
            for (row_offset, row) in formula_range.rows().enumerate() {
                let row_index = f_start_row + row_offset as u32;
                if row_index >= self.max_rows {
                    break;
                }
                for (column_offset, source) in row.iter().enumerate() {
                    let column_index = f_start_column + column_offset as u32;
                    if column_index >= self.max_columns {
                        break;
                    }
                    if source.is_empty() {
                        continue;
                    }
                    let text = if source.starts_with('=') {
                        source.clone()
                    } else {
                        format!("={}", source)
                    };
                    grid.insert((row_index, column_index), CellValue::Formula(text));
                }
            }
        }

        if truncated {
            warn!(
                "Sheet '{}' exceeds the {}x{} grid cap; excess cells were dropped",
                name, self.max_rows, self.max_columns
            );
        }

        // Declared dimensions come from the used range, but formula-only
        // cells can sit outside it, so the populated bounds win ties.
        let (height, width) = range.get_size();
        let declared_rows = (start_row + height as u32).min(self.max_rows);
        let declared_columns = (start_column + width as u32).min(self.max_columns);
        let (grid_rows, grid_columns) = grid
            .keys()
            .fold((0u32, 0u32), |(rows, columns), (row, column)| {
                (rows.max(row + 1), columns.max(column + 1))
            });
        let max_row = declared_rows.max(grid_rows);
        let max_column = declared_columns.max(grid_columns);

        // A header is the first scanned row that is mostly text; a data
        // row with a single text label ("Revenue", 100, 200) is not one.
        let mut row_mix: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
        for ((row, _column), value) in &grid {
            if *row >= HEADER_SCAN_ROWS {
                break;
            }
            let (text, other) = row_mix.entry(*row).or_insert((0, 0));
            match value {
                CellValue::Text(_) => *text += 1,
                _ => *other += 1,
            }
        }
        let header_row = row_mix
            .iter()
            .find(|(_, (text, other))| *text > *other)
            .map(|(row, _)| *row);

        let mut labels: Vec<String> = Vec::new();
        if let Some(header) = header_row {
            for ((row, _column), value) in &grid {
                if *row == header {
                    if let CellValue::Text(s) = value {
                        labels.push(s.clone());
                    }
                }
            }
        }
        for ((row, column), value) in &grid {
            if *column == 0 && *row < LABEL_SAMPLE_ROWS && Some(*row) != header_row {
                if let CellValue::Text(s) = value {
                    labels.push(s.clone());
                }
            }
        }

        let sheet_type = classify_sheet(name, &labels);

        let cells: Vec<Cell> = grid
            .into_iter()
            .map(|((row, column), value)| Cell::new(row, column, value))
            .collect();

        SheetInfo {
            name: name.to_string(),
            sheet_type,
            max_row,
            max_column,
            header_row,
            cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SheetType;

    fn data_range(cells: &[(u32, u32, Data)]) -> Range<Data> {
        let max = cells
            .iter()
            .fold((0, 0), |(r, c), (row, col, _)| (r.max(*row), c.max(*col)));
        let mut range = Range::new((0, 0), max);
        for (row, col, value) in cells {
            range.set_value((*row, *col), value.clone());
        }
        range
    }

    #[test]
    fn test_build_sheet_types_and_order() {
        let parser = WorkbookParser::new();
        let range = data_range(&[
            (0, 0, Data::String("Line Item".to_string())),
            (0, 1, Data::String("2023".to_string())),
            (0, 2, Data::String("2024".to_string())),
            (1, 0, Data::String("Revenue".to_string())),
            (1, 1, Data::Float(1000.0)),
            (1, 2, Data::Float(1200.0)),
            (2, 0, Data::String("Expenses".to_string())),
            (2, 1, Data::Float(400.0)),
            (2, 2, Data::Float(450.0)),
        ]);

        let sheet = parser.build_sheet("P&L", &range, None);

        assert_eq!(sheet.sheet_type, SheetType::ProfitLoss);
        assert_eq!(sheet.max_row, 3);
        assert_eq!(sheet.max_column, 3);
        assert_eq!(sheet.header_row, Some(0));
        assert_eq!(sheet.cells.len(), 9);

        // Row-major ordering.
        let coordinates: Vec<(u32, u32)> =
            sheet.cells.iter().map(|c| (c.row, c.column)).collect();
        let mut sorted = coordinates.clone();
        sorted.sort();
        assert_eq!(coordinates, sorted);
    }

    #[test]
    fn test_build_sheet_empty_range() {
        let parser = WorkbookParser::new();
        let sheet = parser.build_sheet("Blank", &Range::empty(), None);

        assert!(sheet.cells.is_empty());
        assert_eq!(sheet.max_row, 0);
        assert_eq!(sheet.max_column, 0);
        assert_eq!(sheet.header_row, None);
        assert_eq!(sheet.sheet_type, SheetType::Other);
    }

    #[test]
    fn test_formula_overlay_replaces_cached_values() {
        let parser = WorkbookParser::new();
        let range = data_range(&[
            (0, 0, Data::Float(10.0)),
            (0, 1, Data::Float(20.0)),
            (0, 2, Data::Float(30.0)),
        ]);

        let mut formulas: Range<String> = Range::new((0, 0), (0, 2));
        formulas.set_value((0, 2), "A1+B1".to_string());

        let sheet = parser.build_sheet("Calc", &range, Some(&formulas));

        assert_eq!(
            sheet.cell_at(0, 2).map(|c| &c.value),
            Some(&CellValue::Formula("=A1+B1".to_string()))
        );
        // Non-formula cells keep their values.
        assert_eq!(
            sheet.cell_at(0, 0).map(|c| &c.value),
            Some(&CellValue::Number(10.0))
        );
    }

    #[test]
    fn test_formula_only_cell_extends_grid() {
        let parser = WorkbookParser::new();
        let range = data_range(&[(0, 0, Data::Float(1.0))]);

        let mut formulas: Range<String> = Range::new((0, 0), (2, 0));
        formulas.set_value((2, 0), "A1*2".to_string());

        let sheet = parser.build_sheet("Calc", &range, Some(&formulas));

        assert_eq!(sheet.max_row, 3);
        assert_eq!(
            sheet.cell_at(2, 0).map(|c| &c.value),
            Some(&CellValue::Formula("=A1*2".to_string()))
        );
    }

    #[test]
    fn test_grid_caps_truncate() {
        let parser = WorkbookParser {
            max_rows: 2,
            max_columns: 2,
        };
        let range = data_range(&[
            (0, 0, Data::Float(1.0)),
            (0, 3, Data::Float(2.0)),
            (5, 0, Data::Float(3.0)),
        ]);

        let sheet = parser.build_sheet("Big", &range, None);

        assert_eq!(sheet.cells.len(), 1);
        assert_eq!(sheet.max_row, 2);
        assert_eq!(sheet.max_column, 2);
    }

    #[test]
    fn test_blank_and_whitespace_cells_are_skipped() {
        let parser = WorkbookParser::new();
        let range = data_range(&[
            (0, 0, Data::String("Revenue".to_string())),
            (0, 1, Data::String("   ".to_string())),
            (0, 2, Data::Empty),
            (0, 3, Data::Float(5.0)),
        ]);

        let sheet = parser.build_sheet("Data", &range, None);

        assert_eq!(sheet.cells.len(), 2);
        assert!(sheet.cell_at(0, 1).is_none());
        assert!(sheet.cell_at(0, 2).is_none());
    }

    #[test]
    fn test_mostly_numeric_first_row_is_not_a_header() {
        let parser = WorkbookParser::new();
        let range = data_range(&[
            (0, 0, Data::String("Revenue".to_string())),
            (0, 1, Data::Float(100.0)),
            (0, 2, Data::Float(200.0)),
            (1, 0, Data::String("Expenses".to_string())),
            (1, 1, Data::Float(40.0)),
            (1, 2, Data::Float(60.0)),
        ]);

        let sheet = parser.build_sheet("Data", &range, None);
        assert_eq!(sheet.header_row, None);
    }

    #[test]
    fn test_header_detected_past_a_title_cell() {
        let parser = WorkbookParser::new();
        let range = data_range(&[
            (0, 0, Data::String("Forecast Model".to_string())),
            (0, 1, Data::Float(2024.0)),
            (1, 0, Data::String("Line Item".to_string())),
            (1, 1, Data::String("Q1".to_string())),
            (1, 2, Data::String("Q2".to_string())),
            (2, 0, Data::String("Revenue".to_string())),
            (2, 1, Data::Float(100.0)),
            (2, 2, Data::Float(120.0)),
        ]);

        let sheet = parser.build_sheet("Data", &range, None);
        assert_eq!(sheet.header_row, Some(1));
    }

    #[test]
    fn test_classification_uses_first_column_labels() {
        let parser = WorkbookParser::new();
        let range = data_range(&[
            (0, 0, Data::String("Item".to_string())),
            (1, 0, Data::String("Total Assets".to_string())),
            (2, 0, Data::String("Total Liabilities".to_string())),
            (3, 0, Data::String("Equity".to_string())),
            (1, 1, Data::Float(100.0)),
            (2, 1, Data::Float(60.0)),
            (3, 1, Data::Float(40.0)),
        ]);

        let sheet = parser.build_sheet("Sheet2", &range, None);
        assert_eq!(sheet.sheet_type, SheetType::BalanceSheet);
    }
}
