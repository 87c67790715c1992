use calamine::{CellErrorType, Data};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::utils::{excel_serial_to_date, extract_numeric_value};

/// Spreadsheet error markers recognized across the crate, both as real
/// error cells and as error text left behind by CSV round-trips.
pub const KNOWN_ERROR_MARKERS: &[&str] = &[
    "#DIV/0!", "#N/A", "#VALUE!", "#REF!", "#NAME?", "#NUM!", "#NULL!",
];

/// The typed value of a single worksheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CellValue {
    #[schemars(description = "A numeric amount; integers are widened to floats")]
    Number(f64),

    #[schemars(description = "Free text, typically a row label or column header")]
    Text(String),

    #[schemars(description = "A calendar date resolved from an Excel serial or ISO string")]
    Date(NaiveDate),

    #[schemars(description = "Formula source text, always carrying a leading '='")]
    Formula(String),

    #[schemars(description = "A boolean cell")]
    Boolean(bool),

    #[schemars(description = "A spreadsheet error marker such as #DIV/0! or #REF!")]
    Error(String),

    #[schemars(description = "A blank or whitespace-only cell")]
    Empty,
}

/// The inferred type tag for a cell, derived from its [`CellValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    Number,
    Text,
    Date,
    Formula,
    Boolean,
    Error,
    Empty,
}

impl CellValue {
    /// Converts a raw calamine cell into the crate's typed value.
    ///
    /// Whitespace-only strings collapse to `Empty`. Date/time cells are
    /// resolved to calendar dates; a serial outside the representable
    /// range falls back to its numeric value rather than being dropped.
    pub fn from_data(data: &Data) -> CellValue {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => {
                if s.trim().is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(s.clone())
                }
            }
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::Error(e) => CellValue::Error(error_marker(e).to_string()),
            Data::DateTime(dt) => {
                let serial = dt.as_f64();
                match excel_serial_to_date(serial) {
                    Some(date) => CellValue::Date(date),
                    None => CellValue::Number(serial),
                }
            }
            Data::DateTimeIso(s) => match s.get(..10).and_then(parse_iso_date) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Text(s.clone()),
            },
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }

    /// The type tag for this value. The mapping is deterministic: equal
    /// values always produce equal tags.
    pub fn data_type(&self) -> DataType {
        match self {
            CellValue::Number(_) => DataType::Number,
            CellValue::Text(_) => DataType::Text,
            CellValue::Date(_) => DataType::Date,
            CellValue::Formula(_) => DataType::Formula,
            CellValue::Boolean(_) => DataType::Boolean,
            CellValue::Error(_) => DataType::Error,
            CellValue::Empty => DataType::Empty,
        }
    }

    /// Coerces the value to a number where a financial series would
    /// expect one: numbers pass through and text goes through
    /// [`extract_numeric_value`]. Dates, booleans, formulas and errors
    /// do not coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => extract_numeric_value(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

/// A positioned cell. Coordinates are zero-based; `data_type` is always
/// the tag derived from `value`, recorded separately so downstream
/// consumers and repair provenance can reference it without re-deriving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cell {
    #[schemars(description = "Zero-based row index")]
    pub row: u32,

    #[schemars(description = "Zero-based column index")]
    pub column: u32,

    #[schemars(description = "The typed cell value")]
    pub value: CellValue,

    #[schemars(description = "Type tag derived from the value")]
    pub data_type: DataType,
}

impl Cell {
    pub fn new(row: u32, column: u32, value: CellValue) -> Self {
        let data_type = value.data_type();
        Self {
            row,
            column,
            value,
            data_type,
        }
    }

    /// The A1-style address of this cell, e.g. "B3".
    pub fn address(&self) -> String {
        cell_address(self.row, self.column)
    }
}

/// Converts a zero-based column index to its letter form (0 -> "A",
/// 25 -> "Z", 26 -> "AA").
pub fn column_letter(column: u32) -> String {
    let mut result = String::new();
    let mut n = column;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    result
}

/// Formats zero-based coordinates as an A1-style address.
pub fn cell_address(row: u32, column: u32) -> String {
    format!("{}{}", column_letter(column), row + 1)
}

fn error_marker(error: &CellErrorType) -> &'static str {
    match error {
        CellErrorType::Div0 => "#DIV/0!",
        CellErrorType::NA => "#N/A",
        CellErrorType::Name => "#NAME?",
        CellErrorType::Null => "#NULL!",
        CellErrorType::Num => "#NUM!",
        CellErrorType::Ref => "#REF!",
        CellErrorType::Value => "#VALUE!",
        CellErrorType::GettingData => "#N/A",
    }
}

fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_data_basic_types() {
        assert_eq!(
            CellValue::from_data(&Data::Float(1.5)),
            CellValue::Number(1.5)
        );
        assert_eq!(
            CellValue::from_data(&Data::Int(7)),
            CellValue::Number(7.0)
        );
        assert_eq!(
            CellValue::from_data(&Data::String("Revenue".to_string())),
            CellValue::Text("Revenue".to_string())
        );
        assert_eq!(
            CellValue::from_data(&Data::Bool(true)),
            CellValue::Boolean(true)
        );
        assert_eq!(CellValue::from_data(&Data::Empty), CellValue::Empty);
    }

    #[test]
    fn test_from_data_blank_text_is_empty() {
        assert_eq!(
            CellValue::from_data(&Data::String("   ".to_string())),
            CellValue::Empty
        );
    }

    #[test]
    fn test_from_data_error_markers() {
        assert_eq!(
            CellValue::from_data(&Data::Error(CellErrorType::Div0)),
            CellValue::Error("#DIV/0!".to_string())
        );
        assert_eq!(
            CellValue::from_data(&Data::Error(CellErrorType::Ref)),
            CellValue::Error("#REF!".to_string())
        );
        assert_eq!(
            CellValue::from_data(&Data::Error(CellErrorType::Name)),
            CellValue::Error("#NAME?".to_string())
        );
    }

    #[test]
    fn test_from_data_iso_date() {
        assert_eq!(
            CellValue::from_data(&Data::DateTimeIso("2024-01-02T00:00:00".to_string())),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
        );
        // Unparseable ISO strings survive as text rather than being lost.
        assert_eq!(
            CellValue::from_data(&Data::DateTimeIso("9999-99-99".to_string())),
            CellValue::Text("9999-99-99".to_string())
        );
    }

    #[test]
    fn test_data_type_mapping_is_deterministic() {
        let value = CellValue::Number(10.0);
        assert_eq!(value.data_type(), DataType::Number);
        assert_eq!(value.data_type(), value.clone().data_type());

        assert_eq!(CellValue::Empty.data_type(), DataType::Empty);
        assert_eq!(
            CellValue::Formula("=A1".to_string()).data_type(),
            DataType::Formula
        );
        assert_eq!(
            CellValue::Error("#N/A".to_string()).data_type(),
            DataType::Error
        );
    }

    #[test]
    fn test_as_number_coercion() {
        assert_eq!(CellValue::Number(3.0).as_number(), Some(3.0));
        assert_eq!(
            CellValue::Text("$1,250.00".to_string()).as_number(),
            Some(1250.0)
        );
        assert_eq!(CellValue::Text("bad".to_string()).as_number(), None);
        assert_eq!(CellValue::Boolean(true).as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_column_letter_and_address() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");

        assert_eq!(cell_address(0, 0), "A1");
        assert_eq!(cell_address(2, 1), "B3");

        let cell = Cell::new(4, 3, CellValue::Number(9.0));
        assert_eq!(cell.address(), "D5");
        assert_eq!(cell.data_type, DataType::Number);
    }
}
