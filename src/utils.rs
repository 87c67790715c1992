use chrono::{Days, NaiveDate};

/// Date formats accepted when normalizing text dates, tried in order.
/// ISO forms come first; for ambiguous numeric dates the US month-first
/// form wins over the day-first form.
pub const DATE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Largest Excel serial date handled (9999-12-31 in the 1900 date system).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Extracts a numeric value from spreadsheet text, tolerating the
/// decorations that show up in exported financial models: currency
/// symbols, thousands separators, percent signs and parenthesized
/// negatives.
///
/// # Examples
/// - "1,234" -> 1234.0
/// - "$5.50" -> 5.5
/// - "(1,500)" -> -1500.0
/// - "12%" -> 0.12
/// - "bad" -> None
pub fn extract_numeric_value(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Accountants write negatives as "(1,500)".
    let mut negative = false;
    let mut inner = trimmed;
    if inner.len() > 2 && inner.starts_with('(') && inner.ends_with(')') {
        negative = true;
        inner = &inner[1..inner.len() - 1];
    }

    let mut percent = false;
    let mut cleaned = String::with_capacity(inner.len());
    for ch in inner.chars() {
        match ch {
            '$' | '€' | '£' | '¥' | ',' | ' ' | '\u{a0}' => continue,
            '%' => percent = true,
            _ => cleaned.push(ch),
        }
    }

    // f64 parsing accepts "inf" and "nan"; neither is a usable amount.
    let parsed: f64 = cleaned.parse().ok().filter(|v: &f64| v.is_finite())?;

    let mut value = if percent { parsed / 100.0 } else { parsed };
    if negative {
        value = -value;
    }
    Some(value)
}

/// Parses a date written as text using [`DATE_INPUT_FORMATS`].
/// Returns `None` when no format matches.
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Converts an Excel 1900-system serial date to a calendar date.
///
/// Uses the conventional 1899-12-30 epoch, which is exact for serials
/// from 1900-03-01 onward; the phantom 1900 leap day makes earlier
/// serials ambiguous and they are not worth special-casing here.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }

    let days = serial.trunc() as u64;
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days))
}

/// Lowercases and trims a row or header label for vocabulary matching.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// True when the normalized label contains any of the given keywords.
/// Keywords are expected to be lowercase.
pub fn label_contains_any(label: &str, keywords: &[&str]) -> bool {
    let normalized = normalize_label(label);
    keywords.iter().any(|keyword| normalized.contains(keyword))
}
