use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Version of the cell-reference grammar below. Bumped whenever the
/// recognized reference syntax changes, so downstream dependency graphs
/// can tell which grammar produced their edges.
pub const REFERENCE_GRAMMAR_VERSION: u32 = 1;

/// One A1-style reference with an optional sheet qualifier: a quoted
/// sheet ('My Sheet'!), a bare sheet (Sheet2!), absolute markers ($),
/// one to three column letters and one to seven row digits.
static CELL_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:'(?P<quoted_sheet>[^']+)'!|(?P<sheet>[A-Za-z_][A-Za-z0-9_]*)!)?(?P<col>\$?[A-Za-z]{1,3})(?P<row>\$?[0-9]{1,7})",
    )
    .unwrap()
});

/// Extracts the set of cell references a formula depends on, normalized
/// to `Sheet!ADDRESS` form: unqualified references take the containing
/// sheet's name, absolute markers are stripped and column letters are
/// uppercased. The ordered set de-duplicates repeated references.
///
/// Tokens that merely look like references are rejected by boundary
/// checks: `LOG10(` is a function call, `1.5E2` is a number literal and
/// `TAX1` inside a longer identifier is a name, not a cell.
pub fn parse_formula_dependencies(formula: &str, sheet_name: &str) -> BTreeSet<String> {
    let bytes = formula.as_bytes();
    let mut dependencies = BTreeSet::new();
    let mut previous: Option<(usize, String)> = None;

    for caps in CELL_REFERENCE.captures_iter(formula) {
        let whole = caps.get(0).unwrap();
        if !boundaries_ok(bytes, whole.start(), whole.end()) {
            previous = None;
            continue;
        }

        let column = caps
            .name("col")
            .unwrap()
            .as_str()
            .trim_start_matches('$')
            .to_ascii_uppercase();
        let row = caps.name("row").unwrap().as_str().trim_start_matches('$');

        let explicit_sheet = caps
            .name("quoted_sheet")
            .or_else(|| caps.name("sheet"))
            .map(|m| m.as_str().to_string());

        let sheet = match explicit_sheet {
            Some(s) => s,
            None => match &previous {
                // The right endpoint of a range stays on the left
                // endpoint's sheet: Sheet2!A1:B3 depends on Sheet2!B3.
                Some((end, previous_sheet))
                    if whole.start() == *end + 1 && bytes[*end] == b':' =>
                {
                    previous_sheet.clone()
                }
                _ => sheet_name.to_string(),
            },
        };

        dependencies.insert(format!("{}!{}{}", sheet, column, row));
        previous = Some((whole.end(), sheet));
    }

    dependencies
}

/// A candidate reference is real only when it is not embedded in a
/// longer identifier or number and is not immediately called like a
/// function.
fn boundaries_ok(bytes: &[u8], start: usize, end: usize) -> bool {
    if start > 0 {
        let before = bytes[start - 1];
        if before.is_ascii_alphanumeric() || before == b'_' || before == b'$' || before == b'.' {
            return false;
        }
    }
    if end < bytes.len() {
        let after = bytes[end];
        if after.is_ascii_alphanumeric() || after == b'_' || after == b'(' || after == b'.' {
            return false;
        }
    }
    true
}
