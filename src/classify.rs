use crate::schema::SheetType;
use crate::utils::{label_contains_any, normalize_label};

/// Sheet-name vocabulary in priority order. When two statement types
/// score equally, the one listed first wins.
pub const SHEET_NAME_KEYWORDS: &[(SheetType, &[&str])] = &[
    (
        SheetType::ProfitLoss,
        &[
            "profit and loss",
            "profit & loss",
            "profit&loss",
            "p&l",
            "p & l",
            "pnl",
            "income statement",
            "income",
            "profit",
        ],
    ),
    (
        SheetType::BalanceSheet,
        &[
            "balance sheet",
            "balance",
            "financial position",
            "net assets",
        ],
    ),
    (
        SheetType::CashFlow,
        &[
            "cash flow",
            "cashflow",
            "cash-flow",
            "statement of cash",
            "cash",
        ],
    ),
];

/// Row labels that identify a profit & loss sheet by content.
pub const PROFIT_LOSS_LABELS: &[&str] = &[
    "revenue",
    "sales",
    "turnover",
    "cost of sales",
    "cost of goods",
    "cogs",
    "gross profit",
    "operating expense",
    "expenses",
    "ebitda",
    "net income",
    "net profit",
];

/// Row labels that identify a balance sheet by content.
pub const BALANCE_SHEET_LABELS: &[&str] = &[
    "total assets",
    "assets",
    "liabilities",
    "equity",
    "receivable",
    "payable",
    "inventory",
    "retained earnings",
    "share capital",
];

/// Row labels that identify a cash flow statement by content.
pub const CASH_FLOW_LABELS: &[&str] = &[
    "operating activities",
    "investing activities",
    "financing activities",
    "net cash",
    "opening cash",
    "closing cash",
];

/// Semantic-row vocabularies used by template validation. The stem
/// "liabilit" covers both "liability" and "liabilities".
pub const REVENUE_ROW_KEYWORDS: &[&str] = &["revenue", "sales", "turnover", "income"];
pub const EXPENSE_ROW_KEYWORDS: &[&str] = &[
    "expense", "cost", "cogs", "overhead", "payroll", "salaries", "rent",
];
pub const ASSET_ROW_KEYWORDS: &[&str] = &[
    "asset", "cash", "receivable", "inventory", "equipment", "property",
];
pub const LIABILITY_ROW_KEYWORDS: &[&str] = &[
    "liabilit", "payable", "loan", "debt", "accrued", "provision",
];
pub const EQUITY_ROW_KEYWORDS: &[&str] = &[
    "equity",
    "retained earnings",
    "share capital",
    "owner",
];
pub const CASH_ACTIVITY_ROW_KEYWORDS: &[&str] = &[
    "operating",
    "investing",
    "financing",
    "net cash",
    "net change in cash",
];

/// The content vocabulary for one statement type.
pub fn label_vocabulary(sheet_type: SheetType) -> &'static [&'static str] {
    match sheet_type {
        SheetType::ProfitLoss => PROFIT_LOSS_LABELS,
        SheetType::BalanceSheet => BALANCE_SHEET_LABELS,
        SheetType::CashFlow => CASH_FLOW_LABELS,
        SheetType::Other => &[],
    }
}

/// Classifies a worksheet from its name and a sample of its labels
/// (header row plus leading row labels).
///
/// Each statement type is scored by keyword hits; a name hit counts
/// double a label hit. The best strictly-positive score wins, ties
/// resolving to the priority order of [`SHEET_NAME_KEYWORDS`]. A sheet
/// matching nothing is `Other`.
pub fn classify_sheet(name: &str, labels: &[String]) -> SheetType {
    const NAME_WEIGHT: usize = 2;

    let normalized_name = normalize_label(name);
    let mut best = SheetType::Other;
    let mut best_score = 0usize;

    for (sheet_type, name_keywords) in SHEET_NAME_KEYWORDS {
        let mut score = 0;
        for keyword in *name_keywords {
            if normalized_name.contains(keyword) {
                score += NAME_WEIGHT;
            }
        }

        let vocabulary = label_vocabulary(*sheet_type);
        for label in labels {
            if label_contains_any(label, vocabulary) {
                score += 1;
            }
        }

        if score > best_score {
            best_score = score;
            best = *sheet_type;
        }
    }

    best
}
