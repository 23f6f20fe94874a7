//! Statement layouts.
//!
//! Each layout is an ordered table of lines with their candidate XBRL tags.
//! Index 0 of every layout is the denominator line.

use commonsize_core::{LayoutEntry, StatementKind};

/// Labels referenced by the derivation rules.
pub mod labels {
    /// Income statement denominator.
    pub const REVENUE: &str = "Revenue";
    /// Cost of revenue.
    pub const COST_OF_REVENUE: &str = "Cost of revenue";
    /// Gross profit.
    pub const GROSS_PROFIT: &str = "Gross profit";
    /// Research and development.
    pub const RESEARCH_AND_DEVELOPMENT: &str = "Research & development";
    /// Selling, general and administrative.
    pub const SELLING_GENERAL_ADMIN: &str = "Selling, general & administrative";
    /// Other operating expenses.
    pub const OTHER_OPERATING_EXPENSES: &str = "Other operating expenses";
    /// Total operating expenses.
    pub const TOTAL_OPERATING_EXPENSES: &str = "Total operating expenses";
    /// Operating income.
    pub const OPERATING_INCOME: &str = "Operating income";
    /// Interest expense.
    pub const INTEREST_EXPENSE: &str = "Interest expense";
    /// Other non-operating income or expense.
    pub const OTHER_INCOME: &str = "Other income (expense)";
    /// Pre-tax income.
    pub const INCOME_BEFORE_TAXES: &str = "Income before taxes";
    /// Income tax.
    pub const INCOME_TAX: &str = "Income tax expense (benefit)";
    /// Net income.
    pub const NET_INCOME: &str = "Net income";

    /// Balance sheet denominator.
    pub const TOTAL_ASSETS: &str = "Total assets";
    /// Total liabilities.
    pub const TOTAL_LIABILITIES: &str = "Total liabilities";
    /// Total stockholders' equity.
    pub const TOTAL_EQUITY: &str = "Total stockholders' equity";
    /// Total liabilities and equity.
    pub const TOTAL_LIABILITIES_AND_EQUITY: &str = "Total liabilities and equity";
}

use labels::*;

/// Index of the line every other line is divided by.
pub const DENOMINATOR_INDEX: usize = 0;

/// Income statement layout.
pub const INCOME_LAYOUT: &[LayoutEntry] = &[
    LayoutEntry::line(
        REVENUE,
        &[
            "Revenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "SalesRevenueNet",
            "SalesRevenueGoodsNet",
        ],
        0,
    ),
    LayoutEntry::line(
        COST_OF_REVENUE,
        &[
            "CostOfRevenue",
            "CostOfGoodsAndServicesSold",
            "CostOfSales",
            "CostOfGoodsSold",
        ],
        1,
    ),
    LayoutEntry::line(GROSS_PROFIT, &["GrossProfit", "GrossProfitLoss"], 0),
    LayoutEntry::header("Operating expenses"),
    LayoutEntry::line(
        RESEARCH_AND_DEVELOPMENT,
        &["ResearchAndDevelopmentExpense", "ResearchAndDevelopment"],
        1,
    ),
    LayoutEntry::line(
        SELLING_GENERAL_ADMIN,
        &[
            "SellingGeneralAndAdministrativeExpense",
            "SellingGeneralAndAdministrativeExpenses",
        ],
        1,
    ),
    LayoutEntry::line(
        OTHER_OPERATING_EXPENSES,
        &["OtherOperatingExpenses", "OtherOperatingIncomeExpense"],
        1,
    ),
    LayoutEntry::line(
        TOTAL_OPERATING_EXPENSES,
        &["OperatingExpenses", "OperatingCostsAndExpenses"],
        0,
    ),
    LayoutEntry::line(
        OPERATING_INCOME,
        &["OperatingIncomeLoss", "OperatingProfitLoss"],
        0,
    ),
    LayoutEntry::line(
        INTEREST_EXPENSE,
        &["InterestExpense", "InterestExpenseDebt"],
        1,
    ),
    LayoutEntry::line(
        OTHER_INCOME,
        &["OtherNonoperatingIncomeExpense", "NonoperatingIncomeExpense"],
        1,
    ),
    LayoutEntry::line(
        INCOME_BEFORE_TAXES,
        &[
            "IncomeLossFromContinuingOperationsBeforeIncomeTaxesExtraordinaryItemsNoncontrollingInterest",
            "IncomeLossFromContinuingOperationsBeforeIncomeTaxes",
            "IncomeBeforeIncomeTaxes",
        ],
        0,
    ),
    LayoutEntry::line(
        INCOME_TAX,
        &[
            "IncomeTaxExpenseBenefit",
            "IncomeTaxExpenseBenefitContinuingOperations",
        ],
        1,
    ),
    LayoutEntry::line(NET_INCOME, &["NetIncomeLoss", "ProfitLoss"], 0),
];

/// Balance sheet layout.
pub const BALANCE_LAYOUT: &[LayoutEntry] = &[
    LayoutEntry::line(TOTAL_ASSETS, &["Assets"], 0),
    LayoutEntry::header("Current assets"),
    LayoutEntry::line(
        "Cash and cash equivalents",
        &[
            "CashAndCashEquivalentsAtCarryingValue",
            "CashCashEquivalentsAndShortTermInvestments",
        ],
        1,
    ),
    LayoutEntry::line(
        "Short-term investments",
        &[
            "MarketableSecuritiesCurrent",
            "AvailableForSaleSecuritiesCurrent",
        ],
        1,
    ),
    LayoutEntry::line(
        "Accounts receivable",
        &[
            "AccountsReceivableNetCurrent",
            "AccountsReceivableTradeNetCurrent",
        ],
        1,
    ),
    LayoutEntry::line("Inventory", &["InventoryNet", "InventoryFinishedGoods"], 1),
    LayoutEntry::line(
        "Other current assets",
        &["OtherAssetsCurrent", "PrepaidExpenseAndOtherAssetsCurrent"],
        1,
    ),
    LayoutEntry::line("Total current assets", &["AssetsCurrent", "CurrentAssets"], 0),
    LayoutEntry::header("Non-current assets"),
    LayoutEntry::line(
        "Property, plant and equipment, net",
        &[
            "PropertyPlantAndEquipmentNet",
            "PropertyPlantAndEquipmentIncludingConstructionInProgress",
        ],
        1,
    ),
    LayoutEntry::line(
        "Operating lease right-of-use assets",
        &[
            "OperatingLeaseRightOfUseAsset",
            "OperatingLeaseRightOfUseAssetNoncurrent",
        ],
        1,
    ),
    LayoutEntry::line("Goodwill", &["Goodwill"], 1),
    LayoutEntry::line(
        "Intangible assets, net",
        &["IntangibleAssetsNetExcludingGoodwill", "IntangibleAssetsNet"],
        1,
    ),
    LayoutEntry::line(
        "Other non-current assets",
        &["OtherAssetsNoncurrent", "OtherAssets"],
        1,
    ),
    LayoutEntry::line(
        "Total non-current assets",
        &["AssetsNoncurrent", "NoncurrentAssets"],
        0,
    ),
    LayoutEntry::header("Liabilities and equity"),
    LayoutEntry::header("Current liabilities"),
    LayoutEntry::line(
        "Accounts payable",
        &["AccountsPayableCurrent", "AccountsPayableTradeCurrent"],
        1,
    ),
    LayoutEntry::line(
        "Accrued liabilities",
        &[
            "AccruedLiabilitiesCurrent",
            "AccruedExpensesAndOtherCurrentLiabilities",
        ],
        1,
    ),
    LayoutEntry::line(
        "Short-term debt",
        &[
            "ShortTermBorrowings",
            "ShortTermDebtAndCurrentPortionOfLongTermDebt",
            "DebtCurrent",
        ],
        1,
    ),
    LayoutEntry::line(
        "Other current liabilities",
        &["OtherLiabilitiesCurrent"],
        1,
    ),
    LayoutEntry::line(
        "Total current liabilities",
        &["LiabilitiesCurrent", "CurrentLiabilities"],
        0,
    ),
    LayoutEntry::header("Non-current liabilities"),
    LayoutEntry::line(
        "Long-term debt",
        &[
            "LongTermDebtNoncurrent",
            "LongTermDebtAndCapitalLeaseObligations",
        ],
        1,
    ),
    LayoutEntry::line(
        "Operating lease liabilities",
        &[
            "OperatingLeaseLiabilityNoncurrent",
            "OperatingLeaseLiability",
        ],
        1,
    ),
    LayoutEntry::line(
        "Other non-current liabilities",
        &["OtherLiabilitiesNoncurrent", "OtherNoncurrentLiabilities"],
        1,
    ),
    LayoutEntry::line(
        "Total non-current liabilities",
        &["LiabilitiesNoncurrent", "NoncurrentLiabilities"],
        0,
    ),
    LayoutEntry::line(TOTAL_LIABILITIES, &["Liabilities"], 0),
    LayoutEntry::header("Stockholders' equity"),
    LayoutEntry::line("Common stock", &["CommonStockValue", "CommonStockCapital"], 1),
    LayoutEntry::line(
        "Additional paid-in capital",
        &[
            "AdditionalPaidInCapital",
            "AdditionalPaidInCapitalCommonStock",
        ],
        1,
    ),
    LayoutEntry::line(
        "Retained earnings",
        &["RetainedEarningsAccumulatedDeficit", "RetainedEarnings"],
        1,
    ),
    LayoutEntry::line(
        "Accumulated other comprehensive income (loss)",
        &[
            "AccumulatedOtherComprehensiveIncomeLossNetOfTax",
            "AccumulatedOtherComprehensiveIncomeLoss",
        ],
        1,
    ),
    LayoutEntry::line(
        "Treasury stock",
        &["TreasuryStockValue", "TreasuryStockCommon"],
        1,
    ),
    LayoutEntry::line(
        TOTAL_EQUITY,
        &[
            "StockholdersEquity",
            "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
        ],
        0,
    ),
    LayoutEntry::line(
        TOTAL_LIABILITIES_AND_EQUITY,
        &[
            "LiabilitiesAndStockholdersEquity",
            "LiabilitiesAndShareholdersEquity",
        ],
        0,
    ),
];

/// Returns the layout for a statement kind.
#[must_use]
pub const fn layout_for(kind: StatementKind) -> &'static [LayoutEntry] {
    match kind {
        StatementKind::Income => INCOME_LAYOUT,
        StatementKind::Balance => BALANCE_LAYOUT,
    }
}
