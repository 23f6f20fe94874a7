//! Algebraic reconciliation of statement aggregates.
//!
//! Filers often omit subtotals or report them on a different basis than their
//! components. These rules fill or correct aggregate lines from the lines they
//! are composed of. A line is overwritten only when it is absent or differs
//! from the derived value by more than [`TOLERANCE`].

use commonsize_core::{StatementKind, StatementLine};
use tracing::trace;

use crate::layout::labels::*;

/// Absolute difference, in currency units, below which values agree.
pub const TOLERANCE: f64 = 1.0;

/// Applies the derivation rules for `kind` to `lines` in place.
pub fn apply_derivations(kind: StatementKind, lines: &mut [StatementLine]) {
    match kind {
        StatementKind::Income => apply_income_derivations(lines),
        StatementKind::Balance => apply_balance_derivations(lines),
    }
}

/// Reconciles gross profit, operating expenses, operating income, pre-tax
/// income and net income.
pub fn apply_income_derivations(lines: &mut [StatementLine]) {
    let mut lines = LineValues(lines);

    let revenue = lines.get(REVENUE);
    match (revenue, lines.get(GROSS_PROFIT), lines.get(COST_OF_REVENUE)) {
        (Some(revenue), Some(gross), _) => lines.reconcile(COST_OF_REVENUE, revenue - gross),
        (Some(revenue), None, Some(cost)) => lines.reconcile(GROSS_PROFIT, revenue - cost),
        _ => {}
    }

    if lines.get(TOTAL_OPERATING_EXPENSES).is_none() {
        let components: Vec<f64> = [
            RESEARCH_AND_DEVELOPMENT,
            SELLING_GENERAL_ADMIN,
            OTHER_OPERATING_EXPENSES,
        ]
        .into_iter()
        .filter_map(|label| lines.get(label))
        .collect();
        if !components.is_empty() {
            lines.reconcile(TOTAL_OPERATING_EXPENSES, components.iter().sum());
        }
    }

    if let (Some(gross), Some(opex)) = (
        lines.get(GROSS_PROFIT),
        lines.get(TOTAL_OPERATING_EXPENSES),
    ) {
        lines.reconcile(OPERATING_INCOME, gross - opex);
    }

    if let (Some(operating), Some(other)) = (lines.get(OPERATING_INCOME), lines.get(OTHER_INCOME))
    {
        let interest = lines.get(INTEREST_EXPENSE).unwrap_or(0.0);
        lines.reconcile(INCOME_BEFORE_TAXES, operating + other - interest);
    }

    if let (Some(pretax), Some(tax)) = (lines.get(INCOME_BEFORE_TAXES), lines.get(INCOME_TAX)) {
        lines.reconcile(NET_INCOME, pretax - tax);
    }

    if let (Some(revenue), Some(cost)) = (lines.get(REVENUE), lines.get(COST_OF_REVENUE)) {
        lines.reconcile(GROSS_PROFIT, revenue - cost);
    }
}

/// Reconciles total liabilities and equity with its components, falling back
/// to total assets.
pub fn apply_balance_derivations(lines: &mut [StatementLine]) {
    let mut lines = LineValues(lines);

    if let (Some(liabilities), Some(equity)) =
        (lines.get(TOTAL_LIABILITIES), lines.get(TOTAL_EQUITY))
    {
        lines.reconcile(TOTAL_LIABILITIES_AND_EQUITY, liabilities + equity);
    }

    if lines.get(TOTAL_LIABILITIES_AND_EQUITY).is_none()
        && let Some(assets) = lines.get(TOTAL_ASSETS)
    {
        lines.reconcile(TOTAL_LIABILITIES_AND_EQUITY, assets);
    }
}

/// Label-addressed view over statement lines.
struct LineValues<'a>(&'a mut [StatementLine]);

impl LineValues<'_> {
    fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|l| l.label == label).and_then(|l| l.value)
    }

    fn reconcile(&mut self, label: &str, derived: f64) {
        let Some(line) = self.0.iter_mut().find(|l| l.label == label) else {
            return;
        };
        match line.value {
            Some(current) if (current - derived).abs() <= TOLERANCE => {}
            current => {
                trace!(line = label, ?current, derived, "Derived line value");
                line.value = Some(derived);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BALANCE_LAYOUT, INCOME_LAYOUT};
    use commonsize_core::LayoutEntry;

    fn blank(layout: &[LayoutEntry]) -> Vec<StatementLine> {
        layout.iter().map(StatementLine::from_layout).collect()
    }

    fn set(lines: &mut [StatementLine], label: &str, value: f64) {
        lines.iter_mut().find(|l| l.label == label).unwrap().value = Some(value);
    }

    fn value(lines: &[StatementLine], label: &str) -> Option<f64> {
        lines.iter().find(|l| l.label == label).unwrap().value
    }

    #[test]
    fn test_cost_derived_from_gross_profit() {
        let mut lines = blank(INCOME_LAYOUT);
        set(&mut lines, REVENUE, 200.0);
        set(&mut lines, GROSS_PROFIT, 80.0);

        apply_income_derivations(&mut lines);
        assert_eq!(value(&lines, COST_OF_REVENUE), Some(120.0));
    }

    #[test]
    fn test_gross_derived_from_cost() {
        let mut lines = blank(INCOME_LAYOUT);
        set(&mut lines, REVENUE, 200.0);
        set(&mut lines, COST_OF_REVENUE, 150.0);

        apply_income_derivations(&mut lines);
        assert_eq!(value(&lines, GROSS_PROFIT), Some(50.0));
    }

    #[test]
    fn test_values_within_tolerance_are_kept() {
        let mut lines = blank(INCOME_LAYOUT);
        set(&mut lines, REVENUE, 200.0);
        set(&mut lines, GROSS_PROFIT, 80.0);
        set(&mut lines, COST_OF_REVENUE, 120.5);

        apply_income_derivations(&mut lines);
        assert_eq!(value(&lines, COST_OF_REVENUE), Some(120.5));
    }

    #[test]
    fn test_operating_chain() {
        let mut lines = blank(INCOME_LAYOUT);
        set(&mut lines, REVENUE, 1_000.0);
        set(&mut lines, GROSS_PROFIT, 600.0);
        set(&mut lines, RESEARCH_AND_DEVELOPMENT, 100.0);
        set(&mut lines, SELLING_GENERAL_ADMIN, 200.0);
        set(&mut lines, OTHER_INCOME, 20.0);
        set(&mut lines, INTEREST_EXPENSE, 10.0);
        set(&mut lines, INCOME_TAX, 60.0);
        // inconsistent with the derived chain
        set(&mut lines, OPERATING_INCOME, 250.0);

        apply_income_derivations(&mut lines);
        assert_eq!(value(&lines, TOTAL_OPERATING_EXPENSES), Some(300.0));
        assert_eq!(value(&lines, OPERATING_INCOME), Some(300.0));
        assert_eq!(value(&lines, INCOME_BEFORE_TAXES), Some(310.0));
        assert_eq!(value(&lines, NET_INCOME), Some(250.0));
    }

    #[test]
    fn test_reported_total_opex_is_not_replaced_by_partial_sum() {
        let mut lines = blank(INCOME_LAYOUT);
        set(&mut lines, RESEARCH_AND_DEVELOPMENT, 100.0);
        set(&mut lines, TOTAL_OPERATING_EXPENSES, 450.0);

        apply_income_derivations(&mut lines);
        assert_eq!(value(&lines, TOTAL_OPERATING_EXPENSES), Some(450.0));
    }

    #[test]
    fn test_pretax_requires_other_income() {
        let mut lines = blank(INCOME_LAYOUT);
        set(&mut lines, OPERATING_INCOME, 30.0);
        set(&mut lines, INTEREST_EXPENSE, 5.0);

        apply_income_derivations(&mut lines);
        assert_eq!(value(&lines, INCOME_BEFORE_TAXES), None);
    }

    #[test]
    fn test_balance_total_from_components() {
        let mut lines = blank(BALANCE_LAYOUT);
        set(&mut lines, TOTAL_ASSETS, 500.0);
        set(&mut lines, TOTAL_LIABILITIES, 300.0);
        set(&mut lines, TOTAL_EQUITY, 150.0);

        apply_balance_derivations(&mut lines);
        assert_eq!(value(&lines, TOTAL_LIABILITIES_AND_EQUITY), Some(450.0));
    }

    #[test]
    fn test_inconsistent_balance_total_is_replaced() {
        let mut lines = blank(BALANCE_LAYOUT);
        set(&mut lines, TOTAL_LIABILITIES, 300.0);
        set(&mut lines, TOTAL_EQUITY, 150.0);
        set(&mut lines, TOTAL_LIABILITIES_AND_EQUITY, 480.0);

        apply_balance_derivations(&mut lines);
        assert_eq!(value(&lines, TOTAL_LIABILITIES_AND_EQUITY), Some(450.0));
    }

    #[test]
    fn test_consistent_balance_total_is_kept() {
        let mut lines = blank(BALANCE_LAYOUT);
        set(&mut lines, TOTAL_LIABILITIES, 300.0);
        set(&mut lines, TOTAL_EQUITY, 150.0);
        set(&mut lines, TOTAL_LIABILITIES_AND_EQUITY, 450.5);

        apply_balance_derivations(&mut lines);
        assert_eq!(value(&lines, TOTAL_LIABILITIES_AND_EQUITY), Some(450.5));
    }

    #[test]
    fn test_balance_total_defaults_to_assets() {
        let mut lines = blank(BALANCE_LAYOUT);
        set(&mut lines, TOTAL_ASSETS, 500.0);

        apply_balance_derivations(&mut lines);
        assert_eq!(value(&lines, TOTAL_LIABILITIES_AND_EQUITY), Some(500.0));
    }
}
