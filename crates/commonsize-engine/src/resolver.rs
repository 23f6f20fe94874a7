//! Fact selection and value extraction.
//!
//! Filers report the same concept under several tags and restate figures in
//! later filings. The resolver picks one fact per concept and period, preferring
//! facts from the same filing as a reference fact.

use chrono::NaiveDate;
use commonsize_core::{Fact, FactBag, PeriodKind};

/// Selects the best fact for the first tag in `tags` that has a usable fact.
///
/// A fact is usable when its form and fiscal-period marker fit `period` and its
/// end date parses. When `reference` carries an accession number, usable facts
/// from that filing win; otherwise the most recent fact by end date is chosen.
/// Equal end dates resolve to the earliest fact in input order.
#[must_use]
pub fn select_fact<'a>(
    facts: &'a FactBag,
    tags: &[&str],
    period: PeriodKind,
    reference: Option<&Fact>,
) -> Option<&'a Fact> {
    tags.iter()
        .find_map(|tag| select_for_tag(facts, tag, period, reference))
}

/// Converts a fact's reported value to canonical currency units.
///
/// Returns `None` when the fact is absent or its value is missing or not finite.
#[must_use]
pub fn extract_value(fact: Option<&Fact>) -> Option<f64> {
    let fact = fact?;
    let value = fact.value? * unit_multiplier(fact.unit.as_deref());
    value.is_finite().then_some(value)
}

/// Resolves the first tag in `tags` that yields a numeric value.
///
/// Unlike [`select_fact`], a tag whose best fact has no numeric value falls
/// through to the next tag.
#[must_use]
pub fn resolve_value<'a>(
    facts: &'a FactBag,
    tags: &[&str],
    period: PeriodKind,
    reference: Option<&Fact>,
) -> Option<(&'a Fact, f64)> {
    tags.iter().find_map(|tag| {
        let fact = select_for_tag(facts, tag, period, reference)?;
        extract_value(Some(fact)).map(|value| (fact, value))
    })
}

fn select_for_tag<'a>(
    facts: &'a FactBag,
    tag: &str,
    period: PeriodKind,
    reference: Option<&Fact>,
) -> Option<&'a Fact> {
    let usable: Vec<(NaiveDate, &'a Fact)> = facts
        .facts_for(tag)
        .iter()
        .filter(|f| period.accepts(f.form.as_deref(), f.fiscal_period.as_deref()))
        .filter_map(|f| f.end_date().map(|end| (end, f)))
        .collect();

    if usable.is_empty() {
        return None;
    }

    if let Some(accession) = reference.and_then(|r| r.accession.as_deref()) {
        let same_filing = latest(
            usable
                .iter()
                .copied()
                .filter(|(_, f)| f.accession.as_deref() == Some(accession)),
        );
        if same_filing.is_some() {
            return same_filing;
        }
    }

    latest(usable.into_iter())
}

fn latest<'a>(candidates: impl Iterator<Item = (NaiveDate, &'a Fact)>) -> Option<&'a Fact> {
    let mut best: Option<(NaiveDate, &'a Fact)> = None;
    for candidate in candidates {
        // strict comparison keeps the first of equal dates
        if best.is_none_or(|(end, _)| candidate.0 > end) {
            best = Some(candidate);
        }
    }
    best.map(|(_, fact)| fact)
}

fn unit_multiplier(unit: Option<&str>) -> f64 {
    let Some(unit) = unit else {
        return 1.0;
    };
    let normalized = unit.to_lowercase();
    if normalized.contains("million") || has_scale_suffix(unit, 'm') {
        1_000_000.0
    } else if normalized.contains("thousand") || has_scale_suffix(unit, 'k') {
        1_000.0
    } else {
        1.0
    }
}

/// Matches a lowercase scale letter after an uppercase code (`USDm`, `EURk`).
///
/// Currency codes such as `DKK` or `SEK` end in an uppercase letter and carry
/// no scale.
fn has_scale_suffix(unit: &str, scale: char) -> bool {
    unit.strip_suffix(scale)
        .is_some_and(|code| !code.is_empty() && code.chars().all(|c| c.is_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_fact_prefers_reference_accession() {
        let facts = FactBag::new()
            .with_fact(Fact::annual("Revenue", 100.0, "2023-12-31").with_accession("0001"))
            .with_fact(Fact::annual("Cost", 70.0, "2024-12-31").with_accession("0002"))
            .with_fact(Fact::annual("Cost", 65.0, "2023-12-31").with_accession("0001"));

        let revenue = select_fact(&facts, &["Revenue"], PeriodKind::Annual, None).unwrap();
        let cost = select_fact(&facts, &["Cost"], PeriodKind::Annual, Some(revenue)).unwrap();

        assert_eq!(cost.accession.as_deref(), Some("0001"));
        assert_eq!(cost.value, Some(65.0));
    }

    #[test]
    fn test_select_fact_falls_back_to_latest_without_reference_match() {
        let facts = FactBag::new()
            .with_fact(Fact::annual("Metric", 10.0, "2022-12-31"))
            .with_fact(Fact::annual("Metric", 12.0, "2023-12-31"));
        let reference = Fact::annual("Other", 1.0, "2024-12-31").with_accession("0009");

        let fact = select_fact(&facts, &["Metric"], PeriodKind::Annual, Some(&reference)).unwrap();
        assert_eq!(fact.end, "2023-12-31");

        let fact = select_fact(&facts, &["Metric"], PeriodKind::Annual, None).unwrap();
        assert_eq!(fact.value, Some(12.0));
    }

    #[test]
    fn test_select_fact_tag_fallback() {
        let facts = FactBag::new().with_fact(Fact::annual("SalesRevenueNet", 5.0, "2023-12-31"));

        let fact = select_fact(
            &facts,
            &["Revenues", "SalesRevenueNet"],
            PeriodKind::Annual,
            None,
        )
        .unwrap();
        assert_eq!(fact.tag, "SalesRevenueNet");
    }

    #[test]
    fn test_earlier_tag_wins_even_when_older() {
        let facts = FactBag::new()
            .with_fact(Fact::annual("Revenues", 1.0, "2020-12-31"))
            .with_fact(Fact::annual("SalesRevenueNet", 2.0, "2023-12-31"));

        let fact = select_fact(
            &facts,
            &["Revenues", "SalesRevenueNet"],
            PeriodKind::Annual,
            None,
        )
        .unwrap();
        assert_eq!(fact.tag, "Revenues");
    }

    #[test]
    fn test_period_filtering() {
        let facts = FactBag::new()
            .with_fact(
                Fact::new("Revenues", 30.0, "2024-03-31")
                    .with_form("10-Q")
                    .with_fiscal_period("Q1"),
            )
            .with_fact(Fact::annual("Revenues", 100.0, "2023-12-31"));

        let annual = select_fact(&facts, &["Revenues"], PeriodKind::Annual, None).unwrap();
        assert_eq!(annual.value, Some(100.0));

        let quarterly = select_fact(&facts, &["Revenues"], PeriodKind::Quarterly, None).unwrap();
        assert_eq!(quarterly.value, Some(30.0));
    }

    #[test]
    fn test_unparsable_dates_are_unusable() {
        let facts = FactBag::new().with_fact(Fact::annual("Revenues", 1.0, "12/31/2023"));
        assert!(select_fact(&facts, &["Revenues"], PeriodKind::Annual, None).is_none());
    }

    #[test]
    fn test_equal_dates_keep_input_order() {
        let facts = FactBag::new()
            .with_fact(Fact::annual("Revenues", 1.0, "2023-12-31"))
            .with_fact(Fact::annual("Revenues", 2.0, "2023-12-31"));

        let fact = select_fact(&facts, &["Revenues"], PeriodKind::Annual, None).unwrap();
        assert_eq!(fact.value, Some(1.0));
    }

    #[test]
    fn test_extract_value_applies_unit_multiplier() {
        let usd = Fact::annual("X", 2.5, "2023-12-31");
        let thousands = Fact::new("X", 2.5, "2023-12-31").with_unit("USD thousands");
        let millions = Fact::new("X", 2.5, "2023-12-31").with_unit("USDm");

        assert_eq!(extract_value(Some(&usd)), Some(2.5));
        assert_eq!(extract_value(Some(&thousands)), Some(2_500.0));
        assert_eq!(extract_value(Some(&millions)), Some(2_500_000.0));
        assert_eq!(extract_value(None), None);

        let non_numeric = Fact {
            value: None,
            ..usd.clone()
        };
        assert_eq!(extract_value(Some(&non_numeric)), None);
    }

    #[test]
    fn test_currency_codes_carry_no_scale() {
        for code in ["DKK", "SEK", "NOK", "CZK", "ISK", "USD", "MXN"] {
            let fact = Fact::annual("Revenues", 100.0, "2023-12-31").with_unit(code);
            assert_eq!(extract_value(Some(&fact)), Some(100.0), "unit {code}");
        }

        let scaled = Fact::annual("Revenues", 100.0, "2023-12-31").with_unit("DKKk");
        assert_eq!(extract_value(Some(&scaled)), Some(100_000.0));
    }

    #[test]
    fn test_resolve_value_skips_non_numeric_tag() {
        let mut blank = Fact::annual("Revenues", 0.0, "2023-12-31");
        blank.value = None;
        let facts = FactBag::new()
            .with_fact(blank)
            .with_fact(Fact::annual("SalesRevenueNet", 7.0, "2023-12-31"));

        let (fact, value) = resolve_value(
            &facts,
            &["Revenues", "SalesRevenueNet"],
            PeriodKind::Annual,
            None,
        )
        .unwrap();
        assert_eq!(fact.tag, "SalesRevenueNet");
        assert_eq!(value, 7.0);
    }
}
