//! Reporting period and statement kind definitions.
//!
//! This module defines [`PeriodKind`] for the fiscal period a statement covers
//! and [`StatementKind`] for which statement layout is applied.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonSizeError;

/// Fiscal-period markers accepted for annual figures.
const ANNUAL_MARKERS: &[&str] = &["FY", "Q4", "12M"];

/// Fiscal-period markers accepted for quarterly figures.
const QUARTERLY_MARKERS: &[&str] = &["Q1", "Q2", "Q3", "Q4"];

/// Forms whose figures may back an annual statement.
const ANNUAL_FORMS: &[&str] = &["10-K", "10-K/A", "20-F", "40-F"];

/// Forms that carry quarterly figures.
const QUARTERLY_FORMS: &[&str] = &["10-Q", "10-Q/A"];

/// Period kind for fundamental financial data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Full fiscal year.
    #[default]
    Annual,
    /// Single fiscal quarter.
    Quarterly,
}

impl PeriodKind {
    /// Returns the storage/display name of this period kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }

    /// Returns true if a fact with this form and fiscal-period marker may be
    /// used for this period kind.
    ///
    /// Annual statements require a full-year marker from an annual-report form.
    /// Quarterly statements accept any quarter marker from an annual- or
    /// quarterly-report form.
    #[must_use]
    pub fn accepts(&self, form: Option<&str>, fiscal_period: Option<&str>) -> bool {
        let (Some(form), Some(fp)) = (form, fiscal_period) else {
            return false;
        };
        let fp = fp.to_ascii_uppercase();
        match self {
            Self::Annual => ANNUAL_FORMS.contains(&form) && ANNUAL_MARKERS.contains(&fp.as_str()),
            Self::Quarterly => {
                (ANNUAL_FORMS.contains(&form) || QUARTERLY_FORMS.contains(&form))
                    && QUARTERLY_MARKERS.contains(&fp.as_str())
            }
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodKind {
    type Err = CommonSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" => Ok(Self::Annual),
            "quarterly" => Ok(Self::Quarterly),
            other => Err(CommonSizeError::InvalidParameter(format!(
                "Unsupported period '{other}'"
            ))),
        }
    }
}

/// Which statement layout is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// Income statement, common-sized against total revenue.
    #[default]
    Income,
    /// Balance sheet, common-sized against total assets.
    Balance,
}

impl StatementKind {
    /// Returns the storage/display name of this statement kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementKind {
    type Err = CommonSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "balance" => Ok(Self::Balance),
            other => Err(CommonSizeError::InvalidParameter(format!(
                "Unsupported statement type '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annual_acceptance() {
        let annual = PeriodKind::Annual;
        assert!(annual.accepts(Some("10-K"), Some("FY")));
        assert!(annual.accepts(Some("10-K"), Some("Q4")));
        assert!(annual.accepts(Some("10-K/A"), Some("FY")));
        assert!(!annual.accepts(Some("10-Q"), Some("FY")));
        assert!(!annual.accepts(Some("10-K"), Some("Q2")));
        assert!(!annual.accepts(None, Some("FY")));
        assert!(!annual.accepts(Some("10-K"), None));
    }

    #[test]
    fn test_quarterly_acceptance() {
        let quarterly = PeriodKind::Quarterly;
        assert!(quarterly.accepts(Some("10-Q"), Some("Q1")));
        assert!(quarterly.accepts(Some("10-K"), Some("Q4")));
        assert!(!quarterly.accepts(Some("10-Q"), Some("FY")));
        assert!(!quarterly.accepts(Some("8-K"), Some("Q2")));
    }

    #[test]
    fn test_round_trip_names() {
        assert_eq!("annual".parse::<PeriodKind>().unwrap(), PeriodKind::Annual);
        assert_eq!("Quarterly".parse::<PeriodKind>().unwrap(), PeriodKind::Quarterly);
        assert_eq!("balance".parse::<StatementKind>().unwrap(), StatementKind::Balance);
        assert!("cash".parse::<StatementKind>().is_err());
        assert_eq!(StatementKind::Income.to_string(), "income");
    }
}
