//! SEC API response types and their conversion to facts.

use commonsize_core::{CommonSizeError, CompanyRef, Fact, FactBag, IndustryInfo, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Taxonomy the statement tags belong to.
const US_GAAP: &str = "us-gaap";

/// Company ticker information from SEC JSON.
#[derive(Debug, Deserialize)]
pub(crate) struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    pub(crate) cik_str: u64,
    pub(crate) ticker: String,
    #[serde(default)]
    pub(crate) title: String,
}

/// Ticker file contents in the order SEC lists them.
///
/// The file is keyed by stringified row numbers; rows are ordered numerically
/// so peer discovery is deterministic.
#[derive(Debug, Default)]
pub(crate) struct TickerMap {
    companies: Vec<CompanyRef>,
    by_ticker: HashMap<String, usize>,
}

impl TickerMap {
    pub(crate) fn from_response(rows: HashMap<String, CompanyTickerInfo>) -> Self {
        let mut rows: Vec<(String, CompanyTickerInfo)> = rows.into_iter().collect();
        rows.sort_by(|(a, _), (b, _)| {
            let a_num = a.parse::<u64>().unwrap_or(u64::MAX);
            let b_num = b.parse::<u64>().unwrap_or(u64::MAX);
            a_num.cmp(&b_num).then_with(|| a.cmp(b))
        });

        let mut map = Self::default();
        for (_, row) in rows {
            let company = CompanyRef::new(row.ticker, row.cik_str.to_string(), row.title);
            // first listing of a ticker wins
            if !map.by_ticker.contains_key(&company.ticker) {
                map.by_ticker
                    .insert(company.ticker.clone(), map.companies.len());
                map.companies.push(company);
            }
        }
        map
    }

    pub(crate) fn get(&self, ticker: &str) -> Option<&CompanyRef> {
        self.by_ticker
            .get(&ticker.to_uppercase())
            .map(|&index| &self.companies[index])
    }

    pub(crate) fn companies(&self) -> &[CompanyRef] {
        &self.companies
    }

    pub(crate) fn len(&self) -> usize {
        self.companies.len()
    }
}

/// Response from the SEC EDGAR Company Facts API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompanyFactsResponse {
    #[serde(default)]
    cik: Option<Value>,
    #[serde(default)]
    entity_name: Option<String>,
    /// Facts organized by taxonomy and tag
    facts: HashMap<String, HashMap<String, TagFacts>>,
}

/// Facts for a specific XBRL tag.
#[derive(Debug, Deserialize)]
struct TagFacts {
    /// Units in sorted order, each holding the reported values
    #[serde(default)]
    units: BTreeMap<String, Vec<FactValue>>,
}

/// A single fact value with metadata.
#[derive(Debug, Clone, Deserialize)]
struct FactValue {
    #[serde(default)]
    end: Option<String>,
    /// Usually a number; kept raw so odd payloads do not fail the whole parse
    #[serde(default)]
    val: Option<Value>,
    #[serde(default)]
    uom: Option<String>,
    #[serde(default)]
    accn: Option<String>,
    #[serde(default)]
    fy: Option<Value>,
    #[serde(default)]
    fp: Option<String>,
    #[serde(default)]
    form: Option<String>,
    #[serde(default)]
    filed: Option<String>,
}

/// Company submissions/filings metadata.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompanySubmissions {
    #[serde(default)]
    sic: Option<String>,
    #[serde(default)]
    sic_description: Option<String>,
}

impl From<CompanySubmissions> for IndustryInfo {
    fn from(submissions: CompanySubmissions) -> Self {
        let sic = submissions.sic.filter(|sic| !sic.trim().is_empty());
        Self::new(sic, submissions.sic_description)
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl From<CompanyFactsResponse> for FactBag {
    fn from(mut response: CompanyFactsResponse) -> Self {
        let mut bag = Self::new();
        bag.entity_name = response.entity_name;
        bag.cik = response.cik.as_ref().and_then(|cik| match cik {
            Value::Number(n) => n.as_u64().map(|n| format!("{n:010}")),
            Value::String(s) => Some(format!("{:0>10}", s.trim())),
            _ => None,
        });

        let Some(taxonomy) = response.facts.remove(US_GAAP) else {
            return bag;
        };

        // Tag order does not matter; order within a tag does
        for (tag, tag_facts) in taxonomy {
            for (unit, values) in tag_facts.units {
                for item in values {
                    bag.push(Fact {
                        tag: tag.clone(),
                        value: item.val.as_ref().and_then(number),
                        unit: item.uom.or_else(|| Some(unit.clone())),
                        end: item.end.unwrap_or_default(),
                        form: item.form,
                        fiscal_period: item.fp,
                        fiscal_year: item
                            .fy
                            .as_ref()
                            .and_then(Value::as_i64)
                            .and_then(|fy| i32::try_from(fy).ok()),
                        accession: item.accn,
                        filed: item.filed,
                    });
                }
            }
        }
        bag
    }
}

/// Parses a company facts payload into a fact bag.
///
/// Only `us-gaap` facts are kept. Values that are not numeric are kept with an
/// absent value.
///
/// # Errors
/// Returns [`CommonSizeError::Parse`] if the payload is not a JSON object of the
/// expected shape.
pub fn parse_company_facts(json: &str) -> Result<FactBag> {
    let response: CompanyFactsResponse = serde_json::from_str(json)
        .map_err(|e| CommonSizeError::Parse(format!("Failed to parse company facts: {e}")))?;
    Ok(response.into())
}
