//! In-process provider used by the facade tests.

use async_trait::async_trait;
use commonsize_core::{
    CommonSizeError, CompanyRef, DataProvider, Fact, FactBag, FactProvider, IndustryClassifier,
    IndustryInfo, PeerFacts, Result,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Company {
    company: CompanyRef,
    industry: IndustryInfo,
    facts: FactBag,
}

/// Serves fixed companies; peers are the other companies sharing a SIC code.
#[derive(Debug, Default)]
pub(crate) struct FakeProvider {
    companies: Vec<Company>,
    failing: HashSet<String>,
    peer_fetches: AtomicUsize,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_company(
        mut self,
        ticker: &str,
        cik: &str,
        sic: Option<&str>,
        facts: FactBag,
    ) -> Self {
        let company = CompanyRef::new(ticker, cik, format!("{ticker} Inc."));
        self.companies.push(Company {
            company,
            industry: IndustryInfo::new(sic.map(str::to_string), None),
            facts,
        });
        self
    }

    /// Makes fact requests for `cik` fail with a network error.
    pub(crate) fn with_failing(mut self, cik: &str) -> Self {
        self.failing.insert(CompanyRef::new("", cik, "").cik);
        self
    }

    pub(crate) fn peer_fetches(&self) -> usize {
        self.peer_fetches.load(Ordering::SeqCst)
    }

    fn find(&self, cik: &str) -> Result<&Company> {
        let cik = CompanyRef::new("", cik, "").cik;
        self.companies
            .iter()
            .find(|c| c.company.cik == cik)
            .ok_or_else(|| CommonSizeError::UnknownEntity(format!("CIK {cik}")))
    }
}

/// Annual income facts with the given revenue and net income.
pub(crate) fn income_facts(name: &str, revenue: f64, net_income: f64) -> FactBag {
    [("Revenues", revenue), ("NetIncomeLoss", net_income)]
        .into_iter()
        .map(|(tag, value)| Fact::annual(tag, value, "2023-12-31").with_accession("0001"))
        .collect::<FactBag>()
        .with_entity_name(name)
}

impl DataProvider for FakeProvider {
    fn name(&self) -> &str {
        "Fake"
    }

    fn description(&self) -> &str {
        "Fixed companies for tests"
    }
}

#[async_trait]
impl FactProvider for FakeProvider {
    async fn resolve_entity(&self, ticker_or_cik: &str) -> Result<CompanyRef> {
        let wanted = ticker_or_cik.trim().to_uppercase();
        if let Some(c) = self.companies.iter().find(|c| c.company.ticker == wanted) {
            return Ok(c.company.clone());
        }
        Ok(self.find(&wanted)?.company.clone())
    }

    async fn fetch_facts(&self, cik: &str) -> Result<FactBag> {
        let company = self.find(cik)?;
        if self.failing.contains(&company.company.cik) {
            return Err(CommonSizeError::Network(format!("HTTP 503 for {cik}")));
        }
        Ok(company.facts.clone())
    }

    async fn fetch_peer_facts(&self, cik: &str, max_peers: usize) -> Result<PeerFacts> {
        self.peer_fetches.fetch_add(1, Ordering::SeqCst);
        let subject = self.find(cik)?;
        let mut result = PeerFacts {
            industry: subject.industry.clone(),
            ..Default::default()
        };
        let Some(sic) = subject.industry.sic.as_deref() else {
            return Ok(result);
        };

        let peers = self.companies.iter().filter(|c| {
            c.company.cik != subject.company.cik && c.industry.sic.as_deref() == Some(sic)
        });
        for peer in peers.take(max_peers) {
            if let Ok(facts) = self.fetch_facts(&peer.company.cik).await {
                result.peers.push(peer.company.clone());
                result.fact_sets.push(facts);
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl IndustryClassifier for FakeProvider {
    async fn industry(&self, cik: &str) -> Result<IndustryInfo> {
        Ok(self.find(cik)?.industry.clone())
    }
}
