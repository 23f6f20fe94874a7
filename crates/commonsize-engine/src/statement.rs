//! The built common-size statement.

use commonsize_core::{
    CommonSizeError, IndustryBenchmark, PeriodKind, Result, StatementKind, StatementLine,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A statement with per-line values, own ratios and optional industry ratios.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommonSizeStatement {
    /// Statement kind.
    pub kind: StatementKind,
    /// Period kind the facts were selected for.
    pub period: PeriodKind,
    /// Lines in layout order.
    pub lines: Vec<StatementLine>,
    /// Number of peers behind the industry column; 0 when there is none.
    pub peer_count: usize,
}

impl CommonSizeStatement {
    /// Returns the common-size ratio of each line.
    #[must_use]
    pub fn ratios(&self) -> Vec<Option<f64>> {
        self.lines.iter().map(|l| l.common_size).collect()
    }

    /// Returns the industry ratio of each line.
    #[must_use]
    pub fn industry_ratios(&self) -> Vec<Option<f64>> {
        self.lines.iter().map(|l| l.industry_common_size).collect()
    }

    /// Returns true if any line carries an industry ratio.
    #[must_use]
    pub fn has_industry(&self) -> bool {
        self.lines.iter().any(|l| l.industry_common_size.is_some())
    }

    /// Copies cached industry ratios onto the lines.
    ///
    /// # Errors
    /// Returns [`CommonSizeError::SchemaMismatch`] if the benchmark was computed
    /// for a different layout.
    pub fn apply_benchmark(&mut self, benchmark: &IndustryBenchmark) -> Result<()> {
        benchmark.check_schema(self.lines.len())?;
        for (line, ratio) in self.lines.iter_mut().zip(&benchmark.ratios) {
            line.industry_common_size = *ratio;
        }
        self.peer_count = benchmark.peer_count;
        Ok(())
    }

    /// Exports the statement as a polars frame, one row per line.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let labels: Vec<&str> = self.lines.iter().map(|l| l.label.as_str()).collect();
        let values: Vec<Option<f64>> = self.lines.iter().map(|l| l.value).collect();
        let indents: Vec<u32> = self.lines.iter().map(|l| u32::from(l.indent)).collect();
        let headers: Vec<bool> = self.lines.iter().map(|l| l.is_header).collect();

        DataFrame::new(vec![
            Column::new("label".into(), labels),
            Column::new("value".into(), values),
            Column::new("common_size".into(), self.ratios()),
            Column::new("industry_common_size".into(), self.industry_ratios()),
            Column::new("indent".into(), indents),
            Column::new("is_header".into(), headers),
        ])
        .map_err(|e| CommonSizeError::Other(e.to_string()))
    }
}
