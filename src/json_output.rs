//! JSON output for derived power series

use serde::Serialize;

use crate::extractor::RunSeries;
use crate::stats::SeriesSummary;

/// One run in the JSON report
#[derive(Debug, Clone, Serialize)]
pub struct JsonRun {
    pub run: usize,
    pub summary: SeriesSummary,
    pub time: Vec<f64>,
    pub power: Vec<f64>,
}

/// A failed repetition
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition: Option<usize>,
    pub error: String,
}

/// Complete JSON report
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub cumulative: bool,
    pub runs: Vec<JsonRun>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<JsonFailure>,
}

impl JsonOutput {
    pub fn new(series: &[RunSeries], cumulative: bool) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            cumulative,
            runs: series
                .iter()
                .map(|r| JsonRun {
                    run: r.run,
                    summary: SeriesSummary::from_series(&r.series),
                    time: r.series.time().to_vec(),
                    power: r.series.power().to_vec(),
                })
                .collect(),
            failures: Vec::new(),
        }
    }

    pub fn add_failure(&mut self, repetition: Option<usize>, error: impl Into<String>) {
        self.failures.push(JsonFailure {
            repetition,
            error: error.into(),
        });
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
