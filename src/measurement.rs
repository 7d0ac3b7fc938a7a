//! Profiler measurement files
//!
//! The profiler writes one comma-separated row per sample. The first row
//! names the columns; every following row must be numeric. Row order is
//! acquisition order and is preserved.

use serde::Serialize;
use std::path::Path;

use crate::error::{EnergiError, Result};

/// One raw measurement row in acquisition order
pub type RawSample = Vec<f64>;

/// Header row plus the numeric samples of one profiler run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSampleSet {
    header: Vec<String>,
    samples: Vec<RawSample>,
}

impl RawSampleSet {
    /// Build a sample set from an already parsed header and rows
    pub fn new(header: Vec<String>, samples: Vec<RawSample>) -> Self {
        Self { header, samples }
    }

    /// Column names from the header row
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Numeric rows after the header
    pub fn samples(&self) -> &[RawSample] {
        &self.samples
    }

    /// Number of numeric rows (header excluded)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load a measurement file written by the profiler
    pub fn from_file(path: &Path) -> Result<Self> {
        let load_error = |reason: String| EnergiError::MeasurementLoad {
            repetition: None,
            path: path.to_path_buf(),
            reason,
        };

        let file = std::fs::File::open(path).map_err(|e| load_error(e.to_string()))?;
        let set = Self::from_reader(file).map_err(load_error)?;
        tracing::debug!(
            "Loaded {} samples with {} columns from {}",
            set.len(),
            set.header.len(),
            path.display()
        );
        Ok(set)
    }

    /// Parse measurement CSV from any reader
    ///
    /// Fails when the input has no header row, no samples, or a field that
    /// is not a number.
    pub fn from_reader<R: std::io::Read>(reader: R) -> std::result::Result<Self, String> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = csv_reader.records();
        let header: Vec<String> = match records.next() {
            Some(record) => record
                .map_err(|e| e.to_string())?
                .iter()
                .map(str::to_string)
                .collect(),
            None => return Err("file is empty".to_string()),
        };

        let mut samples = Vec::new();
        for (row, record) in records.enumerate() {
            let record = record.map_err(|e| e.to_string())?;
            let sample = record
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    field.parse::<f64>().map_err(|_| {
                        format!(
                            "non-numeric value {:?} at row {}, column {}",
                            field,
                            row + 1,
                            col
                        )
                    })
                })
                .collect::<std::result::Result<RawSample, String>>()?;
            samples.push(sample);
        }

        if samples.is_empty() {
            return Err("no samples after header row".to_string());
        }

        Ok(Self { header, samples })
    }
}
