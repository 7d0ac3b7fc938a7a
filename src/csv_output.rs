//! CSV output for derived power series
//!
//! One row per (run, time, power) point, in run order and then series order.

use crate::extractor::RunSeries;

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput<'a> {
    series: &'a [RunSeries],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter
    pub fn new(series: &'a [RunSeries]) -> Self {
        Self { series }
    }

    /// Point rows: `run,time,power`
    pub fn to_csv(&self) -> csv::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["run", "time", "power"])?;
        for run in self.series {
            for (time, power) in run.series.pairs() {
                writer.serialize((run.run, time, power))?;
            }
        }
        finish(writer)
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> csv::Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
