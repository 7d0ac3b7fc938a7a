//! Power series extraction from raw profiler samples
//!
//! Order of operations matters and is fixed:
//! 1. drop the header row
//! 2. select the time and power/energy columns, differencing energy counters
//! 3. cumulative mode: prefix-sum both columns (time in seconds), drop the last point
//! 4. interval mode: drop the first and last point
//! 5. pair the columns

use crate::config::ColumnConfig;
use crate::error::{EnergiError, Result};
use crate::measurement::RawSampleSet;
use crate::series::{PowerSeries, MS_PER_SECOND};

/// Rows needed after the header for a non-empty cumulative series
pub const MIN_CUMULATIVE_ROWS: usize = 2;

/// Rows needed after the header for a non-empty interval series
pub const MIN_INTERVAL_ROWS: usize = 3;

/// First difference with a leading zero, so the output length equals the input length
///
/// # Example
/// ```
/// use jupyter_energi::extractor::diff_with_leading_zero;
///
/// assert_eq!(diff_with_leading_zero(&[10.0, 30.0, 70.0]), vec![0.0, 20.0, 40.0]);
/// ```
pub fn diff_with_leading_zero(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    std::iter::once(0.0)
        .chain(values.windows(2).map(|w| w[1] - w[0]))
        .collect()
}

/// Prefix sums in order
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Derive a time/power series from one run's samples
///
/// Pure function of its inputs: identical samples and configuration give
/// bit-identical output.
///
/// # Errors
///
/// `MalformedSample` when too few rows remain after the header for the
/// requested mode, or a row is too short for the configured columns.
pub fn extract_power_series(
    samples: &RawSampleSet,
    cumulative: bool,
    columns: &ColumnConfig,
) -> Result<PowerSeries> {
    let rows = samples.samples();
    let min_rows = if cumulative {
        MIN_CUMULATIVE_ROWS
    } else {
        MIN_INTERVAL_ROWS
    };
    if rows.len() < min_rows {
        return Err(EnergiError::malformed(format!(
            "{} mode needs at least {} rows after the header, got {}",
            if cumulative { "cumulative" } else { "interval" },
            min_rows,
            rows.len()
        )));
    }

    let header = samples.header();
    tracing::debug!(
        "Time column {} ({}), power column {} ({})",
        columns.time_col,
        header.get(columns.time_col).map_or("?", String::as_str),
        columns.power_col,
        header.get(columns.power_col).map_or("?", String::as_str),
    );

    let mut time = Vec::with_capacity(rows.len());
    let mut power = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match (row.get(columns.time_col), row.get(columns.power_col)) {
            (Some(&t), Some(&p)) => {
                time.push(t);
                power.push(p);
            }
            _ => {
                return Err(EnergiError::malformed(format!(
                    "row {} has {} columns, need columns {} (time) and {} (power)",
                    index,
                    row.len(),
                    columns.time_col,
                    columns.power_col
                )))
            }
        }
    }

    if columns.column_is_cumulative_energy {
        power = diff_with_leading_zero(&power);
    }

    let (time, power) = if cumulative {
        let mut time: Vec<f64> = cumsum(&time).into_iter().map(|t| t / MS_PER_SECOND).collect();
        let mut power = cumsum(&power);
        time.pop();
        power.pop();
        (time, power)
    } else {
        let last = time.len() - 1;
        (time[1..last].to_vec(), power[1..last].to_vec())
    };

    PowerSeries::new(time, power, cumulative)
        .ok_or_else(|| EnergiError::malformed("time and power columns differ in length"))
}

/// A derived series labelled with the run it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RunSeries {
    pub run: usize,
    pub series: PowerSeries,
}

/// Series for the runs that derived cleanly, plus one error per run that did not
#[derive(Debug, Default)]
pub struct Extraction {
    pub series: Vec<RunSeries>,
    pub failures: Vec<EnergiError>,
}

/// Derive a series for every `(run, samples)` pair
///
/// A malformed set only costs its own run; the error is tagged with the run
/// index and the remaining sets are still derived.
pub fn extract_each<'a, I>(sets: I, cumulative: bool, columns: &ColumnConfig) -> Extraction
where
    I: IntoIterator<Item = (usize, &'a RawSampleSet)>,
{
    let mut extraction = Extraction::default();
    for (run, samples) in sets {
        match extract_power_series(samples, cumulative, columns) {
            Ok(series) => extraction.series.push(RunSeries { run, series }),
            Err(e) => {
                let e = e.with_repetition(run);
                tracing::warn!("{}", e);
                extraction.failures.push(e);
            }
        }
    }
    extraction
}
