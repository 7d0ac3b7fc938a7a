//! Derived time/power series and their plotting views

use serde::Serialize;

/// Milliseconds per second, used for every ms to s conversion
pub const MS_PER_SECOND: f64 = 1_000.0;

/// Ordered (time, power) pairs derived from one profiler run
///
/// In cumulative mode `time` is seconds since run start and `power` is the
/// running energy total. Otherwise `time` is the per-sample interval in
/// milliseconds and `power` is the per-interval reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSeries {
    time: Vec<f64>,
    power: Vec<f64>,
    cumulative: bool,
}

impl PowerSeries {
    /// Pair two equally long columns into a series
    ///
    /// Returns `None` when the columns differ in length.
    pub fn new(time: Vec<f64>, power: Vec<f64>, cumulative: bool) -> Option<Self> {
        (time.len() == power.len()).then_some(Self {
            time,
            power,
            cumulative,
        })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn power(&self) -> &[f64] {
        &self.power
    }

    pub fn is_cumulative(&self) -> bool {
        self.cumulative
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Iterate the series as (time, power) pairs
    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.power.iter().copied())
    }

    /// Points for a power-vs-time line chart, time in seconds
    ///
    /// Cumulative series are already on a seconds axis. Per-interval series
    /// turn each reading into an energy contribution (`power * interval`)
    /// and accumulate the intervals into an elapsed-time axis.
    pub fn energy_timeline(&self) -> Vec<(f64, f64)> {
        if self.cumulative {
            return self.pairs().collect();
        }
        let mut elapsed_ms = 0.0;
        self.pairs()
            .map(|(delta_ms, power)| {
                elapsed_ms += delta_ms;
                (elapsed_ms / MS_PER_SECOND, power * (delta_ms / MS_PER_SECOND))
            })
            .collect()
    }

    /// Values for a per-run distribution (violin) chart
    pub fn distribution(&self) -> Vec<f64> {
        if self.cumulative {
            return self.power.clone();
        }
        self.pairs()
            .map(|(delta_ms, power)| power * (delta_ms / MS_PER_SECOND))
            .collect()
    }

    /// Elapsed run time in seconds covered by the series
    pub fn duration_secs(&self) -> f64 {
        if self.cumulative {
            self.time.last().copied().unwrap_or(0.0)
        } else {
            self.time.iter().sum::<f64>() / MS_PER_SECOND
        }
    }
}
