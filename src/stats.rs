//! Per-run summary statistics for derived series
//!
//! Totals and means accumulate in f64 so long cumulative runs keep their
//! precision. Spread and extremes go through Trueno's f32 vectors, and
//! percentiles use linear interpolation between the closest ranks.

use serde::Serialize;

use crate::series::PowerSeries;

/// Summary of one run's distribution values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub duration_secs: f64,
    pub total: f64,
    pub mean: f64,
    pub stddev: f32,
    pub min: f32,
    pub max: f32,
    pub p25: f32,
    pub median: f32,
    pub p75: f32,
}

impl SeriesSummary {
    /// Summarise the values a distribution chart would plot for this series
    pub fn from_series(series: &PowerSeries) -> Self {
        let mut summary = Self::from_values(&series.distribution());
        summary.duration_secs = series.duration_secs();
        summary
    }

    /// Summarise a slice of values (duration left at zero)
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::empty();
        }

        let total: f64 = values.iter().sum();
        let narrow: Vec<f32> = values.iter().map(|&v| v as f32).collect();
        let v = trueno::Vector::from_slice(&narrow);
        let mut sorted = narrow;
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            samples: values.len(),
            duration_secs: 0.0,
            total,
            mean: total / values.len() as f64,
            stddev: v.stddev().unwrap_or(0.0),
            min: v.min().unwrap_or(0.0),
            max: v.max().unwrap_or(0.0),
            p25: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            p75: percentile(&sorted, 75.0),
        }
    }

    fn empty() -> Self {
        Self {
            samples: 0,
            duration_secs: 0.0,
            total: 0.0,
            mean: 0.0,
            stddev: 0.0,
            min: 0.0,
            max: 0.0,
            p25: 0.0,
            median: 0.0,
            p75: 0.0,
        }
    }
}

/// Percentile of sorted data with linear interpolation
pub fn percentile(sorted_data: &[f32], percentile: f32) -> f32 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f32;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f32;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 50.0), 3.0);
        assert_eq!(percentile(&data, 100.0), 5.0);
        assert_eq!(percentile(&[1.0, 2.0], 50.0), 1.5);
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[7.0], 90.0), 7.0);
    }

    #[test]
    fn test_summary_of_values() {
        let summary = SeriesSummary::from_values(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(summary.samples, 4);
        assert!((summary.total - 10.0).abs() < 1e-5);
        assert!((summary.mean - 2.5).abs() < 1e-5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert!((summary.median - 2.5).abs() < 1e-5);
        assert!((summary.p25 - 1.75).abs() < 1e-5);
        assert!((summary.p75 - 3.25).abs() < 1e-5);
    }

    #[test]
    fn test_total_keeps_precision_beyond_f32() {
        // 2^24 + 1 has no exact f32 representation
        let summary = SeriesSummary::from_values(&[16_777_217.0, 1.0]);
        assert_eq!(summary.total, 16_777_218.0);
        assert_eq!(summary.mean, 8_388_609.0);

        let series = PowerSeries::new(vec![0.1], vec![16_777_217.0], true).unwrap();
        assert_eq!(SeriesSummary::from_series(&series).total, 16_777_217.0);
    }

    #[test]
    fn test_summary_of_empty_values() {
        let summary = SeriesSummary::from_values(&[]);
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn test_summary_of_interval_series_uses_energy() {
        let series = PowerSeries::new(vec![500.0, 500.0], vec![10.0, 20.0], false).unwrap();
        let summary = SeriesSummary::from_series(&series);
        assert_eq!(summary.samples, 2);
        assert!((summary.total - 15.0).abs() < 1e-5);
        assert_eq!(summary.duration_secs, 1.0);
    }
}
