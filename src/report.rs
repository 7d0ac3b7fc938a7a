//! Report rendering for a batch of derived series

use crate::cli::OutputFormat;
use crate::csv_output::CsvOutput;
use crate::error::{EnergiError, Result};
use crate::extractor::RunSeries;
use crate::html_output::HtmlOutput;
use crate::json_output::JsonOutput;
use crate::stats::SeriesSummary;

/// Render derived series (and any failed repetitions) in the requested format
pub fn render(
    format: OutputFormat,
    series: &[RunSeries],
    cumulative: bool,
    failures: &[EnergiError],
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(series, cumulative, failures)),
        OutputFormat::Csv => CsvOutput::new(series)
            .to_csv()
            .map_err(|e| EnergiError::Io(e.into())),
        OutputFormat::Json => {
            let mut output = JsonOutput::new(series, cumulative);
            for failure in failures {
                output.add_failure(failure.repetition(), failure.to_string());
            }
            output.to_json().map_err(|e| EnergiError::Io(e.into()))
        }
        OutputFormat::Html => {
            let mut output = HtmlOutput::new(series, cumulative);
            for failure in failures {
                output.add_failure(failure.to_string());
            }
            Ok(output.to_html())
        }
    }
}

/// Plain-text summary table, one line per run
pub fn render_text(series: &[RunSeries], cumulative: bool, failures: &[EnergiError]) -> String {
    let mut out = String::new();
    let unit = if cumulative { "energy" } else { "energy/interval" };
    out.push_str(&format!(
        "{:>4} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12}\n",
        "run", "samples", "duration(s)", "total", "mean", "median", "max"
    ));
    out.push_str(&format!("{}\n", "-".repeat(78)));
    for run in series {
        let summary = SeriesSummary::from_series(&run.series);
        out.push_str(&format!(
            "{:>4} {:>8} {:>12.3} {:>12.3} {:>12.3} {:>12.3} {:>12.3}\n",
            run.run,
            summary.samples,
            summary.duration_secs,
            summary.total,
            summary.mean,
            summary.median,
            summary.max
        ));
    }
    out.push_str(&format!(
        "{} run(s), cumulative={}, values are {}\n",
        series.len(),
        cumulative,
        unit
    ));
    for failure in failures {
        out.push_str(&format!("FAILED: {}\n", failure));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PowerSeries;

    fn series() -> Vec<RunSeries> {
        vec![RunSeries {
            run: 0,
            series: PowerSeries::new(vec![0.0, 0.1, 0.2], vec![0.0, 10.0, 30.0], true).unwrap(),
        }]
    }

    #[test]
    fn test_text_lists_runs_and_failures() {
        let failures = vec![EnergiError::malformed("short").with_repetition(1)];
        let text = render_text(&series(), true, &failures);
        assert!(text.contains("samples"));
        assert!(text.contains("1 run(s), cumulative=true"));
        assert!(text.contains("FAILED: Malformed sample set for repetition 1: short"));
    }

    #[test]
    fn test_render_dispatches_formats() {
        let s = series();
        assert!(render(OutputFormat::Csv, &s, true, &[])
            .unwrap()
            .starts_with("run,time,power"));
        assert!(render(OutputFormat::Json, &s, true, &[])
            .unwrap()
            .contains("\"runs\""));
        assert!(render(OutputFormat::Html, &s, true, &[])
            .unwrap()
            .contains("<svg"));
        assert!(render(OutputFormat::Text, &s, true, &[])
            .unwrap()
            .contains("run"));
    }
}
