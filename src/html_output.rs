//! HTML report with a power-vs-time chart and per-run distribution table
//!
//! The chart is inline SVG so the report is a single self-contained file.

use crate::extractor::RunSeries;
use crate::stats::SeriesSummary;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 400.0;
const CHART_MARGIN: f64 = 50.0;
const PALETTE: [&str; 6] = ["#4a90d9", "#d9534f", "#5cb85c", "#f0ad4e", "#9b59b6", "#34495e"];

/// HTML output formatter
#[derive(Debug)]
pub struct HtmlOutput<'a> {
    series: &'a [RunSeries],
    cumulative: bool,
    failures: Vec<String>,
}

impl<'a> HtmlOutput<'a> {
    pub fn new(series: &'a [RunSeries], cumulative: bool) -> Self {
        Self {
            series,
            cumulative,
            failures: Vec::new(),
        }
    }

    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// Escape HTML special characters to prevent XSS
    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }

    fn generate_styles() -> &'static str {
        r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 20px;
            background-color: #f5f5f5;
        }
        h1, h2 {
            color: #333;
        }
        svg {
            background-color: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
        }
        table {
            border-collapse: collapse;
            background-color: white;
            margin-top: 20px;
        }
        th, td {
            border: 1px solid #ddd;
            padding: 8px;
            text-align: right;
            font-family: monospace;
        }
        th {
            background-color: #5cb85c;
            color: white;
        }
        .failure {
            color: #cc0000;
            font-family: monospace;
            white-space: pre-wrap;
        }
        .footer {
            margin-top: 20px;
            font-size: 0.8em;
            color: #888;
            text-align: center;
        }
        "#
    }

    /// Inline SVG line chart of every run's energy timeline
    fn render_chart(&self) -> String {
        let timelines: Vec<Vec<(f64, f64)>> =
            self.series.iter().map(|r| r.series.energy_timeline()).collect();

        let points = timelines.iter().flatten();
        let max_x = points.clone().map(|p| p.0).fold(0.0_f64, f64::max);
        let max_y = points.clone().map(|p| p.1).fold(0.0_f64, f64::max);
        let min_y = points.map(|p| p.1).fold(0.0_f64, f64::min);
        let span_x = if max_x > 0.0 { max_x } else { 1.0 };
        let span_y = if max_y > min_y { max_y - min_y } else { 1.0 };

        let plot_w = CHART_WIDTH - 2.0 * CHART_MARGIN;
        let plot_h = CHART_HEIGHT - 2.0 * CHART_MARGIN;
        let project = |(x, y): (f64, f64)| {
            (
                CHART_MARGIN + x / span_x * plot_w,
                CHART_HEIGHT - CHART_MARGIN - (y - min_y) / span_y * plot_h,
            )
        };

        let mut svg = format!(
            "    <svg width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = CHART_WIDTH,
            h = CHART_HEIGHT
        );
        svg.push_str(&format!(
            "        <line x1=\"{m}\" y1=\"{b}\" x2=\"{r}\" y2=\"{b}\" stroke=\"#333\"/>\n\
             \x20       <line x1=\"{m}\" y1=\"{m}\" x2=\"{m}\" y2=\"{b}\" stroke=\"#333\"/>\n",
            m = CHART_MARGIN,
            b = CHART_HEIGHT - CHART_MARGIN,
            r = CHART_WIDTH - CHART_MARGIN
        ));
        svg.push_str(&format!(
            "        <text x=\"{}\" y=\"{}\" text-anchor=\"middle\">Time (s) [max {:.3}]</text>\n",
            CHART_WIDTH / 2.0,
            CHART_HEIGHT - 10.0,
            max_x
        ));
        svg.push_str(&format!(
            "        <text x=\"15\" y=\"{}\" transform=\"rotate(-90 15 {})\" text-anchor=\"middle\">{} [{:.3} .. {:.3}]</text>\n",
            CHART_HEIGHT / 2.0,
            CHART_HEIGHT / 2.0,
            self.value_label(),
            min_y,
            max_y
        ));

        for (run, timeline) in self.series.iter().map(|r| r.run).zip(&timelines) {
            let coords: Vec<String> = timeline
                .iter()
                .map(|&p| {
                    let (x, y) = project(p);
                    format!("{:.2},{:.2}", x, y)
                })
                .collect();
            svg.push_str(&format!(
                "        <polyline class=\"run\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
                PALETTE[run % PALETTE.len()],
                coords.join(" ")
            ));
        }

        svg.push_str("    </svg>\n");
        svg
    }

    fn value_label(&self) -> &'static str {
        if self.cumulative {
            "Cumulative energy"
        } else {
            "Energy per interval"
        }
    }

    /// Per-run distribution summary (quartiles and extremes)
    fn render_distribution(&self) -> String {
        let mut html = String::new();
        html.push_str("    <h2>Per-run Distribution</h2>\n");
        html.push_str("    <table>\n");
        html.push_str("        <tr><th>run</th><th>samples</th><th>duration (s)</th><th>total</th><th>mean</th><th>stddev</th><th>min</th><th>p25</th><th>median</th><th>p75</th><th>max</th></tr>\n");
        for run in self.series {
            let s = SeriesSummary::from_series(&run.series);
            html.push_str(&format!(
                "        <tr><td>{}</td><td>{}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td><td>{:.3}</td></tr>\n",
                run.run, s.samples, s.duration_secs, s.total, s.mean, s.stddev, s.min, s.p25, s.median, s.p75, s.max
            ));
        }
        html.push_str("    </table>\n");
        html
    }

    /// Generate complete HTML document
    pub fn to_html(&self) -> String {
        let mut html = String::new();

        html.push_str("<!DOCTYPE html>\n");
        html.push_str("<html lang=\"en\">\n");
        html.push_str("<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        html.push_str("    <title>Energy Profile Report</title>\n");
        html.push_str("    <style>");
        html.push_str(Self::generate_styles());
        html.push_str("</style>\n");
        html.push_str("</head>\n");

        html.push_str("<body>\n");
        html.push_str(&format!(
            "    <h1>Power vs Time (cumulative={})</h1>\n",
            self.cumulative
        ));
        html.push_str(&self.render_chart());
        html.push_str(&self.render_distribution());

        if !self.failures.is_empty() {
            html.push_str("    <h2>Failed Repetitions</h2>\n");
            for failure in &self.failures {
                html.push_str(&format!(
                    "    <div class=\"failure\">{}</div>\n",
                    Self::escape_html(failure)
                ));
            }
        }

        html.push_str("    <div class=\"footer\">\n");
        html.push_str("        Generated by jupyter-energi\n");
        html.push_str("    </div>\n");
        html.push_str("</body>\n");
        html.push_str("</html>\n");

        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PowerSeries;

    fn run(run: usize, time: Vec<f64>, power: Vec<f64>) -> RunSeries {
        RunSeries {
            run,
            series: PowerSeries::new(time, power, true).unwrap(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            HtmlOutput::escape_html("<a href=\"x\">&'"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn test_html_has_one_polyline_per_run() {
        let series = vec![
            run(0, vec![0.0, 0.1], vec![0.0, 10.0]),
            run(2, vec![0.0, 0.2], vec![0.0, 12.0]),
        ];
        let html = HtmlOutput::new(&series, true).to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(html.matches("<polyline").count(), 2);
        assert!(html.contains("cumulative=true"));
        assert!(html.contains("Per-run Distribution"));
        assert!(html.contains("<tr><td>2</td>"));
    }

    #[test]
    fn test_html_escapes_failures() {
        let mut output = HtmlOutput::new(&[], false);
        output.add_failure("stderr: <script>");
        let html = output.to_html();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_chart_handles_empty_series() {
        let html = HtmlOutput::new(&[], true).to_html();
        assert!(html.contains("<svg"));
        assert_eq!(html.matches("<polyline").count(), 0);
    }
}
