use anyhow::{Context, Result};
use clap::Parser;
use jupyter_energi::{
    cli::Cli,
    config::{ColumnConfig, FileConfig, RunConfig},
    error::EnergiError,
    extractor::{self, Extraction},
    launcher,
    measurement::RawSampleSet,
    orchestrator::Orchestrator,
    report,
};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` turns on everything
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Derive series from measurement files directly, skipping the profiler
fn load_existing(
    paths: &[std::path::PathBuf],
    cumulative: bool,
    columns: &ColumnConfig,
) -> Extraction {
    let mut sets = Vec::new();
    let mut failures = Vec::new();
    for (index, path) in paths.iter().enumerate() {
        match RawSampleSet::from_file(path) {
            Ok(set) => sets.push((index, set)),
            Err(e) => {
                tracing::warn!("{}", e);
                failures.push(e.with_repetition(index));
            }
        }
    }

    let mut extraction = extractor::extract_each(
        sets.iter().map(|(index, set)| (*index, set)),
        cumulative,
        columns,
    );
    extraction.failures.extend(failures);
    extraction
}

/// Profile the configured program and derive a series per successful run
fn profile(
    args: &Cli,
    file: &FileConfig,
    config: &RunConfig,
    columns: &ColumnConfig,
) -> Result<Extraction> {
    let launcher = launcher::launcher_for(&args.profiler_config(file))?;
    let run_report = Orchestrator::new(launcher).run(config)?;

    for run in &run_report.data {
        let summary = run.stdout.trim();
        if !summary.is_empty() {
            eprintln!("[jupyter-energi: run {}] {}", run.repetition, summary);
        }
        if let Some(path) = &run.output_path {
            eprintln!(
                "[jupyter-energi: run {} measurements kept at {}]",
                run.repetition,
                path.display()
            );
        }
    }

    let mut extraction = run_report.series(config.cumulative, columns);
    extraction.failures.extend(run_report.failures);
    Ok(extraction)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let file = match &args.config {
        Some(path) => FileConfig::from_file(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?,
        None => FileConfig::default(),
    };
    let columns = args.column_config(&file);
    columns.validate()?;
    let config = args.run_config()?;

    let Extraction {
        series,
        mut failures,
    } = if args.from_csv.is_empty() {
        profile(&args, &file, &config, &columns)?
    } else {
        load_existing(&args.from_csv, config.cumulative, &columns)
    };
    failures.sort_by_key(EnergiError::repetition);

    let rendered = report::render(args.format, &series, config.cumulative, &failures)?;

    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => print!("{}", rendered),
    }

    if series.is_empty() && !failures.is_empty() {
        anyhow::bail!("All {} run(s) failed", failures.len());
    }

    Ok(())
}
