//! CLI argument parsing for jupyter-energi

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{
    ColumnConfig, ColumnPreset, FileConfig, LaunchMode, ProfilerConfig, ProgramSource, RunConfig,
    DEFAULT_END_MARKER, DEFAULT_START_MARKER,
};
use crate::error::Result;

/// Output format for derived series
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Per-run summary table (default)
    Text,
    /// One row per (run, time, power) point
    Csv,
    /// Series and summaries for machine parsing
    Json,
    /// Self-contained report with a power-vs-time chart
    Html,
}

#[derive(Parser, Debug)]
#[command(name = "jupyter-energi")]
#[command(version)]
#[command(about = "Profile a marked notebook block under an energy profiler and derive power over time", long_about = None)]
pub struct Cli {
    /// Program text to profile instead of the notebook block
    #[arg(long, value_name = "CODE", conflicts_with = "program_file")]
    pub program: Option<String>,

    /// File whose contents are profiled instead of the notebook block
    #[arg(long = "program-file", value_name = "PATH")]
    pub program_file: Option<PathBuf>,

    /// Notebook holding the marked block
    #[arg(long, value_name = "PATH", default_value = "Demo.ipynb")]
    pub notebook: PathBuf,

    /// Marker opening the profiled block
    #[arg(long = "start-marker", default_value = DEFAULT_START_MARKER)]
    pub start_marker: String,

    /// Marker closing the profiled block
    #[arg(long = "end-marker", default_value = DEFAULT_END_MARKER)]
    pub end_marker: String,

    /// Number of sequential profiler runs
    #[arg(short = 'n', long = "no-runs", default_value = "1", value_parser = clap::value_parser!(u64).range(1..))]
    pub no_runs: u64,

    /// Express time and energy as running totals from run start
    #[arg(short = 'c', long)]
    pub cumulative: bool,

    /// Column layout of a known profiler build
    #[arg(long, value_enum)]
    pub preset: Option<ColumnPreset>,

    /// Index of the delta-time column
    #[arg(long = "time-column", value_name = "INDEX")]
    pub time_column: Option<usize>,

    /// Index of the power or cumulative energy column
    #[arg(long = "power-column", value_name = "INDEX")]
    pub power_column: Option<usize>,

    /// The power column is a running energy counter (differenced before use)
    #[arg(long = "cumulative-energy", conflicts_with = "instant_power")]
    pub cumulative_energy: bool,

    /// The power column already holds instantaneous power
    #[arg(long = "instant-power")]
    pub instant_power: bool,

    /// Profiler executable
    #[arg(long, value_name = "PATH")]
    pub profiler: Option<PathBuf>,

    /// Interpreter the profiler runs the script with
    #[arg(long, value_name = "PROGRAM")]
    pub interpreter: Option<String>,

    /// How to start the profiler
    #[arg(long, value_enum)]
    pub launcher: Option<LaunchMode>,

    /// Elevation program for the elevated launcher
    #[arg(long = "elevate-with", value_name = "PROGRAM")]
    pub elevate_with: Option<String>,

    /// Per-run timeout in seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Keep measurement files after loading them
    #[arg(long = "keep-output")]
    pub keep_output: bool,

    /// Directory for scratch scripts and measurement files
    #[arg(long = "work-dir", value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Post-process existing measurement files instead of running the profiler
    #[arg(long = "from-csv", value_name = "PATH", num_args = 1..)]
    pub from_csv: Vec<PathBuf>,

    /// TOML settings file with [columns] and [profiler] tables
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Enable debug tracing on stderr
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Explicit column-kind override, if one was given
    pub fn column_kind_override(&self) -> Option<bool> {
        if self.cumulative_energy {
            Some(true)
        } else if self.instant_power {
            Some(false)
        } else {
            None
        }
    }

    /// Column layout: preset, else settings file, else default; then per-field flags
    pub fn column_config(&self, file: &FileConfig) -> ColumnConfig {
        let mut columns = match (self.preset, file.columns) {
            (Some(preset), _) => ColumnConfig::from_preset(preset),
            (None, Some(columns)) => columns,
            (None, None) => ColumnConfig::default(),
        };
        if let Some(time_col) = self.time_column {
            columns.time_col = time_col;
        }
        if let Some(power_col) = self.power_column {
            columns.power_col = power_col;
        }
        if let Some(kind) = self.column_kind_override() {
            columns.column_is_cumulative_energy = kind;
        }
        columns
    }

    /// Profiler settings: settings file or defaults, overridden by flags
    pub fn profiler_config(&self, file: &FileConfig) -> ProfilerConfig {
        let mut profiler = file.profiler.clone().unwrap_or_default();
        if let Some(executable) = &self.profiler {
            profiler.executable = executable.clone();
        }
        if let Some(interpreter) = &self.interpreter {
            profiler.interpreter = interpreter.clone();
        }
        if let Some(launch) = self.launcher {
            profiler.launch = launch;
        }
        if let Some(elevate_with) = &self.elevate_with {
            profiler.elevate_with = elevate_with.clone();
        }
        if let Some(timeout) = self.timeout {
            profiler.timeout_secs = timeout;
        }
        profiler
    }

    /// Program to profile: `--program`, `--program-file`, then the notebook block
    pub fn program_source(&self) -> Result<ProgramSource> {
        if let Some(program) = &self.program {
            return Ok(ProgramSource::Text(program.clone()));
        }
        if let Some(path) = &self.program_file {
            return Ok(ProgramSource::Text(std::fs::read_to_string(path)?));
        }
        Ok(ProgramSource::Notebook {
            path: self.notebook.clone(),
            start_marker: self.start_marker.clone(),
            end_marker: self.end_marker.clone(),
        })
    }

    /// Batch settings for the orchestrator
    pub fn run_config(&self) -> Result<RunConfig> {
        let mut config = RunConfig::new(self.program_source()?)
            .with_cumulative(self.cumulative)
            .with_runs(self.no_runs as usize)
            .with_keep_output(self.keep_output);
        if let Some(dir) = &self.work_dir {
            config = config.with_work_dir(dir);
        }
        Ok(config)
    }
}
