//! Configuration for profiler runs and column selection
//!
//! Column layout is a property of the profiler build that wrote the
//! measurement file, so it is configured explicitly (preset or indices)
//! and never inferred from the host operating system.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EnergiError, Result};

/// Default marker opening the profiled notebook block
pub const DEFAULT_START_MARKER: &str = "#EnergiBridgeStart";

/// Default marker closing the profiled notebook block
pub const DEFAULT_END_MARKER: &str = "#EnergiBridgeStop";

/// Default profiler invocation timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Known profiler builds and their measurement column layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnPreset {
    /// Linux build: cumulative package energy counter at column 27
    Linux,
    /// macOS build: instantaneous power reading at column 18
    Macos,
    /// Windows build: cumulative package energy counter at column 26
    Windows,
}

/// Which columns of a measurement row hold time and power/energy
///
/// # Example
/// ```
/// use jupyter_energi::config::{ColumnConfig, ColumnPreset};
///
/// let columns = ColumnConfig::from_preset(ColumnPreset::Macos);
/// assert_eq!(columns.power_col, 18);
/// assert!(!columns.column_is_cumulative_energy);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Index of the per-sample delta time column (milliseconds)
    #[serde(default)]
    pub time_col: usize,
    /// Index of the power or cumulative energy column
    pub power_col: usize,
    /// True when `power_col` is a running energy counter that must be differenced
    pub column_is_cumulative_energy: bool,
}

impl ColumnConfig {
    pub fn new(time_col: usize, power_col: usize, column_is_cumulative_energy: bool) -> Self {
        Self {
            time_col,
            power_col,
            column_is_cumulative_energy,
        }
    }

    /// Column layout written by a known profiler build
    pub fn from_preset(preset: ColumnPreset) -> Self {
        match preset {
            ColumnPreset::Linux => Self::new(0, 27, true),
            ColumnPreset::Macos => Self::new(0, 18, false),
            ColumnPreset::Windows => Self::new(0, 26, true),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.time_col == self.power_col {
            return Err(EnergiError::Config(format!(
                "time column and power column must differ, both are {}",
                self.time_col
            )));
        }
        Ok(())
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self::from_preset(ColumnPreset::Linux)
    }
}

/// How the profiler process is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Launch the profiler directly
    Direct,
    /// Launch through an elevation program (e.g. sudo)
    Elevated,
    /// Pick once from the host platform
    Auto,
}

/// External profiler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Profiler executable
    pub executable: PathBuf,
    /// Interpreter the profiler runs the scratch script with
    pub interpreter: String,
    /// Launch strategy
    pub launch: LaunchMode,
    /// Elevation program used by elevated launches
    pub elevate_with: String,
    /// Maximum wall time per invocation in seconds, 0 disables the limit
    pub timeout_secs: u64,
}

impl ProfilerConfig {
    /// Invocation timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("energibridge"),
            interpreter: "python3".to_string(),
            launch: LaunchMode::Auto,
            elevate_with: "sudo".to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Where the program body comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSource {
    /// Literal program text
    Text(String),
    /// Marked block of a notebook document
    Notebook {
        path: PathBuf,
        start_marker: String,
        end_marker: String,
    },
}

/// Input to one orchestrated batch of profiler runs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub program: ProgramSource,
    /// Forwarded untouched to the extractor
    pub cumulative: bool,
    /// Number of sequential repetitions, at least 1
    pub no_runs: usize,
    /// Keep measurement files after loading them
    pub keep_output: bool,
    /// Directory for scratch scripts and measurement files
    pub work_dir: PathBuf,
}

impl RunConfig {
    pub fn new(program: ProgramSource) -> Self {
        Self {
            program,
            cumulative: false,
            no_runs: 1,
            keep_output: false,
            work_dir: std::env::temp_dir(),
        }
    }

    pub fn with_cumulative(mut self, cumulative: bool) -> Self {
        self.cumulative = cumulative;
        self
    }

    pub fn with_runs(mut self, no_runs: usize) -> Self {
        self.no_runs = no_runs;
        self
    }

    pub fn with_keep_output(mut self, keep_output: bool) -> Self {
        self.keep_output = keep_output;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.no_runs == 0 {
            return Err(EnergiError::Config(
                "no_runs must be >= 1, got 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings file contents (`--config`), all tables optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub columns: Option<ColumnConfig>,
    pub profiler: Option<ProfilerConfig>,
}

impl FileConfig {
    /// Load a TOML settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| EnergiError::Config(e.to_string()))
    }
}
