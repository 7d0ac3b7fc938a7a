//! Repeated profiler runs over one program
//!
//! Each repetition gets its own scratch script and measurement file, both
//! removed when the repetition ends unless the measurements are kept on
//! request. Repetitions run strictly one after another; a failed repetition
//! is recorded and the batch moves on.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::config::{ColumnConfig, ProgramSource, RunConfig};
use crate::error::{EnergiError, Result};
use crate::extractor::{extract_each, Extraction};
use crate::launcher::{display_command, ProcessLauncher};
use crate::measurement::RawSampleSet;
use crate::notebook::extract_marked_code;

/// One successful repetition
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Zero-based repetition index
    pub repetition: usize,
    pub samples: RawSampleSet,
    /// Profiler standard output (the `--summary` totals)
    pub stdout: String,
    /// Measurement file, when kept
    pub output_path: Option<PathBuf>,
}

/// Result of a batch: successes in invocation order plus per-repetition failures
#[derive(Debug, Default)]
pub struct RunReport {
    pub data: Vec<RunOutcome>,
    pub failures: Vec<EnergiError>,
}

impl RunReport {
    /// Derive a power series for every successful repetition, labelled with
    /// its repetition index
    pub fn series(&self, cumulative: bool, columns: &ColumnConfig) -> Extraction {
        extract_each(
            self.data.iter().map(|run| (run.repetition, &run.samples)),
            cumulative,
            columns,
        )
    }
}

/// Resolve the program body to profile
pub fn resolve_program(source: &ProgramSource) -> Result<String> {
    match source {
        ProgramSource::Text(text) => Ok(text.clone()),
        ProgramSource::Notebook {
            path,
            start_marker,
            end_marker,
        } => extract_marked_code(path, start_marker, end_marker),
    }
}

/// Runs programs under the profiler through a fixed launcher
#[derive(Debug)]
pub struct Orchestrator {
    launcher: Box<dyn ProcessLauncher>,
}

impl Orchestrator {
    pub fn new(launcher: Box<dyn ProcessLauncher>) -> Self {
        Self { launcher }
    }

    /// Run the configured program `no_runs` times
    ///
    /// # Errors
    ///
    /// Only setup failures (invalid configuration, unreadable notebook) are
    /// returned as `Err`. Invocation and load failures are collected in
    /// [`RunReport::failures`].
    pub fn run(&self, config: &RunConfig) -> Result<RunReport> {
        config.validate()?;
        let program = resolve_program(&config.program)?;

        let mut report = RunReport::default();
        for repetition in 0..config.no_runs {
            tracing::info!("Repetition {}/{}", repetition + 1, config.no_runs);
            match self.run_once(repetition, &program, config) {
                Ok(outcome) => {
                    tracing::info!(
                        "Repetition {} loaded {} samples",
                        repetition,
                        outcome.samples.len()
                    );
                    report.data.push(outcome);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }
        Ok(report)
    }

    fn run_once(&self, repetition: usize, program: &str, config: &RunConfig) -> Result<RunOutcome> {
        let script = write_script(&config.work_dir, repetition, program)?;
        let output = tempfile::Builder::new()
            .prefix(&format!("energi-{}-{}-", std::process::id(), repetition))
            .suffix(".csv")
            .tempfile_in(&config.work_dir)?
            .into_temp_path();

        let command = display_command(&self.launcher.command(&script, &output));
        let invocation_error = |reason: String, stdout: String, stderr: String| {
            EnergiError::ProfilerInvocation {
                repetition,
                command: command.clone(),
                reason,
                stdout,
                stderr,
            }
        };

        let invocation = self
            .launcher
            .invoke(&script, &output)
            .map_err(|e| invocation_error(format!("failed to launch: {}", e), String::new(), String::new()))?;
        tracing::debug!("Profiler stdout:\n{}", invocation.stdout);
        tracing::debug!("Profiler stderr:\n{}", invocation.stderr);

        if invocation.timed_out {
            return Err(invocation_error(
                format!("timed out after {:?}", self.launcher.timeout().unwrap_or_default()),
                invocation.stdout,
                invocation.stderr,
            ));
        }
        if !invocation.success() {
            return Err(invocation_error(
                format!("exited with {}", invocation.status),
                invocation.stdout,
                invocation.stderr,
            ));
        }

        let samples = RawSampleSet::from_file(&output).map_err(|e| e.with_repetition(repetition))?;

        let output_path = if config.keep_output {
            let path = output.keep().map_err(|e| e.error)?;
            tracing::info!("Kept measurements at {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(RunOutcome {
            repetition,
            samples,
            stdout: invocation.stdout,
            output_path,
        })
    }
}

/// Write the program to a scratch script that is removed on drop
fn write_script(dir: &Path, repetition: usize, program: &str) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("energi-{}-{}-", std::process::id(), repetition))
        .suffix(".py")
        .tempfile_in(dir)?;
    file.write_all(program.as_bytes())?;
    file.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::Invocation;
    use std::cell::Cell;
    use std::process::Command;
    use tempfile::TempDir;

    /// What one scripted profiler invocation does
    #[derive(Debug, Clone, Copy)]
    enum Step {
        /// Write the measurements and exit 0
        Write(&'static str),
        /// Exit 1 without output
        Fail,
        /// Hit the timeout after printing a progress line
        Hang,
    }

    /// Launcher that writes canned measurements instead of running anything
    #[derive(Debug)]
    struct ScriptedLauncher {
        plan: Vec<Step>,
        calls: Cell<usize>,
    }

    impl ScriptedLauncher {
        fn new(plan: Vec<Step>) -> Self {
            Self {
                plan,
                calls: Cell::new(0),
            }
        }
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }

    #[cfg(unix)]
    fn killed_status() -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(15)
    }

    #[cfg(windows)]
    fn killed_status() -> std::process::ExitStatus {
        exit_status(1)
    }

    impl ProcessLauncher for ScriptedLauncher {
        fn command(&self, script: &Path, output: &Path) -> Command {
            let mut command = Command::new("fake-profiler");
            command.arg("-o").arg(output).arg(script);
            command
        }

        fn timeout(&self) -> Option<std::time::Duration> {
            Some(std::time::Duration::from_secs(30))
        }

        fn invoke(&self, script: &Path, output: &Path) -> std::io::Result<Invocation> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            assert!(script.exists(), "scratch script must exist during the run");
            match self.plan.get(call).copied().unwrap_or(Step::Fail) {
                Step::Write(csv) => {
                    std::fs::write(output, csv)?;
                    Ok(Invocation {
                        status: exit_status(0),
                        stdout: "Energy consumption in joules: 1.0".to_string(),
                        stderr: String::new(),
                        timed_out: false,
                    })
                }
                Step::Fail => Ok(Invocation {
                    status: exit_status(1),
                    stdout: String::new(),
                    stderr: "msr: permission denied".to_string(),
                    timed_out: false,
                }),
                Step::Hang => Ok(Invocation {
                    status: killed_status(),
                    stdout: "sampling...".to_string(),
                    stderr: String::new(),
                    timed_out: true,
                }),
            }
        }
    }

    const CSV: &str = "Delta,E\n0,0\n100,10\n100,30\n100,70\n";

    fn config(dir: &TempDir, runs: usize) -> RunConfig {
        RunConfig::new(ProgramSource::Text("print('hi')".into()))
            .with_runs(runs)
            .with_work_dir(dir.path())
    }

    fn dir_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[test]
    fn test_all_repetitions_succeed() {
        let dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(Box::new(ScriptedLauncher::new(vec![Step::Write(CSV); 3])));
        let report = orchestrator.run(&config(&dir, 3)).unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.data.len(), 3);
        let reps: Vec<_> = report.data.iter().map(|r| r.repetition).collect();
        assert_eq!(reps, vec![0, 1, 2]);
        assert_eq!(report.data[0].samples.len(), 4);
        assert!(report.data[0].stdout.contains("joules"));
        assert!(dir_is_empty(&dir), "scratch and output files are removed");
    }

    #[test]
    fn test_failed_repetition_does_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        let launcher = ScriptedLauncher::new(vec![Step::Write(CSV), Step::Fail, Step::Write(CSV)]);
        let report = Orchestrator::new(Box::new(launcher))
            .run(&config(&dir, 3))
            .unwrap();

        assert_eq!(report.data.len(), 2);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.repetition(), Some(1));
        let msg = failure.to_string();
        assert!(msg.contains("fake-profiler -o"));
        assert!(msg.contains("permission denied"));
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn test_unparseable_output_is_load_error() {
        let dir = TempDir::new().unwrap();
        let launcher = ScriptedLauncher::new(vec![Step::Write("Delta,E\n")]);
        let report = Orchestrator::new(Box::new(launcher))
            .run(&config(&dir, 1))
            .unwrap();

        assert!(report.data.is_empty());
        assert!(matches!(
            report.failures[0],
            EnergiError::MeasurementLoad {
                repetition: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn test_keep_output_persists_measurements() {
        let dir = TempDir::new().unwrap();
        let launcher = ScriptedLauncher::new(vec![Step::Write(CSV)]);
        let report = Orchestrator::new(Box::new(launcher))
            .run(&config(&dir, 1).with_keep_output(true))
            .unwrap();

        let path = report.data[0].output_path.clone().unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), CSV);
    }

    #[test]
    fn test_zero_runs_rejected() {
        let dir = TempDir::new().unwrap();
        let orchestrator = Orchestrator::new(Box::new(ScriptedLauncher::new(vec![])));
        assert!(matches!(
            orchestrator.run(&config(&dir, 0)),
            Err(EnergiError::Config(_))
        ));
    }

    #[test]
    fn test_report_series_uses_column_config() {
        let dir = TempDir::new().unwrap();
        let launcher = ScriptedLauncher::new(vec![Step::Write(CSV), Step::Write(CSV)]);
        let report = Orchestrator::new(Box::new(launcher))
            .run(&config(&dir, 2))
            .unwrap();

        let extraction = report.series(true, &ColumnConfig::new(0, 1, true));
        assert!(extraction.failures.is_empty());
        let series = &extraction.series;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].series.power(), &[0.0, 10.0, 30.0]);
        assert_eq!(series[0].series, series[1].series);
    }

    #[test]
    fn test_report_series_keeps_repetition_labels() {
        let dir = TempDir::new().unwrap();
        let short = "Delta,E\n0,0\n100,10\n";
        let launcher = ScriptedLauncher::new(vec![
            Step::Write(CSV),
            Step::Fail,
            Step::Write(short),
            Step::Write(CSV),
        ]);
        let report = Orchestrator::new(Box::new(launcher))
            .run(&config(&dir, 4))
            .unwrap();

        let extraction = report.series(false, &ColumnConfig::new(0, 1, true));
        let runs: Vec<_> = extraction.series.iter().map(|s| s.run).collect();
        assert_eq!(runs, vec![0, 3]);
        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].repetition(), Some(2));
    }

    #[test]
    fn test_timed_out_repetition_is_invocation_failure() {
        let dir = TempDir::new().unwrap();
        let launcher = ScriptedLauncher::new(vec![Step::Hang, Step::Write(CSV)]);
        let report = Orchestrator::new(Box::new(launcher))
            .run(&config(&dir, 2))
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        match &report.failures[0] {
            EnergiError::ProfilerInvocation {
                repetition,
                reason,
                stdout,
                ..
            } => {
                assert_eq!(*repetition, 0);
                assert!(reason.contains("timed out after 30s"), "{}", reason);
                assert_eq!(stdout, "sampling...");
            }
            other => panic!("expected an invocation failure, got {:?}", other),
        }
        assert_eq!(report.data.len(), 1);
        assert_eq!(report.data[0].repetition, 1);
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn test_resolve_program_text() {
        let source = ProgramSource::Text("x = 1".into());
        assert_eq!(resolve_program(&source).unwrap(), "x = 1");
    }
}
