//! Profiler process launching
//!
//! All platform variance in how the profiler is started lives here. The
//! orchestrator only sees [`ProcessLauncher::invoke`], which runs the
//! profiler against a script and reports how it exited.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{LaunchMode, ProfilerConfig};
use crate::error::{EnergiError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Time a timed-out process group gets between SIGTERM and SIGKILL
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Completed (or abandoned) profiler process
#[derive(Debug)]
pub struct Invocation {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    /// The process hit the timeout and was killed
    pub timed_out: bool,
}

impl Invocation {
    pub fn success(&self) -> bool {
        self.status.success() && !self.timed_out
    }
}

/// Starts the profiler against a script, writing measurements to `output`
pub trait ProcessLauncher: std::fmt::Debug {
    /// Build the command that profiles `script`
    fn command(&self, script: &Path, output: &Path) -> Command;

    /// Wall-clock limit for one invocation
    fn timeout(&self) -> Option<Duration>;

    /// Start the profiler as the leader of its own process group, so a
    /// timeout stops everything it forked
    fn own_process_group(&self) -> bool {
        true
    }

    /// Run the profiler to completion and capture its output
    fn invoke(&self, script: &Path, output: &Path) -> std::io::Result<Invocation> {
        let mut command = self.command(script, output);
        tracing::info!("Launching: {}", display_command(&command));
        run_to_completion(&mut command, self.timeout(), self.own_process_group())
    }
}

/// Profiler executable and the interpreter it runs scripts with
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilerCommand {
    pub executable: PathBuf,
    pub interpreter: String,
}

impl ProfilerCommand {
    /// `-o <output> --summary <interpreter> <script>`
    fn args(&self, script: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-o".into(),
            output.as_os_str().to_os_string(),
            "--summary".into(),
            self.interpreter.clone().into(),
            script.as_os_str().to_os_string(),
        ]
    }
}

/// Start the profiler directly
#[derive(Debug, Clone)]
pub struct DirectLaunch {
    pub profiler: ProfilerCommand,
    pub timeout: Option<Duration>,
}

impl ProcessLauncher for DirectLaunch {
    fn command(&self, script: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.profiler.executable);
        command.args(self.profiler.args(script, output));
        command
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Start the profiler through an elevation program, for builds that need
/// privileged access to energy counters
#[derive(Debug, Clone)]
pub struct ElevatedLaunch {
    pub elevate_with: String,
    pub profiler: ProfilerCommand,
    pub timeout: Option<Duration>,
}

impl ProcessLauncher for ElevatedLaunch {
    fn command(&self, script: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.elevate_with);
        command
            .arg(&self.profiler.executable)
            .args(self.profiler.args(script, output));
        command
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The elevation program may prompt on the terminal, which a background
    /// process group cannot read. It stays in the foreground group and
    /// relays SIGTERM to the profiler on timeout.
    fn own_process_group(&self) -> bool {
        false
    }
}

/// Resolve `Auto` to a concrete strategy for an operating system name
/// (as in `std::env::consts::OS`)
pub fn resolve_launch_mode(mode: LaunchMode, os: &str) -> Result<LaunchMode> {
    match mode {
        LaunchMode::Direct | LaunchMode::Elevated => Ok(mode),
        LaunchMode::Auto => match os {
            "linux" => Ok(LaunchMode::Elevated),
            "macos" | "windows" => Ok(LaunchMode::Direct),
            other => Err(EnergiError::UnsupportedPlatform(format!(
                "no profiler launch strategy for {:?}; pass --launcher direct or elevated",
                other
            ))),
        },
    }
}

/// Build the launcher for this host once, at startup
pub fn launcher_for(config: &ProfilerConfig) -> Result<Box<dyn ProcessLauncher>> {
    let profiler = ProfilerCommand {
        executable: config.executable.clone(),
        interpreter: config.interpreter.clone(),
    };
    let timeout = config.timeout();
    let mode = resolve_launch_mode(config.launch, std::env::consts::OS)?;
    tracing::debug!("Using {:?} profiler launch", mode);

    Ok(match mode {
        LaunchMode::Elevated => Box::new(ElevatedLaunch {
            elevate_with: config.elevate_with.clone(),
            profiler,
            timeout,
        }),
        _ => Box::new(DirectLaunch { profiler, timeout }),
    })
}

/// Render a command line for logs and error messages
pub fn display_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn run_to_completion(
    command: &mut Command,
    timeout: Option<Duration>,
    own_group: bool,
) -> std::io::Result<Invocation> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    if own_group {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    let mut child = command.spawn()?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let (status, timed_out) = wait_with_timeout(&mut child, timeout, own_group)?;

    // Once killed, the pipes close when the last holder exits. Readers get a
    // bounded wait in case a process escaped the signal.
    let collect = |output: mpsc::Receiver<String>| {
        if timed_out {
            output.recv_timeout(KILL_GRACE).unwrap_or_default()
        } else {
            output.recv().unwrap_or_default()
        }
    };

    Ok(Invocation {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
        timed_out,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    own_group: bool,
) -> std::io::Result<(ExitStatus, bool)> {
    let Some(timeout) = timeout else {
        return Ok((child.wait()?, false));
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }
        if Instant::now() >= deadline {
            tracing::warn!("Profiler exceeded {:?}, terminating pid {}", timeout, child.id());
            return Ok((terminate(child, own_group)?, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Stop the profiler with SIGTERM, then SIGKILL once the grace period runs
/// out. With `own_group` the signals go to its whole process group.
#[cfg(unix)]
fn terminate(child: &mut Child, own_group: bool) -> std::io::Result<ExitStatus> {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(child.id() as i32);
    let send = |signal: Signal| {
        let sent = if own_group {
            killpg(pid, signal)
        } else {
            kill(pid, signal)
        };
        match sent {
            Ok(()) => tracing::debug!("Sent {} to {} (group: {})", signal, pid, own_group),
            Err(nix::errno::Errno::ESRCH) => {}
            Err(e) => tracing::warn!("Sending {} to {} failed: {}", signal, pid, e),
        }
    };

    send(Signal::SIGTERM);
    let deadline = Instant::now() + KILL_GRACE;
    let mut status = None;
    while Instant::now() < deadline {
        if let Some(exited) = child.try_wait()? {
            status = Some(exited);
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    match status {
        Some(status) => {
            // Group members that outlived the leader
            if own_group {
                send(Signal::SIGKILL);
            }
            Ok(status)
        }
        None => {
            send(Signal::SIGKILL);
            child.wait()
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child, _own_group: bool) -> std::io::Result<ExitStatus> {
    child.kill()?;
    child.wait()
}
