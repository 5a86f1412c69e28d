use std::{
    ffi::OsString,
    fmt,
    io::Read,
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::PipelineError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A program invocation: executable, argument list and working directory.
///
/// Arguments are kept as separate strings so paths with spaces never need quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    /// Executable name or path
    pub program: PathBuf,
    /// Arguments in order
    pub args: Vec<OsString>,
    /// Working directory, inherited when `None`
    pub cwd: Option<PathBuf>,
}

impl ExternalCommand {
    /// Create a command without arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a flag followed by its value.
    pub fn opt(self, flag: &str, value: impl ToString) -> Self {
        self.arg(flag).arg(value.to_string())
    }

    /// Append a flag followed by a path.
    pub fn path_opt(self, flag: &str, path: impl AsRef<Path>) -> Self {
        self.arg(flag).arg(path.as_ref().as_os_str())
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Program name used in messages.
    pub fn tool_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Arguments as lossy strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Shared flag that stops running stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Captured output of a finished program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status
    pub status: ExitStatus,
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

/// Run a command to completion.
///
/// Blocks until the program exits. A nonzero exit becomes
/// [`PipelineError::ExternalTool`] carrying the captured standard error. When
/// `cancel` is set while waiting, the child is killed and
/// [`PipelineError::Cancelled`] is returned. There is no timeout.
pub fn run_command(
    cmd: &ExternalCommand,
    stage: &str,
    cancel: &CancelToken,
) -> Result<CommandOutput, PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled {
            stage: stage.to_string(),
        });
    }

    log::debug!("[{stage}] {cmd}");

    let mut process = Command::new(&cmd.program);
    process
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &cmd.cwd {
        process.current_dir(cwd);
    }

    let mut child = process.spawn().map_err(|source| PipelineError::Spawn {
        tool: cmd.tool_name(),
        stage: stage.to_string(),
        source,
    })?;

    // drain both pipes so a chatty child never blocks on a full buffer
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = loop {
        if cancel.is_cancelled() {
            log::warn!("[{stage}] cancelled, terminating {}", cmd.tool_name());
            // the child may have exited between the poll and the kill
            let _ = child.kill();
            child.wait()?;
            return Err(PipelineError::Cancelled {
                stage: stage.to_string(),
            });
        }
        if let Some(status) = child.try_wait()? {
            break status;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = CommandOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    };

    if !status.success() {
        return Err(PipelineError::ExternalTool {
            tool: cmd.tool_name(),
            stage: stage.to_string(),
            code: status.code(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // a broken pipe only truncates the captured text
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}
