//! Utilities for interaction with local system binaries and executables.
//!
//! [`sys_exec`] runs a long-lived child with its output streamed through the
//! logger line by line; [`sync_command`] is the one-shot capture-everything
//! variant; [`block_until`] polls a condition before triggering an effect.

use crate::error::{ToolsError, ToolsResult};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Options controlling how [`sys_exec`] runs a child process.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Working directory the child is invoked from
    pub cwd: PathBuf,
    /// Environment passed to the child, replacing the inherited one
    pub env: HashMap<String, String>,
    /// Optional file that stdout lines are also written to
    pub stdout_capture: Option<PathBuf>,
    /// Whether stderr output should be silenced instead of logged
    pub quiet_stderr: bool,
    /// Wall-clock limit before the child is killed
    pub timeout: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            env: std::env::vars().collect(),
            stdout_capture: None,
            quiet_stderr: false,
            timeout: Duration::from_secs(24 * 60),
        }
    }
}

/// Execute a system command with its output streamed through the logger.
///
/// Stdout lines are logged at info level with an `o>>` prefix, stderr lines
/// at error level with `e>>` (unless `quiet_stderr`), each drained on its own
/// thread so a full pipe buffer can never stall the child. When a capture
/// file is configured, stdout lines are additionally written there, with the
/// parent directory chain created first.
///
/// Returns the child's exit code.
///
/// # Errors
///
/// Returns [`ToolsError::Exec`] when the executable does not exist and
/// [`ToolsError::Timeout`] when the child outlives the configured limit (the
/// child is killed).
pub fn sys_exec(executable: &Path, args: &[&str], options: &ExecOptions) -> ToolsResult<i32> {
    if !executable.exists() {
        return Err(ToolsError::exec(format!(
            "cannot use given executable: {}",
            executable.display()
        )));
    }

    tracing::debug!("Executing {} {:?} in {}", executable.display(), args, options.cwd.display());

    let capture = match &options.stdout_capture {
        Some(dest) => Some(open_capture_file(dest)?),
        None => None,
    };

    let mut child = Command::new(executable)
        .args(args)
        .current_dir(&options.cwd)
        .env_clear()
        .envs(&options.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let mut drains: Vec<JoinHandle<()>> = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        drains.push(spawn_drain(stdout, LogStream::Stdout, capture));
    }
    if let Some(stderr) = child.stderr.take() {
        let stream = if options.quiet_stderr { LogStream::Silent } else { LogStream::Stderr };
        drains.push(spawn_drain(stderr, stream, None));
    }

    let deadline = Instant::now() + options.timeout;
    let mut timed_out = false;
    let code = loop {
        if let Some(status) = child.try_wait()? {
            break status.code().unwrap_or(-1);
        }
        if Instant::now() >= deadline {
            if let Err(e) = child.kill() {
                tracing::error!("Failed to kill timed-out child: {e}");
            }
            let _ = child.wait();
            timed_out = true;
            break -1;
        }
        thread::sleep(Duration::from_millis(25));
    };

    for drain in drains {
        let _ = drain.join();
    }
    if timed_out {
        return Err(ToolsError::timeout(format!(
            "{} exceeded {:?}",
            executable.display(),
            options.timeout
        )));
    }
    Ok(code)
}

#[derive(Debug, Clone, Copy)]
enum LogStream {
    Stdout,
    Stderr,
    Silent,
}

fn open_capture_file(dest: &Path) -> ToolsResult<File> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            // restrictive mode applies only to directories created here
            let mut builder = fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
            builder.create(parent)?;
        }
    }
    let file = File::create(dest)?;
    tracing::info!("Set up output capture file: {}", dest.display());
    Ok(file)
}

fn spawn_drain<R: Read + Send + 'static>(
    pipe: R,
    stream: LogStream,
    mut capture: Option<File>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Error reading subprocess output: {e}");
                    return;
                }
            };
            match stream {
                LogStream::Stdout => tracing::info!(target: "sys_exec", "o>> {line}"),
                LogStream::Stderr => tracing::error!(target: "sys_exec", "e>> {line}"),
                LogStream::Silent => {}
            }
            if let Some(file) = capture.as_mut() {
                if let Err(e) = writeln!(file, "{line}") {
                    tracing::error!("Error writing capture file: {e}");
                    capture = None;
                }
            }
        }
        if let Some(mut file) = capture {
            let _ = file.flush();
        }
    })
}

/// Execute a one-shot system command, capturing stdout and stderr.
///
/// With `shell` set, the command string is handed to `sh -c` as-is;
/// otherwise it is whitespace-tokenized and the first token spawned
/// directly. With `check` set, a non-zero exit becomes an error.
pub fn sync_command(cmd: &str, shell: bool, check: bool) -> ToolsResult<Output> {
    let output = if shell {
        Command::new("sh").arg("-c").arg(cmd).output()?
    } else {
        let mut tokens = cmd.split_whitespace();
        let program =
            tokens.next().ok_or_else(|| ToolsError::exec("empty command".to_string()))?;
        Command::new(program).args(tokens).output()?
    };

    if !output.status.success() {
        tracing::error!("{}", String::from_utf8_lossy(&output.stderr));
        if check {
            return Err(ToolsError::exec(format!(
                "command '{cmd}' failed with status {}",
                output.status
            )));
        }
    }
    Ok(output)
}

/// Block (up to `timeout`) until `condition` returns true, then run `effect`.
///
/// The deadline is checked before each condition attempt; between failed
/// attempts the current thread sleeps for `retry_delay`.
///
/// # Errors
///
/// Returns [`ToolsError::Timeout`] when the deadline passes before the
/// condition obtains.
pub fn block_until<C, E, R>(
    mut condition: C,
    mut effect: E,
    timeout: Duration,
    retry_delay: Duration,
) -> ToolsResult<R>
where
    C: FnMut() -> bool,
    E: FnMut() -> R,
{
    let start = Instant::now();
    loop {
        if start.elapsed() > timeout {
            return Err(ToolsError::timeout(format!(
                "condition did not obtain within {timeout:?}"
            )));
        }

        if condition() {
            tracing::debug!("Condition obtained, executing effect");
            return Ok(effect());
        }
        tracing::info!("Condition failed, sleeping for {:?}", retry_delay);
        thread::sleep(retry_delay);
    }
}

/// Adapt a fallible exit-code closure into a boolean condition for [`block_until`].
///
/// Errors are logged and count as the condition not holding.
pub fn exit_code_condition<F>(mut call: F) -> impl FnMut() -> bool
where
    F: FnMut() -> ToolsResult<i32>,
{
    move || match call() {
        Ok(code) => code == 0,
        Err(e) => {
            tracing::error!("Condition call failed: {e}");
            false
        }
    }
}
