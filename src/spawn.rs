//! The process-spawning seam.
//!
//! Everything the invocation engine needs from the operating system is
//! behind the [`Spawner`] trait: given a fully resolved [`SpawnSpec`],
//! synchronously run the process and report an
//! [`ExecutionOutcome`]. Launch failures are part of the outcome, never a
//! panic or an early return, so the failure classifier sees every case.
//!
//! [`SystemSpawner`] is the production implementation on
//! `std::process::Command`.

use crate::outcome::{ExecutionOutcome, ExitDisposition};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Resolved stdin wiring for one spawn.
#[derive(Debug, Clone)]
pub enum StdinSpec {
    /// Inherit the caller's stdin.
    Inherit,
    /// Bind to the null device.
    Null,
    /// Read from a file.
    File(PathBuf),
    /// Read from an already-open handle.
    Handle(Arc<File>),
    /// Feed the given bytes through a pipe.
    Bytes(Vec<u8>),
}

/// Resolved stdout/stderr wiring for one spawn.
#[derive(Debug, Clone)]
pub enum StreamSpec {
    /// Inherit the caller's stream.
    Inherit,
    /// Bind to the null device.
    Null,
    /// Write to a file, truncating or appending.
    File { path: PathBuf, append: bool },
    /// Write to an already-open handle.
    Handle(Arc<File>),
    /// Capture into the outcome.
    Capture,
}

/// A fully resolved process invocation, ready to run.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub command: String,
    pub args: Vec<String>,
    pub stdin: StdinSpec,
    pub stdout: StreamSpec,
    pub stderr: StreamSpec,
}

/// The external process primitive.
///
/// Implementations run the process synchronously, draining any captured
/// streams before returning. All resources (process handle, pipes, files)
/// are scoped to the single `run` call.
pub trait Spawner: Send + Sync {
    fn run(&self, spec: SpawnSpec) -> ExecutionOutcome;
}

/// Production spawner built on `std::process::Command`.
///
/// Arguments are passed verbatim via argv; no shell is involved. When stdin
/// is fed from memory, a scoped writer thread keeps the pipe drained while
/// `wait_with_output` collects the captured streams, avoiding pipe deadlock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl Spawner for SystemSpawner {
    fn run(&self, spec: SpawnSpec) -> ExecutionOutcome {
        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args);

        let mut stdin_bytes = None;
        match &spec.stdin {
            StdinSpec::Inherit => {
                cmd.stdin(Stdio::inherit());
            }
            StdinSpec::Null => {
                cmd.stdin(Stdio::null());
            }
            StdinSpec::File(path) => match File::open(path) {
                Ok(file) => {
                    cmd.stdin(Stdio::from(file));
                }
                Err(e) => {
                    return ExecutionOutcome::launch_failure(format!(
                        "failed to open stdin file {}: {e}",
                        path.display()
                    ));
                }
            },
            StdinSpec::Handle(file) => match file.try_clone() {
                Ok(file) => {
                    cmd.stdin(Stdio::from(file));
                }
                Err(e) => {
                    return ExecutionOutcome::launch_failure(format!(
                        "failed to clone stdin handle: {e}"
                    ));
                }
            },
            StdinSpec::Bytes(bytes) => {
                cmd.stdin(Stdio::piped());
                stdin_bytes = Some(bytes.clone());
            }
        }

        match output_stdio(&spec.stdout) {
            Ok(stdio) => {
                cmd.stdout(stdio);
            }
            Err(e) => {
                return ExecutionOutcome::launch_failure(format!("failed to wire stdout: {e}"));
            }
        }
        match output_stdio(&spec.stderr) {
            Ok(stdio) => {
                cmd.stderr(stdio);
            }
            Err(e) => {
                return ExecutionOutcome::launch_failure(format!("failed to wire stderr: {e}"));
            }
        }

        tracing::debug!(command = %spec.command, args = ?spec.args, "spawning");

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return ExecutionOutcome::launch_failure(e.to_string()),
        };

        // Feed stdin from a separate thread so a child that fills its output
        // pipes before reading stdin cannot deadlock us.
        let writer = stdin_bytes.map(|bytes| {
            let mut stdin = child.stdin.take().expect("stdin piped");
            std::thread::spawn(move || {
                // EPIPE here just means the child stopped reading early.
                let _ = stdin.write_all(&bytes);
            })
        });

        let output = child.wait_with_output();
        if let Some(writer) = writer {
            let _ = writer.join();
        }

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                return ExecutionOutcome::launch_failure(format!("wait error: {e}"));
            }
        };

        let disposition = match output.status.code() {
            Some(code) => ExitDisposition::Exited(code),
            None => match output.status.signal() {
                Some(signal) => ExitDisposition::Signaled(signal),
                None => ExitDisposition::Exited(-1),
            },
        };

        ExecutionOutcome {
            launch_error: None,
            disposition,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

fn output_stdio(spec: &StreamSpec) -> io::Result<Stdio> {
    match spec {
        StreamSpec::Inherit => Ok(Stdio::inherit()),
        StreamSpec::Null => Ok(Stdio::null()),
        StreamSpec::File { path, append } => {
            let mut opts = OpenOptions::new();
            opts.create(true);
            if *append {
                opts.append(true);
            } else {
                opts.write(true).truncate(true);
            }
            Ok(Stdio::from(opts.open(path)?))
        }
        StreamSpec::Handle(file) => Ok(Stdio::from(file.try_clone()?)),
        StreamSpec::Capture => Ok(Stdio::piped()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_exit_code() {
        let spec = SpawnSpec {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "printf hi; exit 3".to_string()],
            stdin: StdinSpec::Null,
            stdout: StreamSpec::Capture,
            stderr: StreamSpec::Capture,
        };
        let outcome = SystemSpawner.run(spec);

        assert!(outcome.launched());
        assert_eq!(outcome.disposition, ExitDisposition::Exited(3));
        assert_eq!(outcome.stdout_string(), "hi");
    }

    #[test]
    fn test_launch_failure_is_in_outcome() {
        let spec = SpawnSpec {
            command: "/nonexistent/definitely-not-a-binary".to_string(),
            args: vec![],
            stdin: StdinSpec::Null,
            stdout: StreamSpec::Capture,
            stderr: StreamSpec::Capture,
        };
        let outcome = SystemSpawner.run(spec);

        assert!(!outcome.launched());
        assert_eq!(outcome.disposition.code(), -1);
    }

    #[test]
    fn test_stdin_bytes_are_fed() {
        let spec = SpawnSpec {
            command: "/bin/cat".to_string(),
            args: vec![],
            stdin: StdinSpec::Bytes(b"line one\nline two".to_vec()),
            stdout: StreamSpec::Capture,
            stderr: StreamSpec::Capture,
        };
        let outcome = SystemSpawner.run(spec);

        assert!(outcome.launched());
        assert_eq!(outcome.stdout_string(), "line one\nline two");
    }

    #[test]
    fn test_signal_disposition() {
        let spec = SpawnSpec {
            command: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), "kill -TERM $$".to_string()],
            stdin: StdinSpec::Null,
            stdout: StreamSpec::Capture,
            stderr: StreamSpec::Capture,
        };
        let outcome = SystemSpawner.run(spec);

        assert!(outcome.launched());
        assert_eq!(outcome.disposition, ExitDisposition::Signaled(15));
    }
}
