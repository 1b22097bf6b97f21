//! Raw execution outcome.

/// How the child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Exited normally with a code.
    Exited(i32),
    /// Terminated by a signal.
    Signaled(i32),
}

impl ExitDisposition {
    /// The exit code used for exit-code return values.
    ///
    /// Signal deaths and launch failures report -1; they have no
    /// meaningful exit code.
    pub fn code(&self) -> i32 {
        match self {
            ExitDisposition::Exited(code) => *code,
            ExitDisposition::Signaled(_) => -1,
        }
    }
}

/// The raw result of running the external process once.
///
/// Produced by the [`Spawner`](crate::spawn::Spawner), consumed immediately
/// by the failure classifier and the return-value computation. A launch
/// failure is reported here rather than as an early error, so that it can be
/// classified like any other failure.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Why the process could not be started, if it could not.
    pub launch_error: Option<String>,

    /// How the process ended. Meaningless when `launch_error` is set.
    pub disposition: ExitDisposition,

    /// Captured stdout bytes (empty unless capture was requested).
    pub stdout: Vec<u8>,

    /// Captured stderr bytes (empty unless capture was requested).
    pub stderr: Vec<u8>,
}

impl ExecutionOutcome {
    /// An outcome describing a failure to start the process at all.
    pub fn launch_failure(reason: impl Into<String>) -> Self {
        Self {
            launch_error: Some(reason.into()),
            disposition: ExitDisposition::Exited(-1),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    pub fn launched(&self) -> bool {
        self.launch_error.is_none()
    }

    /// Captured stdout as a string (lossy UTF-8 conversion).
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Captured stderr as a string (lossy UTF-8 conversion).
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}
