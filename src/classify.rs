//! Failure classification and warning reporting.
//!
//! The classifier inspects one [`ExecutionOutcome`] against the resolved
//! options and assigns a terminal state: succeeded, launch failed, bad exit,
//! signal death, or stderr violation. It decides category and severity tier
//! only; delivery is the [`WarningSink`]'s job, and the advisory-to-fatal
//! switch is the caller-supplied [`WarningMode`].

use crate::error::{Advisory, CallError};
use crate::options::ResolvedOptions;
use crate::outcome::{ExecutionOutcome, ExitDisposition};
use crate::records::is_blank_record;
use std::fmt;
use std::sync::Arc;

/// Where advisories are delivered.
pub trait WarningSink: Send + Sync {
    fn report(&self, advisory: &Advisory);
}

/// Default sink: logs through `tracing::warn!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn report(&self, advisory: &Advisory) {
        tracing::warn!(%advisory, "command warning");
    }
}

/// Whether advisories halt execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningMode {
    /// Deliver advisories to the sink and continue (default).
    #[default]
    Report,
    /// Deliver to the sink, then fail the invocation.
    Fatal,
}

/// The externally supplied warning policy: a sink plus an escalation mode.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn WarningSink>,
    mode: WarningMode,
}

impl Reporter {
    pub fn new(sink: Arc<dyn WarningSink>, mode: WarningMode) -> Self {
        Self { sink, mode }
    }

    /// The default sink with the given escalation mode.
    pub fn tracing(mode: WarningMode) -> Self {
        Self::new(Arc::new(TracingSink), mode)
    }

    pub fn mode(&self) -> WarningMode {
        self.mode
    }

    /// Deliver one advisory; under [`WarningMode::Fatal`] the advisory comes
    /// back as a hard error after delivery.
    pub fn report(&self, advisory: Advisory) -> Result<(), CallError> {
        self.sink.report(&advisory);
        match self.mode {
            WarningMode::Report => Ok(()),
            WarningMode::Fatal => Err(CallError::Escalated(advisory)),
        }
    }

    /// Deliver a batch, stopping at the first escalation.
    pub fn report_all(
        &self,
        advisories: impl IntoIterator<Item = Advisory>,
    ) -> Result<(), CallError> {
        for advisory in advisories {
            self.report(advisory)?;
        }
        Ok(())
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::tracing(WarningMode::default())
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Terminal state of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Classification {
    Succeeded,
    LaunchFailed(Advisory),
    BadExit(Advisory),
    SignalTerminated(Advisory),
    /// Always fatal, independent of the warning mode.
    StderrViolation { content: String },
}

/// Classify a raw outcome against the resolved options.
///
/// Priority: a launch failure preempts everything (there was no process to
/// misbehave); a stderr violation preempts exit-status checks, since it is
/// the only always-fatal category.
pub(crate) fn classify_outcome(
    command: &str,
    outcome: &ExecutionOutcome,
    options: &ResolvedOptions,
) -> Classification {
    if let Some(reason) = &outcome.launch_error {
        return Classification::LaunchFailed(Advisory::LaunchFailed {
            command: command.to_string(),
            reason: reason.clone(),
        });
    }

    if options.fail_on_stderr {
        let content = outcome.stderr_string();
        let blank = match options.effective_irs() {
            Some(sep) => is_blank_record(&content, sep),
            None => content.is_empty(),
        };
        if !blank {
            return Classification::StderrViolation { content };
        }
    }

    match outcome.disposition {
        ExitDisposition::Signaled(signal) => {
            Classification::SignalTerminated(Advisory::SignalTerminated {
                command: command.to_string(),
                signal,
            })
        }
        ExitDisposition::Exited(code) if !options.allow_exit.contains(code) => {
            Classification::BadExit(Advisory::BadExit {
                command: command.to_string(),
                code,
                allowed: options.allow_exit.to_string(),
            })
        }
        ExitDisposition::Exited(_) => Classification::Succeeded,
    }
}
