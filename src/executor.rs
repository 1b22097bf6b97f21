//! Context-sensitive execution.
//!
//! Given a resolved [`Invocation`], the executor wires the three streams
//! according to the options, delegates to the [`Spawner`], runs the failure
//! classifier, and computes the return shape from the context/option matrix:
//!
//! | context   | plain            | `both`                      | `stdout` key present |
//! |-----------|------------------|-----------------------------|----------------------|
//! | Discarded | nothing          | nothing                     | exit code            |
//! | Scalar    | stdout string    | merged string               | exit code            |
//! | List      | stdout records   | (stdout, stderr, code)      | exit code            |
//!
//! A present `stdout` key (even explicit null) always wins: capture is
//! diverted to the target and the exit code is returned, whatever the
//! context.

use crate::classify::{classify_outcome, Classification, Reporter};
use crate::error::CallError;
use crate::invocation::{CallContext, Invocation};
use crate::options::{Presence, ShowCmd};
use crate::records::{chomp_once, split_records};
use crate::redirect::{collect_input, lock_target, InputTarget, OutputTarget};
use crate::spawn::{SpawnSpec, Spawner, StdinSpec, StreamSpec};

/// The value produced by one invocation.
///
/// The shape depends on the caller's context and the resolved options; see
/// the matrix in the module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult {
    /// Discarded context: nothing was computed.
    Done,
    /// Scalar context: captured output as one string.
    Scalar(String),
    /// The exit code, forced by a present `stdout` key.
    ExitCode(i32),
    /// List context: captured stdout split into records.
    Records(Vec<String>),
    /// List context under `both`: the two streams and the exit code.
    Split {
        stdout: String,
        stderr: String,
        code: i32,
    },
}

impl CallResult {
    /// The scalar string, if that is what was produced.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            CallResult::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// The forced exit code, if that is what was produced.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CallResult::ExitCode(code) => Some(*code),
            CallResult::Split { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The record list, if that is what was produced.
    pub fn into_records(self) -> Option<Vec<String>> {
        match self {
            CallResult::Records(records) => Some(records),
            _ => None,
        }
    }
}

/// Run one invocation to completion.
///
/// # Errors
///
/// - [`CallError::StderrViolation`] under `fail_on_stderr` (always fatal)
/// - [`CallError::Escalated`] when the reporter runs in fatal mode and a
///   launch failure, disallowed exit, or signal death occurs
pub fn execute(
    invocation: &Invocation,
    spawner: &dyn Spawner,
    reporter: &Reporter,
) -> Result<CallResult, CallError> {
    let opts = &invocation.options;
    let sep = opts.effective_irs();

    let stdout_spec = match &opts.stdout {
        Presence::Null => StreamSpec::Null,
        Presence::Value(target) => direct_or_capture(target, opts.append_stdout),
        Presence::Unset => {
            if opts.both || invocation.context != CallContext::Discarded {
                StreamSpec::Capture
            } else {
                StreamSpec::Inherit
            }
        }
    };

    let stderr_spec = match &opts.stderr {
        Presence::Null => StreamSpec::Null,
        Presence::Value(target) => direct_or_capture(target, opts.append_stderr),
        Presence::Unset => {
            if opts.both || opts.fail_on_stderr {
                StreamSpec::Capture
            } else {
                StreamSpec::Inherit
            }
        }
    };

    let stdin_spec = match &opts.stdin {
        None => StdinSpec::Inherit,
        Some(InputTarget::Null) => StdinSpec::Null,
        Some(InputTarget::File(path)) => StdinSpec::File(path.clone()),
        Some(InputTarget::Handle(file)) => StdinSpec::Handle(file.clone()),
        Some(target) => StdinSpec::Bytes(collect_input(target).unwrap_or_default()),
    };

    show_cmd(invocation, &opts.show_cmd);

    let outcome = spawner.run(SpawnSpec {
        command: invocation.command.clone(),
        args: invocation.args.clone(),
        stdin: stdin_spec,
        stdout: stdout_spec,
        stderr: stderr_spec,
    });

    // Captured output still belongs to the caller's targets, whatever the
    // classification turns out to be.
    if let Presence::Value(target) = &opts.stdout {
        if target.needs_capture() {
            target.deliver(&outcome.stdout_string(), sep);
        }
    }
    if let Presence::Value(target) = &opts.stderr {
        if target.needs_capture() {
            target.deliver(&outcome.stderr_string(), sep);
        }
    }

    match classify_outcome(&invocation.command, &outcome, opts) {
        Classification::Succeeded => {}
        Classification::StderrViolation { content } => {
            return Err(CallError::StderrViolation {
                command: invocation.command.clone(),
                content,
            });
        }
        Classification::LaunchFailed(advisory)
        | Classification::BadExit(advisory)
        | Classification::SignalTerminated(advisory) => {
            reporter.report(advisory)?;
        }
    }

    let code = outcome.disposition.code();
    let result = if opts.stdout.is_present() {
        CallResult::ExitCode(code)
    } else {
        match invocation.context {
            CallContext::Discarded => CallResult::Done,
            CallContext::Scalar => {
                let mut text = outcome.stdout_string();
                if opts.both {
                    text.push_str(&outcome.stderr_string());
                }
                let text = match sep {
                    Some(sep) if opts.chomp => chomp_once(&text, sep).to_string(),
                    _ => text,
                };
                CallResult::Scalar(text)
            }
            CallContext::List => {
                if opts.both {
                    CallResult::Split {
                        stdout: outcome.stdout_string(),
                        stderr: outcome.stderr_string(),
                        code,
                    }
                } else {
                    let text = outcome.stdout_string();
                    let mut records = match sep {
                        Some(sep) => split_records(&text, sep),
                        None if text.is_empty() => Vec::new(),
                        None => vec![text],
                    };
                    if opts.chomp {
                        if let Some(sep) = sep {
                            for record in &mut records {
                                *record = chomp_once(record, sep).to_string();
                            }
                        }
                    }
                    CallResult::Records(records)
                }
            }
        }
    };

    Ok(result)
}

fn direct_or_capture(target: &OutputTarget, append: bool) -> StreamSpec {
    match target {
        OutputTarget::File(path) => StreamSpec::File {
            path: path.clone(),
            append,
        },
        OutputTarget::Handle(file) => StreamSpec::Handle(file.clone()),
        _ => StreamSpec::Capture,
    }
}

/// Echo the resolved command line before spawning, verbatim, not
/// shell-escaped. Purely diagnostic.
fn show_cmd(invocation: &Invocation, sink: &ShowCmd) {
    if matches!(sink, ShowCmd::Off) {
        return;
    }
    let mut line = invocation.command.clone();
    for arg in &invocation.args {
        line.push(' ');
        line.push_str(arg);
    }
    match sink {
        ShowCmd::Off => {}
        ShowCmd::Stderr => eprintln!("$ {line}"),
        ShowCmd::Writer(writer) => {
            let mut writer = lock_target(writer);
            let _ = writeln!(&mut *writer, "$ {line}");
        }
    }
}
