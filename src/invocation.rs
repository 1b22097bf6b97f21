//! Invocation building.
//!
//! Turns a command, a flat argument list possibly carrying inline option
//! fragments, and the surrounding default option layers into one resolved
//! [`Invocation`]. Fragments may only appear as a leading and/or trailing
//! run; anything else is a configuration error.

use crate::error::{Advisory, ConfigError};
use crate::options::{OptionLayer, ResolvedOptions};
use std::ffi::OsString;
use std::fmt::{self, Write as _};

/// How the caller intends to use the result of an invocation.
///
/// Rust has no caller-context inference, so the context is an explicit tag,
/// surfaced through the per-context entry points on
/// [`Callable`](crate::callable::Callable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallContext {
    /// The result is discarded; streams pass through unless redirected.
    Discarded,
    /// The result is one value (captured output or exit code).
    Scalar,
    /// The result is a sequence of records (or the `both` triple).
    List,
}

/// One element of a raw argument list.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A plain string argument.
    Str(String),
    /// A raw OS string; converted lossily with an advisory if not UTF-8.
    Os(OsString),
    /// An inline option fragment.
    Opts(OptionLayer),
    /// A value whose `Display` implementation failed. Always fatal at
    /// build time.
    FailedDisplay,
}

impl Arg {
    /// Stringify any `Display` value into an argument.
    ///
    /// A `Display` impl that itself returns an error produces
    /// [`Arg::FailedDisplay`], which the builder rejects as fatal.
    pub fn display(value: impl fmt::Display) -> Self {
        let mut s = String::new();
        match write!(&mut s, "{value}") {
            Ok(()) => Arg::Str(s),
            Err(_) => Arg::FailedDisplay,
        }
    }

    fn is_fragment(&self) -> bool {
        matches!(self, Arg::Opts(_))
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Str(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Str(s)
    }
}

impl From<OsString> for Arg {
    fn from(s: OsString) -> Self {
        Arg::Os(s)
    }
}

impl From<OptionLayer> for Arg {
    fn from(layer: OptionLayer) -> Self {
        Arg::Opts(layer)
    }
}

/// A fully resolved invocation, created fresh per call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
    pub options: ResolvedOptions,
    pub context: CallContext,
}

/// Build an [`Invocation`] from a command, raw arguments, and default layers.
///
/// Leading and trailing option fragments are extracted and merged after
/// `default_layers` (later wins); the remaining elements become stringified
/// positionals. Advisories from stringification and from the merge are
/// returned alongside for the reporter.
///
/// # Errors
///
/// - [`ConfigError::EmptyCommand`] if `command` is empty
/// - [`ConfigError::MisplacedFragment`] for a fragment between positionals
/// - [`ConfigError::StringifyFailed`] for an argument whose `Display` failed
/// - [`ConfigError::ConflictingOptions`] from the merge
pub fn build(
    command: &str,
    default_layers: &[OptionLayer],
    raw_args: Vec<Arg>,
    context: CallContext,
) -> Result<(Invocation, Vec<Advisory>), ConfigError> {
    if command.is_empty() {
        return Err(ConfigError::EmptyCommand);
    }

    // Fragments must form a leading and/or trailing run.
    let first_positional = raw_args.iter().position(|a| !a.is_fragment());
    let last_positional = raw_args.iter().rposition(|a| !a.is_fragment());
    if let (Some(first), Some(last)) = (first_positional, last_positional) {
        for index in first..=last {
            if raw_args[index].is_fragment() {
                return Err(ConfigError::MisplacedFragment { index });
            }
        }
    }

    let mut advisories = Vec::new();
    let mut args = Vec::new();
    let mut layers: Vec<OptionLayer> = default_layers.to_vec();

    for (index, arg) in raw_args.into_iter().enumerate() {
        match arg {
            Arg::Str(s) => args.push(s),
            Arg::Os(os) => match os.into_string() {
                Ok(s) => args.push(s),
                Err(os) => {
                    let lossy = os.to_string_lossy().into_owned();
                    advisories.push(Advisory::ArgNotUtf8 {
                        lossy: lossy.clone(),
                    });
                    args.push(lossy);
                }
            },
            Arg::Opts(layer) => layers.push(layer),
            Arg::FailedDisplay => {
                return Err(ConfigError::StringifyFailed { index });
            }
        }
    }

    let (options, merge_advisories) = ResolvedOptions::merge(&layers)?;
    advisories.extend(merge_advisories);

    Ok((
        Invocation {
            command: command.to_string(),
            args,
            options,
            context,
        },
        advisories,
    ))
}
