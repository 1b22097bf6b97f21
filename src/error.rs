//! Error types for proc_call.
//!
//! This module defines the failure taxonomy:
//! - [`ConfigError`]: contradictory or unusable configuration - always fatal,
//!   detected before any process is launched
//! - [`Advisory`]: reported conditions that do not halt execution by default
//!   but can be escalated to fatal by the caller's warning policy
//! - [`CallError`]: the combined error type returned by an invocation

use thiserror::Error;

/// Fatal configuration error.
///
/// These indicate a configuration no sensible execution can satisfy.
/// They are raised at option resolution or invocation-build time, before
/// any process is launched, and are never downgradable to warnings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two option keys that cannot be combined were both set.
    #[error("options `{first}` and `{second}` are mutually exclusive")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },

    /// An option fragment appeared between positional arguments.
    ///
    /// Fragments are only permitted as a leading and/or trailing run.
    #[error("option fragment at argument position {index}: fragments are only allowed at the ends of the argument list")]
    MisplacedFragment { index: usize },

    /// No resolvable command token.
    #[error("empty command")]
    EmptyCommand,

    /// An argument's `Display` implementation returned an error.
    #[error("argument at position {index} failed to format")]
    StringifyFailed { index: usize },

    /// A reserved registry name was used as a command.
    #[error("name is reserved and cannot be invoked as a command: {name}")]
    ReservedName { name: String },
}

/// A reported condition that does not halt execution by default.
///
/// Advisories are delivered through the caller-supplied warning sink and
/// become hard errors only when the warning policy is
/// [`WarningMode::Fatal`](crate::classify::WarningMode::Fatal).
/// All messages are safe to log.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// An option key outside the recognized enumeration.
    #[error("unknown option: {key}")]
    UnknownOption { key: String },

    /// A recognized key bound to a value it cannot accept.
    ///
    /// The previous (or default) value for the key stands.
    #[error("malformed value for option `{key}`: {reason}")]
    MalformedOption { key: String, reason: String },

    /// An argument was not valid UTF-8 and was converted lossily.
    #[error("argument is not valid UTF-8, converted lossily: {lossy}")]
    ArgNotUtf8 { lossy: String },

    /// The process primitive could not start the command.
    #[error("failed to launch {command}: {reason}")]
    LaunchFailed { command: String, reason: String },

    /// The process exited with a code outside the allowed set.
    #[error("{command} exited with disallowed code {code} (allowed: {allowed})")]
    BadExit {
        command: String,
        code: i32,
        allowed: String,
    },

    /// The process was terminated by a signal.
    #[error("{command} terminated by signal {signal}")]
    SignalTerminated { command: String, signal: i32 },
}

/// Combined error type for a single invocation.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Non-empty stderr under `fail_on_stderr`.
    ///
    /// Always fatal, independent of the warning policy: it signals a
    /// caller-declared invariant break.
    #[error("{command} wrote to stderr with fail_on_stderr set: {content:?}")]
    StderrViolation { command: String, content: String },

    /// An advisory escalated to fatal by the warning policy.
    #[error("fatal warning: {0}")]
    Escalated(Advisory),
}
