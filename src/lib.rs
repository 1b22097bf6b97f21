//! # proc_call
//!
//! Function-call style invocation of external commands.
//!
//! `proc_call` binds external commands to [`Callable`] values so that
//! running a program reads like calling a function: arguments are passed
//! verbatim through argv (never a shell), options are layered from registry
//! defaults down to inline per-call fragments, and the shape of the result
//! follows the entry point you choose.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proc_call::{Arg, OptionLayer, Shell};
//! use proc_call::CallContext;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sh = Shell::new().with_defaults(OptionLayer::new().chomp(true));
//! sh.alias("ll", "ls", ["-l"], OptionLayer::new())?;
//!
//! // Scalar context: captured stdout as one (chomped) string.
//! let listing = sh.call("ll", CallContext::Scalar, [Arg::from("/tmp")])?;
//!
//! // List context: records split on the input record separator.
//! let hosts = sh.make("cat")?.read_lines([Arg::from("/etc/hosts")])?;
//! # let _ = (listing, hosts);
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Principles
//!
//! - **No shell interpretation**: argv-style execution, arguments verbatim
//! - **Explicit context**: `run`/`read`/`read_lines` pick the result shape
//! - **Layered options**: later layers win, presence-sensitive keys keep
//!   an explicit null distinct from never-set
//! - **Advisory vs fatal**: misconfiguration that can be survived is a
//!   warning through the [`Reporter`]; contradictions and stderr
//!   violations are hard errors
//! - **Fresh state per call**: callables are immutable; nothing leaks
//!   between invocations
//!
//! ## Platform Support
//!
//! Unix only (Linux, macOS). Exit dispositions are reported in terms of
//! exit codes and signals, which Windows does not model.

#[cfg(windows)]
compile_error!(
    "proc_call does not support Windows. \
     Process outcomes are modeled as Unix exit codes and signals; \
     there is no Windows equivalent for signal dispositions."
);

mod callable;
mod classify;
mod error;
mod executor;
mod invocation;
mod options;
mod outcome;
mod records;
mod redirect;
mod shell;
mod spawn;

// Public API
pub use callable::Callable;
pub use classify::{Reporter, TracingSink, WarningMode, WarningSink};
pub use error::{Advisory, CallError, ConfigError};
pub use executor::CallResult;
pub use invocation::{Arg, CallContext, Invocation};
pub use options::{
    AllowedExits, OptionLayer, OptionValue, Presence, ResolvedOptions, ShowCmd, DEFAULT_IRS,
};
pub use outcome::{ExecutionOutcome, ExitDisposition};
pub use redirect::{
    InputTarget, OutputTarget, RecordConsumer, RecordProducer, SharedBuffer, SharedRecords,
    SharedWriter,
};
pub use shell::Shell;
pub use spawn::{SpawnSpec, Spawner, StdinSpec, StreamSpec, SystemSpawner};
