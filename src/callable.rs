//! Bound command values.
//!
//! A [`Callable`] is an immutable binding of a command name, fixed leading
//! arguments, and default option layers. Calling it builds a fresh
//! invocation each time, so no state leaks between calls and a cloned
//! callable behaves identically to its original.
//!
//! Because the result shape depends on the caller's context, the context is
//! chosen by the entry point: [`run`](Callable::run) discards output,
//! [`read`](Callable::read) wants one value, [`read_lines`](Callable::read_lines)
//! wants records. All three accept trailing [`Arg`]s, including inline
//! option fragments.

use crate::classify::Reporter;
use crate::error::CallError;
use crate::executor::{execute, CallResult};
use crate::invocation::{build, Arg, CallContext};
use crate::options::OptionLayer;
use crate::spawn::{Spawner, SystemSpawner};
use std::fmt;
use std::sync::Arc;

/// An immutable, callable binding of a command.
///
/// Construction captures everything; each call resolves options fresh from
/// the captured defaults plus any inline fragments.
#[derive(Clone)]
pub struct Callable {
    command: String,
    base_args: Vec<String>,
    defaults: Vec<OptionLayer>,
    spawner: Arc<dyn Spawner>,
    reporter: Reporter,
}

impl Callable {
    /// Bind `command` with no fixed arguments and no default options.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            base_args: Vec::new(),
            defaults: Vec::new(),
            spawner: Arc::new(SystemSpawner),
            reporter: Reporter::default(),
        }
    }

    /// Append fixed leading arguments, passed before any call-site arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a default option layer. Layers added later override earlier
    /// ones; inline call-site fragments override them all.
    pub fn with_defaults(mut self, layer: OptionLayer) -> Self {
        if !layer.is_empty() {
            self.defaults.push(layer);
        }
        self
    }

    /// Replace the process primitive. Tests use this to script outcomes.
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Replace the warning policy.
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Call in discarded context: output passes through unless redirected.
    pub fn run(&self, args: impl IntoIterator<Item = Arg>) -> Result<CallResult, CallError> {
        self.invoke(CallContext::Discarded, args)
    }

    /// Call in scalar context: captured output comes back as one string
    /// (or the exit code, when a `stdout` key is present).
    pub fn read(&self, args: impl IntoIterator<Item = Arg>) -> Result<CallResult, CallError> {
        self.invoke(CallContext::Scalar, args)
    }

    /// Call in list context: captured stdout comes back split into records.
    pub fn read_lines(
        &self,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<CallResult, CallError> {
        self.invoke(CallContext::List, args)
    }

    /// Call with an explicit context.
    pub fn invoke(
        &self,
        context: CallContext,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<CallResult, CallError> {
        let mut raw: Vec<Arg> = self.base_args.iter().map(|a| Arg::from(a.clone())).collect();
        raw.extend(args);

        let (invocation, advisories) = build(&self.command, &self.defaults, raw, context)?;
        self.reporter.report_all(advisories)?;
        execute(&invocation, self.spawner.as_ref(), &self.reporter)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("command", &self.command)
            .field("base_args", &self.base_args)
            .field("defaults", &self.defaults)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::WarningMode;
    use crate::error::Advisory;
    use crate::spawn::testing::FakeSpawner;

    fn callable(spawner: Arc<FakeSpawner>) -> Callable {
        Callable::new("cmd").with_spawner(spawner)
    }

    #[test]
    fn test_read_returns_scalar() {
        let spawner = Arc::new(FakeSpawner::exited("out\n", "", 0));
        let result = callable(spawner).read([]).unwrap();

        assert_eq!(result, CallResult::Scalar("out\n".to_string()));
    }

    #[test]
    fn test_base_args_precede_call_args() {
        let spawner = Arc::new(FakeSpawner::exited("", "", 0));
        let cmd = callable(spawner.clone()).with_args(["-l", "-a"]);
        cmd.run([Arg::from("dir")]).unwrap();

        assert_eq!(
            spawner.last_spec().unwrap().args,
            vec!["-l", "-a", "dir"]
        );
    }

    #[test]
    fn test_defaults_overridden_by_inline_fragment() {
        let spawner = Arc::new(FakeSpawner::exited("a\nb\n", "", 7));
        let cmd = callable(spawner)
            .with_defaults(OptionLayer::new().allow_exit([7]).chomp(false));
        let result = cmd
            .read_lines([Arg::from(OptionLayer::new().chomp(true))])
            .unwrap();

        assert_eq!(result.into_records().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_clone_is_independent_and_identical() {
        let spawner = Arc::new(FakeSpawner::exited("x\n", "", 0));
        let original = callable(spawner.clone()).with_defaults(OptionLayer::new().chomp(true));
        let cloned = original.clone();

        let a = original.read([]).unwrap();
        let b = cloned.read([]).unwrap();

        assert_eq!(a, b);
        assert_eq!(spawner.spec_count(), 2);
    }

    #[test]
    fn test_calls_do_not_leak_state() {
        let spawner = Arc::new(FakeSpawner::exited("v\n", "", 0));
        let cmd = callable(spawner.clone());

        // An inline fragment applies to its call only.
        cmd.read([Arg::from(OptionLayer::new().stdout_null())]).unwrap();
        let second = cmd.read([]).unwrap();

        assert_eq!(second, CallResult::Scalar("v\n".to_string()));
    }

    #[test]
    fn test_build_advisories_flow_through_reporter() {
        let spawner = Arc::new(FakeSpawner::exited("", "", 0));
        let cmd = callable(spawner.clone())
            .with_reporter(Reporter::tracing(WarningMode::Fatal));
        let result = cmd.run([Arg::from(OptionLayer::new().set("bogus", true))]);

        assert!(matches!(
            result,
            Err(CallError::Escalated(Advisory::UnknownOption { ref key })) if key == "bogus"
        ));
        // Escalation happens before any spawn.
        assert_eq!(spawner.spec_count(), 0);
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = Callable::new("").run([]);
        assert!(matches!(result, Err(CallError::Config(_))));
    }
}
