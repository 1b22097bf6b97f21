//! Option layers and resolution.
//!
//! Configuration arrives as ordered [`OptionLayer`]s: Callable defaults first,
//! then inline fragments from the call site. [`ResolvedOptions::merge`] folds
//! them left to right (later layers win per key) into one immutable
//! [`ResolvedOptions`], accumulating advisories for unknown keys and
//! malformed values and rejecting contradictory combinations outright.
//!
//! The `stdout`, `stderr`, and `irs` keys are presence-sensitive: an explicit
//! null is a different state than never having set the key, so they resolve
//! to a tri-state [`Presence`] rather than a plain `Option`.

use crate::error::{Advisory, ConfigError};
use crate::redirect::{InputTarget, OutputTarget, SharedWriter};
use std::collections::BTreeSet;
use std::fmt;

/// Default input record separator.
pub const DEFAULT_IRS: &str = "\n";

/// Tri-state for presence-sensitive option keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence<T> {
    /// The key was never set in any layer.
    Unset,
    /// The key was explicitly set to null.
    Null,
    /// The key was set to a value.
    Value(T),
}

impl<T> Default for Presence<T> {
    fn default() -> Self {
        Presence::Unset
    }
}

impl<T> Presence<T> {
    /// True unless the key is [`Presence::Unset`].
    ///
    /// Presence is what matters for the `stdout`/`stderr` keys: an explicit
    /// null still diverts capture and forces the exit-code return.
    pub fn is_present(&self) -> bool {
        !matches!(self, Presence::Unset)
    }

    /// The value, if one was set.
    pub fn value(&self) -> Option<&T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Allowed exit codes for a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedExits {
    /// Any exit code is acceptable.
    Any,
    /// Only the listed codes are acceptable.
    Codes(BTreeSet<i32>),
}

impl AllowedExits {
    pub fn contains(&self, code: i32) -> bool {
        match self {
            AllowedExits::Any => true,
            AllowedExits::Codes(codes) => codes.contains(&code),
        }
    }
}

impl Default for AllowedExits {
    /// Only exit code 0 is allowed by default.
    fn default() -> Self {
        AllowedExits::Codes(BTreeSet::from([0]))
    }
}

impl fmt::Display for AllowedExits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowedExits::Any => f.write_str("any"),
            AllowedExits::Codes(codes) => {
                let mut first = true;
                for code in codes {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(f, "{code}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Destination for `show_cmd` diagnostics.
#[derive(Clone, Default)]
pub enum ShowCmd {
    /// Do not echo commands (default).
    #[default]
    Off,
    /// Echo to the caller's standard error.
    Stderr,
    /// Echo to a caller-supplied writer.
    Writer(SharedWriter),
}

impl fmt::Debug for ShowCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShowCmd::Off => f.write_str("Off"),
            ShowCmd::Stderr => f.write_str("Stderr"),
            ShowCmd::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// A value bound to an option key in a layer.
#[derive(Clone)]
pub enum OptionValue {
    Bool(bool),
    Int(i32),
    IntSet(Vec<i32>),
    Str(String),
    /// The "any exit code" sentinel for `allow_exit`.
    Any,
    /// Explicit null: discard for redirect keys, slurp mode for `irs`.
    Null,
    Input(InputTarget),
    Output(OutputTarget),
    Writer(SharedWriter),
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            OptionValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            OptionValue::IntSet(v) => f.debug_tuple("IntSet").field(v).finish(),
            OptionValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            OptionValue::Any => f.write_str("Any"),
            OptionValue::Null => f.write_str("Null"),
            OptionValue::Input(t) => f.debug_tuple("Input").field(t).finish(),
            OptionValue::Output(t) => f.debug_tuple("Output").field(t).finish(),
            OptionValue::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i32> for OptionValue {
    fn from(i: i32) -> Self {
        OptionValue::Int(i)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}

impl From<Vec<i32>> for OptionValue {
    fn from(v: Vec<i32>) -> Self {
        OptionValue::IntSet(v)
    }
}

/// One ordered layer of option settings.
///
/// Layers are built with the typed setters below, or with [`OptionLayer::set`]
/// for keys coming from untyped configuration (which is also how unknown keys
/// enter the system). Entries keep insertion order; within one layer a later
/// entry for the same key wins, the same as across layers.
#[derive(Debug, Clone, Default)]
pub struct OptionLayer {
    entries: Vec<(String, OptionValue)>,
}

impl OptionLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind `key` to `value`. Unknown keys are accepted here and flagged
    /// with an advisory at merge time.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Allow the listed exit codes (replaces the default `{0}`).
    pub fn allow_exit(self, codes: impl IntoIterator<Item = i32>) -> Self {
        self.set("allow_exit", OptionValue::IntSet(codes.into_iter().collect()))
    }

    /// Allow any exit code.
    pub fn allow_any_exit(self) -> Self {
        self.set("allow_exit", OptionValue::Any)
    }

    /// Set the input record separator.
    pub fn irs(self, sep: impl Into<String>) -> Self {
        self.set("irs", OptionValue::Str(sep.into()))
    }

    /// Slurp mode: no record separator, output is one record.
    pub fn irs_null(self) -> Self {
        self.set("irs", OptionValue::Null)
    }

    pub fn chomp(self, on: bool) -> Self {
        self.set("chomp", on)
    }

    /// Capture stdout and stderr together.
    pub fn both(self, on: bool) -> Self {
        self.set("both", on)
    }

    pub fn stdin(self, target: InputTarget) -> Self {
        self.set("stdin", OptionValue::Input(target))
    }

    /// Bind stdin to the null device.
    pub fn stdin_null(self) -> Self {
        self.set("stdin", OptionValue::Null)
    }

    pub fn stdout(self, target: OutputTarget) -> Self {
        self.set("stdout", OptionValue::Output(target))
    }

    /// Discard stdout. The key is still present, so the exit-code return
    /// rule applies.
    pub fn stdout_null(self) -> Self {
        self.set("stdout", OptionValue::Null)
    }

    pub fn stderr(self, target: OutputTarget) -> Self {
        self.set("stderr", OptionValue::Output(target))
    }

    pub fn stderr_null(self) -> Self {
        self.set("stderr", OptionValue::Null)
    }

    pub fn fail_on_stderr(self, on: bool) -> Self {
        self.set("fail_on_stderr", on)
    }

    /// Echo each resolved command line to the caller's stderr before spawning.
    pub fn show_cmd(self, on: bool) -> Self {
        self.set("show_cmd", on)
    }

    /// Echo each resolved command line to a caller-supplied writer.
    pub fn show_cmd_to(self, sink: SharedWriter) -> Self {
        self.set("show_cmd", OptionValue::Writer(sink))
    }

    pub fn append_stdout(self, on: bool) -> Self {
        self.set("append_stdout", on)
    }

    pub fn append_stderr(self, on: bool) -> Self {
        self.set("append_stderr", on)
    }

    pub(crate) fn entries(&self) -> &[(String, OptionValue)] {
        &self.entries
    }
}

/// The immutable result of merging option layers.
#[derive(Debug, Clone, Default)]
pub struct ResolvedOptions {
    pub allow_exit: AllowedExits,
    pub irs: Presence<String>,
    pub chomp: bool,
    pub both: bool,
    pub stdin: Option<InputTarget>,
    pub stdout: Presence<OutputTarget>,
    pub stderr: Presence<OutputTarget>,
    pub fail_on_stderr: bool,
    pub show_cmd: ShowCmd,
    pub binmode_stdin: bool,
    pub binmode_stdout: bool,
    pub binmode_stderr: bool,
    pub append_stdout: bool,
    pub append_stderr: bool,
}

impl ResolvedOptions {
    /// Merge ordered layers, left to right, later layers overriding earlier
    /// ones per key.
    ///
    /// Never fails on unknown keys or malformed values; those become
    /// advisories and the previous value for the key stands. Contradictory
    /// key combinations are fatal.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ConflictingOptions`] when `both` is combined with a
    /// `stdout`/`stderr` target, or `fail_on_stderr` with a `stderr` target
    /// or `both`.
    pub fn merge(layers: &[OptionLayer]) -> Result<(Self, Vec<Advisory>), ConfigError> {
        let mut resolved = ResolvedOptions::default();
        let mut advisories = Vec::new();

        for layer in layers {
            for (key, value) in layer.entries() {
                resolved.apply(key, value, &mut advisories);
            }
        }

        resolved.check_conflicts()?;
        Ok((resolved, advisories))
    }

    /// The effective record separator: `None` means slurp mode.
    pub fn effective_irs(&self) -> Option<&str> {
        match &self.irs {
            Presence::Unset => Some(DEFAULT_IRS),
            Presence::Null => None,
            Presence::Value(sep) => Some(sep.as_str()),
        }
    }

    fn apply(&mut self, key: &str, value: &OptionValue, advisories: &mut Vec<Advisory>) {
        match key {
            "allow_exit" => match value {
                OptionValue::Int(code) => {
                    self.allow_exit = AllowedExits::Codes(BTreeSet::from([*code]));
                }
                OptionValue::IntSet(codes) if codes.is_empty() => {
                    advisories.push(malformed(key, "empty exit-code set"));
                }
                OptionValue::IntSet(codes) => {
                    self.allow_exit = AllowedExits::Codes(codes.iter().copied().collect());
                }
                OptionValue::Any => self.allow_exit = AllowedExits::Any,
                OptionValue::Str(s) if s == "any" => self.allow_exit = AllowedExits::Any,
                _ => advisories.push(malformed(
                    key,
                    "expected an exit code, a set of codes, or \"any\"",
                )),
            },
            "irs" => match value {
                OptionValue::Str(sep) => self.irs = Presence::Value(sep.clone()),
                OptionValue::Null => self.irs = Presence::Null,
                _ => advisories.push(malformed(key, "expected a separator string or null")),
            },
            "chomp" => apply_bool(value, &mut self.chomp, key, advisories),
            "both" => apply_bool(value, &mut self.both, key, advisories),
            "fail_on_stderr" => apply_bool(value, &mut self.fail_on_stderr, key, advisories),
            "stdin" => match value {
                OptionValue::Input(target) => self.stdin = Some(target.clone()),
                OptionValue::Null => self.stdin = Some(InputTarget::Null),
                OptionValue::Str(path) => self.stdin = Some(InputTarget::File(path.into())),
                OptionValue::Output(_) => {
                    advisories.push(malformed(key, "output target bound to stdin"));
                }
                _ => advisories.push(malformed(
                    key,
                    "expected an input target, a filename, or null",
                )),
            },
            "stdout" => apply_output(value, &mut self.stdout, key, advisories),
            "stderr" => apply_output(value, &mut self.stderr, key, advisories),
            "show_cmd" => match value {
                OptionValue::Bool(true) => self.show_cmd = ShowCmd::Stderr,
                OptionValue::Bool(false) => self.show_cmd = ShowCmd::Off,
                OptionValue::Writer(w) => self.show_cmd = ShowCmd::Writer(w.clone()),
                _ => advisories.push(malformed(key, "expected a bool or a writer")),
            },
            "binmode_stdin" => apply_bool(value, &mut self.binmode_stdin, key, advisories),
            "binmode_stdout" => apply_bool(value, &mut self.binmode_stdout, key, advisories),
            "binmode_stderr" => apply_bool(value, &mut self.binmode_stderr, key, advisories),
            "append_stdout" => apply_bool(value, &mut self.append_stdout, key, advisories),
            "append_stderr" => apply_bool(value, &mut self.append_stderr, key, advisories),
            "return_if_system_error" => match value {
                // Forced on: launch failures must flow through the outcome
                // for classification.
                OptionValue::Bool(false) | OptionValue::Int(0) => {
                    tracing::debug!("ignoring return_if_system_error=false; the option is forced on");
                }
                OptionValue::Bool(true) | OptionValue::Int(_) => {}
                _ => advisories.push(malformed(key, "expected a bool")),
            },
            _ => advisories.push(Advisory::UnknownOption {
                key: key.to_string(),
            }),
        }
    }

    fn check_conflicts(&self) -> Result<(), ConfigError> {
        if self.both {
            if self.stdout.is_present() {
                return Err(ConfigError::ConflictingOptions {
                    first: "both",
                    second: "stdout",
                });
            }
            if self.stderr.is_present() {
                return Err(ConfigError::ConflictingOptions {
                    first: "both",
                    second: "stderr",
                });
            }
        }
        if self.fail_on_stderr {
            if self.stderr.is_present() {
                return Err(ConfigError::ConflictingOptions {
                    first: "fail_on_stderr",
                    second: "stderr",
                });
            }
            if self.both {
                return Err(ConfigError::ConflictingOptions {
                    first: "fail_on_stderr",
                    second: "both",
                });
            }
        }
        Ok(())
    }
}

fn malformed(key: &str, reason: &str) -> Advisory {
    Advisory::MalformedOption {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn apply_bool(value: &OptionValue, slot: &mut bool, key: &str, advisories: &mut Vec<Advisory>) {
    match value {
        OptionValue::Bool(b) => *slot = *b,
        // Truthy integers are accepted for layers written against the
        // untyped surface.
        OptionValue::Int(i) => *slot = *i != 0,
        _ => advisories.push(malformed(key, "expected a bool")),
    }
}

fn apply_output(
    value: &OptionValue,
    slot: &mut Presence<OutputTarget>,
    key: &str,
    advisories: &mut Vec<Advisory>,
) {
    match value {
        OptionValue::Output(target) => *slot = Presence::Value(target.clone()),
        OptionValue::Null => *slot = Presence::Null,
        OptionValue::Str(path) => *slot = Presence::Value(OutputTarget::File(path.into())),
        OptionValue::Input(_) => {
            advisories.push(malformed(key, "input target bound to an output stream"));
        }
        _ => advisories.push(malformed(
            key,
            "expected an output target, a filename, or null",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::SharedBuffer;
    use std::sync::{Arc, Mutex};

    fn buffer() -> SharedBuffer {
        Arc::new(Mutex::new(String::new()))
    }

    #[test]
    fn test_merge_precedence_later_wins() {
        let layers = [
            OptionLayer::new().set("allow_exit", 1).chomp(false),
            OptionLayer::new().set("allow_exit", 2).both(true),
        ];
        let (resolved, advisories) = ResolvedOptions::merge(&layers).unwrap();

        assert!(resolved.allow_exit.contains(2));
        assert!(!resolved.allow_exit.contains(1));
        assert!(!resolved.chomp);
        assert!(resolved.both);
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_merge_empty_layers_gives_defaults() {
        let (resolved, advisories) = ResolvedOptions::merge(&[]).unwrap();

        assert!(resolved.allow_exit.contains(0));
        assert!(!resolved.allow_exit.contains(1));
        assert_eq!(resolved.effective_irs(), Some("\n"));
        assert!(!resolved.stdout.is_present());
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_explicit_null_survives_later_layer() {
        let layers = [
            OptionLayer::new().stdout_null(),
            OptionLayer::new().chomp(true),
        ];
        let (resolved, _) = ResolvedOptions::merge(&layers).unwrap();

        // A later layer that never mentions stdout must not erase the null.
        assert!(matches!(resolved.stdout, Presence::Null));
        assert!(resolved.stdout.is_present());
    }

    #[test]
    fn test_null_distinguishable_from_unset() {
        let (null_set, _) =
            ResolvedOptions::merge(&[OptionLayer::new().stdout_null()]).unwrap();
        let (never_set, _) = ResolvedOptions::merge(&[OptionLayer::new()]).unwrap();

        assert!(null_set.stdout.is_present());
        assert!(!never_set.stdout.is_present());
    }

    #[test]
    fn test_later_layer_overrides_null_with_value() {
        let layers = [
            OptionLayer::new().stdout_null(),
            OptionLayer::new().stdout(OutputTarget::Buffer(buffer())),
        ];
        let (resolved, _) = ResolvedOptions::merge(&layers).unwrap();

        assert!(matches!(resolved.stdout, Presence::Value(OutputTarget::Buffer(_))));
    }

    #[test]
    fn test_unknown_key_is_advisory() {
        let layers = [OptionLayer::new().set("no_such_option", true)];
        let (_, advisories) = ResolvedOptions::merge(&layers).unwrap();

        assert_eq!(
            advisories,
            vec![Advisory::UnknownOption {
                key: "no_such_option".to_string()
            }]
        );
    }

    #[test]
    fn test_malformed_allow_exit_is_advisory_and_keeps_default() {
        let layers = [OptionLayer::new().set("allow_exit", "lots")];
        let (resolved, advisories) = ResolvedOptions::merge(&layers).unwrap();

        assert!(matches!(
            advisories.as_slice(),
            [Advisory::MalformedOption { key, .. }] if key == "allow_exit"
        ));
        assert!(resolved.allow_exit.contains(0));
    }

    #[test]
    fn test_empty_allow_exit_set_is_advisory() {
        let layers = [OptionLayer::new().allow_exit([])];
        let (resolved, advisories) = ResolvedOptions::merge(&layers).unwrap();

        assert_eq!(advisories.len(), 1);
        assert!(resolved.allow_exit.contains(0));
    }

    #[test]
    fn test_allow_exit_forms() {
        let (single, _) =
            ResolvedOptions::merge(&[OptionLayer::new().set("allow_exit", 5)]).unwrap();
        assert!(single.allow_exit.contains(5));
        assert!(!single.allow_exit.contains(0));

        let (set, _) =
            ResolvedOptions::merge(&[OptionLayer::new().allow_exit([1, 2, 3])]).unwrap();
        assert!(set.allow_exit.contains(2));

        let (any, _) =
            ResolvedOptions::merge(&[OptionLayer::new().allow_any_exit()]).unwrap();
        assert!(any.allow_exit.contains(137));

        let (any_str, _) =
            ResolvedOptions::merge(&[OptionLayer::new().set("allow_exit", "any")]).unwrap();
        assert!(any_str.allow_exit.contains(-1));
    }

    #[test]
    fn test_both_conflicts_with_stdout_target() {
        let layers = [OptionLayer::new()
            .both(true)
            .stdout(OutputTarget::Buffer(buffer()))];
        let result = ResolvedOptions::merge(&layers);

        assert!(matches!(
            result,
            Err(ConfigError::ConflictingOptions {
                first: "both",
                second: "stdout"
            })
        ));
    }

    #[test]
    fn test_both_conflicts_with_stderr_null() {
        let layers = [OptionLayer::new().both(true).stderr_null()];
        let result = ResolvedOptions::merge(&layers);

        assert!(matches!(result, Err(ConfigError::ConflictingOptions { .. })));
    }

    #[test]
    fn test_fail_on_stderr_conflicts() {
        let with_target = [OptionLayer::new()
            .fail_on_stderr(true)
            .stderr(OutputTarget::Buffer(buffer()))];
        assert!(matches!(
            ResolvedOptions::merge(&with_target),
            Err(ConfigError::ConflictingOptions {
                first: "fail_on_stderr",
                second: "stderr"
            })
        ));

        let with_both = [OptionLayer::new().fail_on_stderr(true).both(true)];
        assert!(matches!(
            ResolvedOptions::merge(&with_both),
            Err(ConfigError::ConflictingOptions {
                first: "fail_on_stderr",
                second: "both"
            })
        ));
    }

    #[test]
    fn test_conflict_across_layers() {
        // The conflict only exists after merging; it must still be caught.
        let layers = [
            OptionLayer::new().both(true),
            OptionLayer::new().stdout_null(),
        ];
        assert!(matches!(
            ResolvedOptions::merge(&layers),
            Err(ConfigError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn test_return_if_system_error_cannot_be_disabled() {
        let layers = [OptionLayer::new().set("return_if_system_error", false)];
        let (_, advisories) = ResolvedOptions::merge(&layers).unwrap();

        // Ignored with a debug log, not an advisory.
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_irs_tri_state() {
        let (unset, _) = ResolvedOptions::merge(&[]).unwrap();
        assert_eq!(unset.effective_irs(), Some("\n"));

        let (dash, _) = ResolvedOptions::merge(&[OptionLayer::new().irs("-")]).unwrap();
        assert_eq!(dash.effective_irs(), Some("-"));

        let (slurp, _) = ResolvedOptions::merge(&[OptionLayer::new().irs_null()]).unwrap();
        assert_eq!(slurp.effective_irs(), None);
    }

    #[test]
    fn test_truthy_int_accepted_for_bool_keys() {
        let (resolved, advisories) =
            ResolvedOptions::merge(&[OptionLayer::new().set("chomp", 1)]).unwrap();
        assert!(resolved.chomp);
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_filename_string_becomes_file_target() {
        let (resolved, _) =
            ResolvedOptions::merge(&[OptionLayer::new().set("stdout", "/tmp/out.txt")]).unwrap();
        assert!(matches!(
            resolved.stdout,
            Presence::Value(OutputTarget::File(ref p)) if p == std::path::Path::new("/tmp/out.txt")
        ));
    }

    #[test]
    fn test_allowed_exits_display() {
        assert_eq!(AllowedExits::Any.to_string(), "any");
        assert_eq!(
            AllowedExits::Codes([0, 3].into_iter().collect()).to_string(),
            "0, 3"
        );
    }
}
