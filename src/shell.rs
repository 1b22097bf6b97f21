//! The command registry.
//!
//! A [`Shell`] holds shared option defaults, a spawner, and a warning
//! policy, and hands out [`Callable`]s that carry them. Commands can be
//! registered under an alias with fixed arguments and per-alias options, or
//! created ad hoc with [`make`](Shell::make); [`call`](Shell::call) resolves
//! an alias if one is registered and otherwise treats the name as the
//! command itself.
//!
//! A few names are reserved for the registry's own surface and can never be
//! aliases or ad-hoc commands.

use crate::callable::Callable;
use crate::classify::Reporter;
use crate::error::{CallError, ConfigError};
use crate::executor::CallResult;
use crate::invocation::{Arg, CallContext};
use crate::options::OptionLayer;
use crate::spawn::{Spawner, SystemSpawner};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Names the registry keeps for itself.
const RESERVED_NAMES: &[&str] = &["new", "import", "option_defaults"];

/// One registered alias.
#[derive(Debug, Clone)]
struct AliasEntry {
    command: String,
    base_args: Vec<String>,
    defaults: Vec<OptionLayer>,
}

/// A registry of commands sharing option defaults and a warning policy.
#[derive(Clone)]
pub struct Shell {
    defaults: Vec<OptionLayer>,
    aliases: BTreeMap<String, AliasEntry>,
    spawner: Arc<dyn Spawner>,
    reporter: Reporter,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            defaults: Vec::new(),
            aliases: BTreeMap::new(),
            spawner: Arc::new(SystemSpawner),
            reporter: Reporter::default(),
        }
    }

    /// Append a shell-wide default option layer. Per-alias layers and inline
    /// fragments both override it.
    pub fn with_defaults(mut self, layer: OptionLayer) -> Self {
        if !layer.is_empty() {
            self.defaults.push(layer);
        }
        self
    }

    /// Replace the process primitive for every callable this shell creates.
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Replace the warning policy for every callable this shell creates.
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// The shell-wide default layers, in application order.
    pub fn option_defaults(&self) -> &[OptionLayer] {
        &self.defaults
    }

    /// Register `name` as an alias for `command` with fixed leading
    /// arguments and an alias-local option layer. Re-registering a name
    /// replaces the previous entry.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ReservedName`] for registry-surface names,
    /// [`ConfigError::EmptyCommand`] for an empty name or command.
    pub fn alias(
        &mut self,
        name: impl Into<String>,
        command: impl Into<String>,
        base_args: impl IntoIterator<Item = impl Into<String>>,
        defaults: OptionLayer,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        let command = command.into();
        check_name(&name)?;
        if command.is_empty() {
            return Err(ConfigError::EmptyCommand);
        }

        let layers = if defaults.is_empty() {
            Vec::new()
        } else {
            vec![defaults]
        };
        self.aliases.insert(
            name,
            AliasEntry {
                command,
                base_args: base_args.into_iter().map(Into::into).collect(),
                defaults: layers,
            },
        );
        Ok(())
    }

    /// Bulk-register bare command names: each name becomes an alias for
    /// itself, with no fixed arguments and no extra options.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ReservedName`] / [`ConfigError::EmptyCommand`] as for
    /// [`alias`](Shell::alias); names before the offending one stay
    /// registered.
    pub fn commands(
        &mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<(), ConfigError> {
        for name in names {
            let name = name.into();
            let command = name.clone();
            self.alias(name, command, Vec::<String>::new(), OptionLayer::new())?;
        }
        Ok(())
    }

    /// The registered names, in sorted order.
    pub fn registered(&self) -> Vec<&str> {
        self.aliases.keys().map(String::as_str).collect()
    }

    /// Create a callable for `command`, carrying the shell's defaults,
    /// spawner, and reporter. The callable is independent of the shell
    /// afterwards.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ReservedName`] for registry-surface names.
    pub fn make(&self, command: impl Into<String>) -> Result<Callable, ConfigError> {
        let command = command.into();
        check_name(&command)?;

        match self.aliases.get(&command) {
            Some(entry) => Ok(self.build_callable(entry)),
            None => {
                if command.is_empty() {
                    return Err(ConfigError::EmptyCommand);
                }
                let entry = AliasEntry {
                    command,
                    base_args: Vec::new(),
                    defaults: Vec::new(),
                };
                Ok(self.build_callable(&entry))
            }
        }
    }

    /// Invoke `name` in the given context. An alias resolves to its
    /// registered command; any other name is run as a command directly.
    pub fn call(
        &self,
        name: &str,
        context: CallContext,
        args: impl IntoIterator<Item = Arg>,
    ) -> Result<CallResult, CallError> {
        let callable = self.make(name)?;
        callable.invoke(context, args)
    }

    /// Materialize every registered alias into `target`, name to callable.
    /// Existing entries under the same names are replaced.
    pub fn install_into(&self, target: &mut HashMap<String, Callable>) {
        for (name, entry) in &self.aliases {
            target.insert(name.clone(), self.build_callable(entry));
        }
    }

    fn build_callable(&self, entry: &AliasEntry) -> Callable {
        let mut callable = Callable::new(entry.command.clone())
            .with_args(entry.base_args.iter().cloned())
            .with_spawner(self.spawner.clone())
            .with_reporter(self.reporter.clone());
        for layer in &self.defaults {
            callable = callable.with_defaults(layer.clone());
        }
        for layer in &entry.defaults {
            callable = callable.with_defaults(layer.clone());
        }
        callable
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("defaults", &self.defaults)
            .field("aliases", &self.aliases)
            .field("reporter", &self.reporter)
            .finish_non_exhaustive()
    }
}

fn check_name(name: &str) -> Result<(), ConfigError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(ConfigError::ReservedName {
            name: name.to_string(),
        });
    }
    if name.is_empty() {
        return Err(ConfigError::EmptyCommand);
    }
    Ok(())
}
