use std::sync::Arc;

use crate::api::ArgSpec;
use crate::codes;
use crate::errors::{CommandError, ConfigError};
use crate::interface::UserInterface;

type SyntheticHook = Arc<dyn Fn(&dyn UserInterface) -> i32>;
type ArgvRewrite = Arc<dyn Fn(Vec<String>) -> Result<Vec<String>, CommandError>>;

/// A flag unconnected to any declared parameter, injected by an extension.
#[derive(Clone)]
pub struct SyntheticFlag {
    pub(crate) long: String,
    pub(crate) short: Option<char>,
    pub(crate) help: Option<String>,
    pub(crate) hook: SyntheticHook,
}

impl SyntheticFlag {
    /// Create a synthetic flag with the given long spelling (without dashes).
    /// The hook runs when the flag is present on a parsed command line; its
    /// return value becomes the process exit code.
    pub fn new(long: impl Into<String>, hook: impl Fn(&dyn UserInterface) -> i32 + 'static) -> Self {
        Self {
            long: long.into(),
            short: None,
            help: None,
            hook: Arc::new(hook),
        }
    }

    /// Add a single-character spelling.
    pub fn short(mut self, short: char) -> Self {
        self.short.replace(short);
        self
    }

    /// Document the help message for this flag.
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.help.replace(description.into());
        self
    }
}

/// The mutable state extensions operate on, rebuilt freshly before every
/// parser construction.
///
/// Because the state never survives a build, applying the same extension on
/// every rebuild is naturally idempotent; within one build, synthetic flags
/// replace earlier synthetic flags of the same long spelling rather than
/// duplicating them.
pub struct BuildState {
    pub(crate) known: Vec<String>,
    pub(crate) overrides: Vec<(String, ArgSpec)>,
    pub(crate) allow_abbrev: bool,
    pub(crate) synthetics: Vec<SyntheticFlag>,
    pub(crate) rewrites: Vec<ArgvRewrite>,
}

impl BuildState {
    pub(crate) fn new(known: Vec<String>) -> Self {
        Self {
            known,
            overrides: Vec::default(),
            allow_abbrev: true,
            synthetics: Vec::default(),
            rewrites: Vec::default(),
        }
    }

    /// Replace the argument spec of a declared parameter.
    pub fn override_spec(
        &mut self,
        name: impl Into<String>,
        spec: ArgSpec,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if !self.known.iter().any(|known| known == &name) {
            return Err(ConfigError(format!(
                "cannot configure unknown parameter '{name}'."
            )));
        }
        self.overrides.push((name, spec));
        Ok(())
    }

    /// Toggle unambiguous-prefix matching of long flags.
    pub fn allow_abbrev(&mut self, allow: bool) {
        self.allow_abbrev = allow;
    }

    /// Add a synthetic flag. A flag with the same long spelling replaces any
    /// earlier one.
    pub fn add_flag(&mut self, flag: SyntheticFlag) {
        self.synthetics.retain(|existing| existing.long != flag.long);
        self.synthetics.push(flag);
    }

    /// Install an argv rewrite, run before parsing.
    pub fn rewrite_argv(
        &mut self,
        rewrite: impl Fn(Vec<String>) -> Result<Vec<String>, CommandError> + 'static,
    ) {
        self.rewrites.push(Arc::new(rewrite));
    }

    pub(crate) fn preprocess(&self, argv: &[String]) -> Result<Vec<String>, CommandError> {
        let mut argv = argv.to_vec();
        for rewrite in &self.rewrites {
            argv = rewrite(argv)?;
        }
        Ok(argv)
    }
}

/// An external collaborator attached at registration time.
///
/// Each extension is given the build state before parser construction and may
/// rewrite the argument map, inject parser-level configuration, or add
/// synthetic flags unconnected to any parameter.
pub trait Extension {
    /// Apply this extension to the build state.
    fn apply(&self, state: &mut BuildState) -> Result<(), ConfigError>;
}

/// Adds a `--version` flag that prints the given text and exits 0.
///
/// ### Example
/// ```
/// use fncli::{Command, Signature, Version};
///
/// let command = Command::new("tool", Signature::new(), |_| Ok(None))
///     .extend(Version::new("0.1.0"))
///     .try_build()
///     .unwrap();
/// # let _ = command;
/// ```
pub struct Version {
    version: String,
}

impl Version {
    /// Create the extension with the text to print.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

impl Extension for Version {
    fn apply(&self, state: &mut BuildState) -> Result<(), ConfigError> {
        let version = self.version.clone();
        state.add_flag(
            SyntheticFlag::new("version", move |ui| {
                ui.print(version.clone());
                codes::SUCCESS
            })
            .help("show program's version number and exit"),
        );
        Ok(())
    }
}

/// Turns off unambiguous-prefix matching of long flags.
#[derive(Default)]
pub struct DisallowAbbrev {}

impl Extension for DisallowAbbrev {
    fn apply(&self, state: &mut BuildState) -> Result<(), ConfigError> {
        state.allow_abbrev(false);
        Ok(())
    }
}

/// File-based argument expansion: any token starting with the prefix
/// character is replaced by the lines of the named file, one token per line.
pub struct ArgsFile {
    prefix: char,
}

impl ArgsFile {
    /// Create the extension with the conventional `@` prefix.
    pub fn new() -> Self {
        Self { prefix: '@' }
    }

    /// Create the extension with a custom prefix character.
    pub fn with_prefix(prefix: char) -> Self {
        Self { prefix }
    }
}

impl Default for ArgsFile {
    fn default() -> Self {
        Self::new()
    }
}

impl Extension for ArgsFile {
    fn apply(&self, state: &mut BuildState) -> Result<(), ConfigError> {
        let prefix = self.prefix;
        state.rewrite_argv(move |argv| {
            let mut expanded = Vec::with_capacity(argv.len());
            for token in argv {
                // A bare prefix character is an ordinary token.
                let path = match token.strip_prefix(prefix) {
                    Some(path) if !path.is_empty() => path.to_string(),
                    _ => {
                        expanded.push(token);
                        continue;
                    }
                };
                let content = std::fs::read_to_string(&path).map_err(|error| {
                    CommandError::runtime(format!("cannot read arguments file '{path}': {error}"))
                })?;
                expanded.extend(content.lines().map(|line| line.to_string()));
            }
            Ok(expanded)
        });
        Ok(())
    }
}
