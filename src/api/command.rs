use std::sync::Arc;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::api::delegate::Dispatch;
use crate::api::spec::{ArgSpec, CompletionContext, CompletionValidator};
use crate::builder::{assemble, Bindings, BuildMode, BuiltParser};
use crate::codes;
use crate::complete::{prefix_validator, CompletionBackend, EnvBackend};
use crate::errors::{CommandError, ConfigError, Handled};
use crate::extension::{BuildState, Extension};
use crate::interface::{ConsoleInterface, UserInterface};
use crate::model::Signature;

/// The behavior requested of an invocation.
///
/// The mode is threaded explicitly through the whole delegation chain: an
/// outer help or completion request descends into whichever child command the
/// delegator selects, without any process-wide state.
#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    /// Parse, bind, and invoke the wrapped callable.
    Execute,
    /// Render help for the command the invocation resolves to.
    Help,
    /// Produce completion candidates for the given partial word.
    Complete(&'a str),
}

/// The terminal outcome of one `run`, before exit-code routing.
pub(crate) enum Flow {
    Value(Option<String>),
    Completions(Vec<String>),
    Exit(i32),
    Fault(CommandError),
}

type LeafFn = dyn Fn(&Bindings) -> Result<Option<String>, CommandError>;
type DelegateFn = dyn Fn(&Bindings) -> Result<Dispatch, CommandError>;
type ReturnProcessor = dyn Fn(Option<String>, &dyn UserInterface);
type ErrorHandler = dyn Fn(&CommandError, &dyn UserInterface) -> Handled;
type CommandCompleter = dyn Fn(&Bindings, &str) -> Option<Vec<String>>;

enum Body {
    Leaf(Box<LeafFn>),
    Delegator(Box<DelegateFn>),
}

enum Probe {
    Dispatched(crate::api::delegate::Delegation),
    NoMatch,
    Fault(CommandError),
}

fn default_return_value_processor(value: Option<String>, ui: &dyn UserInterface) {
    if let Some(value) = value {
        ui.print(value);
    }
}

fn default_error_handler(error: &CommandError, ui: &dyn UserInterface) -> Handled {
    match error {
        CommandError::Runtime(message) => {
            ui.print_error(format!("Error: {message}"));
            Handled::Exit(codes::FAILURE)
        }
        CommandError::NoMatchingDelegate => {
            ui.print_error(error.to_string());
            Handled::Exit(codes::FAILURE)
        }
        CommandError::Interrupt => {
            ui.print_error("^C".to_string());
            Handled::Exit(codes::FAILURE)
        }
        CommandError::Other(_) => Handled::Declined,
    }
}

fn help_requested(argv: &[String]) -> bool {
    // Tokens past the first '--' separator are data, not flags.
    argv.iter()
        .take_while(|token| token.as_str() != "--")
        .any(|token| token == "-h" || token == "--help")
}

/// Configures a [`Command`] prior to registration.
/// Created via [`Command::new`] or [`Command::delegator`].
pub struct CommandBuilder {
    name: String,
    prog: Option<String>,
    about: Option<String>,
    usage: Option<String>,
    signature: Signature,
    body: Body,
    side_table: Vec<(String, ArgSpec)>,
    extensions: Vec<Arc<dyn Extension>>,
    return_value_processor: Option<Box<ReturnProcessor>>,
    error_handler: Option<Box<ErrorHandler>>,
    completer: Option<Box<CommandCompleter>>,
    completion_filter: Option<CompletionValidator>,
    backend: Option<Box<dyn CompletionBackend>>,
}

impl CommandBuilder {
    fn new(name: impl Into<String>, signature: Signature, body: Body) -> Self {
        Self {
            name: name.into(),
            prog: None,
            about: None,
            usage: None,
            signature,
            body,
            side_table: Vec::default(),
            extensions: Vec::default(),
            return_value_processor: None,
            error_handler: None,
            completer: None,
            completion_filter: None,
            backend: None,
        }
    }

    /// Override the program name used in usage and help messages.
    /// The default is derived from the process's argument list.
    pub fn prog(mut self, prog: impl Into<String>) -> Self {
        self.prog.replace(prog.into());
        self
    }

    /// Document the description shown at the top of the help message.
    /// If repeated, only the final message applies.
    pub fn about(mut self, description: impl Into<String>) -> Self {
        self.about.replace(description.into());
        self
    }

    /// Override the generated usage line.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage.replace(usage.into());
        self
    }

    /// Attach an argument spec out-of-band, keyed by parameter name.
    /// Wins over a spec attached inline on the signature.
    pub fn arg(mut self, name: impl Into<String>, spec: ArgSpec) -> Self {
        self.side_table.push((name.into(), spec));
        self
    }

    /// Attach an extension, applied before every parser construction.
    pub fn extend(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Replace the return value post-processor.
    /// The default prints the value when non-null.
    pub fn on_return(
        mut self,
        processor: impl Fn(Option<String>, &dyn UserInterface) + 'static,
    ) -> Self {
        self.return_value_processor.replace(Box::new(processor));
        self
    }

    /// Replace the error handler. Handlers that do not recognize an error
    /// should return [`Handled::Declined`], which routes it to the generic
    /// fatal path with full diagnostic context.
    pub fn on_error(
        mut self,
        handler: impl Fn(&CommandError, &dyn UserInterface) -> Handled + 'static,
    ) -> Self {
        self.error_handler.replace(Box::new(handler));
        self
    }

    /// Attach a command-level completer, overriding per-argument completion
    /// entirely whenever it returns `Some`.
    pub fn completer(
        mut self,
        completer: impl Fn(&Bindings, &str) -> Option<Vec<String>> + 'static,
    ) -> Self {
        self.completer.replace(Box::new(completer));
        self
    }

    /// Replace the filter applied to command-level completion candidates.
    /// The default is a plain prefix match.
    pub fn completion_filter(mut self, filter: impl Fn(&str, &str) -> bool + 'static) -> Self {
        self.completion_filter.replace(Arc::new(filter));
        self
    }

    /// Replace the completion backend consulted by [`Command::execute`].
    pub fn completion_backend(mut self, backend: impl CompletionBackend + 'static) -> Self {
        self.backend.replace(Box::new(backend));
        self
    }

    /// Register the command as a Result.
    /// This finalizes the configuration and checks for configuration errors
    /// (ex: `required` on a positional parameter, a repeated flag spelling).
    pub fn try_build(self) -> Result<Command, ConfigError> {
        let CommandBuilder {
            name,
            prog,
            about,
            usage,
            mut signature,
            body,
            side_table,
            extensions,
            return_value_processor,
            error_handler,
            completer,
            completion_filter,
            backend,
        } = self;

        for (target, spec) in side_table {
            match signature.param_mut(&target) {
                Some(param) => param.spec = spec,
                None => {
                    return Err(ConfigError(format!(
                        "cannot configure unknown parameter '{target}'."
                    )))
                }
            }
        }
        signature.validate()?;

        let command = Command {
            inner: Arc::new(Inner {
                name,
                prog,
                about,
                usage,
                signature,
                body,
                extensions,
                return_value_processor: return_value_processor
                    .unwrap_or_else(|| Box::new(default_return_value_processor)),
                error_handler: error_handler.unwrap_or_else(|| Box::new(default_error_handler)),
                completer,
                completion_filter,
                backend: backend.unwrap_or_else(|| Box::new(EnvBackend::default())),
            }),
        };

        // Trial-assemble so that extension misconfiguration also surfaces at
        // registration time rather than on first execution.
        let state = command.build_state()?;
        command.parser(&state, BuildMode::Normal, command.inner.name.as_str())?;

        Ok(command)
    }

    /// Register the command.
    /// If a configuration error is encountered, exits with error code `1`
    /// (via [`std::process::exit`]).
    pub fn build(self) -> Command {
        match self.try_build() {
            Ok(command) => command,
            Err(error) => {
                eprintln!("{error}");
                std::process::exit(codes::FAILURE);
            }
        }
    }
}

struct Inner {
    name: String,
    prog: Option<String>,
    about: Option<String>,
    usage: Option<String>,
    signature: Signature,
    body: Body,
    extensions: Vec<Arc<dyn Extension>>,
    return_value_processor: Box<ReturnProcessor>,
    error_handler: Box<ErrorHandler>,
    completer: Option<Box<CommandCompleter>>,
    completion_filter: Option<CompletionValidator>,
    backend: Box<dyn CompletionBackend>,
}

/// A registered callable plus its derived parser state.
///
/// The parser is rebuilt on every execution attempt; only the declaration is
/// retained between calls. Cloning is cheap and shares the registration.
///
/// ### Example
/// ```
/// use fncli::{Command, Mode, Param, Signature};
///
/// let command = Command::new(
///     "greet",
///     Signature::new().add(Param::optional("name", "world")),
///     |args| Ok(Some(format!("Hello, {}!", args.str("name").unwrap()))),
/// )
/// .try_build()
/// .unwrap();
///
/// command.execute_mode(Mode::Execute, &["rust"]).unwrap();
/// ```
#[derive(Clone)]
pub struct Command {
    inner: Arc<Inner>,
}

impl Command {
    /// Wrap a callable: the signature describes its parameters, and the
    /// callable receives the bound values on each execution.
    pub fn new(
        name: impl Into<String>,
        signature: Signature,
        callable: impl Fn(&Bindings) -> Result<Option<String>, CommandError> + 'static,
    ) -> CommandBuilder {
        CommandBuilder::new(name, signature, Body::Leaf(Box::new(callable)))
    }

    /// Wrap a delegating callable: instead of doing work itself, it selects
    /// exactly one child command (or reports [`Dispatch::NoMatch`]).
    ///
    /// The callable must have no observable side effect other than its
    /// returned selection: help and completion requests speculatively run it
    /// against a relaxed parse to discover which child they should descend
    /// into.
    pub fn delegator(
        name: impl Into<String>,
        signature: Signature,
        callable: impl Fn(&Bindings) -> Result<Dispatch, CommandError> + 'static,
    ) -> CommandBuilder {
        CommandBuilder::new(name, signature, Body::Delegator(Box::new(callable)))
    }

    /// The registered command name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn prog_or_name(&self) -> String {
        self.inner
            .prog
            .clone()
            .unwrap_or_else(|| self.inner.name.clone())
    }

    /// Run against the process's argument list and terminate the process.
    ///
    /// Detects completion requests via the configured backend, `-h`/`--help`
    /// before any `--` separator, and interrupts; exits with `0` on success,
    /// `1` on error, `2` on a usage error, and `100` after displaying help.
    pub fn execute(&self) -> ! {
        let ui = ConsoleInterface::default();
        let _ = ctrlc::set_handler(|| {
            eprintln!("^C");
            std::process::exit(codes::FAILURE);
        });

        let prog = self.inner.prog.clone().unwrap_or_else(|| {
            std::env::args()
                .next()
                .and_then(|argv0| {
                    std::path::Path::new(&argv0)
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                })
                .unwrap_or_else(|| self.inner.name.clone())
        });

        if let Some(request) = self.inner.backend.request() {
            let flow = self.run(
                Mode::Complete(request.prefix.as_str()),
                &request.args,
                &prog,
                &ui,
            );
            let code = match flow {
                Flow::Completions(candidates) => {
                    self.inner.backend.emit(&candidates);
                    codes::SUCCESS
                }
                other => self.conclude(other, &ui),
            };
            std::process::exit(code);
        }

        let argv: Vec<String> = std::env::args().skip(1).collect();
        let flow = self.run(Mode::Execute, &argv, &prog, &ui);
        std::process::exit(self.conclude(flow, &ui));
    }

    /// Run against the given tokens without terminating the process.
    /// Returns `Err` with the exit code that `execute` would have used.
    pub fn execute_tokens(&self, tokens: &[&str]) -> Result<(), i32> {
        self.execute_mode(Mode::Execute, tokens)
    }

    /// Run one of the three execution modes against the given tokens without
    /// terminating the process. Completion candidates are printed one per
    /// line.
    pub fn execute_mode(&self, mode: Mode<'_>, tokens: &[&str]) -> Result<(), i32> {
        self.execute_mode_with(mode, tokens, &ConsoleInterface::default())
    }

    /// [`Command::execute_mode`], with output routed through the given
    /// interface.
    pub fn execute_mode_with(
        &self,
        mode: Mode<'_>,
        tokens: &[&str],
        ui: &dyn UserInterface,
    ) -> Result<(), i32> {
        let prog = self.prog_or_name();
        let argv: Vec<String> = tokens.iter().map(|token| token.to_string()).collect();
        let flow = self.run(mode, &argv, &prog, ui);
        match self.conclude(flow, ui) {
            codes::SUCCESS => Ok(()),
            code => Err(code),
        }
    }

    fn build_state(&self) -> Result<BuildState, ConfigError> {
        let known = self
            .inner
            .signature
            .params()
            .iter()
            .map(|param| param.name().to_string())
            .collect();
        let mut state = BuildState::new(known);
        for extension in &self.inner.extensions {
            extension.apply(&mut state)?;
        }
        Ok(state)
    }

    fn parser(
        &self,
        state: &BuildState,
        mode: BuildMode,
        prog: &str,
    ) -> Result<BuiltParser, ConfigError> {
        assemble(
            prog,
            self.inner.about.as_deref(),
            self.inner.usage.as_deref(),
            &self.inner.signature,
            state,
            mode,
        )
    }

    pub(crate) fn run(
        &self,
        mode: Mode<'_>,
        argv: &[String],
        prog: &str,
        ui: &dyn UserInterface,
    ) -> Flow {
        let state = match self.build_state() {
            Ok(state) => state,
            Err(error) => {
                ui.print_error(error.to_string());
                return Flow::Exit(codes::FAILURE);
            }
        };
        let argv = match state.preprocess(argv) {
            Ok(argv) => argv,
            Err(error) => return Flow::Fault(error),
        };
        let mode = match mode {
            Mode::Execute if help_requested(&argv) => Mode::Help,
            other => other,
        };

        match mode {
            Mode::Execute => self.run_execute(&state, &argv, prog, ui),
            Mode::Help => self.run_help(&state, &argv, prog, ui),
            Mode::Complete(prefix) => self.run_complete(&state, &argv, prefix, prog, ui),
        }
    }

    fn run_execute(
        &self,
        state: &BuildState,
        argv: &[String],
        prog: &str,
        ui: &dyn UserInterface,
    ) -> Flow {
        let built = match self.parser(state, BuildMode::Normal, prog) {
            Ok(built) => built,
            Err(error) => {
                ui.print_error(error.to_string());
                return Flow::Exit(codes::FAILURE);
            }
        };
        let matches = match built.try_matches(argv) {
            Ok(matches) => matches,
            Err(error) => {
                ui.print_error(error.render().to_string());
                return Flow::Exit(codes::USAGE);
            }
        };
        if built.help_flag(&matches) {
            // An inferred spelling (ex: '--hel') got past the token scan.
            return self.run_help(state, argv, prog, ui);
        }
        if let Some(code) = built.synthetic_exit(&matches, ui) {
            return Flow::Exit(code);
        }

        let bindings = built.bind(&matches);
        match &self.inner.body {
            Body::Leaf(callable) => match callable(&bindings) {
                Ok(value) => Flow::Value(value),
                Err(error) => Flow::Fault(error),
            },
            Body::Delegator(callable) => match callable(&bindings) {
                Ok(Dispatch::Delegate(delegation)) => {
                    #[cfg(feature = "tracing_debug")]
                    {
                        debug!(
                            "Delegating '{prog}' to '{child}'.",
                            child = delegation.command().name()
                        );
                    }

                    let child_prog = delegation.child_prog(prog);
                    delegation
                        .command()
                        .run(Mode::Execute, delegation.argv(), &child_prog, ui)
                }
                Ok(Dispatch::NoMatch) => Flow::Fault(CommandError::NoMatchingDelegate),
                Err(error) => Flow::Fault(error),
            },
        }
    }

    /// Speculatively run the delegating callable over a relaxed parse,
    /// purely to discover which child the command line selects.
    fn probe(&self, state: &BuildState, argv: &[String], prog: &str) -> Probe {
        let Body::Delegator(callable) = &self.inner.body else {
            return Probe::NoMatch;
        };
        let built = match self.parser(state, BuildMode::Partial, prog) {
            Ok(built) => built,
            Err(error) => return Probe::Fault(CommandError::runtime(error.to_string())),
        };
        let matches = match built.try_matches(argv) {
            // A speculative parse over an incomplete command line is allowed
            // to fail; the delegator then answers for itself.
            Err(_) => return Probe::NoMatch,
            Ok(matches) => matches,
        };
        let bindings = built.bind(&matches);
        match callable(&bindings) {
            Ok(Dispatch::Delegate(delegation)) => Probe::Dispatched(delegation),
            Ok(Dispatch::NoMatch) => Probe::NoMatch,
            Err(error) => Probe::Fault(error),
        }
    }

    fn run_help(
        &self,
        state: &BuildState,
        argv: &[String],
        prog: &str,
        ui: &dyn UserInterface,
    ) -> Flow {
        if matches!(self.inner.body, Body::Delegator(_)) {
            match self.probe(state, argv, prog) {
                Probe::Dispatched(delegation) => {
                    let child_prog = delegation.child_prog(prog);
                    return delegation
                        .command()
                        .run(Mode::Help, delegation.argv(), &child_prog, ui);
                }
                Probe::NoMatch => {
                    // Graceful: fall back to the delegator's own help.
                }
                Probe::Fault(error) => return Flow::Fault(error),
            }
        }

        match self.parser(state, BuildMode::Normal, prog) {
            Ok(mut built) => {
                ui.print(built.render_help());
                Flow::Exit(codes::HELP)
            }
            Err(error) => {
                ui.print_error(error.to_string());
                Flow::Exit(codes::FAILURE)
            }
        }
    }

    fn run_complete(
        &self,
        state: &BuildState,
        argv: &[String],
        prefix: &str,
        prog: &str,
        ui: &dyn UserInterface,
    ) -> Flow {
        if matches!(self.inner.body, Body::Delegator(_)) {
            match self.probe(state, argv, prog) {
                Probe::Dispatched(delegation) => {
                    let child_prog = delegation.child_prog(prog);
                    return delegation.command().run(
                        Mode::Complete(prefix),
                        delegation.argv(),
                        &child_prog,
                        ui,
                    );
                }
                Probe::NoMatch => {
                    // Graceful: complete against the delegator itself.
                }
                Probe::Fault(error) => return Flow::Fault(error),
            }
        }

        Flow::Completions(self.own_completions(state, argv, prefix, prog))
    }

    fn own_completions(
        &self,
        state: &BuildState,
        argv: &[String],
        prefix: &str,
        prog: &str,
    ) -> Vec<String> {
        let built = match self.parser(state, BuildMode::Partial, prog) {
            Ok(built) => built,
            Err(_) => return Vec::default(),
        };
        let (matches, bindings) = match built.try_matches(argv) {
            Ok(matches) => {
                let bindings = built.bind(&matches);
                (Some(matches), bindings)
            }
            Err(_) => (None, built.defaults()),
        };

        if let Some(completer) = &self.inner.completer {
            if let Some(candidates) = completer(&bindings, prefix) {
                let filter = self.inner.completion_filter.clone();
                return candidates
                    .into_iter()
                    .filter(|candidate| match &filter {
                        Some(filter) => filter(candidate, prefix),
                        None => prefix_validator(candidate, prefix),
                    })
                    .collect();
            }
        }

        if prefix.starts_with('-') {
            return built
                .flag_spellings()
                .iter()
                .filter(|candidate| prefix_validator(candidate, prefix))
                .cloned()
                .collect();
        }

        match built.pending_positional(matches.as_ref()) {
            Some(param) => {
                let candidates = if let Some(completer) = &param.spec.completer {
                    completer(&CompletionContext {
                        prefix,
                        bindings: &bindings,
                    })
                } else if let Some(choices) = &param.spec.choices {
                    choices.clone()
                } else {
                    Vec::default()
                };
                let validator = param.spec.completion_validator.clone();
                candidates
                    .into_iter()
                    .filter(|candidate| match &validator {
                        Some(validator) => validator(candidate, prefix),
                        None => prefix_validator(candidate, prefix),
                    })
                    .collect()
            }
            None => Vec::default(),
        }
    }

    fn conclude(&self, flow: Flow, ui: &dyn UserInterface) -> i32 {
        match flow {
            Flow::Value(value) => {
                (self.inner.return_value_processor)(value, ui);
                codes::SUCCESS
            }
            Flow::Completions(candidates) => {
                if !candidates.is_empty() {
                    ui.print(candidates.join("\n"));
                }
                codes::SUCCESS
            }
            Flow::Exit(code) => code,
            Flow::Fault(error) => match (self.inner.error_handler)(&error, ui) {
                Handled::Exit(code) => code,
                Handled::Declined => {
                    ui.print_error(format!("unhandled error: {error}\n{error:?}"));
                    codes::FAILURE
                }
            },
        }
    }
}
