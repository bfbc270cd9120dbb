use clap::builder::ValueParser;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgGroup};

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::api::ArgSpec;
use crate::errors::ConfigError;
use crate::extension::{BuildState, SyntheticFlag};
use crate::interface::UserInterface;
use crate::model::{Param, ParamKind, Signature, Value};

/// The values re-derived from a parse, keyed by declared parameter name and
/// ordered by declaration.
///
/// This is what a wrapped callable receives: positionals, flags, and keyword
/// values are all resolved against their declared kinds and defaults.
#[derive(Debug, Clone)]
pub struct Bindings {
    values: Vec<(String, Value)>,
}

impl Bindings {
    pub(crate) fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// The bound value for a declared parameter, if the name exists.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// The bound string for a parameter, or `None` when unbound (an
    /// unfilled positional during a speculative parse) or non-string.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// The bound boolean for a flag parameter; `false` when unbound.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    /// The bound integer for a parameter, if any.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    /// The bound sequence for a variadic or `append` parameter; empty when
    /// unbound.
    pub fn seq(&self, name: &str) -> &[String] {
        self.get(name).and_then(Value::as_seq).unwrap_or(&[])
    }
}

/// How to register required positionals.
///
/// `Partial` relaxes them to optional so that a speculative parse over an
/// incomplete command line never fails; it is used for delegation probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildMode {
    Normal,
    Partial,
}

pub(crate) struct SlotPlan {
    pub(crate) param: Param,
    neg_id: Option<String>,
}

/// A parser assembled against the external primitive, plus the bookkeeping
/// needed to re-derive call arguments from parse results.
pub(crate) struct BuiltParser {
    clap: clap::Command,
    slots: Vec<SlotPlan>,
    synthetics: Vec<SyntheticFlag>,
    flag_spellings: Vec<String>,
}

impl std::fmt::Debug for BuiltParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `slots`/`synthetics` carry `ArgSpec` closures (`Arc<dyn Fn..>`),
        // which are not `Debug`, so a derive is impossible; format the
        // debuggable fields and elide the rest.
        f.debug_struct("BuiltParser")
            .field("clap", &self.clap)
            .field("flag_spellings", &self.flag_spellings)
            .finish_non_exhaustive()
    }
}

fn negative_id(name: &str) -> String {
    format!("{name}:no")
}

fn synthetic_id(long: &str) -> String {
    format!("ext:{long}")
}

fn value_parser_for(spec: &ArgSpec) -> ValueParser {
    let choices = spec.choices.clone();
    let converter = spec.converter.clone();
    ValueParser::new(move |token: &str| -> Result<Value, String> {
        if let Some(choices) = &choices {
            if !choices.iter().any(|choice| choice == token) {
                return Err(format!(
                    "invalid choice: '{token}' (choose from {})",
                    choices.join(", ")
                ));
            }
        }
        match &converter {
            Some(converter) => converter(token),
            None => Ok(Value::Str(token.to_string())),
        }
    })
}

fn value_name_for(param: &Param) -> String {
    match &param.spec.choices {
        Some(choices) => format!("{{{}}}", choices.join(",")),
        None => {
            if param.is_positional() {
                param.cli_name().to_string()
            } else {
                param.cli_name().to_uppercase()
            }
        }
    }
}

/// Track long/short spellings across the whole parser; the external primitive
/// asserts on collisions, so they must surface as configuration errors first.
#[derive(Default)]
struct SpellingLedger {
    longs: Vec<String>,
    shorts: Vec<char>,
}

impl SpellingLedger {
    fn long(&mut self, spelling: String, owner: &str) -> Result<(), ConfigError> {
        if self.longs.contains(&spelling) {
            return Err(ConfigError(format!(
                "parameter '{owner}' reuses the flag spelling '--{spelling}'."
            )));
        }
        self.longs.push(spelling);
        Ok(())
    }

    fn short(&mut self, spelling: char, owner: &str) -> Result<(), ConfigError> {
        if self.shorts.contains(&spelling) {
            return Err(ConfigError(format!(
                "parameter '{owner}' reuses the flag spelling '-{spelling}'."
            )));
        }
        self.shorts.push(spelling);
        Ok(())
    }
}

/// Translate a signature and its build state into a parser registration
/// against the external primitive, applying the kind-specific rules.
pub(crate) fn assemble(
    prog: &str,
    about: Option<&str>,
    usage: Option<&str>,
    signature: &Signature,
    state: &BuildState,
    mode: BuildMode,
) -> Result<BuiltParser, ConfigError> {
    // Apply extension overrides onto a working copy, then re-check the
    // combination rules: an extension can introduce a misconfiguration just
    // as well as the original declaration.
    let mut effective = signature.clone();
    for (name, spec) in &state.overrides {
        match effective.param_mut(name) {
            Some(param) => param.spec = spec.clone(),
            None => {
                return Err(ConfigError(format!(
                    "cannot configure unknown parameter '{name}'."
                )))
            }
        }
    }
    effective.validate()?;

    #[cfg(feature = "tracing_debug")]
    {
        debug!(
            "Assembling parser for '{prog}' with {count} parameters ({mode:?}).",
            count = effective.len()
        );
    }

    let mut ledger = SpellingLedger::default();
    let mut flag_spellings: Vec<String> = Vec::default();
    let mut slots: Vec<SlotPlan> = Vec::default();

    let mut cmd = clap::Command::new(prog.to_string())
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .infer_long_args(state.allow_abbrev);
    if let Some(about) = about {
        cmd = cmd.about(about.to_string());
    }
    if let Some(usage) = usage {
        cmd = cmd.override_usage(usage.to_string());
    }

    ledger.long("help".to_string(), "help")?;
    ledger.short('h', "help")?;
    cmd = cmd.arg(
        Arg::new("help")
            .long("help")
            .short('h')
            .action(ArgAction::SetTrue)
            .help("show this help message and exit"),
    );

    for param in effective.params() {
        let name = param.name().to_string();
        let cli = param.cli_name().to_string();
        let mut neg_id = None;

        match param.kind() {
            ParamKind::PositionalRequired => {
                let mut arg = Arg::new(name.clone())
                    .value_name(value_name_for(param))
                    .action(ArgAction::Set)
                    .value_parser(value_parser_for(&param.spec));
                arg = match mode {
                    BuildMode::Normal => arg.required(true),
                    // Relaxed so that probing an incomplete command line
                    // never fails; the unfilled slot binds to Empty.
                    BuildMode::Partial => arg.required(false),
                };
                if let Some(help) = &param.spec.help {
                    arg = arg.help(help.clone());
                }
                cmd = cmd.arg(arg);
            }
            ParamKind::PositionalOptional => {
                let mut arg = Arg::new(name.clone())
                    .value_name(value_name_for(param))
                    .required(false)
                    .action(ArgAction::Set)
                    .value_parser(value_parser_for(&param.spec));
                if let Some(help) = &param.spec.help {
                    arg = arg.help(help.clone());
                }
                cmd = cmd.arg(arg);
            }
            ParamKind::VariadicPositional => {
                let mut arg = Arg::new(name.clone())
                    .value_name(value_name_for(param))
                    .required(false)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_parser(value_parser_for(&param.spec));
                if param.is_remainder() {
                    // Collect-leftover-argv mode: from the remainder boundary
                    // on, every token is captured verbatim, flags included.
                    // The slot itself stays out of the help text.
                    arg = arg
                        .allow_hyphen_values(true)
                        .trailing_var_arg(true)
                        .hide(true);
                }
                if let Some(help) = &param.spec.help {
                    arg = arg.help(help.clone());
                }
                cmd = cmd.arg(arg);
            }
            ParamKind::KeywordOnly if param.is_bool_flag() => {
                ledger.long(cli.clone(), &name)?;
                let mut positive = Arg::new(name.clone())
                    .long(cli.clone())
                    .action(ArgAction::SetTrue)
                    .overrides_with(negative_id(&name));
                if let Some(help) = &param.spec.help {
                    positive = positive.help(help.clone());
                }
                flag_spellings.push(format!("--{cli}"));

                let negative_name = negative_id(&name);
                ledger.long(format!("no{cli}"), &name)?;
                let mut negative = Arg::new(negative_name.clone())
                    .long(format!("no{cli}"))
                    .action(ArgAction::SetTrue)
                    .overrides_with(name.clone())
                    .hide(true);

                let mut first_short = true;
                for alias in &param.spec.aliases {
                    let mut chars = alias.chars();
                    match (chars.next(), chars.next()) {
                        (Some(single), None) => {
                            ledger.short(single, &name)?;
                            if first_short {
                                positive = positive.short(single);
                                first_short = false;
                            } else {
                                positive = positive.short_alias(single);
                            }
                            flag_spellings.push(format!("-{single}"));
                        }
                        _ => {
                            ledger.long(alias.clone(), &name)?;
                            positive = positive.visible_alias(alias.clone());
                            flag_spellings.push(format!("--{alias}"));
                        }
                    }
                    ledger.long(format!("no{alias}"), &name)?;
                    negative = negative.alias(format!("no{alias}"));
                }

                if param.spec.required {
                    cmd = cmd.group(
                        ArgGroup::new(format!("{name}:required"))
                            .args([name.clone(), negative_name.clone()])
                            .required(true)
                            .multiple(false),
                    );
                }

                cmd = cmd.arg(positive).arg(negative);
                neg_id = Some(negative_name);
            }
            ParamKind::KeywordOnly => {
                ledger.long(cli.clone(), &name)?;
                let action = if param.spec.append {
                    ArgAction::Append
                } else {
                    ArgAction::Set
                };
                let mut arg = Arg::new(name.clone())
                    .long(cli.clone())
                    .value_name(value_name_for(param))
                    .action(action)
                    .required(param.spec.required)
                    .value_parser(value_parser_for(&param.spec));
                if let Some(help) = &param.spec.help {
                    arg = arg.help(help.clone());
                }
                flag_spellings.push(format!("--{cli}"));

                let mut first_short = true;
                for alias in &param.spec.aliases {
                    let mut chars = alias.chars();
                    match (chars.next(), chars.next()) {
                        (Some(single), None) => {
                            ledger.short(single, &name)?;
                            if first_short {
                                arg = arg.short(single);
                                first_short = false;
                            } else {
                                arg = arg.short_alias(single);
                            }
                            flag_spellings.push(format!("-{single}"));
                        }
                        _ => {
                            ledger.long(alias.clone(), &name)?;
                            arg = arg.visible_alias(alias.clone());
                            flag_spellings.push(format!("--{alias}"));
                        }
                    }
                }
                cmd = cmd.arg(arg);
            }
        }

        slots.push(SlotPlan {
            param: param.clone(),
            neg_id,
        });
    }

    for synthetic in &state.synthetics {
        ledger.long(synthetic.long.clone(), &synthetic.long)?;
        let mut arg = Arg::new(synthetic_id(&synthetic.long))
            .long(synthetic.long.clone())
            .action(ArgAction::SetTrue);
        if let Some(short) = synthetic.short {
            ledger.short(short, &synthetic.long)?;
            arg = arg.short(short);
        }
        if let Some(help) = &synthetic.help {
            arg = arg.help(help.clone());
        }
        flag_spellings.push(format!("--{}", synthetic.long));
        cmd = cmd.arg(arg);
    }

    Ok(BuiltParser {
        clap: cmd,
        slots,
        synthetics: state.synthetics.clone(),
        flag_spellings,
    })
}

impl BuiltParser {
    /// Run the external primitive over the tokens.
    pub(crate) fn try_matches(&self, argv: &[String]) -> Result<clap::ArgMatches, clap::Error> {
        self.clap
            .clone()
            .try_get_matches_from(argv.iter().map(String::as_str))
    }

    /// Render the help message derived from the registered arguments.
    pub(crate) fn render_help(&mut self) -> String {
        self.clap.render_help().to_string()
    }

    /// Whether the display-only help flag was matched.
    pub(crate) fn help_flag(&self, matches: &clap::ArgMatches) -> bool {
        matches.get_flag("help")
    }

    /// Run the first triggered synthetic-flag hook, if any.
    pub(crate) fn synthetic_exit(
        &self,
        matches: &clap::ArgMatches,
        ui: &dyn UserInterface,
    ) -> Option<i32> {
        for synthetic in &self.synthetics {
            if matches.get_flag(&synthetic_id(&synthetic.long)) {
                return Some((synthetic.hook)(ui));
            }
        }
        None
    }

    /// Convert parse results back into call arguments, respecting each
    /// parameter's kind.
    pub(crate) fn bind(&self, matches: &clap::ArgMatches) -> Bindings {
        let mut values = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let param = &slot.param;
            let value = if let Some(neg_id) = &slot.neg_id {
                let positive = matches.get_flag(param.name());
                let negative = matches.get_flag(neg_id);
                if positive {
                    Value::Bool(true)
                } else if negative {
                    Value::Bool(false)
                } else {
                    param.default().clone()
                }
            } else {
                match param.kind() {
                    ParamKind::VariadicPositional => matches
                        .get_many::<Value>(param.name())
                        .map(|captured| Value::Seq(captured.map(|v| v.token()).collect()))
                        .unwrap_or_else(|| Value::Seq(Vec::default())),
                    ParamKind::KeywordOnly if param.spec.append => matches
                        .get_many::<Value>(param.name())
                        .map(|captured| Value::Seq(captured.map(|v| v.token()).collect()))
                        .unwrap_or_else(|| Value::Seq(Vec::default())),
                    _ => matches
                        .get_one::<Value>(param.name())
                        .cloned()
                        .unwrap_or_else(|| param.default().clone()),
                }
            };
            values.push((param.name().to_string(), value));
        }
        Bindings::new(values)
    }

    /// The bindings a speculative parse falls back to when even the relaxed
    /// parse fails: declared defaults, with unfilled slots Empty.
    pub(crate) fn defaults(&self) -> Bindings {
        Bindings::new(
            self.slots
                .iter()
                .map(|slot| (slot.param.name().to_string(), slot.param.default().clone()))
                .collect(),
        )
    }

    /// The first positional parameter that could still capture a token;
    /// drives default completion candidates.
    pub(crate) fn pending_positional(&self, matches: Option<&clap::ArgMatches>) -> Option<&Param> {
        for slot in &self.slots {
            let param = &slot.param;
            if !param.is_positional() {
                continue;
            }
            if param.kind() == ParamKind::VariadicPositional {
                return Some(param);
            }
            let provided = matches
                .map(|m| m.value_source(param.name()) == Some(ValueSource::CommandLine))
                .unwrap_or(false);
            if !provided {
                return Some(param);
            }
        }
        None
    }

    /// The visible flag spellings, offered when completing a word that
    /// starts with a dash. Hidden negative forms and the help flag are
    /// deliberately absent.
    pub(crate) fn flag_spellings(&self) -> &[String] {
        &self.flag_spellings
    }
}
