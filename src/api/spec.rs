use std::sync::Arc;

use crate::builder::Bindings;
use crate::errors::ConfigError;
use crate::model::{Param, ParamKind, Value};

/// A string → [`Value`] coercion with validation.
pub type Converter = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// A dynamic completion source: given the current prefix and the
/// speculatively parsed values, produce candidate strings.
pub type Completer = Arc<dyn Fn(&CompletionContext<'_>) -> Vec<String>>;

/// A completion filter: `(candidate, prefix) -> keep?`.
pub type CompletionValidator = Arc<dyn Fn(&str, &str) -> bool>;

/// The information handed to a [`Completer`].
pub struct CompletionContext<'a> {
    /// The partial word before the cursor.
    pub prefix: &'a str,
    /// The values parsed so far (required arguments relaxed, so probing an
    /// incomplete command line never fails).
    pub bindings: &'a Bindings,
}

/// Configuration controlling how one parameter becomes a command line
/// surface element.
///
/// Attach inline via [`Param::spec`](crate::Param::spec), or out-of-band via
/// [`CommandBuilder::arg`](crate::CommandBuilder::arg) keyed by parameter
/// name; the out-of-band table wins.
///
/// ### Example
/// ```
/// use fncli::ArgSpec;
///
/// ArgSpec::new()
///     .choices(["one", "two", "three"])
///     .alias("a")
///     .help("Pick a door.");
/// ```
#[derive(Clone, Default)]
pub struct ArgSpec {
    pub(crate) choices: Option<Vec<String>>,
    pub(crate) aliases: Vec<String>,
    pub(crate) help: Option<String>,
    pub(crate) converter: Option<Converter>,
    pub(crate) required: bool,
    pub(crate) remainder: bool,
    pub(crate) append: bool,
    pub(crate) completer: Option<Completer>,
    pub(crate) completion_validator: Option<CompletionValidator>,
}

impl ArgSpec {
    /// Create an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constrain the parameter to a closed set of values.
    /// The set is used for parse-time validation, help text, and tab
    /// completion. Not applicable to boolean flags.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices
            .replace(choices.into_iter().map(|c| c.into()).collect());
        self
    }

    /// Add an alias spelling. Single characters surface as `-x`, longer
    /// aliases as `--xyz`. Boolean flags also gain the `--no`-prefixed
    /// negative form of every alias. Repeat to add multiple aliases.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Document the help message for this parameter.
    /// If repeated, only the final message applies.
    pub fn help(mut self, description: impl Into<String>) -> Self {
        self.help.replace(description.into());
        self
    }

    /// Install a string → [`Value`] converter, applied by the parser to each
    /// captured token. Conversion failures are usage errors.
    pub fn converter(
        mut self,
        converter: impl Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.converter.replace(Arc::new(converter));
        self
    }

    /// Require the parameter on every invocation.
    /// Only meaningful for keyword parameters; for boolean flags this demands
    /// one of the two spellings.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Capture every token past the remainder boundary verbatim, including
    /// tokens that look like flags. Only meaningful for variadic parameters.
    pub fn remainder(mut self) -> Self {
        self.remainder = true;
        self
    }

    /// Accumulate repeated occurrences into an ordered sequence instead of
    /// overwriting. The declared default must be an empty sequence.
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    /// Install a dynamic completion source, overriding the choices-based
    /// candidate list for this parameter.
    pub fn completer(
        mut self,
        completer: impl Fn(&CompletionContext<'_>) -> Vec<String> + 'static,
    ) -> Self {
        self.completer.replace(Arc::new(completer));
        self
    }

    /// Install the filter applied to this parameter's completion candidates.
    /// The default is a plain prefix match.
    pub fn completion_validator(
        mut self,
        validator: impl Fn(&str, &str) -> bool + 'static,
    ) -> Self {
        self.completion_validator.replace(Arc::new(validator));
        self
    }

    /// Check this spec against the kind of the parameter it is attached to.
    pub(crate) fn validate(&self, param: &Param) -> Result<(), ConfigError> {
        if self.required && param.kind != ParamKind::KeywordOnly {
            return Err(ConfigError(format!(
                "'required' does not apply to positional parameter '{}'; declare a default instead.",
                param.name
            )));
        }
        if self.remainder && param.kind != ParamKind::VariadicPositional {
            return Err(ConfigError(format!(
                "remainder parameter '{}' must be variadic.",
                param.name
            )));
        }
        if self.choices.is_some() && param.is_bool_flag() {
            return Err(ConfigError(format!(
                "choices cannot be specified for boolean flag '{}'.",
                param.name
            )));
        }
        if self.append {
            if param.kind != ParamKind::KeywordOnly || param.is_bool_flag() {
                return Err(ConfigError(format!(
                    "'append' only applies to valued keyword parameter '{}'.",
                    param.name
                )));
            }
            let empty_default = match &param.default {
                Value::Empty => true,
                Value::Seq(items) => items.is_empty(),
                _ => false,
            };
            if !empty_default {
                return Err(ConfigError(format!(
                    "append parameter '{}' must declare an empty default; apply fallbacks in the callable instead.",
                    param.name
                )));
            }
        }
        Ok(())
    }
}

/// Ready-made [`Converter`]s.
pub mod converters {
    use super::Converter;
    use crate::model::Value;
    use std::sync::Arc;

    /// Convert a token to an integer [`Value`].
    pub fn int() -> Converter {
        Arc::new(|token| {
            token
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("invalid int value: '{token}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn required_on_positional() {
        let param = Param::required("arg1").spec(ArgSpec::new().required());
        let result = param.spec.validate(&param).unwrap_err();
        assert_matches!(result, ConfigError(message) => {
            assert_eq!(
                message,
                "'required' does not apply to positional parameter 'arg1'; declare a default instead."
            );
        });
    }

    #[test]
    fn remainder_on_scalar() {
        let param = Param::required("arg1").spec(ArgSpec::new().remainder());
        let result = param.spec.validate(&param).unwrap_err();
        assert_matches!(result, ConfigError(message) => {
            assert_eq!(message, "remainder parameter 'arg1' must be variadic.");
        });
    }

    #[test]
    fn choices_on_bool_flag() {
        let param = Param::flag("flag1", false).spec(ArgSpec::new().choices(["a", "b"]));
        let result = param.spec.validate(&param).unwrap_err();
        assert_matches!(result, ConfigError(message) => {
            assert_eq!(message, "choices cannot be specified for boolean flag 'flag1'.");
        });
    }

    #[test]
    fn append_with_nonempty_default() {
        let param = Param::keyword("arg", vec!["chocolate".to_string()])
            .spec(ArgSpec::new().append());
        assert_matches!(param.spec.validate(&param), Err(ConfigError(_)));
    }

    #[test]
    fn append_with_empty_default() {
        let param = Param::keyword("arg", Vec::<String>::default()).spec(ArgSpec::new().append());
        param.spec.validate(&param).unwrap();
    }

    #[test]
    fn append_on_flag() {
        let param = Param::flag("flag1", false).spec(ArgSpec::new().append());
        assert_matches!(param.spec.validate(&param), Err(ConfigError(_)));
    }

    #[test]
    fn int_converter() {
        let converter = converters::int();
        assert_eq!(converter("44"), Ok(Value::Int(44)));
        assert_eq!(
            converter("chocolate"),
            Err("invalid int value: 'chocolate'".to_string())
        );
    }
}
