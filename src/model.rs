use crate::api::ArgSpec;
use crate::errors::ConfigError;

/// The reserved variadic name that implicitly switches a signature into
/// remainder capture, equivalent to `ArgSpec::remainder()`.
pub const REMAINDER_NAME: &str = "_REMAINDER_";

/// A default or bound parameter value.
///
/// `Empty` is the sentinel for "no default declared" / "nothing captured"; it
/// is distinct from every concrete value, including the empty string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value.
    Empty,
    /// A boolean, as produced by flag parameters.
    Bool(bool),
    /// An integer, as produced by [`converters::int`](crate::converters::int).
    Int(i64),
    /// A string token.
    Str(String),
    /// An ordered sequence, as produced by variadic and `append` parameters.
    Seq(Vec<String>),
}

impl Value {
    /// Whether this is the `Empty` sentinel.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// View as a string token, if applicable.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(token) => Some(token.as_str()),
            _ => None,
        }
    }

    /// View as a boolean, if applicable.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// View as an integer, if applicable.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// View as a sequence, if applicable.
    pub fn as_seq(&self) -> Option<&[String]> {
        match self {
            Value::Seq(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Render the value back into command line token form.
    pub(crate) fn token(&self) -> String {
        match self {
            Value::Empty => String::default(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Str(token) => token.clone(),
            Value::Seq(items) => items.join(" "),
        }
    }
}

impl From<&str> for Value {
    fn from(token: &str) -> Self {
        Value::Str(token.to_string())
    }
}

impl From<String> for Value {
    fn from(token: String) -> Self {
        Value::Str(token)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::Seq(items)
    }
}

/// The kind of a declared parameter.
///
/// Kind is fully determined at declaration (by the `Param` constructor used)
/// and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A mandatory positional token.
    PositionalRequired,
    /// An optional positional token with a declared default.
    PositionalOptional,
    /// Zero or more trailing positional tokens.
    VariadicPositional,
    /// A `--name` flag or `--name VALUE` option.
    KeywordOnly,
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One entry in a command's declared parameter list.
///
/// ### Example
/// ```
/// use fncli::{ArgSpec, Param};
///
/// Param::required("arg1");
/// Param::optional("arg2", "two");
/// Param::variadic("rest");
/// Param::flag("flag1", false);
/// Param::keyword("opt", "default").spec(ArgSpec::new().choices(["a", "b"]));
/// ```
#[derive(Clone)]
pub struct Param {
    pub(crate) name: String,
    pub(crate) kind: ParamKind,
    pub(crate) default: Value,
    pub(crate) spec: ArgSpec,
}

impl Param {
    /// Declare a mandatory positional parameter.
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalRequired,
            default: Value::Empty,
            spec: ArgSpec::default(),
        }
    }

    /// Declare an optional positional parameter with a default.
    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::PositionalOptional,
            default: default.into(),
            spec: ArgSpec::default(),
        }
    }

    /// Declare a variadic positional parameter, capturing zero or more
    /// trailing tokens.
    ///
    /// Naming the parameter `_REMAINDER_` (or configuring
    /// [`ArgSpec::remainder`]) switches it into remainder capture: once the
    /// remainder boundary is reached, every later token is captured verbatim,
    /// flag-like or not.
    pub fn variadic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::VariadicPositional,
            default: Value::Seq(Vec::default()),
            spec: ArgSpec::default(),
        }
    }

    /// Declare a boolean flag parameter.
    ///
    /// Generates both a `--name` and a hidden `--noname` spelling; when both
    /// appear on a command line, the last one wins.
    pub fn flag(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::KeywordOnly,
            default: Value::Bool(default),
            spec: ArgSpec::default(),
        }
    }

    /// Declare a valued keyword parameter (`--name VALUE`).
    pub fn keyword(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::KeywordOnly,
            default: default.into(),
            spec: ArgSpec::default(),
        }
    }

    /// Attach an inline argument spec to this parameter.
    /// If repeated, only the final spec applies.
    pub fn spec(mut self, spec: ArgSpec) -> Self {
        self.spec = spec;
        self
    }

    /// The declared parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter kind.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// The declared default, `Value::Empty` when there is none.
    pub fn default(&self) -> &Value {
        &self.default
    }

    /// The surface name: the declared name with trailing underscores
    /// stripped, which lets implementers dodge keyword collisions without
    /// polluting the CLI.
    pub(crate) fn cli_name(&self) -> &str {
        self.name.trim_end_matches('_')
    }

    pub(crate) fn is_bool_flag(&self) -> bool {
        self.kind == ParamKind::KeywordOnly && matches!(self.default, Value::Bool(_))
    }

    pub(crate) fn is_remainder(&self) -> bool {
        self.kind == ParamKind::VariadicPositional
            && (self.spec.remainder || self.name == REMAINDER_NAME)
    }

    pub(crate) fn is_positional(&self) -> bool {
        self.kind != ParamKind::KeywordOnly
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Param[{kind}, {name}, default={default:?}]",
            kind = self.kind,
            name = self.name,
            default = self.default,
        )
    }
}

/// The ordered description of a callable's parameter list.
///
/// Declaration order is preserved exactly; it drives both positional binding
/// and the order of entries in generated help text.
///
/// ### Example
/// ```
/// use fncli::{Param, Signature};
///
/// let signature = Signature::new()
///     .add(Param::required("arg1"))
///     .add(Param::optional("arg2", "two"))
///     .add(Param::variadic("rest"))
///     .add(Param::flag("flag1", false));
/// assert_eq!(signature.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Create an empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter declaration.
    ///
    /// A parameter named `self` is skipped: it stands for an implicit
    /// receiver and has no command line surface.
    pub fn add(mut self, param: Param) -> Self {
        if param.name != "self" {
            self.params.push(param);
        }
        self
    }

    /// The number of declared parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the signature declares no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn param_mut(&mut self, name: &str) -> Option<&mut Param> {
        self.params.iter_mut().find(|p| p.name == name)
    }

    /// Check the declaration against the supported parameter shapes.
    /// Every violation is a registration-time configuration error.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_cli_names: Vec<String> = Vec::default();
        let mut seen_variadic = false;
        let mut seen_keyword = false;
        let mut seen_positional_optional = false;

        for param in &self.params {
            let cli = param.cli_name().to_string();
            if cli.is_empty() {
                return Err(ConfigError(format!(
                    "parameter '{}' has no usable surface name.",
                    param.name
                )));
            }
            if seen_cli_names.contains(&cli) {
                return Err(ConfigError(format!(
                    "parameter '{}' collides with an earlier parameter on surface name '{cli}'.",
                    param.name
                )));
            }
            seen_cli_names.push(cli);

            match param.kind {
                ParamKind::PositionalRequired => {
                    if seen_positional_optional {
                        return Err(ConfigError(format!(
                            "required positional '{}' cannot follow a defaulted positional.",
                            param.name
                        )));
                    }
                    if seen_variadic || seen_keyword {
                        return Err(ConfigError(format!(
                            "positional '{}' cannot follow a variadic or keyword parameter.",
                            param.name
                        )));
                    }
                }
                ParamKind::PositionalOptional => {
                    if seen_variadic || seen_keyword {
                        return Err(ConfigError(format!(
                            "positional '{}' cannot follow a variadic or keyword parameter.",
                            param.name
                        )));
                    }
                    seen_positional_optional = true;
                }
                ParamKind::VariadicPositional => {
                    if seen_variadic {
                        return Err(ConfigError(format!(
                            "variadic '{}' cannot follow another variadic parameter.",
                            param.name
                        )));
                    }
                    if seen_keyword {
                        return Err(ConfigError(format!(
                            "positional '{}' cannot follow a variadic or keyword parameter.",
                            param.name
                        )));
                    }
                    seen_variadic = true;
                }
                ParamKind::KeywordOnly => {
                    seen_keyword = true;
                }
            }

            param.spec.validate(param)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ArgSpec;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn declaration_order() {
        let signature = Signature::new()
            .add(Param::required("arg1"))
            .add(Param::optional("arg2", "two"))
            .add(Param::variadic("rest"))
            .add(Param::flag("flag1", false))
            .add(Param::keyword("opt", "default"));

        let names: Vec<&str> = signature.params().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["arg1", "arg2", "rest", "flag1", "opt"]);
        signature.validate().unwrap();
    }

    #[test]
    fn receiver_skipped() {
        let signature = Signature::new()
            .add(Param::required("self"))
            .add(Param::required("arg1"));

        let names: Vec<&str> = signature.params().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["arg1"]);
    }

    #[rstest]
    #[case("flag1_", "flag1")]
    #[case("flag1__", "flag1")]
    #[case("flag1", "flag1")]
    fn trailing_underscores_stripped(#[case] declared: &str, #[case] surface: &str) {
        let param = Param::flag(declared, false);
        assert_eq!(param.cli_name(), surface);
        assert_eq!(param.name(), declared);
    }

    #[test]
    fn reserved_remainder_name() {
        assert!(Param::variadic(REMAINDER_NAME).is_remainder());
        assert!(!Param::variadic("rest").is_remainder());
        assert!(Param::variadic("rest")
            .spec(ArgSpec::new().remainder())
            .is_remainder());
    }

    #[test]
    fn two_variadic_segments() {
        let signature = Signature::new()
            .add(Param::variadic("first"))
            .add(Param::variadic("second"));

        let result = signature.validate().unwrap_err();
        assert_matches!(result, ConfigError(message) => {
            assert_eq!(
                message,
                "variadic 'second' cannot follow another variadic parameter."
            );
        });
    }

    #[test]
    fn positional_after_keyword() {
        let signature = Signature::new()
            .add(Param::flag("flag1", false))
            .add(Param::required("arg1"));

        assert_matches!(signature.validate(), Err(ConfigError(_)));
    }

    #[test]
    fn required_after_defaulted() {
        let signature = Signature::new()
            .add(Param::optional("arg1", "one"))
            .add(Param::required("arg2"));

        assert_matches!(signature.validate(), Err(ConfigError(_)));
    }

    #[test]
    fn surface_name_collision() {
        let signature = Signature::new()
            .add(Param::required("arg"))
            .add(Param::flag("arg_", false));

        let result = signature.validate().unwrap_err();
        assert_matches!(result, ConfigError(message) => {
            assert_eq!(
                message,
                "parameter 'arg_' collides with an earlier parameter on surface name 'arg'."
            );
        });
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Empty.is_empty());
        assert_eq!(Value::from("abc").as_str(), Some("abc"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert_eq!(Value::from(7).as_int(), Some(7));
        assert_eq!(
            Value::from(vec!["a".to_string()]).as_seq(),
            Some(&["a".to_string()][..])
        );
        assert_eq!(Value::from("abc").as_bool(), None);
    }
}
