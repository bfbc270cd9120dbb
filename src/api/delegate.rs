use crate::api::command::{Command, CommandBuilder};
use crate::api::spec::ArgSpec;
use crate::model::{Param, Signature, REMAINDER_NAME};

/// The selection returned by a delegating callable.
///
/// This is deliberately a value, not an invocation: the callable names the
/// child it would run, and the engine executes that child in whichever mode
/// (execute, help, complete) the outermost invocation asked for.
pub enum Dispatch {
    /// Hand off to exactly one child command.
    Delegate(Delegation),
    /// No child matches the requested dispatch. Fatal during execution;
    /// handled gracefully (by answering for the delegator itself) during
    /// help and completion.
    NoMatch,
}

/// The payload of [`Dispatch::Delegate`]: the chosen child and its argument
/// list.
pub struct Delegation {
    command: Command,
    argv: Vec<String>,
    prog_key: Option<String>,
}

impl Dispatch {
    /// Select a child command with the given argument list.
    pub fn delegate<I, S>(command: &Command, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Dispatch::Delegate(Delegation {
            command: command.clone(),
            argv: argv
                .into_iter()
                .map(|token| token.as_ref().to_string())
                .collect(),
            prog_key: None,
        })
    }

    /// Select a child command, composing its program name as
    /// `"<parent> <key>"` so help and usage messages name the full path.
    pub fn delegate_as<I, S>(key: impl Into<String>, command: &Command, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match Self::delegate(command, argv) {
            Dispatch::Delegate(mut delegation) => {
                delegation.prog_key.replace(key.into());
                Dispatch::Delegate(delegation)
            }
            no_match => no_match,
        }
    }
}

impl Delegation {
    pub(crate) fn command(&self) -> &Command {
        &self.command
    }

    pub(crate) fn argv(&self) -> &[String] {
        &self.argv
    }

    pub(crate) fn child_prog(&self, parent: &str) -> String {
        match &self.prog_key {
            Some(key) => format!("{parent} {key}"),
            None => self.command.prog_or_name(),
        }
    }
}

/// Build a delegator from `(name, command)` pairs.
///
/// The generated parent takes a choice-constrained `subcommand` positional
/// plus a remainder capture for everything after it, and dispatches by
/// direct lookup. Insertion order of the pairs is preserved in the generated
/// choice list, and therefore in help text and completion.
///
/// ### Example
/// ```
/// use fncli::{subcommands, Command, Mode, Param, Signature};
///
/// let commit = Command::new(
///     "commit",
///     Signature::new().add(Param::flag("amend", false)),
///     |args| Ok(Some(format!("amend={}", args.flag("amend")))),
/// )
/// .try_build()
/// .unwrap();
///
/// let tool = subcommands([("commit", commit)])
///     .prog("tool")
///     .try_build()
///     .unwrap();
///
/// tool.execute_mode(Mode::Execute, &["commit", "--amend"]).unwrap();
/// ```
pub fn subcommands<I, S>(pairs: I) -> CommandBuilder
where
    I: IntoIterator<Item = (S, Command)>,
    S: Into<String>,
{
    let pairs: Vec<(String, Command)> = pairs
        .into_iter()
        .map(|(key, command)| (key.into(), command))
        .collect();
    let choices: Vec<String> = pairs.iter().map(|(key, _)| key.clone()).collect();

    let signature = Signature::new()
        .add(Param::required("subcommand").spec(ArgSpec::new().choices(choices)))
        .add(Param::variadic(REMAINDER_NAME));

    Command::delegator("subcommands", signature, move |args| {
        let Some(requested) = args.str("subcommand") else {
            return Ok(Dispatch::NoMatch);
        };
        match pairs.iter().find(|(key, _)| key == requested) {
            Some((key, command)) => Ok(Dispatch::delegate_as(
                key.clone(),
                command,
                args.seq(REMAINDER_NAME),
            )),
            None => Ok(Dispatch::NoMatch),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;
    use crate::interface::testing::InMemoryInterface;
    use crate::test::assert_contains;
    use crate::Mode;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn leaf(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Command {
        let name_owned = name.to_string();
        let sink = Rc::clone(log);
        Command::new(
            name,
            Signature::new().add(Param::variadic("rest")),
            move |args| {
                sink.borrow_mut()
                    .push(format!("{name_owned}({})", args.seq("rest").join(",")));
                Ok(None)
            },
        )
        .try_build()
        .unwrap()
    }

    #[test]
    fn dispatch_by_insertion_order_lookup() {
        // Setup
        let log = Rc::new(RefCell::new(Vec::default()));
        let command = subcommands([
            ("one", leaf("first", &log)),
            ("two", leaf("second", &log)),
        ])
        .try_build()
        .unwrap();
        let interface = InMemoryInterface::default();

        // Execute
        command
            .execute_mode_with(Mode::Execute, &["two", "a", "b"], &interface)
            .unwrap();

        // Verify
        assert_eq!(*log.borrow(), vec!["second(a,b)".to_string()]);
    }

    #[test]
    fn nested_delegators_descend_for_completion() {
        // Setup: a delegator whose children are themselves delegators, as in
        // a `tool auto one ...` layout.
        let log = Rc::new(RefCell::new(Vec::default()));
        let inner = subcommands([
            ("one", leaf("first", &log)),
            ("two", leaf("second", &log)),
            ("on1", leaf("third", &log)),
        ])
        .try_build()
        .unwrap();
        let command = subcommands([("auto", inner)]).try_build().unwrap();

        // Execute: completing past 'auto' consults the nested delegator.
        let interface = InMemoryInterface::default();
        command
            .execute_mode_with(Mode::Complete("o"), &["auto"], &interface)
            .unwrap();

        // Verify
        assert_eq!(interface.consume_message(), "one\non1");

        // Execute: at the root, the outer choice list answers.
        let interface = InMemoryInterface::default();
        command
            .execute_mode_with(Mode::Complete(""), &[], &interface)
            .unwrap();

        // Verify
        assert_eq!(interface.consume_message(), "auto");
    }

    #[test]
    fn nested_delegators_descend_for_help() {
        // Setup
        let log = Rc::new(RefCell::new(Vec::default()));
        let inner = subcommands([("one", leaf("first", &log))])
            .try_build()
            .unwrap();
        let command = subcommands([("auto", inner)])
            .prog("tool")
            .try_build()
            .unwrap();
        let interface = InMemoryInterface::default();

        // Execute
        let code = command
            .execute_mode_with(Mode::Execute, &["auto", "one", "--help"], &interface)
            .unwrap_err();

        // Verify: two levels of descent compose the program name.
        assert_eq!(code, codes::HELP);
        assert_contains!(interface.consume_message(), "Usage: tool auto one");
    }

    #[test]
    fn delegate_as_composes_prog() {
        // Setup
        let log = Rc::new(RefCell::new(Vec::default()));
        let child = leaf("child", &log);
        let dispatch = Dispatch::delegate_as("sub", &child, ["x"]);

        // Verify
        match dispatch {
            Dispatch::Delegate(delegation) => {
                assert_eq!(delegation.child_prog("parent"), "parent sub");
                assert_eq!(delegation.argv(), &["x".to_string()]);
            }
            Dispatch::NoMatch => panic!("expected a delegation"),
        }
    }

    #[test]
    fn delegate_without_key_uses_child_name() {
        // Setup
        let log = Rc::new(RefCell::new(Vec::default()));
        let child = leaf("child", &log);
        let dispatch = Dispatch::delegate(&child, Vec::<String>::default());

        // Verify
        match dispatch {
            Dispatch::Delegate(delegation) => {
                assert_eq!(delegation.child_prog("parent"), "child");
            }
            Dispatch::NoMatch => panic!("expected a delegation"),
        }
    }
}
