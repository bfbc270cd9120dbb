//! `fncli` derives a command line interface from a declared function
//! signature.
//!
//! Other crates ask you to describe the surface of your CLI; `fncli` asks you
//! to describe the *parameters of the function you want to run*, and derives
//! the surface from them. Declare the signature, wrap the callable, and the
//! framework supplies the rest: positional binding, `--flag`/`--noflag`
//! boolean pairs, valued options with choices and converters, variadic and
//! remainder capture, generated help, sub-command delegation, and shell tab
//! completion.
//!
//! ```no_run
//! use fncli::{Command, Param, Signature};
//!
//! // main(arg1, arg2='two', *rest, flag1=false)
//! let main = Command::new(
//!     "main",
//!     Signature::new()
//!         .add(Param::required("arg1"))
//!         .add(Param::optional("arg2", "two"))
//!         .add(Param::variadic("rest"))
//!         .add(Param::flag("flag1", false)),
//!     |args| {
//!         Ok(Some(format!(
//!             "arg1={} arg2={} rest={:?} flag1={}",
//!             args.str("arg1").unwrap(),
//!             args.str("arg2").unwrap(),
//!             args.seq("rest"),
//!             args.flag("flag1"),
//!         )))
//!     },
//! )
//! .build();
//!
//! main.execute();
//! ```
//!
//! ```console
//! $ main 123 456 789
//! arg1=123 arg2=456 rest=["789"] flag1=false
//!
//! $ main 123 --flag1
//! arg1=123 arg2=two rest=[] flag1=true
//!
//! $ main --help
//! Usage: main [OPTIONS] <arg1> [arg2] [rest]...
//! ...
//! ```
//!
//! # Execution modes
//!
//! Every invocation resolves to one of three behaviors: execute, help, or
//! complete. The mode is threaded explicitly through the call chain, so a
//! delegating command (see [`subcommands`] and [`Command::delegator`]) can
//! answer `git branch --help`-style requests with the help of the *selected*
//! child rather than its own.
//!
//! # Exit codes
//!
//! `0` success, `1` runtime or delegation failure, `2` usage error, `100`
//! help display (see [`codes`]).
#![deny(missing_docs)]
mod api;
mod builder;
pub mod codes;
mod complete;
mod errors;
mod extension;
mod interface;
mod model;
#[allow(missing_docs)]
pub mod prelude;

pub use api::{
    converters, subcommands, ArgSpec, Command, CommandBuilder, CompletionContext,
    CompletionValidator, Converter, Delegation, Dispatch, Mode,
};
pub use builder::Bindings;
pub use complete::{
    bash_completion_script, fuzzy_path_validator, prefix_validator, substring_validator,
    CompletionBackend, CompletionRequest, EnvBackend, COMPLETE_VAR, IFS_VAR,
};
pub use errors::{CommandError, ConfigError, Handled};
pub use extension::{ArgsFile, BuildState, DisallowAbbrev, Extension, SyntheticFlag, Version};
pub use interface::{ConsoleInterface, UserInterface};
pub use model::{Param, ParamKind, Signature, Value, REMAINDER_NAME};

#[cfg(any(test, feature = "unit_test"))]
pub use interface::testing;

#[cfg(test)]
pub(crate) mod test {
    macro_rules! assert_contains {
        ($base:expr, $sub:expr) => {{
            let base = &$base;
            assert!(
                base.contains($sub),
                "'{b}' does not contain '{s}'",
                b = base,
                s = $sub,
            );
        }};
    }

    pub(crate) use assert_contains;
}
