mod command;
mod delegate;
mod spec;

pub use command::{Command, CommandBuilder, Mode};
pub use delegate::{subcommands, Delegation, Dispatch};
pub use spec::{converters, ArgSpec, CompletionContext, CompletionValidator, Converter};
