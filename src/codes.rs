//! Process exit codes used by the execution engine.
//!
//! `HELP` is deliberately distinct from both `SUCCESS` and `FAILURE` so that
//! automated callers can tell "help was shown" apart from "command ran and
//! exited cleanly".

/// The command ran to completion.
pub const SUCCESS: i32 = 0;

/// A recognized or unrecognized runtime error (unless a custom handler chose
/// a different code).
pub const FAILURE: i32 = 1;

/// A command line usage error, reported by the parsing primitive.
pub const USAGE: i32 = 2;

/// Help text was displayed.
pub const HELP: i32 = 100;
