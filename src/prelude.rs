//! Traits which, typically, may be imported without concern: `use fncli::prelude::*`.

pub use crate::complete::CompletionBackend;
pub use crate::extension::Extension;
pub use crate::interface::UserInterface;
