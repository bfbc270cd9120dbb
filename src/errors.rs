use thiserror::Error;

/// An error detected while registering a command.
///
/// Configuration errors are always surfaced at registration time
/// ([`Command::try_build`](crate::Command)), never deferred to parse time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// An error raised by a wrapped callable, or by the execution engine on its
/// behalf.
///
/// The recognized variants are printed as a single line by the default error
/// handler; anything routed through [`CommandError::Other`] is declined by the
/// default handler and falls through to the generic fatal path, which reports
/// the full diagnostic chain.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A recognized application failure, printed as `Error: <message>`.
    #[error("{0}")]
    Runtime(String),
    /// A delegating command found no child for the requested dispatch.
    #[error("No matching delegate")]
    NoMatchingDelegate,
    /// User-initiated cancellation, printed as `^C`.
    #[error("interrupted")]
    Interrupt,
    /// Any other error; carries full diagnostic context.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl CommandError {
    /// Create a recognized runtime failure.
    pub fn runtime(message: impl Into<String>) -> Self {
        CommandError::Runtime(message.into())
    }

    /// Wrap an arbitrary error, preserving its diagnostic context.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        CommandError::Other(Box::new(error))
    }
}

/// The verdict of an error handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// The handler dealt with the error; terminate with this exit code.
    Exit(i32),
    /// The handler does not recognize the error; fall through to the generic
    /// fatal path.
    Declined,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError("parameter 'x' is broken".to_string());
        assert_eq!(error.to_string(), "parameter 'x' is broken");
    }

    #[test]
    fn command_error_display() {
        assert_eq!(
            CommandError::runtime("subprocess exited 3").to_string(),
            "subprocess exited 3"
        );
        assert_eq!(
            CommandError::NoMatchingDelegate.to_string(),
            "No matching delegate"
        );
        assert_eq!(CommandError::Interrupt.to_string(), "interrupted");
    }

    #[test]
    fn other_preserves_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = CommandError::other(inner);
        assert_eq!(error.to_string(), "gone");
    }
}
