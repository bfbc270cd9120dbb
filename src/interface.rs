/// The output seam between the execution engine and the process.
///
/// Nothing inside the engine prints directly; routing everything through this
/// trait keeps the tri-modal execution paths testable.
pub trait UserInterface {
    /// Emit a message on the standard output path.
    fn print(&self, message: String);
    /// Emit a message on the error output path.
    fn print_error(&self, message: String);
}

/// The production interface: standard output and standard error.
#[derive(Default)]
pub struct ConsoleInterface {}

impl UserInterface for ConsoleInterface {
    fn print(&self, message: String) {
        println!("{message}");
    }

    fn print_error(&self, message: String) {
        eprintln!("{message}");
    }
}

#[cfg(any(test, feature = "unit_test"))]
pub mod testing {
    //! *Available using 'unit_test' crate feature only.*
    //! In-memory test doubles for the [`UserInterface`] seam.
    use super::UserInterface;
    use std::cell::RefCell;

    /// Captures interface output for verification.
    #[derive(Default)]
    pub struct InMemoryInterface {
        message: RefCell<Option<Vec<String>>>,
        error: RefCell<Option<Vec<String>>>,
    }

    impl UserInterface for InMemoryInterface {
        fn print(&self, message: String) {
            // Allows for print() to be called many times, concatenating the messages.
            let mut output = self.message.borrow_mut();

            match output.as_mut() {
                Some(messages) => messages.push(message),
                None => {
                    output.replace(vec![message]);
                }
            }
        }

        fn print_error(&self, message: String) {
            let mut output = self.error.borrow_mut();

            match output.as_mut() {
                Some(messages) => messages.push(message),
                None => {
                    output.replace(vec![message]);
                }
            }
        }
    }

    impl InMemoryInterface {
        /// Take the captured output: `(messages, errors)`, each joined by
        /// newlines.
        pub fn consume(self) -> (Option<String>, Option<String>) {
            let InMemoryInterface { message, error } = self;

            (
                message.take().map(|messages| messages.join("\n")),
                error.take().map(|errors| errors.join("\n")),
            )
        }

        /// Take the captured output, asserting nothing was printed on the
        /// error path.
        pub fn consume_message(self) -> String {
            let (message, error) = self.consume();
            assert_eq!(error, None);
            message.unwrap()
        }

        /// Take the captured output, asserting nothing was printed on the
        /// standard path.
        pub fn consume_error(self) -> String {
            let (message, error) = self.consume();
            assert_eq!(message, None);
            error.unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::InMemoryInterface;
    use super::*;

    #[test]
    fn in_memory_concatenates() {
        let interface = InMemoryInterface::default();
        interface.print("abc".to_string());
        interface.print("def".to_string());
        assert_eq!(interface.consume_message(), "abc\ndef");
    }

    #[test]
    fn in_memory_splits_paths() {
        let interface = InMemoryInterface::default();
        interface.print("out".to_string());
        interface.print_error("err".to_string());
        let (message, error) = interface.consume();
        assert_eq!(message, Some("out".to_string()));
        assert_eq!(error, Some("err".to_string()));
    }
}
