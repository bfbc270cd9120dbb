//! The seam between candidate generation and the shell's completion
//! protocol.
//!
//! The execution engine produces candidate strings; a [`CompletionBackend`]
//! detects completion requests and emits the candidates in whatever framing
//! the shell integration expects. The default backend speaks the classic
//! `complete -C` protocol: the shell re-runs the program with `COMP_LINE` and
//! `COMP_POINT` in the environment and reads candidates from its standard
//! output.

use std::io::Write;

/// Keep candidates that start with the typed prefix. The default validator.
pub fn prefix_validator(candidate: &str, prefix: &str) -> bool {
    candidate.starts_with(prefix)
}

/// Keep candidates that contain the typed prefix, case-insensitively.
pub fn substring_validator(candidate: &str, prefix: &str) -> bool {
    candidate.to_lowercase().contains(&prefix.to_lowercase())
}

/// Keep path candidates whose segments each start with the corresponding
/// typed segment, case-insensitively. `s/ba` matches `src/banner.rs`.
pub fn fuzzy_path_validator(candidate: &str, prefix: &str) -> bool {
    candidate
        .split('/')
        .zip(prefix.split('/'))
        .all(|(full, sub)| full.to_lowercase().starts_with(&sub.to_lowercase()))
}

/// A parsed completion request: the tokens already typed and the partial
/// word under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// The argument tokens before the word being completed, program name
    /// excluded.
    pub args: Vec<String>,
    /// The partial word under the cursor; empty when completing after a
    /// space.
    pub prefix: String,
}

/// The external system that detects completion requests and renders
/// candidate strings into the shell's tab-completion protocol.
pub trait CompletionBackend {
    /// Inspect the environment for a completion request.
    fn request(&self) -> Option<CompletionRequest>;
    /// Emit the candidates for the shell to consume.
    fn emit(&self, candidates: &[String]);
}

/// The environment variable that marks an invocation as a completion
/// request.
pub const COMPLETE_VAR: &str = "_FNCLI_COMPLETE";

/// The environment variable overriding the candidate separator (default
/// newline).
pub const IFS_VAR: &str = "_FNCLI_IFS";

/// The default backend: `complete -C` environment protocol on stdin/stdout.
#[derive(Default)]
pub struct EnvBackend {}

impl EnvBackend {
    fn line(&self) -> Option<String> {
        std::env::var(COMPLETE_VAR).ok()?;
        let line = std::env::var("COMP_LINE").ok()?;
        let point = std::env::var("COMP_POINT")
            .ok()
            .and_then(|point| point.parse::<usize>().ok())
            .unwrap_or(line.len());
        Some(line.get(..point).unwrap_or(&line).to_string())
    }
}

impl CompletionBackend for EnvBackend {
    fn request(&self) -> Option<CompletionRequest> {
        self.line().map(|line| split_line(&line))
    }

    fn emit(&self, candidates: &[String]) {
        let separator = std::env::var(IFS_VAR).unwrap_or_else(|_| "\n".to_string());
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", candidates.join(&separator));
        let _ = stdout.flush();
    }
}

/// Split the portion of the command line before the cursor into already-typed
/// arguments and the partial word being completed.
pub(crate) fn split_line(line: &str) -> CompletionRequest {
    let mut words: Vec<String> = line.split_whitespace().map(|w| w.to_string()).collect();
    if words.is_empty() {
        return CompletionRequest {
            args: Vec::default(),
            prefix: String::default(),
        };
    }
    // words[0] is the program itself.
    words.remove(0);

    if line.ends_with(char::is_whitespace) || words.is_empty() {
        CompletionRequest {
            args: words,
            prefix: String::default(),
        }
    } else {
        let prefix = words.pop().unwrap_or_default();
        CompletionRequest {
            args: words,
            prefix,
        }
    }
}

/// The shell snippet registering a program for tab completion.
///
/// Evaluate the output in a bash session (or place it in a profile):
/// ```console
/// $ eval "$(demo_completion --print-completion-script)"
/// ```
pub fn bash_completion_script(prog: &str) -> String {
    format!("complete -o nospace -C \"{COMPLETE_VAR}=1 {prog}\" {prog}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("prog", vec![], "")]
    #[case("prog ", vec![], "")]
    #[case("prog on", vec![], "on")]
    #[case("prog auto ", vec!["auto"], "")]
    #[case("prog auto o", vec!["auto"], "o")]
    #[case("prog auto one 12", vec!["auto", "one"], "12")]
    fn split_line_words(
        #[case] line: &str,
        #[case] expected_args: Vec<&str>,
        #[case] expected_prefix: &str,
    ) {
        // Execute
        let request = split_line(line);

        // Verify
        assert_eq!(
            request.args,
            expected_args
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
        );
        assert_eq!(request.prefix, expected_prefix);
    }

    #[rstest]
    #[case("one", "o", true)]
    #[case("one", "n", false)]
    #[case("one", "", true)]
    #[case("One", "o", false)]
    fn prefix_cases(#[case] candidate: &str, #[case] prefix: &str, #[case] expected: bool) {
        assert_eq!(prefix_validator(candidate, prefix), expected);
    }

    #[rstest]
    #[case("chocolate", "OLA", true)]
    #[case("chocolate", "xyz", false)]
    fn substring_cases(#[case] candidate: &str, #[case] prefix: &str, #[case] expected: bool) {
        assert_eq!(substring_validator(candidate, prefix), expected);
    }

    #[rstest]
    #[case("src/banner.rs", "s/ba", true)]
    #[case("src/banner.rs", "sr/bx", false)]
    #[case("src/banner.rs", "SRC", true)]
    #[case("docs/guide.md", "d/g/x", true)] // extra prefix segments are not compared
    fn fuzzy_path_cases(#[case] candidate: &str, #[case] prefix: &str, #[case] expected: bool) {
        assert_eq!(fuzzy_path_validator(candidate, prefix), expected);
    }

    #[test]
    fn bash_script_names_program() {
        let script = bash_completion_script("tool");
        assert_eq!(script, "complete -o nospace -C \"_FNCLI_COMPLETE=1 tool\" tool\n");
    }
}
