//! Shell quoting for commands built from model-supplied strings.

use codeflow_core::SandboxError;

/// Quote one word for `sh`.
pub fn quote(word: &str) -> Result<String, SandboxError> {
    shlex::try_quote(word)
        .map(|q| q.into_owned())
        .map_err(|e| SandboxError::InvalidInput(format!("cannot quote {word:?}: {e}")))
}

/// Quote and join several words with spaces.
pub fn join<'a>(words: impl IntoIterator<Item = &'a str>) -> Result<String, SandboxError> {
    shlex::try_join(words).map_err(|e| SandboxError::InvalidInput(e.to_string()))
}
