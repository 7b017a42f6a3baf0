//! Errors surfaced to the user before any summarization happens.

use thiserror::Error;

/// Input rejected by validation. Everything past validation degrades
/// gracefully instead of failing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// Nothing but whitespace was supplied.
    #[error("no text to summarize")]
    Empty,

    /// Input exceeds the configured character limit.
    #[error("text is too long: {chars} characters (limit {limit})")]
    TooLong { chars: usize, limit: usize },
}

/// Check `text` against the length bounds.
pub fn validate(text: &str, limit: usize) -> Result<(), InputError> {
    if text.trim().is_empty() {
        return Err(InputError::Empty);
    }
    let chars = text.chars().count();
    if chars > limit {
        return Err(InputError::TooLong { chars, limit });
    }
    Ok(())
}
