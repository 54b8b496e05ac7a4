//! Error and Result structures used all across this crate.

use crate::chars::Position;

/// Enumeration of all possible error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from reading and writing to IO (see [`std::io::Error`]).
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// Error from parsing category code.
    #[error("invalid category code (got '{0}', must be between 0 and 15 included)")]
    InvalidCategoryCode(String),

    /// Error from checking if `directory` exists and is a actually a directory.
    #[error("invalid directory (got '{0}', does not exist or is not a directory)")]
    InvalidDirectory(String),

    /// Error from checking if `filename` exists and is a actualla a file.
    #[error("invalid filename (got '{0}', does not exist or is not a file)")]
    InvalidFilename(String),

    /// Error raised by the eyes while lexing characters into tokens.
    #[error("at {pos}: {message}")]
    Lex {
        /// Position at which lexing failed.
        pos: Position,
        /// Human-readable explanation.
        message: String,
    },

    /// Error raised by the mouth while expanding tokens, or by the parser
    /// combinator core while matching a grammar production.
    ///
    /// This is the single consolidated "user error" shape called for by the
    /// design notes: a position, the token that was actually found (if any),
    /// the list of productions that would have been accepted there, and a
    /// human message.
    #[error("at {pos}: {}", render_expand_message(.message, .found, .expected))]
    Expand {
        /// Position at which expansion failed.
        pos: Position,
        /// Textual form of the offending token, if any.
        found: Option<String>,
        /// Productions that were expected at this position.
        expected: Vec<String>,
        /// Human-readable explanation (may be empty when `expected` suffices).
        message: String,
    },

    /// An invariant the engine otherwise proves unreachable was violated.
    ///
    /// Reaching this is a bug in `untex`, not malformed user input.
    #[error("internal error: {0}")]
    Internal(String),
}

fn render_expand_message(message: &str, found: &Option<String>, expected: &[String]) -> String {
    let mut s = String::new();
    if !message.is_empty() {
        s.push_str(message);
    }
    if let Some(found) = found {
        if !s.is_empty() {
            s.push_str("; ");
        }
        s.push_str("found ");
        s.push_str(found);
    }
    if !expected.is_empty() {
        if !s.is_empty() {
            s.push_str("; ");
        }
        s.push_str("expected one of: ");
        s.push_str(&expected.join(", "));
    }
    s
}

impl Error {
    /// Build an [`Error::Expand`] carrying no found token and no expectations,
    /// just a message. Most mouth-level user errors use this shortcut.
    pub fn expand(pos: Position, message: impl Into<String>) -> Self {
        Error::Expand {
            pos,
            found: None,
            expected: Vec::new(),
            message: message.into(),
        }
    }

    /// Build a [`Error::Lex`] error at the given position.
    pub fn lex(pos: Position, message: impl Into<String>) -> Self {
        Error::Lex {
            pos,
            message: message.into(),
        }
    }
}

/// Result type alias with error type defined above (see [`Error`]).
pub type Result<T> = std::result::Result<T, Error>;
