//! The engine (§2): wires the character source through the eyes and the
//! mouth into a single pull-based pipeline, and carries the handful of
//! ambient options (§10.2) a real CLI needs to configure that pipeline
//! before it starts reading.
//!
//! Mirrors the teacher's CLI `execute()` pattern of building a
//! `Token::lexer(source)` once per file and handing it to whichever
//! consumer (highlighter, formatter, checker) wants it; generalised here to
//! a three-stage pipeline (character source → eyes → mouth) instead of the
//! teacher's single-stage logos lexer.

use crate::chars::{CharStream, FileResolver};
use crate::environment::Environment;
use crate::error::Result;
use crate::mouth::Mouth;
use crate::token::Token;

/// Options that configure an [`Engine`] before it starts reading, analogous
/// to IniTeX's handful of preset internal parameters. TeX itself has no
/// external configuration file; this struct is this crate's equivalent of
/// one.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Initial `\escapechar`. `None` suppresses the escape character
    /// entirely in rendered output (TeX's convention for a negative
    /// `\escapechar`).
    pub escapechar: Option<char>,
    /// The job name `\jobname` expands to.
    pub job_name: String,
    /// Recursion guard: `Error::Internal` is raised once a single
    /// `next_expanded` call performs more than this many expansion steps.
    /// Defaults to 10,000, the same order of magnitude as TeX82's own
    /// "TeX capacity exceeded" guard.
    pub max_expansions: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            escapechar: Some('\\'),
            job_name: "texput".to_string(),
            max_expansions: 10_000,
        }
    }
}

/// The full eyes+mouth pipeline over one top-level input source.
pub struct Engine {
    mouth: Mouth,
}

impl Engine {
    /// Build an engine reading `stream` as its top-level source, resolving
    /// any `\input` through `resolver`, configured by `options`.
    #[must_use]
    pub fn new(stream: CharStream, resolver: Box<dyn FileResolver>, options: EngineOptions) -> Self {
        let mut env = Environment::new();
        env.set_escapechar(options.escapechar, true);
        let mouth = Mouth::new(stream, env, resolver, options.job_name, options.max_expansions);
        Self { mouth }
    }

    /// The environment this engine's mouth reads and mutates: category
    /// codes, bindings, registers.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        self.mouth.environment()
    }

    /// Read the next token straight from the eyes, performing no expansion
    /// — used by the `parse` subcommand to inspect category-code
    /// assignments before any macro runs.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.mouth.next_raw()
    }

    /// Read the next fully expanded primitive token — used by the `expand`
    /// subcommand and by anything that wants the mouth's real output.
    pub fn next_expanded(&mut self) -> Result<Option<Token>> {
        self.mouth.next_expanded()
    }

    /// Consume the remainder of the input as raw (unexpanded) tokens.
    pub fn into_raw_tokens(self) -> RawTokens {
        RawTokens { done: false, engine: self }
    }

    /// Consume the remainder of the input as fully expanded tokens.
    pub fn into_expanded_tokens(self) -> ExpandedTokens {
        ExpandedTokens { done: false, engine: self }
    }
}

/// An [`Engine`] driven to completion as an iterator of raw (eyes-only)
/// tokens. Stops (returning `None` afterwards) the first time an `Err` is
/// yielded, per §7's "user errors terminate the current token's production
/// and surface to the consumer; the stream is not automatically
/// resynchronised".
pub struct RawTokens {
    engine: Engine,
    done: bool,
}

impl Iterator for RawTokens {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.engine.next_token() {
            Ok(Some(t)) => Some(Ok(t)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// An [`Engine`] driven to completion as an iterator of fully expanded
/// tokens; see [`RawTokens`] for the same error-termination behaviour.
pub struct ExpandedTokens {
    engine: Engine,
    done: bool,
}

impl Iterator for ExpandedTokens {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.engine.next_expanded() {
            Ok(Some(t)) => Some(Ok(t)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::chars::SourceId;

    struct NullResolver;
    impl FileResolver for NullResolver {
        fn resolve(&self, name: &str) -> std::io::Result<(std::path::PathBuf, String)> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()))
        }
    }

    fn engine_for(source: &str) -> Engine {
        let stream = CharStream::new(SourceId(0), "<test>", source);
        Engine::new(stream, Box::new(NullResolver), EngineOptions::default())
    }

    #[test]
    fn raw_tokens_see_category_codes_unexpanded() {
        let engine = engine_for("\\def\\x{y}\\x");
        let toks: Vec<Token> = engine.into_raw_tokens().collect::<Result<_>>().unwrap();
        assert!(toks.iter().any(|t| t.is_primitive_named("def")));
        assert!(toks.iter().any(|t| t.is_primitive_named("x")));
    }

    #[test]
    fn expanded_tokens_run_macros() {
        let engine = engine_for("\\def\\x{y}\\x");
        let toks: Vec<Token> = engine.into_expanded_tokens().collect::<Result<_>>().unwrap();
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Token::Character { value: 'y', category: Category::Letter, .. }));
    }

    #[test]
    fn jobname_defaults_to_configured_value() {
        let mut engine = engine_for("\\jobname");
        let mut s = String::new();
        while let Some(Token::Character { value, .. }) = engine.next_expanded().unwrap() {
            s.push(value);
        }
        assert_eq!(s, "texput");
    }
}
