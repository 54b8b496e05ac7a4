//! Token data model (§3 of the design): the tagged union the eyes produce
//! and the mouth rewrites.
//!
//! Grounded on the `Token`/`TokenKind` split in `zonr-reTeX`'s lexer
//! (`examples/other_examples/6feeeeed_zonr-reTeX__crates-retex-lex-src-lexer.rs.rs`),
//! generalised to the four-variant union (`Character`, `ControlSequence`,
//! `Parameter`, `Group`) this specification requires.

use crate::category::Category;
use crate::chars::Position;

/// A lexed or expanded token.
#[derive(Debug, Clone)]
pub enum Token {
    /// A character-code / category-code pair, carrying the category it had
    /// *at the moment the eyes emitted it*. Subsequent `\catcode` changes do
    /// not retroactively alter an already-lexed token.
    Character {
        /// The codepoint.
        value: char,
        /// The category it was lexed with.
        category: Category,
        /// Where it was lexed from.
        pos: Position,
    },
    /// Either a `\name` escape-introduced sequence (`active = false`), or a
    /// single active character promoted to a control sequence
    /// (`active = true`, in which case `name` is that one character).
    ControlSequence {
        /// The control sequence's name (without the leading escape character).
        name: String,
        /// Whether this control sequence came from an active character.
        active: bool,
        /// Where it was lexed from.
        pos: Position,
    },
    /// A macro parameter reference `#n`, `1 <= n <= 9`.
    Parameter {
        /// The parameter number.
        n: u8,
        /// Where it was lexed from.
        pos: Position,
    },
    /// A balanced `{ ... }` group. Only synthesised while binding macro
    /// arguments (§4.3.4); the eyes never produce this variant directly.
    Group {
        /// The opening brace token (category [`Category::BeginGroup`]).
        open: Box<Token>,
        /// The tokens between the braces.
        body: Vec<Token>,
        /// The closing brace token (category [`Category::EndGroup`]).
        close: Box<Token>,
    },
}

impl Token {
    /// Build a [`Token::Character`].
    #[must_use]
    pub fn character(value: char, category: Category, pos: Position) -> Self {
        Token::Character { value, category, pos }
    }

    /// Build a [`Token::ControlSequence`].
    #[must_use]
    pub fn control_sequence(name: impl Into<String>, active: bool, pos: Position) -> Self {
        Token::ControlSequence {
            name: name.into(),
            active,
            pos,
        }
    }

    /// Build a [`Token::Parameter`].
    #[must_use]
    pub fn parameter(n: u8, pos: Position) -> Self {
        Token::Parameter { n, pos }
    }

    /// Build a [`Token::Group`] from a body and matching braces.
    #[must_use]
    pub fn group(open: Token, body: Vec<Token>, close: Token) -> Self {
        Token::Group {
            open: Box::new(open),
            body,
            close: Box::new(close),
        }
    }

    /// The position at which this token was (ultimately) lexed. For a
    /// [`Token::Group`], this is the position of the opening brace.
    #[must_use]
    pub fn position(&self) -> &Position {
        match self {
            Token::Character { pos, .. }
            | Token::ControlSequence { pos, .. }
            | Token::Parameter { pos, .. } => pos,
            Token::Group { open, .. } => open.position(),
        }
    }

    /// True for the non-active control sequence named `name`.
    #[must_use]
    pub fn is_primitive_named(&self, name: &str) -> bool {
        matches!(self, Token::ControlSequence { name: n, active: false, .. } if n == name)
    }

    /// True for `\par`, the one control sequence that a non-`\long` macro's
    /// undelimited or delimited argument must never swallow (§4.3.1, §4.3.4).
    #[must_use]
    pub fn is_par(&self) -> bool {
        self.is_primitive_named("par")
    }

    /// True if `self` and `other` are the control-sequence-name-and-activeness
    /// pair, or the character-code-and-category-code pair, TeX considers
    /// "the same token" for the purposes of delimiter matching and `\ifx`.
    /// Positions are deliberately ignored, matching TeX's own token equality
    /// (two tokens lexed at different places are still "the same" token).
    #[must_use]
    pub fn tex_eq(&self, other: &Token) -> bool {
        match (self, other) {
            (
                Token::Character { value: v1, category: c1, .. },
                Token::Character { value: v2, category: c2, .. },
            ) => v1 == v2 && c1 == c2,
            (
                Token::ControlSequence { name: n1, active: a1, .. },
                Token::ControlSequence { name: n2, active: a2, .. },
            ) => n1 == n2 && a1 == a2,
            (Token::Parameter { n: n1, .. }, Token::Parameter { n: n2, .. }) => n1 == n2,
            (
                Token::Group { open: o1, body: b1, close: c1 },
                Token::Group { open: o2, body: b2, close: c2 },
            ) => {
                o1.tex_eq(o2)
                    && c1.tex_eq(c2)
                    && b1.len() == b2.len()
                    && b1.iter().zip(b2.iter()).all(|(a, b)| a.tex_eq(b))
            }
            _ => false,
        }
    }

    /// The textual form used by `\string` and inside macro `\meaning`
    /// renderings: the single character for a [`Token::Character`] or an
    /// active [`Token::ControlSequence`], or `escapechar` followed by the
    /// name for a non-active one.
    #[must_use]
    pub fn string_form(&self, escapechar: Option<char>) -> String {
        match self {
            Token::Character { value, .. } => value.to_string(),
            Token::ControlSequence { name, active: true, .. } => name.clone(),
            Token::ControlSequence { name, active: false, .. } => {
                let mut s = String::new();
                if let Some(e) = escapechar {
                    s.push(e);
                }
                s.push_str(name);
                // A control word (more than one letter, or zero letters) is
                // followed by the space that terminated it when re-read by
                // TeX; a single-letter control word is not. We mirror
                // plain TeX's `\string` output, which never re-inserts that
                // trailing space, since the token stream itself carries it.
                s
            }
            Token::Parameter { n, .. } => format!("#{n}"),
            Token::Group { body, .. } => body
                .iter()
                .map(|t| t.string_form(escapechar))
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.tex_eq(other)
    }
}

impl Eq for Token {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::SourceId;

    fn pos() -> Position {
        Position::start(SourceId(0), "<test>")
    }

    #[test]
    fn tex_eq_ignores_position() {
        let a = Token::character('x', Category::Letter, pos());
        let mut other_pos = pos();
        other_pos.line = 42;
        let b = Token::character('x', Category::Letter, other_pos);
        assert_eq!(a, b);
    }

    #[test]
    fn tex_eq_distinguishes_category() {
        let a = Token::character('x', Category::Letter, pos());
        let b = Token::character('x', Category::Other, pos());
        assert_ne!(a, b);
    }

    #[test]
    fn string_form_uses_escapechar() {
        let cs = Token::control_sequence("foo", false, pos());
        assert_eq!(cs.string_form(Some('\\')), "\\foo");
        assert_eq!(cs.string_form(None), "foo");
    }

    #[test]
    fn string_form_active_is_bare_char() {
        let cs = Token::control_sequence("~", true, pos());
        assert_eq!(cs.string_form(Some('\\')), "~");
    }

    #[test]
    fn is_par_matches_only_nonactive_par() {
        assert!(Token::control_sequence("par", false, pos()).is_par());
        assert!(!Token::control_sequence("par", true, pos()).is_par());
        assert!(!Token::control_sequence("pars", false, pos()).is_par());
    }
}
