//! The eyes (§4.2): a category-code-sensitive lexer turning a character
//! source into [`Token`]s.
//!
//! Grounded on `zonr-reTeX`'s `Lexer`
//! (`examples/other_examples/6feeeeed_zonr-reTeX__crates-retex-lex-src-lexer.rs.rs`):
//! the same `^^` preprocessing step (two-hex-digit and single-character
//! forms), the same escape/parameter/comment handling, generalised from a
//! fixed byte-oriented `CategoryCodeTable` to the mutable, per-
//! [`Environment`] `char -> Category` table, and from `TokenKind` tags over
//! byte slices to the richer [`Token`] union.
//!
//! The lexer is a small state machine over three reading states — `N`ew
//! line, `M`id line, `S`kip blanks — exactly as described in the TeXbook's
//! account of TeX's own eyes.

use crate::category::Category;
use crate::chars::{CharStream, Position};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::token::Token;

/// The eyes' internal reading state (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadingState {
    /// Just started, or just swallowed an end-of-line: a blank line from
    /// here produces `\par`.
    NewLine,
    /// In the middle of a line: a space produces a token.
    MidLine,
    /// Skipping blanks, e.g. right after a control word or a control space:
    /// spaces (and ignored characters) are swallowed with no token.
    SkipBlanks,
}

fn is_lower_hex_digit(c: char) -> bool {
    c.is_ascii_digit() || ('a'..='f').contains(&c)
}

fn hex_value(c: char) -> u32 {
    if let Some(d) = c.to_digit(10) {
        d
    } else {
        10 + (c as u32 - 'a' as u32)
    }
}

/// Lexes one character source into tokens, consulting a (mutable,
/// externally-owned) [`Environment`] for category codes at lex time.
#[derive(Debug, Clone)]
pub struct Eyes {
    stream: CharStream,
    state: ReadingState,
}

impl Eyes {
    /// Build a fresh lexer over `stream`, starting in the new-line state (a
    /// blank first line would produce `\par`, matching a file that begins
    /// with an empty line).
    #[must_use]
    pub fn new(stream: CharStream) -> Self {
        Self { stream, state: ReadingState::NewLine }
    }

    /// The position of the next character this lexer would read.
    #[must_use]
    pub fn position(&self) -> Position {
        self.stream.position()
    }

    /// True if the underlying character source is exhausted.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.stream.peek_char().is_none()
    }

    /// Decode the next *logical* character starting at the stream's current
    /// position, and how many *raw* characters it consumes — 1 normally, 2
    /// for a `\r\n` pair collapsed to a single `\n`, 3 for the single-
    /// character `^^` form, 4 for the two-lowercase-hex-digit form.
    /// Consults `env` because the `^^` rule requires the current and next
    /// raw character to both carry [`Category::Superscript`].
    fn decode_next(&self, env: &Environment) -> Option<(char, usize)> {
        let c0 = self.stream.peek_char()?;

        if c0 == '\r' {
            return Some(('\n', if self.stream.peek_nth(1) == Some('\n') { 2 } else { 1 }));
        }

        if env.category(c0) == Category::Superscript {
            if let Some(c1) = self.stream.peek_nth(1) {
                if c1 == c0 && env.category(c1) == Category::Superscript {
                    if let (Some(h1), Some(h2)) = (self.stream.peek_nth(2), self.stream.peek_nth(3)) {
                        if is_lower_hex_digit(h1) && is_lower_hex_digit(h2) {
                            let code = (hex_value(h1) << 4) | hex_value(h2);
                            if let Some(decoded) = char::from_u32(code) {
                                // Canonicalize a decoded carriage return to
                                // '\n', the one character this lexer treats
                                // as end-of-line (raw \r\n is collapsed the
                                // same way below).
                                return Some((if decoded == '\r' { '\n' } else { decoded }, 4));
                            }
                        }
                    }
                    if let Some(c2) = self.stream.peek_nth(2) {
                        let raw = c2 as u32;
                        if raw < 128 {
                            let code = if raw >= 64 { raw - 64 } else { raw + 64 };
                            if let Some(decoded) = char::from_u32(code) {
                                return Some((if decoded == '\r' { '\n' } else { decoded }, 3));
                            }
                        }
                    }
                }
            }
        }

        Some((c0, 1))
    }

    fn peek_logical(&self, env: &Environment) -> Option<char> {
        self.decode_next(env).map(|(c, _)| c)
    }

    /// The category the next logical character would lex with, without
    /// consuming it. Used by the mouth to find the `EndOfLine` boundary an
    /// `\endinput` in progress is waiting for (§4.3.1), since a consumed
    /// `EndOfLine` character never itself becomes a token (it is folded into
    /// `\par`, a space, or nothing, depending on reading state).
    #[must_use]
    pub fn peek_category(&self, env: &Environment) -> Option<Category> {
        self.peek_logical(env).map(|c| env.category(c))
    }

    /// Consume one logical character without producing a token. Used to
    /// discard the `EndOfLine` that closes an `\endinput`-flagged level.
    pub fn discard_one(&mut self, env: &Environment) {
        self.read_logical(env);
    }

    /// Consume and return one logical character, with the position of its
    /// first raw character.
    fn read_logical(&mut self, env: &Environment) -> Option<(Position, char)> {
        let (decoded, raw_len) = self.decode_next(env)?;
        let mut first = None;
        for _ in 0..raw_len {
            let (pos, _) = self.stream.next()?;
            first.get_or_insert(pos);
        }
        Some((first?, decoded))
    }

    /// Discard raw characters up to and including the next physical
    /// end-of-line (handling `\r\n` as one line terminator), for `%`
    /// comments, which discard the rest of the line verbatim.
    fn skip_to_eol(&mut self) {
        while let Some((_, c)) = self.stream.next() {
            if c == '\r' {
                if self.stream.peek_char() == Some('\n') {
                    self.stream.next();
                }
                break;
            }
            if c == '\n' {
                break;
            }
        }
    }

    /// Read the control sequence name that follows an escape character
    /// already consumed at `pos`. Returns the name, whether it came from an
    /// active character (always `false` here — active characters are
    /// lexed directly, not via an escape), and the reading state to enter.
    fn read_control_sequence(&mut self, env: &Environment) -> (String, ReadingState) {
        let Some((_, first)) = self.read_logical(env) else {
            return (String::new(), ReadingState::MidLine);
        };
        if env.category(first) == Category::Letter {
            let mut name = String::new();
            name.push(first);
            while let Some(c) = self.peek_logical(env) {
                if env.category(c) == Category::Letter {
                    self.read_logical(env);
                    name.push(c);
                } else {
                    break;
                }
            }
            (name, ReadingState::SkipBlanks)
        } else {
            // Exiting a control-sequence name always puts the eyes in state
            // S, whether the name was a control word (above) or here, a
            // single control symbol such as `\@` or a control space `\ `.
            (first.to_string(), ReadingState::SkipBlanks)
        }
    }

    /// Lex and return the next token, or `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Lex`] when an [`Category::Invalid`]-category
    /// character is encountered (§5 "Lex error").
    pub fn next_token(&mut self, env: &mut Environment) -> Result<Option<Token>> {
        loop {
            let Some(c) = self.peek_logical(env) else {
                return Ok(None);
            };
            let pos = self.stream.position();
            let category = env.category(c);

            match category {
                Category::Ignored => {
                    self.read_logical(env);
                }
                Category::Space => {
                    self.read_logical(env);
                    match self.state {
                        ReadingState::NewLine | ReadingState::SkipBlanks => {}
                        ReadingState::MidLine => {
                            self.state = ReadingState::SkipBlanks;
                            return Ok(Some(Token::character(' ', Category::Space, pos)));
                        }
                    }
                }
                Category::EndOfLine => {
                    self.read_logical(env);
                    let produced = match self.state {
                        ReadingState::NewLine => {
                            Some(Token::control_sequence("par", false, pos))
                        }
                        ReadingState::MidLine => Some(Token::character(' ', Category::Space, pos)),
                        ReadingState::SkipBlanks => None,
                    };
                    self.state = ReadingState::NewLine;
                    if let Some(token) = produced {
                        return Ok(Some(token));
                    }
                }
                Category::Comment => {
                    self.skip_to_eol();
                    self.state = ReadingState::NewLine;
                }
                Category::Escape => {
                    self.read_logical(env);
                    let (name, next_state) = self.read_control_sequence(env);
                    self.state = next_state;
                    return Ok(Some(Token::control_sequence(name, false, pos)));
                }
                Category::Parameter => {
                    self.read_logical(env);
                    self.state = ReadingState::MidLine;
                    if let Some(d) = self.peek_logical(env) {
                        if let Some(n) = d.to_digit(10).filter(|n| (1..=9).contains(n)) {
                            self.read_logical(env);
                            return Ok(Some(Token::parameter(n as u8, pos)));
                        }
                    }
                    return Ok(Some(Token::character('#', Category::Parameter, pos)));
                }
                Category::Active => {
                    self.read_logical(env);
                    // Same automaton row as Escape: emitting an active
                    // control sequence always moves to S, in every starting
                    // state.
                    self.state = ReadingState::SkipBlanks;
                    return Ok(Some(Token::control_sequence(c.to_string(), true, pos)));
                }
                Category::Invalid => {
                    self.read_logical(env);
                    return Err(Error::lex(pos, format!("invalid character '{c}'")));
                }
                Category::BeginGroup
                | Category::EndGroup
                | Category::MathShift
                | Category::AlignTab
                | Category::Superscript
                | Category::Subscript
                | Category::Letter
                | Category::Other => {
                    self.read_logical(env);
                    self.state = ReadingState::MidLine;
                    return Ok(Some(Token::character(c, category, pos)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::SourceId;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut env = Environment::new();
        let mut eyes = Eyes::new(CharStream::new(SourceId(0), "<test>", source));
        let mut out = Vec::new();
        while let Some(tok) = eyes.next_token(&mut env).unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn control_word_skips_trailing_spaces() {
        let toks = lex_all("\\foo   bar");
        assert_eq!(toks.len(), 4);
        assert!(toks[0].is_primitive_named("foo"));
        // "bar" lexes as three letter tokens, no leading space token.
        assert!(matches!(&toks[1], Token::Character { value: 'b', .. }));
    }

    #[test]
    fn control_symbol_enters_skip_blanks() {
        let toks = lex_all("\\@ x");
        assert_eq!(toks.len(), 2);
        assert!(toks[0].is_primitive_named("@"));
        // Exiting a control-sequence name always enters state S (even for a
        // control symbol), so the space after `\@` is swallowed rather than
        // re-emitted.
        assert!(matches!(&toks[1], Token::Character { value: 'x', .. }));
    }

    #[test]
    fn control_space_swallows_following_spaces() {
        let toks = lex_all("\\   x");
        assert!(toks[0].is_primitive_named(" "));
        assert!(matches!(&toks[1], Token::Character { value: 'x', .. }));
    }

    #[test]
    fn active_character_becomes_control_sequence() {
        let toks = lex_all("~");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Token::ControlSequence { name, active: true, .. } if name == "~"));
    }

    #[test]
    fn comment_discards_to_end_of_line() {
        let toks = lex_all("a% comment\nb");
        assert_eq!(toks.len(), 2);
        assert!(matches!(&toks[0], Token::Character { value: 'a', .. }));
        assert!(matches!(&toks[1], Token::Character { value: 'b', .. }));
    }

    #[test]
    fn blank_line_produces_par() {
        let toks = lex_all("a\n\nb");
        assert_eq!(toks.len(), 3);
        assert!(matches!(&toks[0], Token::Character { value: 'a', .. }));
        assert!(toks[1].is_par());
        assert!(matches!(&toks[2], Token::Character { value: 'b', .. }));
    }

    #[test]
    fn midline_eol_produces_single_space() {
        let toks = lex_all("ab\ncd");
        assert_eq!(toks.len(), 5);
        assert!(matches!(&toks[2], Token::Character { value: ' ', category: Category::Space, .. }));
    }

    #[test]
    fn parameter_digit_forms_parameter_token() {
        let toks = lex_all("#1#9#0");
        assert!(matches!(&toks[0], Token::Parameter { n: 1, .. }));
        assert!(matches!(&toks[1], Token::Parameter { n: 9, .. }));
        // #0 is not a valid parameter reference; # and 0 lex separately.
        assert!(matches!(&toks[2], Token::Character { value: '#', category: Category::Parameter, .. }));
        assert!(matches!(&toks[3], Token::Character { value: '0', .. }));
    }

    #[test]
    fn caret_notation_two_hex_digits() {
        let toks = lex_all("^^41");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Token::Character { value: 'A', .. }));
    }

    #[test]
    fn caret_notation_single_character_form() {
        // ^^M is carriage return's single-char encoding (M=77, 77-64=13=\r -> collapses to \n as EndOfLine).
        let toks = lex_all("a^^Mb");
        assert_eq!(toks.len(), 3);
        assert!(matches!(&toks[1], Token::Character { value: ' ', category: Category::Space, .. }));
    }

    #[test]
    fn invalid_category_is_a_lex_error() {
        let mut env = Environment::new();
        let mut eyes = Eyes::new(CharStream::new(SourceId(0), "<test>", "\u{7f}"));
        assert!(eyes.next_token(&mut env).is_err());
    }

    proptest::proptest! {
        // §8 "Category-at-lex": every emitted `Character(c, cat)` token
        // carries the category `c` had in the environment *at lex time* —
        // here, since nothing in these sources ever reassigns a `\catcode`,
        // that is simply `env.category(c)` evaluated once up front.
        #[test]
        fn character_tokens_carry_their_catcode_at_lex_time(s in "[a-zA-Z0-9]{0,12}") {
            let env = Environment::new();
            let expected: Vec<Category> = s.chars().map(|c| env.category(c)).collect();
            let toks = lex_all(&s);
            let mut idx = 0;
            for tok in &toks {
                if let Token::Character { category, .. } = tok {
                    proptest::prop_assert_eq!(*category, expected[idx]);
                    idx += 1;
                }
            }
        }
    }
}
