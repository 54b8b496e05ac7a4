//! The number lexer (§4.3.5): `spaces? sign* spaces? numeral space?`, the
//! numeral being an internal quantity, an integer constant (decimal, octal
//! `'`, hex `"`), or a char-token constant `` ` ``. Also the dimension reader
//! `\ifdim` needs, "lexing of dimensions" being explicitly in scope even
//! though the arithmetic glue performs on them is not (Non-goals).
//!
//! Grounded on the combinator core's `satisfy`/`many1` shape
//! (`crate::combinators`), reimplemented directly against [`Mouth`] rather
//! than through the generic `Parser<S, T>` type: number scanning needs to
//! interleave with full macro expansion (an internal quantity may itself be
//! produced by a macro), which the combinator core's pure `Stream` trait
//! does not model.

use crate::category::Category;
use crate::environment::Binding;
use crate::error::{Error, Result};
use crate::token::Token;

use super::Mouth;

impl Mouth {
    fn peek_char_token(&mut self) -> Result<Option<Token>> {
        self.next_expanded()
    }

    fn skip_optional_spaces(&mut self) -> Result<()> {
        loop {
            match self.peek_char_token()? {
                Some(Token::Character { value: ' ', category: Category::Space, .. }) => {}
                Some(other) => {
                    self.push_back(other);
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }

    fn read_sign(&mut self) -> Result<i64> {
        let mut sign = 1i64;
        loop {
            match self.peek_char_token()? {
                Some(Token::Character { value: '+', category: Category::Other, .. }) => {
                    self.skip_optional_spaces()?;
                }
                Some(Token::Character { value: '-', category: Category::Other, .. }) => {
                    sign = -sign;
                    self.skip_optional_spaces()?;
                }
                Some(other) => {
                    self.push_back(other);
                    break;
                }
                None => break,
            }
        }
        Ok(sign)
    }

    fn read_digits(&mut self, mut matches_digit: impl FnMut(char) -> Option<u32>, base: u32) -> Result<i64> {
        let mut value: i64 = 0;
        let mut any = false;
        loop {
            match self.peek_char_token()? {
                Some(Token::Character { value: c, .. }) if matches_digit(c).is_some() => {
                    any = true;
                    value = value * i64::from(base) + i64::from(matches_digit(c).unwrap());
                }
                Some(other) => {
                    self.push_back(other);
                    break;
                }
                None => break,
            }
        }
        if !any {
            return Err(Error::expand(
                self.environment_position(),
                "missing number, treated as zero",
            ));
        }
        Ok(value)
    }

    fn environment_position(&self) -> crate::chars::Position {
        self.levels.last().map(|l| l.eyes.position()).unwrap_or_else(|| {
            crate::chars::Position::start(crate::chars::SourceId(0), "<input>")
        })
    }

    fn consume_trailing_space(&mut self) -> Result<()> {
        match self.peek_char_token()? {
            Some(Token::Character { value: ' ', category: Category::Space, .. }) => Ok(()),
            Some(other) => {
                self.push_back(other);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn read_internal_quantity(&mut self, name: &str) -> Result<Option<i64>> {
        match self.environment().lookup(name).cloned() {
            Some(Binding::CountDef(idx)) => Ok(Some(self.environment().count(idx))),
            Some(Binding::DimenDef(idx)) => Ok(Some(self.environment().dimen(idx).0)),
            Some(Binding::SkipDef(idx)) => Ok(Some(self.environment().skip(idx))),
            Some(Binding::MuskipDef(idx)) => Ok(Some(self.environment().muskip(idx))),
            Some(Binding::CharDef(c)) => Ok(Some(i64::from(c as u32))),
            Some(Binding::MathCharDef(c)) => Ok(Some(i64::from(c))),
            _ => Ok(None),
        }
    }

}

/// Read one relation character (`<`, `=`, `>`) for `\ifnum`/`\ifdim`.
pub(super) fn read_relation(mouth: &mut Mouth) -> Result<char> {
    match mouth.peek_char_token()? {
        Some(Token::Character { value: c @ ('<' | '=' | '>'), category: Category::Other, .. }) => Ok(c),
        Some(other) => Err(Error::expand(other.position().clone(), "missing = or < or > in comparison")),
        None => Err(Error::expand(mouth.environment_position(), "missing relation")),
    }
}

pub(super) fn read_number(mouth: &mut Mouth) -> Result<i64> {
    mouth.skip_optional_spaces()?;
    let sign = mouth.read_sign()?;
    let tok = mouth
        .peek_char_token()?
        .ok_or_else(|| Error::expand(mouth.environment_position(), "missing number, treated as zero"))?;
    let value = match &tok {
        Token::Character { value: '`', category: Category::Other, .. } => {
            let t = mouth.next_raw()?.ok_or_else(|| {
                Error::expand(mouth.environment_position(), "missing character after `")
            })?;
            let code = match &t {
                Token::Character { value, .. } => u32::from(*value),
                Token::ControlSequence { name, .. } if name.chars().count() == 1 => {
                    u32::from(name.chars().next().unwrap())
                }
                other => {
                    return Err(Error::expand(
                        other.position().clone(),
                        "improper alphabetic constant",
                    ));
                }
            };
            mouth.consume_trailing_space()?;
            i64::from(code)
        }
        Token::Character { value: '\'', category: Category::Other, .. } => {
            mouth.read_digits(|c| c.to_digit(8), 8)?
        }
        Token::Character { value: '"', category: Category::Other, .. } => {
            mouth.read_digits(|c| c.to_digit(16).filter(|_| c.is_ascii_digit() || c.is_ascii_uppercase()), 16)?
        }
        Token::Character { value, category: Category::Other, .. } if value.is_ascii_digit() => {
            mouth.push_back(tok.clone());
            mouth.read_digits(|c| c.to_digit(10), 10)?
        }
        Token::ControlSequence { name, .. } => {
            let name = name.clone();
            match mouth.read_internal_quantity(&name)? {
                Some(v) => v,
                None => return Err(Error::expand(tok.position().clone(), "missing number, treated as zero")),
            }
        }
        _ => return Err(Error::expand(tok.position().clone(), "missing number, treated as zero")),
    };
    // The alphabetic-constant branch (`` ` ``) already consumed its own
    // trailing space above; every other radix still has one optional space
    // to swallow here, per the number grammar's single `space?` tail.
    if !matches!(&tok, Token::Character { value: '`', .. }) {
        mouth.consume_trailing_space()?;
    }
    Ok(sign * value)
}

const SP_PER_PT: f64 = 65536.0;

fn unit_factor(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "pt" => Some(1.0),
        "sp" => Some(1.0 / SP_PER_PT),
        "in" => Some(72.27),
        "pc" => Some(12.0),
        "bp" => Some(72.27 / 72.0),
        "cm" => Some(72.27 / 2.54),
        "mm" => Some(72.27 / 25.4),
        "dd" => Some(1238.0 / 1157.0),
        "cc" => Some(12.0 * 1238.0 / 1157.0),
        "em" | "ex" => Some(10.0),
        _ => None,
    }
}

pub(super) fn read_dimen(mouth: &mut Mouth) -> Result<i64> {
    mouth.skip_optional_spaces()?;
    let sign = mouth.read_sign()?;
    mouth.skip_optional_spaces()?;

    // Integer part, as plain digits (the internal-quantity / backtick /
    // radix forms are not meaningful dimension numerals and are left out of
    // scope, consistent with "glue arithmetic beyond lexing of dimensions"
    // being excluded).
    let mut whole: i64 = 0;
    let mut any_digit = false;
    loop {
        match mouth.peek_char_token()? {
            Some(Token::Character { value, category: Category::Other, .. }) if value.is_ascii_digit() => {
                any_digit = true;
                whole = whole * 10 + i64::from(value.to_digit(10).unwrap());
            }
            Some(other) => {
                mouth.push_back(other);
                break;
            }
            None => break,
        }
    }
    let mut frac = 0.0f64;
    if let Some(Token::Character { value: '.', category: Category::Other, .. }) = mouth.peek_char_token()? {
        let mut scale = 0.1f64;
        loop {
            match mouth.peek_char_token()? {
                Some(Token::Character { value, category: Category::Other, .. }) if value.is_ascii_digit() => {
                    frac += f64::from(value.to_digit(10).unwrap()) * scale;
                    scale *= 0.1;
                }
                Some(other) => {
                    mouth.push_back(other);
                    break;
                }
                None => break,
            }
        }
        any_digit = true;
    }
    if !any_digit {
        return Err(Error::expand(mouth.environment_position(), "missing number, treated as zero"));
    }
    mouth.skip_optional_spaces()?;
    let mut unit = String::new();
    for _ in 0..2 {
        match mouth.peek_char_token()? {
            Some(Token::Character { value, .. }) if value.is_ascii_alphabetic() => unit.push(value),
            Some(other) => {
                mouth.push_back(other);
                break;
            }
            None => break,
        }
    }
    let factor = unit_factor(&unit)
        .ok_or_else(|| Error::expand(mouth.environment_position(), format!("illegal unit of measure ({unit})")))?;
    mouth.consume_trailing_space()?;
    let points = (whole as f64 + frac) * factor;
    let sp = (points * SP_PER_PT).round() as i64;
    Ok(sign * sp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::{CharStream, SourceId};
    use crate::environment::Environment;

    struct NullResolver;
    impl crate::chars::FileResolver for NullResolver {
        fn resolve(&self, name: &str) -> std::io::Result<(std::path::PathBuf, String)> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()))
        }
    }

    fn number_of(source: &str) -> i64 {
        let stream = CharStream::new(SourceId(0), "<test>", source);
        let mut mouth = Mouth::new(stream, Environment::new(), Box::new(NullResolver), "test", 10_000);
        read_number(&mut mouth).unwrap()
    }

    #[test]
    fn reads_plain_decimal() {
        assert_eq!(number_of("42"), 42);
    }

    #[test]
    fn reads_signed_decimal_with_spaces() {
        assert_eq!(number_of(" - - 3"), 3);
        assert_eq!(number_of("- 3"), -3);
    }

    #[test]
    fn reads_octal_and_hex() {
        assert_eq!(number_of("'17"), 15);
        assert_eq!(number_of("\"2A"), 42);
    }

    #[test]
    fn reads_char_token_constant() {
        assert_eq!(number_of("`A"), 65);
    }

    proptest::proptest! {
        // A run of decimal digits (no leading zero quirks to worry about
        // since all-zero and leading-zero strings still parse as the same
        // magnitude) reads back as the integer it denotes.
        #[test]
        fn decimal_digits_read_back_as_their_value(n in 0u32..1_000_000) {
            proptest::prop_assert_eq!(number_of(&n.to_string()), n as i64);
        }

        // Each leading `-` flips the sign; an even count cancels out.
        #[test]
        fn leading_minus_signs_compose_by_parity(n in 1u32..1_000_000, signs in 0usize..6) {
            let source = format!("{}{n}", "-".repeat(signs));
            let expected = if signs % 2 == 0 { n as i64 } else { -(n as i64) };
            proptest::prop_assert_eq!(number_of(&source), expected);
        }
    }
}
