//! `\def`-family definitions (§4.3.3) and macro invocation/argument binding
//! (§4.3.1, §4.3.4).
//!
//! Grounded on the combinator core's `Consumed`/`Reply` shape for *what* a
//! grammar production is (a parameter-text element, a replacement-text
//! token), reimplemented as a direct recursive-descent walk over
//! [`Mouth::next_raw`]/[`Mouth::next_expanded`] rather than through
//! `crate::combinators::Parser`: argument binding needs to mutate the
//! environment mid-parse (looking up whether a following control sequence
//! is itself a macro, while deciding how far an undelimited argument
//! extends), which the combinator core's pure `Stream` does not carry.

use crate::category::Category;
use crate::environment::{Binding, Macro, Modifiers, ParamPart};
use crate::error::{Error, Result};
use crate::token::Token;

use super::{is_begin_group, is_end_group, ExpandOutcome, Mouth};

/// Parse and install one `\def`-family definition. `first` is the primitive
/// name that triggered this call (a modifier or an introducer); modifiers
/// preceding the introducer are consumed here too.
pub(super) fn parse_def_family(mouth: &mut Mouth, first: &str) -> Result<()> {
    let mut modifiers = Modifiers::default();
    let mut current = first.to_string();
    loop {
        match current.as_str() {
            "global" => modifiers.global = true,
            "long" => modifiers.long = true,
            "outer" => modifiers.outer = true,
            "def" | "edef" | "gdef" | "xdef" => break,
            other => {
                return Err(Error::expand(
                    mouth_position(mouth),
                    format!("unexpected primitive '{other}' while scanning \\def-family modifiers"),
                ));
            }
        }
        let next = mouth.next_raw()?.ok_or_else(|| {
            Error::expand(mouth_position(mouth), "file ended while scanning \\def-family modifiers")
        })?;
        match next {
            Token::ControlSequence { name, active: false, .. } => current = name,
            other => {
                return Err(Error::expand(
                    other.position().clone(),
                    "expected \\def, \\edef, \\gdef, or \\xdef after a modifier",
                ));
            }
        }
    }
    let introducer = current;
    if introducer == "gdef" || introducer == "xdef" {
        modifiers.global = true;
    }
    let expand_now = introducer == "edef" || introducer == "xdef";

    let name_tok = mouth
        .next_raw()?
        .ok_or_else(|| Error::expand(mouth_position(mouth), "file ended after \\def"))?;
    let macro_name = match name_tok {
        Token::ControlSequence { name, .. } => name,
        other => {
            return Err(Error::expand(other.position().clone(), "\\def must be followed by a control sequence"));
        }
    };

    let (params, opening) = parse_parameter_text(mouth)?;
    let replacement = parse_replacement_text(mouth, params_count(&params), expand_now, &macro_name, opening)?;

    let m = Macro { name: macro_name.clone(), modifiers, params, replacement, expand_now };
    mouth.environment_mut().bind(macro_name, Binding::Macro(m), modifiers.global);
    Ok(())
}

fn params_count(params: &[ParamPart]) -> u8 {
    params.iter().rev().find_map(|p| match p {
        ParamPart::Param(n) => Some(*n),
        ParamPart::Delimiter(_) => None,
    }).unwrap_or(0)
}

fn mouth_position(mouth: &Mouth) -> crate::chars::Position {
    mouth.levels.last().map(|l| l.eyes.position()).unwrap_or_else(|| {
        crate::chars::Position::start(crate::chars::SourceId(0), "<input>")
    })
}

fn is_bare_parameter_char(tok: &Token) -> bool {
    matches!(tok, Token::Character { value: '#', category: Category::Parameter, .. })
}

/// Parse a parameter text, returning its elements plus the begin-group token
/// that terminates it — either the explicit `{` that starts the replacement
/// text, or (for the `#{` brace-trigger) the synthesized one already read as
/// part of recognizing that trigger.
fn parse_parameter_text(mouth: &mut Mouth) -> Result<(Vec<ParamPart>, Token)> {
    let mut parts = Vec::new();
    let mut delim_buf = Vec::new();
    let mut expected_next = 1u8;
    loop {
        let tok = mouth
            .next_raw()?
            .ok_or_else(|| Error::expand(mouth_position(mouth), "file ended while scanning parameter text"))?;
        match tok {
            Token::Parameter { n, pos } => {
                if !delim_buf.is_empty() {
                    parts.push(ParamPart::Delimiter(std::mem::take(&mut delim_buf)));
                }
                if n != expected_next {
                    return Err(Error::expand(
                        pos,
                        format!(
                            "parameters must be numbered consecutively; expected #{expected_next}, found #{n}"
                        ),
                    ));
                }
                parts.push(ParamPart::Param(n));
                expected_next += 1;
            }
            ref t if is_bare_parameter_char(t) => {
                let next = mouth
                    .next_raw()?
                    .ok_or_else(|| Error::expand(mouth_position(mouth), "file ended after # in parameter text"))?;
                if is_begin_group(&next) {
                    if !delim_buf.is_empty() {
                        parts.push(ParamPart::Delimiter(std::mem::take(&mut delim_buf)));
                    }
                    parts.push(ParamPart::Delimiter(vec![next.clone()]));
                    return Ok((parts, next));
                }
                return Err(Error::expand(
                    next.position().clone(),
                    "illegal parameter number in definition",
                ));
            }
            ref t if is_begin_group(t) => {
                if !delim_buf.is_empty() {
                    parts.push(ParamPart::Delimiter(std::mem::take(&mut delim_buf)));
                }
                return Ok((parts, tok));
            }
            other => delim_buf.push(other),
        }
    }
}

/// Parse a replacement text, given the already-consumed opening brace and
/// how many `#n` parameters the parameter text declared.
fn parse_replacement_text(
    mouth: &mut Mouth,
    nparams: u8,
    expand_now: bool,
    macro_name: &str,
    opening: Token,
) -> Result<Vec<Token>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    loop {
        let tok = read_repl_token(mouth, expand_now)?.ok_or_else(|| {
            Error::expand(opening.position().clone(), format!("file ended while scanning the definition of \\{macro_name}"))
        })?;
        match tok {
            Token::Character { value, category: Category::BeginGroup, pos } => {
                depth += 1;
                out.push(Token::character(value, Category::BeginGroup, pos));
            }
            Token::Character { value, category: Category::EndGroup, pos } => {
                if depth == 0 {
                    return Ok(out);
                }
                depth -= 1;
                out.push(Token::character(value, Category::EndGroup, pos));
            }
            Token::Character { value: '#', category: Category::Parameter, pos } => {
                let next = read_repl_token(mouth, expand_now)?.ok_or_else(|| {
                    Error::expand(pos.clone(), "file ended after # in replacement text")
                })?;
                match next {
                    Token::Character { value: '#', category: Category::Parameter, .. } => {
                        out.push(Token::character('#', Category::Parameter, pos));
                    }
                    Token::Parameter { n, pos: p2 } => {
                        out.push(Token::character('#', Category::Parameter, pos));
                        let digit = std::char::from_digit(u32::from(n), 10).unwrap();
                        out.push(Token::character(digit, Category::Other, p2));
                    }
                    other => {
                        return Err(Error::expand(
                            other.position().clone(),
                            format!("illegal parameter number in definition of \\{macro_name}"),
                        ));
                    }
                }
            }
            Token::Parameter { n, pos } => {
                if n == 0 || n > nparams {
                    return Err(Error::expand(
                        pos,
                        format!("parameter number {n} does not exist in current macro"),
                    ));
                }
                out.push(Token::parameter(n, pos));
            }
            other => out.push(other),
        }
    }
}

fn read_repl_token(mouth: &mut Mouth, expand_now: bool) -> Result<Option<Token>> {
    if expand_now {
        mouth.next_expanded()
    } else {
        mouth.next_raw()
    }
}

fn contains_par(toks: &[Token]) -> bool {
    toks.iter().any(|t| match t {
        Token::Group { body, .. } => contains_par(body),
        other => other.is_par(),
    })
}

/// Bind the call site's arguments against `params`, per §4.3.4: an
/// undelimited parameter grabs either a single token or a balanced group;
/// a delimited parameter grabs the shortest token run ending at a literal
/// match of its delimiter.
fn is_brace_trigger(delim: &[Token]) -> bool {
    matches!(delim, [t] if is_begin_group(t))
}

fn bind_arguments(mouth: &mut Mouth, params: &[ParamPart], long: bool) -> Result<Vec<Vec<Token>>> {
    let mut args = Vec::new();
    let mut i = 0;
    while i < params.len() {
        match &params[i] {
            ParamPart::Delimiter(delim) if i == params.len() - 1 && is_brace_trigger(delim) => {
                // The `#{` brace-trigger (§4.3.3): the call site's matching
                // `{` doesn't just terminate argument scanning like an
                // ordinary delimiter, it opens a group. Real TeX leaves that
                // group open across the rest of the document (the closing
                // `}` can appear arbitrarily later); threading that into this
                // engine would mean the mouth tracking brace balance across
                // calls to `next_expanded`, which nothing downstream of it
                // consumes (no stomach). This engine instead requires the
                // group to close before the macro call finishes and discards
                // its contents, the one place this crate's `#{` handling
                // knowingly falls short of full TeX fidelity.
                let open = mouth
                    .next_raw()?
                    .ok_or_else(|| Error::expand(delim[0].position().clone(), "file ended after #{"))?;
                if !is_begin_group(&open) {
                    return Err(Error::expand(
                        open.position().clone(),
                        "use of macro doesn't match its definition (expected {)",
                    ));
                }
                mouth.read_balanced_group(open)?;
                i += 1;
            }
            ParamPart::Delimiter(delim) => {
                match_literal(mouth, delim)?;
                i += 1;
            }
            ParamPart::Param(_) => {
                let delimited = params.get(i + 1).and_then(|p| match p {
                    ParamPart::Delimiter(d) => Some(d.clone()),
                    ParamPart::Param(_) => None,
                });
                let arg = match delimited {
                    None => read_undelimited_argument(mouth, long)?,
                    Some(delim) => read_delimited_argument(mouth, &delim, long)?,
                };
                args.push(arg);
                i += 1;
            }
        }
    }
    Ok(args)
}

fn match_literal(mouth: &mut Mouth, delim: &[Token]) -> Result<()> {
    for expected in delim {
        let got = mouth
            .next_raw()?
            .ok_or_else(|| Error::expand(expected.position().clone(), "file ended while matching a delimiter"))?;
        if !got.tex_eq(expected) {
            return Err(Error::expand(
                got.position().clone(),
                "use of macro doesn't match its definition (delimiter mismatch)",
            ));
        }
    }
    Ok(())
}

fn read_undelimited_argument(mouth: &mut Mouth, long: bool) -> Result<Vec<Token>> {
    let mut tok = mouth
        .next_raw()?
        .ok_or_else(|| Error::expand(mouth_position(mouth), "file ended while looking for a macro argument"))?;
    while let Token::Character { value: ' ', category: Category::Space, .. } = &tok {
        tok = mouth
            .next_raw()?
            .ok_or_else(|| Error::expand(mouth_position(mouth), "file ended while looking for a macro argument"))?;
    }
    if is_begin_group(&tok) {
        let group = mouth.read_balanced_group(tok)?;
        if let Token::Group { body, .. } = &group {
            if !long && contains_par(body) {
                return Err(Error::expand(
                    group.position().clone(),
                    "paragraph ended before a non-\\long macro's argument was complete",
                ));
            }
            // A braced undelimited argument binds to the group's *contents*:
            // the braces themselves are only the delimiter that bounded the
            // argument, not part of its value (§4.3.4). `flatten_into` would
            // otherwise re-wrap this in its own `{`/`}` on substitution.
            Ok(body.clone())
        } else {
            unreachable!("read_balanced_group always returns a Token::Group")
        }
    } else {
        if !long && tok.is_par() {
            return Err(Error::expand(
                tok.position().clone(),
                "paragraph ended before a non-\\long macro's argument was complete",
            ));
        }
        Ok(vec![tok])
    }
}

fn read_delimited_argument(mouth: &mut Mouth, delim: &[Token], long: bool) -> Result<Vec<Token>> {
    let mut collected = Vec::new();
    loop {
        if matches_delimiter_here(mouth, delim)? {
            return Ok(collected);
        }
        let tok = mouth
            .next_raw()?
            .ok_or_else(|| Error::expand(mouth_position(mouth), "file ended while looking for a macro argument"))?;
        if !long && tok.is_par() {
            return Err(Error::expand(
                tok.position().clone(),
                "paragraph ended before a non-\\long macro's argument was complete",
            ));
        }
        if is_begin_group(&tok) {
            collected.push(mouth.read_balanced_group(tok)?);
        } else {
            collected.push(tok);
        }
    }
}

/// Peek ahead for a literal match of `delim` without consuming anything on
/// failure (every consumed lookahead token is pushed back in order).
fn matches_delimiter_here(mouth: &mut Mouth, delim: &[Token]) -> Result<bool> {
    let mut seen = Vec::with_capacity(delim.len());
    for expected in delim {
        match mouth.next_raw()? {
            Some(tok) => {
                let matched = tok.tex_eq(expected);
                seen.push(tok);
                if !matched {
                    for t in seen.into_iter().rev() {
                        mouth.push_back(t);
                    }
                    return Ok(false);
                }
            }
            None => {
                for t in seen.into_iter().rev() {
                    mouth.push_back(t);
                }
                return Ok(false);
            }
        }
    }
    Ok(true)
}

fn flatten_into(out: &mut Vec<Token>, tokens: &[Token]) {
    for t in tokens {
        match t {
            Token::Group { open, body, close } => {
                out.push((**open).clone());
                flatten_into(out, body);
                out.push((**close).clone());
            }
            other => out.push(other.clone()),
        }
    }
}

/// Invoke `m`: bind its arguments against the call site, substitute them
/// into its replacement text, flatten any synthesized groups, and splice the
/// result back onto the pushback buffer.
pub(super) fn invoke_macro(mouth: &mut Mouth, m: &Macro) -> Result<ExpandOutcome> {
    let args = bind_arguments(mouth, &m.params, m.modifiers.long)?;
    let mut out = Vec::new();
    for t in &m.replacement {
        if let Token::Parameter { n, .. } = t {
            let idx = (*n as usize).saturating_sub(1);
            if let Some(arg) = args.get(idx) {
                flatten_into(&mut out, arg);
                continue;
            }
        }
        flatten_into(&mut out, std::slice::from_ref(t));
    }
    mouth.push_front_many(out);
    Ok(ExpandOutcome::Retry)
}

#[cfg(test)]
mod tests {
    use crate::chars::{CharStream, FileResolver, SourceId};
    use crate::environment::Environment;
    use crate::token::Token;

    use super::super::Mouth;

    struct NullResolver;
    impl FileResolver for NullResolver {
        fn resolve(&self, name: &str) -> std::io::Result<(std::path::PathBuf, String)> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()))
        }
    }

    fn expand_text(source: &str) -> String {
        let stream = CharStream::new(SourceId(0), "<test>", source);
        let mut mouth = Mouth::new(stream, Environment::new(), Box::new(NullResolver), "test", 10_000);
        let mut s = String::new();
        while let Some(t) = mouth.next_expanded().unwrap() {
            if let Token::Character { value, .. } = t {
                s.push(value);
            }
        }
        s
    }

    #[test]
    fn empty_macro_expands_to_nothing() {
        assert_eq!(expand_text("\\def\\test{}\\test"), "");
    }

    #[test]
    fn undelimited_parameter_grabs_single_token_or_group() {
        assert_eq!(expand_text("\\def\\dup#1{#1#1}\\dup X"), "XX");
        assert_eq!(expand_text("\\def\\dup#1{#1#1}\\dup{XY}"), "XYXY");
    }

    #[test]
    fn delimited_parameter_reads_up_to_delimiter() {
        assert_eq!(expand_text("\\def\\cs#1STOP{[#1]}\\cs abcSTOP"), "[abc]");
    }

    #[test]
    fn long_macro_permits_par_in_argument() {
        assert_eq!(expand_text("\\long\\def\\cs#1{(#1)}\\cs{a\\par b}"), "(ab)");
    }

    #[test]
    fn non_long_macro_rejects_par_in_undelimited_argument() {
        let stream = CharStream::new(SourceId(0), "<test>", "\\def\\cs#1{(#1)}\\cs{a\\par b}");
        let mut mouth = Mouth::new(stream, Environment::new(), Box::new(NullResolver), "test", 10_000);
        let mut err = None;
        loop {
            match mouth.next_expanded() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert!(err.is_some());
    }

    #[test]
    fn brace_trigger_parameter_text() {
        assert_eq!(expand_text("\\def\\cs#{<>}\\cs{}"), "<>");
    }

    #[test]
    fn brace_trigger_discards_a_nested_group() {
        assert_eq!(expand_text("\\def\\cs#{<>}\\cs{a{b}c}"), "<>");
    }

    #[test]
    fn double_hash_collapses_in_replacement_text() {
        assert_eq!(expand_text("\\def\\cs{##1}\\cs"), "#1");
    }

    #[test]
    fn edef_expands_its_replacement_at_definition_time() {
        assert_eq!(expand_text("\\def\\a{X}\\edef\\b{\\a\\a}\\def\\a{Y}\\b"), "XX");
    }

    proptest::proptest! {
        // §8 "Parameter-substitution": for `\def\dup#1{#1#1}`, calling
        // `\dup{s}` must equal the textual substitution of `s` for `#1`
        // in the replacement text, i.e. `s` repeated twice.
        #[test]
        fn dup_doubles_any_braced_letter_argument(s in "[a-z]{1,8}") {
            let out = expand_text(&format!("\\def\\dup#1{{#1#1}}\\dup{{{s}}}"));
            proptest::prop_assert_eq!(out, format!("{s}{s}"));
        }

        // Same property for an undelimited single-token argument (no braces).
        #[test]
        fn dup_doubles_any_single_letter_argument(c in "[a-z]") {
            let out = expand_text(&format!("\\def\\dup#1{{#1#1}}\\dup {c}"));
            proptest::prop_assert_eq!(out, format!("{c}{c}"));
        }

        // §8 "Parameter-substitution" with a literal delimiter run: whatever
        // letters precede the delimiter `STOP` are bound to `#1` verbatim.
        #[test]
        fn delimited_argument_matches_up_to_literal_delimiter(s in "[a-z]{0,8}") {
            let out = expand_text(&format!("\\def\\cs#1STOP{{[#1]}}\\cs {s}STOP"));
            proptest::prop_assert_eq!(out, format!("[{s}]"));
        }
    }
}
