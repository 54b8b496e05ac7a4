//! The mouth (§4.3): reads tokens from the eyes (or from its own pushback
//! buffer) and expands macros and expandable primitives, one rule at a time,
//! in the fixed priority order §4.3.2 lays out.
//!
//! The mouth owns the [`Environment`] (category codes, bindings, registers)
//! and a stack of [`Level`]s, one per currently-open source (the top-level
//! file/string plus anything pulled in through `\input`). Expansion results
//! are spliced back in through a single pushback [`VecDeque`], the same idiom
//! the teacher used for its token stream's lookahead buffer, generalised here
//! to also be the landing zone for macro substitution and the primitives
//! that synthesize tokens (`\number`, `\string`, `\romannumeral`, ...).

mod conditionals;
mod def;
mod number;

use std::collections::VecDeque;

use crate::category::Category;
use crate::chars::{CharStream, FileResolver, Position, SourceId};
use crate::environment::{Binding, Environment};
use crate::error::{Error, Result};
use crate::eyes::Eyes;
use crate::token::Token;

/// One currently-open input source: a lexer over it, and whether `\endinput`
/// has been invoked against it (§4.3.1).
#[derive(Debug)]
struct Level {
    eyes: Eyes,
    endinput: bool,
}

enum Step {
    Token(Token),
    PopLevel,
}

fn level_step(level: &mut Level, env: &mut Environment) -> Result<Step> {
    if level.endinput {
        match level.eyes.peek_category(env) {
            Some(Category::EndOfLine) => {
                level.eyes.discard_one(env);
                return Ok(Step::PopLevel);
            }
            None => return Ok(Step::PopLevel),
            _ => {}
        }
    }
    match level.eyes.next_token(env)? {
        Some(tok) => Ok(Step::Token(tok)),
        None => Ok(Step::PopLevel),
    }
}

/// What came out of attempting to expand one raw token (§4.3.2): either it
/// wasn't expandable (or expansion finished) and `Done` carries the token to
/// hand back to the caller, or it was, and its result has already been
/// spliced onto the pushback buffer — `Retry` tells the caller to read again.
enum ExpandOutcome {
    Done(Token),
    Retry,
}

/// Names of every primitive the rules in §4.3.2 actually expand. Everything
/// else bound to [`Binding::Primitive`] (`\relax`, `\par`) falls through to
/// rule 14 and is handed back unchanged.
const EXPANDABLE_PRIMITIVES: &[&str] = &[
    "ifnum", "ifdim", "ifodd", "ifvmode", "ifhmode", "ifmmode", "ifinner", "if", "ifcat", "ifx",
    "else", "fi", "number", "romannumeral", "string", "jobname", "fontname", "meaning", "csname",
    "expandafter", "noexpand", "input", "endinput", "the", "def", "edef", "gdef", "xdef", "global",
    "long", "outer",
];

fn is_begin_group(tok: &Token) -> bool {
    matches!(tok, Token::Character { category: Category::BeginGroup, .. })
}

fn is_end_group(tok: &Token) -> bool {
    matches!(tok, Token::Character { category: Category::EndGroup, .. })
}

/// The mouth: owns the environment, the `\input` stack, the conditional
/// nesting stack, and the pushback buffer every expansion rule writes into.
pub struct Mouth {
    levels: Vec<Level>,
    pending: VecDeque<Token>,
    env: Environment,
    resolver: Box<dyn FileResolver>,
    job_name: String,
    next_source_id: usize,
    /// One entry per currently-open conditional (§4.3.6): `true` while still
    /// executing its "then" branch (so a bare `\else` there should skip to
    /// the matching `\fi`), `false` once a `\else` has switched it into its
    /// "else" branch (so a bare `\fi` there just closes it).
    cond_stack: Vec<bool>,
    expansions: usize,
    max_expansions: usize,
}

impl Mouth {
    /// Build a mouth reading `stream` as its first (and initially only)
    /// input level.
    #[must_use]
    pub fn new(
        stream: CharStream,
        env: Environment,
        resolver: Box<dyn FileResolver>,
        job_name: impl Into<String>,
        max_expansions: usize,
    ) -> Self {
        let next_source_id = stream.source_id().0 + 1;
        Self {
            levels: vec![Level { eyes: Eyes::new(stream), endinput: false }],
            pending: VecDeque::new(),
            env,
            resolver,
            job_name: job_name.into(),
            next_source_id,
            cond_stack: Vec::new(),
            expansions: 0,
            max_expansions,
        }
    }

    /// The environment this mouth reads and mutates.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Mutable access to the environment, e.g. to seed test fixtures with
    /// non-default category codes or register values before expansion.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    fn push_back(&mut self, tok: Token) {
        self.pending.push_front(tok);
    }

    fn push_front_many(&mut self, toks: Vec<Token>) {
        for t in toks.into_iter().rev() {
            self.pending.push_front(t);
        }
    }

    /// Read the next token without expanding it ("no-expansion" reads used
    /// while binding macro arguments and scanning `\def`-family syntax).
    pub fn next_raw(&mut self) -> Result<Option<Token>> {
        loop {
            if let Some(t) = self.pending.pop_front() {
                return Ok(Some(t));
            }
            let idx = match self.levels.len().checked_sub(1) {
                Some(i) => i,
                None => return Ok(None),
            };
            let step = {
                let level = &mut self.levels[idx];
                let env = &mut self.env;
                level_step(level, env)?
            };
            match step {
                Step::Token(tok) => return Ok(Some(tok)),
                Step::PopLevel => {
                    self.levels.pop();
                }
            }
        }
    }

    /// Read the next token, expanding macros and expandable primitives as
    /// many times as needed until a non-expandable token (or end of input)
    /// is reached — the engine's main `next`/`expanded` entry point.
    pub fn next_expanded(&mut self) -> Result<Option<Token>> {
        loop {
            let tok = match self.next_raw()? {
                Some(t) => t,
                None => return Ok(None),
            };
            match self.try_expand_one(tok)? {
                ExpandOutcome::Done(t) => return Ok(Some(t)),
                ExpandOutcome::Retry => {
                    self.expansions += 1;
                    if self.expansions > self.max_expansions {
                        return Err(Error::Internal(format!(
                            "expansion depth exceeded {} steps; probable infinite macro recursion",
                            self.max_expansions
                        )));
                    }
                }
            }
        }
    }

    fn try_expand_one(&mut self, tok: Token) -> Result<ExpandOutcome> {
        match &tok {
            Token::ControlSequence { name, .. } => match self.env.lookup(name).cloned() {
                Some(Binding::Macro(m)) => def::invoke_macro(self, &m),
                Some(Binding::Primitive(p)) => {
                    let pos = tok.position().clone();
                    self.expand_primitive(p, pos, tok)
                }
                _ => Ok(ExpandOutcome::Done(tok)),
            },
            _ => Ok(ExpandOutcome::Done(tok)),
        }
    }

    /// Whether `tok` would be transformed by [`Self::try_expand_one`] — used
    /// only to decide `\noexpand`'s idempotence (see the `noexpand` arm
    /// below for the Open-Question-style resolution of §4.3.2 rule 10).
    fn is_expandable(&self, tok: &Token) -> bool {
        match tok {
            Token::ControlSequence { name, .. } => match self.env.lookup(name) {
                Some(Binding::Macro(_)) => true,
                Some(Binding::Primitive(p)) => EXPANDABLE_PRIMITIVES.contains(p),
                _ => false,
            },
            _ => false,
        }
    }

    fn read_balanced_group(&mut self, open: Token) -> Result<Token> {
        let mut body = Vec::new();
        let mut depth = 1usize;
        loop {
            let t = self
                .next_raw()?
                .ok_or_else(|| Error::expand(open.position().clone(), "file ended within a group"))?;
            if is_begin_group(&t) {
                depth += 1;
                body.push(t);
            } else if is_end_group(&t) {
                depth -= 1;
                if depth == 0 {
                    return Ok(Token::group(open, body, t));
                }
                body.push(t);
            } else {
                body.push(t);
            }
        }
    }

    fn expand_primitive(&mut self, name: &'static str, pos: Position, tok: Token) -> Result<ExpandOutcome> {
        match name {
            "number" => {
                let n = number::read_number(self)?;
                self.push_front_many(chars_to_tokens(&n.to_string(), &pos));
                Ok(ExpandOutcome::Retry)
            }
            "romannumeral" => {
                let n = number::read_number(self)?;
                self.push_front_many(chars_to_tokens(&to_roman(n), &pos));
                Ok(ExpandOutcome::Retry)
            }
            "the" => {
                let s = self.read_the(&pos)?;
                self.push_front_many(chars_to_tokens(&s, &pos));
                Ok(ExpandOutcome::Retry)
            }
            "string" => {
                let t = self.next_raw()?.ok_or_else(|| missing_token(&pos, "\\string"))?;
                let s = t.string_form(self.env.escapechar());
                self.push_front_many(chars_to_tokens(&s, &pos));
                Ok(ExpandOutcome::Retry)
            }
            "jobname" => {
                let s = self.job_name.clone();
                self.push_front_many(chars_to_tokens(&s, &pos));
                Ok(ExpandOutcome::Retry)
            }
            "fontname" => {
                let t = self.next_raw()?.ok_or_else(|| missing_token(&pos, "\\fontname"))?;
                let name = match &t {
                    Token::ControlSequence { name, .. } => match self.env.lookup(name) {
                        Some(Binding::Font(font)) => font.clone(),
                        _ => return Err(Error::expand(pos, "\\fontname requires a font selector")),
                    },
                    _ => return Err(Error::expand(pos, "\\fontname requires a control sequence")),
                };
                self.push_front_many(chars_to_tokens(&format!("{name} at 10.0pt"), &pos));
                Ok(ExpandOutcome::Retry)
            }
            "meaning" => {
                let t = self.next_raw()?.ok_or_else(|| missing_token(&pos, "\\meaning"))?;
                let s = self.meaning(&t);
                self.push_front_many(chars_to_tokens(&s, &pos));
                Ok(ExpandOutcome::Retry)
            }
            "csname" => {
                let s = self.read_csname(&pos)?;
                let bound = self.env.lookup(&s).is_some();
                let produced = if bound {
                    Token::control_sequence(s, false, pos)
                } else {
                    Token::control_sequence("relax", false, pos)
                };
                self.push_back(produced);
                Ok(ExpandOutcome::Retry)
            }
            "endcsname" => Err(Error::expand(pos, "extra \\endcsname")),
            "expandafter" => {
                let t1 = self.next_raw()?.ok_or_else(|| missing_token(&pos, "\\expandafter"))?;
                let t2 = self.next_raw()?.ok_or_else(|| missing_token(&pos, "\\expandafter"))?;
                match self.try_expand_one(t2)? {
                    ExpandOutcome::Done(y) => {
                        self.push_back(y);
                        self.push_back(t1);
                    }
                    ExpandOutcome::Retry => {
                        self.push_back(t1);
                    }
                }
                Ok(ExpandOutcome::Retry)
            }
            "noexpand" => {
                let t = self.next_raw()?.ok_or_else(|| missing_token(&pos, "\\noexpand"))?;
                if self.is_expandable(&t) {
                    Ok(ExpandOutcome::Done(Token::control_sequence("relax", false, pos)))
                } else {
                    Ok(ExpandOutcome::Done(t))
                }
            }
            "input" => {
                self.do_input(&pos)?;
                Ok(ExpandOutcome::Retry)
            }
            "endinput" => {
                if let Some(level) = self.levels.last_mut() {
                    level.endinput = true;
                }
                Ok(ExpandOutcome::Retry)
            }
            "ifnum" | "ifdim" | "ifodd" | "ifvmode" | "ifhmode" | "ifmmode" | "ifinner" | "if"
            | "ifcat" | "ifx" => conditionals::dispatch_if(self, name, &pos),
            "else" => conditionals::dispatch_else(self, &pos),
            "fi" => conditionals::dispatch_fi(self, &pos),
            "def" | "edef" | "gdef" | "xdef" | "global" | "long" | "outer" => {
                def::parse_def_family(self, name)?;
                Ok(ExpandOutcome::Retry)
            }
            _ => Ok(ExpandOutcome::Done(tok)),
        }
    }

    fn read_csname(&mut self, pos: &Position) -> Result<String> {
        let mut s = String::new();
        loop {
            let t = self.next_expanded()?.ok_or_else(|| missing_token(pos, "\\endcsname"))?;
            match t {
                Token::ControlSequence { name, active: false, .. } if name == "endcsname" => {
                    return Ok(s);
                }
                Token::Character { value, .. } => s.push(value),
                other => {
                    return Err(Error::expand(
                        other.position().clone(),
                        "\\csname body must consist of character tokens",
                    ));
                }
            }
        }
    }

    fn do_input(&mut self, pos: &Position) -> Result<()> {
        let mut name = String::new();
        // Skip leading spaces, then read a whitespace-delimited filename.
        loop {
            match self.next_expanded()? {
                Some(Token::Character { value: ' ', category: Category::Space, .. }) if name.is_empty() => {}
                Some(Token::Character { value: ' ', category: Category::Space, .. }) => break,
                Some(Token::Character { value, .. }) => name.push(value),
                Some(other) => {
                    self.push_back(other);
                    break;
                }
                None => break,
            }
        }
        if name.is_empty() {
            return Err(Error::expand(pos.clone(), "\\input expects a filename"));
        }
        let (path, contents) = self
            .resolver
            .resolve(&name)
            .map_err(|e| Error::expand(pos.clone(), format!("could not \\input '{name}': {e}")))?;
        let source_id = SourceId(self.next_source_id);
        self.next_source_id += 1;
        let stream = CharStream::new(source_id, path.display().to_string(), contents);
        self.levels.push(Level { eyes: Eyes::new(stream), endinput: false });
        Ok(())
    }

    fn read_the(&mut self, pos: &Position) -> Result<String> {
        let t = self.next_expanded()?.ok_or_else(|| missing_token(pos, "\\the"))?;
        match &t {
            Token::ControlSequence { name, .. } => match self.env.lookup(name) {
                Some(Binding::CountDef(idx)) => Ok(self.env.count(*idx).to_string()),
                Some(Binding::DimenDef(idx)) => Ok(format!("{}sp", self.env.dimen(*idx).0)),
                Some(Binding::SkipDef(idx)) => Ok(self.env.skip(*idx).to_string()),
                Some(Binding::MuskipDef(idx)) => Ok(self.env.muskip(*idx).to_string()),
                Some(Binding::CharDef(c)) => Ok((*c as u32).to_string()),
                Some(Binding::MathCharDef(code)) => Ok(code.to_string()),
                _ => Err(Error::expand(
                    pos.clone(),
                    "\\the requires a count, dimen, skip, muskip, char, or mathchar register",
                )),
            },
            _ => Err(Error::expand(pos.clone(), "\\the requires a control sequence")),
        }
    }

    /// `\meaning`'s textual rendering (§6): primitive, macro, register
    /// definition, font selector, or character-token description.
    fn meaning(&self, tok: &Token) -> String {
        let escape = |s: &mut String| {
            if let Some(e) = self.env.escapechar() {
                s.push(e);
            }
        };
        match tok {
            Token::Character { value, category, .. } => {
                format!("{} character {}", category.meaning_name(), u32::from(*value))
            }
            Token::ControlSequence { name, .. } => match self.env.lookup(name) {
                None => "undefined".to_string(),
                Some(Binding::Primitive(p)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(p);
                    s
                }
                Some(Binding::Macro(m)) => {
                    use itertools::Itertools;
                    let mut s = String::from("macro:");
                    s.push_str(&m.params.iter().map(|part| match part {
                        crate::environment::ParamPart::Param(n) => format!("#{n}"),
                        crate::environment::ParamPart::Delimiter(toks) => toks
                            .iter()
                            .map(|t| t.string_form(self.env.escapechar()))
                            .join(""),
                    }).join(""));
                    s.push_str("->");
                    for t in &m.replacement {
                        s.push_str(&t.string_form(self.env.escapechar()));
                    }
                    s
                }
                Some(Binding::CountDef(idx)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("count{idx}"));
                    s
                }
                Some(Binding::DimenDef(idx)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("dimen{idx}"));
                    s
                }
                Some(Binding::SkipDef(idx)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("skip{idx}"));
                    s
                }
                Some(Binding::MuskipDef(idx)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("muskip{idx}"));
                    s
                }
                Some(Binding::CharDef(c)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("char\"{:X}", *c as u32));
                    s
                }
                Some(Binding::MathCharDef(code)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("mathchar\"{code:X}"));
                    s
                }
                Some(Binding::TokenList(idx)) => {
                    let mut s = String::new();
                    escape(&mut s);
                    s.push_str(&format!("toks{idx}"));
                    s
                }
                Some(Binding::Font(name)) => format!("select font {name}"),
            },
            Token::Parameter { n, .. } => format!("macro parameter character #{n}"),
            Token::Group { body, .. } => {
                body.iter().map(|t| t.string_form(self.env.escapechar())).collect::<Vec<_>>().join("")
            }
        }
    }
}

fn missing_token(pos: &Position, who: &str) -> Error {
    Error::expand(pos.clone(), format!("file ended while {who} was looking for its argument"))
}

fn chars_to_tokens(s: &str, pos: &Position) -> Vec<Token> {
    s.chars().map(|c| Token::character(c, Category::Other, pos.clone())).collect()
}

fn to_roman(mut n: i64) -> String {
    const VALUES: &[(i64, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    if n <= 0 {
        return String::new();
    }
    let mut out = String::new();
    for (value, sym) in VALUES {
        while n >= *value {
            out.push_str(sym);
            n -= *value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    fn mouth_for(source: &str) -> Mouth {
        let stream = CharStream::new(SourceId(0), "<test>", source);
        Mouth::new(stream, Environment::new(), Box::new(NullResolver), "test", 10_000)
    }

    struct NullResolver;
    impl FileResolver for NullResolver {
        fn resolve(&self, name: &str) -> std::io::Result<(std::path::PathBuf, String)> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, name.to_string()))
        }
    }

    fn expand_all(source: &str) -> Vec<Token> {
        let mut mouth = mouth_for(source);
        let mut out = Vec::new();
        while let Some(t) = mouth.next_expanded().unwrap() {
            out.push(t);
        }
        out
    }

    #[test]
    fn undefined_control_sequence_passes_through() {
        let toks = expand_all("\\foo");
        assert_eq!(toks.len(), 1);
        assert!(toks[0].is_primitive_named("foo"));
    }

    #[test]
    fn relax_and_par_pass_through_unchanged() {
        let toks = expand_all("\\relax\\par");
        assert_eq!(toks.len(), 2);
        assert!(toks[0].is_primitive_named("relax"));
        assert!(toks[1].is_par());
    }

    #[test]
    fn number_expands_to_digit_characters() {
        let toks = expand_all("\\number 42");
        let s: String = toks.iter().filter_map(|t| match t {
            Token::Character { value, .. } => Some(*value),
            _ => None,
        }).collect();
        assert_eq!(s, "42");
    }

    #[test]
    fn romannumeral_lowercases() {
        let toks = expand_all("\\romannumeral 1994");
        let s: String = toks.iter().filter_map(|t| match t {
            Token::Character { value, .. } => Some(*value),
            _ => None,
        }).collect();
        assert_eq!(s, "mcmxciv");
    }

    #[test]
    fn noexpand_idempotence_on_letter() {
        let toks = expand_all("\\noexpand a");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Token::Character { value: 'a', .. }));
    }

    #[test]
    fn jobname_expands_to_configured_name() {
        let toks = expand_all("\\jobname");
        let s: String = toks.iter().filter_map(|t| match t {
            Token::Character { value, .. } => Some(*value),
            _ => None,
        }).collect();
        assert_eq!(s, "test");
    }

    #[test]
    fn csname_of_undefined_name_yields_relax() {
        let toks = expand_all("\\csname zzz\\endcsname");
        assert_eq!(toks.len(), 1);
        assert!(toks[0].is_primitive_named("relax"));
    }

    #[test]
    fn expandafter_reorders_one_expansion_step() {
        // \def\a{X} \expandafter\b\a  ==  \b X
        let toks = expand_all("\\def\\a{X}\\expandafter\\b\\a");
        assert_eq!(toks.len(), 2);
        assert!(toks[0].is_primitive_named("b"));
        assert!(matches!(&toks[1], Token::Character { value: 'X', .. }));
    }

    #[test]
    fn meaning_of_relax_uses_escapechar() {
        let mut mouth = mouth_for("");
        let tok = Token::control_sequence("relax", false, mouth.levels[0].eyes.position());
        assert_eq!(mouth.meaning(&tok), "\\relax");
    }

    proptest::proptest! {
        // §8 "Idempotence of `\noexpand`": expanding `\noexpand X` yields
        // the exact unexpanded `X`, for any single letter `X`.
        #[test]
        fn noexpand_passes_any_letter_through_unchanged(c in "[a-z]") {
            let toks = expand_all(&format!("\\noexpand {c}"));
            proptest::prop_assert_eq!(toks.len(), 1);
            let expected = c.chars().next().unwrap();
            proptest::prop_assert!(matches!(&toks[0], Token::Character { value, .. } if *value == expected));
        }

        // Same property for an arbitrary undefined control sequence name:
        // `\noexpand` must not attempt to expand it (it has no expansion to
        // run anyway), and must hand it back verbatim.
        #[test]
        fn noexpand_passes_any_undefined_control_sequence_through_unchanged(name in "[a-z]{1,8}") {
            let toks = expand_all(&format!("\\noexpand \\{name}"));
            proptest::prop_assert_eq!(toks.len(), 1);
            proptest::prop_assert!(toks[0].is_primitive_named(&name));
        }
    }
}
