//! Parser-combinator core (§4.4): a small Parsec-style library, generic over
//! any [`Stream`]. The eyes and the mouth parse characters and tokens by
//! direct recursive descent instead of routing through [`Parser`] (both need
//! to mutate the environment mid-parse, which this core's pure `Stream`
//! trait does not carry); this module stands on its own as the grammar-level
//! vocabulary (`satisfy`, `many`, `alt`, ...) those hand-written parsers were
//! modelled after.
//!
//! The central design decision, carried over unchanged from the design
//! notes, is that every parser reports not just success/failure but whether
//! it *consumed* input before failing or succeeding. `<|>` (here
//! [`Parser::alt`]) only tries its right alternative when the left one
//! failed without consuming anything; a parser that consumed input and then
//! failed commits to that failure; wrap it in [`attempt`] to get
//! full backtracking.
//!
//! Combinators provided: [`satisfy`], [`any`], [`success`], [`fail`],
//! [`many`]/[`many1`], [`opt`], [`until`], [`look_ahead`], [`not`],
//! [`with_state`], [`get_state`]/[`set_state`]/[`update_state`], [`post`]
//! (post-process on success), and [`Parser::map`] (`<#>`, rename/transform a
//! result).

use std::rc::Rc;

/// Whether a parser consumed at least one item of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    Consumed,
    Empty,
}

/// The set of productions a parser would have accepted at the point it
/// failed (or, on success, the set it would additionally have accepted —
/// used by [`Parser::alt`] to merge expectations when both sides fail
/// without consuming).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Msg {
    pub expected: Vec<String>,
}

impl Msg {
    #[must_use]
    pub fn expecting(label: impl Into<String>) -> Self {
        Msg { expected: vec![label.into()] }
    }

    #[must_use]
    pub fn none() -> Self {
        Msg::default()
    }

    fn merge(self, other: Msg) -> Msg {
        let mut expected = self.expected;
        expected.extend(other.expected);
        Msg { expected }
    }
}

/// The outcome of running a parser: success with a value, remaining state,
/// and "what else would have matched here"; or failure with "what was
/// expected here".
#[derive(Debug, Clone)]
pub enum Reply<S, T> {
    Success(T, S, Msg),
    Error(Msg),
}

/// A full parse result: did it consume input, and did it succeed.
#[derive(Debug, Clone)]
pub struct ParseResult<S, T>(pub Consumed, pub Reply<S, T>);

impl<S, T> ParseResult<S, T> {
    #[must_use]
    pub fn is_err(&self) -> bool {
        matches!(self.1, Reply::Error(_))
    }
}

/// Anything a parser can consume one item at a time from, functionally:
/// `uncons` returns the next item and the remaining stream, never mutating
/// `self` in place. [`crate::token::Token`] sequences and character sources
/// both implement this by wrapping an `Rc`-shared buffer, the same pattern
/// [`crate::chars::CharStream`] uses for its source text.
pub trait Stream: Clone {
    type Item: Clone;

    fn uncons(self) -> Option<(Self::Item, Self)>;
}

/// A [`Stream`] over a shared, immutable buffer of tokens — the stream type
/// the mouth runs its combinators over.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Rc<[crate::token::Token]>,
    index: usize,
}

impl TokenStream {
    #[must_use]
    pub fn new(tokens: impl Into<Rc<[crate::token::Token]>>) -> Self {
        Self { tokens: tokens.into(), index: 0 }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index >= self.tokens.len()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.index
    }
}

impl Stream for TokenStream {
    type Item = crate::token::Token;

    fn uncons(self) -> Option<(Self::Item, Self)> {
        let item = self.tokens.get(self.index)?.clone();
        Some((item, TokenStream { tokens: self.tokens, index: self.index + 1 }))
    }
}

type RunFn<S, T> = Rc<dyn Fn(S) -> ParseResult<S, T>>;

/// A parser producing a `T` from a stream of type `S`.
///
/// Cloning a `Parser` is cheap (it clones an `Rc` to the underlying
/// closure), which is what lets combinators like [`Parser::alt`] capture
/// both alternatives by value.
pub struct Parser<S, T> {
    run: RunFn<S, T>,
}

impl<S, T> Clone for Parser<S, T> {
    fn clone(&self) -> Self {
        Parser { run: Rc::clone(&self.run) }
    }
}

impl<S: Stream + 'static, T: 'static> Parser<S, T> {
    pub fn new(f: impl Fn(S) -> ParseResult<S, T> + 'static) -> Self {
        Parser { run: Rc::new(f) }
    }

    #[must_use]
    pub fn parse(&self, state: S) -> ParseResult<S, T> {
        (self.run)(state)
    }

    /// `<#>`: map the result value, preserving consumed-ness.
    #[must_use]
    pub fn map<U: 'static>(&self, f: impl Fn(T) -> U + 'static) -> Parser<S, U> {
        let this = self.clone();
        Parser::new(move |state| match this.parse(state) {
            ParseResult(c, Reply::Success(v, rest, msg)) => ParseResult(c, Reply::Success(f(v), rest, msg)),
            ParseResult(c, Reply::Error(msg)) => ParseResult(c, Reply::Error(msg)),
        })
    }

    /// Monadic bind: run `self`, feed its value to `f` to build the next
    /// parser, and run that. Input consumed by either half counts as
    /// consumed overall.
    #[must_use]
    pub fn and_then<U: 'static>(&self, f: impl Fn(T) -> Parser<S, U> + 'static) -> Parser<S, U> {
        let this = self.clone();
        Parser::new(move |state| match this.parse(state) {
            ParseResult(Consumed::Empty, Reply::Success(v, rest, _)) => f(v).parse(rest),
            ParseResult(Consumed::Consumed, Reply::Success(v, rest, _)) => {
                match f(v).parse(rest) {
                    ParseResult(_, reply) => ParseResult(Consumed::Consumed, reply),
                }
            }
            ParseResult(c, Reply::Error(msg)) => ParseResult(c, Reply::Error(msg)),
        })
    }

    /// `<||>`: run `self` then `next`, keeping only `next`'s value.
    #[must_use]
    pub fn then_right<U: 'static>(&self, next: Parser<S, U>) -> Parser<S, U> {
        self.and_then(move |_| next.clone())
    }

    /// Run `self` then `next`, keeping only `self`'s value.
    #[must_use]
    pub fn then_left<U: 'static>(&self, next: Parser<S, U>) -> Parser<S, T>
    where
        T: Clone,
    {
        self.and_then(move |v| next.map(move |_| v.clone()))
    }

    /// `<|>`: try `self`; if it fails without consuming input, try `other`
    /// instead (merging both sides' expectation sets). A `self` that
    /// consumed input and then failed commits — `other` is never tried.
    /// Wrap `self` in [`attempt`] to opt back into full backtracking.
    #[must_use]
    pub fn alt(&self, other: Parser<S, T>) -> Parser<S, T> {
        let this = self.clone();
        Parser::new(move |state: S| match this.parse(state.clone()) {
            ParseResult(Consumed::Empty, Reply::Error(msg1)) => match other.parse(state) {
                ParseResult(c, Reply::Success(v, rest, msg2)) => {
                    ParseResult(c, Reply::Success(v, rest, msg1.merge(msg2)))
                }
                ParseResult(Consumed::Empty, Reply::Error(msg2)) => {
                    ParseResult(Consumed::Empty, Reply::Error(msg1.merge(msg2)))
                }
                consumed_error => consumed_error,
            },
            result => result,
        })
    }
}

/// Run `p`; on success, rewind the stream to `p`'s starting state (pure
/// lookahead — never consumes, regardless of whether `p` did).
#[must_use]
pub fn look_ahead<S: Stream + 'static, T: 'static>(p: Parser<S, T>) -> Parser<S, T> {
    Parser::new(move |state: S| match p.parse(state.clone()) {
        ParseResult(_, Reply::Success(v, _, msg)) => ParseResult(Consumed::Empty, Reply::Success(v, state, msg)),
        ParseResult(_, Reply::Error(msg)) => ParseResult(Consumed::Empty, Reply::Error(msg)),
    })
}

/// Negative lookahead: succeeds with `()` (consuming nothing) iff `p` would
/// fail here; fails (consuming nothing) iff `p` would succeed. Never
/// consumes input either way.
#[must_use]
pub fn not<S: Stream + 'static, T: 'static>(p: Parser<S, T>) -> Parser<S, ()> {
    Parser::new(move |state: S| match p.parse(state.clone()) {
        ParseResult(_, Reply::Success(..)) => ParseResult(Consumed::Empty, Reply::Error(Msg::none())),
        ParseResult(_, Reply::Error(_)) => ParseResult(Consumed::Empty, Reply::Success((), state, Msg::none())),
    })
}

/// Turn a consumed failure into an empty failure, restoring the original
/// stream position. This is what makes `<|>` backtrack past input `p`
/// already consumed.
#[must_use]
pub fn attempt<S: Stream + 'static, T: 'static>(p: Parser<S, T>) -> Parser<S, T> {
    Parser::new(move |state: S| match p.parse(state.clone()) {
        ParseResult(Consumed::Consumed, Reply::Error(msg)) => ParseResult(Consumed::Empty, Reply::Error(msg)),
        ParseResult(_, Reply::Error(msg)) => ParseResult(Consumed::Empty, Reply::Error(msg)),
        success @ ParseResult(_, Reply::Success(..)) => success,
    })
}

/// A parser that always succeeds with `value`, consuming nothing.
#[must_use]
pub fn success<S: Stream + 'static, T: Clone + 'static>(value: T) -> Parser<S, T> {
    Parser::new(move |state: S| ParseResult(Consumed::Empty, Reply::Success(value.clone(), state, Msg::none())))
}

/// A parser that always fails with `label` as the sole expectation,
/// consuming nothing.
#[must_use]
pub fn fail<S: Stream + 'static, T: 'static>(label: impl Into<String> + Clone + 'static) -> Parser<S, T> {
    Parser::new(move |_state: S| ParseResult(Consumed::Empty, Reply::Error(Msg::expecting(label.clone()))))
}

/// Consume and return the next item unconditionally; fails at end of input.
#[must_use]
pub fn any<S: Stream + 'static>() -> Parser<S, S::Item> {
    Parser::new(move |state: S| match state.uncons() {
        Some((item, rest)) => ParseResult(Consumed::Consumed, Reply::Success(item, rest, Msg::none())),
        None => ParseResult(Consumed::Empty, Reply::Error(Msg::expecting("any item"))),
    })
}

/// Consume the next item if `pred` accepts it; otherwise fail without
/// consuming. `label` names the production, for error messages.
#[must_use]
pub fn satisfy<S: Stream + 'static>(
    label: impl Into<String> + Clone + 'static,
    pred: impl Fn(&S::Item) -> bool + 'static,
) -> Parser<S, S::Item> {
    Parser::new(move |state: S| match state.clone().uncons() {
        Some((item, rest)) if pred(&item) => ParseResult(Consumed::Consumed, Reply::Success(item, rest, Msg::none())),
        _ => ParseResult(Consumed::Empty, Reply::Error(Msg::expecting(label.clone()))),
    })
}

/// Zero or more repetitions of `p`. Always succeeds (possibly with an empty
/// `Vec`); reports `Consumed` iff at least one repetition consumed input.
#[must_use]
pub fn many<S: Stream + 'static, T: 'static>(p: Parser<S, T>) -> Parser<S, Vec<T>> {
    Parser::new(move |mut state: S| {
        let mut out = Vec::new();
        let mut any_consumed = Consumed::Empty;
        loop {
            match p.parse(state.clone()) {
                ParseResult(Consumed::Empty, Reply::Error(_)) => break,
                ParseResult(c, Reply::Error(msg)) => {
                    // Consumed then failed mid-repetition: propagate (no
                    // backtracking past a partially-consumed final item).
                    return ParseResult(c, Reply::Error(msg));
                }
                ParseResult(c, Reply::Success(v, rest, _)) => {
                    if matches!(c, Consumed::Consumed) {
                        any_consumed = Consumed::Consumed;
                    }
                    out.push(v);
                    state = rest;
                }
            }
        }
        ParseResult(any_consumed, Reply::Success(out, state, Msg::none()))
    })
}

/// One or more repetitions of `p`.
#[must_use]
pub fn many1<S: Stream + 'static, T: 'static>(p: Parser<S, T>) -> Parser<S, Vec<T>> {
    let p2 = p.clone();
    p.and_then(move |first| {
        let rest_parser = many(p2.clone());
        rest_parser.map(move |mut rest| {
            let mut out = vec![first.clone()];
            out.append(&mut rest);
            out
        })
    })
}

/// `p`, or `default` if `p` fails without consuming input.
#[must_use]
pub fn opt<S: Stream + 'static, T: Clone + 'static>(p: Parser<S, T>, default: T) -> Parser<S, T> {
    p.alt(success(default))
}

/// Repeat `p` until `end` matches (via lookahead, without consuming `end`'s
/// match), collecting `p`'s results. Fails if input is exhausted before
/// `end` matches.
#[must_use]
pub fn until<S: Stream + 'static, T: 'static, E: 'static>(p: Parser<S, T>, end: Parser<S, E>) -> Parser<S, Vec<T>> {
    Parser::new(move |mut state: S| {
        let mut out = Vec::new();
        let mut any_consumed = Consumed::Empty;
        loop {
            if let ParseResult(_, Reply::Success(..)) = look_ahead(end.clone()).parse(state.clone()) {
                return ParseResult(any_consumed, Reply::Success(out, state, Msg::none()));
            }
            match p.parse(state.clone()) {
                ParseResult(c, Reply::Success(v, rest, _)) => {
                    if matches!(c, Consumed::Consumed) {
                        any_consumed = Consumed::Consumed;
                    }
                    out.push(v);
                    state = rest;
                }
                ParseResult(c, Reply::Error(msg)) => return ParseResult(c, Reply::Error(msg)),
            }
        }
    })
}

/// Run `action` after `p` succeeds, purely for its side effect (the design
/// notes' use case is tracing/diagnostics); returns `p`'s value unchanged.
#[must_use]
pub fn post<S: Stream + 'static, T: Clone + 'static>(p: Parser<S, T>, action: impl Fn(&T) + 'static) -> Parser<S, T> {
    p.map(move |v| {
        action(&v);
        v
    })
}

/// Read the stream state without consuming anything, e.g. to snapshot the
/// environment mid-parse.
#[must_use]
pub fn get_state<S: Stream + 'static>() -> Parser<S, S> {
    Parser::new(|state: S| ParseResult(Consumed::Empty, Reply::Success(state.clone(), state, Msg::none())))
}

/// Run `p` starting from `state` instead of whatever state it is handed,
/// discarding that incoming state. Useful for resuming a parse from a
/// snapshot taken earlier with [`get_state`].
#[must_use]
pub fn with_state<S: Stream + 'static, T: 'static>(state: S, p: Parser<S, T>) -> Parser<S, T> {
    set_state(state).then_right(p)
}

/// Replace the stream state outright.
#[must_use]
pub fn set_state<S: Stream + 'static>(new_state: S) -> Parser<S, ()> {
    Parser::new(move |_state: S| {
        ParseResult(Consumed::Empty, Reply::Success((), new_state.clone(), Msg::none()))
    })
}

/// Transform the stream state with a pure function.
#[must_use]
pub fn update_state<S: Stream + 'static>(f: impl Fn(S) -> S + 'static) -> Parser<S, S> {
    Parser::new(move |state: S| {
        let new_state = f(state);
        ParseResult(Consumed::Empty, Reply::Success(new_state.clone(), new_state, Msg::none()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Chars {
        buf: Rc<[char]>,
        index: usize,
    }

    impl Chars {
        fn new(s: &str) -> Self {
            Chars { buf: s.chars().collect::<Vec<_>>().into(), index: 0 }
        }
    }

    impl Stream for Chars {
        type Item = char;
        fn uncons(self) -> Option<(char, Chars)> {
            let c = *self.buf.get(self.index)?;
            Some((c, Chars { buf: self.buf, index: self.index + 1 }))
        }
    }

    fn char_parser(c: char) -> Parser<Chars, char> {
        satisfy(format!("'{c}'"), move |&x| x == c)
    }

    #[test]
    fn satisfy_consumes_on_match() {
        let p = char_parser('a');
        let ParseResult(c, reply) = p.parse(Chars::new("ab"));
        assert!(matches!(c, Consumed::Consumed));
        match reply {
            Reply::Success(v, rest, _) => {
                assert_eq!(v, 'a');
                assert_eq!(rest.index, 1);
            }
            Reply::Error(_) => panic!("expected success"),
        }
    }

    #[test]
    fn satisfy_fails_without_consuming() {
        let p = char_parser('x');
        let ParseResult(c, reply) = p.parse(Chars::new("ab"));
        assert!(matches!(c, Consumed::Empty));
        assert!(matches!(reply, Reply::Error(_)));
    }

    #[test]
    fn alt_tries_second_only_on_empty_failure() {
        let p = char_parser('a').alt(char_parser('b'));
        let ParseResult(_, reply) = p.parse(Chars::new("b"));
        assert!(matches!(reply, Reply::Success('b', ..)));
    }

    #[test]
    fn alt_does_not_backtrack_past_consumed_input_without_attempt() {
        // "ab" then fail -> consumed error, alt must not try the second branch.
        let ab = char_parser('a').and_then(|_| char_parser('b'));
        let ac = char_parser('a').and_then(|_| char_parser('c'));
        let p = ab.alt(ac);
        let ParseResult(c, reply) = p.parse(Chars::new("ac"));
        assert!(matches!(c, Consumed::Consumed));
        assert!(matches!(reply, Reply::Error(_)));
    }

    #[test]
    fn attempt_restores_backtracking() {
        let ab = attempt(char_parser('a').and_then(|_| char_parser('b')));
        let ac = char_parser('a').and_then(|_| char_parser('c'));
        let p = ab.alt(ac);
        let ParseResult(_, reply) = p.parse(Chars::new("ac"));
        assert!(matches!(reply, Reply::Success('c', ..)));
    }

    #[test]
    fn many_collects_zero_or_more() {
        let p = many(char_parser('a'));
        let ParseResult(_, reply) = p.parse(Chars::new("aaab"));
        match reply {
            Reply::Success(v, rest, _) => {
                assert_eq!(v, vec!['a', 'a', 'a']);
                assert_eq!(rest.index, 3);
            }
            Reply::Error(_) => panic!("many should not fail"),
        }
    }

    #[test]
    fn many1_requires_at_least_one() {
        let p = many1(char_parser('a'));
        assert!(p.parse(Chars::new("b")).is_err());
        let ParseResult(_, reply) = p.parse(Chars::new("ab"));
        assert!(matches!(reply, Reply::Success(ref v, ..) if v == &vec!['a']));
    }

    #[test]
    fn until_stops_before_end_marker() {
        let p = until(any::<Chars>(), char_parser(';'));
        let ParseResult(_, reply) = p.parse(Chars::new("ab;c"));
        match reply {
            Reply::Success(v, rest, _) => {
                assert_eq!(v, vec!['a', 'b']);
                assert_eq!(rest.index, 2);
            }
            Reply::Error(_) => panic!("until should succeed"),
        }
    }

    #[test]
    fn look_ahead_does_not_consume() {
        let p = look_ahead(char_parser('a'));
        let ParseResult(c, reply) = p.parse(Chars::new("ab"));
        assert!(matches!(c, Consumed::Empty));
        match reply {
            Reply::Success(v, rest, _) => {
                assert_eq!(v, 'a');
                assert_eq!(rest.index, 0);
            }
            Reply::Error(_) => panic!("expected success"),
        }
    }

    #[test]
    fn not_succeeds_only_when_inner_fails() {
        let p = not(char_parser('a'));
        assert!(!p.parse(Chars::new("b")).is_err());
        assert!(p.parse(Chars::new("a")).is_err());
    }

    #[test]
    fn opt_falls_back_to_default() {
        let p = opt(char_parser('a'), 'z');
        let ParseResult(_, reply) = p.parse(Chars::new("b"));
        assert!(matches!(reply, Reply::Success('z', ..)));
    }

    #[test]
    fn state_combinators_round_trip() {
        let p = get_state::<Chars>().then_right(update_state(|s: Chars| s));
        let ParseResult(_, reply) = p.parse(Chars::new("ab"));
        assert!(matches!(reply, Reply::Success(..)));
    }

    #[test]
    fn with_state_resumes_from_a_snapshot() {
        let p = with_state(Chars::new("xy"), char_parser('x'));
        let ParseResult(_, reply) = p.parse(Chars::new("ab"));
        assert!(matches!(reply, Reply::Success('x', ..)));
    }
}
