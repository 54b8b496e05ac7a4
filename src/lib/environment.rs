//! Scoped environment (§3 "Environment"): category codes, control-sequence
//! bindings, registers, and the handful of internal parameters the mouth
//! consults (`\escapechar`, the current typesetting mode).
//!
//! Implemented as a stack of [`Frame`]s, the root always at index 0, per the
//! design notes' "Environment scoping... a stack of open-addressed maps,
//! chained on lookup". A scoped write touches the top frame; a global write
//! touches the root and clears any shadowing entry above it, so that a
//! subsequent lookup (which always walks top-down) sees the global value.

use std::collections::HashMap;

use crate::category::{default_category, Category};
use crate::token::Token;

/// A scaled-point dimension. Glue arithmetic is out of scope (Non-goals);
/// this newtype exists only so `\ifdim` and dimension lexing have a type to
/// compare, distinct from plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Dimen(pub i64);

/// TeX's typesetting mode, read by the `\ifvmode`/`\ifhmode`/`\ifmmode`/
/// `\ifinner` predicates (§4.3.6). The stomach (out of scope) is the only
/// component that would normally change this; the engine exposes it as part
/// of the environment so the conditionals have something real to test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Outer vertical mode (building the main vertical list).
    Vertical,
    /// Vertical mode inside a `\vbox` or similar.
    InternalVertical,
    /// Horizontal mode (building a paragraph).
    Horizontal,
    /// Horizontal mode inside an `\hbox`.
    RestrictedHorizontal,
    /// Non-display math mode.
    Math,
    /// Display math mode.
    DisplayMath,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Vertical
    }
}

impl Mode {
    /// `\ifvmode`.
    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Mode::Vertical | Mode::InternalVertical)
    }

    /// `\ifhmode`.
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Mode::Horizontal | Mode::RestrictedHorizontal)
    }

    /// `\ifmmode`.
    #[must_use]
    pub fn is_math(self) -> bool {
        matches!(self, Mode::Math | Mode::DisplayMath)
    }

    /// `\ifinner`. Per SPEC_FULL §9's resolved Open Question: this reads its
    /// own name and tests the true inner-mode predicate (internal vertical,
    /// restricted horizontal, or non-display math), rather than copying
    /// `\ifmmode`'s predicate as one of the teacher's ancestors did.
    #[must_use]
    pub fn is_inner(self) -> bool {
        matches!(self, Mode::InternalVertical | Mode::RestrictedHorizontal | Mode::Math)
    }
}

/// One element of a macro's parameter text (§3 "Parameter-text"): either a
/// parameter slot, or a run of literal delimiter tokens that must match
/// exactly at the call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamPart {
    /// `#n`.
    Param(u8),
    /// A maximal run of non-parameter tokens the call site must match
    /// literally. The trailing `#{` brace-trigger (§4.3.3) is recorded as a
    /// `Delimiter` holding a single synthetic begin-group token.
    Delimiter(Vec<Token>),
}

/// `\global`/`\long`/`\outer`, the three modifiers a `\def`-family macro may
/// carry (§3 "ControlSequence").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Install into the root frame rather than the current one.
    pub global: bool,
    /// Permit `\par` inside undelimited/delimited arguments.
    pub long: bool,
    /// Forbid use of this macro inside another macro's argument (tracked,
    /// but — since the stomach that would call macros "in the wild" is out
    /// of scope — never itself triggers an error in this crate).
    pub outer: bool,
}

/// A user-defined macro, installed by the `\def` family (§4.3.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// The macro's own name, for `\meaning` and error messages.
    pub name: String,
    /// `\global`/`\long`/`\outer`.
    pub modifiers: Modifiers,
    /// The parameter text.
    pub params: Vec<ParamPart>,
    /// The replacement text; `#n` placeholders are [`Token::Parameter`].
    pub replacement: Vec<Token>,
    /// `true` for `\edef`/`\xdef` (expansion ran at definition time).
    pub expand_now: bool,
}

/// What a control-sequence name is bound to (§3 "ControlSequence").
///
/// Named `Binding` rather than `ControlSequence` to avoid clashing with
/// [`Token::ControlSequence`], which is the *occurrence* of a name in the
/// token stream; this is what that name currently *means*.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// A control sequence handled by the mouth or the stomach.
    Primitive(&'static str),
    /// A user-defined macro.
    Macro(Macro),
    /// `\countdef`.
    CountDef(usize),
    /// `\dimendef`.
    DimenDef(usize),
    /// `\skipdef`.
    SkipDef(usize),
    /// `\muskipdef`.
    MuskipDef(usize),
    /// `\chardef`.
    CharDef(char),
    /// `\mathchardef`.
    MathCharDef(u32),
    /// `\toksdef`.
    TokenList(usize),
    /// A font selector installed by `\font`.
    Font(String),
}

/// Every control sequence the mouth itself interprets (§6 "Primitive name
/// set"), registered into the root frame at startup so that `\csname`,
/// `\ifx`, and `\meaning` all see them as bound.
pub const PRIMITIVE_NAMES: &[&str] = &[
    "ifnum", "ifdim", "ifodd", "ifvmode", "ifhmode", "ifmmode", "ifinner", "if", "ifcat", "ifx",
    "else", "fi", "number", "romannumeral", "string", "jobname", "fontname", "meaning", "csname",
    "endcsname", "expandafter", "noexpand", "input", "endinput", "the", "def", "edef", "gdef",
    "xdef", "global", "long", "outer", "relax", "par",
];

/// One level of grouping: a character→category table, a name→[`Binding`]
/// table, the four register kinds, and the internal `\escapechar`.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    catcodes: HashMap<char, Category>,
    bindings: HashMap<String, Binding>,
    counts: HashMap<usize, i64>,
    dimens: HashMap<usize, Dimen>,
    skips: HashMap<usize, i64>,
    muskips: HashMap<usize, i64>,
    escapechar: Option<char>,
}

/// The scoped environment: a stack of [`Frame`]s plus the current
/// typesetting [`Mode`]. `enter_group`/`leave_group` push/pop a frame;
/// lookups walk the stack root-ward; a `global` write targets the root and
/// erases any shadowing entry above it.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<Frame>,
    /// Current typesetting mode, read by the mode conditionals.
    pub mode: Mode,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A fresh environment with IniTeX's built-in categories (handled
    /// lazily by [`default_category`] whenever no frame overrides a
    /// character) and one [`Binding::Primitive`] per name in
    /// [`PRIMITIVE_NAMES`].
    #[must_use]
    pub fn new() -> Self {
        let mut root = Frame {
            escapechar: Some('\\'),
            ..Frame::default()
        };
        for name in PRIMITIVE_NAMES {
            root.bindings.insert((*name).to_string(), Binding::Primitive(name));
        }
        Self {
            frames: vec![root],
            mode: Mode::default(),
        }
    }

    /// Push a fresh, empty frame (opening a `{`-group).
    pub fn enter_group(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pop the top frame (closing a `}`-group), discarding any non-global
    /// assignment made inside it.
    ///
    /// # Errors
    ///
    /// Returns an error message if called on the root frame, an
    /// unrecoverable invariant violation (every successfully parsed group
    /// pairs its `enter_group` with exactly one `leave_group`).
    pub fn leave_group(&mut self) -> Result<(), &'static str> {
        if self.frames.len() <= 1 {
            return Err("cannot leave the root group");
        }
        self.frames.pop();
        Ok(())
    }

    /// Current nesting depth (1 = root only).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The category currently assigned to `c`.
    #[must_use]
    pub fn category(&self, c: char) -> Category {
        for frame in self.frames.iter().rev() {
            if let Some(cat) = frame.catcodes.get(&c) {
                return *cat;
            }
        }
        default_category(c)
    }

    /// Assign a category code to `c`.
    pub fn set_category(&mut self, c: char, category: Category, global: bool) {
        if global {
            self.frames[0].catcodes.insert(c, category);
            for frame in self.frames.iter_mut().skip(1) {
                frame.catcodes.remove(&c);
            }
        } else {
            self.frames.last_mut().unwrap().catcodes.insert(c, category);
        }
    }

    /// Look up what `name` is currently bound to.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        for frame in self.frames.iter().rev() {
            if let Some(binding) = frame.bindings.get(name) {
                return Some(binding);
            }
        }
        None
    }

    /// Bind `name` to `binding`.
    pub fn bind(&mut self, name: impl Into<String>, binding: Binding, global: bool) {
        let name = name.into();
        if global {
            self.frames[0].bindings.insert(name.clone(), binding);
            for frame in self.frames.iter_mut().skip(1) {
                frame.bindings.remove(&name);
            }
        } else {
            self.frames.last_mut().unwrap().bindings.insert(name, binding);
        }
    }

    /// The current `\escapechar`, or `None` if it has been set to a negative
    /// value (TeX's way of suppressing the escape character in `\string`
    /// output).
    #[must_use]
    pub fn escapechar(&self) -> Option<char> {
        for frame in self.frames.iter().rev() {
            if let Some(c) = frame.escapechar {
                return Some(c);
            }
        }
        Some('\\')
    }

    /// Set `\escapechar`.
    pub fn set_escapechar(&mut self, c: Option<char>, global: bool) {
        if global {
            self.frames[0].escapechar = c;
            for frame in self.frames.iter_mut().skip(1) {
                frame.escapechar = None;
            }
        } else {
            self.frames.last_mut().unwrap().escapechar = c;
        }
    }

    /// Read a `\count` register (defaults to 0).
    #[must_use]
    pub fn count(&self, index: usize) -> i64 {
        self.frames.iter().rev().find_map(|f| f.counts.get(&index).copied()).unwrap_or(0)
    }

    /// Write a `\count` register.
    pub fn set_count(&mut self, index: usize, value: i64, global: bool) {
        if global {
            self.frames[0].counts.insert(index, value);
            for frame in self.frames.iter_mut().skip(1) {
                frame.counts.remove(&index);
            }
        } else {
            self.frames.last_mut().unwrap().counts.insert(index, value);
        }
    }

    /// Read a `\dimen` register (defaults to 0pt).
    #[must_use]
    pub fn dimen(&self, index: usize) -> Dimen {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.dimens.get(&index).copied())
            .unwrap_or_default()
    }

    /// Write a `\dimen` register.
    pub fn set_dimen(&mut self, index: usize, value: Dimen, global: bool) {
        if global {
            self.frames[0].dimens.insert(index, value);
            for frame in self.frames.iter_mut().skip(1) {
                frame.dimens.remove(&index);
            }
        } else {
            self.frames.last_mut().unwrap().dimens.insert(index, value);
        }
    }

    /// Read a `\skip` register's magnitude (defaults to 0).
    #[must_use]
    pub fn skip(&self, index: usize) -> i64 {
        self.frames.iter().rev().find_map(|f| f.skips.get(&index).copied()).unwrap_or(0)
    }

    /// Write a `\skip` register.
    pub fn set_skip(&mut self, index: usize, value: i64, global: bool) {
        if global {
            self.frames[0].skips.insert(index, value);
            for frame in self.frames.iter_mut().skip(1) {
                frame.skips.remove(&index);
            }
        } else {
            self.frames.last_mut().unwrap().skips.insert(index, value);
        }
    }

    /// Read a `\muskip` register's magnitude (defaults to 0).
    #[must_use]
    pub fn muskip(&self, index: usize) -> i64 {
        self.frames.iter().rev().find_map(|f| f.muskips.get(&index).copied()).unwrap_or(0)
    }

    /// Write a `\muskip` register.
    pub fn set_muskip(&mut self, index: usize, value: i64, global: bool) {
        if global {
            self.frames[0].muskips.insert(index, value);
            for frame in self.frames.iter_mut().skip(1) {
                frame.muskips.remove(&index);
            }
        } else {
            self.frames.last_mut().unwrap().muskips.insert(index, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_category_falls_through_empty_env() {
        let env = Environment::new();
        assert_eq!(env.category('\\'), Category::Escape);
        assert_eq!(env.category('a'), Category::Letter);
    }

    #[test]
    fn scoped_write_is_discarded_on_leave_group() {
        let mut env = Environment::new();
        env.enter_group();
        env.set_category('1', Category::Letter, false);
        assert_eq!(env.category('1'), Category::Letter);
        env.leave_group().unwrap();
        assert_eq!(env.category('1'), Category::Other);
    }

    #[test]
    fn global_write_survives_leave_group_and_shadows() {
        let mut env = Environment::new();
        env.enter_group();
        env.set_category('^', Category::Superscript, false);
        env.set_category('^', Category::Letter, true);
        assert_eq!(env.category('^'), Category::Letter);
        env.leave_group().unwrap();
        assert_eq!(env.category('^'), Category::Letter);
    }

    #[test]
    fn leave_group_on_root_errors() {
        let mut env = Environment::new();
        assert!(env.leave_group().is_err());
    }

    #[test]
    fn primitives_are_bound_at_root() {
        let env = Environment::new();
        assert!(matches!(env.lookup("def"), Some(Binding::Primitive("def"))));
        assert!(env.lookup("undefined-name").is_none());
    }

    #[test]
    fn registers_default_to_zero_and_scope_correctly() {
        let mut env = Environment::new();
        assert_eq!(env.count(0), 0);
        env.enter_group();
        env.set_count(0, 5, false);
        assert_eq!(env.count(0), 5);
        env.leave_group().unwrap();
        assert_eq!(env.count(0), 0);
    }

    #[test]
    fn ifinner_is_true_only_for_inner_modes() {
        assert!(Mode::InternalVertical.is_inner());
        assert!(Mode::RestrictedHorizontal.is_inner());
        assert!(Mode::Math.is_inner());
        assert!(!Mode::DisplayMath.is_inner());
        assert!(!Mode::Vertical.is_inner());
        assert!(!Mode::Horizontal.is_inner());
    }
}
