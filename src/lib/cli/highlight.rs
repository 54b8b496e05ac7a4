//! `highlight` subcommand (§10.5): recolor source text by category code or
//! by primitive control-sequence name, using the eyes' own raw token
//! stream. Replaces the teacher's `MathHighlighter`/`PreambleHighlighter`
//! family, which highlighted LaTeX document structure — a concept this
//! crate's scope no longer models, since the "stomach" that would know
//! what a preamble or a math formula is has been dropped per SPEC_FULL's
//! Non-goals.

use std::io::Write;

use clap::Parser;
use termcolor::{ColorSpec, WriteColor};

use crate::category::{Category, CategoryDiscriminants};
use crate::chars::{CharStream, SourceId};
use crate::cli::io::{InputArgs, OutputArgs};
use crate::cli::traits::Execute;
use crate::environment::Environment;
use crate::error::Error;
use crate::eyes::Eyes;
use crate::token::Token;

fn category_of(discriminant: CategoryDiscriminants) -> Category {
    match discriminant {
        CategoryDiscriminants::Escape => Category::Escape,
        CategoryDiscriminants::BeginGroup => Category::BeginGroup,
        CategoryDiscriminants::EndGroup => Category::EndGroup,
        CategoryDiscriminants::MathShift => Category::MathShift,
        CategoryDiscriminants::AlignTab => Category::AlignTab,
        CategoryDiscriminants::EndOfLine => Category::EndOfLine,
        CategoryDiscriminants::Parameter => Category::Parameter,
        CategoryDiscriminants::Superscript => Category::Superscript,
        CategoryDiscriminants::Subscript => Category::Subscript,
        CategoryDiscriminants::Ignored => Category::Ignored,
        CategoryDiscriminants::Space => Category::Space,
        CategoryDiscriminants::Letter => Category::Letter,
        CategoryDiscriminants::Other => Category::Other,
        CategoryDiscriminants::Active => Category::Active,
        CategoryDiscriminants::Comment => Category::Comment,
        CategoryDiscriminants::Invalid => Category::Invalid,
    }
}

/// What to highlight: either every character of one category, or every
/// occurrence of one (non-active) control-sequence/primitive name.
enum Selector {
    Category(Category),
    Name(String),
}

impl Selector {
    fn matches(&self, tok: &Token) -> bool {
        match (self, tok) {
            (Selector::Category(cat), Token::Character { category, .. }) => category == cat,
            (Selector::Name(name), Token::ControlSequence { name: n, active: false, .. }) => n == name,
            _ => false,
        }
    }
}

/// The byte length of `tok`'s own textual span in the original source, used
/// to know how many bytes of `source` to colorize around its [`Position`].
fn token_span_len(tok: &Token, escapechar: Option<char>) -> usize {
    match tok {
        Token::Character { value, .. } => value.len_utf8(),
        Token::ControlSequence { name, active: true, .. } => name.len(),
        Token::ControlSequence { name, active: false, .. } => {
            let escape_len = escapechar.map_or(0, char::len_utf8);
            escape_len + name.len()
        }
        // the Parameter catcode character itself, plus its digit.
        Token::Parameter { .. } => 2,
        Token::Group { .. } => 0,
    }
}

/// Highlight parts of a TeX document by category code or primitive name.
#[derive(Debug, Parser)]
#[command(
    about = "Highlight parts of TeX document(s) by category code or primitive name.",
    override_usage = "untex highlight --category <CATEGORY> [FILENAMES]...\n    untex highlight --token <NAME> [FILENAMES]...\n    command | untex highlight --category <CATEGORY>\n    command | untex highlight --token <NAME>"
)]
pub struct HighlightCommand {
    /// Category of characters to highlight.
    /// Cannot be used with `--token <NAME>`.
    #[arg(short, long, conflicts_with("token"), value_enum)]
    category: Option<CategoryDiscriminants>,
    /// Name of the control sequence (primitive or not) to highlight.
    /// Cannot be used with `--category <CATEGORY>`.
    #[arg(short, long, conflicts_with("category"))]
    pub token: Option<String>,
    #[command(flatten)]
    #[allow(missing_docs)]
    pub input_args: InputArgs,
    #[command(flatten)]
    #[allow(missing_docs)]
    pub output_args: OutputArgs,
}

impl Execute for HighlightCommand {
    type Error = Error;
    fn execute(self) -> Result<(), Self::Error> {
        let selector = match (self.category, self.token.clone()) {
            (Some(cat), _) => Selector::Category(category_of(cat)),
            (None, Some(name)) => Selector::Name(name),
            (None, None) => Selector::Category(Category::Other),
        };

        let color: ColorSpec = self.output_args.color_args.into();
        let sources = self.input_args.read_sources()?;
        let mut stdout = self.output_args.stdout();

        for (index, source) in sources.iter().enumerate() {
            let name = self
                .input_args
                .filenames
                .get(index)
                .map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string());
            let stream = CharStream::new(SourceId(index), name, source.clone());
            let mut env = Environment::new();
            let escapechar = env.escapechar();
            let mut eyes = Eyes::new(stream);
            let mut cursor = 0usize;

            while let Some(tok) = eyes.next_token(&mut env)? {
                let start = tok.position().offset;
                if start > cursor {
                    stdout.write_all(source[cursor..start].as_bytes())?;
                }
                let len = token_span_len(&tok, escapechar);
                let end = (start + len).min(source.len());
                let span = &source[start..end];
                if selector.matches(&tok) {
                    stdout.set_color(&color)?;
                    stdout.write_all(span.as_bytes())?;
                    stdout.reset()?;
                } else {
                    stdout.write_all(span.as_bytes())?;
                }
                cursor = end;
            }
            if cursor < source.len() {
                stdout.write_all(source[cursor..].as_bytes())?;
            }
            writeln!(stdout)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_highlight_command() {
        HighlightCommand::command().debug_assert();
    }

    #[test]
    fn category_and_token_are_mutually_exclusive() {
        let m = HighlightCommand::try_parse_from(vec!["", "--category", "letter", "--token", "def"]);
        assert!(m.is_err());
    }

    #[test]
    fn parses_category_selector() {
        let m = HighlightCommand::try_parse_from(vec!["", "--category", "letter"]).unwrap();
        assert!(matches!(m.category, Some(CategoryDiscriminants::Letter)));
    }

    #[test]
    fn parses_token_selector() {
        let m = HighlightCommand::try_parse_from(vec!["", "--token", "def"]).unwrap();
        assert_eq!(m.token.as_deref(), Some("def"));
    }
}
