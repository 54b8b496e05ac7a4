//! `parse` subcommand (§10.5): print the eyes' raw token stream, one token
//! per line, annotated with its category and position — useful for
//! debugging category-code assignments before any macro runs.

use clap::Parser;

use crate::chars::{CharStream, SourceId};
use crate::cli::io::{EngineArgs, InputArgs, OutputArgs};
use crate::cli::traits::Execute;
use crate::environment::Environment;
use crate::error::Error;
use crate::eyes::Eyes;
use crate::token::Token;

/// Print the raw (unexpanded) token stream lexed from each document.
#[derive(Debug, Parser)]
#[command(about = "Print the raw token stream lexed from TeX document(s).")]
pub struct ParseCommand {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub input_args: InputArgs,
    #[command(flatten)]
    #[allow(missing_docs)]
    pub output_args: OutputArgs,
    #[command(flatten)]
    #[allow(missing_docs)]
    pub engine_args: EngineArgs,
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Character { value, category, pos } => {
            format!("{pos}: Character({value:?}, {category:?})")
        }
        Token::ControlSequence { name, active, pos } => {
            format!("{pos}: ControlSequence({name:?}, active={active})")
        }
        Token::Parameter { n, pos } => format!("{pos}: Parameter({n})"),
        Token::Group { open, .. } => format!("{}: Group", open.position()),
    }
}

impl Execute for ParseCommand {
    type Error = Error;

    fn execute(self) -> Result<(), Self::Error> {
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
            env.set_escapechar(self.engine_args.escapechar.chars().next(), true);
            let mut eyes = Eyes::new(stream);
            use std::io::Write;
            loop {
                match eyes.next_token(&mut env)? {
                    Some(tok) => writeln!(stdout, "{}", describe(&tok))?,
                    None => break,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_parse_command() {
        ParseCommand::command().debug_assert();
    }
}
