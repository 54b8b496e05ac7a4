//! `expand` subcommand (§10.5): print the mouth's fully expanded primitive
//! token stream.

use clap::Parser;

use crate::chars::{CharStream, FilesystemResolver, SourceId};
use crate::cli::io::{EngineArgs, InputArgs, OutputArgs};
use crate::cli::traits::Execute;
use crate::error::Error;
use crate::orchestrator::Engine;

/// Print the fully expanded primitive token stream of each document.
#[derive(Debug, Parser)]
#[command(about = "Print the fully expanded token stream of TeX document(s).")]
pub struct ExpandCommand {
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

impl Execute for ExpandCommand {
    type Error = Error;

    fn execute(self) -> Result<(), Self::Error> {
        let sources = self.input_args.read_sources()?;
        let mut stdout = self.output_args.stdout();
        let directory = self.input_args.directory.clone();
        for (index, source) in sources.iter().enumerate() {
            let job_name = self.input_args.job_name_for(index);
            let name = self
                .input_args
                .filenames
                .get(index)
                .map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string());
            let stream = CharStream::new(SourceId(index), name, source.clone());
            let resolver = Box::new(FilesystemResolver::new(directory.clone()));
            let options = self.engine_args.engine_options(job_name);
            let mut engine = Engine::new(stream, resolver, options);
            let escapechar = engine.environment().escapechar();
            use std::io::Write;
            loop {
                match engine.next_expanded()? {
                    Some(tok) => writeln!(stdout, "{}", tok.string_form(escapechar))?,
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
    fn test_expand_command() {
        ExpandCommand::command().debug_assert();
    }
}
