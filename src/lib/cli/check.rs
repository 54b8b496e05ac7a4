//! `check` subcommand (§10.5): run source → eyes → mouth to completion over
//! each file, reporting the first [`Error`] encountered (if any). Replaces
//! the teacher's regex-based `check_file`, which matched bracket balance
//! with a hand-rolled scanner instead of actually lexing and expanding.

use clap::Parser;

use crate::chars::{CharStream, FilesystemResolver, SourceId};
use crate::cli::io::{EngineArgs, InputArgs};
use crate::cli::traits::Execute;
use crate::error::Error;
use crate::orchestrator::Engine;

/// Check that each given document expands to completion without error.
#[derive(Debug, Parser)]
#[command(about = "Check TeX document(s) expand without error.")]
pub struct CheckCommand {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub input_args: InputArgs,
    #[command(flatten)]
    #[allow(missing_docs)]
    pub engine_args: EngineArgs,
}

impl Execute for CheckCommand {
    type Error = Error;

    fn execute(self) -> Result<(), Self::Error> {
        let sources = self.input_args.read_sources()?;
        let directory = self.input_args.directory.clone();
        let mut failed = false;
        for (index, source) in sources.iter().enumerate() {
            let job_name = self.input_args.job_name_for(index);
            let name = self
                .input_args
                .filenames
                .get(index)
                .map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string());
            let stream = CharStream::new(SourceId(index), name.clone(), source.clone());
            let resolver = Box::new(FilesystemResolver::new(directory.clone()));
            let options = self.engine_args.engine_options(job_name);
            let mut engine = Engine::new(stream, resolver, options);
            loop {
                match engine.next_expanded() {
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        eprintln!("{name}: {e}");
                        failed = true;
                        break;
                    }
                }
            }
        }
        if failed {
            std::process::exit(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_check_command() {
        CheckCommand::command().debug_assert();
    }
}
