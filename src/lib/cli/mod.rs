//! Command line tools.
//!
//! This module is specifically designed to be used by UnTeX's binary target.
//! It contains all the content needed to create UnTeX's command line interface.
//!
//! Each subcommand of the CLI should be runnable only using its arguments.
//! This is why subcommands derive the [`clap::Parser`] trait.

pub mod check;
pub mod color;
pub mod dependencies;
pub mod expand;
pub mod highlight;
pub mod io;
pub mod parse;
pub mod traits;
use clap::{CommandFactory, Parser, Subcommand};
pub use traits::*;
#[cfg(feature = "cli-complete")]
pub mod complete;

/// Main command line structure. Contains every subcommand.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "UnTex: TeX files manipulations made easy.",
    propagate_version(true),
    subcommand_required(true),
    verbatim_doc_comment
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Enumerate all possible commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the eyes and the mouth to completion, reporting the first error.
    Check(check::CheckCommand),
    /// Print the `\input` dependency tree.
    #[clap(visible_alias = "deps")]
    Dependencies(dependencies::DependenciesCommand),
    /// Print the mouth's fully expanded primitive token stream.
    Expand(expand::ExpandCommand),
    /// Recolor source by category code or by primitive name.
    #[clap(visible_alias = "hl")]
    Highlight(highlight::HighlightCommand),
    /// Print the eyes' raw (unexpanded) token stream.
    Parse(parse::ParseCommand),
    #[cfg(feature = "cli-complete")]
    Complete(complete::CompleteCommand),
}

/// Build a command from the top-level command line structure.
pub fn build_cli() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }
}
