use clap::Parser;
use untex::cli::traits::Execute;
use untex::cli::{Cli, Command};

pub fn main() {
    let cli = Cli::parse_from(wild::args());

    let result = match cli.command {
        Command::Check(cmd) => cmd.execute().map_err(|e| e.to_string()),
        Command::Dependencies(cmd) => cmd.execute().map_err(|e| e.to_string()),
        Command::Expand(cmd) => cmd.execute().map_err(|e| e.to_string()),
        Command::Highlight(cmd) => cmd.execute().map_err(|e| e.to_string()),
        Command::Parse(cmd) => cmd.execute().map_err(|e| e.to_string()),
        #[cfg(feature = "cli-complete")]
        Command::Complete(cmd) => cmd.execute().map_err(|e| e.to_string()),
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}
