//! `dependencies` subcommand (§10.5): walks `\input` calls using the eyes
//! directly (no expansion — an `\input` whose filename a macro would
//! produce is out of scope here, same as the teacher's own regex scanner
//! never traced through macros either), printing the tree of files it
//! reaches. Replaces the teacher's `deps.rs`, which scraped `\input{...}`
//! with a `Regex` and rendered the result with `ptree` — neither crate is
//! declared in the teacher's own `Cargo.toml`, so that module never
//! actually built; this reimplementation uses only what the engine itself
//! already provides.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::category::Category;
use crate::chars::{CharStream, SourceId};
use crate::cli::io::InputArgs;
use crate::cli::traits::Execute;
use crate::environment::Environment;
use crate::error::Error;
use crate::eyes::Eyes;
use crate::token::Token;

/// Print the `\input` dependency tree of each document.
#[derive(Debug, Parser)]
#[command(about = "Print the \\input dependency tree of TeX document(s).")]
pub struct DependenciesCommand {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub input_args: InputArgs,
}

/// Scan `source`'s raw token stream for `\input` invocations and return the
/// filenames they name, in order. Accepts both plain-TeX's
/// `\input foo` (whitespace-delimited) and the brace-delimited
/// `\input{foo}` convention LaTeX documents typically use.
fn scan_input_names(source: &str) -> crate::error::Result<Vec<String>> {
    let stream = CharStream::new(SourceId(0), "<dependencies>", source);
    let mut env = Environment::new();
    let mut eyes = Eyes::new(stream);
    let mut names = Vec::new();
    while let Some(tok) = eyes.next_token(&mut env)? {
        if !tok.is_primitive_named("input") {
            continue;
        }
        let mut name = String::new();
        let mut in_braces = false;
        loop {
            match eyes.next_token(&mut env)? {
                Some(Token::Character { value: '{', category: Category::BeginGroup, .. }) if name.is_empty() => {
                    in_braces = true;
                }
                Some(Token::Character { value: '}', category: Category::EndGroup, .. }) if in_braces => {
                    break;
                }
                Some(Token::Character { value: ' ', category: Category::Space, .. }) if !in_braces => {
                    break;
                }
                Some(Token::Character { value, .. }) => name.push(value),
                _ => break,
            }
        }
        if !name.is_empty() {
            names.push(name);
        }
    }
    Ok(names)
}

fn with_tex_extension(name: &str) -> PathBuf {
    let mut path = PathBuf::from(name);
    if path.extension().is_none() {
        path.set_extension("tex");
    }
    path
}

fn print_tree(
    path: &Path,
    base_dir: &Path,
    depth: usize,
    seen: &mut HashSet<PathBuf>,
) {
    let indent = "  ".repeat(depth);
    println!("{indent}{}", path.display());
    let resolved = if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) };
    if !seen.insert(resolved.clone()) {
        println!("{indent}  (already visited)");
        return;
    }
    let Ok(contents) = std::fs::read_to_string(&resolved) else {
        return;
    };
    let Ok(names) = scan_input_names(&contents) else {
        return;
    };
    let child_dir = resolved.parent().unwrap_or(base_dir);
    for name in names {
        print_tree(&with_tex_extension(&name), child_dir, depth + 1, seen);
    }
}

impl Execute for DependenciesCommand {
    type Error = Error;

    fn execute(self) -> Result<(), Self::Error> {
        let mut seen = HashSet::new();
        if self.input_args.filenames.is_empty() {
            let sources = self.input_args.read_sources()?;
            for source in &sources {
                let names = scan_input_names(source)?;
                println!("<stdin>");
                for name in names {
                    print_tree(&with_tex_extension(&name), &self.input_args.directory, 1, &mut seen);
                }
            }
        } else {
            for filename in &self.input_args.filenames {
                let base_dir = filename.parent().unwrap_or(Path::new("."));
                print_tree(filename, base_dir, 0, &mut seen);
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
    fn test_dependencies_command() {
        DependenciesCommand::command().debug_assert();
    }

    #[test]
    fn scans_brace_and_space_delimited_input() {
        let names = scan_input_names("\\input{foo}\\input bar ").unwrap();
        assert_eq!(names, vec!["foo".to_string(), "bar".to_string()]);
    }
}
