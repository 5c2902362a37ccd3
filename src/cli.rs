//! Command line: compile | validate | split
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::cache::{cache_path, load_schema, stamp};
use crate::compile::{compile, CompileErrors};
use crate::emit::emit_document;
use crate::error::RncError;
use crate::pretty::pretty;
use crate::report::{Outcome, RecordOutcome, RunStats};
use crate::split::split_records;
use crate::stream::{self, StreamOptions};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile JSON-RNC schemas and validate streams of JSON records against them
#[derive(Parser, Debug)]
#[command(name = "json-rnc", version)]
pub struct CommandLineInterface {
    /// trace compiler and validator internals on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile a JSON-RNC schema and print the JSON-Schema document
    Compile(CompileOut),
    /// validate JSON records against a schema
    Validate(ValidateRun),
    /// print each JSON value of the input on a single line
    Split(SplitOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin (the default)
    #[arg(long, short, num_args = 1..)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    /// JSON-RNC source file
    schema: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// keep keys in schema order instead of sorting them
    #[arg(long)]
    no_sort: bool,
}

#[derive(clap::Parser, Debug)]
struct ValidateRun {
    /// compiled schema (.json) or JSON-RNC source, compiled through its .rnc.json cache
    schema: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,

    /// input holds JSON values spread over several lines instead of one record per line
    #[arg(long, short)]
    split: bool,

    /// slash separated field path identifying records in messages (e.g. '_id/$oid')
    #[arg(long)]
    id: Option<String>,

    /// print statistics about error messages
    #[arg(long)]
    stats: bool,

    /// do not print per-record messages
    #[arg(long)]
    nolog: bool,

    /// print the invalid records as a sed script deleting them
    #[arg(long)]
    sed: bool,

    /// records holding an object with a repeated key are bad
    #[arg(long)]
    strict_keys: bool,

    /// validate records on all cores
    #[arg(long)]
    parallel: bool,

    /// always recompile a JSON-RNC schema
    #[arg(long)]
    no_cache: bool,
}

#[derive(clap::Parser, Debug)]
struct SplitOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Every input's text, labelled by where it came from.
    fn load_all(&self) -> anyhow::Result<Vec<(String, String)>> {
        if self.input.is_empty() || self.input.iter().all(|i| i == "-") {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
            return Ok(vec![("-".to_string(), text)]);
        }
        let source_paths = resolve_file_path_patterns(self.input.iter().filter(|i| *i != "-"))
            .context("failed to resolve input file paths")?;
        source_paths
            .into_iter()
            .map(|path| {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read source file {}", path.display()))?;
                Ok((path.display().to_string(), text))
            })
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Runs the selected command; the result is the process exit status.
    pub fn run(&self) -> anyhow::Result<u8> {
        match &self.cmd {
            Command::Compile(target) => target.run(),
            Command::Validate(target) => target.run(),
            Command::Split(target) => {
                for (_, text) in target.input_settings.load_all()? {
                    for record in split_records(&text) {
                        println!("{record}");
                    }
                }
                Ok(0)
            }
        }
    }
}

impl CompileOut {
    fn run(&self) -> anyhow::Result<u8> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        let mut doc = match compile(&source) {
            Ok(doc) => doc,
            Err(errors) => {
                print_compile_errors(&errors, &source, &self.schema);
                return Ok(1);
            }
        };
        stamp(&mut doc, &self.schema);
        let text = pretty(&emit_document(&doc), !self.no_sort);
        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent.display()))?;
                }
                std::fs::write(out, &text).with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => print!("{text}"),
        }
        Ok(0)
    }
}

impl ValidateRun {
    fn run(&self) -> anyhow::Result<u8> {
        let doc = match load_schema(&self.schema, !self.no_cache) {
            Ok(doc) => doc,
            Err(RncError::Compile(errors)) => {
                let source = std::fs::read_to_string(&self.schema).unwrap_or_default();
                print_compile_errors(&errors, &source, &cache_path(&self.schema));
                return Ok(1);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to load schema {}", self.schema.display()));
            }
        };
        let options = StreamOptions {
            id: self.id.clone(),
            strict_keys: self.strict_keys,
            parallel: self.parallel,
            progress: self.nolog,
        };
        let inputs = self.input_settings.load_all()?;
        let mut stats = RunStats::new();
        for (label, text) in &inputs {
            let records = if self.split { stream::split_stream(text) } else { stream::line_records(text) };
            let prefix = if inputs.len() > 1 { format!("{label}:") } else { String::new() };
            stream::run(&doc, &records, &options, &mut stats, |outcome, duplicate_of| {
                if !self.nolog {
                    log_outcome(&prefix, outcome, duplicate_of);
                }
            });
        }
        if stats.all_valid() {
            println!("{}", stats.summary().green());
        } else {
            println!("{}", stats.summary().yellow());
        }
        if self.stats {
            print!("{}", stats.render_histogram());
        }
        if self.sed {
            for command in stats.sed_commands() {
                println!("{command}");
            }
        }
        Ok(stats.exit_code())
    }
}

fn log_outcome(prefix: &str, outcome: &RecordOutcome, duplicate_of: Option<usize>) {
    match &outcome.outcome {
        Outcome::Valid => {}
        Outcome::Invalid(diagnostics) => {
            println!("{prefix}{}:{}", outcome.id, outcome.preview);
            for d in diagnostics {
                let line = d.to_string();
                if d.issue.is_schema_error() {
                    println!("{}", line.red());
                } else {
                    println!("{line}");
                }
            }
        }
        Outcome::Bad(message) => {
            println!("{prefix}{} {}: bad json object: {message}", "Item".red(), outcome.number);
        }
    }
    if let Some(first) = duplicate_of {
        println!("{prefix}{}: duplicate id {}, first seen in record {first}", "Item".yellow(), outcome.id);
    }
}

fn print_compile_errors(errors: &CompileErrors, source: &str, schema: &Path) {
    print!("{}", compile_report(errors, source, schema));
}

/// Caret-marked diagnostics followed by a one-line count.
fn compile_report(errors: &CompileErrors, source: &str, schema: &Path) -> String {
    format!(
        "{}{} {}\n",
        errors.render(source),
        format!("{} errors found in schema in", errors.len()).red().bold(),
        schema.display()
    )
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_well_formed() {
        CommandLineInterface::command().debug_assert();
    }

    #[test]
    fn validate_arguments() {
        let cli = CommandLineInterface::try_parse_from([
            "json-rnc", "validate", "s.rnc", "-i", "a.json", "b.json", "--split", "--id", "_id/$oid", "--stats",
            "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        let Command::Validate(run) = cli.cmd else { panic!("validate expected") };
        assert_eq!(run.input_settings.input, vec!["a.json", "b.json"]);
        assert!(run.split && run.stats && !run.sed);
        assert_eq!(run.id.as_deref(), Some("_id/$oid"));
    }

    #[test]
    fn compile_report_puts_the_count_on_its_own_line() {
        let src = "start = {a: ; b: integer}";
        let errors = compile(src).unwrap_err();
        let report = compile_report(&errors, src, Path::new("s.rnc"));
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("↑:ident or json type expected"));
        assert!(lines[2].contains("1 errors found in schema in"));
        assert!(lines[2].ends_with("s.rnc"));
    }

    #[test]
    fn glob_patterns_expand_and_literals_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        let mut found = resolve_file_path_patterns([pattern.as_str(), "literal.json"]).unwrap();
        found.sort();
        assert_eq!(found.len(), 3);
        assert!(found.contains(&PathBuf::from("literal.json")));
        let empty = format!("{}/*.none", dir.path().display());
        assert!(resolve_file_path_patterns([empty.as_str()]).is_err());
    }
}
