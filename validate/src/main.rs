//! Quest definition checker.
//!
//! Usage: questbot-validate <PATH>...
//!
//! Each path is a definition file or a directory of them. Prints a summary per
//! quest plus any lint warnings, and exits non-zero if any file fails to load.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use questbot_core::definitions::{list_definition_files, load_file};
use questbot_core::scheduler::DATE_FORMAT;
use questbot_core::QuestDefinition;
use questbot_types::formatting::format_duration_compact;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Check quest definition files")]
struct Args {
    /// Definition files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Treat lint warnings as failures
    #[arg(long)]
    strict: bool,
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn expand(paths: &[PathBuf]) -> (Vec<PathBuf>, usize) {
    let mut files = Vec::new();
    let mut failures = 0;

    for path in paths {
        if path.is_dir() {
            match list_definition_files(path) {
                Ok(found) if found.is_empty() => {
                    eprintln!("{}: no definition files", path.display());
                }
                Ok(found) => files.extend(found),
                Err(e) => {
                    eprintln!("{e}");
                    failures += 1;
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    (files, failures)
}

fn print_summary(path: &Path, def: &QuestDefinition) {
    let duration = def.duration().num_seconds().max(0) as u64;
    println!("{}", path.display());
    println!("  quest:    {}", def.name());
    println!("  start:    {}", def.start_date().format(DATE_FORMAT));
    println!("  end:      {}", def.end_date().format(DATE_FORMAT));
    println!("  duration: {}", format_duration_compact(duration));
    println!("  teams:    {}", def.teams().len());
    for team in def.teams() {
        println!("    {:<20} {} tasks", team.name, team.task_count());
    }
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let (files, mut failures) = expand(&args.paths);
    let mut checked = 0;

    for path in &files {
        checked += 1;
        match load_file(path) {
            Ok(def) => {
                print_summary(path, &def);
                let warnings = def.lint();
                for warning in &warnings {
                    println!("  warning:  {warning}");
                }
                if args.strict && !warnings.is_empty() {
                    failures += 1;
                }
            }
            Err(e) => {
                println!("{}", path.display());
                println!("  error:    {e}");
                failures += 1;
            }
        }
    }

    println!();
    println!("{checked} checked, {failures} failed");

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
