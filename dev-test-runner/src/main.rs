//! Fixture runner: map each fixture's input through its schema types and check
//! the expectations.
mod fixture;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use fixture::Report;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// run mapping fixtures and report pass/fail per fixture
#[derive(Parser, Debug)]
struct CommandLineInterface {
    /// One or more fixture files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/*.json"))]
    fixtures: Vec<String>,

    /// stop at the first failing fixture (runs sequentially)
    #[arg(long, default_value_t = false)]
    fail_fast: bool,

    /// debug-level logs from the mapper (RUST_LOG overrides)
    #[arg(long, short, default_value_t = false)]
    verbose: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    fn run(&self) -> anyhow::Result<bool> {
        let paths = resolve_file_path_patterns(&self.fixtures)?;
        tracing::info!(count = paths.len(), "running fixtures");

        let reports: Vec<Report> = if self.fail_fast {
            let mut reports = Vec::new();
            for path in &paths {
                let report = fixture::run_file(path);
                let passed = report.passed();
                reports.push(report);
                if !passed { break; }
            }
            reports
        } else {
            paths.par_iter().map(|p| fixture::run_file(p)).collect()
        };

        for report in &reports {
            print_report(report);
        }

        let failed = reports.iter().filter(|r| !r.passed()).count();
        let summary = format!("{} passed, {} failed", reports.len() - failed, failed);
        if failed == 0 {
            println!("{}", summary.green().bold());
        } else {
            println!("{}", summary.red().bold());
        }
        Ok(failed == 0)
    }
}

fn print_report(report: &Report) {
    if report.passed() {
        println!("{} {}", "✓".green(), report.name);
        return;
    }
    println!("{} {} ({})", "✗".red(), report.name.bold(), report.path.display());
    for failure in &report.failures {
        println!("    {}", failure.red());
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = CommandLineInterface::parse();
    init_logging(cli.verbose);
    Ok(if cli.run()? { ExitCode::SUCCESS } else { ExitCode::FAILURE })
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
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    out.sort();
    out.dedup();
    Ok(out)
}
