//! `cursive0` command-line interface (§6).
//!
//! A single entry point: `build <path> [--assembly <name>] [--diag-json]`.
//! Grounded in teacher's `apps/logicaffeine_cli::cli` (`clap` derive
//! `Cli`/`Commands` structs, a `run_cli` dispatcher), trimmed to the one verb
//! this spec names — `new`/`publish`/`login`/registry commands have no
//! counterpart here and aren't carried over.

use crate::pipeline::{render_json, render_text, run_build, BuildError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cursive0")]
#[command(about = "The Cursive0 bootstrap compiler's semantic-analysis driver")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the project at `path` and report diagnostics.
    Build {
        /// Project root containing `cursive0.toml`.
        path: PathBuf,

        /// Limit analysis to one assembly declared in the manifest.
        #[arg(long)]
        assembly: Option<String>,

        /// Render diagnostics as a single JSON object instead of one line each.
        #[arg(long)]
        diag_json: bool,
    },
}

/// Exit codes per §6: `0` clean, `1` diagnostics with errors, `2` usage error.
pub fn run_cli() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build { path, assembly, diag_json } => cmd_build(&path, assembly.as_deref(), diag_json),
    }
}

fn cmd_build(path: &PathBuf, assembly: Option<&str>, diag_json: bool) -> ExitCode {
    let report = match run_build(path, assembly, None) {
        Ok(report) => report,
        Err(BuildError::UnknownAssembly(name)) => {
            eprintln!("error: no assembly named '{name}' in the manifest");
            return ExitCode::from(2);
        }
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };

    if diag_json {
        println!("{}", render_json(&report.diagnostics));
    } else if !report.diagnostics.is_empty() {
        println!("{}", render_text(&report.diagnostics));
    }

    if report.is_ok() {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}
