use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "zeroaudit")]
#[command(about = "Black-box audit that secrets are erased from process memory")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a target binary and capture pre/post-erasure memory snapshots
    Capture {
        /// Target binary to audit
        binary_path: PathBuf,
        /// Directory receiving initial_dump.bin and final_dump.bin
        output_dir: PathBuf,
    },
    /// Search captured snapshots for leaked secret material
    Analyze {
        /// Directory holding the captured snapshot pair
        output_dir: PathBuf,
        /// Pattern manifest to check instead of the built-in registry
        #[arg(short, long)]
        patterns: Option<PathBuf>,
        /// Print full offset lists for every pattern
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("zeroaudit=info".parse()?))
        .init();

    // clap exits 2 on usage errors by default; 2 is reserved here for the
    // leak verdict, so usage problems are mapped to 1 explicitly.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return Ok(ExitCode::from(code));
        }
    };

    match args.command {
        Command::Capture {
            binary_path,
            output_dir,
        } => {
            commands::capture::run(&binary_path, &output_dir)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Analyze {
            output_dir,
            patterns,
            verbose,
        } => commands::analyze::run(&output_dir, patterns.as_deref(), verbose),
    }
}
