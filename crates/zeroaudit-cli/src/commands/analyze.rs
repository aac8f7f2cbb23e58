//! Analyze command implementation.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing::info;
use zeroaudit_core::{MemorySnapshot, Phase, analyze, builtin_manifest, load_manifest, render_report};

/// Run the analyze command: load both snapshots, expand the pattern
/// registry, apply the leak policy, and print the report.
///
/// Exits 0 on a clean verdict and 2 when leaks or capture anomalies were
/// found, so pipelines can tell a failed audit from a broken harness.
pub fn run(output_dir: &Path, patterns: Option<&Path>, verbose: bool) -> Result<ExitCode> {
    let manifest = match patterns {
        Some(path) => {
            let manifest = load_manifest(path)?;
            info!("loaded pattern manifest v{} from {}", manifest.version, path.display());
            manifest
        }
        None => builtin_manifest(),
    };

    let canary = manifest.canary_pattern();
    let expanded = manifest.expand()?;
    info!(
        "checking {} pattern(s) across {} secret(s)",
        expanded.len(),
        manifest.secrets.len()
    );

    let initial = MemorySnapshot::load(
        Phase::Initial,
        output_dir.join(Phase::Initial.dump_file_name()),
    )?;
    let r#final = MemorySnapshot::load(
        Phase::Final,
        output_dir.join(Phase::Final.dump_file_name()),
    )?;

    let outcome = analyze(&initial, &r#final, &expanded, &canary);
    print!("{}", render_report(&outcome, verbose));

    Ok(if outcome.verdict.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}
