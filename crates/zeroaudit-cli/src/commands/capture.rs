//! Capture command implementation.

use std::path::Path;

use anyhow::Result;
use tracing::warn;
use zeroaudit_core::{AuditConfig, Gcore, ProcessController, SnapshotStore};

/// Run the capture command: drive the target through the two-snapshot audit
/// protocol and persist both memory images.
pub fn run(binary_path: &Path, output_dir: &Path) -> Result<()> {
    let current_version = env!("CARGO_PKG_VERSION");
    println!("zeroaudit {current_version} - capture");

    let store = SnapshotStore::new(Gcore);
    let mut controller = ProcessController::new(store, AuditConfig::default());

    let run = controller.run(binary_path, output_dir)?;

    println!(
        "initial snapshot: {} bytes at {}",
        run.initial.bytes.len(),
        run.initial.source_path.display()
    );
    println!(
        "final snapshot:   {} bytes at {}",
        run.final_snapshot.bytes.len(),
        run.final_snapshot.source_path.display()
    );

    match run.exit_code {
        Some(0) => println!("target exited cleanly"),
        Some(code) => warn!("target exited with code {} after a complete run", code),
        None => warn!("target was terminated by a signal after a complete run"),
    }

    println!(
        "snapshots ready; run `zeroaudit analyze {}` to check them",
        output_dir.display()
    );

    Ok(())
}
