use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::Phase;
use crate::error::{Error, Result};

/// External OS-level facility that writes a full memory image of a live
/// process. Injected so the controller can run against a fake in tests.
pub trait DumpFacility {
    /// Dump process `pid` into `dest`, returning the image size in bytes.
    ///
    /// The process may be paused briefly while the image is taken but must
    /// be left running afterwards.
    fn dump(&self, pid: u32, phase: Phase, dest: &Path) -> Result<u64>;
}

/// Production facility: `gcore -a`, writing into a scratch directory owned
/// exclusively by this call, then copying the image to its destination.
pub struct Gcore;

impl DumpFacility for Gcore {
    fn dump(&self, pid: u32, phase: Phase, dest: &Path) -> Result<u64> {
        let scratch = tempfile::tempdir().map_err(|source| Error::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let prefix = scratch.path().join("core");

        let output = Command::new("gcore")
            .arg("-a")
            .arg("-o")
            .arg(&prefix)
            .arg(pid.to_string())
            .output()
            .map_err(|e| Error::Capture {
                phase,
                message: format!("failed to run gcore: {e}"),
            })?;

        if !output.status.success() {
            return Err(Error::Capture {
                phase,
                message: format!(
                    "gcore exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        // gcore appends ".<pid>" to the output prefix.
        let image = scratch.path().join(format!("core.{pid}"));
        if !image.exists() {
            return Err(Error::Capture {
                phase,
                message: format!("gcore produced no image for pid {pid}"),
            });
        }

        let len = fs::copy(&image, dest).map_err(|source| Error::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        debug!("copied {} byte {} image to {}", len, phase, dest.display());

        Ok(len)
    }
}
