//! Memory snapshot acquisition and persistence.

mod facility;

pub use facility::{DumpFacility, Gcore};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

/// Lifecycle point a snapshot was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    Initial,
    Final,
}

impl Phase {
    /// File name the snapshot is persisted under inside the output directory.
    pub fn dump_file_name(&self) -> &'static str {
        match self {
            Phase::Initial => "initial_dump.bin",
            Phase::Final => "final_dump.bin",
        }
    }
}

/// A full memory image of the target at one instant. Write-once: the buffer
/// is never mutated after capture.
#[derive(Debug)]
pub struct MemorySnapshot {
    pub phase: Phase,
    pub bytes: Vec<u8>,
    pub source_path: PathBuf,
}

impl MemorySnapshot {
    /// Read a previously captured snapshot back from disk.
    ///
    /// An empty file is an acquisition failure, not a zero-match buffer.
    pub fn load<P: AsRef<Path>>(phase: Phase, path: P) -> Result<Self> {
        let bytes = fs::read(&path).map_err(|source| Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;

        if bytes.is_empty() {
            return Err(Error::Capture {
                phase,
                message: format!("snapshot {} is empty", path.as_ref().display()),
            });
        }

        Ok(Self {
            phase,
            bytes,
            source_path: path.as_ref().to_path_buf(),
        })
    }
}

/// Persists memory images produced by the injected dump facility and hands
/// them back as in-memory buffers.
pub struct SnapshotStore<D: DumpFacility> {
    facility: D,
}

impl<D: DumpFacility> SnapshotStore<D> {
    pub fn new(facility: D) -> Self {
        Self { facility }
    }

    /// Dump the live process `pid` to `dest` and return the captured image.
    pub fn capture(&self, pid: u32, phase: Phase, dest: &Path) -> Result<MemorySnapshot> {
        let len = self.facility.dump(pid, phase, dest)?;
        info!(
            "captured {} snapshot of pid {} ({} bytes) at {}",
            phase,
            pid,
            len,
            dest.display()
        );
        MemorySnapshot::load(phase, dest)
    }
}
