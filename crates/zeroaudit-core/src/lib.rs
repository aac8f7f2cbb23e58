//! # zeroaudit-core
//!
//! Core library for the zeroaudit memory-hygiene harness.
//!
//! This crate provides:
//! - Sensitive pattern registry with multi-encoding expansion
//! - Exact overlapping substring search over dump buffers
//! - Memory snapshot capture via a pluggable dump facility
//! - Target process lifecycle control for the two-snapshot audit protocol
//! - The leak-detection policy and its report rendering
//!
//! Dumps are treated as opaque byte buffers; the harness never interprets
//! the target's memory beyond literal byte-sequence matching.

pub mod analyze;
pub mod controller;
pub mod error;
pub mod pattern;
pub mod search;
pub mod snapshot;

pub use analyze::{AuditOutcome, LeakVerdict, ReportRow, Violation, analyze, render_report};
pub use controller::{AuditConfig, AuditState, CaptureRun, ProcessController};
pub use error::{Error, Result};
pub use pattern::{
    Encoding, PatternManifest, SecretEntry, SensitivePattern, builtin_manifest, load_manifest,
    save_manifest,
};
pub use search::{MatchSet, find_all};
pub use snapshot::{DumpFacility, Gcore, MemorySnapshot, Phase, SnapshotStore};
