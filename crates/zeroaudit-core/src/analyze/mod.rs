//! Leak-detection policy over a pair of memory snapshots.
//!
//! Every rule is evaluated; nothing short-circuits, so one report shows all
//! problems at once. A failed verdict is data, not an error: infrastructure
//! failures surface as `Error`, a detected leak surfaces here.

mod report;

pub use report::render_report;

use std::fmt;

use tracing::{debug, warn};

use crate::pattern::{Encoding, SensitivePattern};
use crate::search::MatchSet;
use crate::snapshot::MemorySnapshot;

/// One violated policy rule, in human-readable form.
#[derive(Debug, Clone)]
pub enum Violation {
    /// The canary never appeared in the initial snapshot: the capture itself
    /// is untrustworthy, whatever the final snapshot contains.
    CaptureSanity,
    /// The canary appears more often after the signal than before, which
    /// points at dump duplication or a fork rather than a clean capture.
    CanaryMultiplied { initial: usize, r#final: usize },
    /// Sensitive material survived past the erasure point.
    Leak {
        label: String,
        encoding: Encoding,
        offsets: Vec<usize>,
        allowed: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::CaptureSanity => {
                write!(f, "capture sanity check failed: canary absent from the initial snapshot")
            }
            Violation::CanaryMultiplied {
                initial,
                r#final: final_count,
            } => write!(
                f,
                "canary count grew from {initial} to {final_count} between snapshots"
            ),
            Violation::Leak {
                label,
                encoding,
                offsets,
                allowed,
            } => {
                write!(
                    f,
                    "'{label}' ({encoding}) still present after erasure at offsets {offsets:?}"
                )?;
                if *allowed > 0 {
                    write!(f, " (allowed {allowed})")?;
                }
                Ok(())
            }
        }
    }
}

/// Terminal pass/fail verdict for one audit run.
#[derive(Debug)]
pub struct LeakVerdict {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

/// One pattern's matches in both snapshots, for the report.
#[derive(Debug)]
pub struct ReportRow {
    pub initial: MatchSet,
    pub r#final: MatchSet,
    pub ok: bool,
}

impl ReportRow {
    pub fn label(&self) -> &str {
        &self.initial.label
    }

    pub fn encoding(&self) -> Encoding {
        self.initial.encoding
    }
}

/// Verdict plus the per-pattern evidence behind it.
#[derive(Debug)]
pub struct AuditOutcome {
    pub verdict: LeakVerdict,
    pub rows: Vec<ReportRow>,
}

/// Apply the leak-detection policy to a pre/post-erasure snapshot pair.
///
/// Rules, in order: the canary must be present in the initial snapshot, its
/// count must not grow, and each sensitive pattern's final count must stay
/// within its residual allowance (zero for ordinary secrets).
pub fn analyze(
    initial: &MemorySnapshot,
    r#final: &MemorySnapshot,
    patterns: &[SensitivePattern],
    canary: &SensitivePattern,
) -> AuditOutcome {
    let mut violations = Vec::new();
    let mut rows = Vec::new();

    let canary_initial = MatchSet::collect(canary, initial);
    let canary_final = MatchSet::collect(canary, r#final);
    debug!(
        "canary: {} initial / {} final occurrences",
        canary_initial.count(),
        canary_final.count()
    );

    let mut canary_ok = true;
    if canary_initial.is_empty() {
        warn!("canary absent from the initial snapshot; capture is untrustworthy");
        violations.push(Violation::CaptureSanity);
        canary_ok = false;
    }
    if canary_final.count() > canary_initial.count() {
        violations.push(Violation::CanaryMultiplied {
            initial: canary_initial.count(),
            r#final: canary_final.count(),
        });
        canary_ok = false;
    }
    rows.push(ReportRow {
        initial: canary_initial,
        r#final: canary_final,
        ok: canary_ok,
    });

    for pattern in patterns {
        let initial_matches = MatchSet::collect(pattern, initial);
        let final_matches = MatchSet::collect(pattern, r#final);
        let ok = final_matches.count() <= pattern.allowed_count;

        debug!(
            "'{}' ({}): {} initial / {} final occurrences",
            pattern.label,
            pattern.encoding,
            initial_matches.count(),
            final_matches.count()
        );

        if !ok {
            violations.push(Violation::Leak {
                label: pattern.label.clone(),
                encoding: pattern.encoding,
                offsets: final_matches.offsets.clone(),
                allowed: pattern.allowed_count,
            });
        }

        rows.push(ReportRow {
            initial: initial_matches,
            r#final: final_matches,
            ok,
        });
    }

    AuditOutcome {
        verdict: LeakVerdict {
            passed: violations.is_empty(),
            violations,
        },
        rows,
    }
}
