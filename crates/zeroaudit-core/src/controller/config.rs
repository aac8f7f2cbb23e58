use std::time::Duration;

/// Fixed timing and protocol constants for one audit run.
///
/// The settling interval and timeouts are deliberately constant rather than
/// adaptive; the controller prefers the target's explicit ready marker and
/// only falls back to the settle sleep when the marker never arrives.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Fixed wait used when the target sends no ready marker, giving it time
    /// to allocate and use (or erase) the material under test.
    pub settle: Duration,
    /// Upper bound on waiting for the ready marker before each capture.
    pub ready_timeout: Duration,
    /// Upper bound on waiting for the target to exit after the final signal.
    pub exit_timeout: Duration,
    /// Sentinel byte written to the target's stdin to trigger erasure. The
    /// value is a contract between the harness and the target binary.
    pub signal_byte: u8,
    /// Line the target prints on stdout when it is parked and safe to dump.
    pub ready_marker: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(2),
            ready_timeout: Duration::from_secs(10),
            exit_timeout: Duration::from_secs(10),
            signal_byte: b'.',
            ready_marker: "Waiting for dump...".to_string(),
        }
    }
}
