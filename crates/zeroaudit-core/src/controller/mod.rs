//! Drives one complete audit cycle against a target binary.
//!
//! The controller spawns the target with piped stdio, captures a memory
//! snapshot while the secrets are live, delivers the erasure signal, captures
//! a second snapshot, and collects the target's exit. Every wait is bounded;
//! a failed capture or an early target exit aborts the run without retry.

mod config;

pub use config::AuditConfig;

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::snapshot::{DumpFacility, MemorySnapshot, Phase, SnapshotStore};

/// Lifecycle position of an audit run. Transitions are linear; `Errored` is
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditState {
    NotStarted,
    Running,
    SnapshotInitialTaken,
    Signaled,
    SnapshotFinalTaken,
    Completed,
    Errored,
}

/// Result of a completed capture run: both snapshots plus how the target
/// wound down.
#[derive(Debug)]
pub struct CaptureRun {
    pub initial: MemorySnapshot,
    pub final_snapshot: MemorySnapshot,
    pub exit_code: Option<i32>,
    pub stdout_tail: Vec<String>,
}

/// Kills the target on drop unless the run completed normally, so no audit
/// exit path leaks a child process.
struct ChildGuard {
    child: Child,
    armed: bool,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        Self { child, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    /// Fail with `TargetExited` if the child is already gone.
    fn ensure_alive(&mut self, phase: Phase) -> Result<()> {
        match self.child.try_wait() {
            Ok(Some(status)) => Err(Error::TargetExited {
                phase,
                status: status.to_string(),
            }),
            Ok(None) => Ok(()),
            Err(e) => Err(Error::Capture {
                phase,
                message: format!("failed to poll target: {e}"),
            }),
        }
    }

    fn try_status(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("terminating leftover target pid {}", self.child.id());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

pub struct ProcessController<D: DumpFacility> {
    store: SnapshotStore<D>,
    config: AuditConfig,
    state: AuditState,
}

impl<D: DumpFacility> ProcessController<D> {
    pub fn new(store: SnapshotStore<D>, config: AuditConfig) -> Self {
        Self {
            store,
            config,
            state: AuditState::NotStarted,
        }
    }

    pub fn state(&self) -> AuditState {
        self.state
    }

    /// Run one full audit cycle: spawn, capture, signal, capture, collect.
    pub fn run(&mut self, binary: &Path, output_dir: &Path) -> Result<CaptureRun> {
        let result = self.drive(binary, output_dir);
        self.state = match result {
            Ok(_) => AuditState::Completed,
            Err(_) => AuditState::Errored,
        };
        result
    }

    fn drive(&mut self, binary: &Path, output_dir: &Path) -> Result<CaptureRun> {
        fs::create_dir_all(output_dir).map_err(|source| Error::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let mut child = Command::new(binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Capture {
                phase: Phase::Initial,
                message: format!("failed to spawn {}: {e}", binary.display()),
            })?;

        let pid = child.id();
        info!("started target {} with pid {}", binary.display(), pid);

        let mut stdin = take_pipe(child.stdin.take(), "stdin")?;
        let stdout = take_pipe(child.stdout.take(), "stdout")?;
        let lines = spawn_stdout_reader(stdout);
        let mut guard = ChildGuard::new(child);
        self.state = AuditState::Running;

        self.await_ready(&lines, Phase::Initial, &mut guard)?;
        let initial = self
            .store
            .capture(pid, Phase::Initial, &output_dir.join(Phase::Initial.dump_file_name()))?;
        self.state = AuditState::SnapshotInitialTaken;

        send_signal(&mut stdin, self.config.signal_byte)?;
        info!("erasure signal delivered to pid {}", pid);
        self.state = AuditState::Signaled;

        self.await_ready(&lines, Phase::Final, &mut guard)?;
        let final_snapshot = self
            .store
            .capture(pid, Phase::Final, &output_dir.join(Phase::Final.dump_file_name()))?;
        self.state = AuditState::SnapshotFinalTaken;

        // Second signal plus EOF on stdin lets the target finish normally.
        send_signal(&mut stdin, self.config.signal_byte)?;
        drop(stdin);

        let status = self.wait_for_exit(&mut guard)?;
        let stdout_tail = drain_lines(&lines);
        for line in &stdout_tail {
            debug!("target: {}", line);
        }
        info!("target exited with {}", status);
        guard.disarm();

        Ok(CaptureRun {
            initial,
            final_snapshot,
            exit_code: status.code(),
            stdout_tail,
        })
    }

    /// Wait until the target is safe to dump for `phase`.
    ///
    /// Prefers the target's explicit ready marker on stdout, bounded by
    /// `ready_timeout`; falls back to the fixed settling interval when the
    /// marker never arrives.
    fn await_ready(
        &self,
        lines: &Receiver<String>,
        phase: Phase,
        guard: &mut ChildGuard,
    ) -> Result<()> {
        let deadline = Instant::now() + self.config.ready_timeout;

        loop {
            guard.ensure_alive(phase)?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    "no ready marker before the {} snapshot; settling for {:?} instead",
                    phase, self.config.settle
                );
                thread::sleep(self.config.settle);
                guard.ensure_alive(phase)?;
                return Ok(());
            }

            match lines.recv_timeout(remaining.min(Duration::from_millis(200))) {
                Ok(line) => {
                    debug!("target: {}", line);
                    if line.contains(&self.config.ready_marker) {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // Target closed its stdout. If it is still running, fall
                    // back to the fixed settle before dumping.
                    guard.ensure_alive(phase)?;
                    thread::sleep(self.config.settle);
                    guard.ensure_alive(phase)?;
                    return Ok(());
                }
            }
        }
    }

    fn wait_for_exit(&self, guard: &mut ChildGuard) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.config.exit_timeout;

        loop {
            match guard.try_status() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    return Err(Error::Capture {
                        phase: Phase::Final,
                        message: format!("failed to poll target exit: {e}"),
                    });
                }
            }

            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    what: "target exit after final signal".to_string(),
                    after: self.config.exit_timeout,
                });
            }

            thread::sleep(Duration::from_millis(50));
        }
    }
}

fn take_pipe<T>(pipe: Option<T>, name: &str) -> Result<T> {
    pipe.ok_or_else(|| Error::Capture {
        phase: Phase::Initial,
        message: format!("target {name} not piped"),
    })
}

fn send_signal(stdin: &mut ChildStdin, byte: u8) -> Result<()> {
    stdin
        .write_all(&[byte])
        .and_then(|_| stdin.flush())
        .map_err(|e| Error::Capture {
            phase: Phase::Final,
            message: format!("failed to deliver signal byte: {e}"),
        })
}

/// Forward the target's stdout line by line over a channel so waits on it
/// can be bounded. The thread ends at EOF.
fn spawn_stdout_reader(stdout: ChildStdout) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let reader = BufReader::new(stdout);
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    rx
}

fn drain_lines(lines: &Receiver<String>) -> Vec<String> {
    let mut tail = Vec::new();
    while let Ok(line) = lines.recv_timeout(Duration::from_millis(200)) {
        tail.push(line);
    }
    tail
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::mock::MockDump;

    fn test_config() -> AuditConfig {
        AuditConfig {
            settle: Duration::from_millis(50),
            ready_timeout: Duration::from_millis(300),
            exit_timeout: Duration::from_secs(5),
            ..AuditConfig::default()
        }
    }

    fn mock_store() -> SnapshotStore<MockDump> {
        SnapshotStore::new(MockDump {
            initial: b"canary and secret material".to_vec(),
            r#final: b"canary only".to_vec(),
        })
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    #[cfg(unix)]
    fn full_cycle_with_silent_target() {
        // `cat` never prints the ready marker, so both waits take the
        // settle fallback; it exits once stdin reaches EOF.
        let dir = tempfile::tempdir().unwrap();
        let mut controller = ProcessController::new(mock_store(), test_config());

        let run = controller
            .run(Path::new("/bin/cat"), &dir.path().join("output"))
            .unwrap();

        assert_eq!(controller.state(), AuditState::Completed);
        assert_eq!(run.exit_code, Some(0));
        assert_eq!(run.initial.bytes, b"canary and secret material");
        assert_eq!(run.final_snapshot.bytes, b"canary only");
        assert!(dir.path().join("output/initial_dump.bin").exists());
        assert!(dir.path().join("output/final_dump.bin").exists());
    }

    #[test]
    #[cfg(unix)]
    fn ready_marker_skips_the_settle_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let target = write_script(
            dir.path(),
            "target.sh",
            "#!/bin/sh\n\
             echo 'Waiting for dump...'\n\
             head -c1 >/dev/null\n\
             echo 'Waiting for dump...'\n\
             head -c1 >/dev/null\n",
        );

        let mut config = test_config();
        config.ready_timeout = Duration::from_secs(5);
        let mut controller = ProcessController::new(mock_store(), config);

        let start = Instant::now();
        let run = controller.run(&target, &dir.path().join("output")).unwrap();

        assert_eq!(controller.state(), AuditState::Completed);
        assert_eq!(run.exit_code, Some(0));
        // Both phases handshook instead of burning the 5s ready timeout.
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    #[cfg(unix)]
    fn early_target_exit_is_a_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = ProcessController::new(mock_store(), test_config());

        let err = controller
            .run(Path::new("/bin/true"), &dir.path().join("output"))
            .unwrap_err();

        assert_eq!(controller.state(), AuditState::Errored);
        assert!(matches!(err, Error::TargetExited { phase: Phase::Initial, .. }));
    }

    #[test]
    fn missing_binary_is_a_capture_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut controller = ProcessController::new(mock_store(), test_config());

        let err = controller
            .run(Path::new("/nonexistent/target"), dir.path())
            .unwrap_err();

        assert_eq!(controller.state(), AuditState::Errored);
        assert!(matches!(err, Error::Capture { phase: Phase::Initial, .. }));
    }

    #[test]
    #[cfg(unix)]
    fn unresponsive_target_times_out_after_final_signal() {
        let dir = tempfile::tempdir().unwrap();
        // Ignores stdin entirely, so EOF never makes it exit.
        let target = write_script(dir.path(), "stuck.sh", "#!/bin/sh\nexec sleep 60\n");

        let mut config = test_config();
        config.exit_timeout = Duration::from_millis(300);
        let mut controller = ProcessController::new(mock_store(), config);

        let err = controller.run(&target, &dir.path().join("output")).unwrap_err();

        assert_eq!(controller.state(), AuditState::Errored);
        assert!(matches!(err, Error::Timeout { .. }));
    }
}
