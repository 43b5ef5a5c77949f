use std::collections::VecDeque;
use std::io::{BufRead as _, BufReader, Read as _};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::foundation::error::{CompositorError, CompositorResult};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const STDERR_TAIL_LINES: usize = 20;

/// Shared flag that stops in-flight and future engine invocations.
///
/// Clones observe the same flag. Once cancelled, a running child process is killed at the next
/// poll and the call returns [`CompositorError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Default)]
pub(crate) struct ProcessOutput {
    pub(crate) stdout: Vec<u8>,
}

/// Run `program` with `args`, killing it when `timeout` elapses or `cancel` fires.
///
/// Stdout is collected in full; stderr is drained concurrently and only its last lines are kept
/// for diagnostics, so a chatty child never blocks on a full pipe.
pub(crate) fn run(
    program: &Path,
    args: &[String],
    operation: &str,
    timeout: Duration,
    cancel: &CancelToken,
) -> CompositorResult<ProcessOutput> {
    if cancel.is_cancelled() {
        return Err(CompositorError::Cancelled);
    }
    debug!(operation, program = %program.display(), args = ?args, "spawning engine");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            CompositorError::engine(format!(
                "failed to spawn '{}' for {operation}: {e}",
                program.display()
            ))
        })?;

    let stdout = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            buf
        })
    });
    let stderr = child.stderr.take().map(|err| {
        thread::spawn(move || {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            for line in BufReader::new(err).lines() {
                let Ok(line) = line else { break };
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail).join("\n")
        })
    });

    let started = Instant::now();
    let outcome = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => {}
            Err(e) => {
                kill(&mut child, operation);
                break Err(CompositorError::engine(format!(
                    "waiting on {operation} failed: {e}"
                )));
            }
        }
        if cancel.is_cancelled() {
            kill(&mut child, operation);
            break Err(CompositorError::Cancelled);
        }
        if started.elapsed() >= timeout {
            kill(&mut child, operation);
            break Err(CompositorError::Timeout {
                operation: operation.to_string(),
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    let stderr_tail = stderr
        .and_then(|h| h.join().ok())
        .unwrap_or_default();

    let status = outcome?;
    if !status.success() {
        return Err(CompositorError::engine(format!(
            "{operation} exited with status {status}: {}",
            stderr_tail.trim()
        )));
    }
    debug!(
        operation,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "engine finished"
    );
    Ok(ProcessOutput { stdout })
}

fn kill(child: &mut Child, operation: &str) {
    if let Err(e) = child.kill() {
        warn!(operation, error = %e, "failed to kill engine process");
    }
    let _ = child.wait();
}

#[cfg(test)]
#[path = "../../tests/unit/engine/process.rs"]
mod tests;
