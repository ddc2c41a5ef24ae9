//! The polling loop that turns process output into lines.

use crate::error::Result;
use crate::lines::LineBuffer;
use crate::process::RunningProcess;
use std::io::Write;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How a driven process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The process exited on its own and all its output was consumed.
    Completed(Option<ExitStatus>),
    /// Cancellation was requested; the process was killed.
    Interrupted,
}

impl Outcome {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Outcome::Interrupted)
    }
}

/// Shared cancellation request, set from a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drive `process` to completion.
///
/// Every complete stdout line goes to `on_line`; every complete stderr line is
/// written to `diagnostics` byte for byte. Each poll drains all complete lines of
/// both streams before waiting again. An error from `on_line` kills the
/// process and is returned at once. A final stdout fragment without a
/// newline is never passed on.
pub fn drive<P, F, W>(
    process: &mut P,
    poll_interval: Duration,
    cancel: &CancelFlag,
    mut on_line: F,
    mut diagnostics: W,
) -> Result<Outcome>
where
    P: RunningProcess,
    F: FnMut(&str) -> Result<()>,
    W: Write,
{
    let mut stdout = LineBuffer::new();
    let mut stderr = LineBuffer::new();

    while process.is_alive() {
        if cancel.is_cancelled() {
            debug!("cancellation requested, stopping build process");
            process.terminate()?;
            return Ok(Outcome::Interrupted);
        }

        let (got_out, got_err) =
            process.poll_output(stdout.buffer_mut(), stderr.buffer_mut(), poll_interval)?;
        if !got_out && !got_err {
            continue;
        }

        loop {
            let mut progressed = false;

            if let Some(line) = stdout.next_line() {
                progressed = true;
                if let Err(e) = on_line(&line) {
                    let _ = process.terminate();
                    return Err(e);
                }
            }

            if let Some(line) = stderr.next_raw_line() {
                progressed = true;
                diagnostics.write_all(&line)?;
                diagnostics.write_all(b"\n")?;
            }

            if !progressed {
                break;
            }
        }
    }

    // Set while the last lines were being handled.
    if cancel.is_cancelled() {
        debug!("cancellation requested after the build process finished");
        diagnostics.flush()?;
        return Ok(Outcome::Interrupted);
    }

    if !stdout.pending().is_empty() {
        debug!(bytes = stdout.pending().len(), "discarding unterminated output line");
    }
    diagnostics.flush()?;

    Ok(Outcome::Completed(process.exit_status()))
}
