//! Spawning the build tool and collecting its output.
//!
//! Each output pipe is read on its own thread and forwarded in chunks over a
//! channel, so the driving thread can wait on both pipes with one timeout.

use crate::error::{Result, RunError};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use tracing::{debug, warn};

/// Starts processes whose output can be polled.
pub trait ProcessRunner {
    type Process: RunningProcess;

    /// Start `program` with `args`.
    fn start(&self, program: &str, args: &[String]) -> Result<Self::Process>;
}

/// A started process.
pub trait RunningProcess {
    /// Whether the process may still produce output.
    fn is_alive(&mut self) -> bool;

    /// Wait up to `timeout` for output, then append everything available to
    /// the given buffers. Returns whether stdout and stderr received bytes.
    fn poll_output(
        &mut self,
        stdout: &mut Vec<u8>,
        stderr: &mut Vec<u8>,
        timeout: Duration,
    ) -> Result<(bool, bool)>;

    /// Kill the process and wait for it.
    fn terminate(&mut self) -> Result<()>;

    /// Exit status, once the process has exited.
    fn exit_status(&self) -> Option<ExitStatus>;
}

/// Runs real processes with `std::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    working_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run processes in `dir` instead of the current directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for started processes.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl ProcessRunner for SystemRunner {
    type Process = ChildProcess;

    fn start(&self, program: &str, args: &[String]) -> Result<ChildProcess> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        debug!("Running {:?} {:?}", cmd.get_program(), cmd.get_args().collect::<Vec<_>>());

        let launch_err = |source| RunError::Launch {
            program: program.to_string(),
            source,
        };
        let mut child = cmd.spawn().map_err(launch_err)?;

        let (tx, rx) = mpsc::channel();
        let mut open_pipes = 0;
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, Stream::Stdout, tx.clone()).map_err(launch_err)?;
            open_pipes += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, Stream::Stderr, tx).map_err(launch_err)?;
            open_pipes += 1;
        }

        Ok(ChildProcess {
            child,
            rx,
            open_pipes,
            status: None,
            exited: false,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

enum Chunk {
    Data(Stream, Vec<u8>),
    Closed,
}

fn spawn_reader<R>(mut pipe: R, stream: Stream, tx: Sender<Chunk>) -> std::io::Result<()>
where
    R: Read + Send + 'static,
{
    std::thread::Builder::new()
        .name(format!("makecdb-{:?}", stream).to_lowercase())
        .spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                match pipe.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Chunk::Data(stream, buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(?stream, "reading build output failed: {}", e);
                        break;
                    }
                }
            }
            let _ = tx.send(Chunk::Closed);
        })?;
    Ok(())
}

/// A child process with piped stdout and stderr.
///
/// The process is killed if the handle is dropped while it is running.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    rx: Receiver<Chunk>,
    open_pipes: usize,
    status: Option<ExitStatus>,
    exited: bool,
}

impl ChildProcess {
    fn accept(&mut self, chunk: Chunk, stdout: &mut Vec<u8>, stderr: &mut Vec<u8>, got: &mut (bool, bool)) {
        match chunk {
            Chunk::Data(Stream::Stdout, bytes) => {
                stdout.extend_from_slice(&bytes);
                got.0 = true;
            }
            Chunk::Data(Stream::Stderr, bytes) => {
                stderr.extend_from_slice(&bytes);
                got.1 = true;
            }
            Chunk::Closed => self.open_pipes = self.open_pipes.saturating_sub(1),
        }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Chunk::Data(stream, bytes) => write!(f, "Data({:?}, {} bytes)", stream, bytes.len()),
            Chunk::Closed => f.write_str("Closed"),
        }
    }
}

impl RunningProcess for ChildProcess {
    fn is_alive(&mut self) -> bool {
        if !self.exited {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    self.status = Some(status);
                    self.exited = true;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("failed to query build process: {}", e);
                    self.exited = true;
                }
            }
        }

        // Output can still be in flight after exit.
        !self.exited || self.open_pipes > 0
    }

    fn poll_output(
        &mut self,
        stdout: &mut Vec<u8>,
        stderr: &mut Vec<u8>,
        timeout: Duration,
    ) -> Result<(bool, bool)> {
        let mut got = (false, false);
        if self.open_pipes == 0 {
            return Ok(got);
        }

        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => self.accept(chunk, stdout, stderr, &mut got),
            Err(RecvTimeoutError::Timeout) => return Ok(got),
            Err(RecvTimeoutError::Disconnected) => {
                self.open_pipes = 0;
                return Ok(got);
            }
        }

        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.accept(chunk, stdout, stderr, &mut got),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.open_pipes = 0;
                    break;
                }
            }
        }

        Ok(got)
    }

    fn terminate(&mut self) -> Result<()> {
        if !self.exited {
            if let Err(e) = self.child.kill() {
                // Already exited between the last poll and now.
                if e.kind() != std::io::ErrorKind::InvalidInput {
                    return Err(e.into());
                }
            }
            self.status = Some(self.child.wait()?);
            self.exited = true;
        }
        Ok(())
    }

    fn exit_status(&self) -> Option<ExitStatus> {
        self.status
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if !self.exited {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
