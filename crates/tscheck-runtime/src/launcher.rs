//! Tokio-backed process launcher.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use tscheck_core::{CoreError, LaunchSpec, ProcessControl, ProcessLauncher, TaskId};

use crate::chunker::LineChunker;
use crate::config::RuntimeConfig;
use crate::event::ProcessEvent;

/// Spawns checker processes on the current tokio runtime.
///
/// Each process gets a driver task that forwards stdout chunks and the exit
/// status to the shared event channel, in that order. `spawn` must be called
/// from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioLauncher {
    events: mpsc::Sender<ProcessEvent>,
    read_buffer_size: usize,
}

impl TokioLauncher {
    /// Creates a launcher that reports to `events`.
    pub fn new(events: mpsc::Sender<ProcessEvent>, config: &RuntimeConfig) -> Self {
        Self {
            events,
            read_buffer_size: config.read_buffer_size,
        }
    }
}

impl ProcessLauncher for TokioLauncher {
    fn is_invocable(&self, executable: &str) -> bool {
        which::which(executable).is_ok()
    }

    fn spawn(&mut self, spec: LaunchSpec<'_>) -> tscheck_core::Result<Box<dyn ProcessControl>> {
        let Some((program, args)) = spec.argv.split_first() else {
            return Err(CoreError::Spawn {
                executable: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argument vector"),
            });
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CoreError::Spawn {
                executable: program.clone(),
                source,
            })?;

        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (kill_tx, kill_rx) = oneshot::channel();

        debug!(task_id = %spec.task_id, pid = ?pid, "process spawned");

        let driver = Driver {
            task_id: spec.task_id,
            events: self.events.clone(),
            chunker: LineChunker::new(spec.watch),
            read_buffer_size: self.read_buffer_size,
        };
        tokio::spawn(driver.run(child, stdout, stderr, kill_rx));

        Ok(Box::new(TokioProcess {
            pid,
            kill: Some(kill_tx),
        }))
    }
}

/// Handle to a process spawned by `TokioLauncher`.
#[derive(Debug)]
pub struct TokioProcess {
    pid: Option<u32>,
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessControl for TokioProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    fn terminate(&mut self) {
        if let Some(kill) = self.kill.take() {
            // The driver may already be gone.
            let _ = kill.send(());
        }
    }
}

struct Driver {
    task_id: TaskId,
    events: mpsc::Sender<ProcessEvent>,
    chunker: LineChunker,
    read_buffer_size: usize,
}

impl Driver {
    async fn run(
        mut self,
        mut child: Child,
        stdout: Option<ChildStdout>,
        stderr: Option<ChildStderr>,
        mut kill_rx: oneshot::Receiver<()>,
    ) {
        if let Some(stderr) = stderr {
            tokio::spawn(drain_stderr(self.task_id, stderr));
        }

        let mut killed = false;
        if let Some(mut stdout) = stdout {
            let mut buf = vec![0u8; self.read_buffer_size];
            let mut kill_closed = false;

            loop {
                tokio::select! {
                    read = stdout.read(&mut buf) => match read {
                        Ok(0) => break,
                        Ok(n) => {
                            trace!(task_id = %self.task_id, bytes = n, "stdout read");
                            for chunk in self.chunker.push(&buf[..n]) {
                                if !self.send_output(chunk).await {
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            warn!(task_id = %self.task_id, error = %e, "failed to read stdout");
                            break;
                        }
                    },
                    request = &mut kill_rx, if !kill_closed => {
                        kill_closed = true;
                        // A dropped handle is not a kill request.
                        if request.is_ok() {
                            debug!(task_id = %self.task_id, "terminating process");
                            if let Err(e) = child.start_kill() {
                                warn!(task_id = %self.task_id, error = %e, "failed to kill process");
                            }
                            killed = true;
                            break;
                        }
                    }
                }
            }
        }

        if !killed {
            for chunk in self.chunker.finish() {
                if !self.send_output(chunk).await {
                    return;
                }
            }
            if !self.send_output(String::new()).await {
                return;
            }
        }

        let status = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                warn!(task_id = %self.task_id, error = %e, "failed to wait for process");
                None
            }
        };

        let event = ProcessEvent::Exited {
            task_id: self.task_id,
            status,
        };
        if self.events.send(event).await.is_err() {
            trace!(task_id = %self.task_id, "event receiver dropped before exit");
        }
    }

    /// Returns false once the receiving side is gone.
    async fn send_output(&self, chunk: String) -> bool {
        let event = ProcessEvent::Output {
            task_id: self.task_id,
            chunk,
        };
        if self.events.send(event).await.is_err() {
            debug!(task_id = %self.task_id, "event receiver dropped, abandoning process");
            return false;
        }
        true
    }
}

async fn drain_stderr(task_id: TaskId, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(task_id = %task_id, stderr = %line, "checker stderr"),
            Ok(None) => break,
            Err(e) => {
                trace!(task_id = %task_id, error = %e, "stderr closed");
                break;
            }
        }
    }
}
