//! Process Supervisor: runs the posting engine over a manifest.
//!
//! Lifecycle: `Spawning → Streaming → Draining → Closed`, with `Failed` reachable from
//! any state. The manifest goes in on stdin, which is closed once written. Stdout is
//! routed by [`OutputMode`]. Stderr stays visible on the caller's terminal in every
//! mode; when a progress observer is present it is piped through a tap that mirrors
//! each raw line to our stderr before decoding it.

use std::fmt;
use std::process::{ExitStatus, Stdio};

use futures::future::join_all;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{NuguError, Result};
use crate::manifest::Manifest;
use crate::options::{OutputMode, ProgressObserver};
use crate::output;
use crate::progress::{tap_diagnostics, LogScraper};

/// How to launch the posting engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: String,
    /// Arguments placed before the encoded job options (`npx nyuu` → program `npx`, `["nyuu"]`).
    pub leading_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "nyuu".to_string(),
            leading_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Spawning,
    Streaming,
    Draining,
    Closed,
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Spawning => "spawning",
            JobState::Streaming => "streaming",
            JobState::Draining => "draining",
            JobState::Closed => "closed",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A running engine together with the background tasks feeding and draining it.
#[derive(Debug)]
pub struct JobHandle {
    child: Child,
    tasks: Vec<JoinHandle<()>>,
    state: JobState,
}

impl JobHandle {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    fn enter(&mut self, state: JobState) {
        debug!(from = %self.state, to = %state, pid = ?self.child.id(), "Job state transition");
        self.state = state;
    }

    /// Terminates the engine. The only cancellation mechanism a job has.
    pub async fn kill(&mut self) -> Result<()> {
        warn!(pid = ?self.child.id(), "Killing posting engine");
        self.child.kill().await?;
        self.enter(JobState::Failed);
        Ok(())
    }

    /// Waits for the engine to exit and its I/O tasks to finish.
    /// A non-zero exit is an [`NuguError::EngineExitAbnormal`].
    pub async fn wait(mut self) -> Result<ExitStatus> {
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(e) => {
                self.enter(JobState::Failed);
                error!(error = ?e, "Failed waiting for posting engine");
                return Err(e.into());
            }
        };
        for joined in join_all(self.tasks.drain(..)).await {
            if let Err(e) = joined {
                warn!(error = %e, "Job I/O task did not complete");
            }
        }

        if status.success() {
            self.enter(JobState::Closed);
            info!(status = %status, "Posting engine exited");
            Ok(status)
        } else {
            self.enter(JobState::Failed);
            error!(status = %status, "Posting engine exited with non-zero code");
            Err(NuguError::EngineExitAbnormal {
                code: status.code(),
            })
        }
    }
}

/// What a job resolves to, depending on the output mode.
#[derive(Debug)]
pub enum JobOutcome {
    /// Live and file modes hand back the running engine immediately.
    Running(JobHandle),
    /// Buffered mode resolves with the complete output once the channel has closed.
    Buffered(Vec<u8>),
}

impl JobOutcome {
    /// Drives the job to completion. Returns the output bytes in buffered mode.
    pub async fn finish(self) -> Result<Option<Vec<u8>>> {
        match self {
            JobOutcome::Running(handle) => handle.wait().await.map(|_| None),
            JobOutcome::Buffered(bytes) => Ok(Some(bytes)),
        }
    }
}

async fn write_and_close(stdin: &mut ChildStdin, text: &str) -> std::io::Result<()> {
    stdin.write_all(text.as_bytes()).await?;
    stdin.shutdown().await
}

async fn stream_manifest(mut stdin: ChildStdin, text: String) {
    let written = write_and_close(&mut stdin, &text).await;
    drop(stdin);
    match written {
        Ok(()) => debug!(bytes = text.len(), "Manifest streamed, stdin closed"),
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            warn!("Posting engine closed stdin before reading the whole manifest")
        }
        Err(e) => error!(error = ?e, "Failed streaming manifest to posting engine"),
    }
}

/// Collects the engine's output; the engine is killed if the channel cannot be read.
async fn drain_buffered<R: AsyncRead + Unpin>(
    stdout: R,
    handle: &mut JobHandle,
) -> Result<Vec<u8>> {
    match output::collect(stdout).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            error!(error = ?e, "Failed reading posting engine output");
            if let Err(kill_error) = handle.kill().await {
                warn!(error = %kill_error, "Failed to kill posting engine");
            }
            Err(e.into())
        }
    }
}

/// Spawns the engine with `args`, streams `manifest` into it, and routes its output.
pub async fn supervise(
    engine: &EngineConfig,
    args: &[String],
    manifest: &Manifest,
    mode: OutputMode,
    observer: Option<ProgressObserver>,
) -> Result<JobOutcome> {
    debug!(state = %JobState::Spawning, program = %engine.program, ?args, "Spawning posting engine");

    let sink = match &mode {
        OutputMode::File(path) => Some(output::open_sink(path).await?),
        _ => None,
    };

    let mut command = Command::new(&engine.program);
    command
        .args(&engine.leading_args)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(output::stdout_stdio(&mode))
        .stderr(if observer.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });

    let child = command.spawn().map_err(|error| {
        error!(state = %JobState::Failed, error = ?error, program = %engine.program, "Failed to launch posting engine");
        NuguError::EngineSpawn {
            program: engine.program.clone(),
            error,
        }
    })?;
    info!(pid = ?child.id(), program = %engine.program, files = manifest.len(), "Posting engine started");

    let mut handle = JobHandle {
        child,
        tasks: Vec::new(),
        state: JobState::Spawning,
    };

    handle.enter(JobState::Streaming);
    if let Some(stdin) = handle.child.stdin.take() {
        handle
            .tasks
            .push(tokio::spawn(stream_manifest(stdin, manifest.to_text())));
    }

    handle.enter(JobState::Draining);
    if let (Some(stderr), Some(observer)) = (handle.child.stderr.take(), observer) {
        handle.tasks.push(tokio::spawn(async move {
            match tap_diagnostics(stderr, tokio::io::stderr(), LogScraper::new(), observer).await {
                Ok(record) => debug!(?record, "Diagnostic channel closed"),
                Err(e) => warn!(error = ?e, "Diagnostic tap stopped early"),
            }
        }));
    }

    match mode {
        OutputMode::Live => Ok(JobOutcome::Running(handle)),
        OutputMode::File(path) => {
            if let (Some(stdout), Some(file)) = (handle.child.stdout.take(), sink) {
                handle
                    .tasks
                    .push(output::spawn_file_sink(stdout, file, &path));
            }
            Ok(JobOutcome::Running(handle))
        }
        OutputMode::Buffered => {
            let bytes = match handle.child.stdout.take() {
                Some(stdout) => drain_buffered(stdout, &mut handle).await?,
                None => Vec::new(),
            };
            handle.wait().await?;
            Ok(JobOutcome::Buffered(bytes))
        }
    }
}
