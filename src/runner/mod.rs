//! Single-slot runner for the external mod-manager tool.
//!
//! [`ProcessRunner`] owns one process slot. An accepted invocation moves the
//! slot from [`RunState::Idle`] to [`RunState::Running`] and hands the work to
//! a supervisor task on the tokio runtime, so `execute` never blocks. The
//! supervisor owns the child handle, drains stdout and stderr line by line,
//! and reports exactly one [`CompletionResult`] before the slot returns to
//! `Idle`.
//!
//! # Ordering
//!
//! - Lines of one stream arrive in the order they were written.
//! - stdout and stderr are independent of each other.
//! - Completion is reported after both streams hit end of data, or after the
//!   drain timeout once the process has exited, whichever comes first.
//!
//! # Example
//!
//! ```no_run
//! use h2mm_runner::event::init_runner_eventsource;
//! use h2mm_runner::runner::ProcessRunner;
//! use h2mm_runner::tool::{ModCommand, ToolSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runner = ProcessRunner::new(ToolSource::Bundled.resolve()?)?;
//!     let (tx, mut rx) = init_runner_eventsource();
//!     runner.execute(ModCommand::List.into(), tx)?;
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

mod lines;
mod types;


use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::event::{Callbacks, RunObserver};
use crate::tool::ResolvedTool;
use crate::utils::guard::OnDrop;

pub use lines::{decoded_lines, pump_lines};
pub use types::{CompletionResult, Invocation, InvocationId, OutputEvent, StreamKind};

/// Default time to wait for the pipes to close after the process exited.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Tunables for a [`ProcessRunner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Upper bound on waiting for stdout/stderr to close once the process is
    /// gone. Pipes inherited by a grandchild would otherwise hold completion.
    pub drain_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

/// Busy/idle status of the process slot.
#[derive(Debug)]
pub enum RunState {
    Idle,
    Running {
        id: InvocationId,
        /// Set to `true` to ask the supervisor to kill the process.
        cancel: watch::Sender<bool>,
    },
}

#[derive(Debug)]
struct Slot {
    state: RunState,
    last_id: u64,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot holds plain data, a panic elsewhere cannot leave it half-updated
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, id: InvocationId) {
        let mut slot = self.lock();
        let owned = matches!(slot.state, RunState::Running { id: current, .. } if current == id);
        if owned {
            slot.state = RunState::Idle;
            debug!("Slot released by {}", id);
        } else {
            warn!("{} tried to release a slot it does not own", id);
        }
    }
}

/// Runs one external process at a time and streams its output.
pub struct ProcessRunner {
    tool: ResolvedTool,
    options: RunnerOptions,
    runtime: Handle,
    shared: Arc<Shared>,
}

impl ProcessRunner {
    /// Creates a runner bound to the current tokio runtime.
    ///
    /// # Errors
    /// Returns [`RunnerError::NoRuntime`] when called outside a runtime.
    pub fn new(tool: ResolvedTool) -> Result<Self, RunnerError> {
        Self::with_options(tool, RunnerOptions::default())
    }

    pub fn with_options(tool: ResolvedTool, options: RunnerOptions) -> Result<Self, RunnerError> {
        let runtime = Handle::try_current().map_err(|_| RunnerError::NoRuntime)?;
        Ok(Self::with_runtime(tool, options, runtime))
    }

    /// Creates a runner that drives its processes on `runtime`.
    pub fn with_runtime(tool: ResolvedTool, options: RunnerOptions, runtime: Handle) -> Self {
        Self {
            tool,
            options,
            runtime,
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: RunState::Idle,
                    last_id: 0,
                }),
            }),
        }
    }

    pub fn tool(&self) -> &ResolvedTool {
        &self.tool
    }

    pub fn options(&self) -> RunnerOptions {
        self.options
    }

    /// Returns true while an invocation owns the process slot.
    pub fn is_busy(&self) -> bool {
        matches!(self.shared.lock().state, RunState::Running { .. })
    }

    /// Id of the invocation currently owning the slot, if any.
    pub fn current(&self) -> Option<InvocationId> {
        match self.shared.lock().state {
            RunState::Running { id, .. } => Some(id),
            RunState::Idle => None,
        }
    }

    /// Starts `invocation` and reports its events to `observer`.
    ///
    /// Returns immediately. All observer methods run later on the runtime,
    /// `on_complete` exactly once.
    ///
    /// # Errors
    /// Returns [`RunnerError::AlreadyRunning`] if the slot is taken. The live
    /// process is left alone and `observer` is dropped without being called.
    pub fn execute<O: RunObserver>(
        &self,
        invocation: Invocation,
        observer: O,
    ) -> Result<InvocationId, RunnerError> {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let id = {
            let mut slot = self.shared.lock();
            if let RunState::Running { id, .. } = slot.state {
                warn!("Rejecting '{}': {} is still running", invocation, id);
                return Err(RunnerError::AlreadyRunning);
            }
            slot.last_id += 1;
            let id = InvocationId(slot.last_id);
            slot.state = RunState::Running {
                id,
                cancel: cancel_tx,
            };
            id
        };

        info!("Starting {}: {:?} {}", id, self.tool.program, invocation);

        let supervisor = Supervisor {
            id,
            tool: self.tool.clone(),
            drain_timeout: self.options.drain_timeout,
            shared: self.shared.clone(),
        };
        self.runtime.spawn(supervisor.run(invocation, observer, cancel_rx));

        Ok(id)
    }

    /// Three-callback form of [`execute`](Self::execute).
    pub fn execute_with<O, E, C>(
        &self,
        invocation: Invocation,
        on_output_line: O,
        on_error_line: E,
        on_complete: C,
    ) -> Result<InvocationId, RunnerError>
    where
        O: FnMut(String) + Send + 'static,
        E: FnMut(String) + Send + 'static,
        C: FnOnce(CompletionResult) + Send + 'static,
    {
        self.execute(
            invocation,
            Callbacks::new(on_output_line, on_error_line, on_complete),
        )
    }

    /// Requests a forced kill of the running process.
    ///
    /// No-op when idle. The completion for the killed invocation is reported
    /// asynchronously as [`CompletionResult::Cancelled`].
    pub fn cancel(&self) {
        let slot = self.shared.lock();
        match &slot.state {
            RunState::Idle => debug!("Cancel ignored, runner is idle"),
            RunState::Running { id, cancel } => {
                if !cancel.send_replace(true) {
                    info!("Cancelling {}", id);
                }
            }
        }
    }
}

impl Drop for ProcessRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Per-invocation task state.
struct Supervisor {
    id: InvocationId,
    tool: ResolvedTool,
    drain_timeout: Duration,
    shared: Arc<Shared>,
}

impl Supervisor {
    async fn run<O: RunObserver>(
        self,
        invocation: Invocation,
        mut observer: O,
        mut cancel_rx: watch::Receiver<bool>,
    ) {
        let id = self.id;
        let shared = self.shared.clone();
        // Frees the slot even if an observer callback panics
        let release = OnDrop::with(move || shared.release(id));

        let result = self
            .supervise(&invocation, &mut observer, &mut cancel_rx)
            .await;

        release.run();
        info!("{} finished: {}", id, result);
        observer.on_complete(id, result);
    }

    async fn supervise<O: RunObserver>(
        &self,
        invocation: &Invocation,
        observer: &mut O,
        cancel_rx: &mut watch::Receiver<bool>,
    ) -> CompletionResult {
        let id = self.id;

        if *cancel_rx.borrow() {
            info!("{} cancelled before launch", id);
            return CompletionResult::Cancelled;
        }

        let mut cmd = self.tool.command(invocation);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("{} failed to launch {:?}: {}", id, self.tool.program, e);
                return CompletionResult::LaunchFailure(e.to_string());
            }
        };
        debug!("{} spawned with pid {:?}", id, child.id());

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        let mut readers = JoinSet::new();
        if let Some(stdout) = child.stdout.take() {
            readers.spawn(pump_lines(stdout, StreamKind::Stdout, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.spawn(pump_lines(stderr, StreamKind::Stderr, line_tx.clone()));
        }
        drop(line_tx);

        let mut streams_open = true;
        let mut watch_cancel = true;
        let mut kill_sent = false;

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                requested = cancel_requested(cancel_rx), if watch_cancel => {
                    watch_cancel = false;
                    if requested {
                        kill_sent = true;
                        if let Err(e) = child.start_kill() {
                            debug!("{} kill request failed: {}", id, e);
                        }
                    }
                }
                event = line_rx.recv(), if streams_open => match event {
                    Some(event) => observer.on_line(id, event),
                    None => streams_open = false,
                },
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                warn!("{} lost track of its process: {}", id, e);
                if let Err(e) = child.start_kill() {
                    debug!("{} kill after supervision error failed: {}", id, e);
                }
                readers.abort_all();
                return CompletionResult::RuntimeFailure(e.to_string());
            }
        };

        if streams_open {
            let drain = tokio::time::sleep(self.drain_timeout);
            tokio::pin!(drain);
            loop {
                tokio::select! {
                    event = line_rx.recv() => match event {
                        Some(event) => observer.on_line(id, event),
                        None => break,
                    },
                    _ = &mut drain => {
                        warn!(
                            "{} output still open {:?} after exit, closing readers",
                            id, self.drain_timeout
                        );
                        readers.abort_all();
                        while let Ok(event) = line_rx.try_recv() {
                            observer.on_line(id, event);
                        }
                        break;
                    }
                }
            }
        }

        if kill_sent && killed_by_signal(&status) {
            CompletionResult::Cancelled
        } else {
            CompletionResult::from_status(status)
        }
    }
}

async fn cancel_requested(rx: &mut watch::Receiver<bool>) -> bool {
    rx.wait_for(|requested| *requested).await.is_ok()
}

/// Whether the process died from a kill rather than exiting with a code.
fn killed_by_signal(status: &ExitStatus) -> bool {
    #[cfg(unix)]
    {
        status.code().is_none()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        true
    }
}
