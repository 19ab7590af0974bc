use std::sync::Arc;

use botblocks::Program;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::channel::CommandChannel;
use crate::error::RunError;
use crate::executor::{RunOutcome, RunReport, execute_program};
use crate::timing::Timing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    /// The last run was stopped by cancellation.
    Cancelled,
}

/// Runs programs against one command channel, one run at a time.
pub struct Interpreter {
    channel: Arc<dyn CommandChannel>,
    timing: Arc<Timing>,
    state: Arc<Mutex<RunState>>,
}

impl Interpreter {
    pub fn new(channel: Arc<dyn CommandChannel>) -> Self {
        Interpreter {
            channel,
            timing: Arc::new(Timing::default()),
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = Arc::new(timing);
        self
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Current run state.
    ///
    /// After [`RunHandle::cancel`] this keeps reporting `Running` until the
    /// run task reaches its next block or iteration boundary and stops; only
    /// then does it become `Cancelled`.
    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Start running a snapshot of `program` on the current tokio runtime.
    ///
    /// Fails without side effects if the channel is down or a run is
    /// already in flight. Later edits to `program` do not affect the run.
    pub fn run(&self, program: &Program) -> Result<RunHandle, RunError> {
        let mut state = self.state.lock();
        if *state == RunState::Running {
            return Err(RunError::AlreadyRunning);
        }
        if !self.channel.is_connected() {
            return Err(RunError::NotConnected);
        }
        *state = RunState::Running;
        drop(state);

        let blocks = program.to_blocks();
        let token = CancellationToken::new();
        info!(
            blocks = blocks.len(),
            leaves = program.leaf_count(),
            revision = program.revision(),
            "starting run"
        );

        let channel = Arc::clone(&self.channel);
        let timing = Arc::clone(&self.timing);
        let state = Arc::clone(&self.state);
        let run_token = token.clone();
        let task = tokio::spawn(async move {
            let report = execute_program(&blocks, channel.as_ref(), &timing, run_token).await;
            *state.lock() = match report.outcome {
                RunOutcome::Completed => RunState::Idle,
                RunOutcome::Cancelled => RunState::Cancelled,
            };
            info!(
                outcome = ?report.outcome,
                commands = report.commands_published,
                interlocks = report.interlocks,
                "run finished"
            );
            report
        });

        Ok(RunHandle {
            token,
            task,
            state: Arc::clone(&self.state),
        })
    }

    pub fn cancel(&self, handle: &RunHandle) {
        handle.cancel();
    }
}

/// Handle to an in-flight run.
///
/// Dropping the handle does not stop the run.
pub struct RunHandle {
    token: CancellationToken,
    task: JoinHandle<RunReport>,
    state: Arc<Mutex<RunState>>,
}

impl RunHandle {
    /// Request cooperative cancellation. Takes effect at the next block or
    /// iteration boundary; a wait already in progress runs to completion.
    pub fn cancel(&self) {
        info!("cancellation requested");
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<RunReport, RunError> {
        self.task.await.map_err(|e| {
            *self.state.lock() = RunState::Idle;
            RunError::TaskFailed(e.to_string())
        })
    }
}
