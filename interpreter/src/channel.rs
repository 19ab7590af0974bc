use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::command::{ActuatorTarget, Command};

/// Outbound transport to the physical system.
///
/// Publishing is fire-and-forget: there is no acknowledgement and the
/// interpreter never retries. Connectivity is only required at run start.
pub trait CommandChannel: Send + Sync {
    fn publish(&self, target: ActuatorTarget, command: Command);

    fn is_connected(&self) -> bool;
}

/// A command as seen by a [`RecordingChannel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub at: Instant,
    pub target: ActuatorTarget,
    pub command: Command,
}

#[derive(Debug, Default)]
struct Recording {
    published: Vec<Published>,
    cancel_after: Option<(usize, CancellationToken)>,
    disconnect_after: Option<usize>,
}

/// In-memory channel that timestamps every publish.
///
/// Used for dry runs and scenario checks. It can cancel a run or drop its
/// connection once a given number of commands has been published.
#[derive(Debug)]
pub struct RecordingChannel {
    connected: AtomicBool,
    state: Mutex<Recording>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        RecordingChannel::with_connection(true)
    }

    pub fn with_connection(connected: bool) -> Self {
        RecordingChannel {
            connected: AtomicBool::new(connected),
            state: Mutex::new(Recording::default()),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Cancel `token` as soon as `count` commands have been published.
    pub fn cancel_after(&self, count: usize, token: CancellationToken) {
        self.state.lock().cancel_after = Some((count, token));
    }

    /// Report disconnected once `count` commands have been published.
    pub fn disconnect_after(&self, count: usize) {
        self.state.lock().disconnect_after = Some(count);
    }

    pub fn published(&self) -> Vec<Published> {
        self.state.lock().published.clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state
            .lock()
            .published
            .iter()
            .map(|p| p.command.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RecordingChannel {
    fn default() -> Self {
        RecordingChannel::new()
    }
}

impl CommandChannel for RecordingChannel {
    fn publish(&self, target: ActuatorTarget, command: Command) {
        let mut state = self.state.lock();
        state.published.push(Published {
            at: Instant::now(),
            target,
            command,
        });
        let count = state.published.len();
        if let Some((after, token)) = &state.cancel_after {
            if count >= *after {
                token.cancel();
            }
        }
        if state.disconnect_after.is_some_and(|after| count >= after) {
            self.set_connected(false);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
