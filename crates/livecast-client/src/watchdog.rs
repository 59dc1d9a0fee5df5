//! Liveness watchdog and the reconnect gate.
//!
//! The receive loop and the watchdog both decide when a connection is over.
//! Both go through one [`Tripwire`]: the first caller records its reason and
//! cancels the connection token, later callers are no-ops. Only the receive
//! loop owns the socket, so it is closed once no matter who tripped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Why a connection ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disconnect {
    /// `stop()` was called.
    Stopped,
    /// A control message reported the end of the broadcast.
    StreamEnded,
    /// No frame arrived within the liveness timeout.
    LivenessTimeout,
    /// The server closed the connection.
    RemoteClosed,
    /// Socket read error.
    Transport(String),
}

impl Disconnect {
    /// Whether the session should try to connect again.
    pub fn should_reconnect(&self) -> bool {
        matches!(
            self,
            Self::LivenessTimeout | Self::RemoteClosed | Self::Transport(_)
        )
    }
}

/// One-shot "end this connection" switch shared by the receive loop and the
/// watchdog.
#[derive(Debug)]
pub struct Tripwire {
    reason: Mutex<Option<Disconnect>>,
    token: CancellationToken,
}

impl Tripwire {
    /// Tripwire cancelling `token`.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            reason: Mutex::new(None),
            token,
        }
    }

    /// Record `reason` and cancel the connection. Returns `false` if the
    /// connection was already ending.
    pub fn trip(&self, reason: Disconnect) -> bool {
        let mut slot = self.reason.lock();
        if slot.is_some() || self.token.is_cancelled() {
            return false;
        }
        *slot = Some(reason);
        self.token.cancel();
        true
    }

    /// The winning reason. `None` means the parent session was cancelled.
    pub fn reason(&self) -> Option<Disconnect> {
        self.reason.lock().clone()
    }

    /// Resolves once tripped or cancelled from above.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

/// Trips [`Disconnect::LivenessTimeout`] when [`Watchdog::feed`] has not been
/// called for `timeout`. Armed on construction; disarmed on drop.
pub struct Watchdog {
    last_frame: Arc<Mutex<Instant>>,
    task: JoinHandle<()>,
}

impl Watchdog {
    /// Start the timer.
    pub fn arm(timeout: Duration, tripwire: Arc<Tripwire>) -> Self {
        let last_frame = Arc::new(Mutex::new(Instant::now()));
        let task = tokio::spawn(run(last_frame.clone(), timeout, tripwire));
        Self { last_frame, task }
    }

    /// Record a received frame.
    pub fn feed(&self) {
        *self.last_frame.lock() = Instant::now();
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(last_frame: Arc<Mutex<Instant>>, timeout: Duration, tripwire: Arc<Tripwire>) {
    loop {
        let deadline = *last_frame.lock() + timeout;
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => {
                let silent = last_frame.lock().elapsed();
                if silent >= timeout {
                    if tripwire.trip(Disconnect::LivenessTimeout) {
                        warn!(silent_ms = silent.as_millis() as u64, "no frames received, forcing reconnect");
                    }
                    return;
                }
            }
            () = tripwire.cancelled() => return,
        }
    }
}
