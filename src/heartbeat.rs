//! Cancellable periodic task driving the status heartbeat.
//!
//! Ticks never overlap: each tick runs on the blocking pool and is awaited
//! before the next one is considered, so a slow server stretches the period
//! instead of queueing work. The stop predicate is checked once at the top of
//! every tick; a tick already in flight always completes.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default heartbeat period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Why a heartbeat task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// The stop predicate returned true.
    Stopped,
    /// [`HeartbeatHandle::cancel`] was called.
    Cancelled,
    /// The tick callback panicked.
    Failed,
}

/// Summary returned when a heartbeat task finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub ticks: u64,
    pub exit: HeartbeatExit,
}

/// Handle to a running heartbeat.
///
/// Dropping the handle does not stop the task; only the stop predicate or an
/// explicit cancel does.
pub struct HeartbeatHandle {
    canceller: HeartbeatCanceller,
    task: JoinHandle<HeartbeatReport>,
}

/// Cloneable cancel trigger, e.g. for a Ctrl-C listener.
#[derive(Clone)]
pub struct HeartbeatCanceller {
    stop_tx: mpsc::Sender<()>,
}

impl HeartbeatCanceller {
    /// Stops the heartbeat before its next tick.
    pub fn cancel(&self) {
        let _ = self.stop_tx.try_send(());
    }
}

impl HeartbeatHandle {
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    pub fn canceller(&self) -> HeartbeatCanceller {
        self.canceller.clone()
    }

    /// Waits for the task to end.
    pub async fn join(self) -> Result<HeartbeatReport> {
        self.task.await.context("Heartbeat task was aborted")
    }
}

/// Starts a heartbeat on the current tokio runtime.
///
/// The first tick fires immediately. On every tick `should_stop` is evaluated
/// first; once it returns true the task ends for good. Otherwise `on_tick`
/// runs, typically calling [`SessionController::update`].
///
/// [`SessionController::update`]: crate::controller::SessionController::update
pub fn spawn<S, F>(period: Duration, should_stop: S, on_tick: F) -> HeartbeatHandle
where
    S: Fn() -> bool + Send + Sync + 'static,
    F: FnMut() + Send + 'static,
{
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    let should_stop = Arc::new(should_stop);
    let on_tick = Arc::new(Mutex::new(on_tick));

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        let exit = loop {
            tokio::select! {
                biased;
                Some(()) = stop_rx.recv() => break HeartbeatExit::Cancelled,
                _ = interval.tick() => {
                    let should_stop = Arc::clone(&should_stop);
                    let on_tick = Arc::clone(&on_tick);
                    let tick = tokio::task::spawn_blocking(move || {
                        if should_stop() {
                            return false;
                        }
                        let mut on_tick = on_tick
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        (*on_tick)();
                        true
                    })
                    .await;

                    match tick {
                        Ok(true) => ticks += 1,
                        Ok(false) => break HeartbeatExit::Stopped,
                        Err(e) => {
                            tracing::error!("Heartbeat tick failed: {}", e);
                            break HeartbeatExit::Failed;
                        }
                    }
                }
            }
        };

        tracing::debug!(ticks, ?exit, "Heartbeat finished");
        HeartbeatReport { ticks, exit }
    });

    HeartbeatHandle {
        canceller: HeartbeatCanceller { stop_tx },
        task,
    }
}

#[cfg(test)]
#[path = "tests/heartbeat_tests.rs"]
mod tests;
