//! Cancellable once-per-second ticker for the learning-mode breather.
//!
//! The ticker carries no data; each delivered `()` means "one second
//! passed, call `Session::tick`". Cancelling aborts the background task
//! and drops the receiver, so ticks already queued are never delivered to
//! a superseded attempt.

use std::time::Duration;
use tokio::{sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct BreatherTimer {
    period: Duration,
    task: Option<JoinHandle<()>>,
    ticks: Option<mpsc::Receiver<()>>,
}

impl Default for BreatherTimer {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl BreatherTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            task: None,
            ticks: None,
        }
    }

    /// Starts ticking, replacing any ticker that was already running.
    pub fn start(&mut self) {
        self.cancel();
        let (tx, rx) = mpsc::channel(1);
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        }));
        self.ticks = Some(rx);
        debug!(period_ms = period.as_millis() as u64, "Breather timer started");
    }

    /// Stops ticking. Safe to call when nothing is running.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Breather timer cancelled");
        }
        self.ticks = None;
    }

    pub fn is_running(&self) -> bool {
        self.ticks.is_some()
    }

    /// Waits for the next tick. Pends forever while the timer is stopped,
    /// which keeps it usable as a `tokio::select!` branch.
    pub async fn next_tick(&mut self) -> Option<()> {
        match self.ticks.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }
}

impl Drop for BreatherTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
