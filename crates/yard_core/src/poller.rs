//! Periodic fetch loop for one data channel, one fetch in flight at a time.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::BoxFuture;
use shared::protocol::{Channel, ChannelPhase, ChannelStatus};
use thiserror::Error;
use tokio::{
    sync::{watch, Mutex, Notify, RwLock},
    task::JoinHandle,
    time::{self, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::YardError;

pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, YardError>> + Send + Sync>;

pub type SharedChannelState<T> = Arc<RwLock<ChannelState<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fetch once on start, then only when a refresh is requested.
    OnDemand,
    /// Fetch once on start, then every period and on refresh requests.
    Every(Duration),
}

#[derive(Debug, Clone)]
pub struct ChannelState<T> {
    pub last_value: Option<T>,
    pub status: ChannelStatus,
}

impl<T> Default for ChannelState<T> {
    fn default() -> Self {
        Self {
            last_value: None,
            status: ChannelStatus::default(),
        }
    }
}

pub fn shared_state<T>() -> SharedChannelState<T> {
    Arc::new(RwLock::new(ChannelState::default()))
}

/// Receives the outcome of each fetch cycle.
#[async_trait]
pub trait ChannelSink<T: Send + Sync>: Send + Sync {
    /// Applies a fetched value to the owner's model before it is recorded.
    /// An error here is recorded against the channel like a failed fetch.
    async fn commit(&self, _channel: Channel, _value: &T) -> Result<(), YardError> {
        Ok(())
    }

    /// Runs after the channel state has been updated, on success or failure.
    async fn cycle_completed(&self, channel: Channel);
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} poller is stopped")]
pub struct PollerStopped(pub Channel);

pub struct ChannelPoller {
    channel: Channel,
    cancel: CancellationToken,
    wake: Arc<Notify>,
    counters: Arc<CycleCounters>,
    completed: watch::Receiver<u64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Default)]
struct CycleCounters {
    started: AtomicU64,
    requested: AtomicU64,
}

impl CycleCounters {
    fn has_pending_request(&self) -> bool {
        self.requested.load(Ordering::SeqCst) > self.started.load(Ordering::SeqCst)
    }
}

impl ChannelPoller {
    /// Spawns the driver task. The first fetch runs immediately.
    pub fn spawn<T>(
        channel: Channel,
        schedule: Schedule,
        state: SharedChannelState<T>,
        fetch: FetchFn<T>,
        sink: Arc<dyn ChannelSink<T>>,
    ) -> Self
    where
        T: Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let wake = Arc::new(Notify::new());
        let counters = Arc::new(CycleCounters::default());
        let (completed_tx, completed) = watch::channel(0);

        let driver = Driver {
            channel,
            schedule,
            state,
            fetch,
            sink,
            cancel: cancel.clone(),
            wake: Arc::clone(&wake),
            counters: Arc::clone(&counters),
            completed: completed_tx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            channel,
            cancel,
            wake,
            counters,
            completed,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Requests an out-of-cycle fetch and waits until a cycle that started
    /// after this call has completed. A request made while a fetch is in
    /// flight is served by the following cycle, never by a second concurrent
    /// fetch.
    pub async fn refresh(&self) -> Result<(), PollerStopped> {
        if self.cancel.is_cancelled() {
            return Err(PollerStopped(self.channel));
        }

        let target = self.counters.started.load(Ordering::SeqCst) + 1;
        self.counters.requested.fetch_max(target, Ordering::SeqCst);
        self.wake.notify_one();

        let mut completed = self.completed.clone();
        completed
            .wait_for(|done| *done >= target)
            .await
            .map(|_| ())
            .map_err(|_| PollerStopped(self.channel))
    }

    /// Cancels the driver and waits for it to exit. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(channel = %self.channel, error = %err, "poller task ended abnormally");
                }
            }
        }
    }
}

impl Drop for ChannelPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver<T: Send + Sync> {
    channel: Channel,
    schedule: Schedule,
    state: SharedChannelState<T>,
    fetch: FetchFn<T>,
    sink: Arc<dyn ChannelSink<T>>,
    cancel: CancellationToken,
    wake: Arc<Notify>,
    counters: Arc<CycleCounters>,
    completed: watch::Sender<u64>,
}

impl<T> Driver<T>
where
    T: Send + Sync + 'static,
{
    async fn run(self) {
        let mut ticker = match self.schedule {
            Schedule::OnDemand => None,
            Schedule::Every(period) => {
                let mut ticker = time::interval_at(time::Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                Some(ticker)
            }
        };

        let mut due = true;
        loop {
            if !due {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = self.wake.notified() => due = self.counters.has_pending_request(),
                    _ = next_tick(&mut ticker) => due = true,
                }
                if !due {
                    continue;
                }
            }

            if !self.run_cycle().await {
                break;
            }
            due = self.counters.has_pending_request();
        }

        self.state.write().await.status.phase = ChannelPhase::Stopped;
        debug!(channel = %self.channel, "poller stopped");
    }

    /// Returns false once the poller has been cancelled.
    async fn run_cycle(&self) -> bool {
        let cycle = self.counters.started.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write().await;
            state.status.phase = ChannelPhase::Fetching;
            state.status.last_attempt = Some(Utc::now());
        }

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            fetched = (self.fetch)() => fetched,
        };
        if self.cancel.is_cancelled() {
            return false;
        }

        let outcome = match fetched {
            Ok(value) => match self.sink.commit(self.channel, &value).await {
                Ok(()) => Ok(value),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        {
            let mut state = self.state.write().await;
            state.status.phase = ChannelPhase::Idle;
            match outcome {
                Ok(value) => {
                    state.last_value = Some(value);
                    state.status.last_error = None;
                    state.status.consecutive_failures = 0;
                    debug!(channel = %self.channel, cycle, "channel refreshed");
                }
                Err(err) => {
                    state.status.last_error = Some(err.kind());
                    state.status.consecutive_failures =
                        state.status.consecutive_failures.saturating_add(1);
                    warn!(
                        channel = %self.channel,
                        cycle,
                        failures = state.status.consecutive_failures,
                        error = %err,
                        "channel fetch failed; keeping last value"
                    );
                }
            }
        }

        self.sink.cycle_completed(self.channel).await;
        self.completed.send_replace(cycle);
        true
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
