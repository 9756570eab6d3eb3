//! Timer-driven synchronization of remote state into the [`Store`].
//!
//! A [`Poller`] runs one [`SyncSource`] on a fixed period: one fetch at
//! mount, then one per tick. Ticks may overlap when the process is slow, so
//! each fetch is numbered and a result is only committed when it is newer
//! than everything committed before it. Failures are logged and the next
//! tick is the retry.
//!
//! [`Store`]: crate::store::Store

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

#[async_trait]
pub trait SyncSource: Send + Sync + 'static {
    type Snapshot: Send + 'static;

    fn name(&self) -> &'static str;

    /// `Ok(None)` means nothing usable came back and local state must stay
    /// as it is.
    async fn fetch(&self) -> Result<Option<Self::Snapshot>>;

    /// Replaces the local slice with `snapshot`.
    async fn commit(&self, snapshot: Self::Snapshot);

    /// Runs after every tick of a live poller, whatever its outcome.
    async fn settled(&self) {}

    /// Checked before every fetch. Once false the poller stops for good.
    async fn is_current(&self) -> bool {
        true
    }
}

/// Orders commits of overlapping fetches.
#[derive(Debug, Default)]
pub struct CommitGate {
    issued: AtomicU64,
    committed: Mutex<u64>,
}

impl CommitGate {
    pub fn issue(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Runs `commit` when `seq` is newer than every committed sequence.
    /// Returns whether it ran.
    pub async fn commit_if_newest<F>(&self, seq: u64, commit: F) -> bool
    where
        F: std::future::Future<Output = ()>,
    {
        let mut committed = self.committed.lock().await;
        if seq <= *committed {
            return false;
        }
        commit.await;
        *committed = seq;
        true
    }
}

pub struct PollHandle {
    name: &'static str,
    live: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// False once cancelled or once its source stopped being current.
    pub fn is_active(&self) -> bool {
        self.task.is_some() && self.live.load(Ordering::SeqCst)
    }

    /// Stops the timer. Fetches already in flight finish but never commit.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            self.live.store(false, Ordering::SeqCst);
            task.abort();
            debug!(source = self.name, "poller: cancelled");
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct Poller;

impl Poller {
    pub fn spawn<S: SyncSource>(source: Arc<S>, period: Duration) -> PollHandle {
        let name = source.name();
        let live = Arc::new(AtomicBool::new(true));
        let gate = Arc::new(CommitGate::default());

        let task = tokio::spawn({
            let live = Arc::clone(&live);
            async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    if !source.is_current().await {
                        live.store(false, Ordering::SeqCst);
                        debug!(source = source.name(), "poller: source retired, stopping");
                        break;
                    }
                    launch_tick(&source, &gate, &live);
                    ticker.tick().await;
                }
            }
        });
        debug!(source = name, period_ms = period.as_millis() as u64, "poller: started");

        PollHandle {
            name,
            live,
            task: Some(task),
        }
    }
}

fn launch_tick<S: SyncSource>(source: &Arc<S>, gate: &Arc<CommitGate>, live: &Arc<AtomicBool>) {
    let seq = gate.issue();
    let source = Arc::clone(source);
    let gate = Arc::clone(gate);
    let live = Arc::clone(live);
    tokio::spawn(async move { run_tick(source, gate, live, seq).await });
}

async fn run_tick<S: SyncSource>(
    source: Arc<S>,
    gate: Arc<CommitGate>,
    live: Arc<AtomicBool>,
    seq: u64,
) {
    let outcome = source.fetch().await;
    if !live.load(Ordering::SeqCst) {
        debug!(source = source.name(), seq, "poller: dropping result after teardown");
        return;
    }

    match outcome {
        Ok(Some(snapshot)) => {
            let committed = gate
                .commit_if_newest(seq, async {
                    if live.load(Ordering::SeqCst) {
                        source.commit(snapshot).await;
                    }
                })
                .await;
            if !committed {
                debug!(source = source.name(), seq, "poller: discarding stale result");
            }
        }
        Ok(None) => {
            debug!(source = source.name(), seq, "poller: no usable payload, keeping state");
        }
        Err(err) => {
            warn!(source = source.name(), seq, "poller: fetch failed: {err:#}");
        }
    }

    if live.load(Ordering::SeqCst) {
        source.settled().await;
    }
}

#[cfg(test)]
#[path = "tests/poller_tests.rs"]
mod tests;
