// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of SkyWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Fixed-interval cycle scheduler that never runs two cycles at once.
//!
//! The first cycle fires one full interval after [`Scheduler::start`].
//! When a tick arrives while the previous cycle is still running, the tick
//! is dropped and counted as skipped; it is not queued, and no catch-up
//! cycle is fired later.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use skywatch_shared::status::SchedulerState;

use crate::error::SchedulerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub state: SchedulerState,
    pub fired: u64,
    pub skipped: u64,
}

#[derive(Debug)]
struct Counters {
    state: Mutex<SchedulerState>,
    fired: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug)]
struct RunningLoop {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    counters: Arc<Counters>,
    running: Mutex<Option<RunningLoop>>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            counters: Arc::new(Counters {
                state: Mutex::new(SchedulerState::Idle),
                fired: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            state: *self.counters.state.lock(),
            fired: self.counters.fired.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Starts firing `cycle` every interval on the current tokio runtime.
    pub fn start<F, Fut>(&self, cycle: F) -> Result<(), SchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // `running` is held until the loop is installed so a concurrent
        // `stop` either sees the loop or makes this start fail.
        let mut running = self.running.lock();
        {
            let mut state = self.counters.state.lock();
            match *state {
                SchedulerState::Idle => *state = SchedulerState::Running,
                SchedulerState::Running => return Err(SchedulerError::AlreadyStarted),
                SchedulerState::Stopped => return Err(SchedulerError::Stopped),
            }
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            self.interval,
            Arc::clone(&self.counters),
            shutdown_rx,
            cycle,
        ));
        *running = Some(RunningLoop { shutdown, task });
        drop(running);

        info!(
            interval_secs = self.interval.as_secs(),
            "Collection scheduler started"
        );
        Ok(())
    }

    /// Stops future ticks. A cycle already in flight is allowed to finish
    /// before this returns. Calling it again is a no-op.
    pub async fn stop(&self) {
        let running = {
            let mut running = self.running.lock();
            *self.counters.state.lock() = SchedulerState::Stopped;
            running.take()
        };
        let Some(running) = running else {
            return;
        };

        // the receiver is gone only if the loop already exited
        let _ = running.shutdown.send(true);
        if let Err(e) = running.task.await {
            error!(error = %e, "Scheduler loop terminated abnormally");
        }
        info!("Collection scheduler stopped");
    }
}

async fn run_loop<F, Fut>(
    interval: Duration,
    counters: Arc<Counters>,
    mut shutdown: watch::Receiver<bool>,
    cycle: F,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                if in_flight.as_ref().is_some_and(|task| !task.is_finished()) {
                    let skipped = counters.skipped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(
                        skipped_total = skipped,
                        "Previous collection cycle still running, skipping tick"
                    );
                    continue;
                }
                if let Some(task) = in_flight.take()
                    && let Err(e) = task.await
                {
                    error!(error = %e, "Collection cycle panicked");
                }
                counters.fired.fetch_add(1, Ordering::Relaxed);
                in_flight = Some(tokio::spawn(cycle()));
            }
        }
    }

    if let Some(task) = in_flight
        && let Err(e) = task.await
    {
        error!(error = %e, "Collection cycle panicked");
    }
}
