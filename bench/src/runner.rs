//! Virtual worker pool
//!
//! Spawns one tokio task per worker slot. Each task asks the scenario what
//! to do next and loops until told to stop. When the scenario's duration is
//! up, workers get a graceful-stop window to finish their current iteration
//! before being aborted.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::generator::Generator;
use crate::hooks;
use crate::scenario::{Decision, Scenario};
use crate::stats::MetricsSnapshot;

/// Default drain window at run end
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub scenario: &'static str,
    pub snapshot: MetricsSnapshot,
    /// Workers still busy when the graceful-stop window closed
    pub interrupted_workers: usize,
    pub elapsed: Duration,
}

pub struct Runner {
    generator: Generator,
    scenario: Arc<Scenario>,
    graceful_stop: Duration,
}

impl Runner {
    pub fn new(generator: Generator, scenario: Scenario) -> Self {
        Self {
            generator,
            scenario: Arc::new(scenario),
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    pub fn with_graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.graceful_stop = graceful_stop;
        self
    }

    /// Run setup, drive all workers to completion, run teardown
    pub async fn run(&self) -> RunResult {
        let data = hooks::setup(&self.generator, &self.scenario);

        let start = Instant::now();
        let max_vus = self.scenario.max_vus();
        info!(
            "Starting {} workers for scenario '{}'",
            max_vus,
            self.scenario.name()
        );

        let handles: Vec<_> = (0..max_vus)
            .map(|worker| {
                tokio::spawn(run_worker(
                    self.generator.clone(),
                    self.scenario.clone(),
                    worker,
                    start,
                ))
            })
            .collect();
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let deadline = tokio::time::Instant::from_std(start)
            + self.scenario.duration()
            + self.graceful_stop;

        let interrupted_workers = match tokio::time::timeout_at(deadline, join_all(handles)).await
        {
            Ok(results) => {
                let completed: u64 = results.iter().filter_map(|r| r.as_ref().ok()).sum();
                let panicked = results.iter().filter(|r| r.is_err()).count();
                if panicked > 0 {
                    warn!("{} workers panicked", panicked);
                }
                debug!("All workers finished, {} iterations", completed);
                0
            }
            Err(_) => {
                let stuck: Vec<_> = abort_handles.iter().filter(|h| !h.is_finished()).collect();
                warn!(
                    "Graceful stop of {:?} expired, aborting {} workers",
                    self.graceful_stop,
                    stuck.len()
                );
                for handle in &stuck {
                    handle.abort();
                }
                stuck.len()
            }
        };

        let elapsed = start.elapsed();
        let snapshot = self.generator.metrics().snapshot(elapsed).await;
        hooks::teardown(data);

        RunResult {
            scenario: self.scenario.name(),
            snapshot,
            interrupted_workers,
            elapsed,
        }
    }
}

/// One virtual worker: returns the number of iterations it completed
async fn run_worker(
    generator: Generator,
    scenario: Arc<Scenario>,
    worker: usize,
    start: Instant,
) -> u64 {
    let mut completed = 0u64;
    loop {
        match scenario.decide(worker, completed, start.elapsed()) {
            Decision::Run => {
                generator.generate_and_send().await;
                completed += 1;
            }
            Decision::Idle(wait) => tokio::time::sleep(wait).await,
            Decision::Stop => break,
        }
    }
    debug!("Worker {} stopped after {} iterations", worker, completed);
    completed
}
