//! Periodic job registry.
//!
//! Each registered task gets its own Tokio task driving a fixed-period
//! interval. Every tick spawns one `on_tick` call; whether an overlapping call
//! does any work is the task's decision. Ticks missed while the runtime was
//! busy are skipped rather than replayed in a burst.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::engine::EngineError;

/// Minimum allowed interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// A unit of work run on a fixed period.
#[async_trait::async_trait]
pub trait PeriodicTask: Send + Sync + 'static {
    /// Identifier used in logs and job listings.
    fn name(&self) -> &str;

    /// Period between ticks.
    fn interval(&self) -> Duration;

    /// Handle one tick. Failures must be handled inside.
    async fn on_tick(&self);
}

/// Clamp an interval to [`MIN_INTERVAL`].
pub fn clamp_interval(interval: Duration) -> Duration {
    if interval < MIN_INTERVAL {
        tracing::warn!(min_interval = ?MIN_INTERVAL, requested = ?interval,
            "Interval duration is less than minimum allowed. Using minimum duration."
        );
        MIN_INTERVAL
    } else {
        interval
    }
}

/// Metadata about a registered job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job UUID.
    pub id: uuid::Uuid,
    /// Task name.
    pub name: String,
    /// Tick period.
    pub interval: Duration,
}

struct Job {
    info: JobInfo,
    task: Arc<dyn PeriodicTask>,
    handle: Option<JoinHandle<()>>,
}

/// Owns the periodic jobs and their start/stop lifecycle.
pub struct Scheduler {
    jobs: Vec<Job>,
    shutdown_tx: watch::Sender<bool>,
    started: bool,
}

impl Scheduler {
    /// Create an empty, stopped scheduler.
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            jobs: Vec::new(),
            shutdown_tx,
            started: false,
        }
    }

    /// Register a task. It starts ticking once the scheduler is started,
    /// immediately if it already is.
    pub fn add<T: PeriodicTask>(&mut self, task: Arc<T>) -> uuid::Uuid {
        let task: Arc<dyn PeriodicTask> = task;
        let info = JobInfo {
            id: uuid::Uuid::new_v4(),
            name: task.name().to_string(),
            interval: clamp_interval(task.interval()),
        };
        let id = info.id;

        let mut job = Job {
            info,
            task,
            handle: None,
        };
        if self.started {
            self.spawn_job(&mut job);
        }

        tracing::info!(job = %job.info.name, job_id = %id, interval = ?job.info.interval, "Job registered");
        self.jobs.push(job);
        id
    }

    /// Start ticking every registered job.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::Scheduler("scheduler already started".to_string()));
        }
        self.started = true;

        let mut jobs = std::mem::take(&mut self.jobs);
        for job in &mut jobs {
            self.spawn_job(job);
        }
        self.jobs = jobs;

        tracing::info!(job_count = self.jobs.len(), "Scheduler started");
        Ok(())
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// List all registered jobs.
    pub fn list_jobs(&self) -> Vec<JobInfo> {
        self.jobs.iter().map(|j| j.info.clone()).collect()
    }

    /// Get the number of registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Gracefully shutdown with the default timeout.
    pub async fn shutdown(self) -> Result<(), EngineError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Stop ticking and wait up to `timeout` for in-flight ticks.
    ///
    /// Ticks still running after the timeout are aborted.
    pub async fn shutdown_with_timeout(self, timeout: Duration) -> Result<(), EngineError> {
        let _ = self.shutdown_tx.send(true);

        let mut handles: Vec<JoinHandle<()>> =
            self.jobs.into_iter().filter_map(|j| j.handle).collect();
        let job_count = handles.len();

        let drained = tokio::time::timeout(timeout, async {
            for handle in &mut handles {
                if let Err(e) = handle.await
                    && e.is_panic()
                {
                    tracing::error!(error = %e, "Job loop panicked");
                }
            }
        })
        .await;

        if drained.is_err() {
            for handle in &handles {
                handle.abort();
            }
            tracing::warn!(job_count, "Scheduler shutdown timed out, aborted in-flight ticks");
        } else {
            tracing::info!(job_count, "Scheduler shutdown complete");
        }
        Ok(())
    }

    fn spawn_job(&self, job: &mut Job) {
        let task = Arc::clone(&job.task);
        let interval = job.info.interval;
        let shutdown_rx = self.shutdown_tx.subscribe();
        job.handle = Some(tokio::spawn(run_job(task, interval, shutdown_rx)));
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("job_count", &self.jobs.len())
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

/// Tick loop for one job. The first tick fires immediately.
async fn run_job(
    task: Arc<dyn PeriodicTask>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                while in_flight.try_join_next().is_some() {}
                tracing::trace!(job = %task.name(), "Tick");
                let task = Arc::clone(&task);
                in_flight.spawn(async move { task.on_tick().await });
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    tracing::debug!(job = %task.name(), "Job stopped");
}
