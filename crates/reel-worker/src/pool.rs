//! Bounded fan-out/fan-in over independent work items.
//!
//! Results are written into an index-addressed slot vector, so `slots[i]`
//! always belongs to `items[i]` whatever order tasks finish in. A failing
//! or panicking item never cancels its siblings.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// One unit handed to the pool.
#[derive(Debug)]
pub enum WorkItem<I, T> {
    /// Already done on a previous run; the result is reused without taking
    /// a worker slot.
    Done(T),
    /// Needs to run.
    Todo(I),
}

/// Final state of one slot.
#[derive(Debug)]
pub enum Slot<T> {
    Reused(T),
    Completed(T),
    Failed(WorkerError),
}

impl<T> Slot<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Slot::Reused(v) | Slot::Completed(v) => Some(v),
            Slot::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&WorkerError> {
        match self {
            Slot::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Everything a pool run produced, in item order.
#[derive(Debug)]
pub struct PoolOutcome<T> {
    pub slots: Vec<Slot<T>>,
}

impl<T> PoolOutcome<T> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn success_count(&self) -> usize {
        self.slots.iter().filter(|s| s.value().is_some()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.slots.len() - self.success_count()
    }

    pub fn reused_count(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Reused(_))).count()
    }

    pub fn executed_count(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Completed(_))).count()
    }

    /// True when every item succeeded (an empty run counts as complete).
    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }

    /// Failed item indices with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &WorkerError)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.error().map(|e| (i, e)))
    }

    /// Successful results in item order; failed slots are omitted.
    pub fn successes(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Slot::value)
    }

    pub fn into_successes(self) -> Vec<T> {
        self.slots
            .into_iter()
            .filter_map(|s| match s {
                Slot::Reused(v) | Slot::Completed(v) => Some(v),
                Slot::Failed(_) => None,
            })
            .collect()
    }
}

/// Concurrency-limited executor for per-item async work.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: String,
    max_workers: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            name: name.into(),
            max_workers,
            semaphore: Arc::new(Semaphore::new(max_workers)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `task(index, item)` for every item, at most `max_workers` at a
    /// time, and wait for all of them.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> PoolOutcome<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = WorkerResult<T>>,
    {
        self.run_items(items.into_iter().map(WorkItem::Todo).collect(), task)
            .await
    }

    /// Like [`WorkerPool::run`], but items already marked [`WorkItem::Done`]
    /// are passed through without running or waiting for a slot.
    pub async fn run_items<I, T, F, Fut>(&self, items: Vec<WorkItem<I, T>>, task: F) -> PoolOutcome<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = WorkerResult<T>>,
    {
        let started = Instant::now();
        let total = items.len();
        let task = &task;

        let futures = items.into_iter().enumerate().map(|(index, item)| {
            let semaphore = self.semaphore.clone();
            async move {
                match item {
                    WorkItem::Done(value) => Slot::Reused(value),
                    WorkItem::Todo(input) => {
                        let _permit = match semaphore.acquire().await {
                            Ok(permit) => permit,
                            Err(_) => {
                                return Slot::Failed(WorkerError::generation("worker pool closed"));
                            }
                        };
                        match AssertUnwindSafe(task(index, input)).catch_unwind().await {
                            Ok(Ok(value)) => Slot::Completed(value),
                            Ok(Err(e)) => Slot::Failed(e),
                            Err(panic) => Slot::Failed(WorkerError::generation(format!(
                                "task panicked: {}",
                                panic_message(&*panic)
                            ))),
                        }
                    }
                }
            }
        });

        let outcome = PoolOutcome {
            slots: join_all(futures).await,
        };

        let failed = outcome.failure_count();
        metrics::histogram!("reel_pool_duration_seconds", "pool" => self.name.clone())
            .record(started.elapsed().as_secs_f64());
        if failed > 0 {
            metrics::counter!("reel_pool_failures_total", "pool" => self.name.clone())
                .increment(failed as u64);
            warn!(
                pool = %self.name,
                total,
                failed,
                "Some work items failed; continuing with the rest"
            );
        } else {
            debug!(
                pool = %self.name,
                total,
                reused = outcome.reused_count(),
                "Work items finished"
            );
        }

        outcome
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
