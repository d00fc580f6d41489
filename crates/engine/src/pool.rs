// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded, reconfigurable worker pool
//!
//! Each pool generation is a fixed set of OS threads pulling jobs from one
//! MPMC queue. Reconfiguring starts a new generation for future submissions
//! and closes the old generation's queue: its workers finish what is running
//! and queued, then exit on their own. Nothing running is interrupted.
//!
//! `shutdown_now` closes every queue and asks every unfinished job to cancel.
//! Jobs observe cancellation at their own checkpoints.

use crate::error::EngineError;
use crossbeam_channel::{Receiver, Sender};
use dashmap::DashMap;
use rulerun_core::config::{MAX_WORKERS, MIN_WORKERS};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;

/// A cancellable unit of work run by the pool
pub trait Job: Send + Sync + 'static {
    /// Unique among jobs submitted to one pool
    fn id(&self) -> &str;

    fn run(&self);

    /// Request cooperative cancellation. Returns whether the request was
    /// accepted.
    fn cancel(&self) -> bool;
}

type Jobs = Arc<DashMap<String, Arc<dyn Job>>>;

/// One set of worker threads sharing a queue
struct Generation {
    number: u64,
    size: usize,
    sender: Mutex<Option<Sender<Arc<dyn Job>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    live: Arc<AtomicUsize>,
}

impl Generation {
    fn spawn(number: u64, size: usize, jobs: &Jobs) -> Result<Self, EngineError> {
        let (sender, receiver) = crossbeam_channel::unbounded::<Arc<dyn Job>>();
        let live = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(size);

        for index in 0..size {
            let thread = format!("rulerun-worker-{}-{}", number, index);
            let receiver = receiver.clone();
            let jobs = Arc::clone(jobs);
            let counter = Arc::clone(&live);
            counter.fetch_add(1, Ordering::SeqCst);
            let spawned = std::thread::Builder::new()
                .name(thread.clone())
                .spawn(move || worker_loop(number, index, receiver, jobs, counter));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    live.fetch_sub(1, Ordering::SeqCst);
                    // Dropping the sender lets already spawned workers exit.
                    drop(sender);
                    return Err(EngineError::ThreadSpawn { thread, source });
                }
            }
        }

        Ok(Self {
            number,
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            live,
        })
    }

    fn send(&self, job: Arc<dyn Job>) -> Result<(), EngineError> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| EngineError::PoolShutDown),
            None => Err(EngineError::PoolShutDown),
        }
    }

    /// Stop accepting jobs; workers exit once the queue drains
    fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    fn is_drained(&self) -> bool {
        self.live.load(Ordering::SeqCst) == 0
    }

    fn join(&self) {
        let workers: Vec<JoinHandle<()>> =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!(generation = self.number, "worker thread panicked");
            }
        }
    }
}

fn worker_loop(
    generation: u64,
    index: usize,
    receiver: Receiver<Arc<dyn Job>>,
    jobs: Jobs,
    live: Arc<AtomicUsize>,
) {
    tracing::trace!(generation, worker = index, "worker started");
    for job in receiver.iter() {
        if panic::catch_unwind(AssertUnwindSafe(|| job.run())).is_err() {
            tracing::error!(generation, worker = index, job = job.id(), "job panicked");
        }
        jobs.remove(job.id());
    }
    live.fetch_sub(1, Ordering::SeqCst);
    tracing::debug!(generation, worker = index, "worker exiting");
}

/// Thread pool that runs submitted jobs on a bounded number of threads
pub struct WorkerPool {
    current: RwLock<Arc<Generation>>,
    retired: Mutex<Vec<Arc<Generation>>>,
    jobs: Jobs,
    next_generation: AtomicU64,
    shut_down: AtomicBool,
}

impl WorkerPool {
    /// Start a pool with `size` workers, clamped to the supported range
    pub fn new(size: usize) -> Result<Self, EngineError> {
        let jobs: Jobs = Arc::new(DashMap::new());
        let size = size.clamp(MIN_WORKERS, MAX_WORKERS);
        let first = Generation::spawn(1, size, &jobs)?;
        tracing::info!(generation = 1, size, "worker pool started");

        Ok(Self {
            current: RwLock::new(Arc::new(first)),
            retired: Mutex::new(Vec::new()),
            jobs,
            next_generation: AtomicU64::new(2),
            shut_down: AtomicBool::new(false),
        })
    }

    fn current(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Queue a job on the current generation
    pub fn submit(&self, job: Arc<dyn Job>) -> Result<(), EngineError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::PoolShutDown);
        }

        let id = job.id().to_string();
        self.jobs.insert(id.clone(), Arc::clone(&job));
        // Held across the send: `reconfigure` swaps generations under the
        // write lock before closing the old queue.
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = current.send(job) {
            drop(current);
            self.jobs.remove(&id);
            return Err(e);
        }
        Ok(())
    }

    /// Redirect future submissions to a new generation of `size` workers.
    ///
    /// The previous generation drains and exits without interruption.
    /// Returns false when the size is unchanged.
    pub fn reconfigure(&self, size: usize) -> Result<bool, EngineError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EngineError::PoolShutDown);
        }
        let size = size.clamp(MIN_WORKERS, MAX_WORKERS);

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if current.size == size {
            return Ok(false);
        }

        let number = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let next = Arc::new(Generation::spawn(number, size, &self.jobs)?);
        let previous = std::mem::replace(&mut *current, next);
        drop(current);

        previous.close();
        tracing::info!(
            generation = number,
            size,
            previous_generation = previous.number,
            previous_size = previous.size,
            "worker pool reconfigured, previous generation draining"
        );

        let mut retired = self.retired.lock().unwrap_or_else(|e| e.into_inner());
        retired.retain(|g| !g.is_drained());
        retired.push(previous);
        Ok(true)
    }

    /// Close every queue and ask every unfinished job to cancel.
    /// Returns how many jobs accepted the request. Does not wait.
    pub fn shutdown_now(&self) -> usize {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return 0;
        }

        self.current().close();
        for generation in self.retired.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            generation.close();
        }

        let cancelled = self
            .jobs
            .iter()
            .filter(|job| job.value().cancel())
            .count();
        tracing::info!(cancelled, "worker pool shut down");
        cancelled
    }

    /// Wait for every worker thread of every generation to exit.
    /// Only returns once queues are closed, i.e. after `shutdown_now`.
    pub fn join(&self) {
        self.current().join();
        let retired: Vec<Arc<Generation>> =
            std::mem::take(&mut *self.retired.lock().unwrap_or_else(|e| e.into_inner()));
        for generation in retired {
            generation.join();
        }
    }

    /// Worker count of the current generation
    pub fn size(&self) -> usize {
        self.current().size
    }

    /// Number of the current generation, starting at 1
    pub fn generation(&self) -> u64 {
        self.current().number
    }

    /// Jobs submitted and not yet finished, across all generations
    pub fn in_flight(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Let workers drain queued jobs and exit; do not block the dropper.
        self.current().close();
        for generation in self.retired.lock().unwrap_or_else(|e| e.into_inner()).iter() {
            generation.close();
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
