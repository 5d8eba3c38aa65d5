//! Decode thread pool for preload jobs.
//!
//! Work-stealing deques (crossbeam) with caller-owned run epochs:
//! - Jobs are pushed to a global injector, workers drain it and steal from each other
//! - Every job is tagged with the preload run that issued it and checked
//!   against the epoch counter of whoever queued it
//! - When that run is superseded the counter moves on and queued jobs are skipped
//! - Several loaders can share one pool: each owns its counter
//!
//! Results never touch UI state from here: jobs settle a `Completion` which
//! forwards the outcome over a channel to the owning thread.

use crossbeam::deque::{Injector, Steal, Stealer, Worker};
use log::trace;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool of decode threads, shareable between loaders.
///
/// # Example
/// ```ignore
/// let workers = Workers::new(Workers::default_threads());
/// let epoch = Arc::new(AtomicU64::new(run));
/// workers.execute_with_epoch(&epoch, run, move || {
///     completion.settle(decode_file(&url));
/// });
/// ```
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Workers {
    /// Threads to use when nothing else is configured: 3/4 of the cores, at least one.
    pub fn default_threads() -> usize {
        (num_cpus::get() * 3 / 4).max(1)
    }

    /// Spawn `num_threads` decode workers.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = locals.iter().map(Worker::stealer).collect();

        let mut handles = Vec::with_capacity(num_threads);
        for (worker_id, local) in locals.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let spawned = thread::Builder::new()
                .name(format!("flipbook-decode-{}", worker_id))
                .spawn(move || {
                    trace!("Decode worker {} started", worker_id);
                    // Queued jobs are abandoned on shutdown
                    while !shutdown.load(Ordering::Relaxed) {
                        match next_job(&local, &injector, &stealers) {
                            Some(job) => job(),
                            None => thread::sleep(Duration::from_millis(1)),
                        }
                    }
                    trace!("Decode worker {} stopped", worker_id);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => log::error!("Failed to spawn decode worker {}: {}", worker_id, e),
            }
        }

        trace!("Workers initialized: {} threads", handles.len());

        Self {
            injector,
            handles,
            shutdown,
        }
    }

    /// Number of running worker threads.
    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Run `f` on a worker thread.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.injector.push(Box::new(f));
    }

    /// Run `f` on a worker thread unless `current` no longer equals `epoch`
    /// by the time a worker picks the job up.
    pub fn execute_with_epoch<F>(&self, current: &Arc<AtomicU64>, epoch: u64, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let current = Arc::clone(current);
        self.injector.push(Box::new(move || {
            if current.load(Ordering::Relaxed) == epoch {
                f();
            } else {
                trace!("Skipping stale decode job (epoch {})", epoch);
            }
        }));
    }
}

fn next_job(local: &Worker<Job>, injector: &Injector<Job>, stealers: &[Stealer<Job>]) -> Option<Job> {
    if let Some(job) = local.pop() {
        return Some(job);
    }
    loop {
        match injector.steal_batch_and_pop(local) {
            Steal::Success(job) => return Some(job),
            Steal::Retry => continue,
            Steal::Empty => break,
        }
    }
    stealers.iter().find_map(|s| s.steal().success())
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        let deadline = Instant::now() + Duration::from_millis(500);
        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, detaching remaining workers");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped", num_threads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_execute_runs_job() {
        let workers = Workers::new(2);
        let (tx, rx) = unbounded();
        workers.execute(move || {
            let _ = tx.send(7);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
    }

    #[test]
    fn test_stale_epoch_is_skipped() {
        let workers = Workers::new(1);
        let epoch = Arc::new(AtomicU64::new(3));
        let (tx, rx) = unbounded();

        let stale = tx.clone();
        workers.execute_with_epoch(&epoch, 2, move || {
            let _ = stale.send("stale");
        });
        workers.execute_with_epoch(&epoch, 3, move || {
            let _ = tx.send("current");
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok("current"));
        // Both senders are gone once the jobs ran or were skipped
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn test_epochs_are_independent() {
        let workers = Workers::new(1);
        let ahead = Arc::new(AtomicU64::new(7));
        let behind = Arc::new(AtomicU64::new(1));
        let (tx, rx) = unbounded();

        let first = tx.clone();
        workers.execute_with_epoch(&ahead, 7, move || {
            let _ = first.send("ahead");
        });
        workers.execute_with_epoch(&behind, 1, move || {
            let _ = tx.send("behind");
        });

        let mut got = vec![
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        got.sort();
        assert_eq!(got, vec!["ahead", "behind"]);
    }
}
