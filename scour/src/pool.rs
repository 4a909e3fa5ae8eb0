//! A bounded worker pool draining an unbounded FIFO job queue.
//!
//! Jobs may enqueue further jobs while running, which is what the
//! folder-to-file fan-out of a scan does, so the pool's drain condition is
//! quiescence: the queue is empty *and* no worker is mid-job. A worker
//! finishing a job always re-checks the queue before sleeping, because the
//! job it just ran may have enqueued children.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use tracing::{debug, error};

use crate::errors::ScourError;

/// One unit of dispatchable work; receives the affinity (worker index) it
/// ends up running on.
pub type Job = Box<dyn FnOnce(usize) + Send + 'static>;

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Job>,
    active: usize,
}

#[derive(Default)]
struct PoolInner {
    state: Mutex<PoolState>,
    work_available: Condvar,
}

impl PoolInner {
    fn enqueue(&self, job: Job) {
        let mut state = self.state.lock().expect("pool lock poisoned");
        state.queue.push_back(job);
        drop(state);
        self.work_available.notify_one();
    }
}

/// Cloneable handle for enqueueing work, usable from inside running jobs.
/// Enqueueing never blocks.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<PoolInner>,
}

impl JobHandle {
    pub fn enqueue(&self, job: impl FnOnce(usize) + Send + 'static) {
        self.inner.enqueue(Box::new(job));
    }
}

/// A fixed set of workers draining a FIFO job queue until quiescence.
///
/// With `threaded` false there is exactly one worker and
/// [`dispatch`](Self::dispatch) runs the queue synchronously in FIFO
/// order on the calling thread, which makes output deterministic. The
/// pool is consumed by `dispatch` and is not reusable.
pub struct JobPool {
    inner: Arc<PoolInner>,
    workers: usize,
    threaded: bool,
}

impl JobPool {
    /// A pool sized to the host's parallelism (one worker when not
    /// threaded).
    pub fn new(threaded: bool) -> Self {
        Self::sized(threaded, num_cpus::get().max(1))
    }

    /// A pool with an explicit worker count; ignored when not threaded.
    pub fn sized(threaded: bool, workers: usize) -> Self {
        let workers = if threaded { workers.max(1) } else { 1 };
        Self {
            inner: Arc::new(PoolInner::default()),
            workers,
            threaded,
        }
    }

    /// Number of workers this pool runs.
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            inner: self.inner.clone(),
        }
    }

    pub fn enqueue(&self, job: impl FnOnce(usize) + Send + 'static) {
        self.inner.enqueue(Box::new(job));
    }

    /// Drains the queue, blocking until every job has run, including
    /// jobs that running jobs enqueued.
    pub fn dispatch(self) {
        if !self.threaded {
            self.dispatch_sync();
            return;
        }

        debug!("Dispatching job pool with {} workers", self.workers);
        let handles: Vec<_> = (0..self.workers)
            .map(|affinity| {
                let inner = self.inner.clone();
                thread::spawn(move || worker_loop(&inner, affinity))
            })
            .collect();

        for handle in handles {
            // A panicking worker loop would be a pool bug; job panics are
            // already contained inside run_job.
            let _ = handle.join();
        }
    }

    /// In-order synchronous drain; jobs still may enqueue children.
    fn dispatch_sync(&self) {
        loop {
            let job = {
                let mut state = self.inner.state.lock().expect("pool lock poisoned");
                state.queue.pop_front()
            };
            match job {
                Some(job) => {
                    run_job(job, 0);
                }
                None => break,
            }
        }
    }
}

fn worker_loop(inner: &PoolInner, affinity: usize) {
    loop {
        let job = {
            let mut state = inner.state.lock().expect("pool lock poisoned");
            loop {
                if let Some(job) = state.queue.pop_front() {
                    state.active += 1;
                    break Some(job);
                }
                if state.active == 0 {
                    // Quiescent: nothing queued, nobody who could enqueue
                    break None;
                }
                state = inner
                    .work_available
                    .wait(state)
                    .expect("pool lock poisoned");
            }
        };

        let Some(job) = job else {
            inner.work_available.notify_all();
            return;
        };

        run_job(job, affinity);

        let mut state = inner.state.lock().expect("pool lock poisoned");
        state.active -= 1;
        let quiescent = state.active == 0 && state.queue.is_empty();
        drop(state);
        if quiescent {
            inner.work_available.notify_all();
        }
    }
}

/// Runs one job, containing any panic so the rest of the queue drains.
/// Returns the contained error, if the job panicked.
fn run_job(job: Job, affinity: usize) -> Option<ScourError> {
    match catch_unwind(AssertUnwindSafe(|| job(affinity))) {
        Ok(()) => None,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let err = ScourError::job_panic(format!("worker {affinity}: {message}"));
            error!("{}", err);
            Some(err)
        }
    }
}
