//! Background work with main-thread completion delivery.
//!
//! Each scheduled computation runs on its own short-lived worker thread. The
//! finished result is bound to its callback and pushed onto a mutex-guarded
//! queue; [`Dispatcher::drain`] later runs the queued callbacks on the calling
//! thread, in the order the workers finished.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, warn};

/// Identifier handed out by [`Dispatcher::schedule`], also used in worker thread names.
pub type JobId = u64;

/// Failure of a scheduled computation, delivered to its callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkError {
    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Failure to start a computation at all.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

type Completion<C> = Box<dyn FnOnce(&mut C) + Send>;

struct Shared<C> {
    queue: Mutex<VecDeque<Completion<C>>>,
    in_flight: AtomicUsize,
    next_job: AtomicU64,
}

impl<C> Shared<C> {
    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<Completion<C>>> {
        // A callback never runs under the lock, so a poisoned queue is still consistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle to a completion queue whose callbacks receive `&mut C`.
pub struct Dispatcher<C> {
    shared: Arc<Shared<C>>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: 'static> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.pending())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl<C> Dispatcher<C> {
    /// Completions waiting for the next [`Dispatcher::drain`].
    pub fn pending(&self) -> usize {
        self.shared.lock_queue().len()
    }

    /// Workers that have not yet queued their completion.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// True when nothing is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.in_flight() == 0 && self.pending() == 0
    }
}

impl<C: 'static> Dispatcher<C> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                in_flight: AtomicUsize::new(0),
                next_job: AtomicU64::new(0),
            }),
        }
    }

    /// Run `work` on a new worker thread and queue `callback` with its result.
    ///
    /// A panic inside `work` is caught and delivered as
    /// [`WorkError::Panicked`]. The callback only runs during [`Dispatcher::drain`].
    pub fn schedule<T, W, F>(&self, work: W, callback: F) -> Result<JobId, DispatchError>
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        F: FnOnce(&mut C, Result<T, WorkError>) + Send + 'static,
    {
        let job = self.shared.next_job.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.shared);
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);

        let spawned = thread::Builder::new()
            .name(format!("vista-worker-{job}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(work))
                    .map_err(|payload| WorkError::Panicked(panic_message(payload.as_ref())));
                if let Err(err) = &result {
                    warn!(job, %err, "work failed");
                }
                let completion: Completion<C> = Box::new(move |ctx: &mut C| callback(ctx, result));
                shared.lock_queue().push_back(completion);
                // Decrement after queueing so `is_idle` never reports a gap.
                shared.in_flight.fetch_sub(1, Ordering::AcqRel);
            });

        match spawned {
            Ok(_) => {
                debug!(job, "work scheduled");
                Ok(job)
            }
            Err(err) => {
                self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
                Err(DispatchError::Spawn(err))
            }
        }
    }

    /// Run every queued callback against `ctx`, oldest first.
    ///
    /// The queue is swapped out under the lock and the callbacks run without
    /// it, so callbacks may schedule more work; that work is delivered by a
    /// later drain. Returns the number of callbacks run.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let batch = std::mem::take(&mut *self.shared.lock_queue());
        let count = batch.len();
        for completion in batch {
            completion(ctx);
        }
        count
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
