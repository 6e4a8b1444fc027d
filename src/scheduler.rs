use std::cmp::Reverse;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex, MutexGuard};
use priority_queue::PriorityQueue;

use crate::error::panic_message;

pub(crate) type Job = Arc<dyn Fn() + Send + Sync>;

const ACTIVE: u8 = 0;
const CANCELLED: u8 = 1;
const TERMINATED: u8 = 2;

/// Far enough in the future to never fire, used when `now + delay` overflows an [`Instant`]
const NEVER: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 100);

/// A single worker thread that runs jobs with fixed-delay semantics
///
/// Clones share the same worker, so one scheduler can drive reloads for any number of caches.
/// All jobs run serially, a job that takes long delays every other job on the same scheduler.
///
/// The worker exits when [`ReloadScheduler::shutdown`] is called or the last clone is dropped,
/// at which point every handle still active is marked terminated.
#[derive(Clone)]
pub struct ReloadScheduler {
    shared: Arc<Shared>,
    _owner: Arc<Owner>,
}

struct Shared {
    queue: Mutex<Queue>,
    wakeup: Condvar,
}

struct Queue {
    next_id: u64,
    // max-heap, so deadlines are reversed to pop the earliest first
    pending: PriorityQueue<u64, Reverse<Instant>>,
    tasks: HashMap<u64, Task>,
    shutdown: bool,
}

struct Task {
    job: Job,
    period: Duration,
    status: Arc<TaskStatus>,
}

struct TaskStatus {
    state: AtomicU8,
    // `None` while the job is running
    next_tick: Mutex<Option<Instant>>,
    runs: AtomicU64,
}

/// Shuts the worker down once every [`ReloadScheduler`] clone is gone
struct Owner {
    shared: Arc<Shared>,
}

impl Drop for Owner {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl ReloadScheduler {
    pub fn new() -> std::io::Result<Self> {
        Self::with_name("reload-scheduler")
    }

    /// Spawn the worker thread under the given thread name
    pub fn with_name(name: impl Into<String>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                next_id: 0,
                pending: PriorityQueue::new(),
                tasks: HashMap::new(),
                shutdown: false,
            }),
            wakeup: Condvar::new(),
        });

        let worker = shared.clone();
        thread::Builder::new()
            .name(name.into())
            .spawn(move || worker.run())?;

        Ok(ReloadScheduler {
            _owner: Arc::new(Owner {
                shared: shared.clone(),
            }),
            shared,
        })
    }

    /// Run `job` after `initial_delay`, then again `period` after each run finishes, until the handle is cancelled
    pub fn schedule_with_fixed_delay<F>(
        &self,
        initial_delay: Duration,
        period: Duration,
        job: F,
    ) -> ScheduledHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule_job(initial_delay, period, Arc::new(job))
    }

    pub(crate) fn schedule_job(
        &self,
        initial_delay: Duration,
        period: Duration,
        job: Job,
    ) -> ScheduledHandle {
        let mut queue = self.shared.queue.lock();

        let id = queue.next_id;
        queue.next_id += 1;

        if queue.shutdown {
            tracing::trace!(id, "scheduling on a shut down scheduler");

            return ScheduledHandle {
                id,
                status: Arc::new(TaskStatus::new(TERMINATED, None)),
                shared: Weak::new(),
            };
        }

        let first = deadline_after(Instant::now(), initial_delay);
        let status = Arc::new(TaskStatus::new(ACTIVE, Some(first)));

        queue.tasks.insert(
            id,
            Task {
                job,
                period,
                status: status.clone(),
            },
        );
        queue.pending.push(id, Reverse(first));
        drop(queue);

        self.shared.wakeup.notify_one();
        tracing::trace!(id, ?initial_delay, ?period, "scheduled job");

        ScheduledHandle {
            id,
            status,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Stop the worker, jobs that have not started yet never run
    ///
    /// A job already running is allowed to finish.
    pub fn shutdown(&self) {
        self.shared.shutdown();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.queue.lock().shutdown
    }
}

impl std::fmt::Debug for ReloadScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.shared.queue.lock();

        f.debug_struct("ReloadScheduler")
            .field("tasks", &queue.tasks.len())
            .field("shutdown", &queue.shutdown)
            .finish()
    }
}

impl Shared {
    fn shutdown(&self) {
        let mut queue = self.queue.lock();
        if !queue.shutdown {
            queue.shutdown = true;
            tracing::trace!("reload scheduler shutting down");
        }
        drop(queue);

        self.wakeup.notify_all();
    }

    fn run(&self) {
        let mut queue = self.queue.lock();

        loop {
            if queue.shutdown {
                queue.terminate_all();
                return;
            }

            let next = queue.pending.peek().map(|(id, Reverse(at))| (*id, *at));

            match next {
                None => self.wakeup.wait(&mut queue),
                Some((_, at)) if at > Instant::now() => {
                    self.wakeup.wait_until(&mut queue, at);
                }
                Some((id, _)) => {
                    queue.pending.pop();
                    self.tick(&mut queue, id);
                }
            }
        }
    }

    fn tick(&self, queue: &mut MutexGuard<'_, Queue>, id: u64) {
        let Some(task) = queue.tasks.get(&id) else {
            return;
        };

        let job = task.job.clone();
        let period = task.period;
        let status = task.status.clone();

        *status.next_tick.lock() = None;

        MutexGuard::unlocked(queue, || {
            tracing::trace!(id, "running scheduled job");

            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| job())) {
                tracing::error!(id, panic = %panic_message(&*payload), "scheduled job panicked");
            }

            status.runs.fetch_add(1, Ordering::AcqRel);
        });

        if status.is_active() && !queue.shutdown {
            let at = deadline_after(Instant::now(), period);
            *status.next_tick.lock() = Some(at);
            queue.pending.push(id, Reverse(at));
        } else {
            // only still active here when the scheduler shut down mid run
            status.transition(TERMINATED);
            queue.tasks.remove(&id);
        }
    }

    fn cancel(&self, id: u64) {
        let mut queue = self.queue.lock();

        queue.pending.remove(&id);
        queue.tasks.remove(&id);
    }
}

impl Queue {
    fn terminate_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.status.transition(TERMINATED);
        }

        self.pending.clear();
    }
}

impl TaskStatus {
    fn new(state: u8, next_tick: Option<Instant>) -> Self {
        TaskStatus {
            state: AtomicU8::new(state),
            next_tick: Mutex::new(next_tick),
            runs: AtomicU64::new(0),
        }
    }

    fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }

    /// Move from active to `to`, returns false if the task was already inactive
    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(ACTIVE, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// A cancellable reference to a job scheduled on a [`ReloadScheduler`]
pub struct ScheduledHandle {
    id: u64,
    status: Arc<TaskStatus>,
    shared: Weak<Shared>,
}

impl ScheduledHandle {
    /// Prevent any future runs of the job, a run in progress is not interrupted
    ///
    /// Returns true only if this call is the one that cancelled the job.
    pub fn cancel(&self) -> bool {
        if !self.status.transition(CANCELLED) {
            return false;
        }

        if let Some(shared) = self.shared.upgrade() {
            shared.cancel(self.id);
        }

        tracing::trace!(id = self.id, "cancelled scheduled job");

        true
    }

    /// Neither cancelled nor terminated
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.state.load(Ordering::Acquire) == CANCELLED
    }

    /// The scheduler shut down while the job was still active
    pub fn is_terminated(&self) -> bool {
        self.status.state.load(Ordering::Acquire) == TERMINATED
    }

    /// Time left before the next run, zero while a run is in progress or overdue
    ///
    /// `None` if the job will not run again.
    pub fn time_until_next_tick(&self) -> Option<Duration> {
        if !self.is_active() {
            return None;
        }

        match *self.status.next_tick.lock() {
            Some(at) => Some(at.saturating_duration_since(Instant::now())),
            None => Some(Duration::ZERO),
        }
    }

    /// How many times the job has finished running, panicked runs included
    pub fn runs(&self) -> u64 {
        self.status.runs.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ScheduledHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("runs", &self.runs())
            .finish()
    }
}

fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(NEVER))
        .unwrap_or(now)
}
