use std::time::Duration;

use parking_lot::Mutex;

use crate::schedule::ReloadSchedule;
use crate::scheduler::{Job, ReloadScheduler, ScheduledHandle};

/// Keeps the reload job scheduled, and lets it be stopped and started again with the same schedule
pub(crate) struct Lifecycle {
    scheduler: ReloadScheduler,
    schedule: ReloadSchedule,
    job: Job,
    handle: Mutex<ScheduledHandle>,
}

impl Lifecycle {
    pub(crate) fn start(scheduler: ReloadScheduler, schedule: ReloadSchedule, job: Job) -> Self {
        let handle = scheduler.schedule_job(schedule.initial_delay(), schedule.period(), job.clone());

        Lifecycle {
            scheduler,
            schedule,
            job,
            handle: Mutex::new(handle),
        }
    }

    pub(crate) fn stop(&self) -> bool {
        let stopped = self.handle.lock().cancel();
        tracing::debug!(stopped, "stopping reloads");

        stopped
    }

    /// Cancel the current schedule, run `before_start`, then schedule the job again
    pub(crate) fn restart(&self, before_start: impl FnOnce()) {
        let mut handle = self.handle.lock();

        handle.cancel();
        before_start();

        *handle = self.scheduler.schedule_job(
            self.schedule.initial_delay(),
            self.schedule.period(),
            self.job.clone(),
        );

        tracing::debug!(active = handle.is_active(), "restarted reloads");
    }

    pub(crate) fn is_active(&self) -> bool {
        self.handle.lock().is_active()
    }

    pub(crate) fn remaining_ttl(&self) -> Option<Duration> {
        self.handle.lock().time_until_next_tick()
    }

    pub(crate) fn schedule(&self) -> &ReloadSchedule {
        &self.schedule
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.handle.get_mut().cancel();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::TimeUnit;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn lifecycle(count: &Arc<AtomicUsize>) -> Lifecycle {
        let job_count = count.clone();

        Lifecycle::start(
            ReloadScheduler::new().unwrap(),
            ReloadSchedule::new(0, 50, TimeUnit::Milliseconds).unwrap(),
            Arc::new(move || {
                job_count.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_stop_then_restart() {
        let count = Arc::new(AtomicUsize::new(0));
        let lifecycle = lifecycle(&count);

        thread::sleep(Duration::from_millis(120));
        assert!(lifecycle.is_active());
        assert!(lifecycle.stop());
        assert!(!lifecycle.stop());
        assert!(!lifecycle.is_active());
        assert_eq!(lifecycle.remaining_ttl(), None);

        // a tick already in flight is allowed to finish
        thread::sleep(Duration::from_millis(20));
        let stopped_at = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(150));
        assert_eq!(count.load(Ordering::SeqCst), stopped_at);

        let mut ran_before_start = false;
        lifecycle.restart(|| ran_before_start = true);
        assert!(ran_before_start);
        assert!(lifecycle.is_active());

        thread::sleep(Duration::from_millis(120));
        assert!(count.load(Ordering::SeqCst) > stopped_at);
    }

    #[test]
    fn test_drop_cancels_on_a_shared_scheduler() {
        let scheduler = ReloadScheduler::new().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let job_count = count.clone();

        let lifecycle = Lifecycle::start(
            scheduler.clone(),
            ReloadSchedule::new(100, 50, TimeUnit::Milliseconds).unwrap(),
            Arc::new(move || {
                job_count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        drop(lifecycle);

        thread::sleep(Duration::from_millis(200));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_shutdown());
    }
}
