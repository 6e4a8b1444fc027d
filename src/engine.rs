use std::hash::{BuildHasher, Hash};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::{ArcSwap, Guard};
use hashbrown::hash_map::DefaultHashBuilder;

use crate::error::{panic_message, ReloadError};
use crate::loader::Loader;
use crate::snapshot::Snapshot;

/// What a reload does when the loader reports that it has no new data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoDataPolicy {
    /// Keep serving the current snapshot and report success
    #[default]
    Retain,
    /// Keep serving the current snapshot but report [`ReloadError::NoData`]
    Reject,
}

/// How a single call to [`SwapEngine::reload`] ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new snapshot with this many entries is now visible
    Published(usize),
    /// The loader had no new data, the old snapshot is still visible
    Unchanged,
    /// The error was handed to the loader, the old snapshot is still visible
    Failed,
}

/// Owns the currently visible [`Snapshot`] and replaces it as a whole
///
/// Readers only ever load the current `Arc`, a reload builds the next snapshot off to the side
/// and publishes it with a single atomic store.
pub struct SwapEngine<K, V, S = DefaultHashBuilder> {
    current: ArcSwap<Snapshot<K, V, S>>,
    // millis since the unix epoch of the last publish, 0 if never
    last_updated: AtomicU64,
    build_hasher: S,
    immutable: bool,
    no_data: NoDataPolicy,
}

impl<K, V, S> SwapEngine<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    pub fn new(build_hasher: S, immutable: bool, no_data: NoDataPolicy) -> Self {
        SwapEngine {
            current: ArcSwap::from_pointee(Snapshot::empty(build_hasher.clone())),
            last_updated: AtomicU64::new(0),
            build_hasher,
            immutable,
            no_data,
        }
    }

    /// Load the loader's data into a fresh snapshot and publish it
    ///
    /// Never panics because of the loader and never returns an error, failures go to [`Loader::on_error`].
    pub fn reload<L>(&self, loader: &L) -> ReloadOutcome
    where
        L: Loader<K, V>,
    {
        let built = catch_unwind(AssertUnwindSafe(|| self.build(loader)))
            .unwrap_or_else(|payload| Err(ReloadError::Panicked(panic_message(&*payload))));

        match built {
            Ok(Some(snapshot)) => {
                let entries = snapshot.len();

                self.current.store(Arc::new(snapshot));
                self.touch();

                tracing::debug!(entries, "published new snapshot");
                loader.on_load_complete();

                ReloadOutcome::Published(entries)
            }
            Ok(None) => {
                tracing::debug!("loader had no new data, keeping the current snapshot");
                loader.on_load_complete();

                ReloadOutcome::Unchanged
            }
            Err(error) => {
                tracing::warn!(%error, "reload failed, keeping the current snapshot");
                loader.on_error(error);

                ReloadOutcome::Failed
            }
        }
    }

    fn build<L>(&self, loader: &L) -> Result<Option<Snapshot<K, V, S>>, ReloadError>
    where
        L: Loader<K, V>,
    {
        let data = match loader.load() {
            Ok(Some(data)) => data,
            Ok(None) => {
                return match self.no_data {
                    NoDataPolicy::Retain => Ok(None),
                    NoDataPolicy::Reject => Err(ReloadError::NoData),
                }
            }
            Err(err) => return Err(ReloadError::Load(err.into())),
        };

        let mut snapshot = Snapshot::collect_from(data, self.build_hasher.clone());
        if self.immutable {
            snapshot.shrink_to_fit();
        }

        Ok(Some(snapshot))
    }

    /// Publish an empty snapshot, the last updated time is left alone
    pub fn clear(&self) {
        self.current
            .store(Arc::new(Snapshot::empty(self.build_hasher.clone())));
    }
}

impl<K, V, S> SwapEngine<K, V, S> {
    /// A cheap, short lived view of the current snapshot
    #[inline]
    pub fn load(&self) -> Guard<Arc<Snapshot<K, V, S>>> {
        self.current.load()
    }

    /// The current snapshot, safe to hold onto across reloads
    #[inline]
    pub fn snapshot(&self) -> Arc<Snapshot<K, V, S>> {
        self.current.load_full()
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Wall clock time of the last successful publish, `None` if nothing has been loaded yet
    pub fn last_updated(&self) -> Option<SystemTime> {
        match self.last_updated.load(Ordering::Acquire) {
            0 => None,
            millis => Some(UNIX_EPOCH + Duration::from_millis(millis)),
        }
    }

    // strictly increasing even if two publishes land in the same millisecond
    fn touch(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let _ = self
            .last_updated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            });
    }
}

impl<K, V, S> SwapEngine<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Replace the current snapshot with an edited copy of it
    ///
    /// If a reload publishes while `f` runs, `f` is retried against the newly published snapshot.
    pub(crate) fn edit<F, R>(&self, mut f: F) -> R
    where
        F: FnMut(&mut Snapshot<K, V, S>) -> R,
    {
        let mut current = self.current.load();

        loop {
            let mut next = Snapshot::clone(&current);
            let out = f(&mut next);

            let prev = self.current.compare_and_swap(&*current, Arc::new(next));
            if Arc::ptr_eq(&*prev, &*current) {
                return out;
            }

            current = prev;
        }
    }
}
