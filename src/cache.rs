use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hashbrown::hash_map::DefaultHashBuilder;

use crate::builder::CacheBuilder;
use crate::engine::SwapEngine;
use crate::error::ImmutableCacheError;
use crate::lifecycle::Lifecycle;
use crate::loader::Loader;
use crate::schedule::ReloadSchedule;
use crate::scheduler::{Job, ReloadScheduler};
use crate::snapshot::Snapshot;

/// A map that replaces its whole contents with fresh data from a [`Loader`] on a fixed schedule
///
/// Every read goes to whatever snapshot is current at the time of the call and never waits on a reload.
/// Two reads in a row can see different snapshots if a reload lands between them,
/// use [`ReloadCache::snapshot`] when several reads need to agree.
///
/// Writes are rejected in immutable mode. In mutable mode they edit the current snapshot
/// and only last until the next reload replaces it.
pub struct ReloadCache<K, V, L, S = DefaultHashBuilder> {
    engine: Arc<SwapEngine<K, V, S>>,
    loader: Arc<L>,
    lifecycle: Lifecycle,
}

impl<K, V, L> ReloadCache<K, V, L> {
    pub fn builder() -> CacheBuilder<K, V, L> {
        CacheBuilder::new()
    }
}

impl<K, V, L, S> ReloadCache<K, V, L, S>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
    L: Loader<K, V>,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub(crate) fn start(
        engine: SwapEngine<K, V, S>,
        loader: L,
        schedule: ReloadSchedule,
        scheduler: ReloadScheduler,
    ) -> Self {
        let engine = Arc::new(engine);
        let loader = Arc::new(loader);

        let job: Job = {
            let engine = engine.clone();
            let loader = loader.clone();

            Arc::new(move || {
                engine.reload(&*loader);
            })
        };

        ReloadCache {
            lifecycle: Lifecycle::start(scheduler, schedule, job),
            engine,
            loader,
        }
    }

    /// Cancel the schedule, optionally empty the cache, and schedule reloads again from the start
    ///
    /// With `drop_existing_immediately` readers see an empty cache until the next successful reload,
    /// otherwise the current contents stay visible until then.
    pub fn restart(&self, drop_existing_immediately: bool) {
        self.lifecycle.restart(|| {
            if drop_existing_immediately {
                self.engine.clear();
            }
        });
    }
}

impl<K, V, L, S> ReloadCache<K, V, L, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// A clone of the value currently cached for `key`
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.engine.load().get(key).cloned()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.engine.load().contains_key(key)
    }
}

impl<K, V, L, S> ReloadCache<K, V, L, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Insert into the current snapshot, returning the value it replaced
    ///
    /// The entry is gone again after the next reload.
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>, ImmutableCacheError> {
        self.check_mutable("insert")?;

        Ok(self
            .engine
            .edit(|snapshot| snapshot.insert(key.clone(), value.clone())))
    }

    pub fn remove<Q>(&self, key: &Q) -> Result<Option<V>, ImmutableCacheError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.check_mutable("remove")?;

        Ok(self.engine.edit(|snapshot| snapshot.remove(key)))
    }

    pub fn clear(&self) -> Result<(), ImmutableCacheError> {
        self.check_mutable("clear")?;

        self.engine.clear();
        Ok(())
    }
}

impl<K, V, L, S> ReloadCache<K, V, L, S> {
    fn check_mutable(&self, operation: &'static str) -> Result<(), ImmutableCacheError> {
        if self.engine.is_immutable() {
            return Err(ImmutableCacheError { operation });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.engine.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engine.load().is_empty()
    }

    /// The current snapshot, unaffected by later reloads or writes
    pub fn snapshot(&self) -> Arc<Snapshot<K, V, S>> {
        self.engine.snapshot()
    }

    pub fn is_immutable(&self) -> bool {
        self.engine.is_immutable()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn schedule(&self) -> &ReloadSchedule {
        self.lifecycle.schedule()
    }

    /// Stop future reloads, a reload already running still publishes
    ///
    /// Returns false if reloads were already stopped.
    pub fn stop(&self) -> bool {
        self.lifecycle.stop()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Time until the next reload starts, `None` if no reload is scheduled
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.lifecycle.remaining_ttl()
    }

    /// When a reload last published a snapshot, `None` if none ever has
    pub fn last_updated(&self) -> Option<SystemTime> {
        self.engine.last_updated()
    }
}

impl<K, V, L, S> std::fmt::Debug for ReloadCache<K, V, L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCache")
            .field("len", &self.len())
            .field("immutable", &self.is_immutable())
            .field("active", &self.is_active())
            .field("last_updated", &self.last_updated())
            .finish()
    }
}
