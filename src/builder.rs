use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use hashbrown::hash_map::DefaultHashBuilder;

use crate::cache::ReloadCache;
use crate::engine::{NoDataPolicy, SwapEngine};
use crate::error::BuildError;
use crate::loader::Loader;
use crate::schedule::{ReloadSchedule, TimeUnit};
use crate::scheduler::ReloadScheduler;

/// Assembles a [`ReloadCache`], nothing is validated until [`CacheBuilder::build`]
pub struct CacheBuilder<K, V, L, S = DefaultHashBuilder> {
    immutable: bool,
    initial_load_delay: i64,
    ttl: i64,
    time_unit: TimeUnit,
    scheduler: Option<ReloadScheduler>,
    no_data: NoDataPolicy,
    build_hasher: S,
    loader: Option<L>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, L> CacheBuilder<K, V, L> {
    pub fn new() -> Self {
        CacheBuilder {
            immutable: false,
            initial_load_delay: 0,
            ttl: 0,
            time_unit: TimeUnit::default(),
            scheduler: None,
            no_data: NoDataPolicy::default(),
            build_hasher: DefaultHashBuilder::default(),
            loader: None,
            _marker: PhantomData,
        }
    }
}

impl<K, V, L> Default for CacheBuilder<K, V, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, L, S> CacheBuilder<K, V, L, S> {
    /// Reject every write through the cache, snapshots are only ever replaced by reloads
    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }

    /// Time in [`CacheBuilder::time_unit`] units before the first load, defaults to 0
    pub fn initial_load_delay(mut self, initial_load_delay: i64) -> Self {
        self.initial_load_delay = initial_load_delay;
        self
    }

    /// Time in [`CacheBuilder::time_unit`] units between the end of one load and the start of the next
    ///
    /// Required, must be positive.
    pub fn ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    /// Defaults to [`TimeUnit::Milliseconds`]
    pub fn time_unit(mut self, time_unit: TimeUnit) -> Self {
        self.time_unit = time_unit;
        self
    }

    /// Run reloads on an existing scheduler instead of spawning a thread for this cache
    pub fn scheduler(mut self, scheduler: ReloadScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn no_data(mut self, no_data: NoDataPolicy) -> Self {
        self.no_data = no_data;
        self
    }

    pub fn loader(mut self, loader: L) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn hasher<S2>(self, build_hasher: S2) -> CacheBuilder<K, V, L, S2> {
        CacheBuilder {
            immutable: self.immutable,
            initial_load_delay: self.initial_load_delay,
            ttl: self.ttl,
            time_unit: self.time_unit,
            scheduler: self.scheduler,
            no_data: self.no_data,
            build_hasher,
            loader: self.loader,
            _marker: PhantomData,
        }
    }
}

impl<K, V, L, S> CacheBuilder<K, V, L, S>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
    L: Loader<K, V>,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    /// Validate the configuration and schedule the first load
    ///
    /// # Errors
    /// - [`BuildError::MissingLoader`] if no loader was set
    /// - [`BuildError::NonPositiveTtl`] if the ttl is not positive
    /// - [`BuildError::NegativeDelay`] if the initial delay is negative
    /// - [`BuildError::Spawn`] if no scheduler was given and its thread could not be spawned
    pub fn build(self) -> Result<ReloadCache<K, V, L, S>, BuildError> {
        let loader = self.loader.ok_or(BuildError::MissingLoader)?;
        let schedule = ReloadSchedule::new(self.initial_load_delay, self.ttl, self.time_unit)?;

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => ReloadScheduler::new().map_err(BuildError::Spawn)?,
        };

        let engine = SwapEngine::new(self.build_hasher, self.immutable, self.no_data);

        tracing::debug!(?schedule, immutable = self.immutable, "starting reload cache");

        Ok(ReloadCache::start(engine, loader, schedule, scheduler))
    }

    pub fn build_with(self, loader: L) -> Result<ReloadCache<K, V, L, S>, BuildError> {
        self.loader(loader).build()
    }
}
