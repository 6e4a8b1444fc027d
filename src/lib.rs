//! A concurrent key-value cache that reloads its whole contents on a fixed schedule.
//!
//! # Quick Start
//! Implement [`Loader`] (or pass a closure) and build a [`ReloadCache`]:
//!
//! ```no_run
//! use reload_cache::{BoxError, ReloadCache};
//!
//! let cache: ReloadCache<String, u64, _> = ReloadCache::builder()
//!     .ttl(30_000)
//!     .immutable(true)
//!     .build_with(|| Ok::<_, BoxError>(Some(vec![("answer".to_owned(), 42)])))
//!     .unwrap();
//!
//! let answer = cache.get("answer");
//! ```
//!
//! Reads never wait on a reload, each reload builds a new [`Snapshot`] and swaps it in atomically.
//! A reload that fails leaves the previous snapshot in place and reports through [`Loader::on_error`].

/// Fluent configuration for a [`ReloadCache`].
pub mod builder;
#[doc(inline)]
pub use builder::CacheBuilder;

pub mod cache;
#[doc(inline)]
pub use cache::ReloadCache;

/// Builds and atomically publishes snapshots.
pub mod engine;
#[doc(inline)]
pub use engine::{NoDataPolicy, ReloadOutcome, SwapEngine};

pub mod error;
#[doc(inline)]
pub use error::{BoxError, BuildError, ImmutableCacheError, ReloadError};

mod lifecycle;

/// The data source a cache reloads from.
pub mod loader;
#[doc(inline)]
pub use loader::Loader;

pub mod schedule;
#[doc(inline)]
pub use schedule::{ReloadSchedule, TimeUnit};

/// A single threaded fixed-delay job scheduler, shareable between caches.
pub mod scheduler;
#[doc(inline)]
pub use scheduler::{ReloadScheduler, ScheduledHandle};

pub mod snapshot;
#[doc(inline)]
pub use snapshot::Snapshot;

#[cfg(test)]
mod test_util;
