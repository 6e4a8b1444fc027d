use crate::error::{BoxError, ReloadError};

/// A `Loader` produces a fresh copy of the whole dataset every time the cache reloads
///
/// [`Loader::load`] runs on the scheduler's worker thread and may block for as long as the fetch takes,
/// readers of the cache are never blocked by it.
///
/// Returning `Ok(None)` means "nothing new", the cache keeps serving what it has and still reports success.
/// `Ok(Some(data))` replaces the whole cache, even if `data` is empty.
pub trait Loader<K, V>: Send + Sync + 'static {
    type Data: IntoIterator<Item = (K, V)>;
    type Error: Into<BoxError>;

    fn load(&self) -> Result<Option<Self::Data>, Self::Error>;

    /// Called once for every reload that failed to publish, the old snapshot is still being served
    fn on_error(&self, _error: ReloadError) {}

    /// Called after every successful reload, including ones that returned no data
    fn on_load_complete(&self) {}
}

impl<K, V, F, D, E> Loader<K, V> for F
where
    F: Fn() -> Result<Option<D>, E> + Send + Sync + 'static,
    D: IntoIterator<Item = (K, V)>,
    E: Into<BoxError>,
{
    type Data = D;
    type Error = E;

    fn load(&self) -> Result<Option<D>, E> {
        self()
    }
}
