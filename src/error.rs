use std::error::Error;

/// A type erased error as returned by a [`crate::Loader`]
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Returned by [`crate::CacheBuilder::build`] when the cache cannot be assembled
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("a loader must be provided")]
    MissingLoader,
    #[error("ttl must be positive, got {0}")]
    NonPositiveTtl(i64),
    #[error("initial load delay must not be negative, got {0}")]
    NegativeDelay(i64),
    #[error("failed to spawn the reload scheduler: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Handed to [`crate::Loader::on_error`] when a reload could not publish a new snapshot.
///
/// The previously published snapshot stays visible whenever one of these is reported.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("loader failed: {0}")]
    Load(#[source] BoxError),
    #[error("loader returned no data")]
    NoData,
    #[error("reload panicked: {0}")]
    Panicked(String),
}

/// A write was attempted on a cache built with [`crate::CacheBuilder::immutable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{operation} is not supported on an immutable cache")]
pub struct ImmutableCacheError {
    pub operation: &'static str,
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_panic_message_extracts_strings() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(&*payload), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(&*payload), "code 7");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(3u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ImmutableCacheError { operation: "insert" }.to_string(),
            "insert is not supported on an immutable cache"
        );
        assert_eq!(BuildError::NonPositiveTtl(-3).to_string(), "ttl must be positive, got -3");
    }
}
