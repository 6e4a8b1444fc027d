use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{BoxError, ReloadError};
use crate::loader::Loader;

#[derive(Debug)]
pub(crate) enum Event {
    Completed,
    Failed,
}

/// A loader that records every callback and forwards it to a channel
pub(crate) struct Recorder<F> {
    load: F,
    completed: AtomicUsize,
    errors: Mutex<Vec<ReloadError>>,
    events: Sender<Event>,
}

impl<F> Recorder<F> {
    pub(crate) fn new<D>(load: F) -> (Self, Receiver<Event>)
    where
        F: Fn() -> Result<Option<D>, BoxError>,
    {
        let (events, rx) = crossbeam_channel::unbounded();

        let recorder = Recorder {
            load,
            completed: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
            events,
        };

        (recorder, rx)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub(crate) fn failed(&self) -> usize {
        self.errors.lock().len()
    }

    pub(crate) fn errors(&self) -> MutexGuard<'_, Vec<ReloadError>> {
        self.errors.lock()
    }
}

impl<K, V, F, D> Loader<K, V> for Recorder<F>
where
    F: Fn() -> Result<Option<D>, BoxError> + Send + Sync + 'static,
    D: IntoIterator<Item = (K, V)>,
{
    type Data = D;
    type Error = BoxError;

    fn load(&self) -> Result<Option<D>, BoxError> {
        (self.load)()
    }

    fn on_error(&self, error: ReloadError) {
        self.errors.lock().push(error);
        let _ = self.events.send(Event::Failed);
    }

    fn on_load_complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        let _ = self.events.send(Event::Completed);
    }
}
