use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use super::driver::{Mailbox, Signal};
use crate::error::RuntimeError;

// =============================================================================
// Settle tracking
// =============================================================================

/// Counts the work a program has not finished yet: queued envelopes and
/// executing command Tasks.
#[derive(Default)]
pub(crate) struct Tracker {
    pending: AtomicUsize,
    idle: Notify,
}

impl Tracker {
    pub(crate) fn begin(self: &Arc<Self>) -> Pending {
        self.pending.fetch_add(1, Ordering::SeqCst);
        Pending {
            tracker: Arc::clone(self),
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One unit of pending work; finished when dropped.
pub(crate) struct Pending {
    tracker: Arc<Tracker>,
}

impl Drop for Pending {
    fn drop(&mut self) {
        if self.tracker.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}

// =============================================================================
// Shared program state
// =============================================================================

type ListenerFn<Model> = Arc<dyn Fn(&Arc<Model>) + Send + Sync>;

/// State shared between the driver and every handle.
pub(crate) struct Shared<Model> {
    name: String,
    model: RwLock<Arc<Model>>,
    listeners: Mutex<Vec<(u64, ListenerFn<Model>)>>,
    next_listener: AtomicU64,
    tracker: Arc<Tracker>,
}

impl<Model> Shared<Model> {
    pub(crate) fn new(name: String, model: Model, tracker: Arc<Tracker>) -> Self {
        Self {
            name,
            model: RwLock::new(Arc::new(model)),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            tracker,
        }
    }

    pub(crate) fn model(&self) -> Arc<Model> {
        Arc::clone(&self.model.read())
    }

    pub(crate) fn replace(&self, model: Arc<Model>) {
        *self.model.write() = model;
    }

    pub(crate) fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Calls every listener, in registration order.
    pub(crate) fn notify(&self, model: &Arc<Model>) {
        let listeners: Vec<ListenerFn<Model>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(model);
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Handle to a running program.
///
/// Handles are cheap to clone; every clone talks to the same program.
pub struct Handle<Model, Msg> {
    shared: Arc<Shared<Model>>,
    mailbox: Mailbox<Msg>,
}

impl<Model, Msg> Clone for Handle<Model, Msg> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<Model, Msg> fmt::Debug for Handle<Model, Msg> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Handle")
            .field("program", &self.shared.name)
            .finish_non_exhaustive()
    }
}

impl<Model, Msg> Handle<Model, Msg>
where
    Model: Send + Sync + 'static,
    Msg: Send + 'static,
{
    pub(crate) const fn new(shared: Arc<Shared<Model>>, mailbox: Mailbox<Msg>) -> Self {
        Self { shared, mailbox }
    }

    /// The current model.
    pub fn get_model(&self) -> Arc<Model> {
        self.shared.model()
    }

    /// Enqueues `message`. It is handled after every message already queued.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Stopped`] if the program's driver is gone.
    pub fn dispatch(&self, message: Msg) -> Result<(), RuntimeError> {
        if self.mailbox.post(Signal::Dispatch(message)) {
            Ok(())
        } else {
            Err(RuntimeError::Stopped {
                name: self.shared.name.clone(),
            })
        }
    }

    /// Registers `listener`, called with the new model after every update
    /// that changed it.
    ///
    /// Listeners run on the driver, in registration order, before the
    /// update's command starts.
    pub fn subscribe<F>(&self, listener: F) -> Listener<Model>
    where
        F: Fn(&Arc<Model>) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        self.shared.listeners.lock().push((id, Arc::new(listener)));
        Listener {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Waits until every queued message has been handled and every command
    /// Task has delivered its message.
    ///
    /// Standing subscriptions (timers, ports) do not count; only work that
    /// is already queued or executing does.
    pub async fn settled(&self) {
        self.shared.tracker.wait_idle().await;
    }
}

/// Registration of a model listener. Dropping it keeps the listener.
#[must_use = "a listener can only be removed through its registration"]
pub struct Listener<Model> {
    id: u64,
    shared: Weak<Shared<Model>>,
}

impl<Model> Listener<Model> {
    /// Removes the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut listeners = shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        listeners.len() != before
    }
}

impl<Model> fmt::Debug for Listener<Model> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Listener").field("id", &self.id).finish()
    }
}
