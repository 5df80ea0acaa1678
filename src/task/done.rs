use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{Process, ProcessId, Start, Task};

/// Completion handle passed to the callback of a primitive [`Task`].
///
/// The first call to [`Done::complete`] (or one of its shorthands) decides
/// the outcome of the execution. Any later call is ignored and logged.
/// Clones share the same slot.
pub struct Done<E, T> {
    slot: Arc<Mutex<Option<oneshot::Sender<Task<E, T>>>>>,
}

impl<E, T> Clone for Done<E, T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<E, T> Done<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    fn channel() -> (Self, oneshot::Receiver<Task<E, T>>) {
        let (sender, receiver) = oneshot::channel();
        let done = Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        (done, receiver)
    }

    /// Completes the execution with the outcome of `outcome`.
    ///
    /// Returns `true` if this call decided the outcome and the execution was
    /// still waiting for it.
    pub fn complete(&self, outcome: Task<E, T>) -> bool {
        let sender = self.slot.lock().take();
        let Some(sender) = sender else {
            tracing::warn!("primitive task completed more than once; ignoring");
            return false;
        };
        sender.send(outcome).is_ok()
    }

    /// Completes the execution successfully with `value`.
    pub fn succeed(&self, value: T) -> bool
    where
        T: Clone + Sync,
    {
        self.complete(Task::succeed(value))
    }

    /// Completes the execution with `error`.
    pub fn fail(&self, error: E) -> bool
    where
        E: Clone + Sync,
    {
        self.complete(Task::fail(error))
    }

    /// Whether the outcome has already been decided.
    pub fn is_completed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

/// The set of primitives an execution is currently waiting on.
///
/// A spawned execution owns one scope; killing its Process kills every
/// Process still tracked here.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    inflight: Arc<Mutex<Vec<Process>>>,
}

impl Scope {
    fn track(&self, process: Process) {
        self.inflight.lock().push(process);
    }

    fn release(&self, id: ProcessId) {
        self.inflight.lock().retain(|process| process.id() != id);
    }

    pub(crate) fn kill_all(&self) {
        let processes = std::mem::take(&mut *self.inflight.lock());
        for process in processes {
            process.kill_now();
        }
    }
}

/// Keeps a primitive's Process tracked while its execution waits on it.
///
/// Dropped before [`Inflight::finish`], the execution was abandoned, so
/// the Process is released and killed.
struct Inflight {
    scope: Scope,
    process: Option<Process>,
}

impl Inflight {
    fn track(scope: &Scope, process: Process) -> Self {
        scope.track(process.clone());
        Self {
            scope: scope.clone(),
            process: Some(process),
        }
    }

    fn finish(mut self) {
        if let Some(process) = self.process.take() {
            self.scope.release(process.id());
        }
    }
}

impl Drop for Inflight {
    fn drop(&mut self) {
        if let Some(process) = self.process.take() {
            self.scope.release(process.id());
            if process.kill_now() {
                tracing::trace!(process = %process.id(), "abandoned primitive killed");
            }
        }
    }
}

pub(super) fn run_primitive<E, T>(start: Start<E, T>, scope: Scope) -> BoxFuture<'static, Result<T, E>>
where
    E: Send + 'static,
    T: Send + 'static,
{
    async move {
        let (done, outcome) = Done::channel();
        let process = start(done);
        let id = process.id();
        let inflight = Inflight::track(&scope, process);

        let outcome = outcome.await;
        inflight.finish();

        match outcome {
            Ok(task) => task.run(scope).await,
            Err(_) => {
                tracing::trace!(process = %id, "primitive dropped its completion handle");
                future::pending().await
            }
        }
    }
    .boxed()
}
