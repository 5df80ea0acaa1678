use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{Never, Scope, Task};

static NEXT_PROCESS_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`Process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

type KillHook = Box<dyn FnOnce() + Send>;

struct Inner {
    id: ProcessId,
    killed: AtomicBool,
    on_kill: Mutex<Option<KillHook>>,
}

/// A handle to a running operation that can be killed.
///
/// Processes come from two places: the callback of a primitive
/// [`Task`] returns one for the operation it started, and [`Task::spawn`]
/// returns one for the whole background execution. Clones refer to the
/// same operation.
///
/// Killing is idempotent: the kill hook runs at most once.
#[derive(Clone)]
pub struct Process {
    inner: Arc<Inner>,
}

static_assertions::assert_impl_all!(Process: Send, Sync, Clone);

impl Process {
    /// Creates a Process whose kill hook is `on_kill`.
    pub fn new<F>(on_kill: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                id: ProcessId(NEXT_PROCESS_ID.fetch_add(1, Ordering::Relaxed)),
                killed: AtomicBool::new(false),
                on_kill: Mutex::new(Some(Box::new(on_kill))),
            }),
        }
    }

    /// A Process with nothing to cancel.
    ///
    /// Primitives that complete synchronously return this.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Returns the identifier of this Process.
    #[inline]
    pub fn id(&self) -> ProcessId {
        self.inner.id
    }

    /// Whether this Process has been killed.
    #[inline]
    pub fn is_killed(&self) -> bool {
        self.inner.killed.load(Ordering::Acquire)
    }

    /// A Task that kills this Process when executed.
    ///
    /// Killing an already-killed Process does nothing.
    pub fn kill(&self) -> Task<Never, ()> {
        let process = self.clone();
        Task::from_async(move || {
            let process = process.clone();
            async move {
                process.kill_now();
                Ok(())
            }
        })
    }

    /// Runs the kill hook unless it already ran. Returns whether it ran.
    pub(crate) fn kill_now(&self) -> bool {
        if self.inner.killed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let hook = self.inner.on_kill.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        tracing::debug!(process = %self.id(), "process killed");
        true
    }

    pub(crate) fn spawn<E, T>(task: Task<E, T>) -> Self
    where
        E: Send + 'static,
        T: Send + 'static,
    {
        let scope = Scope::default();
        let (execution, abort) = futures::future::abortable(task.run(scope.clone()));
        let process = Self::new(move || {
            abort.abort();
            scope.kill_all();
        });
        let id = process.id();
        tracing::debug!(process = %id, "process spawned");
        tokio::spawn(async move {
            if execution.await.is_err() {
                tracing::trace!(process = %id, "spawned execution aborted");
            }
        });
        process
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Process")
            .field("id", &self.id())
            .field("killed", &self.is_killed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::AtomicUsize;

    #[rstest]
    fn ids_are_unique() {
        assert_ne!(Process::noop().id(), Process::noop().id());
    }

    #[rstest]
    fn kill_now_runs_hook_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let process = Process::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(process.kill_now());
        assert!(!process.clone().kill_now());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(process.is_killed());
    }

    #[rstest]
    fn display_of_id() {
        assert_eq!(format!("{}", ProcessId(7)), "#7");
    }
}
