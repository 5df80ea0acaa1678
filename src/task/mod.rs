//! `Task` - cold, re-executable, cancellable asynchronous computations.
//!
//! A [`Task<E, T>`] *describes* a computation that either fails with `E` or
//! succeeds with `T`. Building a Task performs no side effect; effects only
//! happen when the Task is executed, which the runtime does when it runs a
//! [`Cmd`] or an effect manager callback. A Task can be executed any number
//! of times and every execution is independent.
//!
//! # Representation
//!
//! Internally a Task is one of four shapes:
//!
//! - `Succeed` / `Fail`: an immediate outcome,
//! - `Primitive`: a callback that starts some operation, returns a
//!   [`Process`] able to cancel it, and eventually reports its outcome through
//!   a [`Done`] handle,
//! - `Bound`: every combinator (`map`, `chain`, `on_error`, `map_error`,
//!   `pipe`, `sequence`, ...) erased into a closure producing a boxed future.
//!
//! # Examples
//!
//! ```rust,ignore
//! use teaflow::task::Task;
//!
//! #[tokio::main]
//! async fn main() {
//!     let task = Task::<String, i32>::succeed(20)
//!         .map(|x| x + 1)
//!         .chain(|x| Task::succeed(x * 2));
//!
//!     assert_eq!(task.run_async().await, Ok(42));
//!     // Tasks are cold and can be executed again.
//!     assert_eq!(task.run_async().await, Ok(42));
//! }
//! ```
//!
//! # Scheduling
//!
//! Suspension only happens at chain boundaries and while a primitive waits
//! for its `Done`. There is no preemption: the runtime that executes the
//! Tasks serializes every message they produce through a single mailbox.

mod done;
mod process;

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};

use crate::cmd::Cmd;

pub use done::Done;
pub(crate) use done::Scope;
pub use process::{Process, ProcessId};

/// The error type of Tasks that cannot fail.
pub type Never = Infallible;

type Run<E, T> = Arc<dyn Fn(Scope) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type Start<E, T> = Arc<dyn Fn(Done<E, T>) -> Process + Send + Sync>;

enum Repr<E, T> {
    Succeed(Arc<dyn Fn() -> T + Send + Sync>),
    Fail(Arc<dyn Fn() -> E + Send + Sync>),
    Primitive(Start<E, T>),
    Bound(Run<E, T>),
}

/// A lazy asynchronous computation failing with `E` or succeeding with `T`.
///
/// # Type Parameters
///
/// - `E`: the error type. Use [`Never`] for Tasks that cannot fail.
/// - `T`: the success type.
///
/// # Monad Laws
///
/// Given deterministic inner Tasks, `Task` satisfies:
///
/// 1. **Left Identity**: `Task::succeed(a).chain(f) == f(a)`
/// 2. **Right Identity**: `t.chain(Task::succeed) == t`
/// 3. **Associativity**: `t.chain(f).chain(g) == t.chain(|x| f(x).chain(g))`
pub struct Task<E, T> {
    repr: Arc<Repr<E, T>>,
}

impl<E, T> Clone for Task<E, T> {
    fn clone(&self) -> Self {
        Self {
            repr: Arc::clone(&self.repr),
        }
    }
}

static_assertions::assert_impl_all!(Task<String, i32>: Send, Sync, Clone);

// =============================================================================
// Constructors
// =============================================================================

impl<E, T> Task<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    fn from_repr(repr: Repr<E, T>) -> Self {
        Self {
            repr: Arc::new(repr),
        }
    }

    pub(crate) fn bound<F>(run: F) -> Self
    where
        F: Fn(Scope) -> BoxFuture<'static, Result<T, E>> + Send + Sync + 'static,
    {
        Self::from_repr(Repr::Bound(Arc::new(run)))
    }

    /// Creates a Task that immediately succeeds with `value`.
    ///
    /// Every execution yields its own clone of `value`.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use teaflow::task::{Never, Task};
    ///
    /// let task = Task::<Never, _>::succeed(42);
    /// assert_eq!(task.run_safe().await, 42);
    /// ```
    pub fn succeed(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::from_repr(Repr::Succeed(Arc::new(move || value.clone())))
    }

    /// Creates a Task that immediately fails with `error`.
    pub fn fail(error: E) -> Self
    where
        E: Clone + Sync,
    {
        Self::from_repr(Repr::Fail(Arc::new(move || error.clone())))
    }

    /// Creates a primitive Task from a callback.
    ///
    /// On every execution, `start` is called with a fresh [`Done`] handle. It
    /// must start the underlying operation, return a [`Process`] able to
    /// cancel it, and eventually hand the outcome to `done` exactly once.
    /// Later calls to `done` are ignored. If `done` is dropped without ever
    /// being called the execution never completes, which is what a
    /// cancelled operation looks like.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use teaflow::task::{Never, Process, Task};
    ///
    /// let task = Task::<Never, u8>::primitive(|done| {
    ///     let worker = tokio::spawn(async move {
    ///         done.succeed(7);
    ///     });
    ///     Process::new(move || worker.abort())
    /// });
    /// ```
    pub fn primitive<F>(start: F) -> Self
    where
        F: Fn(Done<E, T>) -> Process + Send + Sync + 'static,
    {
        Self::from_repr(Repr::Primitive(Arc::new(start)))
    }

    /// Creates a Task from an async closure.
    ///
    /// This is how collaborators that already speak futures (HTTP clients,
    /// file IO, channels) become Tasks. `action` is called once per
    /// execution.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use teaflow::task::Task;
    ///
    /// let task = Task::from_async(|| async {
    ///     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    ///     Ok::<_, String>(42)
    /// });
    /// ```
    pub fn from_async<F, Fut>(action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::bound(move |_scope| action().boxed())
    }

    /// Runs every Task, collecting their results in input order.
    ///
    /// The Tasks are polled concurrently; the first error wins and the
    /// remaining executions are dropped.
    pub fn sequence(tasks: Vec<Self>) -> Task<E, Vec<T>> {
        let tasks: Arc<[Self]> = tasks.into();
        Task::bound(move |scope: Scope| {
            let tasks = Arc::clone(&tasks);
            async move {
                let executions: Vec<_> = tasks.iter().map(|task| task.run(scope.clone())).collect();
                future::try_join_all(executions).await
            }
            .boxed()
        })
    }
}

impl Task<Never, ()> {
    /// A Task that succeeds after `duration`.
    ///
    /// The timer is a primitive: killing the Process of a spawned Task that
    /// is waiting on it cancels the timer.
    pub fn sleep(duration: Duration) -> Self {
        Self::primitive(move |done| {
            let timer = tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                done.succeed(());
            });
            Process::new(move || timer.abort())
        })
    }
}

// =============================================================================
// Execution
// =============================================================================

impl<E, T> Task<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    pub(crate) fn run(&self, scope: Scope) -> BoxFuture<'static, Result<T, E>> {
        match &*self.repr {
            Repr::Succeed(value) => future::ready(Ok(value())).boxed(),
            Repr::Fail(error) => future::ready(Err(error())).boxed(),
            Repr::Primitive(start) => done::run_primitive(Arc::clone(start), scope),
            Repr::Bound(run) => run(scope),
        }
    }

    /// Executes the Task once and returns its outcome.
    ///
    /// Applications normally leave execution to the runtime; this is the
    /// edge for tests and for collaborators that need the raw result.
    pub async fn run_async(&self) -> Result<T, E> {
        self.run(Scope::default()).await
    }
}

impl<T> Task<Never, T>
where
    T: Send + 'static,
{
    /// Executes a Task that cannot fail and returns its value.
    pub async fn run_safe(&self) -> T {
        match self.run(Scope::default()).await {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

// =============================================================================
// Combinators
// =============================================================================

impl<E, T> Task<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    /// Transforms the success value.
    pub fn map<U, F>(self, function: F) -> Task<E, U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
        U: Send + 'static,
    {
        let function = Arc::new(function);
        Task::bound(move |scope| {
            let source = self.clone();
            let function = Arc::clone(&function);
            async move { source.run(scope).await.map(|value| function(value)) }.boxed()
        })
    }

    /// Chains a Task built from the success value.
    ///
    /// An error short-circuits: `function` is never called.
    pub fn chain<U, F>(self, function: F) -> Task<E, U>
    where
        F: Fn(T) -> Task<E, U> + Send + Sync + 'static,
        U: Send + 'static,
    {
        let function = Arc::new(function);
        Task::bound(move |scope: Scope| {
            let source = self.clone();
            let function = Arc::clone(&function);
            async move {
                let value = source.run(scope.clone()).await?;
                function(value).run(scope).await
            }
            .boxed()
        })
    }

    /// Alias for [`Task::chain`].
    pub fn and_then<U, F>(self, function: F) -> Task<E, U>
    where
        F: Fn(T) -> Task<E, U> + Send + Sync + 'static,
        U: Send + 'static,
    {
        self.chain(function)
    }

    /// Recovers from an error with a fallback Task, whose error type may
    /// differ.
    pub fn on_error<E2, F>(self, function: F) -> Task<E2, T>
    where
        F: Fn(E) -> Task<E2, T> + Send + Sync + 'static,
        E2: Send + 'static,
    {
        let function = Arc::new(function);
        Task::bound(move |scope: Scope| {
            let source = self.clone();
            let function = Arc::clone(&function);
            async move {
                match source.run(scope.clone()).await {
                    Ok(value) => Ok(value),
                    Err(error) => function(error).run(scope).await,
                }
            }
            .boxed()
        })
    }

    /// Transforms the error value.
    pub fn map_error<E2, F>(self, function: F) -> Task<E2, T>
    where
        F: Fn(E) -> E2 + Send + Sync + 'static,
        E2: Send + 'static,
    {
        let function = Arc::new(function);
        Task::bound(move |scope| {
            let source = self.clone();
            let function = Arc::clone(&function);
            async move { source.run(scope).await.map_err(|error| function(error)) }.boxed()
        })
    }

    /// Applicative apply.
    ///
    /// Runs `function` first, then `self`, and applies the produced function
    /// to the produced value. The first error wins.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use teaflow::task::{Never, Task};
    ///
    /// let add_one = Task::<Never, _>::succeed(|x: i32| x + 1);
    /// let result = Task::succeed(41).pipe(add_one).run_safe().await;
    /// assert_eq!(result, 42);
    /// ```
    pub fn pipe<U, F>(self, function: Task<E, F>) -> Task<E, U>
    where
        F: FnOnce(T) -> U + Send + 'static,
        U: Send + 'static,
    {
        Task::bound(move |scope: Scope| {
            let source = self.clone();
            let function = function.clone();
            async move {
                let function = function.run(scope.clone()).await?;
                let value = source.run(scope).await?;
                Ok(function(value))
            }
            .boxed()
        })
    }

    /// Returns a Task that starts `self` in the background.
    ///
    /// The returned Task succeeds immediately with the [`Process`] of the
    /// background execution, without waiting for it. Killing that Process
    /// aborts the execution and kills whichever primitive it is waiting on.
    /// The outcome of the background execution is discarded.
    pub fn spawn(self) -> Task<Never, Process> {
        Task::bound(move |_scope| {
            let task = self.clone();
            async move { Ok(Process::spawn(task)) }.boxed()
        })
    }

    /// Turns the Task into a [`Cmd`] whose outcome, success or failure, is
    /// wrapped into a message by `tagger`.
    ///
    /// This is the only way for a fallible Task to leave the Task world, so
    /// a command can never drop a failure silently.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use teaflow::task::Task;
    ///
    /// #[derive(Clone)]
    /// enum Msg {
    ///     Loaded(Result<u32, String>),
    /// }
    ///
    /// let cmd = Task::<String, u32>::fail("offline".into()).attempt(Msg::Loaded);
    /// ```
    pub fn attempt<Msg, F>(self, tagger: F) -> Cmd<Msg>
    where
        F: Fn(Result<T, E>) -> Msg + Send + Sync + 'static,
        Msg: Send + 'static,
    {
        let tagger = Arc::new(tagger);
        Cmd::single(Task::bound(move |scope| {
            let source = self.clone();
            let tagger = Arc::clone(&tagger);
            async move { Ok(tagger(source.run(scope).await)) }.boxed()
        }))
    }
}

impl<T> Task<Never, T>
where
    T: Send + 'static,
{
    /// [`Task::attempt`] for Tasks that cannot fail.
    pub fn perform<Msg, F>(self, tagger: F) -> Cmd<Msg>
    where
        F: Fn(T) -> Msg + Send + Sync + 'static,
        Msg: Send + 'static,
    {
        self.attempt(move |result: Result<T, Never>| match result {
            Ok(value) => tagger(value),
            Err(never) => match never {},
        })
    }
}

// =============================================================================
// Display Implementation
// =============================================================================

impl<E, T> Task<E, T> {
    fn kind(&self) -> &'static str {
        match &*self.repr {
            Repr::Succeed(_) => "Succeed",
            Repr::Fail(_) => "Fail",
            Repr::Primitive(_) => "Primitive",
            Repr::Bound(_) => "Bound",
        }
    }
}

impl<E, T> fmt::Debug for Task<E, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Task")
            .field("kind", &self.kind())
            .finish()
    }
}

impl<E, T> fmt::Display for Task<E, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "<Task::{}>", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    fn display_names_the_shape() {
        assert_eq!(format!("{}", Task::<Never, i32>::succeed(1)), "<Task::Succeed>");
        assert_eq!(format!("{}", Task::<i32, ()>::fail(1)), "<Task::Fail>");
        assert_eq!(
            format!("{}", Task::<Never, i32>::succeed(1).map(|x| x + 1)),
            "<Task::Bound>"
        );
    }

    #[rstest]
    fn building_a_task_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _task = Task::<Never, ()>::from_async(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        })
        .map(|()| 1);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn chain_short_circuits_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let task = Task::<&str, i32>::fail("nope").chain(move |x| {
            counter.fetch_add(1, Ordering::SeqCst);
            Task::succeed(x)
        });

        assert_eq!(task.run_async().await, Err("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn primitive_shares_scope_with_spawned_process() {
        let killed = Arc::new(AtomicUsize::new(0));
        let kills = Arc::clone(&killed);
        let never_done = Task::<Never, ()>::primitive(move |_done| {
            let kills = Arc::clone(&kills);
            Process::new(move || {
                kills.fetch_add(1, Ordering::SeqCst);
            })
        });

        let process = never_done.spawn().run_safe().await;
        tokio::task::yield_now().await;
        process.kill().run_safe().await;

        assert_eq!(killed.load(Ordering::SeqCst), 1);
    }
}
