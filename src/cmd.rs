//! `Cmd` - a bag of Tasks whose results come back as messages.
//!
//! An update function returns a [`Cmd`] next to the new model. The runtime
//! executes every Task in the bag and feeds each produced message back into
//! its mailbox. Building and mapping a Cmd is pure; nothing runs until the
//! runtime takes it.
//!
//! Batches are normalized on construction: `none` members disappear, an
//! empty batch is `none` and a single-member batch is that member.

use std::fmt;
use std::sync::Arc;

use crate::task::{Never, Task};

/// A command producing messages of type `Msg`.
///
/// # Examples
///
/// ```rust,ignore
/// use teaflow::prelude::*;
///
/// #[derive(Clone)]
/// enum Msg {
///     Saved(Result<(), String>),
///     Ticked,
/// }
///
/// let cmd: Cmd<Msg> = Cmd::batch([
///     Task::<String, ()>::succeed(()).attempt(Msg::Saved),
///     Task::sleep(std::time::Duration::from_secs(1)).perform(|()| Msg::Ticked),
///     Cmd::none(),
/// ]);
/// assert_eq!(cmd.len(), 2);
/// ```
pub struct Cmd<Msg> {
    node: Node<Msg>,
}

enum Node<Msg> {
    None,
    Single(Task<Never, Msg>),
    Batch(Vec<Cmd<Msg>>),
}

impl<Msg> Clone for Cmd<Msg> {
    fn clone(&self) -> Self {
        let node = match &self.node {
            Node::None => Node::None,
            Node::Single(task) => Node::Single(task.clone()),
            Node::Batch(commands) => Node::Batch(commands.clone()),
        };
        Self { node }
    }
}

impl<Msg> Default for Cmd<Msg> {
    fn default() -> Self {
        Self { node: Node::None }
    }
}

impl<Msg> Cmd<Msg>
where
    Msg: Send + 'static,
{
    /// The empty command.
    pub const fn none() -> Self {
        Self { node: Node::None }
    }

    /// Creates a command from a fallible Task and a tagger for its outcome.
    ///
    /// Equivalent to [`Task::attempt`].
    pub fn new<E, T, F>(task: Task<E, T>, tagger: F) -> Self
    where
        E: Send + 'static,
        T: Send + 'static,
        F: Fn(Result<T, E>) -> Msg + Send + Sync + 'static,
    {
        task.attempt(tagger)
    }

    pub(crate) const fn single(task: Task<Never, Msg>) -> Self {
        Self {
            node: Node::Single(task),
        }
    }

    /// Combines several commands into one.
    pub fn batch<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut members: Vec<Self> = commands
            .into_iter()
            .filter(|command| !command.is_none())
            .collect();
        if members.len() <= 1 {
            return members.pop().unwrap_or_else(Self::none);
        }
        Self {
            node: Node::Batch(members),
        }
    }

    /// Transforms every message the command will produce.
    ///
    /// Mapping never duplicates or drops a Task.
    pub fn map<Msg2, F>(self, function: F) -> Cmd<Msg2>
    where
        F: Fn(Msg) -> Msg2 + Send + Sync + 'static,
        Msg2: Send + 'static,
    {
        let function: Arc<dyn Fn(Msg) -> Msg2 + Send + Sync> = Arc::new(function);
        self.map_shared(&function)
    }

    fn map_shared<Msg2>(self, function: &Arc<dyn Fn(Msg) -> Msg2 + Send + Sync>) -> Cmd<Msg2>
    where
        Msg2: Send + 'static,
    {
        match self.node {
            Node::None => Cmd::none(),
            Node::Single(task) => {
                let function = Arc::clone(function);
                Cmd::single(task.map(move |message| function(message)))
            }
            Node::Batch(commands) => Cmd {
                node: Node::Batch(
                    commands
                        .into_iter()
                        .map(|command| command.map_shared(function))
                        .collect(),
                ),
            },
        }
    }

    /// Whether the command holds no Task.
    pub const fn is_none(&self) -> bool {
        matches!(self.node, Node::None)
    }

    /// Number of Tasks the command will run.
    pub fn len(&self) -> usize {
        match &self.node {
            Node::None => 0,
            Node::Single(_) => 1,
            Node::Batch(commands) => commands.iter().map(Self::len).sum(),
        }
    }

    /// Flattens the command into its Tasks, in batch order.
    ///
    /// The runtime uses this to execute a command; the Tasks are returned
    /// unexecuted.
    pub fn execute(self) -> Vec<Task<Never, Msg>> {
        let mut tasks = Vec::with_capacity(self.len());
        self.flatten_into(&mut tasks);
        tasks
    }

    fn flatten_into(self, tasks: &mut Vec<Task<Never, Msg>>) {
        match self.node {
            Node::None => {}
            Node::Single(task) => tasks.push(task),
            Node::Batch(commands) => {
                for command in commands {
                    command.flatten_into(tasks);
                }
            }
        }
    }
}

impl<Msg> fmt::Debug for Cmd<Msg> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::None => formatter.write_str("Cmd::None"),
            Node::Single(task) => formatter.debug_tuple("Cmd::Single").field(task).finish(),
            Node::Batch(commands) => formatter.debug_list().entries(commands).finish(),
        }
    }
}

static_assertions::assert_impl_all!(Cmd<u8>: Send, Sync, Clone);
