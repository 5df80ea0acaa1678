//! Ports: a channel from code outside the program into its subscriptions.
//!
//! A [`Port`] is created outside the program and cloned into both sides:
//! the program subscribes with [`Port::subscribe`], other code pushes
//! values with [`Port::send`]. Values are delivered to every current
//! subscriber, in send order, through the program's mailbox.
//!
//! A port is connected to each program that currently subscribes to it,
//! and to no other; values sent while no program listens are dropped.
//! Clones share one port. Two `Port::new` calls give two independent ports,
//! even under the same name.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::{Effect, Router, RouterContext};
use crate::sub::{Sub, SubKey};
use crate::task::{Never, Task};

static NEXT_PORT_ID: AtomicU64 = AtomicU64::new(1);

/// An inbound port carrying values of type `T`.
pub struct Port<T> {
    name: Arc<str>,
    namespace: Arc<str>,
    links: Arc<Mutex<Vec<RouterContext<T>>>>,
}

impl<T> Clone for Port<T> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            namespace: Arc::clone(&self.namespace),
            links: Arc::clone(&self.links),
        }
    }
}

impl<T> fmt::Debug for Port<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Port")
            .field("name", &self.name)
            .field("programs", &self.links.lock().len())
            .finish()
    }
}

impl<T> Port<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a disconnected port.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        let id = NEXT_PORT_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            namespace: Arc::from(format!("{name}#{id}")),
            name,
            links: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Name of the port.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subscribes to the values sent through the port.
    pub fn subscribe<Msg, F>(&self, tagger: F) -> Sub<Msg>
    where
        F: Fn(T) -> Msg + Send + Sync + 'static,
        Msg: Send + 'static,
    {
        Sub::single(self.clone(), SubKey::new(Arc::clone(&self.name)), tagger)
    }

    /// Pushes `value` to the subscribers of every connected program.
    ///
    /// Returns `false` if no running program received it.
    pub fn send(&self, value: T) -> bool {
        let mut links = self.links.lock();
        // A failed post means that program stopped.
        links.retain(|router| router.post_to_self(value.clone()));
        if links.is_empty() {
            tracing::trace!(port = %self.name, "port not connected; value dropped");
            return false;
        }
        true
    }

    /// Whether some program currently subscribes to the port.
    pub fn is_connected(&self) -> bool {
        !self.links.lock().is_empty()
    }
}

/// State of a port: its current subscribers.
pub struct PortState<T> {
    listeners: Vec<Effect<T>>,
}

impl<T> Clone for PortState<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<T> Default for PortState<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<T> PortState<T> {
    /// Number of subscriptions on the port.
    pub fn listeners(&self) -> usize {
        self.listeners.len()
    }
}

impl<T> fmt::Debug for PortState<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PortState")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> Router for Port<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Payload = T;
    type SelfMsg = T;
    type State = PortState<T>;

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn init(&self) -> Task<Never, PortState<T>> {
        Task::succeed(PortState::default())
    }

    fn on_effects(
        &self,
        router: &RouterContext<T>,
        effects: Vec<Effect<T>>,
        _state: PortState<T>,
    ) -> Task<Never, PortState<T>> {
        let port = self.clone();
        let router = router.clone();
        Task::from_async(move || {
            let port = port.clone();
            let router = router.clone();
            let effects = effects.clone();
            async move {
                port.relink(router, !effects.is_empty());
                Ok(PortState { listeners: effects })
            }
        })
    }

    fn on_self_msg(&self, router: &RouterContext<T>, value: T, state: PortState<T>) -> Task<Never, PortState<T>> {
        let sends = state
            .listeners
            .iter()
            .map(|listener| router.send_to_app(listener.tag(value.clone())))
            .collect();
        Task::sequence(sends).map(move |_| state.clone())
    }
}

impl<T> Port<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn relink(&self, router: RouterContext<T>, listening: bool) {
        let mut links = self.links.lock();
        let linked = links.iter().position(|link| link.same_program(&router));
        match (listening, linked) {
            (true, None) => {
                links.push(router);
                tracing::debug!(port = %self.name, programs = links.len(), "port connected");
            }
            (false, Some(index)) => {
                links.swap_remove(index);
                tracing::debug!(port = %self.name, programs = links.len(), "port disconnected");
            }
            _ => {}
        }
    }
}
