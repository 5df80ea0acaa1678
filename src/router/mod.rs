//! Effect managers ("routers").
//!
//! A [`Router`] owns one kind of external resource (timers, a port fed from
//! outside the program, a websocket pool, ...). The runtime keeps one state
//! per router for the lifetime of a program and calls the router back in
//! two situations:
//!
//! - after every update, with the complete list of [`Effect`]s (the
//!   subscription leaves addressed to it) via [`Router::on_effects`];
//!   an empty list means "nobody listens anymore",
//! - whenever the router sent itself a message via
//!   [`RouterContext::send_to_self`], via [`Router::on_self_msg`].
//!
//! Both callbacks return a [`Task`] producing the next state. The runtime
//! executes that Task on its driver, so state transitions of one router
//! never interleave with each other or with an update.
//!
//! # Implementing a router
//!
//! ```rust,ignore
//! use teaflow::prelude::*;
//!
//! #[derive(Clone)]
//! struct Clicks;
//!
//! impl Router for Clicks {
//!     type Payload = (i32, i32);
//!     type SelfMsg = (i32, i32);
//!     type State = Vec<Effect<(i32, i32)>>;
//!
//!     fn namespace(&self) -> &str {
//!         "clicks"
//!     }
//!
//!     fn init(&self) -> Task<Never, Self::State> {
//!         Task::succeed(Vec::new())
//!     }
//!
//!     fn on_effects(
//!         &self,
//!         _router: &RouterContext<Self::SelfMsg>,
//!         effects: Vec<Effect<(i32, i32)>>,
//!         _state: Self::State,
//!     ) -> Task<Never, Self::State> {
//!         Task::succeed(effects)
//!     }
//!
//!     fn on_self_msg(
//!         &self,
//!         router: &RouterContext<Self::SelfMsg>,
//!         click: (i32, i32),
//!         state: Self::State,
//!     ) -> Task<Never, Self::State> {
//!         let sends = state.iter().map(|effect| router.send_to_app(effect.tag(click))).collect();
//!         Task::sequence(sends).map(move |_| state.clone())
//!     }
//! }
//! ```

mod context;
pub(crate) mod manager;

#[cfg(feature = "port")]
pub mod port;
#[cfg(feature = "time")]
pub mod time;

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::sub::SubKey;
use crate::task::{Never, Task};

pub use context::RouterContext;
pub(crate) use context::{Outbox, RouterSignal};

/// An effect manager.
///
/// # Type Parameters
///
/// - `Payload`: what the router hands to subscription taggers.
/// - `SelfMsg`: what the router sends to itself from background work.
/// - `State`: the router's state, threaded through every callback.
pub trait Router: Send + Sync + 'static {
    /// Value delivered to the taggers of this router's subscriptions.
    type Payload: Send + 'static;
    /// Message the router sends to itself.
    type SelfMsg: Clone + Send + Sync + 'static;
    /// State kept by the runtime between callbacks.
    type State: Clone + Send + Sync + 'static;

    /// Unique name of the router. Two routers of the same type with
    /// different namespaces keep separate states.
    fn namespace(&self) -> &str;

    /// Produces the initial state. Called once per program, the first time
    /// a subscription addresses this router.
    fn init(&self) -> Task<Never, Self::State>;

    /// Reconciles the state with the current subscription leaves.
    fn on_effects(
        &self,
        router: &RouterContext<Self::SelfMsg>,
        effects: Vec<Effect<Self::Payload>>,
        state: Self::State,
    ) -> Task<Never, Self::State>;

    /// Handles a message the router sent to itself.
    fn on_self_msg(
        &self,
        router: &RouterContext<Self::SelfMsg>,
        message: Self::SelfMsg,
        state: Self::State,
    ) -> Task<Never, Self::State>;
}

/// Identity of a router inside a program: its namespace plus its type.
#[derive(Clone)]
pub struct RouterId {
    namespace: Arc<str>,
    kind: TypeId,
}

impl RouterId {
    pub(crate) fn of<R: Router>(router: &R) -> Self {
        Self {
            namespace: Arc::from(router.namespace()),
            kind: TypeId::of::<R>(),
        }
    }

    /// The router's namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl PartialEq for RouterId {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.kind == other.kind
    }
}

impl Eq for RouterId {}

impl PartialOrd for RouterId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouterId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl Hash for RouterId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Debug for RouterId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("RouterId").field(&self.namespace).finish()
    }
}

impl fmt::Display for RouterId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.namespace)
    }
}

/// An application message, produced by a subscription tagger and opaque to
/// the router carrying it.
#[derive(Clone)]
pub struct AppMsg {
    message: Option<Arc<dyn Any + Send + Sync>>,
}

impl AppMsg {
    pub(crate) fn new<M>(message: M) -> Self
    where
        M: Any + Send + Sync,
    {
        Self {
            message: Some(Arc::new(message)),
        }
    }

    /// A message no program can receive. Produced when a payload did not
    /// have the type its tagger expected.
    pub(crate) const fn unroutable() -> Self {
        Self { message: None }
    }

    pub(crate) fn into_message<M>(self) -> Option<M>
    where
        M: Any + Clone + Send + Sync,
    {
        let shared = self.message?.downcast::<M>().ok()?;
        Some(Arc::try_unwrap(shared).unwrap_or_else(|shared| (*shared).clone()))
    }
}

impl fmt::Debug for AppMsg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppMsg")
            .field("routable", &self.message.is_some())
            .finish()
    }
}

/// A subscription leaf as seen by its router: the key plus a way to turn a
/// payload into an application message.
pub struct Effect<P> {
    key: SubKey,
    tagger: Arc<dyn Fn(P) -> AppMsg + Send + Sync>,
}

impl<P> Clone for Effect<P> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            tagger: Arc::clone(&self.tagger),
        }
    }
}

impl<P> Effect<P> {
    pub(crate) fn new<F>(key: SubKey, tagger: F) -> Self
    where
        F: Fn(P) -> AppMsg + Send + Sync + 'static,
    {
        Self {
            key,
            tagger: Arc::new(tagger),
        }
    }

    /// Key of the subscription.
    pub fn key(&self) -> &SubKey {
        &self.key
    }

    /// Wraps `payload` into the subscriber's message.
    pub fn tag(&self, payload: P) -> AppMsg {
        (self.tagger)(payload)
    }
}

impl<P> fmt::Debug for Effect<P> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Effect").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn app_msg_round_trips_its_type() {
        let message = AppMsg::new(String::from("hello"));
        assert_eq!(message.clone().into_message::<String>().as_deref(), Some("hello"));
        assert_eq!(message.into_message::<u32>(), None);
    }

    #[rstest]
    fn unroutable_never_yields_a_message() {
        assert_eq!(AppMsg::unroutable().into_message::<String>(), None);
    }

    #[rstest]
    fn effect_tag_goes_through_tagger() {
        let effect: Effect<u8> = Effect::new(SubKey::new("k"), |n| AppMsg::new(u32::from(n) * 2));
        assert_eq!(effect.key().as_str(), "k");
        assert_eq!(effect.tag(21).into_message::<u32>(), Some(42));
    }
}
