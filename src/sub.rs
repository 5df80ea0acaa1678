//! `Sub` - declarative subscriptions to external event sources.
//!
//! A [`Sub`] names *what* the application wants to listen to, never *how*.
//! After every update the runtime asks the program for its current
//! subscriptions, flattens them into [`Descriptor`]s and hands each router
//! the descriptors addressed to it. The router diffs them against what it
//! is already doing.
//!
//! A leaf is identified by the pair (router, [`SubKey`]). Two leaves with
//! equal keys on the same router describe the same underlying source; the
//! router decides how to share it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::KeyError;
use crate::router::manager::{ErasedEffect, Managed, Manager};
use crate::router::{AppMsg, Router, RouterId};

/// Stable identity of a subscription within its router.
///
/// Keys are either free-form strings ([`SubKey::new`]) or the canonical
/// JSON encoding of a serializable configuration ([`SubKey::encode`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubKey(Arc<str>);

impl SubKey {
    /// Creates a key from an arbitrary string.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Encodes a configuration value into a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Encode`] if `config` cannot be serialized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde::{Deserialize, Serialize};
    /// use teaflow::sub::SubKey;
    ///
    /// #[derive(Debug, PartialEq, Serialize, Deserialize)]
    /// struct Feed {
    ///     channel: String,
    /// }
    ///
    /// let key = SubKey::encode(&Feed { channel: "news".into() }).unwrap();
    /// assert_eq!(key.as_str(), r#"{"channel":"news"}"#);
    /// assert_eq!(key.decode::<Feed>().unwrap(), Feed { channel: "news".into() });
    /// ```
    pub fn encode<C>(config: &C) -> Result<Self, KeyError>
    where
        C: Serialize + ?Sized,
    {
        serde_json::to_string(config)
            .map(Self::new)
            .map_err(KeyError::Encode)
    }

    /// Decodes the configuration a key was encoded from.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Decode`] if the key does not hold a `C`.
    pub fn decode<C>(&self) -> Result<C, KeyError>
    where
        C: DeserializeOwned,
    {
        serde_json::from_str(&self.0).map_err(|source| KeyError::Decode {
            key: self.0.to_string(),
            source,
        })
    }

    /// The raw key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

type Payload = Box<dyn Any + Send>;
type Tagger<Msg> = Arc<dyn Fn(Payload) -> Option<Msg> + Send + Sync>;

/// A subscription producing messages of type `Msg`.
pub struct Sub<Msg> {
    node: Node<Msg>,
}

enum Node<Msg> {
    None,
    Single(Descriptor<Msg>),
    Batch(Vec<Sub<Msg>>),
}

/// One flattened subscription leaf: which router, which key, and how the
/// router's payloads become application messages.
pub struct Descriptor<Msg> {
    manager: Arc<dyn Manager>,
    key: SubKey,
    tagger: Tagger<Msg>,
}

impl<Msg> Descriptor<Msg> {
    /// Namespace of the addressed router.
    pub fn namespace(&self) -> &str {
        self.manager.id().namespace()
    }

    /// Identity of the addressed router.
    pub fn router_id(&self) -> &RouterId {
        self.manager.id()
    }

    /// Key of the subscription within its router.
    pub fn key(&self) -> &SubKey {
        &self.key
    }
}

impl<Msg> Descriptor<Msg>
where
    Msg: Send + Sync + 'static,
{
    pub(crate) fn into_erased(self) -> (Arc<dyn Manager>, ErasedEffect) {
        let tagger = self.tagger;
        let effect = ErasedEffect::new(self.key, move |payload| {
            tagger(payload).map_or_else(AppMsg::unroutable, AppMsg::new)
        });
        (self.manager, effect)
    }
}

impl<Msg> Clone for Descriptor<Msg> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            key: self.key.clone(),
            tagger: Arc::clone(&self.tagger),
        }
    }
}

impl<Msg> fmt::Debug for Descriptor<Msg> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Descriptor")
            .field("router", self.router_id())
            .field("key", &self.key)
            .finish()
    }
}

impl<Msg> Clone for Sub<Msg> {
    fn clone(&self) -> Self {
        let node = match &self.node {
            Node::None => Node::None,
            Node::Single(descriptor) => Node::Single(descriptor.clone()),
            Node::Batch(subs) => Node::Batch(subs.clone()),
        };
        Self { node }
    }
}

impl<Msg> Default for Sub<Msg> {
    fn default() -> Self {
        Self { node: Node::None }
    }
}

impl<Msg> Sub<Msg>
where
    Msg: Send + 'static,
{
    /// The empty subscription.
    pub const fn none() -> Self {
        Self { node: Node::None }
    }

    /// A single subscription on `router`, identified by `key`.
    ///
    /// `tagger` turns each payload the router delivers for this key into an
    /// application message. Routers use this to build their public
    /// subscription functions, e.g. [`time::every`](crate::router::time::every).
    pub fn single<R, F>(router: R, key: SubKey, tagger: F) -> Self
    where
        R: Router,
        F: Fn(R::Payload) -> Msg + Send + Sync + 'static,
    {
        let tagger: Tagger<Msg> = Arc::new(move |payload: Payload| {
            payload
                .downcast::<R::Payload>()
                .ok()
                .map(|payload| tagger(*payload))
        });
        Self {
            node: Node::Single(Descriptor {
                manager: Managed::shared(router),
                key,
                tagger,
            }),
        }
    }

    /// Combines several subscriptions into one.
    pub fn batch<I>(subs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut members: Vec<Self> = subs.into_iter().filter(|sub| !sub.is_none()).collect();
        if members.len() <= 1 {
            return members.pop().unwrap_or_else(Self::none);
        }
        Self {
            node: Node::Batch(members),
        }
    }

    /// Transforms every message the subscription will produce.
    ///
    /// Keys and routers are preserved, so mapping a subscription never
    /// restarts its source.
    pub fn map<Msg2, F>(self, function: F) -> Sub<Msg2>
    where
        F: Fn(Msg) -> Msg2 + Send + Sync + 'static,
        Msg2: Send + 'static,
    {
        let function: Arc<dyn Fn(Msg) -> Msg2 + Send + Sync> = Arc::new(function);
        self.map_shared(&function)
    }

    fn map_shared<Msg2>(self, function: &Arc<dyn Fn(Msg) -> Msg2 + Send + Sync>) -> Sub<Msg2>
    where
        Msg2: Send + 'static,
    {
        match self.node {
            Node::None => Sub::none(),
            Node::Single(Descriptor {
                manager,
                key,
                tagger,
            }) => {
                let function = Arc::clone(function);
                let tagger: Tagger<Msg2> =
                    Arc::new(move |payload| tagger(payload).map(|message| function(message)));
                Sub {
                    node: Node::Single(Descriptor {
                        manager,
                        key,
                        tagger,
                    }),
                }
            }
            Node::Batch(subs) => Sub {
                node: Node::Batch(subs.into_iter().map(|sub| sub.map_shared(function)).collect()),
            },
        }
    }

    /// Whether the subscription is empty.
    pub const fn is_none(&self) -> bool {
        matches!(self.node, Node::None)
    }

    /// Flattens the subscription into its leaves, in batch order.
    pub fn to_effects(self) -> Vec<Descriptor<Msg>> {
        let mut descriptors = Vec::new();
        self.flatten_into(&mut descriptors);
        descriptors
    }

    fn flatten_into(self, descriptors: &mut Vec<Descriptor<Msg>>) {
        match self.node {
            Node::None => {}
            Node::Single(descriptor) => descriptors.push(descriptor),
            Node::Batch(subs) => {
                for sub in subs {
                    sub.flatten_into(descriptors);
                }
            }
        }
    }
}

impl<Msg> fmt::Debug for Sub<Msg> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::None => formatter.write_str("Sub::None"),
            Node::Single(descriptor) => fmt::Debug::fmt(descriptor, formatter),
            Node::Batch(subs) => formatter.debug_list().entries(subs).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Every {
        millis: u64,
    }

    #[rstest]
    fn key_encoding_is_stable() {
        let first = SubKey::encode(&Every { millis: 100 }).unwrap();
        let second = SubKey::encode(&Every { millis: 100 }).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), r#"{"millis":100}"#);
    }

    #[rstest]
    fn decode_of_foreign_key_fails() {
        let key = SubKey::new("plain");
        assert!(matches!(key.decode::<Every>(), Err(KeyError::Decode { .. })));
    }

    #[rstest]
    fn empty_batch_is_none() {
        let sub: Sub<u8> = Sub::batch(Vec::new());
        assert!(sub.is_none());
        assert!(sub.to_effects().is_empty());
    }
}
