//! Type-erased view of a [`Router`], as stored in a program's registry.

use std::any::Any;
use std::sync::Arc;

use super::{AppMsg, Effect, Outbox, Router, RouterContext, RouterId};
use crate::sub::SubKey;
use crate::task::{Never, Task};

pub(crate) type AnyState = Arc<dyn Any + Send + Sync>;
pub(crate) type AnyPayload = Box<dyn Any + Send>;

/// An effect whose payload type has been erased.
pub(crate) struct ErasedEffect {
    key: SubKey,
    tagger: Arc<dyn Fn(AnyPayload) -> AppMsg + Send + Sync>,
}

impl ErasedEffect {
    pub(crate) fn new<F>(key: SubKey, tagger: F) -> Self
    where
        F: Fn(AnyPayload) -> AppMsg + Send + Sync + 'static,
    {
        Self {
            key,
            tagger: Arc::new(tagger),
        }
    }

    fn restore<P>(self) -> Effect<P>
    where
        P: Send + 'static,
    {
        let tagger = self.tagger;
        Effect::new(self.key, move |payload: P| tagger(Box::new(payload)))
    }
}

pub(crate) trait Manager: Send + Sync {
    fn id(&self) -> &RouterId;

    fn init(&self) -> Task<Never, AnyState>;

    fn on_effects(&self, outbox: Outbox, effects: Vec<ErasedEffect>, state: AnyState) -> Task<Never, AnyState>;

    fn on_self_msg(&self, outbox: Outbox, message: AnyPayload, state: AnyState) -> Task<Never, AnyState>;
}

pub(crate) struct Managed<R> {
    id: RouterId,
    router: R,
}

impl<R: Router> Managed<R> {
    pub(crate) fn shared(router: R) -> Arc<dyn Manager> {
        Arc::new(Self {
            id: RouterId::of(&router),
            router,
        })
    }

    fn context(&self, outbox: Outbox) -> RouterContext<R::SelfMsg> {
        RouterContext::new(self.id.clone(), outbox)
    }

    fn erase(state: R::State) -> AnyState {
        Arc::new(state)
    }
}

impl<R: Router> Manager for Managed<R> {
    fn id(&self) -> &RouterId {
        &self.id
    }

    fn init(&self) -> Task<Never, AnyState> {
        self.router.init().map(Self::erase)
    }

    fn on_effects(&self, outbox: Outbox, effects: Vec<ErasedEffect>, state: AnyState) -> Task<Never, AnyState> {
        let Ok(state) = state.downcast::<R::State>() else {
            tracing::error!(router = %self.id, "router state has an unexpected type; reinitialising");
            return self.init();
        };
        let effects = effects.into_iter().map(ErasedEffect::restore).collect();
        self.router
            .on_effects(&self.context(outbox), effects, Arc::unwrap_or_clone(state))
            .map(Self::erase)
    }

    fn on_self_msg(&self, outbox: Outbox, message: AnyPayload, state: AnyState) -> Task<Never, AnyState> {
        let Ok(message) = message.downcast::<R::SelfMsg>() else {
            tracing::error!(router = %self.id, "self message has an unexpected type; dropping it");
            return Task::succeed(state);
        };
        let Ok(state) = state.downcast::<R::State>() else {
            tracing::error!(router = %self.id, "router state has an unexpected type; reinitialising");
            return self.init();
        };
        self.router
            .on_self_msg(&self.context(outbox), *message, Arc::unwrap_or_clone(state))
            .map(Self::erase)
    }
}
