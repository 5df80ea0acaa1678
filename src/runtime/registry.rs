use std::collections::BTreeMap;
use std::sync::Arc;

use super::driver::driver_turn;
use crate::router::manager::{AnyPayload, AnyState, ErasedEffect, Manager};
use crate::router::{Outbox, RouterId};
use crate::sub::Sub;

struct Entry {
    manager: Arc<dyn Manager>,
    state: Option<AnyState>,
}

/// The routers a program has used so far, with their states.
///
/// An entry is created the first time a subscription addresses a router and
/// is kept for the lifetime of the program, so a router that loses all its
/// subscriptions still sees an empty effect list on the next reconcile.
#[derive(Default)]
pub(crate) struct Registry {
    entries: BTreeMap<RouterId, Entry>,
}

struct Bag {
    manager: Arc<dyn Manager>,
    effects: Vec<ErasedEffect>,
}

impl Registry {
    /// Hands every router the subscription leaves addressed to it.
    ///
    /// Known routers are reconciled first, in router order, then routers
    /// seen for the first time are initialised and reconciled.
    pub(crate) async fn reconcile<Msg>(&mut self, subscriptions: Sub<Msg>, outbox: &Outbox)
    where
        Msg: Send + Sync + 'static,
    {
        let mut bags: BTreeMap<RouterId, Bag> = BTreeMap::new();
        for descriptor in subscriptions.to_effects() {
            let (manager, effect) = descriptor.into_erased();
            let id = manager.id().clone();
            bags.entry(id)
                .or_insert_with(|| Bag {
                    manager,
                    effects: Vec::new(),
                })
                .effects
                .push(effect);
        }

        let mut plan: Vec<(RouterId, Vec<ErasedEffect>)> = Vec::with_capacity(self.entries.len() + bags.len());
        for id in self.entries.keys() {
            let effects = bags.remove(id).map(|bag| bag.effects).unwrap_or_default();
            plan.push((id.clone(), effects));
        }
        for (id, bag) in bags {
            tracing::debug!(router = %id, "initialising router");
            let init = bag.manager.init();
            let state = driver_turn(init.run_safe()).await;
            self.entries.insert(
                id.clone(),
                Entry {
                    manager: bag.manager,
                    state: Some(state),
                },
            );
            plan.push((id, bag.effects));
        }

        for (id, effects) in plan {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            let Some(state) = entry.state.take() else {
                continue;
            };
            tracing::trace!(router = %id, effects = effects.len(), "reconciling router");
            let transition = entry.manager.on_effects(outbox.clone(), effects, state);
            entry.state = Some(driver_turn(transition.run_safe()).await);
        }
    }

    /// Runs a router's `on_self_msg` against its latest state.
    pub(crate) async fn deliver(&mut self, id: &RouterId, message: AnyPayload, outbox: &Outbox) {
        let Some(entry) = self.entries.get_mut(id) else {
            tracing::warn!(router = %id, "self message for a router this program never used");
            return;
        };
        let Some(state) = entry.state.take() else {
            return;
        };
        let transition = entry.manager.on_self_msg(outbox.clone(), message, state);
        entry.state = Some(driver_turn(transition.run_safe()).await);
    }

    #[cfg(test)]
    fn state_of<S: Clone + Send + Sync + 'static>(&self, id: &RouterId) -> Option<S> {
        let state = Arc::clone(self.entries.get(id)?.state.as_ref()?);
        state.downcast::<S>().ok().map(Arc::unwrap_or_clone)
    }
}
