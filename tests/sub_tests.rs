//! Integration tests for `Sub`: batching, mapping and flattening into
//! descriptors.

use rstest::rstest;
use teaflow::prelude::*;

/// A router that never produces anything; enough to build subscriptions.
struct Inert(&'static str);

impl Router for Inert {
    type Payload = u8;
    type SelfMsg = ();
    type State = ();

    fn namespace(&self) -> &str {
        self.0
    }

    fn init(&self) -> Task<Never, ()> {
        Task::succeed(())
    }

    fn on_effects(&self, _router: &RouterContext<()>, _effects: Vec<Effect<u8>>, state: ()) -> Task<Never, ()> {
        Task::succeed(state)
    }

    fn on_self_msg(&self, _router: &RouterContext<()>, _message: (), state: ()) -> Task<Never, ()> {
        Task::succeed(state)
    }
}

fn leaf(namespace: &'static str, key: &str) -> Sub<u8> {
    Sub::single(Inert(namespace), SubKey::new(key), |payload| payload)
}

fn keys<Msg: Send + 'static>(sub: Sub<Msg>) -> Vec<(String, String)> {
    sub.to_effects()
        .iter()
        .map(|descriptor| (descriptor.namespace().to_string(), descriptor.key().to_string()))
        .collect()
}

#[rstest]
fn test_none_has_no_effects() {
    assert!(Sub::<u8>::none().is_none());
    assert!(Sub::<u8>::none().to_effects().is_empty());
}

#[rstest]
fn test_batch_flattens_in_order() {
    let sub = Sub::batch([
        leaf("a", "1"),
        Sub::none(),
        Sub::batch([leaf("b", "2"), leaf("a", "3")]),
    ]);
    assert_eq!(
        keys(sub),
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ]
    );
}

#[rstest]
fn test_batch_of_one_is_that_one() {
    let sub = Sub::batch([Sub::none(), leaf("a", "only")]);
    assert!(!sub.is_none());
    assert_eq!(keys(sub).len(), 1);
}

#[rstest]
fn test_map_preserves_keys_and_routers() {
    let original = Sub::batch([leaf("a", "1"), leaf("b", "2")]);
    let before = keys(original.clone());

    let mapped = original.map(|n| format!("got {n}")).map(|s| s.len());

    assert_eq!(keys(mapped), before);
}

#[rstest]
fn test_descriptor_router_identity() {
    let descriptors = Sub::batch([leaf("a", "1"), leaf("a", "2"), leaf("b", "3")]).to_effects();
    assert_eq!(descriptors[0].router_id(), descriptors[1].router_id());
    assert_ne!(descriptors[0].router_id(), descriptors[2].router_id());
}

#[rstest]
fn test_default_is_none() {
    assert!(Sub::<u8>::default().is_none());
}
