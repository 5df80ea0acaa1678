use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::oneshot;

use super::{AppMsg, RouterId};
use crate::runtime::in_driver_turn;
use crate::task::{Never, Task};

/// What a router can ask of the runtime driver.
pub(crate) enum RouterSignal {
    ToApp(AppMsg),
    ToSelf {
        router: RouterId,
        message: Box<dyn Any + Send>,
        ack: Option<oneshot::Sender<()>>,
    },
}

impl fmt::Debug for RouterSignal {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToApp(message) => formatter.debug_tuple("ToApp").field(message).finish(),
            Self::ToSelf { router, ack, .. } => formatter
                .debug_struct("ToSelf")
                .field("router", router)
                .field("acked", &ack.is_some())
                .finish_non_exhaustive(),
        }
    }
}

/// Posting end of the driver mailbox, shared by every router of a program.
#[derive(Clone)]
pub(crate) struct Outbox {
    post: Arc<dyn Fn(RouterSignal) -> bool + Send + Sync>,
}

impl Outbox {
    pub(crate) fn new<F>(post: F) -> Self
    where
        F: Fn(RouterSignal) -> bool + Send + Sync + 'static,
    {
        Self {
            post: Arc::new(post),
        }
    }

    /// Whether both outboxes post into the same program's mailbox.
    pub(crate) fn same_program(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.post, &other.post)
    }

    /// Returns `false` if the program is no longer running.
    pub(crate) fn post(&self, signal: RouterSignal) -> bool {
        (self.post)(signal)
    }

    #[cfg(test)]
    pub(crate) fn collecting() -> (Self, tokio::sync::mpsc::UnboundedReceiver<RouterSignal>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self::new(move |signal| sender.send(signal).is_ok()), receiver)
    }
}

/// A router's view of the program it runs in.
///
/// Handed to every [`Router`](super::Router) callback; clone it into
/// background Tasks that need to report back.
pub struct RouterContext<S> {
    id: RouterId,
    outbox: Outbox,
    _self_msg: PhantomData<fn(S)>,
}

impl<S> Clone for RouterContext<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            outbox: self.outbox.clone(),
            _self_msg: PhantomData,
        }
    }
}

impl<S> fmt::Debug for RouterContext<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RouterContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<S> RouterContext<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub(crate) const fn new(id: RouterId, outbox: Outbox) -> Self {
        Self {
            id,
            outbox,
            _self_msg: PhantomData,
        }
    }

    /// Identity of the router this context belongs to.
    pub fn id(&self) -> &RouterId {
        &self.id
    }

    /// A Task that enqueues `message` into the program's mailbox.
    ///
    /// The message is handled like any dispatched message: it goes through
    /// the update function in arrival order.
    pub fn send_to_app(&self, message: AppMsg) -> Task<Never, ()> {
        let outbox = self.outbox.clone();
        let id = self.id.clone();
        Task::from_async(move || {
            let outbox = outbox.clone();
            let id = id.clone();
            let message = message.clone();
            async move {
                if !outbox.post(RouterSignal::ToApp(message)) {
                    tracing::warn!(router = %id, "program stopped; message to app dropped");
                }
                Ok(())
            }
        })
    }

    /// A Task that delivers `message` to the router's own
    /// [`on_self_msg`](super::Router::on_self_msg).
    ///
    /// From background work the Task completes once the driver has stored
    /// the state produced by `on_self_msg`. From inside a router callback
    /// (which already runs on the driver) it only enqueues the message.
    pub fn send_to_self(&self, message: S) -> Task<Never, ()> {
        let context = self.clone();
        Task::from_async(move || {
            let context = context.clone();
            let message = message.clone();
            async move {
                context.deliver_to_self(message).await;
                Ok(())
            }
        })
    }

    /// Whether both contexts belong to the same running program.
    pub(crate) fn same_program(&self, other: &Self) -> bool {
        self.outbox.same_program(&other.outbox)
    }

    pub(crate) fn post_to_self(&self, message: S) -> bool {
        self.outbox.post(RouterSignal::ToSelf {
            router: self.id.clone(),
            message: Box::new(message),
            ack: None,
        })
    }

    async fn deliver_to_self(&self, message: S) {
        if in_driver_turn() {
            if !self.post_to_self(message) {
                tracing::warn!(router = %self.id, "program stopped; self message dropped");
            }
            return;
        }
        let (ack, acked) = oneshot::channel();
        let posted = self.outbox.post(RouterSignal::ToSelf {
            router: self.id.clone(),
            message: Box::new(message),
            ack: Some(ack),
        });
        if !posted || acked.await.is_err() {
            tracing::warn!(router = %self.id, "program stopped; self message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sub::SubKey;
    use rstest::rstest;

    struct Echo;

    impl super::super::Router for Echo {
        type Payload = u8;
        type SelfMsg = u8;
        type State = ();

        fn namespace(&self) -> &str {
            "echo"
        }

        fn init(&self) -> Task<Never, ()> {
            Task::succeed(())
        }

        fn on_effects(
            &self,
            _router: &RouterContext<u8>,
            _effects: Vec<super::super::Effect<u8>>,
            state: (),
        ) -> Task<Never, ()> {
            Task::succeed(state)
        }

        fn on_self_msg(&self, _router: &RouterContext<u8>, _message: u8, state: ()) -> Task<Never, ()> {
            Task::succeed(state)
        }
    }

    #[rstest]
    #[tokio::test]
    async fn send_to_app_posts_on_execution_only() {
        let (outbox, mut signals) = Outbox::collecting();
        let context = RouterContext::<u8>::new(RouterId::of(&Echo), outbox);
        let effect = super::super::Effect::new(SubKey::new("k"), |n: u8| AppMsg::new(n));

        let task = context.send_to_app(effect.tag(3));
        assert!(signals.try_recv().is_err());

        task.run_safe().await;
        task.run_safe().await;

        for _ in 0..2 {
            match signals.try_recv() {
                Ok(RouterSignal::ToApp(message)) => assert_eq!(message.into_message::<u8>(), Some(3)),
                other => panic!("unexpected signal: {other:?}"),
            }
        }
    }

    #[rstest]
    #[tokio::test]
    async fn send_to_self_waits_for_ack_outside_driver() {
        let (outbox, mut signals) = Outbox::collecting();
        let context = RouterContext::<u8>::new(RouterId::of(&Echo), outbox);

        let pending = tokio::spawn({
            let context = context.clone();
            async move { context.send_to_self(9).run_safe().await }
        });

        match signals.recv().await {
            Some(RouterSignal::ToSelf { router, message, ack }) => {
                assert_eq!(router.namespace(), "echo");
                assert_eq!(message.downcast::<u8>().ok().map(|m| *m), Some(9));
                assert!(!pending.is_finished());
                ack.expect("outside the driver an ack is requested").send(()).unwrap();
            }
            other => panic!("unexpected signal: {other:?}"),
        }
        pending.await.unwrap();
    }

    #[rstest]
    fn clones_belong_to_the_same_program() {
        let (outbox, _signals) = Outbox::collecting();
        let (other, _other_signals) = Outbox::collecting();
        let context = RouterContext::<u8>::new(RouterId::of(&Echo), outbox);

        assert!(context.same_program(&context.clone()));
        assert!(!context.same_program(&RouterContext::new(RouterId::of(&Echo), other)));
    }
}
