//! The program driver: the single task that owns the model and the router
//! states, and handles envelopes one at a time.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::handle::{Pending, Shared, Tracker};
use super::registry::Registry;
use super::{Subscriptions, Update};
use crate::cmd::Cmd;
use crate::router::{Outbox, RouterSignal};

tokio::task_local! {
    static DRIVER_TURN: ();
}

/// Whether the current task is a driver handling an envelope.
pub(crate) fn in_driver_turn() -> bool {
    DRIVER_TURN.try_with(|()| ()).is_ok()
}

/// Runs `future` as part of the driver's current turn.
pub(crate) async fn driver_turn<F: Future>(future: F) -> F::Output {
    DRIVER_TURN.scope((), future).await
}

pub(crate) enum Signal<Msg> {
    Dispatch(Msg),
    Router(RouterSignal),
}

impl<Msg> Signal<Msg> {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Dispatch(_) => "dispatch",
            Self::Router(RouterSignal::ToApp(_)) => "to_app",
            Self::Router(RouterSignal::ToSelf { .. }) => "to_self",
        }
    }
}

pub(crate) struct Envelope<Msg> {
    signal: Signal<Msg>,
    pending: Pending,
}

/// Posting end of a program's mailbox.
pub(crate) struct Mailbox<Msg> {
    sender: mpsc::UnboundedSender<Envelope<Msg>>,
    tracker: Arc<Tracker>,
}

impl<Msg> Clone for Mailbox<Msg> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<Msg> Mailbox<Msg>
where
    Msg: Send + 'static,
{
    pub(crate) fn channel(tracker: Arc<Tracker>) -> (Self, mpsc::UnboundedReceiver<Envelope<Msg>>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender, tracker }, receiver)
    }

    /// Returns `false` if the driver is gone.
    pub(crate) fn post(&self, signal: Signal<Msg>) -> bool {
        let pending = self.tracker.begin();
        self.sender.send(Envelope { signal, pending }).is_ok()
    }

    pub(crate) fn outbox(&self) -> Outbox {
        let mailbox = self.clone();
        Outbox::new(move |signal| mailbox.post(Signal::Router(signal)))
    }
}

pub(crate) struct Driver<Model, Msg> {
    update: Update<Model, Msg>,
    subscriptions: Subscriptions<Model, Msg>,
    shared: Arc<Shared<Model>>,
    mailbox: Mailbox<Msg>,
    outbox: Outbox,
    registry: Registry,
    yield_every: usize,
}

impl<Model, Msg> Driver<Model, Msg>
where
    Model: Send + Sync + 'static,
    Msg: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        update: Update<Model, Msg>,
        subscriptions: Subscriptions<Model, Msg>,
        shared: Arc<Shared<Model>>,
        mailbox: Mailbox<Msg>,
        yield_every: usize,
    ) -> Self {
        let outbox = mailbox.outbox();
        Self {
            update,
            subscriptions,
            shared,
            mailbox,
            outbox,
            registry: Registry::default(),
            yield_every,
        }
    }

    /// Runs the initial command and subscriptions, then handles envelopes
    /// for as long as the hosting tokio runtime lives.
    pub(crate) async fn run(
        mut self,
        initial: Cmd<Msg>,
        mut inbox: mpsc::UnboundedReceiver<Envelope<Msg>>,
        bootstrap: Pending,
    ) {
        let model = self.shared.model();
        self.execute(initial);
        self.reconcile(&model).await;
        drop(bootstrap);
        tracing::debug!("program started");

        let mut streak = 0;
        while let Some(Envelope { signal, pending }) = inbox.recv().await {
            self.handle(signal).await;
            drop(pending);

            streak += 1;
            if self.yield_every > 0 && streak >= self.yield_every {
                streak = 0;
                tokio::task::yield_now().await;
            }
        }
        tracing::debug!("program stopped");
    }

    async fn handle(&mut self, signal: Signal<Msg>) {
        tracing::trace!(kind = signal.kind(), "handling envelope");
        match signal {
            Signal::Dispatch(message) => self.apply(message).await,
            Signal::Router(RouterSignal::ToApp(message)) => match message.into_message::<Msg>() {
                Some(message) => self.apply(message).await,
                None => tracing::error!("subscription produced a message of another program; dropping it"),
            },
            Signal::Router(RouterSignal::ToSelf {
                router,
                message,
                ack,
            }) => {
                self.registry.deliver(&router, message, &self.outbox).await;
                if let Some(ack) = ack {
                    // The sender may have been killed in the meantime.
                    let _ = ack.send(());
                }
            }
        }
    }

    async fn apply(&mut self, message: Msg) {
        let current = self.shared.model();
        let (next, cmd) = (self.update)(message, &current);

        self.reconcile(&next).await;

        if Arc::ptr_eq(&current, &next) {
            tracing::trace!("model unchanged");
        } else {
            self.shared.replace(Arc::clone(&next));
            self.shared.notify(&next);
            tracing::debug!("model updated");
        }

        self.execute(cmd);
    }

    async fn reconcile(&mut self, model: &Model) {
        let subscriptions = (self.subscriptions)(model);
        self.registry.reconcile(subscriptions, &self.outbox).await;
    }

    fn execute(&self, cmd: Cmd<Msg>) {
        let tasks = cmd.execute();
        if !tasks.is_empty() {
            tracing::trace!(tasks = tasks.len(), "executing command");
        }
        for task in tasks {
            let mailbox = self.mailbox.clone();
            let pending = self.shared.tracker().begin();
            tokio::spawn(async move {
                let message = task.run_safe().await;
                if !mailbox.post(Signal::Dispatch(message)) {
                    tracing::warn!("program stopped; command result dropped");
                }
                drop(pending);
            });
        }
    }
}
