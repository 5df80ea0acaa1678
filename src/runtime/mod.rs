//! The program runtime.
//!
//! A [`Program`] bundles three pure functions:
//!
//! - `init(flags) -> (model, cmd)`,
//! - `update(msg, &model) -> (model, cmd)`,
//! - `subscriptions(&model) -> sub`.
//!
//! [`Program::init`] spawns a *driver* task on the current tokio runtime and
//! returns a [`Handle`]. The driver owns the model and the router states
//! and handles one envelope at a time, so updates never overlap.
//!
//! For every message the driver
//!
//! 1. calls `update`,
//! 2. hands the routers the subscriptions of the new model,
//! 3. if the model changed (`!Arc::ptr_eq`), stores it and notifies the
//!    listeners in registration order,
//! 4. starts every Task of the returned command. Each Task posts its message
//!    back into the mailbox when it completes.
//!
//! Returning the very same `Arc` from `update` signals "no change": no
//! listener is called, but subscriptions are still reconciled.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use teaflow::prelude::*;
//!
//! #[derive(Clone)]
//! enum Msg {
//!     Increment,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let program = Program::worker(
//!         |()| (0_u32, Cmd::none()),
//!         |Msg::Increment, model: &Arc<u32>| (Arc::new(**model + 1), Cmd::none()),
//!         |_| Sub::none(),
//!     );
//!     let handle = program.init(());
//!     handle.dispatch(Msg::Increment).unwrap();
//!     handle.settled().await;
//!     assert_eq!(*handle.get_model(), 1);
//! }
//! ```

mod config;
mod driver;
mod handle;
mod registry;

use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use crate::cmd::Cmd;
use crate::sub::Sub;

pub use config::ProgramConfig;
pub(crate) use driver::in_driver_turn;
pub use handle::{Handle, Listener};

use driver::{Driver, Mailbox};
use handle::{Shared, Tracker};

type Init<Flags, Model, Msg> = Arc<dyn Fn(Flags) -> (Model, Cmd<Msg>) + Send + Sync>;
pub(crate) type Update<Model, Msg> = Arc<dyn Fn(Msg, &Arc<Model>) -> (Arc<Model>, Cmd<Msg>) + Send + Sync>;
pub(crate) type Subscriptions<Model, Msg> = Arc<dyn Fn(&Model) -> Sub<Msg> + Send + Sync>;

/// A headless program: model, update and subscriptions, no view.
///
/// # Type Parameters
///
/// - `Flags`: input of `init`.
/// - `Model`: application state, shared as `Arc<Model>`.
/// - `Msg`: application message. Messages from subscriptions are fanned out
///   through routers, hence `Clone + Sync`.
pub struct Program<Flags, Model, Msg> {
    init: Init<Flags, Model, Msg>,
    update: Update<Model, Msg>,
    subscriptions: Subscriptions<Model, Msg>,
    config: ProgramConfig,
}

impl<Flags, Model, Msg> Clone for Program<Flags, Model, Msg> {
    fn clone(&self) -> Self {
        Self {
            init: Arc::clone(&self.init),
            update: Arc::clone(&self.update),
            subscriptions: Arc::clone(&self.subscriptions),
            config: self.config.clone(),
        }
    }
}

impl<Flags, Model, Msg> fmt::Debug for Program<Flags, Model, Msg> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Program")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<Flags, Model, Msg> Program<Flags, Model, Msg>
where
    Flags: 'static,
    Model: Send + Sync + 'static,
    Msg: Clone + Send + Sync + 'static,
{
    /// Creates a program from its three functions.
    ///
    /// # Arguments
    ///
    /// * `init` - Builds the initial model and command from the flags.
    /// * `update` - Handles one message. Return `Arc::clone(model)` to keep
    ///   the model unchanged.
    /// * `subscriptions` - The subscriptions wanted for a model. Called after
    ///   `init` and after every update.
    pub fn worker<I, U, S>(init: I, update: U, subscriptions: S) -> Self
    where
        I: Fn(Flags) -> (Model, Cmd<Msg>) + Send + Sync + 'static,
        U: Fn(Msg, &Arc<Model>) -> (Arc<Model>, Cmd<Msg>) + Send + Sync + 'static,
        S: Fn(&Model) -> Sub<Msg> + Send + Sync + 'static,
    {
        Self {
            init: Arc::new(init),
            update: Arc::new(update),
            subscriptions: Arc::new(subscriptions),
            config: ProgramConfig::default(),
        }
    }

    /// Replaces the program's configuration.
    #[must_use]
    pub fn with_config(mut self, config: ProgramConfig) -> Self {
        self.config = config;
        self
    }

    /// The program's configuration.
    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    /// Starts the program.
    ///
    /// Must be called from within a tokio runtime. The initial command and
    /// subscriptions are handled before any dispatched message.
    pub fn init(&self, flags: Flags) -> Handle<Model, Msg> {
        let (model, initial) = (self.init)(flags);

        let tracker = Arc::new(Tracker::default());
        let bootstrap = tracker.begin();
        let shared = Arc::new(Shared::new(self.config.name.clone(), model, Arc::clone(&tracker)));
        let (mailbox, inbox) = Mailbox::channel(tracker);

        let driver = Driver::new(
            Arc::clone(&self.update),
            Arc::clone(&self.subscriptions),
            Arc::clone(&shared),
            mailbox.clone(),
            self.config.yield_every,
        );
        let span = tracing::info_span!("program", name = %self.config.name);
        tokio::spawn(driver.run(initial, inbox, bootstrap).instrument(span));

        Handle::new(shared, mailbox)
    }
}
