//! # teaflow
//!
//! An Elm-inspired effect runtime for tokio.
//!
//! ## Overview
//!
//! Application logic is written as pure functions over an immutable model;
//! every side effect is *described* as a value and handed to the runtime:
//!
//! - **Tasks**: cold, re-executable, cancellable async computations
//!   ([`task::Task`]) with `map`/`chain`/`on_error` combinators
//! - **Processes**: handles to spawned Tasks that can be killed
//!   ([`task::Process`])
//! - **Commands**: bags of Tasks whose results come back as messages
//!   ([`cmd::Cmd`])
//! - **Subscriptions**: declarative interest in external event sources
//!   ([`sub::Sub`])
//! - **Routers**: effect managers that own those sources and diff the
//!   subscriptions against what they are running ([`router::Router`])
//! - **Runtime**: the driver serializing messages, updates and router state
//!   transitions ([`runtime::Program`])
//!
//! ## Feature Flags
//!
//! - `time`: the time router ([`router::time`])
//! - `port`: inbound ports ([`router::port`])
//!
//! Both are enabled by default.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use teaflow::prelude::*;
//! use teaflow::router::time;
//!
//! #[derive(Clone)]
//! enum Msg {
//!     Tick,
//!     Stop,
//! }
//!
//! struct Model {
//!     ticks: u32,
//!     running: bool,
//! }
//!
//! let program = Program::worker(
//!     |()| (Model { ticks: 0, running: true }, Cmd::none()),
//!     |msg, model: &Arc<Model>| match msg {
//!         Msg::Tick => (Arc::new(Model { ticks: model.ticks + 1, ..**model }), Cmd::none()),
//!         Msg::Stop => (Arc::new(Model { running: false, ..**model }), Cmd::none()),
//!     },
//!     |model| {
//!         if model.running {
//!             time::every(Duration::from_secs(1), |_| Msg::Tick)
//!         } else {
//!             Sub::none()
//!         }
//!     },
//! );
//! let handle = program.init(());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use teaflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cmd::Cmd;
    pub use crate::data::{OptionalExt, ResultExt};
    pub use crate::error::RuntimeError;
    pub use crate::router::{AppMsg, Effect, Router, RouterContext};
    pub use crate::runtime::{Handle, Program, ProgramConfig};
    pub use crate::sub::{Sub, SubKey};
    pub use crate::task::{Done, Never, Process, Task};

    #[cfg(feature = "port")]
    pub use crate::router::port::Port;
}

pub mod cmd;
pub mod data;
pub mod error;
pub mod router;
pub mod runtime;
pub mod sub;
pub mod task;

pub use error::{KeyError, RuntimeError};
