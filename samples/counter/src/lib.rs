//! Counter sample application.
//!
//! A headless program that
//!
//! - counts ticks of a timer subscription until a configured limit,
//! - adds the numbers pushed through a [`Port`] from outside the program,
//! - "saves" the count through a fallible Task and records the outcome.

pub mod config;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use teaflow::prelude::*;
use teaflow::router::time;

pub use config::{ConfigError, CounterConfig};

/// Application messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The timer fired.
    Tick(SystemTime),
    /// A number arrived through the port.
    Nudge(i64),
    /// Save the current count.
    Save,
    /// Outcome of a save.
    Saved(Result<i64, String>),
    /// Reset the count to zero without touching the tick budget.
    Reset,
}

/// Application state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    /// Running total.
    pub count: i64,
    /// Ticks received so far.
    pub ticks: u32,
    /// Ticks after which the timer is dropped.
    pub max_ticks: u32,
    /// Last saved count, if any.
    pub saved: Option<i64>,
    /// Last save error, if any.
    pub last_error: Option<String>,
}

impl Model {
    /// Whether the timer subscription is still wanted.
    pub const fn ticking(&self) -> bool {
        self.ticks < self.max_ticks
    }
}

/// Largest magnitude the demo pusher reaches before starting over.
pub const NUDGE_LIMIT: i64 = 1 << 20;

/// The value pushed after `n`: doubled with the sign flipped, back to `1`
/// once it would pass [`NUDGE_LIMIT`].
pub const fn next_nudge(n: i64) -> i64 {
    if n.unsigned_abs() >= NUDGE_LIMIT.unsigned_abs() {
        1
    } else {
        -n * 2
    }
}

/// Simulated persistence: negative counts are rejected.
fn save(count: i64) -> Task<String, i64> {
    Task::sleep(Duration::from_millis(10))
        .map_error(|never| match never {})
        .chain(move |()| {
            if count < 0 {
                Task::fail(format!("refusing to save negative count {count}"))
            } else {
                Task::succeed(count)
            }
        })
}

fn update(message: Msg, model: &Arc<Model>) -> (Arc<Model>, Cmd<Msg>) {
    match message {
        Msg::Tick(_) => {
            let next = Model {
                count: model.count + 1,
                ticks: model.ticks + 1,
                ..(**model).clone()
            };
            (Arc::new(next), Cmd::none())
        }
        Msg::Nudge(0) => (Arc::clone(model), Cmd::none()),
        Msg::Nudge(n) => (
            Arc::new(Model {
                count: model.count + n,
                ..(**model).clone()
            }),
            Cmd::none(),
        ),
        Msg::Save => (Arc::clone(model), save(model.count).attempt(Msg::Saved)),
        Msg::Saved(Ok(count)) => (
            Arc::new(Model {
                saved: Some(count),
                last_error: None,
                ..(**model).clone()
            }),
            Cmd::none(),
        ),
        Msg::Saved(Err(error)) => (
            Arc::new(Model {
                last_error: Some(error),
                ..(**model).clone()
            }),
            Cmd::none(),
        ),
        Msg::Reset => (
            Arc::new(Model {
                count: 0,
                ..(**model).clone()
            }),
            Cmd::none(),
        ),
    }
}

/// Builds the counter program.
///
/// `nudges` is the port other code uses to push numbers into the program.
pub fn program(config: &CounterConfig, nudges: Port<i64>) -> Program<(), Model, Msg> {
    let max_ticks = config.max_ticks;
    let tick = config.tick;
    Program::worker(
        move |()| {
            let model = Model {
                max_ticks,
                ..Model::default()
            };
            (model, Cmd::none())
        },
        update,
        move |model: &Model| {
            let nudges = nudges.subscribe(Msg::Nudge);
            if model.ticking() {
                Sub::batch([time::every(tick, Msg::Tick), nudges])
            } else {
                nudges
            }
        },
    )
    .with_config(ProgramConfig::new(config.name.clone()))
}
