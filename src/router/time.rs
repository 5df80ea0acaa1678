//! The time router: wall-clock reads and periodic ticks.
//!
//! [`every`] subscribes to a tick every `interval`. All subscriptions with
//! the same interval share one background timer; a timer is spawned when
//! its interval first appears in the subscriptions and killed as soon as
//! it disappears.
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::time::{Duration, SystemTime};
//! use teaflow::prelude::*;
//! use teaflow::router::time;
//!
//! #[derive(Clone)]
//! enum Msg {
//!     Tick(SystemTime),
//! }
//!
//! fn subscriptions(model: &Model) -> Sub<Msg> {
//!     if model.running {
//!         time::every(Duration::from_secs(1), Msg::Tick)
//!     } else {
//!         Sub::none()
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tokio::time::{Instant, MissedTickBehavior};

use super::{Effect, Router, RouterContext};
use crate::sub::{Sub, SubKey};
use crate::task::{Never, Process, Task};

/// Namespace of the time router.
pub const NAMESPACE: &str = "time";

/// The time router.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time;

#[derive(Debug, Serialize, Deserialize)]
struct Every {
    millis: u64,
}

/// Subscribes to a tick every `interval`, tagging each tick's wall-clock
/// time.
///
/// Intervals have millisecond resolution; anything below one millisecond
/// ticks every millisecond.
pub fn every<Msg, F>(interval: Duration, tagger: F) -> Sub<Msg>
where
    F: Fn(SystemTime) -> Msg + Send + Sync + 'static,
    Msg: Send + 'static,
{
    let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
    match SubKey::encode(&Every { millis }) {
        Ok(key) => Sub::single(Time, key, tagger),
        Err(error) => {
            tracing::error!(%error, "could not encode interval subscription");
            Sub::none()
        }
    }
}

/// A Task reading the current wall-clock time.
pub fn now() -> Task<Never, SystemTime> {
    Task::from_async(|| async { Ok(SystemTime::now()) })
}

type Listeners = SmallVec<[Effect<SystemTime>; 2]>;

/// State of the time router: the listeners and the timer of each active
/// interval.
#[derive(Clone, Default)]
pub struct TimeState {
    taggers: BTreeMap<Duration, Listeners>,
    processes: BTreeMap<Duration, Process>,
}

impl TimeState {
    /// Intervals that currently have a running timer.
    pub fn intervals(&self) -> impl Iterator<Item = Duration> + '_ {
        self.processes.keys().copied()
    }

    /// Number of running timers.
    pub fn running(&self) -> usize {
        self.processes.len()
    }

    /// The timer of `interval`, if one is running.
    pub fn process(&self, interval: Duration) -> Option<&Process> {
        self.processes.get(&interval)
    }
}

impl fmt::Debug for TimeState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TimeState")
            .field("intervals", &self.processes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Router for Time {
    type Payload = SystemTime;
    type SelfMsg = Duration;
    type State = TimeState;

    fn namespace(&self) -> &str {
        NAMESPACE
    }

    fn init(&self) -> Task<Never, TimeState> {
        Task::succeed(TimeState::default())
    }

    fn on_effects(
        &self,
        router: &RouterContext<Duration>,
        effects: Vec<Effect<SystemTime>>,
        state: TimeState,
    ) -> Task<Never, TimeState> {
        let taggers = group_by_interval(effects);
        let router = router.clone();
        Task::from_async(move || {
            let router = router.clone();
            let taggers = taggers.clone();
            let processes = state.processes.clone();
            async move { Ok(restart_timers(router, taggers, processes).await) }
        })
    }

    fn on_self_msg(
        &self,
        router: &RouterContext<Duration>,
        interval: Duration,
        state: TimeState,
    ) -> Task<Never, TimeState> {
        let Some(listeners) = state.taggers.get(&interval).cloned() else {
            tracing::trace!(?interval, "tick for an interval nobody listens to");
            return Task::succeed(state);
        };
        let router = router.clone();
        now()
            .chain(move |now| {
                let sends = listeners
                    .iter()
                    .map(|listener| router.send_to_app(listener.tag(now)))
                    .collect();
                Task::sequence(sends)
            })
            .map(move |_| state.clone())
    }
}

fn group_by_interval(effects: Vec<Effect<SystemTime>>) -> BTreeMap<Duration, Listeners> {
    let mut taggers: BTreeMap<Duration, Listeners> = BTreeMap::new();
    for effect in effects {
        match effect.key().decode::<Every>() {
            Ok(Every { millis }) => taggers
                .entry(Duration::from_millis(millis))
                .or_default()
                .push(effect),
            Err(error) => tracing::warn!(%error, "ignoring malformed interval subscription"),
        }
    }
    taggers
}

async fn restart_timers(
    router: RouterContext<Duration>,
    taggers: BTreeMap<Duration, Listeners>,
    mut processes: BTreeMap<Duration, Process>,
) -> TimeState {
    let stale: Vec<Duration> = processes
        .keys()
        .filter(|interval| !taggers.contains_key(*interval))
        .copied()
        .collect();
    for interval in stale {
        if let Some(process) = processes.remove(&interval) {
            process.kill().run_safe().await;
            tracing::debug!(?interval, process = %process.id(), "interval timer stopped");
        }
    }

    for &interval in taggers.keys() {
        if processes.contains_key(&interval) {
            continue;
        }
        let process = ticker(router.clone(), interval).spawn().run_safe().await;
        tracing::debug!(?interval, process = %process.id(), "interval timer started");
        processes.insert(interval, process);
    }

    TimeState { taggers, processes }
}

fn ticker(router: RouterContext<Duration>, interval: Duration) -> Task<Never, ()> {
    Task::from_async(move || tick_forever(router.clone(), interval))
}

async fn tick_forever(router: RouterContext<Duration>, interval: Duration) -> Result<(), Never> {
    let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        router.send_to_self(interval).run_safe().await;
    }
}
