//! Counter Sample Application Entry Point
//!
//! Runs the counter program until its tick budget is spent or Ctrl-C is
//! pressed, pushing a number through the port every few ticks.

use std::sync::Arc;

use counter::{CounterConfig, Model, Msg, next_nudge, program};
use teaflow::prelude::*;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,teaflow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match CounterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load configuration from environment: {e}");
            tracing::info!("Using default configuration");
            CounterConfig::default()
        }
    };
    tracing::info!(name = %config.name, tick = ?config.tick, max_ticks = config.max_ticks, "starting counter");

    let nudges = Port::new("nudges");
    let handle = program(&config, nudges.clone()).init(());

    let (finished_tx, mut finished) = tokio::sync::watch::channel(false);
    let _listener = handle.subscribe(move |model: &Arc<Model>| {
        tracing::info!(count = model.count, ticks = model.ticks, saved = ?model.saved, "model changed");
        if !model.ticking() {
            finished_tx.send_replace(true);
        }
    });

    let pusher = tokio::spawn({
        let nudges = nudges.clone();
        let every = config.tick * 3;
        async move {
            let mut n = 1;
            loop {
                tokio::time::sleep(every).await;
                if !nudges.send(n) {
                    tracing::debug!("nudge dropped, program not listening");
                }
                n = next_nudge(n);
            }
        }
    });

    tokio::select! {
        _ = finished.wait_for(|done| *done) => tracing::info!("tick budget spent"),
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }
    pusher.abort();

    if let Err(e) = handle.dispatch(Msg::Save) {
        tracing::error!("could not save: {e}");
        return;
    }
    handle.settled().await;

    let model = handle.get_model();
    match (&model.saved, &model.last_error) {
        (Some(count), _) => tracing::info!(count, "saved"),
        (None, Some(error)) => tracing::warn!(%error, "save failed"),
        (None, None) => tracing::warn!("nothing saved"),
    }
}
