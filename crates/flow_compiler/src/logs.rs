use tracing_forest::{ForestLayer, util::LevelFilter};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a forest-style subscriber filtered by `RUST_LOG` (default `info`).
///
/// Integration tests call it first so `RUST_LOG=flow_compiler=trace` prints each
/// register claim and fold as a tree under its `resolve` span.
///
/// Safe to call more than once: later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = Registry::default()
        .with(env_filter)
        .with(ForestLayer::default())
        .try_init();
}
