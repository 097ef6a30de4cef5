//! Decision engine wiring and model backend adapters.

#[cfg(feature = "http")]
pub mod http_backend;

#[cfg(feature = "http")]
pub use http_backend::{HttpBackendConfig, HttpModelBackend};

use std::sync::Arc;

use forgehr_ai::{
    BackendRoutes, DecisionEngine, DecisionResult, EngineConfig, InvocationAdapter, QualityMonitor,
};
use tracing::info;

/// Build an engine from loaded configuration and a routing table.
pub fn build_engine(
    config: &EngineConfig,
    routes: BackendRoutes,
) -> DecisionResult<DecisionEngine> {
    let registry = Arc::new(config.registry()?);
    let adapter = InvocationAdapter::new(routes, config.invocation.to_config());
    let monitor = Arc::new(QualityMonitor::new(config.quality.to_config()));
    let engine = DecisionEngine::new(registry, adapter, monitor);

    info!(
        models = engine.adapter().models().len(),
        timeout_ms = config.invocation.timeout_ms,
        max_in_flight = config.invocation.max_in_flight,
        "decision engine ready"
    );
    Ok(engine)
}
