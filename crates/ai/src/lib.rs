//! `forgehr-ai`
//!
//! **Responsibility:** AI-assisted HR decisions with a stable contract.
//!
//! Pipeline, one decision per call:
//! - [`TemplateRegistry`] resolves the template for a key.
//! - [`RequestBuilder`] assembles a tenant-scoped [`DecisionRequest`].
//! - [`InvocationAdapter`] calls the routed [`ModelBackend`] (timeouts,
//!   retries, per-model concurrency cap).
//! - [`normalize`] parses and type-checks the raw output into an
//!   [`AiDecision`].
//! - [`TierMapper`] maps the score onto the template's taxonomy.
//!
//! Off the request path:
//! - [`QualityMonitor`] aggregates usage and reconciled outcomes per model.
//! - [`RegressionHarness`] replays a fixed scenario set to detect drift.
//!
//! Decisions are advisory. Nothing here mutates HR records.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod invoke;
pub mod kind;
pub mod normalize;
pub mod quality;
pub mod regression;
pub mod request;
pub mod retry;
pub mod template;
pub mod tier;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendOutput, ModelBackend, ModelDescriptor, ModelStatus, ReplayBackend};
pub use config::{EngineConfig, InvocationSettings, QualitySettings};
pub use decision::{AiDecision, DecisionMetadata, DecisionOutcome};
pub use engine::DecisionEngine;
pub use error::{DecisionError, DecisionResult, InvocationFailure};
pub use invoke::{
    BackendRoutes, InvocationAdapter, InvocationConfig, KindTable, OverflowPolicy, RawOutput,
};
pub use kind::{DecisionKind, TemplateKey};
pub use normalize::normalize;
pub use quality::{ModelQualityRecord, QualityConfig, QualityMonitor, QualityReport};
pub use regression::{
    RegressionConfig, RegressionFixture, RegressionHarness, RegressionReport, RegressionScenario,
    ScenarioStatus,
};
pub use request::{DecisionRequest, InputData, RequestBuilder};
pub use retry::RetryPolicy;
pub use template::{DecisionTemplate, FieldType, OutputField, TemplateRegistry, TemplateSpec};
pub use tier::{RecommendationTier, TaxonomySpec, TierMapper, TierSpec, TierTable};
