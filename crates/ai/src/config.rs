//! Engine configuration. Every field has a default so a partial (or absent)
//! config file still yields a working engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::DecisionResult;
use crate::invoke::{InvocationConfig, OverflowPolicy};
use crate::quality::QualityConfig;
use crate::regression::RegressionConfig;
use crate::retry::RetryPolicy;
use crate::template::{TemplateRegistry, TemplateSpec};
use crate::tier::TaxonomySpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationSettings {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub max_in_flight: usize,
    pub overflow: OverflowPolicy,
}

impl Default for InvocationSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 2,
            base_backoff_ms: 250,
            max_backoff_ms: 4_000,
            max_in_flight: 8,
            overflow: OverflowPolicy::Queue,
        }
    }
}

impl InvocationSettings {
    pub fn to_config(&self) -> InvocationConfig {
        InvocationConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            retry: RetryPolicy::exponential(
                self.max_retries,
                Duration::from_millis(self.base_backoff_ms),
                Duration::from_millis(self.max_backoff_ms.max(self.base_backoff_ms)),
            ),
            max_in_flight: self.max_in_flight.max(1),
            overflow: self.overflow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    pub window: usize,
    pub accuracy_floor: f64,
    pub min_outcomes: usize,
    pub latency_budget_ms: f64,
    pub cost_budget: f64,
}

impl Default for QualitySettings {
    fn default() -> Self {
        let defaults = QualityConfig::default();
        Self {
            window: defaults.window,
            accuracy_floor: defaults.accuracy_floor,
            min_outcomes: defaults.min_outcomes,
            latency_budget_ms: defaults.latency_budget_ms,
            cost_budget: defaults.cost_budget,
        }
    }
}

impl QualitySettings {
    pub fn to_config(&self) -> QualityConfig {
        QualityConfig {
            window: self.window,
            accuracy_floor: self.accuracy_floor,
            min_outcomes: self.min_outcomes,
            latency_budget_ms: self.latency_budget_ms,
            cost_budget: self.cost_budget,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub invocation: InvocationSettings,
    pub quality: QualitySettings,
    pub regression: RegressionConfig,
    /// Replaces the built-in template catalog when present.
    pub templates: Option<Vec<TemplateSpec>>,
    /// Replaces the built-in taxonomies when present.
    pub taxonomies: Option<Vec<TaxonomySpec>>,
}

impl EngineConfig {
    /// Build and validate the registry this config describes.
    pub fn registry(&self) -> DecisionResult<TemplateRegistry> {
        let templates = self
            .templates
            .clone()
            .unwrap_or_else(catalog::builtin_templates);
        let taxonomies = self
            .taxonomies
            .clone()
            .unwrap_or_else(catalog::builtin_taxonomies);
        TemplateRegistry::load(templates, taxonomies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecisionError;
    use serde_json::json;

    #[test]
    fn empty_document_yields_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());

        let invocation = config.invocation.to_config();
        assert_eq!(invocation.timeout, Duration::from_secs(30));
        assert_eq!(invocation.retry.max_retries, 2);
        assert_eq!(invocation.max_in_flight, 8);
        assert_eq!(config.quality.to_config(), QualityConfig::default());
        assert_eq!(config.regression.confidence_floor, 0.6);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: EngineConfig = serde_json::from_value(json!({
            "invocation": {"timeout_ms": 500, "overflow": "reject", "max_in_flight": 0},
            "quality": {"accuracy_floor": 0.9}
        }))
        .unwrap();

        let invocation = config.invocation.to_config();
        assert_eq!(invocation.timeout, Duration::from_millis(500));
        assert_eq!(invocation.overflow, OverflowPolicy::Reject);
        assert_eq!(invocation.max_in_flight, 1);
        assert_eq!(invocation.retry.base_delay, Duration::from_millis(250));

        let quality = config.quality.to_config();
        assert_eq!(quality.accuracy_floor, 0.9);
        assert_eq!(quality.window, 100);
    }

    #[test]
    fn registry_defaults_to_builtin_catalog() {
        let registry = EngineConfig::default().registry().unwrap();
        assert_eq!(registry.templates().count(), 7);
    }

    #[test]
    fn taxonomy_override_is_validated() {
        let config: EngineConfig = serde_json::from_value(json!({
            "taxonomies": [{
                "name": "recruitment",
                "tiers": [
                    {"score_min": 50, "score_max": 100, "label": "hire", "description": "", "actions": []},
                    {"score_min": 0, "score_max": 40, "label": "reject", "description": "", "actions": []}
                ]
            }]
        }))
        .unwrap();
        let err = config.registry().unwrap_err();
        assert!(matches!(err, DecisionError::InvalidTierTable { .. }), "{err:?}");
    }
}
