//! Regression harness: replays recorded model output for a fixed scenario set
//! through the full pipeline and reports the pass rate.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{BackendOutput, ModelBackend, ModelDescriptor, ModelStatus, ReplayBackend};
use crate::engine::DecisionEngine;
use crate::error::{DecisionError, DecisionResult};
use crate::invoke::{InvocationAdapter, InvocationConfig, KindTable};
use crate::kind::TemplateKey;
use crate::quality::QualityMonitor;
use crate::request::{InputData, fingerprint};
use crate::retry::RetryPolicy;
use crate::template::TemplateRegistry;

pub const REPLAY_MODEL_ID: &str = "regression-replay";

/// One scenario: inputs, the recorded model output, and the label we expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionFixture {
    pub name: String,
    pub template_key: String,
    pub company_id: String,
    pub entity_id: String,
    pub data: InputData,
    pub expected_label: String,
    pub replay: BackendOutput,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    /// Right label, confidence under the floor.
    NearMiss,
    Mismatch,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionScenario {
    pub name: String,
    pub expected_label: String,
    pub actual_label: Option<String>,
    pub confidence: Option<f64>,
    pub tier_label: Option<String>,
    pub status: ScenarioStatus,
    pub passed: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub scenarios: Vec<RegressionScenario>,
    pub passed: usize,
    pub total: usize,
    /// `passed / total`, or 0.0 when there are no scenarios.
    pub pass_rate: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub confidence_floor: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self { confidence_floor: 0.6 }
    }
}

#[derive(Debug)]
pub struct RegressionHarness {
    fixtures: Vec<RegressionFixture>,
    engine: DecisionEngine,
    config: RegressionConfig,
}

impl RegressionHarness {
    /// Fixtures naming an unknown template are rejected here, as are two
    /// fixtures whose recordings would collide.
    pub fn new(
        registry: Arc<TemplateRegistry>,
        fixtures: Vec<RegressionFixture>,
        config: RegressionConfig,
    ) -> DecisionResult<Self> {
        let mut replay = ReplayBackend::new(ModelDescriptor::new(
            REPLAY_MODEL_ID,
            "fixtures",
            ModelStatus::Experimental,
        ));
        let mut seen: HashMap<String, &str> = HashMap::new();
        for fixture in &fixtures {
            let key: TemplateKey = fixture.template_key.parse()?;
            if let Some(other) = seen.insert(fingerprint(key, &fixture.data), &fixture.name) {
                return Err(DecisionError::invalid_template(
                    key.as_str(),
                    format!(
                        "fixtures `{other}` and `{}` share identical inputs",
                        fixture.name
                    ),
                ));
            }
            replay.record(key, &fixture.data, fixture.replay.clone());
        }

        let routes = KindTable::uniform(Arc::new(replay) as Arc<dyn ModelBackend>);
        let adapter = InvocationAdapter::new(
            routes,
            InvocationConfig {
                retry: RetryPolicy::no_retry(),
                ..InvocationConfig::default()
            },
        );
        let engine = DecisionEngine::new(registry, adapter, Arc::new(QualityMonitor::default()));

        Ok(Self {
            fixtures,
            engine,
            config,
        })
    }

    pub fn fixtures(&self) -> &[RegressionFixture] {
        &self.fixtures
    }

    pub fn config(&self) -> &RegressionConfig {
        &self.config
    }

    /// Scenarios run in fixture order; a failing scenario never stops the run.
    pub async fn run(&self) -> RegressionReport {
        let mut scenarios = Vec::with_capacity(self.fixtures.len());
        for fixture in &self.fixtures {
            scenarios.push(self.run_one(fixture).await);
        }

        let total = scenarios.len();
        let passed = scenarios.iter().filter(|s| s.passed).count();
        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64
        };

        info!(passed, total, pass_rate, "regression run complete");
        RegressionReport {
            scenarios,
            passed,
            total,
            pass_rate,
        }
    }

    async fn run_one(&self, fixture: &RegressionFixture) -> RegressionScenario {
        let result = self
            .engine
            .decide(
                &fixture.template_key,
                fixture.data.clone(),
                &fixture.company_id,
                &fixture.entity_id,
            )
            .await;

        let mut scenario = RegressionScenario {
            name: fixture.name.clone(),
            expected_label: fixture.expected_label.clone(),
            actual_label: None,
            confidence: None,
            tier_label: None,
            status: ScenarioStatus::Errored,
            passed: false,
            error: None,
        };

        match result {
            Ok(outcome) => {
                let decision = outcome.decision;
                scenario.status = if decision.decision_label != fixture.expected_label {
                    ScenarioStatus::Mismatch
                } else if decision.confidence >= self.config.confidence_floor {
                    ScenarioStatus::Passed
                } else {
                    ScenarioStatus::NearMiss
                };
                scenario.passed = scenario.status == ScenarioStatus::Passed;
                scenario.confidence = Some(decision.confidence);
                scenario.tier_label = outcome.tier.map(|t| t.label);
                scenario.actual_label = Some(decision.decision_label);
            }
            Err(err) => {
                warn!(scenario = %fixture.name, error = %err, "regression scenario errored");
                scenario.error = Some(err.to_string());
            }
        }
        scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use serde_json::json;

    fn fixture(name: &str, title: &str, payload: String, expected: &str) -> RegressionFixture {
        let mut data = testing::screening_data();
        data.insert("job_title".to_string(), json!(title));
        RegressionFixture {
            name: name.to_string(),
            template_key: "recruitment.candidate_screening".to_string(),
            company_id: "acme".to_string(),
            entity_id: format!("cand-{name}"),
            data,
            expected_label: expected.to_string(),
            replay: BackendOutput::new(payload),
        }
    }

    fn harness(fixtures: Vec<RegressionFixture>) -> RegressionHarness {
        RegressionHarness::new(
            Arc::new(testing::registry()),
            fixtures,
            RegressionConfig::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn all_matching_scenarios_pass() {
        let report = harness(vec![
            fixture("strong", "a", testing::payload(92, 0.9, "hire"), "hire"),
            fixture("middling", "b", testing::payload(70, 0.75, "interview"), "interview"),
            fixture("weak", "c", testing::payload(12, 0.6, "reject"), "reject"),
        ])
        .run()
        .await;

        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 3);
        assert_eq!(report.pass_rate, 1.0);
        assert_eq!(report.scenarios[0].tier_label.as_deref(), Some("hire"));
        assert_eq!(report.scenarios[2].tier_label.as_deref(), Some("reject"));
    }

    #[tokio::test]
    async fn low_confidence_label_match_is_a_near_miss() {
        let report = harness(vec![
            fixture("sure", "a", testing::payload(90, 0.9, "hire"), "hire"),
            fixture("unsure", "b", testing::payload(90, 0.4, "hire"), "hire"),
        ])
        .run()
        .await;

        let unsure = &report.scenarios[1];
        assert_eq!(unsure.status, ScenarioStatus::NearMiss);
        assert!(!unsure.passed);
        assert_eq!(unsure.actual_label.as_deref(), Some("hire"));
        assert_eq!(report.pass_rate, 0.5);
    }

    #[tokio::test]
    async fn mismatches_and_errors_are_reported_per_scenario() {
        let report = harness(vec![
            fixture("drifted", "a", testing::payload(45, 0.9, "hold"), "interview"),
            fixture("garbled", "b", "not json".to_string(), "hire"),
        ])
        .run()
        .await;

        assert_eq!(report.scenarios[0].status, ScenarioStatus::Mismatch);
        assert_eq!(report.scenarios[0].actual_label.as_deref(), Some("hold"));
        assert_eq!(report.scenarios[1].status, ScenarioStatus::Errored);
        assert!(report.scenarios[1].error.is_some());
        assert_eq!(report.passed, 0);
        assert_eq!(report.pass_rate, 0.0);
    }

    #[tokio::test]
    async fn empty_fixture_set_has_zero_pass_rate() {
        let report = harness(Vec::new()).run().await;
        assert_eq!(report.total, 0);
        assert_eq!(report.pass_rate, 0.0);
    }

    #[test]
    fn colliding_or_unknown_fixtures_are_rejected() {
        let registry = Arc::new(testing::registry());
        let dup = vec![
            fixture("one", "same", testing::payload(90, 0.9, "hire"), "hire"),
            fixture("two", "same", testing::payload(10, 0.9, "reject"), "reject"),
        ];
        let err = RegressionHarness::new(registry.clone(), dup, RegressionConfig::default())
            .unwrap_err();
        assert!(matches!(err, DecisionError::InvalidTemplate { .. }));

        let mut unknown = fixture("x", "a", testing::payload(90, 0.9, "hire"), "hire");
        unknown.template_key = "payroll.bonus".to_string();
        let err = RegressionHarness::new(registry, vec![unknown], RegressionConfig::default())
            .unwrap_err();
        assert_eq!(err, DecisionError::UnknownTemplate("payroll.bonus".to_string()));
    }

    #[test]
    fn fixtures_deserialize_from_json() {
        let raw = json!([{
            "name": "senior",
            "template_key": "recruitment.candidate_screening",
            "company_id": "acme",
            "entity_id": "cand-1",
            "data": {"candidate_name": "Ada"},
            "expected_label": "hire",
            "replay": {"payload": "{}", "token_count": 10, "cost": 0.001}
        }]);
        let fixtures: Vec<RegressionFixture> = serde_json::from_value(raw).unwrap();
        assert_eq!(fixtures[0].replay.token_count, 10);
    }
}
