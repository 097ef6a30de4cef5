//! Per-model quality tracking.
//!
//! Every model gets one state record guarded by the monitor's lock, so an
//! outcome or usage update is applied atomically and snapshots never observe
//! half an update. Accuracy, precision and recall are recomputed from a
//! bounded window of reconciled outcomes; request counters only grow.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use forgehr_events::{Advisory, AdvisoryEnvelope, EventBus, InMemoryEventBus, Subscription};

use crate::backend::{ModelDescriptor, ModelStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    /// Outcomes (and usage samples) kept per model.
    pub window: usize,
    /// Windowed accuracy below this raises `DegradedModel`.
    pub accuracy_floor: f64,
    /// Outcomes required in the window before the floor is enforced.
    pub min_outcomes: usize,
    pub latency_budget_ms: f64,
    pub cost_budget: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            window: 100,
            accuracy_floor: 0.8,
            min_outcomes: 5,
            latency_budget_ms: 5_000.0,
            cost_budget: 0.05,
        }
    }
}

/// Snapshot of one model's quality signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelQualityRecord {
    pub model_id: String,
    pub model_version: Option<String>,
    pub status: ModelStatus,
    /// `None` until the first outcome is reconciled.
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    /// Mean over the usage window.
    pub latency_ms: f64,
    pub cost_per_request: f64,
    pub request_count: u64,
    pub total_tokens: u64,
    /// Outcomes currently in the window.
    pub outcome_count: usize,
    pub last_updated: DateTime<Utc>,
}

impl ModelQualityRecord {
    /// mean(accuracy, precision, recall), when outcomes exist.
    pub fn quality(&self) -> Option<f64> {
        Some((self.accuracy? + self.precision? + self.recall?) / 3.0)
    }
}

/// Result of `analyze_quality`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Request-weighted mean quality across active models, in [0, 1].
    pub overall_score: f64,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub degraded_models: Vec<String>,
}

#[derive(Debug, Clone)]
struct Outcome {
    predicted: String,
    observed: String,
}

#[derive(Debug, Clone, Copy)]
struct Usage {
    latency_ms: f64,
    cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowScores {
    accuracy: f64,
    precision: f64,
    recall: f64,
}

#[derive(Debug)]
struct ModelState {
    version: Option<String>,
    status: ModelStatus,
    outcomes: VecDeque<Outcome>,
    usage: VecDeque<Usage>,
    request_count: u64,
    total_tokens: u64,
    degraded: bool,
    last_updated: DateTime<Utc>,
}

impl ModelState {
    fn new(status: ModelStatus) -> Self {
        Self {
            version: None,
            status,
            outcomes: VecDeque::new(),
            usage: VecDeque::new(),
            request_count: 0,
            total_tokens: 0,
            degraded: false,
            last_updated: Utc::now(),
        }
    }

    fn scores(&self) -> Option<WindowScores> {
        window_scores(&self.outcomes)
    }

    fn snapshot(&self, model_id: &str) -> ModelQualityRecord {
        let scores = self.scores();
        let samples = self.usage.len().max(1) as f64;
        ModelQualityRecord {
            model_id: model_id.to_string(),
            model_version: self.version.clone(),
            status: self.status,
            accuracy: scores.map(|s| s.accuracy),
            precision: scores.map(|s| s.precision),
            recall: scores.map(|s| s.recall),
            latency_ms: self.usage.iter().map(|u| u.latency_ms).sum::<f64>() / samples,
            cost_per_request: self.usage.iter().map(|u| u.cost).sum::<f64>() / samples,
            request_count: self.request_count,
            total_tokens: self.total_tokens,
            outcome_count: self.outcomes.len(),
            last_updated: self.last_updated,
        }
    }
}

/// Accuracy plus macro-averaged precision (over predicted labels) and recall
/// (over observed labels).
fn window_scores(outcomes: &VecDeque<Outcome>) -> Option<WindowScores> {
    if outcomes.is_empty() {
        return None;
    }

    let mut predicted: HashMap<&str, (u32, u32)> = HashMap::new();
    let mut observed: HashMap<&str, (u32, u32)> = HashMap::new();
    let mut correct = 0u32;
    for o in outcomes {
        let hit = u32::from(o.predicted == o.observed);
        correct += hit;
        let p = predicted.entry(o.predicted.as_str()).or_default();
        p.0 += hit;
        p.1 += 1;
        let r = observed.entry(o.observed.as_str()).or_default();
        r.0 += hit;
        r.1 += 1;
    }

    let macro_avg = |counts: &HashMap<&str, (u32, u32)>| {
        counts
            .values()
            .map(|(hits, total)| f64::from(*hits) / f64::from(*total))
            .sum::<f64>()
            / counts.len() as f64
    };

    Some(WindowScores {
        accuracy: f64::from(correct) / outcomes.len() as f64,
        precision: macro_avg(&predicted),
        recall: macro_avg(&observed),
    })
}

/// Aggregates per-model quality signals and publishes advisories.
#[derive(Debug)]
pub struct QualityMonitor {
    config: QualityConfig,
    models: Mutex<HashMap<String, ModelState>>,
    advisories: InMemoryEventBus<AdvisoryEnvelope>,
}

impl Default for QualityMonitor {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}

impl QualityMonitor {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config: QualityConfig {
                window: config.window.max(1),
                ..config
            },
            models: Mutex::new(HashMap::new()),
            advisories: InMemoryEventBus::new(),
        }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    fn models(&self) -> MutexGuard<'_, HashMap<String, ModelState>> {
        self.models.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to `DegradedModel` / `ModelRecovered` advisories.
    pub fn subscribe(&self) -> Subscription<AdvisoryEnvelope> {
        self.advisories.subscribe()
    }

    /// Declare a model (or update its version/status). Counters are kept.
    pub fn register(&self, model: &ModelDescriptor) {
        let mut models = self.models();
        let state = models
            .entry(model.model_id.clone())
            .or_insert_with(|| ModelState::new(model.status));
        state.version = Some(model.version.clone());
        state.status = model.status;
    }

    pub fn record_usage(&self, model_id: &str, token_count: u32, cost: f64, latency_ms: u64) {
        let mut models = self.models();
        let state = models
            .entry(model_id.to_string())
            .or_insert_with(|| ModelState::new(ModelStatus::Experimental));

        state.request_count += 1;
        state.total_tokens += u64::from(token_count);
        state.usage.push_back(Usage {
            latency_ms: latency_ms as f64,
            cost: if cost.is_finite() { cost.max(0.0) } else { 0.0 },
        });
        while state.usage.len() > self.config.window {
            state.usage.pop_front();
        }
        state.last_updated = Utc::now();
    }

    /// Reconcile a prediction against ground truth.
    ///
    /// Any resulting advisory is published before the model lock is released,
    /// so subscribers see transitions in the order they were decided.
    pub fn record_outcome(&self, model_id: &str, predicted_label: &str, observed_label: &str) {
        let mut models = self.models();
        let state = models
            .entry(model_id.to_string())
            .or_insert_with(|| ModelState::new(ModelStatus::Experimental));

        state.outcomes.push_back(Outcome {
            predicted: predicted_label.to_string(),
            observed: observed_label.to_string(),
        });
        while state.outcomes.len() > self.config.window {
            state.outcomes.pop_front();
        }
        state.last_updated = Utc::now();

        if let Some(advisory) = self.transition(model_id, state) {
            if self.advisories.publish(AdvisoryEnvelope::new(advisory)).is_err() {
                warn!(model_id, "failed to publish quality advisory");
            }
        }
    }

    /// Edge-triggered degraded/recovered detection.
    fn transition(&self, model_id: &str, state: &mut ModelState) -> Option<Advisory> {
        if state.outcomes.len() < self.config.min_outcomes {
            return None;
        }
        let accuracy = state.scores()?.accuracy;
        let below = accuracy < self.config.accuracy_floor;

        match (state.degraded, below) {
            (false, true) => {
                state.degraded = true;
                warn!(
                    model_id,
                    accuracy,
                    floor = self.config.accuracy_floor,
                    outcomes = state.outcomes.len(),
                    "model accuracy below floor"
                );
                Some(Advisory::DegradedModel {
                    model_id: model_id.to_string(),
                    accuracy,
                    floor: self.config.accuracy_floor,
                    window_outcomes: state.outcomes.len(),
                })
            }
            (true, false) => {
                state.degraded = false;
                info!(model_id, accuracy, "model accuracy recovered");
                Some(Advisory::ModelRecovered {
                    model_id: model_id.to_string(),
                    accuracy,
                })
            }
            _ => None,
        }
    }

    /// Snapshot of every tracked model, sorted by model id.
    pub fn get_metrics(&self) -> Vec<ModelQualityRecord> {
        let models = self.models();
        let mut out: Vec<_> = models.iter().map(|(id, s)| s.snapshot(id)).collect();
        out.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        out
    }

    pub fn get_model(&self, model_id: &str) -> Option<ModelQualityRecord> {
        self.models().get(model_id).map(|s| s.snapshot(model_id))
    }

    pub fn analyze_quality(&self) -> QualityReport {
        let metrics = self.get_metrics();
        let cfg = &self.config;

        let mut weighted = 0.0;
        let mut weight = 0.0;
        let mut insights = Vec::new();
        let mut recommendations = Vec::new();
        let mut degraded_models = Vec::new();

        let production = metrics
            .iter()
            .filter(|m| m.status == ModelStatus::Production)
            .count();
        insights.push(format!(
            "Tracking {} model(s), {} in production",
            metrics.len(),
            production
        ));

        for m in &metrics {
            if let (Some(quality), true) = (m.quality(), m.request_count > 0) {
                weighted += quality * m.request_count as f64;
                weight += m.request_count as f64;
            }

            if let (Some(acc), Some(prec), Some(rec)) = (m.accuracy, m.precision, m.recall) {
                insights.push(format!(
                    "{}: accuracy {:.1}%, precision {:.1}%, recall {:.1}% over {} outcome(s)",
                    m.model_id,
                    acc * 100.0,
                    prec * 100.0,
                    rec * 100.0,
                    m.outcome_count
                ));
                if m.outcome_count >= cfg.min_outcomes && acc < cfg.accuracy_floor {
                    degraded_models.push(m.model_id.clone());
                    recommendations.push(format!(
                        "Review {}: accuracy {:.1}% is below the {:.0}% floor; consider routing its decisions to another model",
                        m.model_id,
                        acc * 100.0,
                        cfg.accuracy_floor * 100.0
                    ));
                }
            } else if m.request_count > 0 {
                recommendations.push(format!(
                    "Reconcile outcomes for {}: {} decision(s) have no ground truth yet",
                    m.model_id, m.request_count
                ));
            }

            if m.request_count > 0 && m.latency_ms > cfg.latency_budget_ms {
                recommendations.push(format!(
                    "Investigate latency of {}: {:.0} ms average exceeds the {:.0} ms budget",
                    m.model_id, m.latency_ms, cfg.latency_budget_ms
                ));
            }
            if m.request_count > 0 && m.cost_per_request > cfg.cost_budget {
                recommendations.push(format!(
                    "Reduce cost of {}: {:.4} per request exceeds the {:.4} budget",
                    m.model_id, m.cost_per_request, cfg.cost_budget
                ));
            }
        }

        let overall_score = if weight > 0.0 { weighted / weight } else { 0.0 };
        if weight > 0.0 {
            insights.push(format!("Overall decision quality {:.1}%", overall_score * 100.0));
        } else {
            insights.push("No model has both traffic and reconciled outcomes yet".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("No action needed".to_string());
        }

        QualityReport {
            overall_score,
            insights,
            recommendations,
            degraded_models,
        }
    }
}
