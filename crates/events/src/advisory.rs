use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Advisory raised by the quality monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Advisory {
    /// A model's windowed accuracy dropped below the configured floor.
    DegradedModel {
        model_id: String,
        accuracy: f64,
        floor: f64,
        window_outcomes: usize,
    },
    /// A previously degraded model is back at or above the floor.
    ModelRecovered { model_id: String, accuracy: f64 },
}

impl Advisory {
    pub fn model_id(&self) -> &str {
        match self {
            Advisory::DegradedModel { model_id, .. } => model_id,
            Advisory::ModelRecovered { model_id, .. } => model_id,
        }
    }

    /// Stable dotted name used for logging and routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            Advisory::DegradedModel { .. } => "quality.degraded_model",
            Advisory::ModelRecovered { .. } => "quality.model_recovered",
        }
    }
}

/// Advisory plus delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryEnvelope {
    pub advisory_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub advisory: Advisory,
}

impl AdvisoryEnvelope {
    pub fn new(advisory: Advisory) -> Self {
        Self {
            advisory_id: Uuid::now_v7(),
            occurred_at: Utc::now(),
            advisory,
        }
    }
}
