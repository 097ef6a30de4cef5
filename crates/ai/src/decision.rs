use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use forgehr_core::{DecisionId, TenantContext};

use crate::kind::{DecisionKind, TemplateKey};
use crate::tier::RecommendationTier;

/// Accounting for the backend call that produced a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    pub model_id: String,
    pub model_version: String,
    pub token_count: u32,
    pub processing_time_ms: u64,
    pub cost: f64,
    pub attempts: u32,
}

/// A fully validated decision.
///
/// This is an insight handed back to the caller, not a domain event; storing
/// it (audit trail, history) is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDecision {
    pub id: DecisionId,
    pub template_key: TemplateKey,
    pub kind: DecisionKind,
    /// Integer in [0, 100].
    pub score: u8,
    /// In [0, 1].
    pub confidence: f64,
    /// One of the template's enumerated labels.
    pub decision_label: String,
    pub reasons: Vec<String>,
    pub insights: Vec<String>,
    /// Template-specific output fields that passed validation.
    #[serde(default)]
    pub details: BTreeMap<String, JsonValue>,
    pub tenant: TenantContext,
    pub metadata: DecisionMetadata,
    pub created_at: DateTime<Utc>,
}

/// Decision plus its recommendation tier (when the template has a taxonomy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: AiDecision,
    pub tier: Option<RecommendationTier>,
}
