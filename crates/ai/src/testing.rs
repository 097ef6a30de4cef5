//! Shared fixtures for unit tests.

use serde_json::json;

use crate::backend::{ModelDescriptor, ModelStatus};
use crate::kind::TemplateKey;
use crate::request::{DecisionRequest, InputData, RequestBuilder};
use crate::template::{DecisionTemplate, TemplateRegistry};
use std::sync::Arc;

pub fn registry() -> TemplateRegistry {
    TemplateRegistry::builtin().expect("builtin catalog is valid")
}

pub fn screening_template() -> DecisionTemplate {
    registry()
        .get_key(TemplateKey::CandidateScreening)
        .expect("screening template")
        .clone()
}

pub fn screening_data() -> InputData {
    InputData::from([
        ("candidate_name".to_string(), json!("Ada Lovelace")),
        ("resume_text".to_string(), json!("Analytical engines, 10 years")),
        ("job_title".to_string(), json!("Staff Engineer")),
        ("job_requirements".to_string(), json!(["rust", "distributed systems"])),
    ])
}

pub fn attrition_data() -> InputData {
    InputData::from([
        ("employee_name".to_string(), json!("Grace Hopper")),
        ("tenure_months".to_string(), json!(14)),
        ("recent_events".to_string(), json!(["missed promotion", "manager change"])),
    ])
}

pub fn screening_request(company_id: &str, entity_id: &str) -> DecisionRequest {
    RequestBuilder::new(Arc::new(registry()))
        .build(
            TemplateKey::CandidateScreening.as_str(),
            screening_data(),
            company_id,
            entity_id,
        )
        .expect("valid screening request")
}

/// A well-formed model payload with one reason and one insight.
pub fn payload(score: i64, confidence: f64, label: &str) -> String {
    json!({
        "score": score,
        "confidence": confidence,
        "decision": label,
        "reasons": [format!("scored {score}")],
        "insights": ["replayed"],
    })
    .to_string()
}

pub fn replay_model() -> ModelDescriptor {
    ModelDescriptor::new("replay", "fixtures", ModelStatus::Experimental)
}
