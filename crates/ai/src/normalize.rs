//! Response validation: raw backend text → canonical [`AiDecision`].
//!
//! A decision is either fully valid or not produced at all. Parsing gets one
//! bounded repair pass (keep the outermost `{ ... }` span); everything after
//! that is strict.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use forgehr_core::DecisionId;

use crate::decision::{AiDecision, DecisionMetadata};
use crate::error::{DecisionError, DecisionResult};
use crate::invoke::RawOutput;
use crate::request::DecisionRequest;
use crate::template::{
    DecisionTemplate, FIELD_CONFIDENCE, FIELD_DECISION, FIELD_INSIGHTS, FIELD_REASONS, FIELD_SCORE,
    FieldType, OutputField,
};

/// Typed view over the core fields, read after schema validation.
#[derive(Deserialize)]
struct CoreFields {
    score: u8,
    confidence: f64,
    decision: String,
    reasons: Vec<String>,
    insights: Vec<String>,
}

const CORE_FIELDS: [&str; 5] = [
    FIELD_SCORE,
    FIELD_CONFIDENCE,
    FIELD_DECISION,
    FIELD_REASONS,
    FIELD_INSIGHTS,
];

pub fn normalize(
    raw: &RawOutput,
    request: &DecisionRequest,
    template: &DecisionTemplate,
) -> DecisionResult<AiDecision> {
    if request.template_key() != template.key() {
        return Err(DecisionError::invalid_template(
            template.key().as_str(),
            format!("request was built for {}", request.template_key()),
        ));
    }

    let mut object = parse_object(&raw.payload)?;

    let mut core = Map::new();
    let mut details = BTreeMap::new();
    for field in template.output_schema() {
        let Some(value) = object.remove(&field.name).filter(|v| !v.is_null()) else {
            if field.required {
                return Err(DecisionError::schema_violation(&field.name, "missing"));
            }
            continue;
        };
        check_field(field, &value, template)?;
        if CORE_FIELDS.contains(&field.name.as_str()) {
            core.insert(field.name.clone(), value);
        } else {
            details.insert(field.name.clone(), value);
        }
    }

    if !object.is_empty() {
        debug!(
            template = %template.key(),
            ignored = ?object.keys().collect::<Vec<_>>(),
            "ignoring undeclared output fields"
        );
    }

    let fields: CoreFields = serde_json::from_value(JsonValue::Object(core))
        .map_err(|e| DecisionError::schema_violation("<core>", e.to_string()))?;

    Ok(AiDecision {
        id: DecisionId::new(),
        template_key: template.key(),
        kind: template.kind(),
        score: fields.score,
        confidence: fields.confidence,
        decision_label: fields.decision,
        reasons: fields.reasons,
        insights: fields.insights,
        details,
        tenant: request.tenant().clone(),
        metadata: DecisionMetadata {
            model_id: raw.model_id.clone(),
            model_version: raw.model_version.clone(),
            token_count: raw.token_count,
            processing_time_ms: raw.processing_time_ms,
            cost: raw.cost,
            attempts: raw.attempts,
        },
        created_at: Utc::now(),
    })
}

fn parse_object(payload: &str) -> DecisionResult<Map<String, JsonValue>> {
    if let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(payload.trim()) {
        return Ok(map);
    }

    // Single repair pass: drop text around the outermost braces.
    let (Some(start), Some(end)) = (payload.find('{'), payload.rfind('}')) else {
        return Err(DecisionError::MalformedDecision(
            "payload contains no JSON object".to_string(),
        ));
    };
    if end <= start {
        return Err(DecisionError::MalformedDecision(
            "payload contains no JSON object".to_string(),
        ));
    }

    match serde_json::from_str::<JsonValue>(&payload[start..=end]) {
        Ok(JsonValue::Object(map)) => {
            debug!(stripped = payload.len() - (end + 1 - start), "repaired decision payload");
            Ok(map)
        }
        Ok(_) => Err(DecisionError::MalformedDecision(
            "payload is not a JSON object".to_string(),
        )),
        Err(e) => Err(DecisionError::MalformedDecision(e.to_string())),
    }
}

fn check_field(
    field: &OutputField,
    value: &JsonValue,
    template: &DecisionTemplate,
) -> DecisionResult<()> {
    let violation = |reason: String| DecisionError::schema_violation(&field.name, reason);

    match &field.ty {
        FieldType::Integer { min, max } => {
            let n = value
                .as_i64()
                .ok_or_else(|| violation(format!("expected integer, got {value}")))?;
            if n < *min || n > *max {
                return Err(violation(format!("{n} outside [{min}, {max}]")));
            }
        }
        FieldType::Float { min, max } => {
            let x = value
                .as_f64()
                .ok_or_else(|| violation(format!("expected number, got {value}")))?;
            if !x.is_finite() || x < *min || x > *max {
                return Err(violation(format!("{x} outside [{min}, {max}]")));
            }
        }
        FieldType::Label => {
            let label = value
                .as_str()
                .ok_or_else(|| violation(format!("expected label string, got {value}")))?;
            if !template.allows_label(label) {
                return Err(violation(format!(
                    "`{label}` is not one of {:?}",
                    template.labels()
                )));
            }
        }
        FieldType::Text => {
            if !value.is_string() {
                return Err(violation(format!("expected string, got {value}")));
            }
        }
        FieldType::TextList => {
            let items = value
                .as_array()
                .ok_or_else(|| violation(format!("expected list of strings, got {value}")))?;
            if let Some(pos) = items.iter().position(|v| !v.is_string()) {
                return Err(violation(format!("item {pos} is not a string")));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                return Err(violation(format!("expected boolean, got {value}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{DecisionKind, TemplateKey};
    use crate::testing;
    use serde_json::json;

    fn raw(payload: impl Into<String>) -> RawOutput {
        RawOutput {
            payload: payload.into(),
            model_id: "screening-gpt".to_string(),
            model_version: "2024-06".to_string(),
            token_count: 512,
            cost: 0.0125,
            processing_time_ms: 840,
            attempts: 1,
        }
    }

    fn normalize_screening(payload: impl Into<String>) -> DecisionResult<AiDecision> {
        let request = testing::screening_request("acme", "cand-1");
        normalize(&raw(payload), &request, &testing::screening_template())
    }

    #[test]
    fn well_formed_output_is_copied_verbatim() {
        let payload = json!({
            "score": 87,
            "confidence": 0.82,
            "decision": "hire",
            "reasons": ["8 years of Rust", "led a platform team"],
            "insights": ["strong systems background"],
            "skills_match": 0.9
        });

        let decision = normalize_screening(payload.to_string()).unwrap();

        assert_eq!(decision.score, 87);
        assert_eq!(decision.confidence, 0.82);
        assert_eq!(decision.decision_label, "hire");
        assert_eq!(decision.reasons, vec!["8 years of Rust", "led a platform team"]);
        assert_eq!(decision.insights, vec!["strong systems background"]);
        assert_eq!(decision.details.get("skills_match"), Some(&json!(0.9)));
        assert_eq!(decision.kind, DecisionKind::Recruitment);
        assert_eq!(decision.template_key, TemplateKey::CandidateScreening);
        assert_eq!(decision.tenant.company_id().as_str(), "acme");
        assert_eq!(decision.metadata.model_id, "screening-gpt");
        assert_eq!(decision.metadata.token_count, 512);
        assert_eq!(decision.metadata.processing_time_ms, 840);
        assert_eq!(decision.metadata.cost, 0.0125);
    }

    #[test]
    fn each_normalization_gets_a_fresh_id() {
        let payload = testing::payload(70, 0.7, "interview");
        let a = normalize_screening(payload.clone()).unwrap();
        let b = normalize_screening(payload).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.score, b.score);
    }

    #[test]
    fn prose_around_the_object_is_repaired() {
        let payload = format!(
            "Sure! Here is the assessment:\n```json\n{}\n```\nLet me know if you need more.",
            testing::payload(62, 0.71, "interview")
        );
        let decision = normalize_screening(payload).unwrap();
        assert_eq!(decision.decision_label, "interview");
    }

    #[test]
    fn unrepairable_payloads_are_malformed() {
        for payload in ["no json here", "} backwards {", "{ \"score\": 5, ", "[1, 2, 3]"] {
            let err = normalize_screening(payload).unwrap_err();
            assert!(matches!(err, DecisionError::MalformedDecision(_)), "{payload}: {err:?}");
        }
    }

    #[test]
    fn range_and_type_violations_name_the_field() {
        let cases = [
            (json!({"score": 101, "confidence": 0.5, "decision": "hire", "reasons": [], "insights": []}), "score"),
            (json!({"score": 80.5, "confidence": 0.5, "decision": "hire", "reasons": [], "insights": []}), "score"),
            (json!({"score": 80, "confidence": 1.2, "decision": "hire", "reasons": [], "insights": []}), "confidence"),
            (json!({"score": 80, "confidence": 0.5, "decision": "promote", "reasons": [], "insights": []}), "decision"),
            (json!({"score": 80, "confidence": 0.5, "decision": "hire", "reasons": [1], "insights": []}), "reasons"),
            (json!({"score": 80, "confidence": 0.5, "decision": "hire", "reasons": []}), "insights"),
            (json!({"score": 80, "confidence": 0.5, "decision": "hire", "reasons": [], "insights": [], "skills_match": "high"}), "skills_match"),
        ];
        for (payload, field) in cases {
            match normalize_screening(payload.to_string()) {
                Err(DecisionError::SchemaViolation { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected schema violation on {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn null_optional_fields_are_skipped() {
        let payload = json!({
            "score": 30, "confidence": 0.9, "decision": "reject",
            "reasons": [], "insights": [], "skills_match": null
        });
        let decision = normalize_screening(payload.to_string()).unwrap();
        assert!(decision.details.is_empty());
    }

    #[test]
    fn mismatched_template_is_rejected() {
        let registry = testing::registry();
        let request = testing::screening_request("acme", "cand-1");
        let other = registry.get_key(TemplateKey::AttritionRisk).unwrap();
        let err = normalize(&raw(testing::payload(10, 0.9, "low")), &request, other).unwrap_err();
        assert!(matches!(err, DecisionError::InvalidTemplate { .. }));
    }
}
