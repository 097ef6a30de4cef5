use thiserror::Error;

use forgehr_core::CoreError;

/// Result type used across the decision engine.
pub type DecisionResult<T> = Result<T, DecisionError>;

/// Why a backend call did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationFailure {
    #[error("backend call timed out")]
    Timeout,

    #[error("backend rate limited the call")]
    RateLimited,

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl InvocationFailure {
    /// Only transient failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, InvocationFailure::Timeout | InvocationFailure::RateLimited)
    }
}

/// Every way a decision can fail to materialise.
///
/// Grouped by how callers should react:
/// - configuration / input errors: fix the caller or the config, never retry
/// - transient backend errors: retried inside the invocation adapter only
/// - unavailability: no decision right now, apply a business fallback
/// - contract breaches: the backend answered garbage; surfaced by the engine
///   as `DecisionUnavailable`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error("tenant context missing: {0}")]
    TenantContextMissing(String),

    #[error("missing required input field(s): {}", fields.join(", "))]
    MissingInputField { fields: Vec<String> },

    #[error("unknown decision template: {0}")]
    UnknownTemplate(String),

    #[error("invalid template {key}: {reason}")]
    InvalidTemplate { key: String, reason: String },

    #[error("invalid tier table {taxonomy}: {reason}")]
    InvalidTierTable { taxonomy: String, reason: String },

    #[error("unknown taxonomy: {0}")]
    UnknownTaxonomy(String),

    #[error("score {0} outside [0, 100]")]
    ScoreOutOfRange(i64),

    #[error("model {model_id} timed out")]
    Timeout { model_id: String },

    #[error("model {model_id} rate limited")]
    RateLimited { model_id: String },

    #[error("model {model_id} unavailable: {reason}")]
    BackendUnavailable { model_id: String, reason: String },

    #[error("no decision available from {model_id} after {attempts} attempt(s): {cause}")]
    DecisionUnavailable {
        model_id: String,
        attempts: u32,
        cause: String,
    },

    #[error("malformed decision payload: {0}")]
    MalformedDecision(String),

    #[error("schema violation on field `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },
}

impl DecisionError {
    pub fn invalid_template(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_tier_table(taxonomy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTierTable {
            taxonomy: taxonomy.into(),
            reason: reason.into(),
        }
    }

    pub fn schema_violation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Caller or configuration error; retrying cannot help.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DecisionError::TenantContextMissing(_)
                | DecisionError::MissingInputField { .. }
                | DecisionError::UnknownTemplate(_)
                | DecisionError::InvalidTemplate { .. }
                | DecisionError::InvalidTierTable { .. }
                | DecisionError::UnknownTaxonomy(_)
                | DecisionError::ScoreOutOfRange(_)
        )
    }

    /// "No decision available now": the caller should defer or escalate.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DecisionError::BackendUnavailable { .. } | DecisionError::DecisionUnavailable { .. }
        )
    }

    /// The backend answered, but not with a usable decision.
    pub fn is_contract_breach(&self) -> bool {
        matches!(
            self,
            DecisionError::MalformedDecision(_) | DecisionError::SchemaViolation { .. }
        )
    }
}

impl From<CoreError> for DecisionError {
    fn from(value: CoreError) -> Self {
        DecisionError::TenantContextMissing(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_listed_in_message() {
        let err = DecisionError::MissingInputField {
            fields: vec!["resume_text".to_string(), "job_title".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing required input field(s): resume_text, job_title"
        );
        assert!(err.is_caller_error());
    }

    #[test]
    fn error_classes_are_disjoint() {
        let unavailable = DecisionError::DecisionUnavailable {
            model_id: "m".to_string(),
            attempts: 3,
            cause: "timeout".to_string(),
        };
        assert!(unavailable.is_unavailable());
        assert!(!unavailable.is_caller_error());
        assert!(!unavailable.is_contract_breach());

        let breach = DecisionError::MalformedDecision("no json".to_string());
        assert!(breach.is_contract_breach());
        assert!(!breach.is_unavailable());
    }

    #[test]
    fn core_errors_map_to_missing_tenant_context() {
        let err: DecisionError = CoreError::empty("company_id").into();
        assert!(matches!(err, DecisionError::TenantContextMissing(_)));
    }
}
