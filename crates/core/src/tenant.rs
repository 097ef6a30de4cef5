use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::id::{CompanyId, EntityId};

/// The (company, entity) pair that scopes a decision.
///
/// Every request the engine processes carries one of these; there is no
/// constructor that skips validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    company_id: CompanyId,
    entity_id: EntityId,
    created_at: DateTime<Utc>,
}

impl TenantContext {
    /// Validate both identifiers and stamp the context with the current time.
    ///
    /// The company id is checked first, so a call with both identifiers empty
    /// reports the company.
    pub fn new(company_id: &str, entity_id: &str) -> CoreResult<Self> {
        Ok(Self {
            company_id: CompanyId::parse(company_id)?,
            entity_id: EntityId::parse(entity_id)?,
            created_at: Utc::now(),
        })
    }

    pub fn company_id(&self) -> &CompanyId {
        &self.company_id
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    #[test]
    fn context_requires_both_identifiers() {
        assert_eq!(
            TenantContext::new("", "cand-1").unwrap_err(),
            CoreError::EmptyIdentifier("company_id")
        );
        assert_eq!(
            TenantContext::new("acme", "").unwrap_err(),
            CoreError::EmptyIdentifier("entity_id")
        );

        let ctx = TenantContext::new("acme", "cand-1").unwrap();
        assert_eq!(ctx.company_id().as_str(), "acme");
        assert_eq!(ctx.entity_id().as_str(), "cand-1");
    }

    #[test]
    fn context_serializes_with_plain_string_ids() {
        let ctx = TenantContext::new("acme", "emp-7").unwrap();
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["company_id"], "acme");
        assert_eq!(json["entity_id"], "emp-7");
    }
}
