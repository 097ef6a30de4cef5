use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;

use forgehr_core::{RequestId, TenantContext};

use crate::error::{DecisionError, DecisionResult};
use crate::kind::TemplateKey;
use crate::template::TemplateRegistry;

/// Caller-supplied input fields (sorted, so serialisation is canonical).
pub type InputData = BTreeMap<String, JsonValue>;

/// A complete, tenant-scoped request for one decision.
///
/// Immutable once built; the only way to obtain one is through
/// [`RequestBuilder::build`], which guarantees the tenant context is present
/// and every required input is supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRequest {
    id: RequestId,
    template_key: TemplateKey,
    data: InputData,
    tenant: TenantContext,
}

impl DecisionRequest {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn template_key(&self) -> TemplateKey {
        self.template_key
    }

    pub fn data(&self) -> &InputData {
        &self.data
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    /// Canonical `key|{json}` rendering of the template key and input data.
    ///
    /// Tenant identity is deliberately excluded so the same inputs replay the
    /// same recording for any tenant.
    pub fn fingerprint(&self) -> String {
        fingerprint(self.template_key, &self.data)
    }
}

pub fn fingerprint(key: TemplateKey, data: &InputData) -> String {
    let object: serde_json::Map<String, JsonValue> =
        data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    format!("{}|{}", key.as_str(), JsonValue::Object(object))
}

/// Assembles requests against a loaded registry. Pure: no IO, no clocks
/// beyond stamping `created_at`.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    registry: Arc<TemplateRegistry>,
}

impl RequestBuilder {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self { registry }
    }

    pub fn build(
        &self,
        template_key: &str,
        data: InputData,
        company_id: &str,
        entity_id: &str,
    ) -> DecisionResult<DecisionRequest> {
        let tenant = TenantContext::new(company_id, entity_id)?;
        let template = self.registry.get(template_key)?;

        let missing: Vec<String> = template
            .required_inputs()
            .iter()
            .filter(|field| matches!(data.get(field.as_str()), None | Some(JsonValue::Null)))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DecisionError::MissingInputField { fields: missing });
        }

        Ok(DecisionRequest {
            id: RequestId::new(),
            template_key: template.key(),
            data,
            tenant,
        })
    }
}
