//! Decision pipeline facade: build → invoke → normalize → map tier.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::decision::{AiDecision, DecisionOutcome};
use crate::error::{DecisionError, DecisionResult};
use crate::invoke::InvocationAdapter;
use crate::normalize::normalize;
use crate::quality::{ModelQualityRecord, QualityMonitor, QualityReport};
use crate::request::{DecisionRequest, InputData, RequestBuilder};
use crate::template::TemplateRegistry;

/// One engine per process; cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct DecisionEngine {
    registry: Arc<TemplateRegistry>,
    builder: RequestBuilder,
    adapter: InvocationAdapter,
    monitor: Arc<QualityMonitor>,
}

impl DecisionEngine {
    /// Wire the pipeline. Every routed model is registered with the monitor
    /// so it shows up in metrics before its first decision.
    pub fn new(
        registry: Arc<TemplateRegistry>,
        adapter: InvocationAdapter,
        monitor: Arc<QualityMonitor>,
    ) -> Self {
        for model in adapter.models() {
            monitor.register(&model);
        }
        Self {
            builder: RequestBuilder::new(registry.clone()),
            registry,
            adapter,
            monitor,
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn adapter(&self) -> &InvocationAdapter {
        &self.adapter
    }

    pub fn monitor(&self) -> &Arc<QualityMonitor> {
        &self.monitor
    }

    #[instrument(
        name = "decide",
        skip_all,
        fields(template = %template_key, company_id = %company_id, entity_id = %entity_id)
    )]
    pub async fn decide(
        &self,
        template_key: &str,
        data: InputData,
        company_id: &str,
        entity_id: &str,
    ) -> DecisionResult<DecisionOutcome> {
        let request = self.builder.build(template_key, data, company_id, entity_id)?;
        self.decide_request(&request).await
    }

    /// Run an already-built request through the rest of the pipeline.
    pub async fn decide_request(
        &self,
        request: &DecisionRequest,
    ) -> DecisionResult<DecisionOutcome> {
        let template = self.registry.get_key(request.template_key())?;
        let raw = self.adapter.invoke(request, template).await?;

        // Tokens were spent whether or not the payload turns out usable.
        self.monitor
            .record_usage(&raw.model_id, raw.token_count, raw.cost, raw.processing_time_ms);

        let decision = match normalize(&raw, request, template) {
            Ok(decision) => decision,
            Err(err) if err.is_contract_breach() => {
                warn!(
                    request_id = %request.id(),
                    model_id = %raw.model_id,
                    error = %err,
                    raw_payload = %raw.payload,
                    "backend breached decision contract"
                );
                return Err(DecisionError::DecisionUnavailable {
                    model_id: raw.model_id,
                    attempts: raw.attempts,
                    cause: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        };

        let tier = match template.taxonomy() {
            Some(taxonomy) => Some(
                self.registry
                    .map_tier(i64::from(decision.score), taxonomy)?
                    .clone(),
            ),
            None => None,
        };

        info!(
            request_id = %request.id(),
            decision_id = %decision.id,
            model_id = %decision.metadata.model_id,
            score = decision.score,
            label = %decision.decision_label,
            tier = tier.as_ref().map(|t| t.label.as_str()).unwrap_or("-"),
            "decision produced"
        );

        Ok(DecisionOutcome { decision, tier })
    }

    /// Feed ground truth for a previously produced decision back into the
    /// quality monitor.
    pub fn reconcile(&self, decision: &AiDecision, observed_label: &str) {
        self.monitor.record_outcome(
            &decision.metadata.model_id,
            &decision.decision_label,
            observed_label,
        );
    }

    pub fn get_metrics(&self) -> Vec<ModelQualityRecord> {
        self.monitor.get_metrics()
    }

    pub fn analyze_quality(&self) -> QualityReport {
        self.monitor.analyze_quality()
    }
}
