//! Scoring backends: the pluggable boundary behind the invocation adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InvocationFailure;
use crate::kind::TemplateKey;
use crate::request::{DecisionRequest, InputData, fingerprint};
use crate::template::DecisionTemplate;

/// Deployment status of a scoring model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Production,
    Experimental,
}

/// Identity of the model behind a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_id: String,
    pub version: String,
    pub status: ModelStatus,
}

impl ModelDescriptor {
    pub fn new(
        model_id: impl Into<String>,
        version: impl Into<String>,
        status: ModelStatus,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            version: version.into(),
            status,
        }
    }
}

/// What a backend returns: the unparsed payload plus accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendOutput {
    pub payload: String,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default)]
    pub cost: f64,
}

impl BackendOutput {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            token_count: 0,
            cost: 0.0,
        }
    }

    pub fn with_usage(mut self, token_count: u32, cost: f64) -> Self {
        self.token_count = token_count;
        self.cost = cost;
        self
    }
}

/// A scoring backend (network client, replay double, ...).
///
/// Implementations classify their own failures; the adapter decides what is
/// retried. The engine never inspects which implementation is wired in.
#[async_trait]
pub trait ModelBackend: Send + Sync + 'static {
    fn descriptor(&self) -> &ModelDescriptor;

    async fn score(
        &self,
        request: &DecisionRequest,
        template: &DecisionTemplate,
    ) -> Result<BackendOutput, InvocationFailure>;
}

/// Deterministic backend that answers from recorded outputs.
///
/// Recordings are keyed by the request fingerprint (template key + input
/// data), so tenant identity does not affect replay.
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    descriptor: ModelDescriptor,
    recordings: HashMap<String, BackendOutput>,
}

impl ReplayBackend {
    pub fn new(descriptor: ModelDescriptor) -> Self {
        Self {
            descriptor,
            recordings: HashMap::new(),
        }
    }

    pub fn record(&mut self, key: TemplateKey, data: &InputData, output: BackendOutput) {
        self.recordings.insert(fingerprint(key, data), output);
    }

    pub fn with_recording(
        mut self,
        key: TemplateKey,
        data: &InputData,
        output: BackendOutput,
    ) -> Self {
        self.record(key, data, output);
        self
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }
}

#[async_trait]
impl ModelBackend for ReplayBackend {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    async fn score(
        &self,
        request: &DecisionRequest,
        _template: &DecisionTemplate,
    ) -> Result<BackendOutput, InvocationFailure> {
        let key = request.fingerprint();
        self.recordings
            .get(&key)
            .cloned()
            .ok_or_else(|| InvocationFailure::Unavailable(format!("no recording for {key}")))
    }
}
