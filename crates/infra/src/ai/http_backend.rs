//! JSON-over-HTTP scoring backend.
//!
//! The endpoint receives the template contract and the input data and answers
//! with `{"output": <string|object>, "usage": {"total_tokens", "cost"}}`. A
//! body that is not such an envelope is handed to the normalizer verbatim.

use std::time::Duration;

use async_trait::async_trait;
use forgehr_ai::{
    BackendOutput, DecisionRequest, DecisionTemplate, InputData, InvocationFailure, ModelBackend,
    ModelDescriptor, OutputField,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Transport-level ceiling; the adapter's per-attempt timeout normally
    /// fires first.
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpModelBackend {
    descriptor: ModelDescriptor,
    config: HttpBackendConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    model: &'a str,
    model_version: &'a str,
    template: &'a str,
    description: &'a str,
    labels: &'a [String],
    output_schema: &'a [OutputField],
    inputs: &'a InputData,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    output: JsonValue,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
    #[serde(default)]
    cost: f64,
}

impl HttpModelBackend {
    pub fn new(
        descriptor: ModelDescriptor,
        config: HttpBackendConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            descriptor,
            config,
            client,
        })
    }
}

fn classify_status(status: StatusCode) -> Option<InvocationFailure> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => InvocationFailure::Timeout,
        StatusCode::TOO_MANY_REQUESTS => InvocationFailure::RateLimited,
        other => InvocationFailure::Unavailable(format!("endpoint returned {other}")),
    })
}

fn classify_transport(err: &reqwest::Error) -> InvocationFailure {
    if err.is_timeout() {
        InvocationFailure::Timeout
    } else {
        InvocationFailure::Unavailable(err.to_string())
    }
}

fn parse_body(body: String) -> BackendOutput {
    match serde_json::from_str::<ScoreResponse>(&body) {
        Ok(ScoreResponse { output, usage }) => {
            let payload = match output {
                JsonValue::String(text) => text,
                other => other.to_string(),
            };
            BackendOutput::new(payload).with_usage(usage.total_tokens, usage.cost)
        }
        Err(_) => BackendOutput::new(body),
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    async fn score(
        &self,
        request: &DecisionRequest,
        template: &DecisionTemplate,
    ) -> Result<BackendOutput, InvocationFailure> {
        let body = ScoreRequest {
            model: &self.descriptor.model_id,
            model_version: &self.descriptor.version,
            template: template.key().as_str(),
            description: template.description(),
            labels: template.labels(),
            output_schema: template.output_schema(),
            inputs: request.data(),
        };

        let mut call = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await.map_err(|e| classify_transport(&e))?;
        if let Some(failure) = classify_status(response.status()) {
            return Err(failure);
        }
        let text = response.text().await.map_err(|e| classify_transport(&e))?;
        debug!(
            request_id = %request.id(),
            model_id = %self.descriptor.model_id,
            bytes = text.len(),
            "model endpoint answered"
        );
        Ok(parse_body(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn statuses_map_onto_retry_classes() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert_eq!(classify_status(StatusCode::GATEWAY_TIMEOUT), Some(InvocationFailure::Timeout));
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(InvocationFailure::RateLimited)
        );
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(InvocationFailure::Unavailable(_))
        ));
    }

    #[test]
    fn envelope_output_and_usage_are_extracted() {
        let body = json!({
            "output": {"score": 70, "decision": "interview"},
            "usage": {"total_tokens": 321, "cost": 0.004}
        });
        let out = parse_body(body.to_string());
        assert_eq!(out.token_count, 321);
        assert_eq!(out.cost, 0.004);
        let payload: JsonValue = serde_json::from_str(&out.payload).unwrap();
        assert_eq!(payload["score"], 70);

        let out = parse_body(json!({"output": "{\"score\": 5}"}).to_string());
        assert_eq!(out.payload, "{\"score\": 5}");
        assert_eq!(out.token_count, 0);
    }

    #[test]
    fn non_envelope_bodies_pass_through() {
        let out = parse_body("Sure! {\"score\": 5}".to_string());
        assert_eq!(out.payload, "Sure! {\"score\": 5}");
    }
}
