//! Model invocation adapter: routing, timeouts, retries and backpressure.
//!
//! - Routing: one backend per [`DecisionKind`], resolved by exhaustive match.
//! - Timeout: every attempt is bounded; expiry drops the backend future.
//! - Retries: only `Timeout` and `RateLimited`, with bounded exponential
//!   backoff. `BackendUnavailable` is surfaced immediately.
//! - Backpressure: in-flight calls are capped per model id. The slot is an
//!   owned semaphore permit, so it is returned on every exit path, including
//!   cancellation of the caller's future.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::backend::{BackendOutput, ModelBackend, ModelDescriptor};
use crate::error::{DecisionError, DecisionResult, InvocationFailure};
use crate::kind::DecisionKind;
use crate::request::DecisionRequest;
use crate::retry::RetryPolicy;
use crate::template::DecisionTemplate;

/// What to do with a call when the model's in-flight cap is reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait (bounded by the call timeout) for a slot.
    Queue,
    /// Fail the attempt immediately as rate limited.
    Reject,
}

#[derive(Debug, Clone)]
pub struct InvocationConfig {
    /// Budget for a single backend attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Concurrent calls allowed per model id (minimum 1).
    pub max_in_flight: usize,
    pub overflow: OverflowPolicy,
}

impl Default for InvocationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            max_in_flight: 8,
            overflow: OverflowPolicy::Queue,
        }
    }
}

/// One value per decision kind.
#[derive(Debug, Clone)]
pub struct KindTable<T> {
    pub recruitment: T,
    pub employee: T,
    pub risk: T,
    pub opportunity: T,
}

impl<T> KindTable<T> {
    pub fn uniform(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            recruitment: value.clone(),
            employee: value.clone(),
            risk: value.clone(),
            opportunity: value,
        }
    }

    pub fn get(&self, kind: DecisionKind) -> &T {
        match kind {
            DecisionKind::Recruitment => &self.recruitment,
            DecisionKind::Employee => &self.employee,
            DecisionKind::Risk => &self.risk,
            DecisionKind::Opportunity => &self.opportunity,
        }
    }

    fn get_mut(&mut self, kind: DecisionKind) -> &mut T {
        match kind {
            DecisionKind::Recruitment => &mut self.recruitment,
            DecisionKind::Employee => &mut self.employee,
            DecisionKind::Risk => &mut self.risk,
            DecisionKind::Opportunity => &mut self.opportunity,
        }
    }

    pub fn with(mut self, kind: DecisionKind, value: T) -> Self {
        *self.get_mut(kind) = value;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (DecisionKind, &T)> {
        DecisionKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> KindTable<U> {
        KindTable {
            recruitment: f(&self.recruitment),
            employee: f(&self.employee),
            risk: f(&self.risk),
            opportunity: f(&self.opportunity),
        }
    }
}

/// Backend routing table.
pub type BackendRoutes = KindTable<Arc<dyn ModelBackend>>;

/// Unparsed backend output plus invocation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
    pub payload: String,
    pub model_id: String,
    pub model_version: String,
    pub token_count: u32,
    pub cost: f64,
    pub processing_time_ms: u64,
    /// Attempt (1-indexed) that produced this output.
    pub attempts: u32,
}

#[derive(Clone)]
struct Route {
    backend: Arc<dyn ModelBackend>,
    slots: Arc<Semaphore>,
    capacity: usize,
}

pub struct InvocationAdapter {
    routes: KindTable<Route>,
    config: InvocationConfig,
}

impl std::fmt::Debug for InvocationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationAdapter")
            .field("models", &self.models())
            .field("config", &self.config)
            .finish()
    }
}

impl InvocationAdapter {
    /// Kinds routed to the same model id share one in-flight cap.
    pub fn new(routes: BackendRoutes, config: InvocationConfig) -> Self {
        let capacity = config.max_in_flight.max(1);
        let mut slots: HashMap<String, Arc<Semaphore>> = HashMap::new();
        let routes = routes.map(|backend| {
            let model_id = backend.descriptor().model_id.clone();
            let slots = slots
                .entry(model_id)
                .or_insert_with(|| Arc::new(Semaphore::new(capacity)))
                .clone();
            Route {
                backend: backend.clone(),
                slots,
                capacity,
            }
        });
        Self { routes, config }
    }

    pub fn config(&self) -> &InvocationConfig {
        &self.config
    }

    /// Distinct models behind the routing table.
    pub fn models(&self) -> Vec<ModelDescriptor> {
        let mut out: Vec<ModelDescriptor> = Vec::new();
        for (_, route) in self.routes.iter() {
            let d = route.backend.descriptor();
            if !out.iter().any(|m| m.model_id == d.model_id) {
                out.push(d.clone());
            }
        }
        out
    }

    pub fn model_for(&self, kind: DecisionKind) -> &ModelDescriptor {
        self.routes.get(kind).backend.descriptor()
    }

    /// Calls currently holding a slot for `model_id`.
    pub fn in_flight(&self, model_id: &str) -> usize {
        self.routes
            .iter()
            .map(|(_, r)| r)
            .find(|r| r.backend.descriptor().model_id == model_id)
            .map(|r| r.capacity - r.slots.available_permits())
            .unwrap_or(0)
    }

    pub async fn invoke(
        &self,
        request: &DecisionRequest,
        template: &DecisionTemplate,
    ) -> DecisionResult<RawOutput> {
        let route = self.routes.get(template.kind());
        let model = route.backend.descriptor();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match self.attempt(route, request, template).await {
                Ok((output, elapsed)) => {
                    debug!(
                        request_id = %request.id(),
                        model_id = %model.model_id,
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "backend call succeeded"
                    );
                    return Ok(RawOutput {
                        payload: output.payload,
                        model_id: model.model_id.clone(),
                        model_version: model.version.clone(),
                        token_count: output.token_count,
                        cost: output.cost,
                        processing_time_ms: elapsed.as_millis() as u64,
                        attempts,
                    });
                }
                Err(err @ (DecisionError::Timeout { .. } | DecisionError::RateLimited { .. })) => {
                    if !self.config.retry.should_retry(attempts) {
                        warn!(
                            request_id = %request.id(),
                            model_id = %model.model_id,
                            attempts,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(DecisionError::DecisionUnavailable {
                            model_id: model.model_id.clone(),
                            attempts,
                            cause: err.to_string(),
                        });
                    }
                    let delay = self.config.retry.delay_for_retry(attempts);
                    warn!(
                        request_id = %request.id(),
                        model_id = %model.model_id,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient backend failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(
                        request_id = %request.id(),
                        model_id = %model.model_id,
                        attempts,
                        error = %err,
                        "backend call failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// One attempt. The slot wait and the backend call share a single
    /// deadline of `config.timeout`.
    async fn attempt(
        &self,
        route: &Route,
        request: &DecisionRequest,
        template: &DecisionTemplate,
    ) -> DecisionResult<(BackendOutput, Duration)> {
        let model_id = &route.backend.descriptor().model_id;
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let _permit = self.acquire_slot(route, model_id, deadline).await?;

        let result = timeout_at(deadline, route.backend.score(request, template)).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(output)) => Ok((output, elapsed)),
            Ok(Err(failure)) => Err(classify(failure, model_id)),
            Err(_) => Err(DecisionError::Timeout {
                model_id: model_id.clone(),
            }),
        }
    }

    async fn acquire_slot(
        &self,
        route: &Route,
        model_id: &str,
        deadline: Instant,
    ) -> DecisionResult<OwnedSemaphorePermit> {
        let rate_limited = || DecisionError::RateLimited {
            model_id: model_id.to_string(),
        };
        match self.config.overflow {
            OverflowPolicy::Reject => route
                .slots
                .clone()
                .try_acquire_owned()
                .map_err(|_| rate_limited()),
            OverflowPolicy::Queue => {
                match timeout_at(deadline, route.slots.clone().acquire_owned()).await {
                    Ok(Ok(permit)) => Ok(permit),
                    Ok(Err(_closed)) => Err(DecisionError::BackendUnavailable {
                        model_id: model_id.to_string(),
                        reason: "concurrency limiter closed".to_string(),
                    }),
                    Err(_) => Err(rate_limited()),
                }
            }
        }
    }
}

fn classify(failure: InvocationFailure, model_id: &str) -> DecisionError {
    let model_id = model_id.to_string();
    match failure {
        InvocationFailure::Timeout => DecisionError::Timeout { model_id },
        InvocationFailure::RateLimited => DecisionError::RateLimited { model_id },
        InvocationFailure::Unavailable(reason) => {
            DecisionError::BackendUnavailable { model_id, reason }
        }
    }
}
