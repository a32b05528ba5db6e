//! Model router implementation

use super::types::{ModelCandidate, ModelOverrides, ModelPlan, RouterConfig, DEFAULT_ROLE, HARD_DEFAULT_MODEL};
use crate::client::{ClientSet, DeltaSink};
use crate::completion::{ModelRequest, ModelResponse, ModelResult};
use crate::error::{CandidateFailure, Error, Result};
use crate::message::Message;
use crate::retry::retry_with_backoff;
use crate::tools::ToolDefinition;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Resolves roles to model plans and executes calls with retry and fallback.
///
/// The router holds no per-call state and can be shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ModelRouter {
    clients: ClientSet,
    config: RouterConfig,
}

impl ModelRouter {
    /// Create a router
    #[must_use]
    pub fn new(config: RouterConfig, clients: ClientSet) -> Self {
        Self { clients, config }
    }

    /// Router settings
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Registered client prefixes
    #[must_use]
    pub fn client_prefixes(&self) -> Vec<&str> {
        self.clients.prefixes()
    }

    /// Resolve `role` into an ordered plan.
    ///
    /// An explicit model in `overrides` is the sole candidate. Otherwise the
    /// role's own chain is used, or the `"default"` role's chain for unknown
    /// roles, or the global default model when no roles are configured;
    /// global fallbacks are appended and duplicates removed.
    #[must_use]
    pub fn resolve(&self, role: &str, overrides: &ModelOverrides) -> ModelPlan {
        let spec = self
            .config
            .role_models
            .get(role)
            .or_else(|| self.config.role_models.get(DEFAULT_ROLE));

        let temperature = overrides
            .temperature
            .or_else(|| spec.and_then(|s| s.temperature))
            .unwrap_or(self.config.temperature);
        let max_tokens = overrides
            .max_tokens
            .or_else(|| spec.and_then(|s| s.max_tokens))
            .unwrap_or(self.config.max_tokens);

        let models: Vec<String> = match (&overrides.model, spec) {
            (Some(model), _) if !model.is_empty() => vec![model.clone()],
            (_, Some(spec)) => {
                let mut chain = Vec::with_capacity(1 + spec.fallback.len());
                chain.push(spec.model.clone());
                chain.extend(spec.fallback.iter().cloned());
                chain.extend(self.config.fallback_models.iter().cloned());
                chain
            }
            (_, None) => {
                let primary = if self.config.default_model.is_empty() {
                    HARD_DEFAULT_MODEL.to_string()
                } else {
                    self.config.default_model.clone()
                };
                let mut chain = vec![primary];
                chain.extend(self.config.fallback_models.iter().cloned());
                chain
            }
        };

        let mut candidates: Vec<ModelCandidate> = Vec::with_capacity(models.len());
        for model in models {
            if model.is_empty() || candidates.iter().any(|c| c.model == model) {
                continue;
            }
            candidates.push(ModelCandidate {
                model,
                temperature,
                max_tokens,
            });
        }
        if candidates.is_empty() {
            candidates.push(ModelCandidate {
                model: HARD_DEFAULT_MODEL.to_string(),
                temperature,
                max_tokens,
            });
        }

        debug!(role, models = ?candidates.iter().map(|c| &c.model).collect::<Vec<_>>(), "Resolved model plan");
        ModelPlan {
            role: role.to_string(),
            candidates,
        }
    }

    /// Execute a call against `plan`.
    ///
    /// Transient failures are retried on the same candidate; fatal ones move
    /// on immediately. Fails with [`Error::ProviderExhausted`] when no
    /// candidate succeeds.
    #[instrument(skip(self, plan, messages, tools), fields(role = %plan.role))]
    pub async fn call(
        &self,
        plan: &ModelPlan,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResult> {
        self.call_plan(plan, messages, tools, None).await
    }

    /// Like [`ModelRouter::call`], streaming response text to `on_delta`.
    ///
    /// A candidate that fails after streaming part of its reply is retried
    /// or replaced like any other, so fragments of a failed attempt may
    /// already have been delivered.
    #[instrument(skip(self, plan, messages, tools, on_delta), fields(role = %plan.role))]
    pub async fn call_streaming(
        &self,
        plan: &ModelPlan,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_delta: DeltaSink<'_>,
    ) -> Result<ModelResult> {
        self.call_plan(plan, messages, tools, Some(on_delta)).await
    }

    async fn call_plan(
        &self,
        plan: &ModelPlan,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_delta: Option<DeltaSink<'_>>,
    ) -> Result<ModelResult> {
        let mut failures = Vec::new();

        for candidate in &plan.candidates {
            match self.call_candidate(candidate, messages, tools, on_delta).await {
                Ok(response) => {
                    if !failures.is_empty() {
                        info!(model = %candidate.model, skipped = failures.len(), "Fallback model answered");
                    }
                    return Ok(ModelResult {
                        model_used: candidate.model.clone(),
                        response,
                    });
                }
                Err(failure) => {
                    warn!(
                        model = %failure.model,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "Model candidate failed"
                    );
                    failures.push(failure);
                }
            }
        }

        Err(Error::ProviderExhausted { failures })
    }

    async fn call_candidate(
        &self,
        candidate: &ModelCandidate,
        messages: &[Message],
        tools: &[ToolDefinition],
        on_delta: Option<DeltaSink<'_>>,
    ) -> std::result::Result<ModelResponse, CandidateFailure> {
        let Some((client, model_id)) = self.clients.select(&candidate.model) else {
            return Err(CandidateFailure {
                model: candidate.model.clone(),
                attempts: 0,
                error: Error::NotConfigured(format!("no client for model '{}'", candidate.model))
                    .to_string(),
            });
        };

        let request = ModelRequest::new(model_id, messages.to_vec())
            .with_tools(tools.to_vec())
            .with_temperature(Some(candidate.temperature))
            .with_max_tokens(Some(candidate.max_tokens));
        let timeout_secs = self.config.call_timeout_secs;

        let result = retry_with_backoff(
            &self.config.retry,
            |attempt| {
                let client = client.clone();
                let request = request.clone();
                async move {
                    debug!(model = %request.model, attempt, client = client.name(), "Calling model");
                    let call = async {
                        match on_delta {
                            Some(sink) => client.call_stream(request, sink).await,
                            None => client.call(request).await,
                        }
                    };
                    if timeout_secs == 0 {
                        return call.await;
                    }
                    match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
                        Ok(result) => result,
                        Err(_) => Err(Error::Timeout(timeout_secs)),
                    }
                }
            },
            Error::is_transient,
        )
        .await;

        result.map_err(|e| CandidateFailure {
            model: candidate.model.clone(),
            attempts: e.attempts,
            error: e.last_error.to_string(),
        })
    }
}
