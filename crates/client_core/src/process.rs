//! Access to the remote game process.
//!
//! The process is an external collaborator that accepts named actions in two
//! call modes: a side-effect free dry run and a mutating message call.
//! [`ProcessClient`] is the seam the rest of the crate talks through;
//! [`GatewayProcessClient`] speaks to an HTTP gateway in front of the process.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::ProcessId,
    error::GatewayError,
    protocol::{DryRunOptions, ProcessAction, ProcessRequest, ProcessResult, Tag},
};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait ProcessClient: Send + Sync {
    async fn dry_run(
        &self,
        process: &ProcessId,
        tags: &[Tag],
        options: &DryRunOptions,
    ) -> Result<ProcessResult>;

    async fn message(&self, process: &ProcessId, tags: &[Tag]) -> Result<ProcessResult>;
}

/// Dry-runs `action` and decodes `Messages[0].Data` as JSON. `Ok(None)` when
/// the process returned no data.
pub async fn dry_run_json(
    client: &dyn ProcessClient,
    process: &ProcessId,
    action: &ProcessAction,
    options: &DryRunOptions,
) -> Result<Option<Value>> {
    let result = client
        .dry_run(process, &action.tags(), options)
        .await
        .with_context(|| format!("dry run {} failed", action.name()))?;
    decode_first_data(&result, action)
}

pub async fn send_action(
    client: &dyn ProcessClient,
    process: &ProcessId,
    action: &ProcessAction,
) -> Result<ProcessResult> {
    client
        .message(process, &action.tags())
        .await
        .with_context(|| format!("message {} failed", action.name()))
}

fn decode_first_data(result: &ProcessResult, action: &ProcessAction) -> Result<Option<Value>> {
    let Some(data) = result.first_data() else {
        return Ok(None);
    };
    let value = serde_json::from_str(data)
        .with_context(|| format!("invalid {} payload: {data}", action.name()))?;
    Ok(Some(value))
}

pub struct GatewayProcessClient {
    http: Client,
    gateway_url: String,
}

impl GatewayProcessClient {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(
        &self,
        endpoint: &str,
        process: &ProcessId,
        request: &ProcessRequest,
    ) -> Result<ProcessResult> {
        let res = self
            .http
            .post(format!("{}/{endpoint}", self.gateway_url))
            .query(&[("process-id", process.as_str())])
            .json(request)
            .send()
            .await
            .with_context(|| format!("failed to reach gateway: {}", self.gateway_url))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::from_response(status.as_u16(), &body).into());
        }

        let result: ProcessResult = res.json().await?;
        debug!(
            process = %process,
            endpoint,
            messages = result.messages.len(),
            "process: gateway call completed"
        );
        Ok(result)
    }
}

#[async_trait]
impl ProcessClient for GatewayProcessClient {
    async fn dry_run(
        &self,
        process: &ProcessId,
        tags: &[Tag],
        options: &DryRunOptions,
    ) -> Result<ProcessResult> {
        let request = ProcessRequest {
            id: Uuid::new_v4().to_string(),
            target: process.0.clone(),
            owner: options.owner.clone(),
            tags: tags.to_vec(),
            data: String::new(),
        };
        self.post("dry-run", process, &request).await
    }

    async fn message(&self, process: &ProcessId, tags: &[Tag]) -> Result<ProcessResult> {
        let request = ProcessRequest {
            id: Uuid::new_v4().to_string(),
            target: process.0.clone(),
            owner: None,
            tags: tags.to_vec(),
            data: String::new(),
        };
        self.post("message", process, &request).await
    }
}

#[cfg(test)]
#[path = "tests/process_tests.rs"]
mod tests;
