//! Adapter for OpenAI Responses-compatible endpoints.
//!
//! Works against any server exposing `POST {base_url}/responses` (OpenAI,
//! NVIDIA NIM, vLLM, Ollama and friends).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::retry::{BackoffConfig, RetryReason};
use super::{ModelAdapter, ModelAdapterError, ModelRequest, ModelResponse, ResponseItem, TokenUsage};
use crate::agent::Turn;
use crate::config::Config;
use crate::tools::ToolDefinition;
use crate::util::truncate;

/// Longest error body kept in a `ModelAdapterError::Status`.
const MAX_ERROR_BODY: usize = 2000;

/// HTTP client for the Responses API.
#[derive(Debug, Clone)]
pub struct ResponsesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    reasoning_effort: Option<String>,
    max_retries: u32,
    backoff: BackoffConfig,
}

impl ResponsesClient {
    /// Create a client with default timeout and retry settings.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
            reasoning_effort: None,
            max_retries: 3,
            backoff: BackoffConfig::default(),
        }
    }

    /// Build a client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ModelAdapterError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: Some(config.api_key.clone()),
            model: config.model.clone(),
            reasoning_effort: config.reasoning_effort.clone(),
            max_retries: config.max_retries,
            backoff: BackoffConfig::default(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_reasoning_effort(mut self, effort: impl Into<String>) -> Self {
        self.reasoning_effort = Some(effort.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request body for one call.
    pub fn build_body(&self, request: &ModelRequest<'_>) -> Value {
        let mut body = json!({
            "model": self.model,
            "input": render_input(request.turns),
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(render_tool).collect());
            body["tool_choice"] = json!("auto");
            body["parallel_tool_calls"] = json!(request.parallel_tool_calls);
        }

        if let Some(effort) = &self.reasoning_effort {
            body["reasoning"] = json!({ "effort": effort });
        }

        body
    }

    async fn send(&self, body: &Value) -> Result<Value, ModelAdapterError> {
        let url = format!("{}/responses", self.base_url.trim_end_matches('/'));
        let mut attempt = 0u32;

        loop {
            let err = match self.send_once(&url, body).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            match retry_reason(&err) {
                None => return Err(err),
                Some(_) if attempt >= self.max_retries => {
                    if attempt == 0 {
                        return Err(err);
                    }
                    return Err(ModelAdapterError::RetriesExhausted {
                        attempts: attempt + 1,
                        last: Box::new(err),
                    });
                }
                Some(reason) => {
                    let delay = self.backoff.jittered_delay_for(attempt);
                    tracing::warn!(
                        reason = %reason,
                        attempt = attempt + 1,
                        "Model request failed, retrying in {:?}: {}",
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(&self, url: &str, body: &Value) -> Result<Value, ModelAdapterError> {
        let mut req = self.http.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ModelAdapterError::Status {
                status: status.as_u16(),
                body: truncate(&text, MAX_ERROR_BODY),
            });
        }

        serde_json::from_str(&text).map_err(|e| ModelAdapterError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ModelAdapter for ResponsesClient {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelAdapterError> {
        let body = self.build_body(&request);
        tracing::debug!(
            model = %self.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Calling Responses API"
        );

        let raw = self.send(&body).await?;
        parse_response(&raw)
    }
}

fn retry_reason(error: &ModelAdapterError) -> Option<RetryReason> {
    match error {
        ModelAdapterError::Http(e) => RetryReason::from_transport(e),
        ModelAdapterError::Status { status, .. } => RetryReason::from_status(*status),
        ModelAdapterError::Decode(_)
        | ModelAdapterError::Protocol(_)
        | ModelAdapterError::RetriesExhausted { .. } => None,
    }
}

/// Ledger turns as Responses API input items.
pub fn render_input(turns: &[Turn]) -> Vec<Value> {
    turns
        .iter()
        .map(|turn| match turn {
            Turn::System { content } => json!({"role": "system", "content": content}),
            Turn::User { content } => json!({"role": "user", "content": content}),
            Turn::Assistant { content } => json!({"role": "assistant", "content": content}),
            Turn::ToolCall(request) => json!({
                "type": "function_call",
                "call_id": request.call_id,
                "name": request.name,
                "arguments": request.arguments,
            }),
            Turn::ToolResult(result) => json!({
                "type": "function_call_output",
                "call_id": result.call_id,
                "output": result.output,
            }),
        })
        .collect()
}

/// Tool definition in Responses API function format.
pub fn render_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
        "strict": tool.strict,
    })
}

/// Translate a Responses API body into neutral items.
pub fn parse_response(raw: &Value) -> Result<ModelResponse, ModelAdapterError> {
    if let Some(message) = raw.get("error").and_then(|e| e.get("message")).and_then(Value::as_str) {
        return Err(ModelAdapterError::Protocol(message.to_string()));
    }

    let output = raw
        .get("output")
        .and_then(Value::as_array)
        .ok_or_else(|| ModelAdapterError::Decode("response has no `output` array".to_string()))?;

    let mut items = Vec::with_capacity(output.len());
    for item in output {
        let kind = item.get("type").and_then(Value::as_str).unwrap_or_default();
        let parsed = match kind {
            "message" => ResponseItem::Message {
                text: collect_text(item.get("content"), &["output_text", "refusal"]),
            },
            "reasoning" => {
                let mut parts = Vec::new();
                for field in ["summary", "content"] {
                    let text = collect_text(item.get(field), &["summary_text", "reasoning_text"]);
                    if !text.is_empty() {
                        parts.push(text);
                    }
                }
                ResponseItem::Reasoning {
                    text: parts.join("\n"),
                }
            }
            "function_call" => {
                let name = item
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ModelAdapterError::Protocol("function_call item without a name".to_string())
                    })?
                    .to_string();
                let call_id = item
                    .get("call_id")
                    .or_else(|| item.get("id"))
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                let arguments = match item.get("arguments") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                };
                ResponseItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                }
            }
            other => ResponseItem::Other {
                kind: other.to_string(),
            },
        };
        items.push(parsed);
    }

    let usage = raw.get("usage").map(|u| {
        TokenUsage::new(
            u.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
            u.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        )
    });

    Ok(ModelResponse { items, usage })
}

/// Concatenate the `text` of content parts whose type is in `kinds`.
/// Parts without a type are accepted too; some servers omit it.
fn collect_text(parts: Option<&Value>, kinds: &[&str]) -> String {
    let Some(parts) = parts.and_then(Value::as_array) else {
        return String::new();
    };

    parts
        .iter()
        .filter(|part| {
            part.get("type")
                .and_then(Value::as_str)
                .map(|t| kinds.contains(&t))
                .unwrap_or(true)
        })
        .filter_map(|part| {
            part.get("text")
                .or_else(|| part.get("refusal"))
                .and_then(Value::as_str)
        })
        .collect::<Vec<_>>()
        .join("")
}
