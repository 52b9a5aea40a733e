//! Executes a single tool call against the registry.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::Instrument;

use super::decoder::decode;
use super::error::ToolError;
use super::ledger::{ToolCallRequest, ToolCallResult};
use crate::tools::ToolRegistry;

/// Turns tool-call requests into results. Tool failures of any kind, panics
/// included, come back as failed results rather than errors.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Dispatch one request and report the outcome.
    pub async fn dispatch(&self, request: &ToolCallRequest) -> ToolCallResult {
        let span = tracing::info_span!(
            "tool",
            tool.name = %request.name,
            tool.id = %request.call_id,
            tool.success = tracing::field::Empty,
        );

        async {
            let result = match self.invoke(request).await {
                Ok(output) => ToolCallResult::success(&request.call_id, output),
                Err(e) => {
                    tracing::warn!(kind = %e.kind(), "Tool call failed: {}", e);
                    ToolCallResult::failure(&request.call_id, e.to_string())
                }
            };
            tracing::Span::current().record("tool.success", result.is_success());
            result
        }
        .instrument(span)
        .await
    }

    async fn invoke(&self, request: &ToolCallRequest) -> Result<String, ToolError> {
        let tool = self
            .registry
            .lookup(&request.name)
            .map_err(|_| ToolError::UnknownTool(request.name.clone()))?;

        let args = decode(&request.name, Some(&request.arguments))?;

        tracing::debug!("Calling tool {} with args: {}", request.name, request.arguments);

        let outcome = AssertUnwindSafe(tool.execute(Value::Object(args)))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => Ok(encode_output(&value)),
            Ok(Err(e)) => Err(ToolError::Execution {
                name: request.name.clone(),
                cause: format!("{:#}", e),
            }),
            Err(panic) => Err(ToolError::Execution {
                name: request.name.clone(),
                cause: format!("panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }
}

/// Text form of a tool's return value. Strings pass through untouched, other
/// values become compact JSON (object keys sorted).
pub fn encode_output(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
