//! Model invocation boundary.
//!
//! Everything backend-specific lives behind [`ModelAdapter`]: an adapter
//! renders the ledger and tool schemas into its own request format and
//! translates the reply into backend-neutral [`ResponseItem`]s.

mod responses;
mod retry;
mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::Turn;
use crate::tools::ToolDefinition;

pub use responses::ResponsesClient;
pub use retry::{BackoffConfig, RetryReason};
pub use scripted::ScriptedModel;

/// Everything the model needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// Full ledger, oldest turn first
    pub turns: &'a [Turn],

    /// Tool capability advertisement
    pub tools: &'a [ToolDefinition],

    /// Whether the model may emit several tool calls meant to run together
    pub parallel_tool_calls: bool,
}

/// Backend-neutral output item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseItem {
    Message {
        text: String,
    },
    Reasoning {
        text: String,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    /// Item kind the loop does not act on (e.g. hosted search calls)
    Other {
        kind: String,
    },
}

impl ResponseItem {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }

    pub fn function_call(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self::FunctionCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Token usage reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

}

impl std::ops::Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, other: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: TokenUsage) {
        *self = *self + other;
    }
}

/// A model reply, already translated out of the backend format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub items: Vec<ResponseItem>,
    pub usage: Option<TokenUsage>,
}

impl ModelResponse {
    pub fn new(items: Vec<ResponseItem>) -> Self {
        Self { items, usage: None }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[derive(Debug, Error)]
pub enum ModelAdapterError {
    #[error("request to model backend failed")]
    Http(#[from] reqwest::Error),

    #[error("model backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode model response: {0}")]
    Decode(String),

    #[error("model backend violated the protocol: {0}")]
    Protocol(String),

    #[error("gave up after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ModelAdapterError>,
    },
}

/// Trait for model backends.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelAdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_sums_and_saturates() {
        let mut usage = TokenUsage::new(100, 10);
        usage += TokenUsage::new(150, 20);
        assert_eq!(usage, TokenUsage::new(250, 30));
        assert_eq!(usage.total_tokens(), 280);

        let big = TokenUsage::new(u64::MAX, 1) + TokenUsage::new(1, 1);
        assert_eq!(big.input_tokens, u64::MAX);
        assert_eq!(big.output_tokens, 2);
    }
}
