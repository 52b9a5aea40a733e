//! Error taxonomy for the conversation loop.
//!
//! Tool-side errors (`ToolError`) are recovered by the dispatcher and turned
//! into failed tool results the model can react to. Loop errors (`LoopError`)
//! end a run and reach the caller as a `FailureReport`.

use serde::Serialize;
use thiserror::Error;

use super::classifier::EmptyResponseError;
use super::decoder::ArgumentDecodeError;
use super::ledger::Turn;
use crate::llm::{ModelAdapterError, TokenUsage};

/// Every error kind the loop can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    ArgumentDecode,
    ToolExecution,
    EmptyResponse,
    LoopBudgetExceeded,
    Cancelled,
    ModelAdapter,
}

impl ErrorKind {
    /// Whether this kind ends the run.
    pub fn is_fatal(self) -> bool {
        match self {
            Self::UnknownTool | Self::ArgumentDecode | Self::ToolExecution => false,
            Self::EmptyResponse | Self::LoopBudgetExceeded | Self::Cancelled | Self::ModelAdapter => {
                true
            }
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTool => write!(f, "unknown_tool"),
            Self::ArgumentDecode => write!(f, "argument_decode"),
            Self::ToolExecution => write!(f, "tool_execution"),
            Self::EmptyResponse => write!(f, "empty_response"),
            Self::LoopBudgetExceeded => write!(f, "loop_budget_exceeded"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::ModelAdapter => write!(f, "model_adapter"),
        }
    }
}

/// Failure of a single tool call. Never escapes the dispatcher.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    ArgumentDecode(#[from] ArgumentDecodeError),

    #[error("tool `{name}` failed: {cause}")]
    Execution { name: String, cause: String },
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::ArgumentDecode(_) => ErrorKind::ArgumentDecode,
            Self::Execution { .. } => ErrorKind::ToolExecution,
        }
    }
}

/// Error that terminates a run.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error(transparent)]
    EmptyResponse(#[from] EmptyResponseError),

    #[error("loop budget exceeded: no final answer after {max_rounds} model rounds")]
    LoopBudgetExceeded { max_rounds: usize },

    #[error("conversation cancelled")]
    Cancelled,

    #[error("model adapter failed")]
    ModelAdapter(#[from] ModelAdapterError),
}

impl LoopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyResponse(_) => ErrorKind::EmptyResponse,
            Self::LoopBudgetExceeded { .. } => ErrorKind::LoopBudgetExceeded,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::ModelAdapter(_) => ErrorKind::ModelAdapter,
        }
    }
}

/// Messages of an error and all of its sources, outermost first.
pub fn cause_chain(error: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();
    while let Some(inner) = source {
        chain.push(inner.to_string());
        source = inner.source();
    }
    chain
}

/// Successful end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct FinalMessage {
    pub content: String,
    /// Name of the agent that produced the answer
    pub agent: String,
    pub ledger: Vec<Turn>,
    pub rounds: usize,
    pub usage: TokenUsage,
}

/// Structured failure handed to the caller, with the history up to the failure.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub kind: ErrorKind,
    pub cause: String,
    pub cause_chain: Vec<String>,
    pub ledger: Vec<Turn>,
    pub rounds: usize,
    pub usage: TokenUsage,
}

impl FailureReport {
    pub fn new(error: &LoopError, ledger: Vec<Turn>, rounds: usize, usage: TokenUsage) -> Self {
        let cause_chain = cause_chain(error);
        Self {
            kind: error.kind(),
            cause: cause_chain.join(": "),
            cause_chain,
            ledger,
            rounds,
            usage,
        }
    }
}

impl std::fmt::Display for FailureReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} after {} rounds: {}", self.kind, self.rounds, self.cause)
    }
}

impl std::error::Error for FailureReport {}
