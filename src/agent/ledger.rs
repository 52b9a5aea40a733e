//! Conversation history.
//!
//! The ledger is the ordered, append-only sequence of turns that forms the
//! model's input on every call. It refuses appends that would break call-id
//! pairing: a result needs an earlier request with the same id, and an id is
//! used at most once per side.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier chosen by the model, echoed back in the result
    pub call_id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Raw argument payload exactly as the model produced it
    pub arguments: String,
}

/// How a tool call ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success,
    Failure { cause: String },
}

/// Result of one tool call, fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Matches the originating request
    pub call_id: String,

    /// Text shown to the model
    pub output: String,

    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn success(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
            outcome: ToolOutcome::Success,
        }
    }

    pub fn failure(call_id: impl Into<String>, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        Self {
            call_id: call_id.into(),
            output: format!("Error: {}", cause),
            outcome: ToolOutcome::Failure { cause },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success)
    }
}

/// One unit of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// Agent instructions, only at the start of a ledger
    System { content: String },
    User { content: String },
    Assistant { content: String },
    ToolCall(ToolCallRequest),
    ToolResult(ToolCallResult),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("call id `{0}` was already requested")]
    DuplicateRequest(String),

    #[error("call id `{0}` already has a result")]
    DuplicateResult(String),

    #[error("result for call id `{0}` has no matching request")]
    OrphanResult(String),

    #[error("system turn at position {0}; instructions only open a ledger")]
    MisplacedSystem(usize),
}

/// Append-only turn sequence.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    turns: Vec<Turn>,
    requested: HashSet<String>,
    answered: HashSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with optional instructions and the first user message.
    pub fn seeded(instructions: Option<&str>, user_message: &str) -> Self {
        let mut ledger = Self::new();
        if let Some(instructions) = instructions {
            ledger.turns.push(Turn::System {
                content: instructions.to_string(),
            });
        }
        ledger.push_user(user_message);
        ledger
    }

    /// Rebuild a ledger from turns, re-checking call-id pairing.
    pub fn from_turns(turns: Vec<Turn>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for turn in turns {
            ledger.push(turn)?;
        }
        Ok(ledger)
    }

    pub fn push(&mut self, turn: Turn) -> Result<(), LedgerError> {
        match turn {
            Turn::System { .. } if !self.turns.is_empty() => {
                Err(LedgerError::MisplacedSystem(self.turns.len()))
            }
            Turn::System { .. } | Turn::User { .. } | Turn::Assistant { .. } => {
                self.turns.push(turn);
                Ok(())
            }
            Turn::ToolCall(request) => self.push_request(request),
            Turn::ToolResult(result) => self.push_result(result),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::User {
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::Assistant {
            content: content.into(),
        });
    }

    pub fn push_request(&mut self, request: ToolCallRequest) -> Result<(), LedgerError> {
        if !self.requested.insert(request.call_id.clone()) {
            return Err(LedgerError::DuplicateRequest(request.call_id));
        }
        self.turns.push(Turn::ToolCall(request));
        Ok(())
    }

    pub fn push_result(&mut self, result: ToolCallResult) -> Result<(), LedgerError> {
        if !self.requested.contains(&result.call_id) {
            return Err(LedgerError::OrphanResult(result.call_id));
        }
        if !self.answered.insert(result.call_id.clone()) {
            return Err(LedgerError::DuplicateResult(result.call_id));
        }
        self.turns.push(Turn::ToolResult(result));
        Ok(())
    }

    /// Requests that have no result yet, in ledger order.
    pub fn pending_requests(&self) -> Vec<&ToolCallRequest> {
        self.turns
            .iter()
            .filter_map(|turn| match turn {
                Turn::ToolCall(request) if !self.answered.contains(&request.call_id) => {
                    Some(request)
                }
                Turn::ToolCall(_)
                | Turn::System { .. }
                | Turn::User { .. }
                | Turn::Assistant { .. }
                | Turn::ToolResult(_) => None,
            })
            .collect()
    }

    /// Answer every pending request with a failure carrying `cause`.
    /// Returns the call ids that were closed.
    pub fn close_pending(&mut self, cause: &str) -> Vec<String> {
        let ids: Vec<String> = self
            .pending_requests()
            .into_iter()
            .map(|request| request.call_id.clone())
            .collect();
        for id in &ids {
            self.answered.insert(id.clone());
            self.turns
                .push(Turn::ToolResult(ToolCallResult::failure(id.as_str(), cause)));
        }
        ids
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> ToolCallRequest {
        ToolCallRequest {
            call_id: id.to_string(),
            name: "get_weather".to_string(),
            arguments: r#"{"city":"Sydney"}"#.to_string(),
        }
    }

    #[test]
    fn seeded_ledger_starts_with_instructions_then_user() {
        let ledger = Ledger::seeded(Some("You are a tourism chatbot."), "Is it rainy?");
        assert_eq!(
            ledger.turns(),
            &[
                Turn::System {
                    content: "You are a tourism chatbot.".to_string()
                },
                Turn::User {
                    content: "Is it rainy?".to_string()
                },
            ]
        );
    }

    #[test]
    fn orphan_result_is_rejected() {
        let mut ledger = Ledger::seeded(None, "hi");
        let err = ledger
            .push_result(ToolCallResult::success("call_1", "{}"))
            .unwrap_err();
        assert_eq!(err, LedgerError::OrphanResult("call_1".to_string()));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn call_ids_are_used_once_per_side() {
        let mut ledger = Ledger::new();
        ledger.push_request(request("call_1")).unwrap();
        assert_eq!(
            ledger.push_request(request("call_1")).unwrap_err(),
            LedgerError::DuplicateRequest("call_1".to_string())
        );

        ledger
            .push_result(ToolCallResult::success("call_1", "ok"))
            .unwrap();
        assert_eq!(
            ledger
                .push_result(ToolCallResult::failure("call_1", "boom"))
                .unwrap_err(),
            LedgerError::DuplicateResult("call_1".to_string())
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn pending_requests_tracks_unanswered_calls() {
        let mut ledger = Ledger::new();
        ledger.push_request(request("a")).unwrap();
        ledger.push_request(request("b")).unwrap();
        ledger.push_result(ToolCallResult::success("a", "ok")).unwrap();

        let pending: Vec<_> = ledger.pending_requests().iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(pending, vec!["b"]);
    }

    #[test]
    fn failure_result_prefixes_output() {
        let result = ToolCallResult::failure("x", "unknown tool: lookup_forecast");
        assert_eq!(result.output, "Error: unknown tool: lookup_forecast");
        assert!(!result.is_success());
    }

    #[test]
    fn from_turns_rechecks_pairing() {
        let turns = vec![
            Turn::User {
                content: "hi".to_string(),
            },
            Turn::ToolResult(ToolCallResult::success("ghost", "ok")),
        ];
        assert_eq!(
            Ledger::from_turns(turns).unwrap_err(),
            LedgerError::OrphanResult("ghost".to_string())
        );
    }

    #[test]
    fn system_turn_only_opens_a_ledger() {
        let mut ledger = Ledger::new();
        ledger
            .push(Turn::System {
                content: "Be brief.".to_string(),
            })
            .unwrap();

        let mut ledger = Ledger::seeded(None, "hi");
        let err = ledger
            .push(Turn::System {
                content: "New rules.".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, LedgerError::MisplacedSystem(1));
        assert_eq!(ledger.len(), 1);

        let turns = vec![
            Turn::User {
                content: "hi".to_string(),
            },
            Turn::System {
                content: "late".to_string(),
            },
        ];
        assert_eq!(
            Ledger::from_turns(turns).unwrap_err(),
            LedgerError::MisplacedSystem(1)
        );
    }

    #[test]
    fn close_pending_answers_open_requests_in_order() {
        let mut ledger = Ledger::seeded(None, "hi");
        ledger.push_request(request("a")).unwrap();
        ledger.push_request(request("b")).unwrap();
        ledger.push_result(ToolCallResult::success("a", "ok")).unwrap();
        ledger.push_request(request("c")).unwrap();

        let closed = ledger.close_pending("cancelled before completion");
        assert_eq!(closed, vec!["b", "c"]);
        assert!(ledger.pending_requests().is_empty());
        assert_eq!(
            ledger.turns().last(),
            Some(&Turn::ToolResult(ToolCallResult::failure(
                "c",
                "cancelled before completion"
            )))
        );
        assert!(ledger.close_pending("again").is_empty());
    }

    #[test]
    fn turns_serialize_with_kind_tag() {
        let turn = Turn::ToolResult(ToolCallResult::failure("c1", "boom"));
        let value = serde_json::to_value(&turn).unwrap();
        assert_eq!(value["kind"], "tool_result");
        assert_eq!(value["outcome"]["status"], "failure");
        assert_eq!(value["outcome"]["cause"], "boom");
    }
}
