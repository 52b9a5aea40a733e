//! Splits a model response into message, reasoning and tool-call segments.

use thiserror::Error;

use super::ledger::ToolCallRequest;
use crate::llm::{ModelResponse, ResponseItem};

/// The model produced neither a message nor a tool call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("model response has no message and no tool call ({reasoning_segments} reasoning segments)")]
pub struct EmptyResponseError {
    pub reasoning_segments: usize,
}

/// One classified piece of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Message(String),
    Reasoning(String),
    ToolCall(ToolCallRequest),
}

/// Segments of one response, in the order the model produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    segments: Vec<Segment>,
}

impl Classification {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallRequest> {
        self.segments.iter().filter_map(|s| match s {
            Segment::ToolCall(request) => Some(request),
            Segment::Message(_) | Segment::Reasoning(_) => None,
        })
    }

    pub fn reasoning(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Reasoning(text) => Some(text.as_str()),
            Segment::Message(_) | Segment::ToolCall(_) => None,
        })
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls().next().is_some()
    }

    /// The answer text if this response ends the conversation.
    pub fn final_message(&self) -> Option<String> {
        if self.has_tool_calls() {
            return None;
        }
        let messages: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Message(text) => Some(text.as_str()),
                Segment::Reasoning(_) | Segment::ToolCall(_) => None,
            })
            .collect();
        if messages.is_empty() {
            None
        } else {
            Some(messages.join("\n"))
        }
    }
}

/// Classify a model response.
///
/// Blank messages and item kinds the loop does not understand are dropped. A
/// response left with no message and no tool call is a protocol violation by
/// the backend.
pub fn classify(response: &ModelResponse) -> Result<Classification, EmptyResponseError> {
    let mut segments = Vec::with_capacity(response.items.len());

    for item in &response.items {
        match item {
            ResponseItem::Message { text } => {
                if text.trim().is_empty() {
                    tracing::debug!("Dropping blank message segment");
                    continue;
                }
                segments.push(Segment::Message(text.clone()));
            }
            ResponseItem::Reasoning { text } => {
                segments.push(Segment::Reasoning(text.clone()));
            }
            ResponseItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                segments.push(Segment::ToolCall(ToolCallRequest {
                    call_id: call_id.clone(),
                    name: name.clone(),
                    arguments: arguments.clone(),
                }));
            }
            ResponseItem::Other { kind } => {
                tracing::debug!(kind = %kind, "Ignoring unsupported response item");
            }
        }
    }

    let actionable = segments
        .iter()
        .any(|s| matches!(s, Segment::Message(_) | Segment::ToolCall(_)));
    if !actionable {
        return Err(EmptyResponseError {
            reasoning_segments: segments.len(),
        });
    }

    Ok(Classification { segments })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(items: Vec<ResponseItem>) -> ModelResponse {
        ModelResponse { items, usage: None }
    }

    fn call(id: &str, name: &str) -> ResponseItem {
        ResponseItem::FunctionCall {
            call_id: id.to_string(),
            name: name.to_string(),
            arguments: "{}".to_string(),
        }
    }

    #[test]
    fn preserves_production_order() {
        let classification = classify(&response(vec![
            ResponseItem::Reasoning {
                text: "check weather first".to_string(),
            },
            call("c1", "get_weather"),
            ResponseItem::Message {
                text: "One moment".to_string(),
            },
            call("c2", "lookup_movies"),
        ]))
        .unwrap();

        let kinds: Vec<_> = classification
            .segments()
            .iter()
            .map(|s| match s {
                Segment::Message(_) => "message",
                Segment::Reasoning(_) => "reasoning",
                Segment::ToolCall(_) => "tool_call",
            })
            .collect();
        assert_eq!(kinds, vec!["reasoning", "tool_call", "message", "tool_call"]);
        assert_eq!(classification.final_message(), None);
        let ids: Vec<_> = classification.tool_calls().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn message_only_response_is_final() {
        let classification = classify(&response(vec![
            ResponseItem::Reasoning {
                text: "done".to_string(),
            },
            ResponseItem::Message {
                text: "It is rainy in Sydney.".to_string(),
            },
            ResponseItem::Message {
                text: "Take an umbrella.".to_string(),
            },
        ]))
        .unwrap();

        assert_eq!(
            classification.final_message().as_deref(),
            Some("It is rainy in Sydney.\nTake an umbrella.")
        );
        assert_eq!(classification.reasoning().collect::<Vec<_>>(), vec!["done"]);
    }

    #[test]
    fn reasoning_only_response_is_empty() {
        let err = classify(&response(vec![
            ResponseItem::Reasoning {
                text: "hmm".to_string(),
            },
            ResponseItem::Message {
                text: "  ".to_string(),
            },
            ResponseItem::Other {
                kind: "web_search_call".to_string(),
            },
        ]))
        .unwrap_err();
        assert_eq!(err.reasoning_segments, 1);
    }

    #[test]
    fn no_items_is_empty() {
        assert!(classify(&response(Vec::new())).is_err());
    }
}
