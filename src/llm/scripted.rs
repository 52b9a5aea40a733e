//! In-process model that replays canned responses.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ModelAdapter, ModelAdapterError, ModelRequest, ModelResponse};
use crate::agent::Turn;

type Generator = Box<dyn Fn(usize, &[Turn]) -> ModelResponse + Send + Sync>;

/// Deterministic model for tests and offline runs.
///
/// Queued responses are returned first, in order. Once the queue is empty
/// the generator (if any) produces the reply; without one the call fails.
/// Every request's turns are recorded for later inspection.
#[derive(Default)]
pub struct ScriptedModel {
    queue: Mutex<VecDeque<Result<ModelResponse, ModelAdapterError>>>,
    generator: Option<Generator>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            queue: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::default()
        }
    }

    /// Model that computes every reply from the call index and ledger.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(usize, &[Turn]) -> ModelResponse + Send + Sync + 'static,
    {
        Self {
            generator: Some(Box::new(f)),
            ..Self::default()
        }
    }

    /// Queue a failure for the next unanswered call.
    pub fn then_fail(self, error: ModelAdapterError) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(Err(error));
        }
        self
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.seen.lock().map(|seen| seen.len()).unwrap_or(0)
    }

    /// Ledger snapshot sent with each call.
    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelAdapter for ScriptedModel {
    async fn respond(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelAdapterError> {
        let index = {
            let mut seen = self
                .seen
                .lock()
                .map_err(|_| ModelAdapterError::Protocol("scripted model lock poisoned".to_string()))?;
            seen.push(request.turns.to_vec());
            seen.len() - 1
        };

        let next = self
            .queue
            .lock()
            .map_err(|_| ModelAdapterError::Protocol("scripted model lock poisoned".to_string()))?
            .pop_front();

        match (next, &self.generator) {
            (Some(response), _) => response,
            (None, Some(generate)) => Ok(generate(index, request.turns)),
            (None, None) => Err(ModelAdapterError::Protocol(format!(
                "scripted model has no response for call {}",
                index + 1
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ResponseItem;

    #[tokio::test]
    async fn replays_queue_then_generator() {
        let model = ScriptedModel::new(vec![ModelResponse::new(vec![ResponseItem::message(
            "first",
        )])]);
        let turns = vec![Turn::User {
            content: "hi".to_string(),
        }];
        let request = ModelRequest {
            turns: &turns,
            tools: &[],
            parallel_tool_calls: false,
        };

        let first = model.respond(request).await.unwrap();
        assert_eq!(first.items, vec![ResponseItem::message("first")]);
        assert!(model.respond(request).await.is_err());
        assert_eq!(model.calls(), 2);
        assert_eq!(model.requests()[0], turns);
    }

    #[tokio::test]
    async fn generator_sees_call_index() {
        let model = ScriptedModel::from_fn(|i, _| {
            ModelResponse::new(vec![ResponseItem::message(format!("reply {}", i))])
        });
        let request = ModelRequest {
            turns: &[],
            tools: &[],
            parallel_tool_calls: false,
        };
        model.respond(request).await.unwrap();
        let second = model.respond(request).await.unwrap();
        assert_eq!(second.items, vec![ResponseItem::message("reply 1")]);
    }
}
