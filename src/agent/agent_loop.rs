//! Core agent loop implementation.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::classifier::{classify, Classification, Segment};
use super::dispatcher::Dispatcher;
use super::error::{FailureReport, FinalMessage, LoopError};
use super::handoff::Handoff;
use super::ledger::{Ledger, ToolCallRequest, ToolCallResult, Turn};
use crate::llm::{ModelAdapter, ModelRequest, TokenUsage};
use crate::tools::{ToolDefinition, ToolRegistry};
use crate::util::truncate;

/// Model round trips allowed before a run is abandoned.
pub const DEFAULT_MAX_ROUNDS: usize = 10;

/// Cause recorded for tool calls a cancelled run left unanswered.
const INTERRUPTED_CALL: &str = "cancelled before completion";

/// Callback invoked after every round.
pub type RoundObserver = Arc<dyn Fn(&RoundReport) + Send + Sync>;

/// Caller-facing knobs for a run.
#[derive(Clone)]
pub struct LoopPolicy {
    /// Maximum number of model calls per run
    pub max_rounds: usize,

    /// Run all tool calls of one response together instead of one by one
    pub concurrent_tool_calls: bool,

    /// Optional tracing hook
    pub on_round: Option<RoundObserver>,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            concurrent_tool_calls: false,
            on_round: None,
        }
    }
}

impl LoopPolicy {
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_concurrent_tool_calls(mut self, enabled: bool) -> Self {
        self.concurrent_tool_calls = enabled;
        self
    }

    pub fn on_round<F>(mut self, observer: F) -> Self
    where
        F: Fn(&RoundReport) + Send + Sync + 'static,
    {
        self.on_round = Some(Arc::new(observer));
        self
    }
}

impl std::fmt::Debug for LoopPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopPolicy")
            .field("max_rounds", &self.max_rounds)
            .field("concurrent_tool_calls", &self.concurrent_tool_calls)
            .field("on_round", &self.on_round.is_some())
            .finish()
    }
}

/// Loop controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    Done,
    Failed,
}

/// What happened during one round, handed to the observer.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    /// 1-based round number
    pub round: usize,

    /// Agent in charge when the round ended
    pub agent: String,

    /// State the controller moved to when the round ended
    pub state: LoopState,

    /// Tool results produced this round, in request order
    pub results: Vec<ToolCallResult>,

    /// Reasoning text the model emitted this round
    pub reasoning: Vec<String>,

    pub usage: Option<TokenUsage>,
}

/// Controller state with the data each state carries.
enum Phase {
    AwaitingModel,
    ExecutingTools(Vec<ToolCallRequest>),
    Done(String),
    Failed(LoopError),
}

/// Per-run bookkeeping. Owned by a single `drive` call.
struct Conversation<'a> {
    active: &'a Agent,
    ledger: Ledger,
    rounds: usize,
    usage: TokenUsage,
    reasoning: Vec<String>,
    round_usage: Option<TokenUsage>,
}

/// The tool-calling agent.
pub struct Agent {
    name: String,
    model: Arc<dyn ModelAdapter>,
    dispatcher: Dispatcher,
    policy: LoopPolicy,
    instructions: Option<String>,
    handoff_description: Option<String>,
    handoffs: Vec<Handoff>,
}

impl Agent {
    /// Create a new agent over a model and a tool registry.
    pub fn new(model: Arc<dyn ModelAdapter>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            name: "agent".to_string(),
            model,
            dispatcher: Dispatcher::new(registry),
            policy: LoopPolicy::default(),
            instructions: None,
            handoff_description: None,
            handoffs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_policy(mut self, policy: LoopPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// System instructions seeded at the start of every new conversation.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Extra text shown to other agents that can hand off to this one.
    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    /// Let the model transfer the conversation to another agent.
    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoffs.push(handoff);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    /// Run a conversation to completion.
    pub async fn run(&self, user_message: &str) -> Result<FinalMessage, FailureReport> {
        self.run_with_cancel(user_message, CancellationToken::new())
            .await
    }

    /// Run a conversation that stops early once `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        user_message: &str,
        cancel: CancellationToken,
    ) -> Result<FinalMessage, FailureReport> {
        let ledger = Ledger::seeded(self.instructions.as_deref(), user_message);
        self.drive(ledger, cancel).await
    }

    /// Continue an earlier conversation with a new user message.
    ///
    /// Tool calls a cancelled run left unanswered are closed with a failed
    /// result first, so the model never sees a request without its result.
    pub async fn resume(
        &self,
        mut ledger: Ledger,
        user_message: &str,
        cancel: CancellationToken,
    ) -> Result<FinalMessage, FailureReport> {
        let closed = ledger.close_pending(INTERRUPTED_CALL);
        if !closed.is_empty() {
            tracing::warn!(calls = ?closed, "Closing interrupted tool calls before resuming");
        }
        ledger.push_user(user_message);
        self.drive(ledger, cancel).await
    }

    async fn drive(
        &self,
        ledger: Ledger,
        cancel: CancellationToken,
    ) -> Result<FinalMessage, FailureReport> {
        let mut conv = Conversation {
            active: self,
            ledger,
            rounds: 0,
            usage: TokenUsage::default(),
            reasoning: Vec::new(),
            round_usage: None,
        };
        let mut phase = Phase::AwaitingModel;

        loop {
            phase = match phase {
                Phase::AwaitingModel => self
                    .await_model(&mut conv, &cancel)
                    .await
                    .unwrap_or_else(Phase::Failed),
                Phase::ExecutingTools(pending) => {
                    match self.execute_tools(&mut conv, &pending, &cancel).await {
                        Ok(results) => {
                            self.observe(&mut conv, LoopState::AwaitingModel, results);
                            Phase::AwaitingModel
                        }
                        Err(e) => Phase::Failed(e),
                    }
                }
                Phase::Done(content) => {
                    tracing::info!(rounds = conv.rounds, agent = %conv.active.name, "Agent finished");
                    self.observe(&mut conv, LoopState::Done, Vec::new());
                    return Ok(FinalMessage {
                        content,
                        agent: conv.active.name.clone(),
                        ledger: conv.ledger.into_turns(),
                        rounds: conv.rounds,
                        usage: conv.usage,
                    });
                }
                Phase::Failed(error) => {
                    tracing::warn!(kind = %error.kind(), rounds = conv.rounds, "Agent failed: {}", error);
                    self.observe(&mut conv, LoopState::Failed, Vec::new());
                    return Err(FailureReport::new(
                        &error,
                        conv.ledger.into_turns(),
                        conv.rounds,
                        conv.usage,
                    ));
                }
            };
        }
    }

    /// `AwaitingModel`: one model call, then decide the next phase.
    async fn await_model(
        &self,
        conv: &mut Conversation<'_>,
        cancel: &CancellationToken,
    ) -> Result<Phase, LoopError> {
        if conv.rounds >= self.policy.max_rounds {
            return Err(LoopError::LoopBudgetExceeded {
                max_rounds: self.policy.max_rounds,
            });
        }
        conv.rounds += 1;
        let active = conv.active;
        tracing::debug!(agent = %active.name, "Agent round {}", conv.rounds);

        let response = {
            let turns = self.model_turns(conv);
            let tools = active.advertised_tools();
            let request = ModelRequest {
                turns: &turns,
                tools: &tools,
                parallel_tool_calls: self.policy.concurrent_tool_calls,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LoopError::Cancelled),
                response = active.model.respond(request) => response?,
            }
        };

        conv.round_usage = response.usage;
        if let Some(usage) = response.usage {
            conv.usage += usage;
        }

        // The ledger is untouched if classification fails.
        let classification = classify(&response)?;
        conv.reasoning = classification.reasoning().map(str::to_string).collect();
        for thought in &conv.reasoning {
            tracing::debug!("Reasoning: {}", truncate(thought, 500));
        }

        if let Some(content) = classification.final_message() {
            conv.ledger.push_assistant(content.clone());
            return Ok(Phase::Done(content));
        }

        let pending = record_requests(&mut conv.ledger, classification);
        Ok(Phase::ExecutingTools(pending))
    }

    /// `ExecutingTools`: produce and append one result per pending request.
    async fn execute_tools<'a>(
        &self,
        conv: &mut Conversation<'a>,
        pending: &[ToolCallRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolCallResult>, LoopError> {
        let active = conv.active;
        for request in pending {
            tracing::info!(
                "Calling tool: {} with args: {}",
                request.name,
                truncate(&request.arguments, 1000)
            );
        }

        // Handoff calls are answered here; everything else goes to the dispatcher.
        let (target, answered) = resolve_handoffs(active, pending);

        let results = if self.policy.concurrent_tool_calls {
            let batch = futures::future::join_all(
                pending
                    .iter()
                    .zip(&answered)
                    .filter(|(_, answer)| answer.is_none())
                    .map(|(request, _)| active.dispatcher.dispatch(request)),
            );
            let dispatched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LoopError::Cancelled),
                dispatched = batch => dispatched,
            };
            // join_all keeps input order, so results line up with requests.
            let mut dispatched = dispatched.into_iter();
            let results: Vec<ToolCallResult> = answered
                .into_iter()
                .filter_map(|answer| answer.or_else(|| dispatched.next()))
                .collect();
            for result in &results {
                append_result(&mut conv.ledger, result.clone());
            }
            results
        } else {
            let mut results = Vec::with_capacity(pending.len());
            for (request, answer) in pending.iter().zip(answered) {
                let result = match answer {
                    Some(result) => result,
                    None => tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(LoopError::Cancelled),
                        result = active.dispatcher.dispatch(request) => result,
                    },
                };
                append_result(&mut conv.ledger, result.clone());
                results.push(result);
            }
            results
        };

        for result in &results {
            tracing::debug!(
                call_id = %result.call_id,
                success = result.is_success(),
                "Tool result: {}",
                truncate(&result.output, 1000)
            );
        }

        if let Some(target) = target {
            tracing::info!(from = %active.name, to = %target.name, "Handing off conversation");
            conv.active = target;
        }

        Ok(results)
    }

    /// Turns sent to the model. After a handoff the active agent's
    /// instructions replace the ones the ledger was seeded with.
    fn model_turns<'t>(&self, conv: &'t Conversation<'_>) -> Cow<'t, [Turn]> {
        let turns = conv.ledger.turns();
        if std::ptr::eq(conv.active, self) {
            return Cow::Borrowed(turns);
        }

        let history = match turns.split_first() {
            Some((Turn::System { .. }, rest)) => rest,
            _ => turns,
        };
        let mut swapped = Vec::with_capacity(history.len() + 1);
        if let Some(instructions) = &conv.active.instructions {
            swapped.push(Turn::System {
                content: instructions.clone(),
            });
        }
        swapped.extend_from_slice(history);
        Cow::Owned(swapped)
    }

    /// Registered tools followed by the handoff tools.
    fn advertised_tools(&self) -> Cow<'_, [ToolDefinition]> {
        let tools = self.dispatcher.registry().schema_list();
        if self.handoffs.is_empty() {
            return Cow::Borrowed(tools);
        }
        let mut all = tools.to_vec();
        all.extend(self.handoffs.iter().map(Handoff::definition));
        Cow::Owned(all)
    }

    fn observe(&self, conv: &mut Conversation<'_>, state: LoopState, results: Vec<ToolCallResult>) {
        let reasoning = std::mem::take(&mut conv.reasoning);
        let usage = conv.round_usage.take();
        if let Some(observer) = &self.policy.on_round {
            observer(&RoundReport {
                round: conv.rounds,
                agent: conv.active.name.clone(),
                state,
                results,
                reasoning,
                usage,
            });
        }
    }
}

/// Run one conversation with a throwaway agent.
pub async fn run(
    user_message: &str,
    registry: Arc<ToolRegistry>,
    model: Arc<dyn ModelAdapter>,
    policy: LoopPolicy,
) -> Result<FinalMessage, FailureReport> {
    Agent::new(model, registry)
        .with_policy(policy)
        .run(user_message)
        .await
}

/// Append a response's segments in production order and return the tool calls
/// to execute. A call whose id is already in the ledger is dropped, so the
/// first request with a given id wins.
fn record_requests(ledger: &mut Ledger, classification: Classification) -> Vec<ToolCallRequest> {
    let mut pending = Vec::new();
    for segment in classification.into_segments() {
        match segment {
            Segment::Message(text) => ledger.push_assistant(text),
            Segment::Reasoning(_) => {}
            Segment::ToolCall(request) => match ledger.push_request(request.clone()) {
                Ok(()) => pending.push(request),
                Err(e) => tracing::warn!(tool = %request.name, "Dropping tool call: {}", e),
            },
        }
    }
    pending
}

/// Answer handoff calls without dispatching them. The first handoff in a
/// response wins; later ones get a failed result. Returns the target agent
/// and, per request, the result if it was a handoff.
fn resolve_handoffs<'a>(
    active: &'a Agent,
    pending: &[ToolCallRequest],
) -> (Option<&'a Agent>, Vec<Option<ToolCallResult>>) {
    let mut target: Option<&'a Agent> = None;
    let answered = pending
        .iter()
        .map(|request| {
            let handoff = active
                .handoffs
                .iter()
                .find(|h| h.tool_name() == request.name)?;
            Some(match target {
                None => {
                    target = Some(handoff.agent());
                    ToolCallResult::success(
                        &request.call_id,
                        json!({ "assistant": handoff.agent().name() }).to_string(),
                    )
                }
                Some(chosen) => ToolCallResult::failure(
                    &request.call_id,
                    format!("already handing off to {}", chosen.name()),
                ),
            })
        })
        .collect();
    (target, answered)
}

fn append_result(ledger: &mut Ledger, result: ToolCallResult) {
    if let Err(e) = ledger.push_result(result) {
        tracing::error!("Tool result rejected by ledger: {}", e);
    }
}
