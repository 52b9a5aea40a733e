//! Agent module - the tool-calling conversation loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Seed the ledger with instructions and the user message
//! 2. Call the model with the ledger and the tool schemas
//! 3. If the model requests tool calls, dispatch them and append the results
//! 4. Repeat until the model answers or the round budget runs out
//!
//! An agent may also offer [`Handoff`]s. Calling one passes the rest of the
//! conversation to the target agent.

mod agent_loop;
mod classifier;
mod decoder;
mod dispatcher;
mod error;
mod handoff;
mod ledger;
mod prompt;

pub use agent_loop::{
    run, Agent, LoopPolicy, LoopState, RoundObserver, RoundReport, DEFAULT_MAX_ROUNDS,
};
pub use classifier::{classify, Classification, EmptyResponseError, Segment};
pub use decoder::{decode, encode, ArgumentDecodeError};
pub use dispatcher::{encode_output, Dispatcher};
pub use error::{cause_chain, ErrorKind, FailureReport, FinalMessage, LoopError, ToolError};
pub use handoff::Handoff;
pub use ledger::{Ledger, LedgerError, ToolCallRequest, ToolCallResult, ToolOutcome, Turn};
pub use prompt::{build_system_prompt, DEFAULT_PERSONA};
