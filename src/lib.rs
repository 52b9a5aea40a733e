//! # tool-loop
//!
//! A tool-augmented conversation loop for function-calling language models.
//!
//! This library provides:
//! - A tool registry and the `Tool` trait for callable capabilities
//! - A bounded agent loop that alternates model calls and tool calls
//! - Handoffs between agents, and agents exposed as tools to a supervisor
//! - An adapter for OpenAI Responses-compatible endpoints
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Seed the history with instructions and the user's message
//! 2. Call the model with the history and the available tool schemas
//! 3. Classify the reply; execute any requested tool calls in order
//! 4. Feed the results back to the model, repeat until it answers
//!
//! Tool failures (unknown tool, malformed arguments, errors and panics inside
//! the tool) are shown to the model as failed results. Only backend failures,
//! empty replies, an exhausted round budget or cancellation end a run early.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tool_loop::{agent::Agent, config::Config, llm::ResponsesClient, tools::ToolRegistry};
//!
//! let config = Config::from_env()?;
//! let model = Arc::new(ResponsesClient::from_config(&config)?);
//! let agent = Agent::new(model, Arc::new(ToolRegistry::demo()?)).with_policy(config.policy());
//! let answer = agent.run("Is it rainy in Sydney?").await?;
//! println!("{}", answer.content);
//! ```

pub mod agent;
pub mod config;
pub mod demo;
pub mod llm;
pub mod tools;

mod util;

pub use agent::{run, Agent, FailureReport, FinalMessage, LoopPolicy};
pub use config::Config;
