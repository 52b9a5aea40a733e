//! Handoffs: passing the whole conversation to another agent.
//!
//! A handoff is advertised to the model as a zero-argument tool named
//! `transfer_to_<agent>`. When the model calls it the loop answers the call,
//! then continues the same ledger with the target agent's instructions,
//! model and tools. The round budget of the entry agent still applies.

use std::sync::Arc;

use serde_json::json;

use super::agent_loop::Agent;
use crate::tools::ToolDefinition;

/// A transfer target offered to the model.
#[derive(Clone)]
pub struct Handoff {
    tool_name: String,
    description: String,
    agent: Arc<Agent>,
}

impl Handoff {
    /// Handoff to `agent`, advertised as `transfer_to_<agent name>`.
    pub fn to(agent: Arc<Agent>) -> Self {
        let tool_name = format!("transfer_to_{}", tool_slug(agent.name()));
        let description = match agent.handoff_description() {
            Some(extra) => format!(
                "Handoff to the {} agent to handle the request. {}",
                agent.name(),
                extra
            ),
            None => format!("Handoff to the {} agent to handle the request.", agent.name()),
        };
        Self {
            tool_name,
            description,
            agent,
        }
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Tool definition sent to the model alongside the regular tools.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool_name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
            strict: true,
        }
    }
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("tool_name", &self.tool_name)
            .field("agent", &self.agent.name())
            .finish()
    }
}

/// Lowercase ASCII with runs of anything else collapsed to `_`.
fn tool_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::tools::ToolRegistry;

    fn agent(name: &str) -> Arc<Agent> {
        Arc::new(
            Agent::new(
                Arc::new(ScriptedModel::new(Vec::new())),
                Arc::new(ToolRegistry::new()),
            )
            .with_name(name),
        )
    }

    #[test]
    fn tool_name_is_derived_from_agent_name() {
        assert_eq!(Handoff::to(agent("Spanish agent")).tool_name(), "transfer_to_spanish_agent");
        assert_eq!(Handoff::to(agent("  Billing / Refunds ")).tool_name(), "transfer_to_billing_refunds");
        assert_eq!(
            Handoff::to(agent("Spanish agent"))
                .with_tool_name("to_es")
                .tool_name(),
            "to_es"
        );
    }

    #[test]
    fn definition_takes_no_arguments() {
        let target = Arc::new(
            Agent::new(
                Arc::new(ScriptedModel::new(Vec::new())),
                Arc::new(ToolRegistry::new()),
            )
            .with_name("English agent")
            .with_handoff_description("Answers in English."),
        );
        let definition = Handoff::to(target).definition();

        assert!(definition.strict);
        assert_eq!(definition.parameters["properties"], json!({}));
        assert!(definition.description.contains("English agent"));
        assert!(definition.description.ends_with("Answers in English."));
    }
}
