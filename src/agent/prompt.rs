//! System prompt templates for the agent.

use crate::tools::ToolRegistry;

/// Persona used when no instructions are configured.
pub const DEFAULT_PERSONA: &str = "You are a tourism chatbot. You help users plan their \
weekends and choose the best activities for the given weather. If an activity would be \
unpleasant in the weather, don't suggest it.";

/// Build the system prompt: persona followed by the available tools.
pub fn build_system_prompt(persona: &str, tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return persona.to_string();
    }

    let tool_descriptions = tools
        .schema_list()
        .iter()
        .map(|t| format!("- **{}**: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{persona}

## Available Tools
{tool_descriptions}

## Rules
1. Use tools to look things up instead of guessing.
2. If a tool reports an error, adjust the arguments or explain the problem to the user.
3. When you have what you need, answer the user directly."#,
        persona = persona,
        tool_descriptions = tool_descriptions
    )
}
