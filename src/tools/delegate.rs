//! Exposes a whole agent as a tool, so a supervisor agent can hand work to
//! specialised sub-agents.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::agent::Agent;

/// Tool that forwards a query to a sub-agent and returns its answer.
pub struct AgentTool {
    name: String,
    description: String,
    agent: Arc<Agent>,
}

impl AgentTool {
    pub fn new(name: impl Into<String>, description: impl Into<String>, agent: Arc<Agent>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
        }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The request to hand to the sub-agent"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    fn strict(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'query' argument"))?;

        tracing::info!(agent = %self.name, "Delegating to sub-agent");

        match self.agent.run(query).await {
            Ok(answer) => Ok(Value::String(answer.content)),
            Err(report) => Err(anyhow::anyhow!("sub-agent {} failed: {}", self.name, report)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelResponse, ResponseItem, ScriptedModel};
    use crate::tools::ToolRegistry;

    #[tokio::test]
    async fn returns_sub_agent_answer() {
        let model = Arc::new(ScriptedModel::new(vec![ModelResponse::new(vec![
            ResponseItem::message("Try the Tofu Stir Fry."),
        ])]));
        let agent = Arc::new(Agent::new(model.clone(), Arc::new(ToolRegistry::new())));
        let tool = AgentTool::new("plan_meal", "Plan a meal", agent);

        let out = tool.execute(json!({"query": "dinner with tofu"})).await.unwrap();
        assert_eq!(out, json!("Try the Tofu Stir Fry."));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn sub_agent_failure_is_a_tool_error() {
        let model = Arc::new(ScriptedModel::new(vec![ModelResponse::new(vec![
            ResponseItem::reasoning("thinking only"),
        ])]));
        let agent = Arc::new(Agent::new(model, Arc::new(ToolRegistry::new())));
        let tool = AgentTool::new("plan_weekend", "Plan a weekend", agent);

        let err = tool.execute(json!({"query": "weekend?"})).await.unwrap_err();
        assert!(err.to_string().contains("empty_response"));
    }
}
