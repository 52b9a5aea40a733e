//! Tool registry and the `Tool` trait.
//!
//! A tool is any named capability the model may ask the loop to invoke. The
//! registry is filled once at setup and is read-only while a conversation
//! runs, so it is shared between conversations behind an `Arc`.

mod delegate;
mod function;
mod kitchen;
mod planning;
mod weather;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use delegate::AgentTool;
pub use function::FunctionTool;
pub use kitchen::{CheckFridge, FindRecipes};
pub use planning::{GetActivities, GetCurrentDate, LookupMovies};
pub use weather::GetWeather;

/// Trait implemented by every tool the loop can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, stable identifier advertised to the model.
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON schema of the argument object.
    fn parameters_schema(&self) -> Value;

    /// Whether the schema is strict (extra fields rejected).
    fn strict(&self) -> bool {
        false
    }

    /// Run the tool with an already-decoded argument object.
    async fn execute(&self, args: Value) -> anyhow::Result<Value>;
}

/// Capability advertisement for one tool, sent with every model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
    #[serde(default)]
    pub strict: bool,
}

impl ToolDefinition {
    fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
            strict: tool.strict(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Name-indexed set of tools, kept in registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    definitions: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `tools`, in order.
    pub fn from_tools(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool)?;
        }
        Ok(registry)
    }

    /// Registry with the tourism demo tools.
    pub fn demo() -> Result<Self, RegistryError> {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(GetWeather::default()),
            Arc::new(GetActivities),
            Arc::new(GetCurrentDate),
            Arc::new(LookupMovies),
        ];
        Self::from_tools(tools)
    }

    /// Register a tool. Fails if another tool already uses the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let definition = ToolDefinition::of(tool.as_ref());
        if self.index.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateTool(definition.name));
        }

        tracing::debug!(tool = %definition.name, "Registered tool");
        self.index
            .insert(definition.name.clone(), self.tools.len());
        self.definitions.push(definition);
        self.tools.push(tool);
        Ok(())
    }

    /// Register an async closure under the given definition.
    pub fn register_fn<F, Fut>(
        &mut self,
        definition: ToolDefinition,
        f: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.register(Arc::new(FunctionTool::new(definition, f)))
    }

    /// Find a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, RegistryError> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.tools[i]))
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// Definitions of every registered tool, in registration order.
    pub fn schema_list(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("{name} tool"),
            parameters: json!({"type": "object", "properties": {}}),
            strict: false,
        }
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn(definition("echo"), |args| async move { Ok(args) })
            .unwrap();

        let err = registry
            .register_fn(definition("echo"), |_| async { Ok(Value::Null) })
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let err = registry.lookup("lookup_forecast").err().unwrap();
        assert_eq!(err.to_string(), "unknown tool: lookup_forecast");
    }

    #[test]
    fn schema_list_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register_fn(definition(name), |_| async { Ok(Value::Null) })
                .unwrap();
        }

        let names: Vec<_> = registry.schema_list().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert!(registry.lookup("alpha").is_ok());
    }

    #[test]
    fn from_tools_stops_at_duplicate_name() {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(GetCurrentDate), Arc::new(GetCurrentDate)];
        let err = ToolRegistry::from_tools(tools).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("get_current_date".to_string()));
    }

    #[test]
    fn demo_registry_advertises_tourism_tools() {
        let registry = ToolRegistry::demo().unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(
            names,
            vec!["get_weather", "get_activities", "get_current_date", "lookup_movies"]
        );
        let weather = &registry.schema_list()[0];
        assert!(weather.strict);
        assert_eq!(weather.parameters["additionalProperties"], json!(false));
    }
}
