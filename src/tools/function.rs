//! Closure-backed tools.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolDefinition};

type BoxedCall =
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync;

/// A tool whose behaviour is an async closure.
pub struct FunctionTool {
    definition: ToolDefinition,
    call: Box<BoxedCall>,
}

impl FunctionTool {
    pub fn new<F, Fut>(definition: ToolDefinition, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            definition,
            call: Box::new(move |args| Box::pin(f(args))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn parameters_schema(&self) -> Value {
        self.definition.parameters.clone()
    }

    fn strict(&self) -> bool {
        self.definition.strict
    }

    async fn execute(&self, args: Value) -> anyhow::Result<Value> {
        (self.call)(args).await
    }
}
