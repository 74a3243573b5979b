//! Tools available to the coaching agents
//!
//! Each specialist is bound to one tool:
//! - `get_exercise_info` (workout): exercise catalog lookup by muscle group
//! - `calculate_calories` (nutrition): Mifflin-St Jeor calorie and macro targets
//!
//! Tools are plain synchronous computations behind the async `Tool` trait so
//! model-backed and offline specialists drive them through the same registry.

pub mod calories;
pub mod exercise;

pub use calories::{calculate_calories, CalorieBreakdown, CalorieTool, Macros};
pub use exercise::{lookup_exercises, ExerciseInfo, ExerciseLookup, ExerciseTool, MUSCLE_GROUPS};

use crate::llm::ToolDefinition;
use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Result of executing a tool
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Trait for agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name
    fn name(&self) -> &str;

    /// Get the tool description
    fn description(&self) -> &str;

    /// Get the JSON schema for parameters
    fn parameters(&self) -> Value;

    /// Execute the tool with given parameters
    async fn execute(&self, params: Value) -> Result<ToolResult>;

    /// Convert to LLM tool definition
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Registry of available tools
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    tool_timeout_secs: u64,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            tool_timeout_secs: 30,
        }
    }

    /// Registry holding both coaching tools
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ExerciseTool));
        registry.register(Arc::new(CalorieTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Set the default tool timeout (seconds)
    pub fn set_tool_timeout_secs(&mut self, secs: u64) {
        self.tool_timeout_secs = secs;
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Registry restricted to the named tools
    ///
    /// Names without a registered tool are skipped.
    pub fn subset(&self, names: &[&str]) -> Self {
        let tools = names
            .iter()
            .filter_map(|n| self.tools.get(*n).map(|t| (n.to_string(), Arc::clone(t))))
            .collect();
        Self {
            tools,
            tool_timeout_secs: self.tool_timeout_secs,
        }
    }

    /// Execute a tool by name with given parameters
    ///
    /// Never fails: unknown tools, argument errors, timeouts and panics all
    /// come back as a failed `ToolResult` the caller can show to the model.
    pub async fn execute(&self, name: &str, params: Value) -> ToolResult {
        let Some(tool) = self.tools.get(name) else {
            return ToolResult::error(format!("Unknown tool: {}", name));
        };

        tracing::debug!(tool = name, params = %params, "Executing tool");

        let timeout_duration = Duration::from_secs(self.tool_timeout_secs);

        // Wrap tool execution with timeout + panic recovery to prevent crashes
        match timeout(
            timeout_duration,
            AssertUnwindSafe(tool.execute(params)).catch_unwind(),
        )
        .await
        {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                tracing::warn!("Tool '{}' rejected its arguments: {}", name, e);
                ToolResult::error(format!("Tool '{}' failed: {}", name, e))
            }
            Ok(Err(panic_info)) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                tracing::error!("Tool '{}' panicked: {}", name, panic_msg);
                ToolResult::error(format!("Tool '{}' crashed: {}", name, panic_msg))
            }
            Err(_) => ToolResult::error(format!(
                "Tool '{}' timed out after {} seconds",
                name, self.tool_timeout_secs
            )),
        }
    }

    /// Get all tool definitions for LLM, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time;

    struct SleepTool {
        duration: Duration,
    }

    #[async_trait]
    impl Tool for SleepTool {
        fn name(&self) -> &str {
            "sleep"
        }

        fn description(&self) -> &str {
            "sleep tool"
        }

        fn parameters(&self) -> Value {
            json!({
                "type": "object",
                "properties": {}
            })
        }

        async fn execute(&self, _params: Value) -> Result<ToolResult> {
            time::sleep(self.duration).await;
            Ok(ToolResult::success("done"))
        }
    }

    struct PanicTool;

    #[async_trait]
    impl Tool for PanicTool {
        fn name(&self) -> &str {
            "panic"
        }

        fn description(&self) -> &str {
            "always panics"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _params: Value) -> Result<ToolResult> {
            panic!("catalog corrupted");
        }
    }

    #[tokio::test]
    async fn tool_registry_enforces_timeout() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SleepTool {
            duration: Duration::from_secs(5),
        }));
        registry.set_tool_timeout_secs(1);

        let result = registry.execute("sleep", json!({})).await;
        assert!(!result.success);
        assert!(result.output.contains("timed out"));
    }

    #[tokio::test]
    async fn tool_registry_recovers_from_panic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(PanicTool));

        let result = registry.execute("panic", json!({})).await;
        assert!(!result.success);
        assert!(result.output.contains("catalog corrupted"));
    }

    #[tokio::test]
    async fn tool_registry_unknown_tool() {
        let registry = ToolRegistry::with_defaults();
        let result = registry.execute("get_weather", json!({})).await;
        assert!(!result.success);
        assert_eq!(result.output, "Unknown tool: get_weather");
    }

    #[tokio::test]
    async fn tool_registry_bad_arguments_become_failed_result() {
        let registry = ToolRegistry::with_defaults();
        let result = registry
            .execute("calculate_calories", json!({"goal": "weight loss"}))
            .await;
        assert!(!result.success);
        assert!(result.output.starts_with("Tool 'calculate_calories' failed"));
    }

    #[test]
    fn subset_keeps_only_named_tools() {
        let registry = ToolRegistry::with_defaults();
        let workout = registry.subset(&["get_exercise_info", "missing"]);
        let names: Vec<String> = workout.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["get_exercise_info".to_string()]);
    }

    #[test]
    fn definitions_are_sorted() {
        let registry = ToolRegistry::with_defaults();
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["calculate_calories", "get_exercise_info"]);
    }
}
