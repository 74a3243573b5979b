//! Agentic loop for a single agent
//!
//! Drives one agent (instructions + tools + optional output schema) to a final
//! answer:
//! 1. Call the model with the current context
//! 2. Text response → done (parsed into the schema when one is set)
//! 3. Tool calls → execute through the registry, add results, loop
//! 4. Give up after `max_iterations` model calls

use super::ConversationContext;
use crate::core::{CoachError, UserContext};
use crate::llm::{LlmProvider, LlmResponse, OutputSchema, TokenUsage, ToolCall};
use crate::tools::ToolRegistry;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Configuration for the agent loop
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum model calls per agent run
    pub max_iterations: usize,
    /// Maximum tools the model can call per single response
    pub max_tools_per_turn: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            max_tools_per_turn: 5,
        }
    }
}

/// Everything that makes an agent distinct
#[derive(Clone)]
pub struct AgentDefinition {
    pub name: String,
    pub instructions: String,
    /// Shown to the coordinator when it decides whom to hand off to
    pub handoff_description: String,
    pub tools: ToolRegistry,
    pub output_schema: Option<OutputSchema>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            handoff_description: String::new(),
            tools: ToolRegistry::new(),
            output_schema: None,
        }
    }

    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = description.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Instructions followed by the user profile, when there is one
    pub fn system_prompt(&self, profile: Option<&UserContext>) -> String {
        match profile {
            Some(profile) => format!(
                "{}\n\n{}",
                self.instructions.trim(),
                profile.to_prompt_section()
            ),
            None => self.instructions.trim().to_string(),
        }
    }
}

/// Log entry for one executed tool call
#[derive(Debug, Clone)]
pub struct ToolCallLog {
    pub tool: String,
    pub args: serde_json::Value,
    pub success: bool,
    pub result_preview: String,
}

/// Final answer of an agent run
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub text: String,
    pub iterations: usize,
    pub tool_call_log: Vec<ToolCallLog>,
}

/// Runs agents against one model backend
#[derive(Clone)]
pub struct AgentRunner {
    llm: Arc<dyn LlmProvider>,
    config: RunnerConfig,
}

impl AgentRunner {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            config: RunnerConfig::default(),
        }
    }

    /// Set custom configuration
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the loop and return the final text
    pub async fn run(
        &self,
        agent: &AgentDefinition,
        input: &str,
        profile: Option<&UserContext>,
    ) -> Result<AgentRun, CoachError> {
        let mut context = ConversationContext::new();
        context.add_system(agent.system_prompt(profile));
        context.add_user(input);

        let tool_definitions = agent.tools.definitions();
        let tools = if tool_definitions.is_empty() {
            None
        } else {
            Some(tool_definitions.as_slice())
        };

        let mut usage = TokenUsage::default();
        let mut tool_call_log = Vec::new();

        for iteration in 1..=self.config.max_iterations {
            tracing::debug!(agent = %agent.name, iteration, "Calling model");

            let response = match &agent.output_schema {
                Some(schema) => {
                    self.llm
                        .chat_with_schema(context.messages(), tools, schema)
                        .await?
                }
                None => self.llm.chat(context.messages(), tools).await?,
            };

            if let Some(u) = response.usage() {
                usage.accumulate(u);
            }

            let (text, calls) = match response {
                LlmResponse::Text { text, .. } => {
                    log_finished(agent, iteration, &usage);
                    return Ok(AgentRun {
                        text,
                        iterations: iteration,
                        tool_call_log,
                    });
                }
                LlmResponse::ToolCalls { calls, .. } => (None, calls),
                LlmResponse::Mixed {
                    text, tool_calls, ..
                } => {
                    if tool_calls.is_empty() {
                        log_finished(agent, iteration, &usage);
                        return Ok(AgentRun {
                            text: text.unwrap_or_default(),
                            iterations: iteration,
                            tool_call_log,
                        });
                    }
                    (text, tool_calls)
                }
            };

            let calls = self.limit_tool_calls(&calls);
            context.add_assistant_tool_calls(text.as_deref(), calls);

            for call in calls {
                let result = agent.tools.execute(&call.name, call.arguments.clone()).await;
                if !result.success {
                    tracing::warn!(
                        agent = %agent.name,
                        tool = %call.name,
                        "Tool returned an error: {}",
                        result.output
                    );
                }
                tool_call_log.push(ToolCallLog {
                    tool: call.name.clone(),
                    args: call.arguments.clone(),
                    success: result.success,
                    result_preview: truncate_preview(&result.output, 200),
                });
                context.add_tool_result(&call.id, result.output);
            }
        }

        Err(CoachError::MaxIterations {
            agent: agent.name.clone(),
            max: self.config.max_iterations,
        })
    }

    /// Run the loop and parse the final text into `T`
    ///
    /// Output that does not match the schema is an error; there is no retry.
    pub async fn run_structured<T: DeserializeOwned>(
        &self,
        agent: &AgentDefinition,
        input: &str,
        profile: Option<&UserContext>,
    ) -> Result<T, CoachError> {
        let run = self.run(agent, input, profile).await?;
        let schema_name = agent
            .output_schema
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_else(|| std::any::type_name::<T>().to_string());

        parse_structured(&run.text).map_err(|e| CoachError::SchemaViolation {
            agent: agent.name.clone(),
            schema: schema_name,
            message: e.to_string(),
        })
    }

    /// Apply per-turn tool call limit
    fn limit_tool_calls<'a>(&self, calls: &'a [ToolCall]) -> &'a [ToolCall] {
        if calls.len() > self.config.max_tools_per_turn {
            tracing::warn!(
                "Limiting {} tool calls to {}",
                calls.len(),
                self.config.max_tools_per_turn
            );
            &calls[..self.config.max_tools_per_turn]
        } else {
            calls
        }
    }
}

/// Parse model output as JSON, tolerating a surrounding Markdown code fence
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    serde_json::from_str(strip_code_fence(text))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip an info string such as ```json
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}

fn log_finished(agent: &AgentDefinition, iterations: usize, usage: &TokenUsage) {
    tracing::debug!(
        agent = %agent.name,
        iterations,
        input_tokens = usage.input_tokens,
        output_tokens = usage.output_tokens,
        "Agent finished"
    );
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut preview: String = text.chars().take(max_chars).collect();
        preview.push_str("...");
        preview
    }
}
