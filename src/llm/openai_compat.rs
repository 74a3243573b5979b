//! Generic OpenAI-compatible LLM provider
//!
//! Any API that follows the OpenAI chat completions format works here:
//! - OpenAI itself
//! - OpenRouter
//! - Ollama's `/v1` endpoint
//!
//! Structured output is requested through `response_format` with a JSON
//! schema; tool calling through the `tools` array.
//!
//! SECURITY: Credentials are only sent to the configured endpoint.

use super::{
    ContentPart, LlmError, LlmProvider, LlmResponse, Message, MessageContent, OutputSchema, Role,
    TokenUsage, ToolCall, ToolDefinition,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Configuration Types
// ============================================================================

/// Authentication method for the API
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Bearer token in Authorization header
    BearerToken(String),
    /// Local backends (Ollama) take no credentials
    None,
}

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name (e.g., "openai", "openrouter", "ollama")
    pub name: String,
    /// Full URL of the chat completions endpoint
    pub base_url: String,
    pub auth: AuthMethod,
    pub default_model: String,
    pub max_tokens: usize,
    /// Custom headers to send with requests
    pub custom_headers: Vec<(String, String)>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Whether the backend understands `response_format: json_schema`
    pub supports_schema: bool,
}

impl OpenAiCompatConfig {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, auth: AuthMethod) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            auth,
            default_model: String::new(),
            max_tokens: 2048,
            custom_headers: Vec::new(),
            request_timeout: Duration::from_secs(60),
            supports_schema: true,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_schema_support(mut self, supported: bool) -> Self {
        self.supports_schema = supported;
        self
    }
}

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: OpenAiCompatConfig,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            model: config.default_model.clone(),
            client,
            config,
        }
    }

    // ========================================================================
    // Message Conversion
    // ========================================================================

    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };

                match &msg.content {
                    MessageContent::Text(text) => OpenAiMessage {
                        role: role.to_string(),
                        content: Some(text.clone()),
                        tool_calls: None,
                        tool_call_id: msg.tool_call_id.clone(),
                    },
                    MessageContent::Parts(parts) => {
                        let tool_calls: Vec<OpenAiToolCall> = parts
                            .iter()
                            .filter_map(|p| match p {
                                ContentPart::ToolUse { id, name, input } => Some(OpenAiToolCall {
                                    id: id.clone(),
                                    call_type: "function".to_string(),
                                    function: OpenAiFunctionCall {
                                        name: name.clone(),
                                        arguments: serde_json::to_string(input)
                                            .unwrap_or_default(),
                                    },
                                }),
                                ContentPart::Text { .. } => None,
                            })
                            .collect();

                        let text_content = msg.content.as_text().map(str::to_string);

                        OpenAiMessage {
                            role: role.to_string(),
                            content: text_content,
                            tool_calls: if tool_calls.is_empty() {
                                None
                            } else {
                                Some(tool_calls)
                            },
                            tool_call_id: msg.tool_call_id.clone(),
                        }
                    }
                }
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                tool_type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        schema: Option<&OutputSchema>,
    ) -> OpenAiRequest {
        let mut request = OpenAiRequest {
            model: self.model.clone(),
            messages: self.convert_messages(messages),
            max_tokens: Some(self.config.max_tokens),
            tools: None,
            tool_choice: None,
            response_format: None,
        };

        if let Some(tools) = tools {
            if !tools.is_empty() {
                request.tools = Some(self.convert_tools(tools));
                request.tool_choice = Some("auto".to_string());
            }
        }

        if let Some(schema) = schema {
            if self.config.supports_schema {
                request.response_format = Some(ResponseFormat {
                    format_type: "json_schema".to_string(),
                    json_schema: JsonSchemaFormat {
                        name: schema.name.clone(),
                        schema: schema.schema.clone(),
                        strict: false,
                    },
                });
            }
        }

        request
    }

    fn build_http_request(&self, body: &OpenAiRequest) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .post(&self.config.base_url)
            .header("Content-Type", "application/json");

        if let AuthMethod::BearerToken(token) = &self.config.auth {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        for (name, value) in &self.config.custom_headers {
            req = req.header(name, value);
        }

        req.json(body)
    }

    // ========================================================================
    // Response Parsing
    // ========================================================================

    fn parse_response(&self, response: OpenAiResponse) -> LlmResponse {
        let usage = response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let Some(choice) = response.choices.into_iter().next() else {
            return LlmResponse::Text {
                text: String::new(),
                usage,
            };
        };

        let text = choice.message.content;
        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect();

        if tool_calls.is_empty() {
            LlmResponse::Text {
                text: text.unwrap_or_default(),
                usage,
            }
        } else if text.as_deref().map(str::is_empty).unwrap_or(true) {
            LlmResponse::ToolCalls {
                calls: tool_calls,
                usage,
            }
        } else {
            LlmResponse::Mixed {
                text,
                tool_calls,
                usage,
            }
        }
    }

    async fn chat_impl(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        schema: Option<&OutputSchema>,
    ) -> Result<LlmResponse> {
        tracing::debug!(
            target: "llm",
            provider = %self.config.name,
            model = %self.model,
            messages = messages.len(),
            tools = tools.map(|t| t.len()).unwrap_or(0),
            schema = schema.map(|s| s.name.as_str()).unwrap_or("-"),
            "Sending chat request"
        );

        let request = self.build_request(messages, tools, schema);
        let response = self
            .build_http_request(&request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text).into());
        }

        let api_response: OpenAiResponse = response
            .json()
            .await
            .map_err(LlmError::from_network_error)?;

        Ok(self.parse_response(api_response))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse> {
        self.chat_impl(messages, tools, None).await
    }

    async fn chat_with_schema(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        schema: &OutputSchema,
    ) -> Result<LlmResponse> {
        self.chat_impl(messages, tools, Some(schema)).await
    }
}

// ============================================================================
// API Types (OpenAI Format)
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    schema: serde_json::Value,
    strict: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(
            OpenAiCompatConfig::new(
                "test",
                "https://api.example.com/v1/chat/completions",
                AuthMethod::BearerToken("key".into()),
            )
            .with_model("gpt-4.1-mini"),
        )
    }

    #[test]
    fn test_config_builder() {
        let config = OpenAiCompatConfig::new(
            "test",
            "https://api.example.com/v1/chat/completions",
            AuthMethod::BearerToken("test-key".into()),
        )
        .with_model("gpt-4.1-mini")
        .with_max_tokens(1024)
        .with_timeout(Duration::from_secs(5))
        .with_header("X-Custom", "value");

        assert_eq!(config.name, "test");
        assert_eq!(config.default_model, "gpt-4.1-mini");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.custom_headers.len(), 1);
    }

    #[test]
    fn test_message_conversion_keeps_tool_calls() {
        let provider = test_provider();
        let messages = vec![
            Message::system("You are a coach"),
            Message::user("Chest exercises?"),
            Message {
                role: Role::Assistant,
                content: MessageContent::Parts(vec![ContentPart::ToolUse {
                    id: "call_1".into(),
                    name: "get_exercise_info".into(),
                    input: serde_json::json!({"muscle_group": "chest"}),
                }]),
                tool_call_id: None,
            },
            Message::tool_result("call_1", "{}"),
        ];

        let converted = provider.convert_messages(&messages);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[2].role, "assistant");
        let calls = converted[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "get_exercise_info");
        assert!(calls[0].function.arguments.contains("chest"));
        assert_eq!(converted[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_request_includes_response_format() {
        let provider = test_provider();
        let schema = OutputSchema {
            name: "GoalAnalysis".into(),
            schema: serde_json::json!({"type": "object"}),
        };
        let request = provider.build_request(&[Message::user("hi")], None, Some(&schema));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "GoalAnalysis");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_schema_dropped_when_unsupported() {
        let provider = OpenAiCompatProvider::new(
            OpenAiCompatConfig::new("local", "http://localhost", AuthMethod::None)
                .with_schema_support(false),
        );
        let schema = OutputSchema {
            name: "MealPlan".into(),
            schema: serde_json::json!({"type": "object"}),
        };
        let request = provider.build_request(&[Message::user("hi")], None, Some(&schema));
        assert!(request.response_format.is_none());
    }

    #[test]
    fn test_parse_tool_call_response() {
        let provider = test_provider();
        let raw = serde_json::json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {
                            "name": "calculate_calories",
                            "arguments": "{\"goal\":\"weight loss\"}"
                        }
                    }]
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        });
        let response: OpenAiResponse = serde_json::from_value(raw).unwrap();

        match provider.parse_response(response) {
            LlmResponse::ToolCalls { calls, usage } => {
                assert_eq!(calls[0].name, "calculate_calories");
                assert_eq!(calls[0].arguments["goal"], "weight loss");
                assert_eq!(usage.unwrap().total_tokens, 15);
            }
            other => panic!("expected tool calls, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_choices_is_empty_text() {
        let provider = test_provider();
        let response = OpenAiResponse {
            choices: vec![],
            usage: None,
        };
        assert_eq!(provider.parse_response(response).text(), Some(""));
    }
}
