//! Scripted provider for deterministic pipeline tests
//!
//! Built directly by tests; `create_provider` never returns it. Replays a
//! queue of canned responses in order and records what each request carried,
//! so tests can assert on the prompt, the offered tools and the requested
//! schema.

use super::{LlmError, LlmProvider, LlmResponse, Message, OutputSchema, ToolCall, ToolDefinition};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What a single request looked like
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub schema: Option<String>,
}

impl RecordedRequest {
    /// Text of the system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == super::Role::System)
            .and_then(|m| m.content.as_text())
    }
}

enum Scripted {
    Response(LlmResponse),
    Failure(String),
}

pub struct ScriptedProvider {
    model: String,
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            model: "scripted".to_string(),
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain text answer
    pub fn push_text(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Response(LlmResponse::Text {
            text: text.into(),
            usage: None,
        }))
    }

    /// Queue a structured answer, serialized as the model would return it
    pub fn push_json(self, value: serde_json::Value) -> Self {
        self.push_text(value.to_string())
    }

    /// Queue a single tool call
    pub fn push_tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        let id = format!("call_{}", uuid::Uuid::new_v4().simple());
        self.push(Scripted::Response(LlmResponse::ToolCalls {
            calls: vec![ToolCall {
                id,
                name: name.to_string(),
                arguments,
            }],
            usage: None,
        }))
    }

    /// Queue a backend failure
    pub fn push_error(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Failure(message.into()))
    }

    fn push(self, item: Scripted) -> Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
        self
    }

    /// Snapshot of every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of queued responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn next(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        schema: Option<&OutputSchema>,
    ) -> Result<LlmResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tool_names: tools
                    .unwrap_or_default()
                    .iter()
                    .map(|t| t.name.clone())
                    .collect(),
                schema: schema.map(|s| s.name.clone()),
            });
        }

        let next = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(LlmError::ServiceError(message).into()),
            None => Err(LlmError::Other(anyhow::anyhow!("scripted provider has no response queued")).into()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse> {
        self.next(messages, tools, None)
    }

    async fn chat_with_schema(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        schema: &OutputSchema,
    ) -> Result<LlmResponse> {
        self.next(messages, tools, Some(schema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records() {
        let provider = ScriptedProvider::new()
            .push_tool_call("get_exercise_info", serde_json::json!({"muscle_group": "legs"}))
            .push_text("done");

        let first = provider
            .chat(&[Message::system("sys"), Message::user("hi")], None)
            .await
            .unwrap();
        assert_eq!(first.tool_calls()[0].name, "get_exercise_info");

        let second = provider.chat(&[Message::user("again")], None).await.unwrap();
        assert_eq!(second.text(), Some("done"));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].system_prompt(), Some("sys"));
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_queue_is_an_error() {
        let provider = ScriptedProvider::new();
        assert!(provider.chat(&[Message::user("hi")], None).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_failure_is_service_error() {
        let provider = ScriptedProvider::new().push_error("boom");
        let err = provider
            .chat(&[Message::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LlmError>(),
            Some(LlmError::ServiceError(_))
        ));
    }
}
