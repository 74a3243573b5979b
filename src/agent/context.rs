//! Conversation context for one agent run

use crate::llm::{ContentPart, Message, MessageContent, Role, ToolCall};

/// Max tokens for a single tool result
const MAX_TOOL_RESULT_TOKENS: usize = 4_000;

/// Message history of a single agent run
///
/// Lives for one query only; nothing is carried across queries.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    messages: Vec<Message>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system message
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message with tool calls (required before tool results for OpenAI)
    pub fn add_assistant_tool_calls(&mut self, text: Option<&str>, tool_calls: &[ToolCall]) {
        let mut parts: Vec<ContentPart> = Vec::with_capacity(tool_calls.len() + 1);
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        parts.extend(tool_calls.iter().map(|tc| ContentPart::ToolUse {
            id: tc.id.clone(),
            name: tc.name.clone(),
            input: tc.arguments.clone(),
        }));

        self.messages.push(Message {
            role: Role::Assistant,
            content: MessageContent::Parts(parts),
            tool_call_id: None,
        });
    }

    /// Add a tool result (auto-truncates if too large)
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, result: impl Into<String>) {
        let result_str = result.into();
        let truncated = Self::truncate_if_needed(&result_str, MAX_TOOL_RESULT_TOKENS);
        self.messages
            .push(Message::tool_result(tool_call_id, truncated));
    }

    /// Truncate text if it exceeds token limit
    fn truncate_if_needed(text: &str, max_tokens: usize) -> String {
        if Self::estimate_tokens(text) <= max_tokens {
            return text.to_string();
        }

        // ~4 chars per token is a rough estimate
        let max_chars = max_tokens * 4;
        let truncated: String = text.chars().take(max_chars).collect();

        format!(
            "{}\n\n... [TRUNCATED: Content exceeded {} tokens.]",
            truncated, max_tokens
        )
    }

    /// Estimate tokens in text (~4 chars per token for English)
    pub fn estimate_tokens(text: &str) -> usize {
        text.len().div_ceil(4)
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}
