//! Agent loop with tool execution

mod context;
mod runner;

pub use context::ConversationContext;
pub use runner::{
    parse_structured, AgentDefinition, AgentRun, AgentRunner, RunnerConfig, ToolCallLog,
};
