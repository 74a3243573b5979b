//! Domain error types
//!
//! Failures of a single query. The run driver renders them and moves on to
//! the next query.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while coaching one query
#[derive(Debug, Error)]
pub enum CoachError {
    /// A specialist's final answer did not parse into its output schema
    #[error("{agent} returned output that does not match the {schema} schema: {message}")]
    SchemaViolation {
        agent: String,
        schema: String,
        message: String,
    },

    /// The tool-call loop did not reach a final answer
    #[error("{agent} exceeded the maximum of {max} turns")]
    MaxIterations { agent: String, max: usize },

    /// The whole query ran past its deadline
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// The router asked for a handoff target that does not exist
    #[error("Unknown handoff target: {0}")]
    UnknownHandoff(String),

    /// A tool returned a failed result to an offline specialist
    #[error("Tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    /// Routing picked a specialist that was never registered
    #[error("No specialist registered for {0}")]
    MissingSpecialist(String),

    /// The model backend failed
    #[error("Model request failed: {0}")]
    Backend(#[from] anyhow::Error),
}

impl CoachError {
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}
