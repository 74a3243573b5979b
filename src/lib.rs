//! fitcoach: multi-agent fitness coach
//!
//! This library provides:
//! - An input guardrail that rejects unrealistic or unsafe fitness goals
//! - Routing to workout, nutrition and general specialists (model handoffs or keywords)
//! - Exercise lookup and calorie/macro calculation tools
//! - OpenAI-compatible providers (OpenAI, OpenRouter, Ollama) with structured output
//! - A run driver and CLI that render each query's result

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod orchestration;
pub mod tools;
pub mod transport;

pub use config::Config;
