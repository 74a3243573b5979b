//! Configuration management for fitcoach
//!
//! Precedence, lowest to highest: built-in defaults, `config.toml`,
//! environment (`LLM_MODEL_NAME`, `FITCOACH_PROVIDER`), command-line flags.

use crate::orchestration::guardrail::FailurePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Model used when neither config nor environment names one
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub guardrail: GuardrailConfig,
    pub router: RouterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// openai, openrouter or ollama
    pub provider: String,
    pub model: String,
    /// Override the provider's endpoint (Ollama daemon address, proxies)
    pub base_url: Option<String>,
    pub max_tokens: usize,
    pub request_timeout_secs: u64,
    /// Send `response_format: json_schema`; turn off for backends that reject it
    pub structured_output: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            max_tokens: 2048,
            request_timeout_secs: 60,
            structured_output: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Model calls allowed per agent run
    pub max_iterations: usize,
    pub tool_timeout_secs: u64,
    /// Deadline for one query, guardrail through final answer
    pub query_timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            tool_timeout_secs: 30,
            query_timeout_secs: 180,
        }
    }
}

/// Which goal evaluator backs the guardrail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorKind {
    #[default]
    Model,
    Rules,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardrailConfig {
    pub evaluator: EvaluatorKind,
    pub failure_policy: FailurePolicy,
    /// Rule evaluator threshold
    pub max_weekly_loss_lbs: f64,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            evaluator: EvaluatorKind::Model,
            failure_policy: FailurePolicy::FailOpen,
            max_weekly_loss_lbs: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterStrategy {
    /// Handoff tools offered to the model
    #[default]
    Model,
    /// Regex keyword scoring
    Keyword,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    pub strategy: RouterStrategy,
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit file; a missing file is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "fitcoach") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `LLM_MODEL_NAME` and `FITCOACH_PROVIDER` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides from an arbitrary lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("LLM_MODEL_NAME").filter(|v| !v.trim().is_empty()) {
            self.llm.model = model;
        }
        if let Some(provider) = lookup("FITCOACH_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.llm.provider = provider;
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.agent.max_iterations == 0 {
            anyhow::bail!("agent.max_iterations must be at least 1");
        }
        if self.agent.tool_timeout_secs == 0 || self.agent.query_timeout_secs == 0 {
            anyhow::bail!("agent timeouts must be greater than zero");
        }
        if self.llm.request_timeout_secs == 0 {
            anyhow::bail!("llm.request_timeout_secs must be greater than zero");
        }
        let limit = self.guardrail.max_weekly_loss_lbs;
        if limit.is_nan() || limit <= 0.0 {
            anyhow::bail!("guardrail.max_weekly_loss_lbs must be positive");
        }
        Ok(())
    }
}
