//! CLI transport for direct terminal interaction

use crate::config::Config;
use crate::core::UserContext;
use crate::llm;
use crate::orchestration::{build_coordinator, CoachBackend, RenderedResult, ResultKind, RunDriver};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Queries the demo runs, in order
pub const DEMO_QUERIES: [&str; 3] = [
    "I want to start working out to lose weight. What exercises should I do?",
    "How should I eat to build muscle and support my training?",
    "I want to lose 20 pounds in 2 weeks",
];

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Rule-based guardrail, keyword routing and offline specialists
    pub offline: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub config_path: Option<PathBuf>,
}

/// Profile used by the demo
pub fn demo_profile() -> UserContext {
    UserContext::new(
        "user123",
        "beginner",
        "I want to lose 20 pounds in 2 weeks",
        "no restrictions",
    )
    .with_equipment(["dumbbells", "resistance bands"])
    .with_stats(80.0, 175.0, 28, "male")
}

/// Config file, then environment, then command-line overrides
pub fn resolve_config(opts: &RunOptions) -> Result<Config> {
    let mut config = match &opts.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable config file: {:#}", e);
            Config::default()
        }),
    };
    config.apply_env();

    if let Some(provider) = &opts.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &opts.model {
        config.llm.model = model.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Build the run driver for a profile
pub fn build_driver(config: &Config, offline: bool, profile: UserContext) -> Result<RunDriver> {
    let backend = if offline {
        tracing::info!("Running offline: rule-based guardrail and keyword routing");
        CoachBackend::Offline
    } else {
        let provider =
            llm::create_provider(&config.llm).context("Failed to set up the model provider")?;
        CoachBackend::Model(Arc::from(provider))
    };

    let coordinator = build_coordinator(config, &backend)?;
    Ok(RunDriver::new(Arc::new(coordinator), profile)
        .with_query_timeout(Duration::from_secs(config.agent.query_timeout_secs)))
}

/// Run the three demo queries against the demo profile
pub async fn run_demo(opts: &RunOptions) -> Result<()> {
    let config = resolve_config(opts)?;
    let driver = build_driver(&config, opts.offline, demo_profile())?;

    for query in DEMO_QUERIES {
        print_query(query);
        let result = driver.run(query).await;
        print_result(&result);
    }

    Ok(())
}

/// Run a single query
pub async fn run_ask(query: &str, profile: UserContext, opts: &RunOptions) -> Result<()> {
    let config = resolve_config(opts)?;
    let driver = build_driver(&config, opts.offline, profile)?;

    print_query(query);
    let result = driver.run(query).await;
    print_result(&result);

    Ok(())
}

fn print_query(query: &str) {
    let rule = "=".repeat(50);
    println!("\n{}", rule);
    println!("QUERY: {}", query.bold());
    println!("{}", rule);
}

fn print_result(result: &RenderedResult) {
    let header = result.kind.header();
    let header = match result.kind {
        ResultKind::Workout | ResultKind::Nutrition => header.green().bold(),
        ResultKind::General => header.cyan().bold(),
        ResultKind::Guardrail => header.yellow().bold(),
        ResultKind::Error => header.red().bold(),
    };

    println!("\n{}", result.render_with(header));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_profile() {
        let profile = demo_profile();
        assert_eq!(profile.user_id, "user123");
        assert_eq!(profile.weight_kg, 80.0);
        assert_eq!(profile.age, 28);
        assert_eq!(profile.available_equipment.len(), 2);
    }

    #[test]
    fn test_cli_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[llm]\nprovider = \"ollama\"\nmodel = \"llama3.2\"\n").unwrap();

        let opts = RunOptions {
            model: Some("qwen2.5".to_string()),
            config_path: Some(path),
            ..RunOptions::default()
        };
        let config = resolve_config(&opts).unwrap();
        assert_eq!(config.llm.model, "qwen2.5");
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let opts = RunOptions {
            config_path: Some(PathBuf::from("/nonexistent/fitcoach.toml")),
            ..RunOptions::default()
        };
        assert!(resolve_config(&opts).is_err());
    }

    #[tokio::test]
    async fn test_offline_demo_queries() {
        let driver = build_driver(&Config::default(), true, demo_profile()).unwrap();
        let results = driver.run_all(&DEMO_QUERIES).await;

        assert_eq!(results[0].kind, ResultKind::Workout);
        assert_eq!(results[1].kind, ResultKind::Nutrition);
        assert!(results[1].body.contains("Daily calories: 3026 kcal"));
        assert_eq!(results[2].kind, ResultKind::Guardrail);
        assert!(results[2].body.starts_with("Reason: "));
    }
}
