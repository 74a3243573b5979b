//! Agent Orchestration - guardrail, routing, specialists and the run driver

pub mod agent_router;
pub mod coordinator;
pub mod guardrail;
pub mod pipeline;
pub mod specialist;

pub use agent_router::{Handoff, KeywordRouter, LlmRouter, RouteDecision, Router};
pub use coordinator::{Coordinator, CoordinatorRun, CoordinatorState};
pub use guardrail::{
    FailurePolicy, GoalEvaluator, Guardrail, GuardrailOutcome, LlmGoalEvaluator,
    RuleGoalEvaluator,
};
pub use pipeline::{RenderedResult, ResultKind, RunDriver};
pub use specialist::{
    LlmSpecialist, OfflineGeneralCoach, OfflineNutritionSpecialist, OfflineWorkoutSpecialist,
    Specialist,
};

use crate::agent::{AgentRunner, RunnerConfig};
use crate::config::{Config, EvaluatorKind, RouterStrategy};
use crate::llm::LlmProvider;
use crate::tools::ToolRegistry;
use anyhow::Result;
use std::sync::Arc;

/// What answers the queries
#[derive(Clone)]
pub enum CoachBackend {
    /// Rule-based guardrail, keyword router and offline specialists
    Offline,
    /// Model-backed agents on the given provider
    Model(Arc<dyn LlmProvider>),
}

/// Wire up the coordinator for a backend according to config
pub fn build_coordinator(config: &Config, backend: &CoachBackend) -> Result<Coordinator> {
    let mut tools = ToolRegistry::with_defaults();
    tools.set_tool_timeout_secs(config.agent.tool_timeout_secs);

    let rules = || RuleGoalEvaluator::new(config.guardrail.max_weekly_loss_lbs);

    let coordinator = match backend {
        CoachBackend::Offline => {
            let guardrail = Guardrail::new(Arc::new(rules()?))
                .with_policy(config.guardrail.failure_policy);
            Coordinator::new(guardrail, Arc::new(KeywordRouter::with_default_rules()?))
                .with_specialist(Arc::new(OfflineWorkoutSpecialist::new(&tools)))
                .with_specialist(Arc::new(OfflineNutritionSpecialist::new(&tools)))
                .with_specialist(Arc::new(OfflineGeneralCoach))
        }
        CoachBackend::Model(llm) => {
            let runner = AgentRunner::new(Arc::clone(llm)).with_config(RunnerConfig {
                max_iterations: config.agent.max_iterations,
                ..RunnerConfig::default()
            });

            let evaluator: Arc<dyn GoalEvaluator> = match config.guardrail.evaluator {
                EvaluatorKind::Model => Arc::new(LlmGoalEvaluator::new(runner.clone())),
                EvaluatorKind::Rules => Arc::new(rules()?),
            };
            let guardrail = Guardrail::new(evaluator).with_policy(config.guardrail.failure_policy);

            let workout = Arc::new(LlmSpecialist::workout(runner.clone(), &tools));
            let nutrition = Arc::new(LlmSpecialist::nutrition(runner.clone(), &tools));
            let general = Arc::new(LlmSpecialist::general(runner));

            let router: Arc<dyn Router> = match config.router.strategy {
                RouterStrategy::Model => Arc::new(LlmRouter::new(
                    Arc::clone(llm),
                    vec![workout.handoff(), nutrition.handoff()],
                )),
                RouterStrategy::Keyword => Arc::new(KeywordRouter::with_default_rules()?),
            };

            Coordinator::new(guardrail, router)
                .with_specialist(workout)
                .with_specialist(nutrition)
                .with_specialist(general)
        }
    };

    tracing::debug!(router = coordinator.router_name(), "Coordinator ready");
    Ok(coordinator)
}
