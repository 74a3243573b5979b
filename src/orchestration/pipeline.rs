//! Run driver - feeds queries through the coordinator one at a time

use super::coordinator::Coordinator;
use crate::core::{CoachError, CoachOutput, UserContext};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// How a query ended, for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Workout,
    Nutrition,
    General,
    Guardrail,
    Error,
}

impl ResultKind {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Workout => "[👟 WORKOUT SPECIALIST]",
            Self::Nutrition => "[🍎 NUTRITION SPECIALIST]",
            Self::General => "[🏋️ GENERAL FITNESS COACH]",
            Self::Guardrail => "[⚠️ GUARDRAIL TRIGGERED]",
            Self::Error => "[❌ ERROR]",
        }
    }
}

/// Presentation of one query's result
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedResult {
    pub query: String,
    pub kind: ResultKind,
    pub body: String,
}

impl RenderedResult {
    pub fn from_output(query: &str, output: &CoachOutput) -> Self {
        let (kind, body) = match output {
            CoachOutput::Workout(plan) => (ResultKind::Workout, plan.to_string()),
            CoachOutput::Meal(plan) => (ResultKind::Nutrition, plan.to_string()),
            CoachOutput::General(text) => (ResultKind::General, text.clone()),
            CoachOutput::Rejected(analysis) => {
                let body = if analysis.reasoning.trim().is_empty() {
                    "An unrealistic or unsafe fitness goal was detected.".to_string()
                } else {
                    format!("Reason: {}", analysis.reasoning)
                };
                (ResultKind::Guardrail, body)
            }
        };
        Self {
            query: query.to_string(),
            kind,
            body,
        }
    }

    pub fn from_error(query: &str, error: &CoachError) -> Self {
        Self {
            query: query.to_string(),
            kind: ResultKind::Error,
            body: error.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ResultKind::Error
    }

    /// Lay the result out under a caller-styled header
    pub fn render_with(&self, header: impl fmt::Display) -> String {
        match self.kind {
            ResultKind::Error => format!("{}: {}", header, self.body),
            ResultKind::Guardrail => format!("{}\n{}", header, self.body),
            _ => format!("{}\nRESPONSE:\n{}", header, self.body),
        }
    }
}

impl fmt::Display for RenderedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(self.kind.header()))
    }
}

pub struct RunDriver {
    coordinator: Arc<Coordinator>,
    profile: UserContext,
    query_timeout: Duration,
}

impl RunDriver {
    pub fn new(coordinator: Arc<Coordinator>, profile: UserContext) -> Self {
        Self {
            coordinator,
            profile,
            query_timeout: Duration::from_secs(180),
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn profile(&self) -> &UserContext {
        &self.profile
    }

    /// Run one query; failures are rendered, never returned
    pub async fn run(&self, query: &str) -> RenderedResult {
        // Each query works on its own copy of the profile
        let profile = self.profile.clone();
        tracing::info!(query, "Processing query");

        let result = match timeout(self.query_timeout, self.coordinator.handle(query, &profile)).await
        {
            Ok(result) => result,
            Err(_) => Err(CoachError::Timeout(self.query_timeout)),
        };

        match result {
            Ok(run) => {
                tracing::debug!(trace = ?run.trace, "Query finished");
                RenderedResult::from_output(query, &run.output)
            }
            Err(e) => {
                tracing::warn!(query, "Query failed: {}", e);
                RenderedResult::from_error(query, &e)
            }
        }
    }

    /// Run queries strictly one after another
    pub async fn run_all<S: AsRef<str>>(&self, queries: &[S]) -> Vec<RenderedResult> {
        let mut results = Vec::with_capacity(queries.len());
        for query in queries {
            results.push(self.run(query.as_ref()).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GoalAnalysis, MealPlan, SpecialistKind};
    use crate::orchestration::agent_router::{RouteDecision, Router};
    use crate::orchestration::guardrail::{Guardrail, RuleGoalEvaluator};
    use async_trait::async_trait;

    struct SlowRouter;

    #[async_trait]
    impl Router for SlowRouter {
        fn name(&self) -> &str {
            "slow"
        }

        async fn route(
            &self,
            _query: &str,
            _profile: &UserContext,
        ) -> Result<RouteDecision, CoachError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(RouteDecision::Handoff(SpecialistKind::Workout))
        }
    }

    #[test]
    fn test_render_meal_plan() {
        let rendered = RenderedResult::from_output(
            "How should I eat?",
            &CoachOutput::Meal(MealPlan {
                daily_calories: 2226,
                protein_grams: 223,
                carbs_grams: 167,
                fat_grams: 74,
                meal_suggestions: vec!["Oats".into()],
                notes: "Hydrate".into(),
            }),
        );
        let text = rendered.to_string();
        assert!(text.starts_with("[🍎 NUTRITION SPECIALIST]\nRESPONSE:\n"));
        assert!(text.contains("Daily calories: 2226 kcal"));
    }

    #[test]
    fn test_render_rejection() {
        let rendered = RenderedResult::from_output(
            "lose 20 pounds in 2 weeks",
            &CoachOutput::Rejected(GoalAnalysis {
                is_realistic: false,
                reasoning: "Too fast".into(),
            }),
        );
        assert_eq!(rendered.to_string(), "[⚠️ GUARDRAIL TRIGGERED]\nReason: Too fast");
    }

    #[test]
    fn test_render_rejection_without_reasoning() {
        let rendered = RenderedResult::from_output(
            "q",
            &CoachOutput::Rejected(GoalAnalysis {
                is_realistic: false,
                reasoning: String::new(),
            }),
        );
        assert!(rendered
            .to_string()
            .ends_with("An unrealistic or unsafe fitness goal was detected."));
    }

    #[test]
    fn test_render_error() {
        let rendered =
            RenderedResult::from_error("q", &CoachError::UnknownHandoff("transfer_to_x".into()));
        assert!(rendered.is_error());
        assert_eq!(
            rendered.to_string(),
            "[❌ ERROR]: Unknown handoff target: transfer_to_x"
        );
    }

    #[test]
    fn test_render_with_keeps_layout() {
        let rendered = RenderedResult::from_output("q", &CoachOutput::General("Sleep more.".into()));
        assert_eq!(
            rendered.render_with("<general>"),
            "<general>\nRESPONSE:\nSleep more."
        );
        assert_eq!(rendered.render_with(rendered.kind.header()), rendered.to_string());
    }

    #[tokio::test]
    async fn test_query_timeout_is_rendered_and_next_query_runs() {
        let coordinator = Arc::new(Coordinator::new(
            Guardrail::new(Arc::new(RuleGoalEvaluator::new(2.0).unwrap())),
            Arc::new(SlowRouter),
        ));
        let driver = RunDriver::new(coordinator, UserContext::default())
            .with_query_timeout(Duration::from_millis(50));

        let results = driver
            .run_all(&["Leg day?", "I want to lose 20 pounds in 2 weeks"])
            .await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_error());
        assert_eq!(results[0].body, "Query timed out after 50ms");
        assert_eq!(results[1].kind, ResultKind::Guardrail);
    }
}
