//! Coordinator - top-level agent for one query
//!
//! Start → GuardrailCheck → Rejected | HandedOff | DirectAnswer → Done.
//! The guardrail always runs first; nothing is routed or dispatched when its
//! tripwire fires.

use super::agent_router::{RouteDecision, Router};
use super::guardrail::Guardrail;
use super::specialist::Specialist;
use crate::core::{CoachError, CoachOutput, SpecialistKind, UserContext};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Start,
    GuardrailCheck,
    Rejected,
    DirectAnswer,
    HandedOff(SpecialistKind),
    Done,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::GuardrailCheck => write!(f, "guardrail_check"),
            Self::Rejected => write!(f, "rejected"),
            Self::DirectAnswer => write!(f, "direct_answer"),
            Self::HandedOff(kind) => write!(f, "handed_off({})", kind),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Output of one query plus the states it went through
#[derive(Debug, Clone)]
pub struct CoordinatorRun {
    pub output: CoachOutput,
    pub trace: Vec<CoordinatorState>,
}

pub struct Coordinator {
    guardrail: Guardrail,
    router: Arc<dyn Router>,
    specialists: Vec<Arc<dyn Specialist>>,
}

impl Coordinator {
    pub fn new(guardrail: Guardrail, router: Arc<dyn Router>) -> Self {
        Self {
            guardrail,
            router,
            specialists: Vec::new(),
        }
    }

    /// Register a specialist; a later one of the same kind replaces the earlier
    pub fn with_specialist(mut self, specialist: Arc<dyn Specialist>) -> Self {
        self.specialists.retain(|s| s.kind() != specialist.kind());
        self.specialists.push(specialist);
        self
    }

    pub fn specialist(&self, kind: SpecialistKind) -> Option<&Arc<dyn Specialist>> {
        self.specialists.iter().find(|s| s.kind() == kind)
    }

    pub fn router_name(&self) -> &str {
        self.router.name()
    }

    pub async fn handle(
        &self,
        query: &str,
        profile: &UserContext,
    ) -> Result<CoordinatorRun, CoachError> {
        let mut trace = vec![CoordinatorState::Start];
        self.transition(&mut trace, CoordinatorState::GuardrailCheck);

        let outcome = self.guardrail.check(query).await;
        if outcome.tripwire_triggered {
            self.transition(&mut trace, CoordinatorState::Rejected);
            return Ok(CoordinatorRun {
                output: CoachOutput::Rejected(outcome.analysis),
                trace,
            });
        }

        let decision = self.router.route(query, profile).await?;
        tracing::info!(router = self.router.name(), ?decision, "Routing decision");

        let output = match decision {
            RouteDecision::Handoff(kind) => {
                self.transition(&mut trace, CoordinatorState::HandedOff(kind));
                self.dispatch(kind, query, profile).await?
            }
            RouteDecision::Answer(text) => {
                self.transition(&mut trace, CoordinatorState::DirectAnswer);
                CoachOutput::General(text)
            }
            RouteDecision::General => {
                self.transition(&mut trace, CoordinatorState::DirectAnswer);
                self.dispatch(SpecialistKind::General, query, profile)
                    .await?
            }
        };

        self.transition(&mut trace, CoordinatorState::Done);
        Ok(CoordinatorRun { output, trace })
    }

    async fn dispatch(
        &self,
        kind: SpecialistKind,
        query: &str,
        profile: &UserContext,
    ) -> Result<CoachOutput, CoachError> {
        let specialist = self
            .specialist(kind)
            .ok_or_else(|| CoachError::MissingSpecialist(kind.label().to_string()))?;
        tracing::info!(specialist = specialist.name(), "Dispatching query");
        specialist.run(query, profile).await
    }

    fn transition(&self, trace: &mut Vec<CoordinatorState>, next: CoordinatorState) {
        if let Some(prev) = trace.last() {
            tracing::debug!(from = %prev, to = %next, "Coordinator transition");
        }
        trace.push(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GoalAnalysis;
    use crate::orchestration::agent_router::KeywordRouter;
    use crate::orchestration::guardrail::{GoalEvaluator, RuleGoalEvaluator};
    use crate::orchestration::specialist::{
        OfflineGeneralCoach, OfflineNutritionSpecialist, OfflineWorkoutSpecialist,
    };
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Specialist that only counts how often it ran
    struct Counting {
        kind: SpecialistKind,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Specialist for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn kind(&self) -> SpecialistKind {
            self.kind
        }

        async fn run(&self, _q: &str, _p: &UserContext) -> Result<CoachOutput, CoachError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CoachOutput::General("counted".into()))
        }
    }

    struct AlwaysUnsafe;

    #[async_trait]
    impl GoalEvaluator for AlwaysUnsafe {
        fn name(&self) -> &str {
            "always-unsafe"
        }

        async fn evaluate(&self, _input: &str) -> anyhow::Result<GoalAnalysis> {
            Ok(GoalAnalysis {
                is_realistic: false,
                reasoning: "unsafe".into(),
            })
        }
    }

    fn offline_coordinator() -> Coordinator {
        let tools = ToolRegistry::with_defaults();
        Coordinator::new(
            Guardrail::new(Arc::new(RuleGoalEvaluator::new(2.0).unwrap())),
            Arc::new(KeywordRouter::with_default_rules().unwrap()),
        )
        .with_specialist(Arc::new(OfflineNutritionSpecialist::new(&tools)))
        .with_specialist(Arc::new(OfflineWorkoutSpecialist::new(&tools)))
        .with_specialist(Arc::new(OfflineGeneralCoach))
    }

    #[tokio::test]
    async fn test_workout_handoff_trace() {
        let run = offline_coordinator()
            .handle("Which leg exercises should I do?", &UserContext::default())
            .await
            .unwrap();
        assert!(matches!(run.output, CoachOutput::Workout(_)));
        assert_eq!(
            run.trace,
            vec![
                CoordinatorState::Start,
                CoordinatorState::GuardrailCheck,
                CoordinatorState::HandedOff(SpecialistKind::Workout),
                CoordinatorState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_skips_routing_and_specialists() {
        let counter = Arc::new(Counting {
            kind: SpecialistKind::Workout,
            calls: AtomicUsize::new(0),
        });
        let coordinator = Coordinator::new(
            Guardrail::new(Arc::new(AlwaysUnsafe)),
            Arc::new(KeywordRouter::with_default_rules().unwrap()),
        )
        .with_specialist(counter.clone());

        let run = coordinator
            .handle("Leg workout please", &UserContext::default())
            .await
            .unwrap();
        assert!(run.output.is_rejected());
        assert_eq!(run.trace.last(), Some(&CoordinatorState::Rejected));
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_general_query_never_yields_plan() {
        let run = offline_coordinator()
            .handle("How many hours of sleep do I need?", &UserContext::default())
            .await
            .unwrap();
        assert!(matches!(run.output, CoachOutput::General(_)));
        assert!(run.trace.contains(&CoordinatorState::DirectAnswer));
    }

    #[tokio::test]
    async fn test_missing_specialist() {
        let coordinator = Coordinator::new(
            Guardrail::new(Arc::new(RuleGoalEvaluator::new(2.0).unwrap())),
            Arc::new(KeywordRouter::with_default_rules().unwrap()),
        );
        let err = coordinator
            .handle("What should I eat?", &UserContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::MissingSpecialist(_)));
    }

    #[test]
    fn test_later_registration_replaces_same_kind() {
        let first = Arc::new(Counting {
            kind: SpecialistKind::General,
            calls: AtomicUsize::new(0),
        });
        let coordinator = offline_coordinator().with_specialist(first);
        assert_eq!(
            coordinator
                .specialist(SpecialistKind::General)
                .map(|s| s.name()),
            Some("counting")
        );
    }
}
