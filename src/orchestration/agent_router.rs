//! Agent Router - Classifies a query and picks the specialist to hand off to

use crate::core::{CoachError, SpecialistKind, UserContext};
use crate::llm::{LlmProvider, LlmResponse, Message, ToolDefinition};
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;

pub const COORDINATOR_INSTRUCTIONS: &str = "You are a holistic fitness coach. Process general fitness queries while checking the realism of the user's fitness goals.
When specific inquiries about workouts or nutrition arise, hand off to the Workout or Nutrition Specialists respectively.
Use the provided user context to keep your advice safe and personal.";

/// What the coordinator should do with a query
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// Transfer the query to a specialist
    Handoff(SpecialistKind),
    /// The router already answered the query itself
    Answer(String),
    /// No specialist fits; let the general coach answer
    General,
}

#[async_trait]
pub trait Router: Send + Sync {
    fn name(&self) -> &str;

    async fn route(&self, query: &str, profile: &UserContext)
        -> Result<RouteDecision, CoachError>;
}

/// A specialist the coordinator can transfer to
#[derive(Debug, Clone)]
pub struct Handoff {
    pub kind: SpecialistKind,
    pub description: String,
}

impl Handoff {
    pub fn new(kind: SpecialistKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    /// Name of the transfer tool, e.g. `transfer_to_workout_specialist`
    pub fn tool_name(&self) -> String {
        format!("transfer_to_{}_specialist", self.kind)
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.tool_name(),
            description: format!(
                "Handoff to the {}. {}",
                self.kind.label(),
                self.description
            ),
            parameters: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        }
    }
}

pub struct RoutingRule {
    pub pattern: Regex,
    pub target: SpecialistKind,
}

/// Deterministic router scoring ordered regex rules per specialist
///
/// Every matching rule adds one point to its specialist. The highest score
/// wins; a tie goes to whichever specialist got its first rule registered
/// first. No match at all routes to the general coach.
#[derive(Default)]
pub struct KeywordRouter {
    routing_rules: Vec<RoutingRule>,
    registration_order: Vec<SpecialistKind>,
}

impl KeywordRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the built-in nutrition and workout vocabulary
    pub fn with_default_rules() -> Result<Self> {
        let mut router = Self::new();
        router.add_rule(
            r"(?i)\b(eat|eating|diet|dieting|meals?|food|foods|nutrition|nutritional)\b",
            SpecialistKind::Nutrition,
        )?;
        router.add_rule(
            r"(?i)\b(calories?|macros?|macronutrients?|protein|carbs?|carbohydrates?|fats?)\b",
            SpecialistKind::Nutrition,
        )?;
        router.add_rule(
            r"(?i)\b(vegan|vegetarian|keto|recipes?|breakfast|lunch|dinner|snacks?)\b",
            SpecialistKind::Nutrition,
        )?;
        router.add_rule(
            r"(?i)\b(exercises?|workouts?|work out|working out|training|train|routine)\b",
            SpecialistKind::Workout,
        )?;
        router.add_rule(
            r"(?i)\b(chest|back|legs|arms|core|upper body|lower body|glutes|abs)\b",
            SpecialistKind::Workout,
        )?;
        router.add_rule(
            r"(?i)\b(reps|sets|squats?|push-?ups?|lift|lifting|cardio|strength|dumbbells?)\b",
            SpecialistKind::Workout,
        )?;
        Ok(router)
    }

    pub fn add_rule(&mut self, pattern: &str, target: SpecialistKind) -> Result<()> {
        let regex = Regex::new(pattern)?;
        if !self.registration_order.contains(&target) {
            self.registration_order.push(target);
        }
        self.routing_rules.push(RoutingRule {
            pattern: regex,
            target,
        });
        Ok(())
    }

    /// Points per specialist, in registration order
    pub fn scores(&self, message: &str) -> Vec<(SpecialistKind, usize)> {
        self.registration_order
            .iter()
            .map(|kind| {
                let score = self
                    .routing_rules
                    .iter()
                    .filter(|r| r.target == *kind && r.pattern.is_match(message))
                    .count();
                (*kind, score)
            })
            .collect()
    }

    pub fn classify(&self, message: &str) -> RouteDecision {
        let mut best: Option<(SpecialistKind, usize)> = None;
        for (kind, score) in self.scores(message) {
            // Strictly greater keeps the earlier registration on ties
            if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((kind, score));
            }
        }

        match best {
            Some((SpecialistKind::General, _)) | None => RouteDecision::General,
            Some((kind, _)) => RouteDecision::Handoff(kind),
        }
    }
}

#[async_trait]
impl Router for KeywordRouter {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn route(
        &self,
        query: &str,
        _profile: &UserContext,
    ) -> Result<RouteDecision, CoachError> {
        Ok(self.classify(query))
    }
}

/// Lets the model decide by offering one transfer tool per specialist
pub struct LlmRouter {
    llm: Arc<dyn LlmProvider>,
    handoffs: Vec<Handoff>,
}

impl LlmRouter {
    pub fn new(llm: Arc<dyn LlmProvider>, handoffs: Vec<Handoff>) -> Self {
        Self { llm, handoffs }
    }

    fn resolve(&self, tool_name: &str) -> Result<SpecialistKind, CoachError> {
        self.handoffs
            .iter()
            .find(|h| h.tool_name() == tool_name)
            .map(|h| h.kind)
            .ok_or_else(|| CoachError::UnknownHandoff(tool_name.to_string()))
    }
}

#[async_trait]
impl Router for LlmRouter {
    fn name(&self) -> &str {
        "model"
    }

    async fn route(
        &self,
        query: &str,
        profile: &UserContext,
    ) -> Result<RouteDecision, CoachError> {
        let messages = [
            Message::system(format!(
                "{}\n\n{}",
                COORDINATOR_INSTRUCTIONS,
                profile.to_prompt_section()
            )),
            Message::user(query),
        ];
        let tools: Vec<ToolDefinition> = self.handoffs.iter().map(Handoff::to_definition).collect();

        let response = self.llm.chat(&messages, Some(&tools)).await?;

        if let Some(call) = response.tool_calls().first() {
            return self.resolve(&call.name).map(RouteDecision::Handoff);
        }

        match response {
            LlmResponse::Text { text, .. } if !text.trim().is_empty() => {
                Ok(RouteDecision::Answer(text))
            }
            LlmResponse::Mixed {
                text: Some(text), ..
            } if !text.trim().is_empty() => Ok(RouteDecision::Answer(text)),
            _ => Ok(RouteDecision::General),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedProvider;

    fn handoffs() -> Vec<Handoff> {
        vec![
            Handoff::new(SpecialistKind::Workout, "Creates workout plans."),
            Handoff::new(SpecialistKind::Nutrition, "Creates meal plans."),
        ]
    }

    #[test]
    fn test_keyword_routes_workout_query() {
        let router = KeywordRouter::with_default_rules().unwrap();
        assert_eq!(
            router.classify(
                "I want to start working out to lose weight. What exercises should I do?"
            ),
            RouteDecision::Handoff(SpecialistKind::Workout)
        );
    }

    #[test]
    fn test_keyword_tie_goes_to_first_registered() {
        let router = KeywordRouter::with_default_rules().unwrap();
        // "eat" scores nutrition, "training" scores workout
        assert_eq!(
            router.classify("How should I eat to build muscle and support my training?"),
            RouteDecision::Handoff(SpecialistKind::Nutrition)
        );
    }

    #[test]
    fn test_keyword_higher_score_wins() {
        let router = KeywordRouter::with_default_rules().unwrap();
        assert_eq!(
            router.classify("Which exercises hit the chest, and how much protein after training?"),
            RouteDecision::Handoff(SpecialistKind::Workout)
        );
    }

    #[test]
    fn test_keyword_no_match_is_general() {
        let router = KeywordRouter::with_default_rules().unwrap();
        assert_eq!(
            router.classify("How many hours of sleep do I need?"),
            RouteDecision::General
        );
    }

    #[test]
    fn test_invalid_rule_is_rejected() {
        let mut router = KeywordRouter::new();
        assert!(router.add_rule("(unclosed", SpecialistKind::Workout).is_err());
    }

    #[test]
    fn test_handoff_tool_names() {
        let names: Vec<String> = handoffs().iter().map(Handoff::tool_name).collect();
        assert_eq!(
            names,
            vec![
                "transfer_to_workout_specialist",
                "transfer_to_nutrition_specialist"
            ]
        );
    }

    #[tokio::test]
    async fn test_llm_router_handoff() {
        let provider = Arc::new(
            ScriptedProvider::new().push_tool_call("transfer_to_nutrition_specialist", json!({})),
        );
        let router = LlmRouter::new(provider.clone(), handoffs());

        let decision = router
            .route("What should I eat?", &UserContext::default())
            .await
            .unwrap();
        assert_eq!(decision, RouteDecision::Handoff(SpecialistKind::Nutrition));
        assert_eq!(
            provider.requests()[0].tool_names,
            vec![
                "transfer_to_workout_specialist",
                "transfer_to_nutrition_specialist"
            ]
        );
    }

    #[tokio::test]
    async fn test_llm_router_direct_answer() {
        let provider = Arc::new(ScriptedProvider::new().push_text("Sleep 7-9 hours a night."));
        let router = LlmRouter::new(provider, handoffs());
        let decision = router
            .route("How much sleep?", &UserContext::default())
            .await
            .unwrap();
        assert_eq!(
            decision,
            RouteDecision::Answer("Sleep 7-9 hours a night.".to_string())
        );
    }

    #[tokio::test]
    async fn test_llm_router_unknown_handoff() {
        let provider =
            Arc::new(ScriptedProvider::new().push_tool_call("transfer_to_yoga_specialist", json!({})));
        let router = LlmRouter::new(provider, handoffs());
        let err = router
            .route("Yoga?", &UserContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoachError::UnknownHandoff(name) if name == "transfer_to_yoga_specialist"));
    }

    #[tokio::test]
    async fn test_llm_router_empty_text_is_general() {
        let provider = Arc::new(ScriptedProvider::new().push_text("   "));
        let router = LlmRouter::new(provider, handoffs());
        let decision = router.route("hmm", &UserContext::default()).await.unwrap();
        assert_eq!(decision, RouteDecision::General);
    }
}
