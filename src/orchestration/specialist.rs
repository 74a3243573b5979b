//! Specialist agents
//!
//! Each specialist owns one tool and one output type. The model-backed
//! variant runs an `AgentDefinition` through the `AgentRunner`; the offline
//! variants build the same outputs with fixed rules and call the same tools
//! through the registry.

use super::agent_router::Handoff;
use crate::agent::{AgentDefinition, AgentRunner};
use crate::core::{CoachError, CoachOutput, MealPlan, SpecialistKind, UserContext, WorkoutPlan};
use crate::llm::OutputSchema;
use crate::tools::{CalorieBreakdown, ExerciseInfo, ToolRegistry, MUSCLE_GROUPS};
use async_trait::async_trait;
use serde_json::json;

pub const WORKOUT_INSTRUCTIONS: &str = "You are a workout specialist. Use the user's fitness level, goal, and available equipment to design a workout plan.
Leverage the get_exercise_info tool to retrieve specific exercise recommendations.
Provide a clear focus area (e.g., 'upper body', 'cardio') and a difficulty level (Beginner, Intermediate, Advanced) along with form tips.";

pub const NUTRITION_INSTRUCTIONS: &str = "You are a nutrition specialist. Use the user's fitness goal, dietary preferences, and personal stats to calculate daily calorie needs.
Leverage the calculate_calories tool to compute calorie targets and macronutrient breakdown.
Suggest practical meals that help reach the user's nutrition goals.";

pub const GENERAL_INSTRUCTIONS: &str = "You are a holistic fitness coach. Answer general fitness questions clearly and safely, using the user's profile where it helps.";

pub const WORKOUT_HANDOFF: &str =
    "Creates personalized workout plans using detailed exercise info.";
pub const NUTRITION_HANDOFF: &str =
    "Creates personalized meal plans with calorie and macro targets.";

#[async_trait]
pub trait Specialist: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SpecialistKind;

    /// Shown to a model-backed router when it picks a handoff target
    fn handoff_description(&self) -> &str {
        ""
    }

    fn handoff(&self) -> Handoff {
        Handoff::new(self.kind(), self.handoff_description())
    }

    async fn run(&self, query: &str, profile: &UserContext) -> Result<CoachOutput, CoachError>;
}

// ============================================================================
// Model-backed specialists
// ============================================================================

pub struct LlmSpecialist {
    kind: SpecialistKind,
    agent: AgentDefinition,
    runner: AgentRunner,
}

impl LlmSpecialist {
    pub fn workout(runner: AgentRunner, tools: &ToolRegistry) -> Self {
        Self {
            kind: SpecialistKind::Workout,
            agent: AgentDefinition::new("Workout Specialist", WORKOUT_INSTRUCTIONS)
                .with_handoff_description(WORKOUT_HANDOFF)
                .with_tools(tools.subset(&["get_exercise_info"]))
                .with_output_schema(OutputSchema::of::<WorkoutPlan>("WorkoutPlan")),
            runner,
        }
    }

    pub fn nutrition(runner: AgentRunner, tools: &ToolRegistry) -> Self {
        Self {
            kind: SpecialistKind::Nutrition,
            agent: AgentDefinition::new("Nutrition Specialist", NUTRITION_INSTRUCTIONS)
                .with_handoff_description(NUTRITION_HANDOFF)
                .with_tools(tools.subset(&["calculate_calories"]))
                .with_output_schema(OutputSchema::of::<MealPlan>("MealPlan")),
            runner,
        }
    }

    pub fn general(runner: AgentRunner) -> Self {
        Self {
            kind: SpecialistKind::General,
            agent: AgentDefinition::new("Robust Fitness Coach", GENERAL_INSTRUCTIONS),
            runner,
        }
    }
}

#[async_trait]
impl Specialist for LlmSpecialist {
    fn name(&self) -> &str {
        &self.agent.name
    }

    fn kind(&self) -> SpecialistKind {
        self.kind
    }

    fn handoff_description(&self) -> &str {
        &self.agent.handoff_description
    }

    async fn run(&self, query: &str, profile: &UserContext) -> Result<CoachOutput, CoachError> {
        match self.kind {
            SpecialistKind::Workout => self
                .runner
                .run_structured::<WorkoutPlan>(&self.agent, query, Some(profile))
                .await
                .map(CoachOutput::Workout),
            SpecialistKind::Nutrition => self
                .runner
                .run_structured::<MealPlan>(&self.agent, query, Some(profile))
                .await
                .map(CoachOutput::Meal),
            SpecialistKind::General => {
                let run = self.runner.run(&self.agent, query, Some(profile)).await?;
                Ok(CoachOutput::General(run.text))
            }
        }
    }
}

// ============================================================================
// Offline specialists
// ============================================================================

/// Normalized difficulty label from a free-form fitness level
fn difficulty(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "intermediate" => "Intermediate",
        "advanced" => "Advanced",
        _ => "Beginner",
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// True when any phrase appears as a run of whole words
fn contains_any_phrase(words: &[String], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        let needle: Vec<&str> = phrase.split_whitespace().collect();
        !needle.is_empty()
            && words
                .windows(needle.len())
                .any(|window| window.iter().zip(&needle).all(|(w, n)| w == n))
    })
}

/// Muscle groups a query asks for, and the focus label for the plan
pub fn select_muscle_groups(query: &str) -> (String, Vec<&'static str>) {
    let q = query.to_lowercase();

    if q.contains("upper body") {
        return ("upper body".to_string(), vec!["chest", "back", "arms"]);
    }
    if q.contains("lower body") {
        return ("lower body".to_string(), vec!["legs", "core"]);
    }

    let words: Vec<&str> = q
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let explicit: Vec<&'static str> = MUSCLE_GROUPS
        .iter()
        .copied()
        .filter(|group| {
            let singular = group.trim_end_matches('s');
            words.iter().any(|w| *w == *group || *w == singular)
                || (*group == "core" && words.contains(&"abs"))
        })
        .collect();

    if explicit.is_empty() {
        ("full body".to_string(), vec!["legs", "core", "chest"])
    } else {
        (explicit.join(", "), explicit)
    }
}

/// Builds a `WorkoutPlan` from catalog lookups
pub struct OfflineWorkoutSpecialist {
    tools: ToolRegistry,
}

impl OfflineWorkoutSpecialist {
    pub fn new(tools: &ToolRegistry) -> Self {
        Self {
            tools: tools.subset(&["get_exercise_info"]),
        }
    }

    async fn lookup(&self, group: &str) -> Result<ExerciseInfo, CoachError> {
        let result = self
            .tools
            .execute("get_exercise_info", json!({ "muscle_group": group }))
            .await;
        if !result.success {
            return Err(CoachError::tool("get_exercise_info", result.output));
        }
        serde_json::from_str(&result.output)
            .map_err(|e| CoachError::tool("get_exercise_info", e.to_string()))
    }
}

#[async_trait]
impl Specialist for OfflineWorkoutSpecialist {
    fn name(&self) -> &str {
        "Workout Specialist"
    }

    fn kind(&self) -> SpecialistKind {
        SpecialistKind::Workout
    }

    fn handoff_description(&self) -> &str {
        WORKOUT_HANDOFF
    }

    async fn run(&self, query: &str, profile: &UserContext) -> Result<CoachOutput, CoachError> {
        let (focus_area, groups) = select_muscle_groups(query);
        let difficulty = difficulty(&profile.fitness_level);
        let per_group = match difficulty {
            "Advanced" => 4,
            "Intermediate" => 3,
            _ => 2,
        };

        tracing::debug!(focus = %focus_area, ?groups, difficulty, "Building workout plan");

        let mut exercises = Vec::new();
        let mut recommendation = String::new();
        for group in &groups {
            let info = self.lookup(group).await?;
            if recommendation.is_empty() {
                recommendation = info.recommendation.clone();
            }
            exercises.extend(info.exercises.into_iter().take(per_group));
        }

        let mut notes = vec![recommendation];
        if difficulty == "Beginner" {
            notes.push("Focus on controlled form before adding load.".to_string());
        }
        if !profile.available_equipment.is_empty() {
            notes.push(format!(
                "Use your {} to add resistance as you progress.",
                profile.available_equipment.join(" and ")
            ));
        }

        Ok(CoachOutput::Workout(WorkoutPlan {
            focus_area,
            difficulty: difficulty.to_string(),
            exercises,
            notes: notes.join(" "),
        }))
    }
}

/// Goal label the calorie tool understands, from free text
pub fn infer_nutrition_goal(text: &str) -> Option<&'static str> {
    let words = words(text);
    if contains_any_phrase(
        &words,
        &["build muscle", "muscle gain", "gain muscle", "bulk", "bulking", "put on muscle"],
    ) {
        Some("muscle gain")
    } else if contains_any_phrase(
        &words,
        &[
            "lose", "losing", "weight loss", "fat loss", "lean out", "cut", "cutting", "slim",
        ],
    ) {
        Some("weight loss")
    } else {
        None
    }
}

fn meal_suggestions(preference: &str, goal: &str) -> Vec<String> {
    let pref = preference.to_lowercase();
    let meals: [&str; 4] = if pref.contains("vegan") {
        [
            "Breakfast: tofu scramble with spinach and whole-grain toast",
            "Lunch: lentil and quinoa bowl with roasted vegetables",
            "Dinner: tempeh stir-fry with brown rice",
            "Snack: soy yogurt with berries and pumpkin seeds",
        ]
    } else if pref.contains("vegetarian") {
        [
            "Breakfast: Greek yogurt with oats and berries",
            "Lunch: egg and chickpea salad with whole-grain wrap",
            "Dinner: paneer and vegetable curry with brown rice",
            "Snack: cottage cheese with fruit",
        ]
    } else {
        [
            "Breakfast: scrambled eggs with oatmeal and fruit",
            "Lunch: grilled chicken breast with quinoa and vegetables",
            "Dinner: baked salmon with sweet potato and greens",
            "Snack: Greek yogurt with a handful of nuts",
        ]
    };

    let mut suggestions: Vec<String> = meals.iter().map(|m| m.to_string()).collect();
    if goal == "muscle gain" {
        suggestions.push("Post-workout: protein shake with a banana".to_string());
    }
    suggestions
}

/// Builds a `MealPlan` from the calorie calculator
pub struct OfflineNutritionSpecialist {
    tools: ToolRegistry,
}

impl OfflineNutritionSpecialist {
    pub fn new(tools: &ToolRegistry) -> Self {
        Self {
            tools: tools.subset(&["calculate_calories"]),
        }
    }
}

#[async_trait]
impl Specialist for OfflineNutritionSpecialist {
    fn name(&self) -> &str {
        "Nutrition Specialist"
    }

    fn kind(&self) -> SpecialistKind {
        SpecialistKind::Nutrition
    }

    fn handoff_description(&self) -> &str {
        NUTRITION_HANDOFF
    }

    async fn run(&self, query: &str, profile: &UserContext) -> Result<CoachOutput, CoachError> {
        let goal = infer_nutrition_goal(query)
            .or_else(|| infer_nutrition_goal(&profile.fitness_goal))
            .unwrap_or("maintenance");

        let result = self
            .tools
            .execute(
                "calculate_calories",
                json!({
                    "goal": goal,
                    "weight_kg": profile.weight_kg,
                    "height_cm": profile.height_cm,
                    "age": profile.age,
                    "gender": profile.gender,
                }),
            )
            .await;
        if !result.success {
            return Err(CoachError::tool("calculate_calories", result.output));
        }
        let breakdown: CalorieBreakdown = serde_json::from_str(&result.output)
            .map_err(|e| CoachError::tool("calculate_calories", e.to_string()))?;

        tracing::debug!(goal, calories = breakdown.daily_calories, "Building meal plan");

        Ok(CoachOutput::Meal(MealPlan {
            daily_calories: breakdown.daily_calories,
            protein_grams: breakdown.macros.protein,
            carbs_grams: breakdown.macros.carbs,
            fat_grams: breakdown.macros.fat,
            meal_suggestions: meal_suggestions(&profile.dietary_preference, goal),
            notes: format!(
                "Targets for {}: about {} kcal per day. Spread protein across your meals and drink plenty of water.",
                goal, breakdown.daily_calories
            ),
        }))
    }
}

/// Profile-aware answer for queries no specialist covers
pub struct OfflineGeneralCoach;

#[async_trait]
impl Specialist for OfflineGeneralCoach {
    fn name(&self) -> &str {
        "Robust Fitness Coach"
    }

    fn kind(&self) -> SpecialistKind {
        SpecialistKind::General
    }

    async fn run(&self, _query: &str, profile: &UserContext) -> Result<CoachOutput, CoachError> {
        let level = match profile.fitness_level.trim() {
            "" => "beginner".to_string(),
            level => level.to_lowercase(),
        };
        let article = if level.starts_with(['a', 'e', 'i', 'o', 'u']) {
            "an"
        } else {
            "a"
        };

        Ok(CoachOutput::General(format!(
            "As {} {} athlete, consistency beats intensity. Aim for about 150 minutes of moderate activity \
             a week, 7-9 hours of sleep and steady hydration. Ask about workouts or nutrition for a \
             detailed plan.",
            article, level
        )))
    }
}
