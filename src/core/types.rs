//! Canonical type definitions for the coaching domain
//!
//! The structured outputs (`WorkoutPlan`, `MealPlan`, `GoalAnalysis`) derive
//! `JsonSchema`; their doc comments become the field descriptions the model
//! sees in `response_format`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile of the person being coached
///
/// Read-only for the whole pipeline. Each query gets its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    /// e.g. Beginner, Intermediate, Advanced
    pub fitness_level: String,
    /// e.g. Weight loss, Muscle gain, General fitness
    pub fitness_goal: String,
    /// e.g. Vegan, Vegetarian, No restrictions
    pub dietary_preference: String,
    pub available_equipment: Vec<String>,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: u32,
    pub gender: String,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            fitness_level: String::new(),
            fitness_goal: String::new(),
            dietary_preference: String::new(),
            available_equipment: Vec::new(),
            weight_kg: 70.0,
            height_cm: 170.0,
            age: 30,
            gender: "male".to_string(),
        }
    }
}

impl UserContext {
    pub fn new(
        user_id: impl Into<String>,
        fitness_level: impl Into<String>,
        fitness_goal: impl Into<String>,
        dietary_preference: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            fitness_level: fitness_level.into(),
            fitness_goal: fitness_goal.into(),
            dietary_preference: dietary_preference.into(),
            ..Self::default()
        }
    }

    /// Add equipment, keeping first-seen order and dropping duplicates
    pub fn with_equipment<I, S>(mut self, equipment: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in equipment {
            let item = item.into();
            if !self.available_equipment.contains(&item) {
                self.available_equipment.push(item);
            }
        }
        self
    }

    pub fn with_stats(
        mut self,
        weight_kg: f64,
        height_cm: f64,
        age: u32,
        gender: impl Into<String>,
    ) -> Self {
        self.weight_kg = weight_kg;
        self.height_cm = height_cm;
        self.age = age;
        self.gender = gender.into();
        self
    }

    /// Profile block appended to agent instructions
    pub fn to_prompt_section(&self) -> String {
        let equipment = if self.available_equipment.is_empty() {
            "none".to_string()
        } else {
            self.available_equipment.join(", ")
        };

        format!(
            "## User profile\n\
             - Fitness level: {}\n\
             - Fitness goal: {}\n\
             - Dietary preference: {}\n\
             - Available equipment: {}\n\
             - Weight: {} kg\n\
             - Height: {} cm\n\
             - Age: {}\n\
             - Gender: {}",
            self.fitness_level,
            self.fitness_goal,
            self.dietary_preference,
            equipment,
            self.weight_kg,
            self.height_cm,
            self.age,
            self.gender
        )
    }
}

/// Analysis of user fitness goals to determine realism and safety
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GoalAnalysis {
    /// Whether the fitness goal is realistic and healthy
    pub is_realistic: bool,
    /// Explanation of the analysis
    pub reasoning: String,
}

/// Workout recommendation with detailed parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkoutPlan {
    /// Primary focus of the workout (e.g., 'upper body', 'cardio')
    pub focus_area: String,
    /// Difficulty level (Beginner, Intermediate, Advanced)
    pub difficulty: String,
    /// List of recommended exercises
    pub exercises: Vec<String>,
    /// Additional tips and form recommendations
    pub notes: String,
}

impl fmt::Display for WorkoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Focus area: {}", self.focus_area)?;
        writeln!(f, "Difficulty: {}", self.difficulty)?;
        writeln!(f, "Exercises:")?;
        for (i, exercise) in self.exercises.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, exercise)?;
        }
        write!(f, "Notes: {}", self.notes)
    }
}

/// Meal plan recommendation with macronutrient targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MealPlan {
    /// Recommended daily calorie intake
    pub daily_calories: i64,
    /// Daily protein target in grams
    pub protein_grams: i64,
    /// Daily carbohydrate target in grams
    pub carbs_grams: i64,
    /// Daily fat target in grams
    pub fat_grams: i64,
    /// Meal suggestions
    pub meal_suggestions: Vec<String>,
    /// Dietary advice and nutritional tips
    pub notes: String,
}

impl fmt::Display for MealPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Daily calories: {} kcal", self.daily_calories)?;
        writeln!(
            f,
            "Macros: protein {} g, carbs {} g, fat {} g",
            self.protein_grams, self.carbs_grams, self.fat_grams
        )?;
        writeln!(f, "Meal suggestions:")?;
        for meal in &self.meal_suggestions {
            writeln!(f, "  - {}", meal)?;
        }
        write!(f, "Notes: {}", self.notes)
    }
}

/// Which agent produced (or should produce) the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialistKind {
    Workout,
    Nutrition,
    General,
}

impl SpecialistKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Workout => "Workout Specialist",
            Self::Nutrition => "Nutrition Specialist",
            Self::General => "General Fitness Coach",
        }
    }
}

impl fmt::Display for SpecialistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workout => write!(f, "workout"),
            Self::Nutrition => write!(f, "nutrition"),
            Self::General => write!(f, "general"),
        }
    }
}

/// Terminal outcome of one query
#[derive(Debug, Clone, PartialEq)]
pub enum CoachOutput {
    Workout(WorkoutPlan),
    Meal(MealPlan),
    General(String),
    Rejected(GoalAnalysis),
}

impl CoachOutput {
    /// The agent the output came from; `None` for a guardrail rejection
    pub fn source(&self) -> Option<SpecialistKind> {
        match self {
            Self::Workout(_) => Some(SpecialistKind::Workout),
            Self::Meal(_) => Some(SpecialistKind::Nutrition),
            Self::General(_) => Some(SpecialistKind::General),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}
