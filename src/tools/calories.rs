//! Daily calorie and macronutrient targets
//!
//! BMR comes from the Mifflin-St Jeor equation, TDEE assumes a moderate
//! activity factor of 1.55, and the goal shifts the target and the macro split.

use super::{Tool, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const ACTIVITY_FACTOR: f64 = 1.55;
const WEIGHT_LOSS_DEFICIT: f64 = 500.0;
const MUSCLE_GAIN_SURPLUS: f64 = 300.0;

/// Macronutrient grams per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub protein: i64,
    pub fat: i64,
    pub carbs: i64,
}

/// Calculator output, serialized as the tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieBreakdown {
    pub goal: String,
    pub daily_calories: i64,
    pub macros: Macros,
}

/// Basal metabolic rate in kcal/day
///
/// Only "male" and "m" (any casing) select the male constant; every other
/// value falls through to the female one.
pub fn basal_metabolic_rate(weight_kg: f64, height_cm: f64, age: u32, gender: &str) -> f64 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    match gender.to_lowercase().as_str() {
        "male" | "m" => base + 5.0,
        _ => base - 161.0,
    }
}

/// Unrounded daily calorie target for a goal
pub fn calorie_target(goal: &str, weight_kg: f64, height_cm: f64, age: u32, gender: &str) -> f64 {
    let tdee = basal_metabolic_rate(weight_kg, height_cm, age, gender) * ACTIVITY_FACTOR;
    match goal.to_lowercase().as_str() {
        "weight loss" => tdee - WEIGHT_LOSS_DEFICIT,
        "muscle gain" => tdee + MUSCLE_GAIN_SURPLUS,
        _ => tdee,
    }
}

/// Protein, fat and carb shares of the calorie target
fn macro_split(goal: &str) -> (f64, f64, f64) {
    match goal.to_lowercase().as_str() {
        "weight loss" => (0.40, 0.30, 0.30),
        "muscle gain" => (0.30, 0.25, 0.45),
        _ => (0.30, 0.30, 0.40),
    }
}

fn round(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Daily calories and macro grams for the given stats and goal
///
/// Each figure is rounded on its own, half to even; the macros are not
/// reconciled against the rounded calorie total.
pub fn calculate_calories(
    goal: &str,
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    gender: &str,
) -> CalorieBreakdown {
    let target = calorie_target(goal, weight_kg, height_cm, age, gender);
    let (protein_pct, fat_pct, carb_pct) = macro_split(goal);

    CalorieBreakdown {
        goal: goal.to_string(),
        daily_calories: round(target),
        macros: Macros {
            protein: round(target * protein_pct / 4.0),
            fat: round(target * fat_pct / 9.0),
            carbs: round(target * carb_pct / 4.0),
        },
    }
}

/// `calculate_calories` tool
pub struct CalorieTool;

#[async_trait]
impl Tool for CalorieTool {
    fn name(&self) -> &str {
        "calculate_calories"
    }

    fn description(&self) -> &str {
        "Calculate daily calorie needs and provide macronutrient breakdown based on user stats and goals"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal": {
                    "type": "string",
                    "description": "\"weight loss\", \"muscle gain\" or anything else for maintenance"
                },
                "weight_kg": { "type": "number" },
                "height_cm": { "type": "number" },
                "age": { "type": "integer", "minimum": 0 },
                "gender": { "type": "string" }
            },
            "required": ["goal", "weight_kg", "height_cm", "age", "gender"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        #[derive(Deserialize)]
        struct Params {
            goal: String,
            weight_kg: f64,
            height_cm: f64,
            // Models emit 28.0 as readily as 28
            age: f64,
            gender: String,
        }

        let p: Params = serde_json::from_value(params)?;
        let Some(age) = whole_years(p.age) else {
            return Ok(ToolResult::error(format!(
                "age must be a non-negative whole number, got {}",
                p.age
            )));
        };
        let breakdown = calculate_calories(&p.goal, p.weight_kg, p.height_cm, age, &p.gender);
        Ok(ToolResult::success(serde_json::to_string(&breakdown)?))
    }
}

fn whole_years(age: f64) -> Option<u32> {
    if age.is_finite() && age >= 0.0 && age.fract() == 0.0 && age <= f64::from(u32::MAX) {
        Some(age as u32)
    } else {
        None
    }
}
