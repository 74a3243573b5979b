//! Core domain modules
//!
//! Types shared by the guardrail, the specialists, the coordinator and the
//! presentation layer.

pub mod errors;
pub mod types;

pub use errors::CoachError;
pub use types::{
    CoachOutput, GoalAnalysis, MealPlan, SpecialistKind, UserContext, WorkoutPlan,
};
