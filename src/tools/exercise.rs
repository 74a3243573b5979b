//! Exercise catalog lookup

use super::{Tool, ToolResult};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Muscle groups covered by the catalog, in catalog order
pub const MUSCLE_GROUPS: [&str; 5] = ["chest", "back", "legs", "arms", "core"];

const CATALOG: [(&str, [&str; 4]); 5] = [
    (
        "chest",
        [
            "Push-ups: 3 sets of 10-15 reps",
            "Bench Press: 3 sets of 8-12 reps",
            "Chest Flyes: 3 sets of 12-15 reps",
            "Incline Push-ups: 3 sets of 10-15 reps",
        ],
    ),
    (
        "back",
        [
            "Pull-ups: 3 sets of 6-10 reps",
            "Bent-over Rows: 3 sets of 8-12 reps",
            "Lat Pulldowns: 3 sets of 10-12 reps",
            "Superman Holds: 3 sets of 30 seconds",
        ],
    ),
    (
        "legs",
        [
            "Squats: 3 sets of 10-15 reps",
            "Lunges: 3 sets of 10 per leg",
            "Calf Raises: 3 sets of 15-20 reps",
            "Glute Bridges: 3 sets of 15 reps",
        ],
    ),
    (
        "arms",
        [
            "Bicep Curls: 3 sets of 10-12 reps",
            "Tricep Dips: 3 sets of 10-15 reps",
            "Hammer Curls: 3 sets of 10-12 reps",
            "Overhead Tricep Extensions: 3 sets of 10-12 reps",
        ],
    ),
    (
        "core",
        [
            "Planks: 3 sets of 30-60 seconds",
            "Crunches: 3 sets of 15-20 reps",
            "Russian Twists: 3 sets of 20 total reps",
            "Mountain Climbers: 3 sets of 20 total reps",
        ],
    ),
];

/// Catalog entry for one muscle group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseInfo {
    pub muscle_group: String,
    pub exercises: Vec<String>,
    pub recommendation: String,
}

/// Outcome of a catalog lookup
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseLookup {
    Found(ExerciseInfo),
    Unavailable { muscle_group: String },
}

impl ExerciseLookup {
    /// Message shown when the group is not in the catalog
    pub fn unavailable_message(muscle_group: &str) -> String {
        format!("Exercise information for {} is not available.", muscle_group)
    }

    pub fn found(&self) -> Option<&ExerciseInfo> {
        match self {
            ExerciseLookup::Found(info) => Some(info),
            ExerciseLookup::Unavailable { .. } => None,
        }
    }
}

/// Look up the catalog entry for a muscle group
///
/// The group is trimmed and lowercased before matching.
pub fn lookup_exercises(muscle_group: &str) -> ExerciseLookup {
    let group = muscle_group.trim().to_lowercase();

    match CATALOG.iter().find(|(name, _)| *name == group) {
        Some((_, exercises)) => ExerciseLookup::Found(ExerciseInfo {
            recommendation: format!(
                "For {} training, complete exercises with 60-90 seconds rest between sets.",
                group
            ),
            exercises: exercises.iter().map(|e| e.to_string()).collect(),
            muscle_group: group,
        }),
        None => ExerciseLookup::Unavailable {
            muscle_group: group,
        },
    }
}

/// `get_exercise_info` tool
pub struct ExerciseTool;

#[async_trait]
impl Tool for ExerciseTool {
    fn name(&self) -> &str {
        "get_exercise_info"
    }

    fn description(&self) -> &str {
        "Get a list of exercises for a specific muscle group along with recommendations"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "muscle_group": {
                    "type": "string",
                    "description": "Muscle group to train: chest, back, legs, arms or core"
                }
            },
            "required": ["muscle_group"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolResult> {
        #[derive(Deserialize)]
        struct Params {
            muscle_group: String,
        }

        let params: Params = serde_json::from_value(params)?;

        match lookup_exercises(&params.muscle_group) {
            ExerciseLookup::Found(info) => Ok(ToolResult::success(serde_json::to_string(&info)?)),
            ExerciseLookup::Unavailable { muscle_group } => Ok(ToolResult::error(
                ExerciseLookup::unavailable_message(&muscle_group),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_chest_in_catalog_order() {
        let info = lookup_exercises("chest");
        let info = info.found().unwrap();
        assert_eq!(info.muscle_group, "chest");
        assert_eq!(info.exercises.len(), 4);
        assert_eq!(info.exercises[0], "Push-ups: 3 sets of 10-15 reps");
        assert_eq!(info.exercises[3], "Incline Push-ups: 3 sets of 10-15 reps");
        assert_eq!(
            info.recommendation,
            "For chest training, complete exercises with 60-90 seconds rest between sets."
        );
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_trimmed() {
        let info = lookup_exercises("  LEGS ");
        assert_eq!(info.found().unwrap().muscle_group, "legs");
        assert_eq!(
            info.found().unwrap().exercises[1],
            "Lunges: 3 sets of 10 per leg"
        );
    }

    #[test]
    fn test_lookup_unknown_group() {
        assert_eq!(
            lookup_exercises("Neck"),
            ExerciseLookup::Unavailable {
                muscle_group: "neck".to_string()
            }
        );
        assert_eq!(
            ExerciseLookup::unavailable_message("neck"),
            "Exercise information for neck is not available."
        );
    }

    #[test]
    fn test_lookup_empty_string_is_unavailable() {
        assert!(lookup_exercises("").found().is_none());
    }

    #[tokio::test]
    async fn test_tool_returns_json_record() {
        let result = ExerciseTool
            .execute(json!({"muscle_group": "Core"}))
            .await
            .unwrap();
        assert!(result.success);
        let info: ExerciseInfo = serde_json::from_str(&result.output).unwrap();
        assert_eq!(info.muscle_group, "core");
        assert_eq!(info.exercises[0], "Planks: 3 sets of 30-60 seconds");
    }

    #[tokio::test]
    async fn test_tool_unknown_group_is_failed_result() {
        let result = ExerciseTool
            .execute(json!({"muscle_group": "glutes"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(
            result.output,
            "Exercise information for glutes is not available."
        );
    }
}
