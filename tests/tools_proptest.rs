//! Property tests for the exercise and calorie tools

use fitcoach_cli::tools::calories::{calculate_calories, calorie_target};
use fitcoach_cli::tools::exercise::{lookup_exercises, ExerciseLookup, MUSCLE_GROUPS};
use proptest::prelude::*;

fn goal() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("weight loss"), Just("muscle gain"), Just("maintenance")]
}

proptest! {
    #[test]
    fn macros_add_up_to_daily_calories(
        goal in goal(),
        weight in 40.0f64..160.0,
        height in 140.0f64..210.0,
        age in 16u32..80,
        male in any::<bool>(),
    ) {
        let gender = if male { "male" } else { "female" };
        let breakdown = calculate_calories(goal, weight, height, age, gender);
        let m = &breakdown.macros;
        let from_macros = 4 * m.protein + 9 * m.fat + 4 * m.carbs;

        // Every figure is rounded independently, so allow the accumulated error
        prop_assert!((from_macros - breakdown.daily_calories).abs() <= 9);
    }

    #[test]
    fn gain_and_loss_targets_are_1000_apart(
        weight in 40.0f64..160.0,
        height in 140.0f64..210.0,
        age in 16u32..80,
    ) {
        let gain = calorie_target("muscle gain", weight, height, age, "male");
        let loss = calorie_target("weight loss", weight, height, age, "male");
        prop_assert!((gain - loss - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn lookup_ignores_case_and_padding(
        index in 0usize..MUSCLE_GROUPS.len(),
        upper in proptest::collection::vec(any::<bool>(), 8),
        pad in "[ \t]{0,3}",
    ) {
        let group = MUSCLE_GROUPS[index];
        let mixed: String = group
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
            .collect();

        let expected = lookup_exercises(group);
        let actual = lookup_exercises(&format!("{pad}{mixed}{pad}"));
        prop_assert!(matches!(actual, ExerciseLookup::Found(_)));
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn unknown_groups_are_unavailable(name in "[a-z]{3,12}") {
        prop_assume!(!MUSCLE_GROUPS.contains(&name.as_str()));
        let is_unavailable = matches!(lookup_exercises(&name), ExerciseLookup::Unavailable { .. });
        prop_assert!(is_unavailable);
    }
}
