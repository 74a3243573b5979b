//! Goal guardrail - decides whether a stated fitness goal is safe to coach
//!
//! Runs once per query, before routing. An evaluator produces a
//! `GoalAnalysis`; the `Guardrail` wrapper turns that into a tripwire and
//! decides what an evaluator failure means via `FailurePolicy`.

use crate::agent::{AgentDefinition, AgentRunner};
use crate::core::GoalAnalysis;
use crate::llm::OutputSchema;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const GOAL_ANALYZER_INSTRUCTIONS: &str = "Analyze the user's fitness goal. \
Losing more than 2 pounds per week is generally unsafe.";

const LBS_PER_KG: f64 = 2.20462;
const WEEKS_PER_MONTH: f64 = 4.345;

/// Produces a goal analysis for a piece of user text
#[async_trait]
pub trait GoalEvaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(&self, input: &str) -> Result<GoalAnalysis>;
}

/// What an evaluator failure means for the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let the query through as if the goal were realistic
    #[default]
    FailOpen,
    /// Reject the query
    FailClosed,
}

impl std::str::FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => anyhow::bail!("Unknown guardrail failure policy: {}", other),
        }
    }
}

/// Result of a guardrail check
#[derive(Debug, Clone, PartialEq)]
pub struct GuardrailOutcome {
    pub analysis: GoalAnalysis,
    pub tripwire_triggered: bool,
}

/// Evaluator plus failure policy
pub struct Guardrail {
    evaluator: Arc<dyn GoalEvaluator>,
    policy: FailurePolicy,
}

impl Guardrail {
    pub fn new(evaluator: Arc<dyn GoalEvaluator>) -> Self {
        Self {
            evaluator,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Evaluate the input; never fails
    pub async fn check(&self, input: &str) -> GuardrailOutcome {
        match self.evaluator.evaluate(input).await {
            Ok(analysis) => {
                let tripwire_triggered = !analysis.is_realistic;
                tracing::info!(
                    evaluator = self.evaluator.name(),
                    tripwire = tripwire_triggered,
                    "Goal analysed"
                );
                GuardrailOutcome {
                    analysis,
                    tripwire_triggered,
                }
            }
            Err(e) => {
                tracing::warn!(
                    evaluator = self.evaluator.name(),
                    policy = ?self.policy,
                    "Goal evaluation failed: {:#}",
                    e
                );
                match self.policy {
                    FailurePolicy::FailOpen => GuardrailOutcome {
                        analysis: GoalAnalysis {
                            is_realistic: true,
                            reasoning: format!("Error analyzing goal: {}", e),
                        },
                        tripwire_triggered: false,
                    },
                    FailurePolicy::FailClosed => GuardrailOutcome {
                        analysis: GoalAnalysis {
                            is_realistic: false,
                            reasoning: format!("Goal could not be verified: {}", e),
                        },
                        tripwire_triggered: true,
                    },
                }
            }
        }
    }
}

/// Asks the model for a structured `GoalAnalysis`
pub struct LlmGoalEvaluator {
    runner: AgentRunner,
    agent: AgentDefinition,
}

impl LlmGoalEvaluator {
    pub fn new(runner: AgentRunner) -> Self {
        let agent = AgentDefinition::new("Goal Analyzer", GOAL_ANALYZER_INSTRUCTIONS)
            .with_output_schema(OutputSchema::of::<GoalAnalysis>("GoalAnalysis"));
        Self { runner, agent }
    }

    pub fn prompt(input: &str) -> String {
        format!(
            "The user said: {}. Analyze whether this fitness goal is realistic and safe.",
            input
        )
    }
}

#[async_trait]
impl GoalEvaluator for LlmGoalEvaluator {
    fn name(&self) -> &str {
        &self.agent.name
    }

    async fn evaluate(&self, input: &str) -> Result<GoalAnalysis> {
        let analysis = self
            .runner
            .run_structured::<GoalAnalysis>(&self.agent, &Self::prompt(input), None)
            .await?;
        Ok(analysis)
    }
}

/// Deterministic evaluator: finds "lose N <unit> in M <period>" and checks the weekly rate
pub struct RuleGoalEvaluator {
    pattern: Regex,
    max_weekly_loss_lbs: f64,
}

impl RuleGoalEvaluator {
    pub fn new(max_weekly_loss_lbs: f64) -> Result<Self> {
        let pattern = Regex::new(
            &format!(
                r"(?i)\b(?:lose|losing|drop|dropping|shed|shedding|lost)\s+({n})\s*(pounds?|lbs?|kgs?|kilos?|kilograms?)\b.*?\b(?:in|within|over)\s+(?:({n})\s*)?(days?|weeks?|wks?|months?|mos?)\b",
                n = NUMBER_PATTERN
            ),
        )?;
        Ok(Self {
            pattern,
            max_weekly_loss_lbs,
        })
    }

    /// Weekly loss rate in pounds implied by the text, if it states one
    pub fn weekly_rate(&self, input: &str) -> Option<f64> {
        self.parse(input).map(|goal| goal.weekly_rate())
    }

    fn parse(&self, input: &str) -> Option<LossGoal> {
        let caps = self.pattern.captures(input)?;
        let amount = parse_number(caps.get(1)?.as_str())?;
        let unit = caps.get(2)?.as_str().to_lowercase();
        let count = match caps.get(3) {
            None => 1.0,
            Some(c) => parse_number(c.as_str())?,
        };
        let period = caps.get(4)?.as_str().to_lowercase();

        let pounds = if unit.starts_with('k') {
            amount * LBS_PER_KG
        } else {
            amount
        };
        let weeks = if period.starts_with("day") {
            count / 7.0
        } else if period.starts_with("mo") {
            count * WEEKS_PER_MONTH
        } else {
            count
        };

        Some(LossGoal {
            phrase: caps.get(0)?.as_str().to_string(),
            pounds,
            weeks,
        })
    }
}

/// Numerals plus the number words people use for weights and timelines
const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?|a|an|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fifteen|twenty|thirty|forty|fifty";

fn parse_number(token: &str) -> Option<f64> {
    let value = match token.to_lowercase().as_str() {
        "a" | "an" | "one" => 1.0,
        "two" => 2.0,
        "three" => 3.0,
        "four" => 4.0,
        "five" => 5.0,
        "six" => 6.0,
        "seven" => 7.0,
        "eight" => 8.0,
        "nine" => 9.0,
        "ten" => 10.0,
        "eleven" => 11.0,
        "twelve" => 12.0,
        "fifteen" => 15.0,
        "twenty" => 20.0,
        "thirty" => 30.0,
        "forty" => 40.0,
        "fifty" => 50.0,
        digits => return digits.parse().ok(),
    };
    Some(value)
}

struct LossGoal {
    phrase: String,
    pounds: f64,
    weeks: f64,
}

impl LossGoal {
    fn weekly_rate(&self) -> f64 {
        if self.weeks <= 0.0 {
            f64::INFINITY
        } else {
            self.pounds / self.weeks
        }
    }
}

#[async_trait]
impl GoalEvaluator for RuleGoalEvaluator {
    fn name(&self) -> &str {
        "Rule-based Goal Analyzer"
    }

    async fn evaluate(&self, input: &str) -> Result<GoalAnalysis> {
        let Some(goal) = self.parse(input) else {
            return Ok(GoalAnalysis {
                is_realistic: true,
                reasoning: "No weight-loss timeline found; nothing unsafe to flag.".to_string(),
            });
        };

        let rate = goal.weekly_rate();
        if !rate.is_finite() {
            return Ok(GoalAnalysis {
                is_realistic: false,
                reasoning: format!("\"{}\" leaves no time to lose the weight.", goal.phrase),
            });
        }

        let is_realistic = rate <= self.max_weekly_loss_lbs;
        let reasoning = if is_realistic {
            format!(
                "\"{}\" works out to about {:.1} pounds per week, within the safe limit of {} pounds per week.",
                goal.phrase, rate, self.max_weekly_loss_lbs
            )
        } else {
            format!(
                "\"{}\" works out to about {:.1} pounds per week. Losing more than {} pounds per week is generally unsafe; aim for 1-2 pounds per week instead.",
                goal.phrase, rate, self.max_weekly_loss_lbs
            )
        };

        Ok(GoalAnalysis {
            is_realistic,
            reasoning,
        })
    }
}
