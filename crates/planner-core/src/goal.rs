use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Goal slots a day offers; orders run `1..=GOALS_PER_DAY`.
pub const GOALS_PER_DAY: u8 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyGoal {
    pub id: Uuid,

    pub goal_date: NaiveDate,

    pub goal_text: String,

    pub goal_order: u8,

    #[serde(default)]
    pub is_completed: bool,
}

/// Sets the text of the goal in slot `goal_order` of `goal_date`, creating
/// it when the slot is empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalUpsert {
    pub goal_date: NaiveDate,
    pub goal_text: String,
    pub goal_order: u8,
}

impl GoalUpsert {
    pub fn new(goal_date: NaiveDate, goal_order: u8, goal_text: impl Into<String>) -> Self {
        Self {
            goal_date,
            goal_text: goal_text.into(),
            goal_order,
        }
    }

    fn validated(self) -> anyhow::Result<Self> {
        if !(1..=GOALS_PER_DAY).contains(&self.goal_order) {
            bail!("goal slot must be between 1 and {GOALS_PER_DAY}, got {}", self.goal_order);
        }
        let goal_text = self.goal_text.trim().to_string();
        if goal_text.is_empty() {
            bail!("goal text cannot be empty");
        }
        Ok(Self { goal_text, ..self })
    }
}

/// Applies `input` to `goals`. An existing goal in the same slot keeps its
/// id and completion and only takes the new text.
pub fn upsert_goal_in(goals: &mut Vec<DailyGoal>, input: GoalUpsert) -> anyhow::Result<DailyGoal> {
    let input = input.validated()?;

    let existing = goals
        .iter_mut()
        .find(|goal| goal.goal_date == input.goal_date && goal.goal_order == input.goal_order);
    if let Some(goal) = existing {
        goal.goal_text = input.goal_text;
        return Ok(goal.clone());
    }

    let goal = DailyGoal {
        id: Uuid::new_v4(),
        goal_date: input.goal_date,
        goal_text: input.goal_text,
        goal_order: input.goal_order,
        is_completed: false,
    };
    goals.push(goal.clone());
    Ok(goal)
}

pub fn goals_on(goals: &[DailyGoal], date: NaiveDate) -> Vec<DailyGoal> {
    let mut day: Vec<DailyGoal> = goals
        .iter()
        .filter(|goal| goal.goal_date == date)
        .cloned()
        .collect();
    day.sort_by_key(|goal| goal.goal_order);
    day
}
