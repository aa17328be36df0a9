use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::{format_clock, minute_of_day, parse_clock};

pub const DEFAULT_DURATION_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "m" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            other => Err(anyhow!("invalid priority: {other}")),
        }
    }
}

/// A task as the calendar sees it.
///
/// `scheduled_date` is always present; it only places the task on the time
/// grid when `scheduled_time` also parses as `HH:MM`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub scheduled_date: NaiveDate,

    #[serde(default)]
    pub scheduled_time: Option<String>,

    pub duration_minutes: u32,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub is_completed: bool,

    #[serde(default)]
    pub reminder_minutes: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, scheduled_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description: None,
            scheduled_date,
            scheduled_time: None,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            priority: Priority::Medium,
            color: None,
            is_completed: false,
            reminder_minutes: None,
            created_at: now,
        }
    }

    /// Parsed start time. A malformed stored value reads as unscheduled.
    pub fn start_time(&self) -> Option<NaiveTime> {
        self.scheduled_time.as_deref().and_then(parse_clock)
    }

    pub fn start_minute(&self) -> Option<u32> {
        self.start_time().map(minute_of_day)
    }

    pub fn is_scheduled(&self) -> bool {
        self.start_time().is_some()
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub reminder_minutes: Option<u32>,
}

impl TaskCreate {
    pub fn new(title: impl Into<String>, scheduled_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            description: None,
            scheduled_date,
            scheduled_time: None,
            duration_minutes: None,
            priority: None,
            color: None,
            reminder_minutes: None,
        }
    }

    pub fn into_task(self, now: DateTime<Utc>, default_duration: u32) -> anyhow::Result<Task> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            bail!("task title cannot be empty");
        }

        let mut task = Task::new(title, self.scheduled_date, now);
        task.description = self.description;
        task.scheduled_time = self
            .scheduled_time
            .as_deref()
            .map(normalize_clock)
            .transpose()?;
        task.duration_minutes = validate_duration(self.duration_minutes.unwrap_or(default_duration))?;
        task.priority = self.priority.unwrap_or_default();
        task.color = self.color;
        task.reminder_minutes = self.reminder_minutes;
        Ok(task)
    }
}

/// Partial update. `None` leaves a field untouched; the nested `Option`s
/// distinguish "set to nothing" from "leave alone".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub clear_scheduled_time: bool,
    pub duration_minutes: Option<u32>,
    pub priority: Option<Priority>,
    pub color: Option<Option<String>>,
    pub is_completed: Option<bool>,
    pub reminder_minutes: Option<Option<u32>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.scheduled_date.is_none()
            && self.scheduled_time.is_none()
            && !self.clear_scheduled_time
            && self.duration_minutes.is_none()
            && self.priority.is_none()
            && self.color.is_none()
            && self.is_completed.is_none()
            && self.reminder_minutes.is_none()
    }

    /// Applies the patch after validating every field, so a rejected patch
    /// leaves the task untouched.
    pub fn apply_to(self, task: &mut Task) -> anyhow::Result<()> {
        if self.is_empty() {
            bail!("no fields to update");
        }

        let title = match self.title {
            Some(title) => {
                let title = title.trim().to_string();
                if title.is_empty() {
                    bail!("task title cannot be empty");
                }
                Some(title)
            }
            None => None,
        };
        let scheduled_time = self.scheduled_time.as_deref().map(normalize_clock).transpose()?;
        let duration = self.duration_minutes.map(validate_duration).transpose()?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(date) = self.scheduled_date {
            task.scheduled_date = date;
        }
        if self.clear_scheduled_time {
            task.scheduled_time = None;
        } else if let Some(time) = scheduled_time {
            task.scheduled_time = Some(time);
        }
        if let Some(duration) = duration {
            task.duration_minutes = duration;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(color) = self.color {
            task.color = color;
        }
        if let Some(done) = self.is_completed {
            task.is_completed = done;
        }
        if let Some(reminder) = self.reminder_minutes {
            task.reminder_minutes = reminder;
        }
        Ok(())
    }
}

fn normalize_clock(raw: &str) -> anyhow::Result<String> {
    parse_clock(raw)
        .map(format_clock)
        .ok_or_else(|| anyhow!("invalid time (expected HH:MM): {raw}"))
}

fn validate_duration(minutes: u32) -> anyhow::Result<u32> {
    if minutes == 0 {
        bail!("duration must be at least one minute");
    }
    Ok(minutes)
}
