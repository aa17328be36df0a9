//! Turns a finished gesture into at most one schedule change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::datetime::{clock_label, format_clock};
use crate::geometry::{GridSlot, resized_duration};
use crate::task::{Task, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    Move,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DropTarget {
    TimeSlot(GridSlot),
    Unscheduled { date: NaiveDate },
}

impl DropTarget {
    pub fn time_slot(&self) -> Option<GridSlot> {
        match self {
            Self::TimeSlot(slot) => Some(*slot),
            Self::Unscheduled { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleChange {
    /// At least one of the two fields is set.
    Reschedule {
        time: Option<String>,
        date: Option<NaiveDate>,
    },
    Unschedule,
    Resize {
        duration_minutes: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleMutation {
    pub task_id: Uuid,
    pub change: ScheduleChange,
}

impl ScheduleMutation {
    pub fn to_patch(&self) -> TaskPatch {
        match &self.change {
            ScheduleChange::Reschedule { time, date } => TaskPatch {
                scheduled_time: time.clone(),
                scheduled_date: *date,
                ..TaskPatch::default()
            },
            ScheduleChange::Unschedule => TaskPatch {
                clear_scheduled_time: true,
                ..TaskPatch::default()
            },
            ScheduleChange::Resize { duration_minutes } => TaskPatch {
                duration_minutes: Some(*duration_minutes),
                ..TaskPatch::default()
            },
        }
    }
}

pub fn resolve(task: &Task, kind: DragKind, target: Option<DropTarget>) -> Option<ScheduleMutation> {
    let Some(target) = target else {
        trace!(task = %task.id, "released outside any drop target");
        return None;
    };

    let change = match (kind, target) {
        (DragKind::Move, DropTarget::TimeSlot(slot)) => reschedule(task, &slot),
        (DragKind::Move, DropTarget::Unscheduled { .. }) => {
            task.is_scheduled().then_some(ScheduleChange::Unschedule)
        }
        (DragKind::Resize, DropTarget::TimeSlot(slot)) => resize(task, &slot),
        (DragKind::Resize, DropTarget::Unscheduled { .. }) => None,
    }?;

    Some(ScheduleMutation {
        task_id: task.id,
        change,
    })
}

fn reschedule(task: &Task, slot: &GridSlot) -> Option<ScheduleChange> {
    let new_time = clock_label(slot.hour, slot.minutes);
    let current_time = task.start_time().map(format_clock);

    let time = (current_time.as_deref() != Some(new_time.as_str())).then_some(new_time);
    let date = (task.scheduled_date != slot.date).then_some(slot.date);

    if time.is_none() && date.is_none() {
        return None;
    }
    Some(ScheduleChange::Reschedule { time, date })
}

fn resize(task: &Task, slot: &GridSlot) -> Option<ScheduleChange> {
    let start = task.start_minute()?;
    let duration_minutes = resized_duration(start, slot);
    (duration_minutes != task.duration_minutes).then_some(ScheduleChange::Resize { duration_minutes })
}
