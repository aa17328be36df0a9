//! Minute-resolution reminders. A reminder fires once, on the minute that
//! lies `reminder_minutes` before the task's start, and is then cleared.

use chrono::{Duration, NaiveDateTime, Timelike};
use tracing::{info, instrument};

use crate::datetime::add_days;
use crate::store::TaskStore;
use crate::task::{Task, TaskPatch};

/// How far ahead of `now` tasks are scanned for reminders.
pub const REMINDER_LOOKAHEAD_DAYS: i64 = 7;

/// Wall-clock minute the reminder of `task` fires at.
pub fn reminder_at(task: &Task) -> Option<NaiveDateTime> {
    let lead = task.reminder_minutes?;
    let start = task.scheduled_date.and_time(task.start_time()?);
    Some(start - Duration::minutes(i64::from(lead)))
}

pub fn is_due(task: &Task, now: NaiveDateTime) -> bool {
    if task.is_completed {
        return false;
    }
    reminder_at(task).is_some_and(|at| at == truncate_to_minute(now))
}

pub fn due_reminders(tasks: &[Task], now: NaiveDateTime) -> Vec<&Task> {
    tasks.iter().filter(|task| is_due(task, now)).collect()
}

/// Returns the tasks whose reminder fires at `now`, clearing each one so it
/// does not fire again.
#[instrument(skip(store))]
pub fn fire_due<S: TaskStore>(store: &mut S, now: NaiveDateTime) -> anyhow::Result<Vec<Task>> {
    let today = now.date();
    let tasks = store.list_tasks(today, add_days(today, REMINDER_LOOKAHEAD_DAYS))?;

    let mut fired = Vec::new();
    for task in due_reminders(&tasks, now) {
        let cleared = store.update_task(
            task.id,
            TaskPatch {
                reminder_minutes: Some(None),
                ..TaskPatch::default()
            },
        )?;
        info!(task = %task.id, title = %task.title, "reminder fired");
        fired.push(Task {
            reminder_minutes: task.reminder_minutes,
            ..cleared
        });
    }
    Ok(fired)
}

fn truncate_to_minute(at: NaiveDateTime) -> NaiveDateTime {
    at.with_second(0)
        .and_then(|at| at.with_nanosecond(0))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::store::MemoryStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    fn at(d: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        date(d).and_hms_opt(hour, minute, second).expect("valid time")
    }

    fn task(d: u32, time: Option<&str>, reminder: Option<u32>) -> Task {
        let mut task = Task::new("dentist".to_string(), date(d), Utc::now());
        task.scheduled_time = time.map(str::to_string);
        task.reminder_minutes = reminder;
        task
    }

    #[test]
    fn due_exactly_at_lead_minute() {
        let t = task(1, Some("09:30"), Some(15));
        assert_eq!(reminder_at(&t), Some(at(1, 9, 15, 0)));
        assert!(is_due(&t, at(1, 9, 15, 42)));
        assert!(!is_due(&t, at(1, 9, 14, 59)));
        assert!(!is_due(&t, at(1, 9, 16, 0)));
    }

    #[test]
    fn lead_can_cross_midnight() {
        let t = task(2, Some("00:10"), Some(30));
        assert!(is_due(&t, at(1, 23, 40, 0)));
    }

    #[test]
    fn skips_completed_untimed_and_reminderless() {
        let mut done = task(1, Some("09:30"), Some(0));
        done.is_completed = true;
        let tasks = vec![
            done,
            task(1, None, Some(0)),
            task(1, Some("bogus"), Some(0)),
            task(1, Some("09:30"), None),
            task(1, Some("09:30"), Some(0)),
        ];
        let due = due_reminders(&tasks, at(1, 9, 30, 0));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, tasks[4].id);
    }

    #[test]
    fn firing_clears_the_reminder() {
        let t = task(2, Some("00:10"), Some(30));
        let id = t.id;
        let mut store = MemoryStore::with_tasks(vec![t, task(1, Some("10:00"), Some(5))]);

        let fired = fire_due(&mut store, at(1, 23, 40, 5)).expect("fire");
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, id);
        assert_eq!(fired[0].reminder_minutes, Some(30));

        let stored = store.get_task(id).expect("read").expect("exists");
        assert_eq!(stored.reminder_minutes, None);
        assert!(fire_due(&mut store, at(1, 23, 40, 30)).expect("fire").is_empty());
    }
}
