use std::cmp::Ordering;

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::goal::{DailyGoal, GoalUpsert, goals_on, upsert_goal_in};
use crate::journal::{EntryUpsert, JournalEntry, entry_on, upsert_entry_in};
use crate::task::{DEFAULT_DURATION_MINUTES, Task, TaskCreate, TaskPatch};

/// Data-access capability the calendar core works against.
pub trait TaskStore {
    /// Tasks whose `scheduled_date` lies in `start..=end`, ordered by date
    /// then time, untimed tasks first within a day.
    fn list_tasks(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<Task>>;

    fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>>;

    fn create_task(&mut self, input: TaskCreate) -> anyhow::Result<Task>;

    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> anyhow::Result<Task>;

    fn delete_task(&mut self, id: Uuid) -> anyhow::Result<()>;

    fn toggle_completion(&mut self, id: Uuid) -> anyhow::Result<Task>;
}

/// Per-day goal checklist.
pub trait GoalStore {
    /// Goals of `date` in slot order.
    fn goals_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<DailyGoal>>;

    fn upsert_goal(&mut self, input: GoalUpsert) -> anyhow::Result<DailyGoal>;

    fn toggle_goal(&mut self, id: Uuid) -> anyhow::Result<DailyGoal>;

    fn delete_goal(&mut self, id: Uuid) -> anyhow::Result<()>;
}

/// One journal entry per day.
pub trait JournalStore {
    fn entry_for_date(&self, date: NaiveDate) -> anyhow::Result<Option<JournalEntry>>;

    fn upsert_entry(&mut self, input: EntryUpsert) -> anyhow::Result<JournalEntry>;

    fn delete_entry(&mut self, id: Uuid) -> anyhow::Result<()>;
}

impl<T: TaskStore + ?Sized> TaskStore for &mut T {
    fn list_tasks(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<Task>> {
        (**self).list_tasks(start, end)
    }

    fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        (**self).get_task(id)
    }

    fn create_task(&mut self, input: TaskCreate) -> anyhow::Result<Task> {
        (**self).create_task(input)
    }

    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> anyhow::Result<Task> {
        (**self).update_task(id, patch)
    }

    fn delete_task(&mut self, id: Uuid) -> anyhow::Result<()> {
        (**self).delete_task(id)
    }

    fn toggle_completion(&mut self, id: Uuid) -> anyhow::Result<Task> {
        (**self).toggle_completion(id)
    }
}

pub fn schedule_order(a: &Task, b: &Task) -> Ordering {
    a.scheduled_date
        .cmp(&b.scheduled_date)
        .then_with(|| a.start_time().cmp(&b.start_time()))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

pub fn in_range(task: &Task, start: NaiveDate, end: NaiveDate) -> bool {
    task.scheduled_date >= start && task.scheduled_date <= end
}

pub fn find_by_prefix<'a>(tasks: &'a [Task], prefix: &str) -> anyhow::Result<&'a Task> {
    let needle = prefix.trim().to_ascii_lowercase().replace('-', "");
    if needle.is_empty() {
        return Err(anyhow!("task id cannot be empty"));
    }

    let mut matches = tasks
        .iter()
        .filter(|task| task.id.simple().to_string().starts_with(&needle));
    let first = matches
        .next()
        .ok_or_else(|| anyhow!("no task matches id {prefix}"))?;
    if matches.next().is_some() {
        return Err(anyhow!("task id {prefix} is ambiguous"));
    }
    Ok(first)
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    tasks: Vec<Task>,
    goals: Vec<DailyGoal>,
    entries: Vec<JournalEntry>,
    default_duration: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MINUTES)
    }
}

impl MemoryStore {
    pub fn new(default_duration: u32) -> Self {
        Self {
            tasks: Vec::new(),
            goals: Vec::new(),
            entries: Vec::new(),
            default_duration,
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            goals: Vec::new(),
            entries: Vec::new(),
            default_duration: DEFAULT_DURATION_MINUTES,
        }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    fn position(&self, id: Uuid) -> anyhow::Result<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))
    }
}

impl TaskStore for MemoryStore {
    fn list_tasks(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .iter()
            .filter(|task| in_range(task, start, end))
            .cloned()
            .collect();
        tasks.sort_by(schedule_order);
        Ok(tasks)
    }

    fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        Ok(self.tasks.iter().find(|task| task.id == id).cloned())
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    fn create_task(&mut self, input: TaskCreate) -> anyhow::Result<Task> {
        let task = input.into_task(Utc::now(), self.default_duration)?;
        self.tasks.push(task.clone());
        debug!(id = %task.id, "created task in memory");
        Ok(task)
    }

    #[instrument(skip(self, patch))]
    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> anyhow::Result<Task> {
        let idx = self.position(id)?;
        let task = &mut self.tasks[idx];
        patch.apply_to(task)?;
        Ok(task.clone())
    }

    #[instrument(skip(self))]
    fn delete_task(&mut self, id: Uuid) -> anyhow::Result<()> {
        let idx = self.position(id)?;
        self.tasks.remove(idx);
        Ok(())
    }

    #[instrument(skip(self))]
    fn toggle_completion(&mut self, id: Uuid) -> anyhow::Result<Task> {
        let idx = self.position(id)?;
        let task = &mut self.tasks[idx];
        task.is_completed = !task.is_completed;
        Ok(task.clone())
    }
}

impl GoalStore for MemoryStore {
    fn goals_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<DailyGoal>> {
        Ok(goals_on(&self.goals, date))
    }

    #[instrument(skip(self, input), fields(date = %input.goal_date, order = input.goal_order))]
    fn upsert_goal(&mut self, input: GoalUpsert) -> anyhow::Result<DailyGoal> {
        upsert_goal_in(&mut self.goals, input)
    }

    #[instrument(skip(self))]
    fn toggle_goal(&mut self, id: Uuid) -> anyhow::Result<DailyGoal> {
        let goal = self
            .goals
            .iter_mut()
            .find(|goal| goal.id == id)
            .ok_or_else(|| anyhow!("goal not found: {id}"))?;
        goal.is_completed = !goal.is_completed;
        Ok(goal.clone())
    }

    #[instrument(skip(self))]
    fn delete_goal(&mut self, id: Uuid) -> anyhow::Result<()> {
        let before = self.goals.len();
        self.goals.retain(|goal| goal.id != id);
        if self.goals.len() == before {
            return Err(anyhow!("goal not found: {id}"));
        }
        Ok(())
    }
}

impl JournalStore for MemoryStore {
    fn entry_for_date(&self, date: NaiveDate) -> anyhow::Result<Option<JournalEntry>> {
        Ok(entry_on(&self.entries, date))
    }

    #[instrument(skip(self, input), fields(date = %input.entry_date))]
    fn upsert_entry(&mut self, input: EntryUpsert) -> anyhow::Result<JournalEntry> {
        upsert_entry_in(&mut self.entries, input)
    }

    #[instrument(skip(self))]
    fn delete_entry(&mut self, id: Uuid) -> anyhow::Result<()> {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        if self.entries.len() == before {
            return Err(anyhow!("journal entry not found: {id}"));
        }
        Ok(())
    }
}
