use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::goal::{DailyGoal, GoalUpsert, goals_on, upsert_goal_in};
use crate::journal::{EntryUpsert, JournalEntry, entry_on, upsert_entry_in};
use crate::store::{GoalStore, JournalStore, TaskStore, in_range, schedule_order};
use crate::task::{DEFAULT_DURATION_MINUTES, Task, TaskCreate, TaskPatch};

/// JSON-lines files for tasks, goals and journal entries, each rewritten
/// atomically on every change.
#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub goals_path: PathBuf,
    pub journal_path: PathBuf,
    default_duration: u32,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        let goals_path = data_dir.join("goals.data");
        let journal_path = data_dir.join("journal.data");
        for path in [&tasks_path, &goals_path, &journal_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            goals = %goals_path.display(),
            journal = %journal_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            goals_path,
            journal_path,
            default_duration: DEFAULT_DURATION_MINUTES,
        })
    }

    pub fn with_default_duration(mut self, minutes: u32) -> Self {
        self.default_duration = minutes.max(1);
        self
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save_tasks(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_goals(&self) -> anyhow::Result<Vec<DailyGoal>> {
        load_jsonl(&self.goals_path).context("failed to load goals.data")
    }

    #[tracing::instrument(skip(self, goals))]
    pub fn save_goals(&self, goals: &[DailyGoal]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.goals_path, goals).context("failed to save goals.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_entries(&self) -> anyhow::Result<Vec<JournalEntry>> {
        load_jsonl(&self.journal_path).context("failed to load journal.data")
    }

    #[tracing::instrument(skip(self, entries))]
    pub fn save_entries(&self, entries: &[JournalEntry]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.journal_path, entries).context("failed to save journal.data")
    }

    fn modify<F>(&self, id: Uuid, change: F) -> anyhow::Result<Task>
    where
        F: FnOnce(&mut Task) -> anyhow::Result<()>,
    {
        let mut tasks = self.load_tasks()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("task not found: {id}"))?;
        change(task)?;
        let updated = task.clone();
        self.save_tasks(&tasks)?;
        Ok(updated)
    }
}

impl TaskStore for DataStore {
    #[tracing::instrument(skip(self))]
    fn list_tasks(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .load_tasks()?
            .into_iter()
            .filter(|task| in_range(task, start, end))
            .collect();
        tasks.sort_by(schedule_order);
        debug!(count = tasks.len(), "range query");
        Ok(tasks)
    }

    fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        Ok(self.load_tasks()?.into_iter().find(|task| task.id == id))
    }

    #[tracing::instrument(skip(self, input), fields(title = %input.title))]
    fn create_task(&mut self, input: TaskCreate) -> anyhow::Result<Task> {
        let task = input.into_task(Utc::now(), self.default_duration)?;
        let mut tasks = self.load_tasks()?;
        tasks.push(task.clone());
        self.save_tasks(&tasks)?;
        info!(id = %task.id, date = %task.scheduled_date, "created task");
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch))]
    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> anyhow::Result<Task> {
        self.modify(id, |task| patch.apply_to(task))
    }

    #[tracing::instrument(skip(self))]
    fn delete_task(&mut self, id: Uuid) -> anyhow::Result<()> {
        let tasks = self.load_tasks()?;
        let before = tasks.len();
        let kept: Vec<Task> = tasks.into_iter().filter(|task| task.id != id).collect();
        if kept.len() == before {
            return Err(anyhow!("task not found: {id}"));
        }
        self.save_tasks(&kept)
    }

    #[tracing::instrument(skip(self))]
    fn toggle_completion(&mut self, id: Uuid) -> anyhow::Result<Task> {
        self.modify(id, |task| {
            task.is_completed = !task.is_completed;
            Ok(())
        })
    }
}

impl GoalStore for DataStore {
    fn goals_for_date(&self, date: NaiveDate) -> anyhow::Result<Vec<DailyGoal>> {
        Ok(goals_on(&self.load_goals()?, date))
    }

    #[tracing::instrument(skip(self, input), fields(date = %input.goal_date, order = input.goal_order))]
    fn upsert_goal(&mut self, input: GoalUpsert) -> anyhow::Result<DailyGoal> {
        let mut goals = self.load_goals()?;
        let goal = upsert_goal_in(&mut goals, input)?;
        self.save_goals(&goals)?;
        info!(id = %goal.id, date = %goal.goal_date, "saved goal");
        Ok(goal)
    }

    #[tracing::instrument(skip(self))]
    fn toggle_goal(&mut self, id: Uuid) -> anyhow::Result<DailyGoal> {
        let mut goals = self.load_goals()?;
        let goal = goals
            .iter_mut()
            .find(|goal| goal.id == id)
            .ok_or_else(|| anyhow!("goal not found: {id}"))?;
        goal.is_completed = !goal.is_completed;
        let updated = goal.clone();
        self.save_goals(&goals)?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    fn delete_goal(&mut self, id: Uuid) -> anyhow::Result<()> {
        let goals = self.load_goals()?;
        let before = goals.len();
        let kept: Vec<DailyGoal> = goals.into_iter().filter(|goal| goal.id != id).collect();
        if kept.len() == before {
            return Err(anyhow!("goal not found: {id}"));
        }
        self.save_goals(&kept)
    }
}

impl JournalStore for DataStore {
    fn entry_for_date(&self, date: NaiveDate) -> anyhow::Result<Option<JournalEntry>> {
        Ok(entry_on(&self.load_entries()?, date))
    }

    #[tracing::instrument(skip(self, input), fields(date = %input.entry_date))]
    fn upsert_entry(&mut self, input: EntryUpsert) -> anyhow::Result<JournalEntry> {
        let mut entries = self.load_entries()?;
        let entry = upsert_entry_in(&mut entries, input)?;
        self.save_entries(&entries)?;
        info!(id = %entry.id, date = %entry.entry_date, "saved journal entry");
        Ok(entry)
    }

    #[tracing::instrument(skip(self))]
    fn delete_entry(&mut self, id: Uuid) -> anyhow::Result<()> {
        let entries = self.load_entries()?;
        let before = entries.len();
        let kept: Vec<JournalEntry> = entries.into_iter().filter(|entry| entry.id != id).collect();
        if kept.len() == before {
            return Err(anyhow!("journal entry not found: {id}"));
        }
        self.save_entries(&kept)
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
