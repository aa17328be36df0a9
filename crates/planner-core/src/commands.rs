use std::io::Write;

use anyhow::{Context, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::app_state::{AppAction, CalendarView};
use crate::cli::{AddArgs, Command, EditArgs, GoalCommand, JournalCommand};
use crate::config::Config;
use crate::datetime::{format_date, minute_of_day, parse_clock, parse_date, parse_date_clock};
use crate::geometry::GridSlot;
use crate::gesture::GestureOutcome;
use crate::goal::{DailyGoal, GoalUpsert};
use crate::journal::EntryUpsert;
use crate::reminders::fire_due;
use crate::render::Renderer;
use crate::resolver::{DropTarget, ScheduleChange};
use crate::session::{CalendarSession, GestureStep};
use crate::store::{GoalStore, JournalStore, TaskStore, find_by_prefix};
use crate::task::{Task, TaskCreate, TaskPatch};

#[instrument(skip(store, cfg, renderer, out, command))]
pub fn dispatch<S, W>(
    store: &mut S,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
    now: NaiveDateTime,
) -> anyhow::Result<()>
where
    S: TaskStore + GoalStore + JournalStore,
    W: Write,
{
    debug!(?command, "dispatching command");
    let today = now.date();

    match command {
        Command::Add(args) => cmd_add(store, out, args, today),
        Command::List { from, to } => cmd_list(store, renderer, out, from, to, today),
        Command::Info { id } => cmd_info(store, renderer, out, &id),
        Command::Edit(args) => cmd_edit(store, out, args),
        Command::Done { id } => cmd_done(store, out, &id),
        Command::Delete { id } => cmd_delete(store, out, &id),
        Command::Drag { id, to } => cmd_drag(store, cfg, out, &id, &to, today),
        Command::Resize { id, until, date } => cmd_resize(store, cfg, out, &id, &until, date, today),
        Command::View { view, date } => cmd_view(store, cfg, renderer, out, view.into(), date, today),
        Command::Remind { at } => cmd_remind(store, renderer, out, at, now),
        Command::Goal { action } => cmd_goal(store, renderer, out, action, today),
        Command::Journal { action } => cmd_journal(store, renderer, out, action, today),
    }
}

/// Looks a task up by full id or unique id prefix.
pub fn resolve_task<S: TaskStore>(store: &S, prefix: &str) -> anyhow::Result<Task> {
    let all = store.list_tasks(NaiveDate::MIN, NaiveDate::MAX)?;
    find_by_prefix(&all, prefix).cloned()
}

fn cmd_add<S: TaskStore, W: Write>(
    store: &mut S,
    out: &mut W,
    args: AddArgs,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command add");
    let scheduled_date = args.date.as_deref().map(parse_date).transpose()?.unwrap_or(today);

    let task = store.create_task(TaskCreate {
        title: args.title,
        description: args.description,
        scheduled_date,
        scheduled_time: args.time,
        duration_minutes: args.duration,
        priority: args.priority,
        color: args.color,
        reminder_minutes: args.reminder,
    })?;

    writeln!(out, "Created task {}.", task.short_id())?;
    Ok(())
}

fn cmd_list<S: TaskStore, W: Write>(
    store: &S,
    renderer: &Renderer,
    out: &mut W,
    from: Option<String>,
    to: Option<String>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");
    let start = from.as_deref().map(parse_date).transpose()?.unwrap_or(today);
    let end = to.as_deref().map(parse_date).transpose()?.unwrap_or(start);
    if end < start {
        bail!("--to ({}) is before --from ({})", format_date(end), format_date(start));
    }

    let tasks = store.list_tasks(start, end)?;
    if tasks.is_empty() {
        writeln!(out, "No tasks.")?;
        return Ok(());
    }
    renderer.task_table(out, &tasks)
}

fn cmd_info<S: TaskStore, W: Write>(
    store: &S,
    renderer: &Renderer,
    out: &mut W,
    id: &str,
) -> anyhow::Result<()> {
    info!("command info");
    let task = resolve_task(store, id)?;
    renderer.task_info(out, &task)
}

fn cmd_edit<S: TaskStore, W: Write>(store: &mut S, out: &mut W, args: EditArgs) -> anyhow::Result<()> {
    info!("command edit");
    let task = resolve_task(store, &args.id)?;

    let patch = TaskPatch {
        title: args.title,
        description: if args.no_description {
            Some(None)
        } else {
            args.description.map(Some)
        },
        scheduled_date: args.date.as_deref().map(parse_date).transpose()?,
        scheduled_time: args.time,
        clear_scheduled_time: args.clear_time,
        duration_minutes: args.duration,
        priority: args.priority,
        color: if args.no_color { Some(None) } else { args.color.map(Some) },
        is_completed: None,
        reminder_minutes: if args.no_remind {
            Some(None)
        } else {
            args.reminder.map(Some)
        },
    };

    let updated = store
        .update_task(task.id, patch)
        .with_context(|| format!("failed to edit task {}", task.short_id()))?;
    writeln!(out, "Modified task {}.", updated.short_id())?;
    Ok(())
}

fn cmd_done<S: TaskStore, W: Write>(store: &mut S, out: &mut W, id: &str) -> anyhow::Result<()> {
    info!("command done");
    let task = resolve_task(store, id)?;
    let updated = store.toggle_completion(task.id)?;
    let state = if updated.is_completed { "done" } else { "not done" };
    writeln!(out, "Marked task {} {state}.", updated.short_id())?;
    Ok(())
}

fn cmd_delete<S: TaskStore, W: Write>(store: &mut S, out: &mut W, id: &str) -> anyhow::Result<()> {
    info!("command delete");
    let task = resolve_task(store, id)?;
    store.delete_task(task.id)?;
    writeln!(out, "Deleted task {}.", task.short_id())?;
    Ok(())
}

fn cmd_drag<S: TaskStore, W: Write>(
    store: &mut S,
    cfg: &Config,
    out: &mut W,
    id: &str,
    to: &str,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command drag");
    let task = resolve_task(store, id)?;

    let target = if to.trim().eq_ignore_ascii_case("unscheduled") {
        DropTarget::Unscheduled {
            date: task.scheduled_date,
        }
    } else {
        let at = parse_date_clock(to)?;
        DropTarget::TimeSlot(visible_slot(cfg, at.date(), minute_of_day(at.time()))?)
    };

    let mut session = CalendarSession::new(&mut *store, cfg, today);
    let step = session.drag_task(task.id, target)?;
    report_step(out, &task, step)
}

fn cmd_resize<S: TaskStore, W: Write>(
    store: &mut S,
    cfg: &Config,
    out: &mut W,
    id: &str,
    until: &str,
    date: Option<String>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command resize");
    let task = resolve_task(store, id)?;
    if !task.is_scheduled() {
        warn!(task = %task.id, "resize of a task without a start time has no effect");
    }

    let end = parse_clock(until).ok_or_else(|| anyhow!("invalid time (expected HH:MM): {until}"))?;
    let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(task.scheduled_date);
    // The hovered quarter is the one ending at or after `until`.
    let slot = visible_slot(cfg, date, minute_of_day(end).saturating_sub(1))?;

    let mut session = CalendarSession::new(&mut *store, cfg, today);
    let step = session.resize_task(task.id, slot)?;
    report_step(out, &task, step)
}

fn cmd_view<S: TaskStore, W: Write>(
    store: &mut S,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    view: CalendarView,
    date: Option<String>,
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!(view = view.as_key(), "command view");
    let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);

    let mut session = CalendarSession::new(&mut *store, cfg, today);
    session.dispatch_all([AppAction::SetView(view), AppAction::SelectDate(date)]);

    match view {
        CalendarView::Day => renderer.day(out, &session.day_layout()?),
        CalendarView::Week => renderer.week(out, &session.week_layout()?),
        CalendarView::Month => renderer.month(out, &session.month_layout()?),
    }
}

fn cmd_remind<S: TaskStore, W: Write>(
    store: &mut S,
    renderer: &Renderer,
    out: &mut W,
    at: Option<String>,
    now: NaiveDateTime,
) -> anyhow::Result<()> {
    info!("command remind");
    let at = at.as_deref().map(parse_date_clock).transpose()?.unwrap_or(now);

    let fired = fire_due(store, at)?;
    if fired.is_empty() {
        writeln!(out, "No reminders due.")?;
        return Ok(());
    }
    renderer.reminders(out, &fired)
}

fn cmd_goal<S: GoalStore, W: Write>(
    store: &mut S,
    renderer: &Renderer,
    out: &mut W,
    action: GoalCommand,
    today: NaiveDate,
) -> anyhow::Result<()> {
    match action {
        GoalCommand::List { date } => {
            info!("command goal list");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let goals = store.goals_for_date(date)?;
            renderer.goals(out, date, &goals)
        }
        GoalCommand::Set { slot, text, date } => {
            info!("command goal set");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let goal = store.upsert_goal(GoalUpsert::new(date, slot, text))?;
            writeln!(out, "Set goal {} for {}.", goal.goal_order, format_date(goal.goal_date))?;
            Ok(())
        }
        GoalCommand::Toggle { slot, date } => {
            info!("command goal toggle");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let goal = goal_in_slot(store, date, slot)?;
            let updated = store.toggle_goal(goal.id)?;
            let state = if updated.is_completed { "done" } else { "not done" };
            writeln!(out, "Marked goal {slot} {state}.")?;
            Ok(())
        }
        GoalCommand::Delete { slot, date } => {
            info!("command goal delete");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let goal = goal_in_slot(store, date, slot)?;
            store.delete_goal(goal.id)?;
            writeln!(out, "Deleted goal {slot} for {}.", format_date(date))?;
            Ok(())
        }
    }
}

fn goal_in_slot<S: GoalStore>(store: &S, date: NaiveDate, slot: u8) -> anyhow::Result<DailyGoal> {
    store
        .goals_for_date(date)?
        .into_iter()
        .find(|goal| goal.goal_order == slot)
        .ok_or_else(|| anyhow!("no goal in slot {slot} on {}", format_date(date)))
}

fn cmd_journal<S: JournalStore, W: Write>(
    store: &mut S,
    renderer: &Renderer,
    out: &mut W,
    action: JournalCommand,
    today: NaiveDate,
) -> anyhow::Result<()> {
    match action {
        JournalCommand::Show { date } => {
            info!("command journal show");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let entry = store.entry_for_date(date)?;
            renderer.journal(out, date, entry.as_ref())
        }
        JournalCommand::Write { text, mood, date } => {
            info!("command journal write");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let entry = store.upsert_entry(EntryUpsert::new(date, text.unwrap_or_default(), mood))?;
            writeln!(out, "Saved journal entry for {}.", format_date(entry.entry_date))?;
            Ok(())
        }
        JournalCommand::Delete { date } => {
            info!("command journal delete");
            let date = date.as_deref().map(parse_date).transpose()?.unwrap_or(today);
            let entry = store
                .entry_for_date(date)?
                .ok_or_else(|| anyhow!("no journal entry on {}", format_date(date)))?;
            store.delete_entry(entry.id)?;
            writeln!(out, "Deleted journal entry for {}.", format_date(date))?;
            Ok(())
        }
    }
}

/// Grid slot the pointer would be over at `minute` of `date`, provided the
/// day grid shows that hour.
fn visible_slot(cfg: &Config, date: NaiveDate, minute: u32) -> anyhow::Result<GridSlot> {
    let metrics = cfg.day_metrics();
    let slot = GridSlot::containing(date, minute).ok_or_else(|| anyhow!("invalid time of day"))?;
    if !metrics.contains_hour(slot.hour) {
        bail!(
            "{} is outside the visible hours {:02}:00-{:02}:59",
            slot.time_label(),
            metrics.start_hour,
            metrics.end_hour
        );
    }
    Ok(slot)
}

fn report_step<W: Write>(out: &mut W, task: &Task, step: GestureStep) -> anyhow::Result<()> {
    let GestureOutcome::Released { mutation, .. } = step.outcome else {
        bail!("gesture on task {} did not complete", task.short_id());
    };

    let Some(mutation) = mutation else {
        writeln!(out, "No change to task {}.", task.short_id())?;
        return Ok(());
    };
    let Some(updated) = step.committed else {
        return Err(anyhow!("schedule change for task {} was not saved", task.short_id()));
    };

    match mutation.change {
        ScheduleChange::Reschedule { .. } => writeln!(
            out,
            "Moved task {} to {} {}.",
            updated.short_id(),
            format_date(updated.scheduled_date),
            updated.scheduled_time.as_deref().unwrap_or_default()
        )?,
        ScheduleChange::Unschedule => writeln!(
            out,
            "Unscheduled task {} on {}.",
            updated.short_id(),
            format_date(updated.scheduled_date)
        )?,
        ScheduleChange::Resize { duration_minutes } => writeln!(
            out,
            "Resized task {} to {duration_minutes}min.",
            updated.short_id()
        )?,
    }
    Ok(())
}
