//! Calendar session: the glue between pointer gestures, the resolver and
//! the task store.
//!
//! The session owns the only [`GestureMachine`]. Renderers get a read-only
//! [`DragState`] through the layouts it builds. A completed gesture commits
//! at most one mutation, after the machine is already back to idle. A
//! failing store write is logged and left for the next range query to
//! reconcile.

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app_state::{AppAction, AppState};
use crate::config::Config;
use crate::datetime::{add_days, month_grid_range, start_of_week};
use crate::geometry::{GridMetrics, GridSlot};
use crate::gesture::{DragState, GestureEvent, GestureMachine, GestureOutcome, GrabRegion, PointerPosition};
use crate::resolver::DropTarget;
use crate::store::TaskStore;
use crate::task::Task;
use crate::views::day::DayLayout;
use crate::views::month::MonthLayout;
use crate::views::week::WeekLayout;

/// Horizontal distance between day columns used by scripted gestures.
const SCRIPTED_COLUMN_WIDTH_PX: f64 = 120.0;

/// Pointer offset used for the unscheduled strip above a day column.
const UNSCHEDULED_STRIP_OFFSET_PX: f64 = -10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GestureStep {
    pub outcome: GestureOutcome,
    /// Task as stored after a committed mutation.
    pub committed: Option<Task>,
}

#[derive(Debug)]
pub struct CalendarSession<S: TaskStore> {
    store: S,
    app: AppState,
    gestures: GestureMachine,
    today: NaiveDate,
    day_metrics: GridMetrics,
    week_metrics: GridMetrics,
    max_visible_tasks: usize,
}

impl<S: TaskStore> CalendarSession<S> {
    pub fn new(store: S, cfg: &Config, today: NaiveDate) -> Self {
        Self {
            store,
            app: AppState::new(today, cfg.week_start()),
            gestures: GestureMachine::new(cfg.gesture.activation_distance_px),
            today,
            day_metrics: cfg.day_metrics(),
            week_metrics: cfg.week_metrics(),
            max_visible_tasks: cfg.month_view.max_visible_tasks,
        }
    }

    pub fn app(&self) -> &AppState {
        &self.app
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn drag_state(&self) -> &DragState {
        self.gestures.state()
    }

    pub fn dispatch(&mut self, action: AppAction) {
        debug!(?action, "dispatch");
        self.app = self.app.clone().reduce(action);
    }

    pub fn dispatch_all<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = AppAction>,
    {
        for action in actions {
            self.dispatch(action);
        }
    }

    /// Tasks for the range the current view shows.
    pub fn visible_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let (start, end) = self.app.visible_range();
        self.store.list_tasks(start, end)
    }

    pub fn day_layout(&self) -> anyhow::Result<DayLayout> {
        let date = self.app.selected_date;
        let tasks = self.store.list_tasks(date, date)?;
        Ok(DayLayout::build(date, &tasks, self.day_metrics, self.gestures.state()))
    }

    pub fn week_layout(&self) -> anyhow::Result<WeekLayout> {
        let start = start_of_week(self.app.selected_date, self.app.week_start);
        let tasks = self.store.list_tasks(start, add_days(start, 6))?;
        Ok(WeekLayout::build(
            self.app.selected_date,
            self.app.week_start,
            &tasks,
            self.week_metrics,
            self.gestures.state(),
        ))
    }

    pub fn month_layout(&self) -> anyhow::Result<MonthLayout> {
        let (start, end) = month_grid_range(self.app.selected_date, self.app.week_start);
        let tasks = self.store.list_tasks(start, end)?;
        Ok(MonthLayout::build(
            self.app.selected_date,
            self.today,
            self.app.week_start,
            &tasks,
            self.max_visible_tasks,
        ))
    }

    #[tracing::instrument(skip(self, event))]
    pub fn handle_gesture(&mut self, event: GestureEvent) -> GestureStep {
        let outcome = self.gestures.handle(event);
        let committed = match &outcome {
            GestureOutcome::Clicked(task) => {
                self.dispatch(AppAction::OpenEdit(task.clone()));
                None
            }
            GestureOutcome::Released {
                mutation: Some(mutation),
                ..
            } => match self.store.update_task(mutation.task_id, mutation.to_patch()) {
                Ok(task) => {
                    info!(task = %task.id, change = ?mutation.change, "schedule change committed");
                    Some(task)
                }
                Err(err) => {
                    warn!(task = %mutation.task_id, error = %format!("{err:#}"), "schedule change failed");
                    None
                }
            },
            _ => None,
        };
        GestureStep { outcome, committed }
    }

    /// Drags a task's body onto `target` the way a pointer would: press,
    /// travel past the activation distance, hover, release.
    #[tracing::instrument(skip(self))]
    pub fn drag_task(&mut self, id: Uuid, target: DropTarget) -> anyhow::Result<GestureStep> {
        self.scripted_gesture(id, GrabRegion::Body, target)
    }

    /// Drags a task's resize handle onto `slot`.
    #[tracing::instrument(skip(self))]
    pub fn resize_task(&mut self, id: Uuid, slot: GridSlot) -> anyhow::Result<GestureStep> {
        self.scripted_gesture(id, GrabRegion::ResizeHandle, DropTarget::TimeSlot(slot))
    }

    fn scripted_gesture(
        &mut self,
        id: Uuid,
        region: GrabRegion,
        target: DropTarget,
    ) -> anyhow::Result<GestureStep> {
        let task = self
            .store
            .get_task(id)?
            .ok_or_else(|| anyhow!("task not found: {id}"))?;

        let origin_layout = DayLayout::build(
            task.scheduled_date,
            std::slice::from_ref(&task),
            self.day_metrics,
            &DragState::default(),
        );
        let press_y = origin_layout
            .column
            .blocks
            .iter()
            .find(|block| block.task.id == task.id)
            .map(|block| match region {
                GrabRegion::Body => block.top_px,
                GrabRegion::ResizeHandle => block.bottom_px() - 1.0,
            })
            .unwrap_or(UNSCHEDULED_STRIP_OFFSET_PX);
        let press_at = PointerPosition::new(0.0, press_y);

        let (target_date, target_y) = match target {
            DropTarget::TimeSlot(slot) => (slot.date, self.day_metrics.slot_top_offset(slot.hour, slot.minutes)),
            DropTarget::Unscheduled { date } => (date, UNSCHEDULED_STRIP_OFFSET_PX),
        };
        let target_layout =
            DayLayout::build(target_date, &[], self.day_metrics, &DragState::default());
        let over = target_layout.target_at(target_y);
        let columns = (target_date - task.scheduled_date).num_days() as f64;
        let target_at = PointerPosition::new(columns * SCRIPTED_COLUMN_WIDTH_PX, target_y);

        self.handle_gesture(GestureEvent::Press {
            task,
            region,
            at: press_at,
        });

        // Always clear the activation distance, even when the target sits
        // right under the press point.
        let nudge = PointerPosition::new(press_at.x + SCRIPTED_COLUMN_WIDTH_PX, press_at.y);
        self.handle_gesture(GestureEvent::Motion {
            at: nudge,
            over: origin_layout.target_at(press_y),
        });
        self.handle_gesture(GestureEvent::Motion { at: target_at, over });

        Ok(self.handle_gesture(GestureEvent::Release { at: target_at, over }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::app_state::{CalendarView, TaskModal};
    use crate::resolver::{DragKind, ScheduleChange};
    use crate::store::MemoryStore;
    use crate::task::{TaskCreate, TaskPatch};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    fn slot(d: u32, hour: u32, minutes: u32) -> GridSlot {
        GridSlot::new(date(d), hour, minutes).expect("valid slot")
    }

    fn session_with(tasks: Vec<Task>) -> CalendarSession<MemoryStore> {
        CalendarSession::new(MemoryStore::with_tasks(tasks), &Config::default(), date(1))
    }

    fn scheduled(d: u32, time: &str, duration: u32) -> Task {
        let mut task = Task::new("write".to_string(), date(d), Utc::now());
        task.scheduled_time = Some(time.to_string());
        task.duration_minutes = duration;
        task
    }

    #[test]
    fn resize_commits_rounded_duration() {
        let task = scheduled(1, "09:00", 30);
        let id = task.id;
        let mut session = session_with(vec![task]);

        let step = session.resize_task(id, slot(1, 10, 0)).expect("gesture runs");
        assert!(matches!(
            step.outcome,
            GestureOutcome::Released {
                kind: DragKind::Resize,
                mutation: Some(_)
            }
        ));
        assert_eq!(step.committed.map(|t| t.duration_minutes), Some(75));
        assert!(session.drag_state().is_idle());

        let stored = session.store().get_task(id).expect("read").expect("exists");
        assert_eq!(stored.duration_minutes, 75);
        assert_eq!(stored.scheduled_time.as_deref(), Some("09:00"));
    }

    #[test]
    fn unscheduled_task_dropped_on_slot_gets_time() {
        let task = Task::new("call".to_string(), date(1), Utc::now());
        let id = task.id;
        let mut session = session_with(vec![task]);

        let step = session
            .drag_task(id, DropTarget::TimeSlot(slot(1, 14, 30)))
            .expect("gesture runs");
        let committed = step.committed.expect("mutation committed");
        assert_eq!(committed.scheduled_time.as_deref(), Some("14:30"));
        assert_eq!(committed.scheduled_date, date(1));
    }

    #[test]
    fn dropping_on_unscheduled_strip_clears_time_only() {
        let task = scheduled(2, "09:00", 45);
        let id = task.id;
        let mut session = session_with(vec![task]);

        let step = session
            .drag_task(id, DropTarget::Unscheduled { date: date(2) })
            .expect("gesture runs");
        match step.outcome {
            GestureOutcome::Released {
                mutation: Some(ref mutation),
                ..
            } => assert_eq!(mutation.change, ScheduleChange::Unschedule),
            ref other => panic!("unexpected outcome {other:?}"),
        }
        let stored = session.store().get_task(id).expect("read").expect("exists");
        assert_eq!(stored.scheduled_time, None);
        assert_eq!(stored.scheduled_date, date(2));
        assert_eq!(stored.duration_minutes, 45);
    }

    #[test]
    fn dropping_in_place_commits_nothing() {
        let task = scheduled(1, "09:00", 30);
        let id = task.id;
        let mut session = session_with(vec![task]);

        let step = session
            .drag_task(id, DropTarget::TimeSlot(slot(1, 9, 0)))
            .expect("gesture runs");
        assert_eq!(
            step.outcome,
            GestureOutcome::Released {
                kind: DragKind::Move,
                mutation: None
            }
        );
        assert_eq!(step.committed, None);
    }

    #[test]
    fn release_outside_targets_resets_without_mutation() {
        let task = scheduled(1, "09:00", 30);
        let mut session = session_with(vec![task.clone()]);

        session.handle_gesture(GestureEvent::Press {
            task: task.clone(),
            region: GrabRegion::Body,
            at: PointerPosition::new(0.0, 180.0),
        });
        session.handle_gesture(GestureEvent::Motion {
            at: PointerPosition::new(0.0, 260.0),
            over: Some(DropTarget::TimeSlot(slot(1, 10, 15))),
        });
        assert!(!session.drag_state().is_idle());
        session.handle_gesture(GestureEvent::Motion {
            at: PointerPosition::new(900.0, 260.0),
            over: None,
        });
        assert_eq!(session.drag_state().hover_slot, None);

        let step = session.handle_gesture(GestureEvent::Release {
            at: PointerPosition::new(900.0, 260.0),
            over: None,
        });
        assert_eq!(
            step.outcome,
            GestureOutcome::Released {
                kind: DragKind::Move,
                mutation: None
            }
        );
        assert!(session.drag_state().is_idle());
        let stored = session.store().get_task(task.id).expect("read").expect("exists");
        assert_eq!(stored, task);
    }

    #[test]
    fn click_opens_edit_modal() {
        let task = scheduled(1, "09:00", 30);
        let mut session = session_with(vec![task.clone()]);

        session.handle_gesture(GestureEvent::Press {
            task: task.clone(),
            region: GrabRegion::Body,
            at: PointerPosition::new(10.0, 190.0),
        });
        session.handle_gesture(GestureEvent::Motion {
            at: PointerPosition::new(12.0, 192.0),
            over: Some(DropTarget::TimeSlot(slot(1, 9, 0))),
        });
        assert!(session.drag_state().is_idle());

        let step = session.handle_gesture(GestureEvent::Release {
            at: PointerPosition::new(12.0, 192.0),
            over: Some(DropTarget::TimeSlot(slot(1, 9, 0))),
        });
        assert_eq!(step.outcome, GestureOutcome::Clicked(task.clone()));
        assert_eq!(session.app().modal, TaskModal::Edit { task });
    }

    #[test]
    fn failed_commit_still_leaves_machine_idle() {
        let task = scheduled(1, "09:00", 30);
        let mut session = session_with(vec![task.clone()]);

        session.handle_gesture(GestureEvent::Press {
            task: task.clone(),
            region: GrabRegion::Body,
            at: PointerPosition::new(0.0, 180.0),
        });
        session.handle_gesture(GestureEvent::Motion {
            at: PointerPosition::new(0.0, 300.0),
            over: Some(DropTarget::TimeSlot(slot(1, 11, 0))),
        });
        session.store_mut().delete_task(task.id).expect("delete");

        let step = session.handle_gesture(GestureEvent::Release {
            at: PointerPosition::new(0.0, 300.0),
            over: Some(DropTarget::TimeSlot(slot(1, 11, 0))),
        });
        assert!(matches!(step.outcome, GestureOutcome::Released { mutation: Some(_), .. }));
        assert_eq!(step.committed, None);
        assert!(session.drag_state().is_idle());
    }

    #[test]
    fn layouts_follow_navigation() {
        let mut session = session_with(vec![]);
        let created = session
            .store_mut()
            .create_task(TaskCreate {
                scheduled_time: Some("08:15".to_string()),
                ..TaskCreate::new("gym", date(3))
            })
            .expect("create");

        assert!(session.day_layout().expect("day").column.blocks.is_empty());

        session.dispatch_all([AppAction::SetView(CalendarView::Week)]);
        let week = session.week_layout().expect("week");
        assert_eq!(week.column(date(3)).map(|c| c.blocks.len()), Some(1));
        assert_eq!(session.visible_tasks().expect("visible").len(), 1);

        session.dispatch(AppAction::SetView(CalendarView::Month));
        let month = session.month_layout().expect("month");
        assert_eq!(month.click_day(date(3)).len(), 2);
        session.dispatch_all(month.click_day(date(3)));
        assert_eq!(session.app().view, CalendarView::Day);
        let day = session.day_layout().expect("day");
        assert_eq!(day.column.blocks[0].task.id, created.id);

        session
            .store_mut()
            .update_task(
                created.id,
                TaskPatch {
                    is_completed: Some(true),
                    ..TaskPatch::default()
                },
            )
            .expect("update");
        assert!(session.day_layout().expect("day").column.blocks[0].task.is_completed);
    }
}
