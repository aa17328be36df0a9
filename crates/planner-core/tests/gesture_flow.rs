use std::ffi::OsString;

use chrono::{NaiveDate, NaiveDateTime};
use planner_core::app_state::{CalendarView, TaskModal};
use planner_core::cli::GlobalCli;
use planner_core::commands::{dispatch, resolve_task};
use planner_core::config::Config;
use planner_core::datastore::DataStore;
use planner_core::geometry::GridSlot;
use planner_core::gesture::{GestureEvent, GestureOutcome, GrabRegion, PointerPosition};
use planner_core::render::Renderer;
use planner_core::resolver::{DragKind, DropTarget, ScheduleChange};
use planner_core::session::CalendarSession;
use planner_core::store::TaskStore;
use planner_core::task::TaskCreate;
use tempfile::tempdir;

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
}

fn slot(d: u32, hour: u32, minutes: u32) -> GridSlot {
    GridSlot::new(date(d), hour, minutes).expect("valid slot")
}

fn now() -> NaiveDateTime {
    date(1).and_hms_opt(8, 0, 0).expect("valid time")
}

fn run(store: &mut DataStore, cfg: &Config, args: &[&str]) -> anyhow::Result<String> {
    let mut argv = vec![OsString::from("planner")];
    argv.extend(args.iter().map(OsString::from));
    let cli = GlobalCli::parse_args(argv)?;

    let mut out = Vec::new();
    dispatch(store, cfg, &Renderer::plain(), &mut out, cli.command, now())?;
    Ok(String::from_utf8(out).expect("utf8 output"))
}

fn timed(store: &mut DataStore, title: &str, d: u32, time: Option<&str>, duration: u32) -> uuid::Uuid {
    let mut input = TaskCreate::new(title, date(d));
    input.scheduled_time = time.map(str::to_string);
    input.duration_minutes = Some(duration);
    store.create_task(input).expect("create task").id
}

#[test]
fn resize_from_nine_to_ten_commits_seventy_five_minutes() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let id = timed(&mut store, "Focus", 1, Some("09:00"), 30);

    let mut session = CalendarSession::new(&mut store, &Config::default(), date(1));
    let step = session.resize_task(id, slot(1, 10, 0)).expect("resize gesture");
    assert_eq!(step.committed.map(|t| t.duration_minutes), Some(75));
    assert!(session.drag_state().is_idle());

    let reopened = DataStore::open(temp.path()).expect("reopen");
    let stored = reopened.get_task(id).expect("get").expect("exists");
    assert_eq!(stored.duration_minutes, 75);
    assert_eq!(stored.scheduled_time.as_deref(), Some("09:00"));
}

#[test]
fn resize_above_start_clamps_to_one_quarter() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let id = timed(&mut store, "Focus", 1, Some("09:00"), 30);

    let mut session = CalendarSession::new(&mut store, &Config::default(), date(1));
    let step = session.resize_task(id, slot(1, 7, 30)).expect("resize gesture");
    assert_eq!(step.committed.map(|t| t.duration_minutes), Some(15));
}

#[test]
fn unscheduled_task_dropped_on_slot_keeps_its_date() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let id = timed(&mut store, "Email", 1, None, 30);

    let mut session = CalendarSession::new(&mut store, &Config::default(), date(1));
    let step = session
        .drag_task(id, DropTarget::TimeSlot(slot(1, 14, 30)))
        .expect("drag gesture");
    match step.outcome {
        GestureOutcome::Released {
            kind: DragKind::Move,
            mutation: Some(ref mutation),
        } => assert_eq!(
            mutation.change,
            ScheduleChange::Reschedule {
                time: Some("14:30".to_string()),
                date: None
            }
        ),
        ref other => panic!("unexpected outcome {other:?}"),
    }

    // Dropping again on the same slot is a no-op.
    let again = session
        .drag_task(id, DropTarget::TimeSlot(slot(1, 14, 30)))
        .expect("drag gesture");
    assert_eq!(again.committed, None);
}

#[test]
fn move_across_days_updates_both_fields() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let id = timed(&mut store, "Review", 1, Some("09:00"), 60);

    let mut session = CalendarSession::new(&mut store, &Config::default(), date(1));
    session.dispatch(planner_core::app_state::AppAction::SetView(CalendarView::Week));
    let step = session
        .drag_task(id, DropTarget::TimeSlot(slot(3, 11, 15)))
        .expect("drag gesture");
    let moved = step.committed.expect("committed");
    assert_eq!(moved.scheduled_date, date(3));
    assert_eq!(moved.scheduled_time.as_deref(), Some("11:15"));
    assert_eq!(moved.duration_minutes, 60);

    let week = session.week_layout().expect("week layout");
    assert_eq!(week.column(date(1)).map(|c| c.blocks.len()), Some(0));
    assert_eq!(week.column(date(3)).map(|c| c.blocks.len()), Some(1));
}

#[test]
fn click_without_travel_opens_editor_and_never_arms() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let id = timed(&mut store, "Lunch", 1, Some("12:00"), 45);

    let mut session = CalendarSession::new(&mut store, &Config::default(), date(1));
    let layout = session.day_layout().expect("day layout");
    let (block, region) = layout.block_at(layout.offset_of(&slot(1, 12, 0)) + 2.0).expect("block hit");
    assert_eq!(region, GrabRegion::Body);
    assert_eq!(block.task.id, id);
    let task = block.task.clone();

    session.handle_gesture(GestureEvent::Press {
        task: task.clone(),
        region,
        at: PointerPosition::new(20.0, 362.0),
    });
    let moved = session.handle_gesture(GestureEvent::Motion {
        at: PointerPosition::new(23.0, 365.0),
        over: layout.target_at(365.0),
    });
    assert_eq!(moved.outcome, GestureOutcome::Ignored);
    assert!(session.drag_state().is_idle());

    let step = session.handle_gesture(GestureEvent::Release {
        at: PointerPosition::new(23.0, 365.0),
        over: layout.target_at(365.0),
    });
    assert_eq!(step.outcome, GestureOutcome::Clicked(task.clone()));
    assert_eq!(step.committed, None);
    assert_eq!(session.app().modal, TaskModal::Edit { task });
}

#[test]
fn cli_drag_and_resize_go_through_the_gesture_path() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let cfg = Config::default();
    let id = timed(&mut store, "Gym", 2, Some("07:00"), 30);
    let short = id.simple().to_string()[..8].to_string();

    let out = run(&mut store, &cfg, &["drag", &short, "--to", "2024-05-02T18:40"]).expect("drag");
    assert!(out.contains("Moved task"));
    assert!(out.contains("2024-05-02 18:30"));

    let out = run(&mut store, &cfg, &["resize", &short, "--until", "19:10"]).expect("resize");
    assert!(out.contains("Resized task"));
    assert_eq!(resolve_task(&store, &short).expect("resolve").duration_minutes, 45);

    let out = run(&mut store, &cfg, &["resize", &short, "--until", "19:15"]).expect("resize");
    assert!(out.starts_with("No change"));

    let out = run(&mut store, &cfg, &["drag", &short, "--to", "unscheduled"]).expect("unschedule");
    assert!(out.starts_with("Unscheduled task"));
    let task = resolve_task(&store, &short).expect("resolve");
    assert_eq!(task.scheduled_time, None);
    assert_eq!(task.scheduled_date, date(2));
    assert_eq!(task.duration_minutes, 45);

    let out = run(&mut store, &cfg, &["resize", &short, "--until", "20:00"]).expect("resize");
    assert!(out.starts_with("No change"));

    let err = run(&mut store, &cfg, &["drag", &short, "--to", "2024-05-02T23:30"]).expect_err("outside hours");
    assert!(err.to_string().contains("outside the visible hours"));
}

#[test]
fn view_command_renders_each_view() {
    let temp = tempdir().expect("tempdir");
    let mut store = DataStore::open(temp.path()).expect("open datastore");
    let cfg = Config::default();
    timed(&mut store, "Standup", 1, Some("09:15"), 15);
    timed(&mut store, "Inbox", 1, None, 30);

    let day = run(&mut store, &cfg, &["view", "day"]).expect("day view");
    assert!(day.starts_with("Wednesday 2024-05-01"));
    assert!(day.contains("unscheduled: Inbox"));
    assert!(day.contains("Standup (09:15 - 15min)"));

    let week = run(&mut store, &cfg, &["view", "week", "--date", "2024-05-02"]).expect("week view");
    assert!(week.contains("Sun 04-28"));
    assert!(week.contains("09:15 Standup"));

    let month = run(&mut store, &cfg, &["view", "month"]).expect("month view");
    assert!(month.starts_with("May 2024"));
    assert!(month.contains("Standup"));
}
