use chrono::{NaiveDate, Weekday};

use super::{DayColumn, TaskBlock};
use crate::app_state::AppAction;
use crate::datetime::week_days;
use crate::geometry::{GridMetrics, GridSlot};
use crate::gesture::{DragState, GrabRegion};
use crate::resolver::DropTarget;
use crate::task::Task;

/// Seven day columns sharing one time axis. Each column carries its own
/// unscheduled strip.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekLayout {
    pub metrics: GridMetrics,
    pub selected_date: NaiveDate,
    pub days: Vec<DayColumn>,
}

impl WeekLayout {
    pub fn build(
        selected_date: NaiveDate,
        week_start: Weekday,
        tasks: &[Task],
        metrics: GridMetrics,
        drag: &DragState,
    ) -> Self {
        let days = week_days(selected_date, week_start)
            .into_iter()
            .map(|date| DayColumn::build(date, tasks, &metrics, drag))
            .collect();
        Self {
            metrics,
            selected_date,
            days,
        }
    }

    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.days.first()?.date, self.days.last()?.date))
    }

    pub fn column(&self, date: NaiveDate) -> Option<&DayColumn> {
        self.days.iter().find(|column| column.date == date)
    }

    pub fn target_at(&self, column_idx: usize, offset_px: f64) -> Option<DropTarget> {
        let column = self.days.get(column_idx)?;
        if offset_px < 0.0 {
            return Some(column.unscheduled.target());
        }
        self.metrics
            .slot_at_offset(column.date, offset_px)
            .map(DropTarget::TimeSlot)
    }

    pub fn block_at(&self, column_idx: usize, offset_px: f64) -> Option<(&TaskBlock, GrabRegion)> {
        self.days.get(column_idx)?.block_at(offset_px)
    }

    pub fn offset_of(&self, slot: &GridSlot) -> f64 {
        self.metrics.slot_top_offset(slot.hour, slot.minutes)
    }

    pub fn click_day(&self, date: NaiveDate) -> Vec<AppAction> {
        vec![AppAction::SelectDate(date)]
    }

    pub fn click_slot(&self, slot: &GridSlot) -> Vec<AppAction> {
        vec![AppAction::OpenCreate {
            date: slot.date,
            time: Some(slot.time_label()),
        }]
    }

    pub fn click_task(&self, task: &Task) -> Vec<AppAction> {
        vec![
            AppAction::SelectDate(task.scheduled_date),
            AppAction::OpenEdit(task.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::gesture::{GestureEvent, GestureMachine, PointerPosition, SlotHighlight};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    fn task(d: u32, time: Option<&str>, duration: u32) -> Task {
        let mut task = Task::new("standup".to_string(), date(d), Utc::now());
        task.scheduled_time = time.map(str::to_string);
        task.duration_minutes = duration;
        task
    }

    #[test]
    fn builds_seven_columns_from_week_start() {
        let metrics = GridMetrics::new(6, 22, 12.0);
        let tasks = vec![task(1, Some("09:00"), 30), task(3, None, 30), task(5, Some("10:00"), 60)];
        let layout = WeekLayout::build(date(1), Weekday::Mon, &tasks, metrics, &DragState::default());

        assert_eq!(layout.days.len(), 7);
        let monday = NaiveDate::from_ymd_opt(2024, 4, 29).expect("valid date");
        assert_eq!(layout.range(), Some((monday, date(5))));
        assert_eq!(layout.column(date(1)).map(|c| c.blocks.len()), Some(1));
        assert_eq!(layout.column(date(3)).map(|c| c.unscheduled.tasks.len()), Some(1));
        assert_eq!(layout.column(date(5)).map(|c| c.blocks[0].top_px), Some(metrics.slot_top_offset(10, 0)));
    }

    #[test]
    fn move_highlight_stays_in_hovered_column() {
        let metrics = GridMetrics::new(6, 22, 12.0);
        let dragged = task(1, Some("09:00"), 45);
        let tasks = vec![dragged.clone()];

        let mut machine = GestureMachine::default();
        machine.handle(GestureEvent::Press {
            task: dragged,
            region: GrabRegion::Body,
            at: PointerPosition::default(),
        });
        let hover = GridSlot::new(date(2), 11, 0).expect("valid slot");
        machine.handle(GestureEvent::Motion {
            at: PointerPosition::new(120.0, 60.0),
            over: Some(DropTarget::TimeSlot(hover)),
        });

        let layout = WeekLayout::build(date(1), Weekday::Sun, &tasks, metrics, machine.state());
        for column in &layout.days {
            let count = column.highlighted().count();
            if column.date == date(2) {
                assert_eq!(count, 3);
                assert!(column.highlighted().all(|c| c.highlight == SlotHighlight::MoveSpan));
            } else {
                assert_eq!(count, 0);
            }
        }
    }

    #[test]
    fn clicks_select_dates_without_switching_view() {
        let metrics = GridMetrics::new(6, 22, 12.0);
        let layout = WeekLayout::build(date(1), Weekday::Sun, &[], metrics, &DragState::default());
        assert_eq!(layout.click_day(date(2)), vec![AppAction::SelectDate(date(2))]);

        let t = task(3, Some("08:00"), 30);
        assert_eq!(
            layout.click_task(&t),
            vec![AppAction::SelectDate(date(3)), AppAction::OpenEdit(t.clone())]
        );
        let april_30 = NaiveDate::from_ymd_opt(2024, 4, 30).expect("valid date");
        assert_eq!(
            layout.target_at(2, -1.0),
            Some(DropTarget::Unscheduled { date: april_30 })
        );
        assert_eq!(layout.target_at(7, 0.0), None);
    }
}
