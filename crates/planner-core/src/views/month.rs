use chrono::{Datelike, NaiveDate, Weekday};

use crate::app_state::{AppAction, CalendarView};
use crate::datetime::{add_days, month_grid_range};
use crate::store::schedule_order;
use crate::task::Task;

pub const DEFAULT_MAX_VISIBLE_TASKS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct MonthCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_selected: bool,
    pub is_today: bool,
    /// First few tasks of the day, in schedule order.
    pub tasks: Vec<Task>,
    /// Tasks of the day not shown in `tasks`.
    pub overflow: usize,
}

impl MonthCell {
    pub fn overflow_label(&self) -> Option<String> {
        (self.overflow > 0).then(|| format!("+{} more", self.overflow))
    }
}

/// Whole weeks covering the selected month. Month cells carry no drop
/// targets.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthLayout {
    pub selected_date: NaiveDate,
    pub weeks: Vec<Vec<MonthCell>>,
}

impl MonthLayout {
    pub fn build(
        selected_date: NaiveDate,
        today: NaiveDate,
        week_start: Weekday,
        tasks: &[Task],
        max_visible: usize,
    ) -> Self {
        let (start, end) = month_grid_range(selected_date, week_start);

        let mut weeks = Vec::new();
        let mut week = Vec::with_capacity(7);
        let mut day = start;
        while day <= end {
            week.push(build_cell(day, selected_date, today, tasks, max_visible));
            if week.len() == 7 {
                weeks.push(std::mem::take(&mut week));
            }
            day = add_days(day, 1);
        }
        if !week.is_empty() {
            weeks.push(week);
        }

        Self {
            selected_date,
            weeks,
        }
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&MonthCell> {
        self.weeks.iter().flatten().find(|cell| cell.date == date)
    }

    pub fn click_day(&self, date: NaiveDate) -> Vec<AppAction> {
        vec![
            AppAction::SelectDate(date),
            AppAction::SetView(CalendarView::Day),
        ]
    }

    pub fn click_task(&self, task: &Task) -> Vec<AppAction> {
        vec![
            AppAction::SelectDate(task.scheduled_date),
            AppAction::OpenEdit(task.clone()),
        ]
    }
}

fn build_cell(
    date: NaiveDate,
    selected_date: NaiveDate,
    today: NaiveDate,
    tasks: &[Task],
    max_visible: usize,
) -> MonthCell {
    let mut day_tasks: Vec<&Task> = tasks.iter().filter(|task| task.scheduled_date == date).collect();
    day_tasks.sort_by(|a, b| schedule_order(a, b));

    let overflow = day_tasks.len().saturating_sub(max_visible);
    MonthCell {
        date,
        in_month: date.year() == selected_date.year() && date.month() == selected_date.month(),
        is_selected: date == selected_date,
        is_today: date == today,
        tasks: day_tasks.into_iter().take(max_visible).cloned().collect(),
        overflow,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).expect("valid date")
    }

    fn task(d: u32, time: Option<&str>) -> Task {
        let mut task = Task::new(format!("task {d}"), date(5, d), Utc::now());
        task.scheduled_time = time.map(str::to_string);
        task
    }

    #[test]
    fn grid_covers_whole_weeks() {
        let layout = MonthLayout::build(date(5, 15), date(5, 20), Weekday::Sun, &[], 3);
        assert_eq!(layout.weeks.len(), 5);
        assert!(layout.weeks.iter().all(|week| week.len() == 7));
        assert_eq!(layout.weeks[0][0].date, date(4, 28));
        assert!(!layout.weeks[0][0].in_month);
        assert_eq!(layout.weeks[4][6].date, date(6, 1));

        let selected = layout.cell(date(5, 15)).expect("selected cell");
        assert!(selected.is_selected && selected.in_month && !selected.is_today);
        assert!(layout.cell(date(5, 20)).expect("today cell").is_today);
    }

    #[test]
    fn caps_visible_tasks_and_counts_overflow() {
        let tasks = vec![
            task(2, Some("14:00")),
            task(2, None),
            task(2, Some("08:00")),
            task(2, Some("09:00")),
            task(2, Some("10:00")),
            task(3, Some("10:00")),
        ];
        let layout = MonthLayout::build(date(5, 1), date(5, 1), Weekday::Sun, &tasks, 3);

        let busy = layout.cell(date(5, 2)).expect("busy cell");
        assert_eq!(busy.tasks.len(), 3);
        assert_eq!(busy.overflow, 2);
        assert_eq!(busy.overflow_label().as_deref(), Some("+2 more"));
        let times: Vec<Option<&str>> = busy.tasks.iter().map(|t| t.scheduled_time.as_deref()).collect();
        assert_eq!(times, vec![None, Some("08:00"), Some("09:00")]);

        let quiet = layout.cell(date(5, 3)).expect("quiet cell");
        assert_eq!(quiet.tasks.len(), 1);
        assert_eq!(quiet.overflow_label(), None);
    }

    #[test]
    fn day_click_switches_to_day_view() {
        let layout = MonthLayout::build(date(5, 1), date(5, 1), Weekday::Sun, &[], 3);
        assert_eq!(
            layout.click_day(date(5, 9)),
            vec![AppAction::SelectDate(date(5, 9)), AppAction::SetView(CalendarView::Day)]
        );
        let t = task(4, None);
        assert_eq!(
            layout.click_task(&t),
            vec![AppAction::SelectDate(date(5, 4)), AppAction::OpenEdit(t.clone())]
        );
    }
}
