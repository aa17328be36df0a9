use chrono::{
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  add_days,
  month_grid_range,
  shift_months,
  start_of_week
};
use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
  Day,
  Week,
  Month
}

impl CalendarView {
  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Day => "day",
      | Self::Week => "week",
      | Self::Month => "month"
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskModal {
  Closed,
  /// Creation form pre-filled from the
  /// clicked slot.
  Create {
    date: NaiveDate,
    time: Option<String>
  },
  Edit {
    task: Task
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
  SelectDate(NaiveDate),
  SetView(CalendarView),
  OpenCreate {
    date: NaiveDate,
    time: Option<String>
  },
  OpenEdit(Task),
  CloseModal,
  GoToToday(NaiveDate),
  Previous,
  Next
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
  pub selected_date: NaiveDate,
  pub view:          CalendarView,
  pub modal:         TaskModal,
  pub week_start:    Weekday
}

impl AppState {
  pub fn new(
    today: NaiveDate,
    week_start: Weekday
  ) -> Self {
    Self {
      selected_date: today,
      view: CalendarView::Day,
      modal: TaskModal::Closed,
      week_start
    }
  }

  #[must_use]
  pub fn reduce(
    self,
    action: AppAction
  ) -> Self {
    match action {
      | AppAction::SelectDate(date)
      | AppAction::GoToToday(date) => {
        Self {
          selected_date: date,
          ..self
        }
      }
      | AppAction::SetView(view) => {
        Self { view, ..self }
      }
      | AppAction::OpenCreate {
        date,
        time
      } => Self {
        modal: TaskModal::Create {
          date,
          time
        },
        ..self
      },
      | AppAction::OpenEdit(task) => {
        Self {
          modal: TaskModal::Edit {
            task
          },
          ..self
        }
      }
      | AppAction::CloseModal => {
        Self {
          modal: TaskModal::Closed,
          ..self
        }
      }
      | AppAction::Previous => {
        let selected_date = shift_focus(
          self.selected_date,
          self.view,
          -1
        );
        Self {
          selected_date,
          ..self
        }
      }
      | AppAction::Next => {
        let selected_date = shift_focus(
          self.selected_date,
          self.view,
          1
        );
        Self {
          selected_date,
          ..self
        }
      }
    }
  }

  pub fn apply_all<I>(
    self,
    actions: I
  ) -> Self
  where
    I: IntoIterator<Item = AppAction>
  {
    actions
      .into_iter()
      .fold(self, Self::reduce)
  }

  /// Inclusive date range the current
  /// view queries.
  pub fn visible_range(
    &self
  ) -> (NaiveDate, NaiveDate) {
    match self.view {
      | CalendarView::Day => {
        (
          self.selected_date,
          self.selected_date
        )
      }
      | CalendarView::Week => {
        let start = start_of_week(
          self.selected_date,
          self.week_start
        );
        (start, add_days(start, 6))
      }
      | CalendarView::Month => {
        month_grid_range(
          self.selected_date,
          self.week_start
        )
      }
    }
  }
}

fn shift_focus(
  current: NaiveDate,
  view: CalendarView,
  step: i64
) -> NaiveDate {
  match view {
    | CalendarView::Month => {
      shift_months(current, step as i32)
    }
    | CalendarView::Week => {
      add_days(current, step * 7)
    }
    | CalendarView::Day => {
      add_days(current, step)
    }
  }
}
