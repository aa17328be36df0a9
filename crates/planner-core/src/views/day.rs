use chrono::NaiveDate;

use super::{DayColumn, TaskBlock};
use crate::app_state::AppAction;
use crate::geometry::{GridMetrics, GridSlot};
use crate::gesture::{DragState, GrabRegion};
use crate::resolver::DropTarget;
use crate::task::Task;

#[derive(Debug, Clone, PartialEq)]
pub struct DayLayout {
    pub metrics: GridMetrics,
    pub column: DayColumn,
}

impl DayLayout {
    pub fn build(date: NaiveDate, tasks: &[Task], metrics: GridMetrics, drag: &DragState) -> Self {
        Self {
            column: DayColumn::build(date, tasks, &metrics, drag),
            metrics,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.column.date
    }

    /// Drop target under a pointer at `offset_px` from the top of the grid.
    /// Negative offsets land on the unscheduled strip above the grid.
    pub fn target_at(&self, offset_px: f64) -> Option<DropTarget> {
        if offset_px < 0.0 {
            return Some(self.column.unscheduled.target());
        }
        self.metrics
            .slot_at_offset(self.column.date, offset_px)
            .map(DropTarget::TimeSlot)
    }

    pub fn block_at(&self, offset_px: f64) -> Option<(&TaskBlock, GrabRegion)> {
        self.column.block_at(offset_px)
    }

    /// Pointer offset at the top edge of a slot, for driving gestures.
    pub fn offset_of(&self, slot: &GridSlot) -> f64 {
        self.metrics.slot_top_offset(slot.hour, slot.minutes)
    }

    pub fn click_slot(&self, slot: &GridSlot) -> Vec<AppAction> {
        vec![AppAction::OpenCreate {
            date: slot.date,
            time: Some(slot.time_label()),
        }]
    }

    pub fn click_task(&self, task: &Task) -> Vec<AppAction> {
        vec![AppAction::OpenEdit(task.clone())]
    }
}
