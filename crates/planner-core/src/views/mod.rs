//! Calendar view layouts.
//!
//! Views do not draw anything themselves. They turn a range query result and
//! the current [`DragState`] into positioned blocks, drop targets and click
//! actions; the text renderer (or any other front end) paints those.

pub mod day;
pub mod month;
pub mod week;

use chrono::NaiveDate;

use crate::geometry::{GridMetrics, GridSlot};
use crate::gesture::{DragState, GrabRegion, SlotHighlight};
use crate::resolver::DropTarget;
use crate::task::Task;

/// Height of the grab strip at the bottom of a block that starts a resize.
pub const RESIZE_HANDLE_PX: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskBlock {
    pub task: Task,
    pub top_px: f64,
    pub height_px: f64,
    /// Duration the block shows; the live resize preview while that task is
    /// being resized.
    pub duration_minutes: u32,
    pub lane: usize,
    pub is_dragging: bool,
}

impl TaskBlock {
    pub fn label(&self) -> String {
        match self.task.start_time() {
            Some(_) => format!(
                "{} - {}min",
                self.task.scheduled_time.as_deref().unwrap_or_default(),
                self.duration_minutes
            ),
            None => String::new(),
        }
    }

    pub fn bottom_px(&self) -> f64 {
        self.top_px + self.height_px
    }

    /// Which part of the block sits under `offset_px`, if any.
    pub fn grab_region_at(&self, offset_px: f64) -> Option<GrabRegion> {
        if offset_px < self.top_px || offset_px >= self.bottom_px() {
            return None;
        }
        if offset_px >= self.bottom_px() - RESIZE_HANDLE_PX {
            Some(GrabRegion::ResizeHandle)
        } else {
            Some(GrabRegion::Body)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotCell {
    pub slot: GridSlot,
    pub top_px: f64,
    pub highlight: SlotHighlight,
}

impl SlotCell {
    pub fn target(&self) -> DropTarget {
        DropTarget::TimeSlot(self.slot)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnscheduledZone {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

impl UnscheduledZone {
    pub fn target(&self) -> DropTarget {
        DropTarget::Unscheduled { date: self.date }
    }
}

/// One day of a time grid: quarter-hour drop cells, positioned blocks and
/// the unscheduled strip.
#[derive(Debug, Clone, PartialEq)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub slots: Vec<SlotCell>,
    pub blocks: Vec<TaskBlock>,
    pub unscheduled: UnscheduledZone,
    /// Timed tasks starting outside the visible hours.
    pub outside_hours: Vec<Task>,
}

impl DayColumn {
    pub fn build(date: NaiveDate, tasks: &[Task], metrics: &GridMetrics, drag: &DragState) -> Self {
        let (scheduled, unscheduled) = partition(tasks.iter().filter(|task| task.scheduled_date == date));

        let slots = metrics
            .slots_for(date)
            .into_iter()
            .map(|slot| SlotCell {
                slot,
                top_px: metrics.slot_top_offset(slot.hour, slot.minutes),
                highlight: drag.highlight(&slot),
            })
            .collect();

        let mut blocks = Vec::new();
        let mut outside_hours = Vec::new();
        for task in scheduled {
            match place_block(task, metrics, drag) {
                Some(block) => blocks.push(block),
                None => outside_hours.push(task.clone()),
            }
        }
        assign_lanes(&mut blocks);

        Self {
            date,
            slots,
            blocks,
            unscheduled: UnscheduledZone {
                date,
                tasks: unscheduled.into_iter().cloned().collect(),
            },
            outside_hours,
        }
    }

    /// Topmost block under the pointer together with the region hit.
    pub fn block_at(&self, offset_px: f64) -> Option<(&TaskBlock, GrabRegion)> {
        self.blocks
            .iter()
            .rev()
            .find_map(|block| block.grab_region_at(offset_px).map(|region| (block, region)))
    }

    pub fn highlighted(&self) -> impl Iterator<Item = &SlotCell> {
        self.slots
            .iter()
            .filter(|cell| cell.highlight != SlotHighlight::None)
    }
}

/// Splits tasks into (scheduled, unscheduled). A task whose stored time does
/// not parse counts as unscheduled.
pub fn partition<'a, I>(tasks: I) -> (Vec<&'a Task>, Vec<&'a Task>)
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks.into_iter().partition(|task| task.is_scheduled())
}

fn place_block(task: &Task, metrics: &GridMetrics, drag: &DragState) -> Option<TaskBlock> {
    let start = task.start_minute()?;
    let (hour, minutes) = (start / 60, start % 60);
    if !metrics.contains_hour(hour) {
        return None;
    }

    let duration_minutes = drag.preview_duration(task).unwrap_or(task.duration_minutes);
    Some(TaskBlock {
        task: task.clone(),
        top_px: metrics.slot_top_offset(hour, minutes),
        height_px: metrics.block_height(duration_minutes),
        duration_minutes,
        lane: 0,
        is_dragging: drag.is_dragging(task),
    })
}

/// Greedy lane assignment so overlapping blocks sit side by side.
fn assign_lanes(blocks: &mut [TaskBlock]) {
    blocks.sort_by(|a, b| a.top_px.total_cmp(&b.top_px));
    let mut lane_ends: Vec<f64> = Vec::new();
    for block in blocks.iter_mut() {
        let lane = match lane_ends.iter().position(|end| *end <= block.top_px) {
            Some(free) => free,
            None => {
                lane_ends.push(0.0);
                lane_ends.len() - 1
            }
        };
        lane_ends[lane] = block.bottom_px();
        block.lane = lane;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("valid date")
    }

    fn task(d: u32, time: Option<&str>, duration: u32) -> Task {
        let mut task = Task::new("t".to_string(), date(d), Utc::now());
        task.scheduled_time = time.map(str::to_string);
        task.duration_minutes = duration;
        task
    }

    #[test]
    fn column_partitions_and_positions() {
        let metrics = GridMetrics::new(6, 22, 15.0);
        let tasks = vec![
            task(1, Some("09:30"), 45),
            task(1, None, 30),
            task(1, Some("bogus"), 30),
            task(1, Some("23:00"), 30),
            task(2, Some("09:00"), 30),
        ];
        let column = DayColumn::build(date(1), &tasks, &metrics, &DragState::default());

        assert_eq!(column.blocks.len(), 1);
        assert_eq!(column.blocks[0].top_px, 210.0);
        assert_eq!(column.blocks[0].height_px, 45.0);
        assert_eq!(column.blocks[0].label(), "09:30 - 45min");
        assert_eq!(column.unscheduled.tasks.len(), 2);
        assert_eq!(column.outside_hours.len(), 1);
        assert_eq!(column.slots.len(), 17 * 4);
        assert_eq!(column.unscheduled.target(), DropTarget::Unscheduled { date: date(1) });
    }

    #[test]
    fn move_preview_of_huge_task_marks_rest_of_grid() {
        let metrics = GridMetrics::new(6, 22, 15.0);
        let huge = task(1, Some("08:00"), u32::MAX);
        let drag = DragState {
            active_task: Some(huge.clone()),
            drag_type: Some(crate::resolver::DragKind::Move),
            hover_slot: GridSlot::new(date(1), 20, 0),
        };

        let column = DayColumn::build(date(1), &[huge], &metrics, &drag);
        let marked: Vec<GridSlot> = column.highlighted().map(|cell| cell.slot).collect();
        assert_eq!(marked.len(), 3 * 4);
        assert_eq!(marked.first().map(GridSlot::time_label).as_deref(), Some("20:00"));
        assert_eq!(marked.last().map(GridSlot::time_label).as_deref(), Some("22:45"));
        assert!(column.blocks[0].is_dragging);
    }

    #[test]
    fn overlapping_blocks_get_separate_lanes() {
        let metrics = GridMetrics::new(6, 22, 15.0);
        let tasks = vec![
            task(1, Some("09:00"), 60),
            task(1, Some("09:30"), 30),
            task(1, Some("10:00"), 30),
        ];
        let column = DayColumn::build(date(1), &tasks, &metrics, &DragState::default());
        let lanes: Vec<usize> = column.blocks.iter().map(|b| b.lane).collect();
        assert_eq!(lanes, vec![0, 1, 0]);
    }

    #[test]
    fn block_hit_test_distinguishes_resize_handle() {
        let metrics = GridMetrics::new(6, 22, 15.0);
        let tasks = vec![task(1, Some("07:00"), 60)];
        let column = DayColumn::build(date(1), &tasks, &metrics, &DragState::default());

        let (_, body) = column.block_at(70.0).expect("inside block");
        assert_eq!(body, GrabRegion::Body);
        let (_, handle) = column.block_at(118.0).expect("inside handle");
        assert_eq!(handle, GrabRegion::ResizeHandle);
        assert!(column.block_at(120.0).is_none());
        assert!(column.block_at(59.0).is_none());
    }
}
