//! Time-grid geometry.
//!
//! Pure mappings between grid slots (date, hour, quarter-hour) and pixel
//! offsets, plus the span tests used to highlight the cells a drag or resize
//! would cover. The resize duration formula lives here too so that the live
//! preview and the committed duration can never disagree.

use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::datetime::clock_label;

/// Smallest addressable scheduling unit, in minutes.
pub const QUANTUM_MINUTES: u32 = 15;

pub const QUARTERS: [u32; 4] = [0, 15, 30, 45];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSlot {
    pub date: NaiveDate,
    pub hour: u32,
    pub minutes: u32,
}

impl GridSlot {
    /// Builds a slot, rejecting hours past 23 and minutes off the quarter grid.
    pub fn new(date: NaiveDate, hour: u32, minutes: u32) -> Option<Self> {
        if hour > 23 || !QUARTERS.contains(&minutes) {
            return None;
        }
        Some(Self {
            date,
            hour,
            minutes,
        })
    }

    /// Slot containing `minute_of_day`, rounded down to its quarter.
    pub fn containing(date: NaiveDate, minute_of_day: u32) -> Option<Self> {
        let quantized = minute_of_day - minute_of_day % QUANTUM_MINUTES;
        Self::new(date, quantized / 60, quantized % 60)
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minutes
    }

    /// First minute after this slot.
    pub fn end_minute(&self) -> u32 {
        self.minute_of_day() + QUANTUM_MINUTES
    }

    pub fn time_label(&self) -> String {
        clock_label(self.hour, self.minutes)
    }
}

/// View-specific grid dimensions. `slot_height_px` is the height of one
/// quantum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMetrics {
    pub start_hour: u32,
    pub end_hour: u32,
    pub slot_height_px: f64,
}

impl GridMetrics {
    pub fn new(start_hour: u32, end_hour: u32, slot_height_px: f64) -> Self {
        Self {
            start_hour,
            end_hour: end_hour.max(start_hour),
            slot_height_px,
        }
    }

    pub fn px_per_minute(&self) -> f64 {
        self.slot_height_px / f64::from(QUANTUM_MINUTES)
    }

    pub fn slot_top_offset(&self, hour: u32, minutes: u32) -> f64 {
        let minutes_from_start =
            (i64::from(hour) - i64::from(self.start_hour)) * 60 + i64::from(minutes);
        minutes_from_start as f64 * self.px_per_minute()
    }

    /// Never shorter than one slot, however small the duration.
    pub fn block_height(&self, duration_minutes: u32) -> f64 {
        (f64::from(duration_minutes) * self.px_per_minute()).max(self.slot_height_px)
    }

    pub fn hours(&self) -> RangeInclusive<u32> {
        self.start_hour..=self.end_hour
    }

    pub fn grid_height(&self) -> f64 {
        let hours = self.end_hour - self.start_hour + 1;
        f64::from(hours * 60) * self.px_per_minute()
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.hours().contains(&hour)
    }

    /// Every quantum cell of `date` the grid shows, in order.
    pub fn slots_for(&self, date: NaiveDate) -> Vec<GridSlot> {
        self.hours()
            .flat_map(|hour| QUARTERS.iter().map(move |&minutes| (hour, minutes)))
            .filter_map(|(hour, minutes)| GridSlot::new(date, hour, minutes))
            .collect()
    }

    /// Quantizes a vertical offset inside a day column to the cell under it.
    pub fn slot_at_offset(&self, date: NaiveDate, offset_px: f64) -> Option<GridSlot> {
        if !offset_px.is_finite() || offset_px < 0.0 || offset_px >= self.grid_height() {
            return None;
        }
        let minutes_from_start = (offset_px / self.px_per_minute()).floor() as u32;
        GridSlot::containing(date, self.start_hour * 60 + minutes_from_start)
    }
}

pub fn is_within_move_span(slot: &GridSlot, hover: &GridSlot, duration_minutes: u32) -> bool {
    if slot.date != hover.date {
        return false;
    }
    let start = hover.minute_of_day();
    let minute = slot.minute_of_day();
    minute >= start && minute < start.saturating_add(duration_minutes)
}

/// Cells from the task's fixed start through the end of the hovered quantum.
pub fn is_within_resize_span(slot: &GridSlot, hover: &GridSlot, task_start_minute: u32) -> bool {
    if slot.date != hover.date {
        return false;
    }
    let minute = slot.minute_of_day();
    minute >= task_start_minute && minute < hover.end_minute()
}

/// Duration a resize ending on `hover` produces. Clamped to one quantum,
/// unbounded above.
pub fn resized_duration(task_start_minute: u32, hover: &GridSlot) -> u32 {
    hover
        .end_minute()
        .saturating_sub(task_start_minute)
        .max(QUANTUM_MINUTES)
}
