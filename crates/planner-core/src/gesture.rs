//! Drag/resize interaction state machine.
//!
//! One pointer gesture at a time: a press on a task body or its resize
//! handle only becomes a drag once the pointer travels past the activation
//! distance. Until then a release is a plain click. While armed, the task
//! snapshot taken at press time is frozen and the hovered grid slot tracks
//! the pointer. Release resolves exactly once and always returns to idle.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::geometry::{GridSlot, is_within_move_span, is_within_resize_span, resized_duration};
use crate::resolver::{DragKind, DropTarget, ScheduleMutation, resolve};
use crate::task::Task;

pub const DEFAULT_ACTIVATION_DISTANCE_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f64,
    pub y: f64,
}

impl PointerPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &PointerPosition) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Part of a task block the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrabRegion {
    Body,
    ResizeHandle,
}

impl GrabRegion {
    pub fn drag_kind(self) -> DragKind {
        match self {
            Self::Body => DragKind::Move,
            Self::ResizeHandle => DragKind::Resize,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    Press {
        task: Task,
        region: GrabRegion,
        at: PointerPosition,
    },
    Motion {
        at: PointerPosition,
        over: Option<DropTarget>,
    },
    Release {
        at: PointerPosition,
        over: Option<DropTarget>,
    },
    /// External interruption, including loss of pointer capture.
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    Ignored,
    Pressed,
    Armed(DragKind),
    Hovered(Option<GridSlot>),
    Clicked(Task),
    Released {
        kind: DragKind,
        mutation: Option<ScheduleMutation>,
    },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotHighlight {
    None,
    MoveSpan,
    ResizeSpan,
}

/// Read-only view of the active gesture handed to renderers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragState {
    pub active_task: Option<Task>,
    pub drag_type: Option<DragKind>,
    pub hover_slot: Option<GridSlot>,
}

impl DragState {
    pub fn is_idle(&self) -> bool {
        self.active_task.is_none()
    }

    pub fn is_dragging(&self, task: &Task) -> bool {
        self.active_task.as_ref().is_some_and(|active| active.id == task.id)
    }

    /// Duration the block of `task` should show right now. Only differs from
    /// the stored one while that task is being resized over a slot.
    pub fn preview_duration(&self, task: &Task) -> Option<u32> {
        if self.drag_type != Some(DragKind::Resize) || !self.is_dragging(task) {
            return None;
        }
        let active = self.active_task.as_ref()?;
        let hover = self.hover_slot.as_ref()?;
        let start = active.start_minute()?;
        Some(resized_duration(start, hover))
    }

    pub fn highlight(&self, slot: &GridSlot) -> SlotHighlight {
        let (Some(active), Some(kind), Some(hover)) =
            (self.active_task.as_ref(), self.drag_type, self.hover_slot.as_ref())
        else {
            return SlotHighlight::None;
        };

        match kind {
            DragKind::Move if is_within_move_span(slot, hover, active.duration_minutes) => {
                SlotHighlight::MoveSpan
            }
            DragKind::Resize => match active.start_minute() {
                Some(start) if is_within_resize_span(slot, hover, start) => SlotHighlight::ResizeSpan,
                _ => SlotHighlight::None,
            },
            _ => SlotHighlight::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingPress {
    task: Task,
    region: GrabRegion,
    origin: PointerPosition,
}

#[derive(Debug, Clone)]
pub struct GestureMachine {
    activation_distance: f64,
    pending: Option<PendingPress>,
    state: DragState,
}

impl Default for GestureMachine {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVATION_DISTANCE_PX)
    }
}

impl GestureMachine {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            activation_distance: activation_distance.max(0.0),
            pending: None,
            state: DragState::default(),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.state.is_idle()
    }

    pub fn handle(&mut self, event: GestureEvent) -> GestureOutcome {
        match event {
            GestureEvent::Press { task, region, at } => self.press(task, region, at),
            GestureEvent::Motion { at, over } => self.motion(at, over),
            GestureEvent::Release { over, .. } => self.release(over),
            GestureEvent::Cancel => self.cancel(),
        }
    }

    fn press(&mut self, task: Task, region: GrabRegion, at: PointerPosition) -> GestureOutcome {
        if !self.is_idle() {
            debug!(
                previous = ?self.state.active_task.as_ref().map(|t| t.id),
                "press during active gesture; cancelling the previous one"
            );
            self.reset();
        }

        trace!(task = %task.id, ?region, x = at.x, y = at.y, "gesture pressed");
        self.pending = Some(PendingPress {
            task,
            region,
            origin: at,
        });
        GestureOutcome::Pressed
    }

    fn motion(&mut self, at: PointerPosition, over: Option<DropTarget>) -> GestureOutcome {
        if let Some(pending) = self.pending.as_ref() {
            let travelled = pending.origin.distance_to(&at);
            if travelled <= self.activation_distance {
                return GestureOutcome::Ignored;
            }

            let Some(pending) = self.pending.take() else {
                return GestureOutcome::Ignored;
            };
            let kind = pending.region.drag_kind();
            debug!(task = %pending.task.id, ?kind, travelled, "gesture armed");
            self.state = DragState {
                active_task: Some(pending.task),
                drag_type: Some(kind),
                hover_slot: over.and_then(|target| target.time_slot()),
            };
            return GestureOutcome::Armed(kind);
        }

        if self.state.is_idle() {
            return GestureOutcome::Ignored;
        }

        let hover = over.and_then(|target| target.time_slot());
        if hover != self.state.hover_slot {
            trace!(?hover, "hover slot changed");
        }
        self.state.hover_slot = hover;
        GestureOutcome::Hovered(hover)
    }

    fn release(&mut self, over: Option<DropTarget>) -> GestureOutcome {
        if let Some(pending) = self.pending.take() {
            debug!(task = %pending.task.id, "released below activation distance; treating as click");
            return GestureOutcome::Clicked(pending.task);
        }

        let state = std::mem::take(&mut self.state);
        let (Some(task), Some(kind)) = (state.active_task, state.drag_type) else {
            return GestureOutcome::Ignored;
        };

        let mutation = resolve(&task, kind, over);
        debug!(task = %task.id, ?kind, ?over, ?mutation, "gesture released");
        GestureOutcome::Released { kind, mutation }
    }

    fn cancel(&mut self) -> GestureOutcome {
        if self.is_idle() {
            return GestureOutcome::Ignored;
        }
        debug!("gesture cancelled");
        self.reset();
        GestureOutcome::Cancelled
    }

    fn reset(&mut self) {
        self.pending = None;
        self.state = DragState::default();
    }
}
