//! Drag-and-drop hover hysteresis for same-level reordering.
//!
//! This is a presentation concern: the editing surface feeds pointer
//! positions in and gets back at most one `reorder(from, to)` to issue per
//! slot change. The mutator itself never sees pointer geometry.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragDirection {
    Up,
    Down,
}

impl DragDirection {
    /// Direction of travel from the dragged slot to the hovered one.
    pub fn between(from: usize, to: usize) -> Option<DragDirection> {
        match from.cmp(&to) {
            std::cmp::Ordering::Less => Some(DragDirection::Down),
            std::cmp::Ordering::Greater => Some(DragDirection::Up),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Vertical extent of the hovered item, in the pointer's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverBounds {
    pub top: f32,
    pub height: f32,
}

impl HoverBounds {
    pub fn midpoint(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// Commit only once the pointer has crossed the far half of the hovered item.
pub fn should_commit(direction: DragDirection, pointer_y: f32, bounds: HoverBounds) -> bool {
    match direction {
        DragDirection::Down => pointer_y > bounds.midpoint(),
        DragDirection::Up => pointer_y < bounds.midpoint(),
    }
}

/// Tracks one drag gesture within a sibling list.
#[derive(Debug, Clone)]
pub struct ReorderTracker {
    dragged: usize,
}

impl ReorderTracker {
    pub fn new(dragged: usize) -> Self {
        ReorderTracker { dragged }
    }

    /// Current slot of the dragged item.
    pub fn dragged(&self) -> usize {
        self.dragged
    }

    /// Feed a hover event. Returns the `(from, to)` reorder to apply, if the
    /// pointer has crossed the hovered item's far half.
    pub fn hover(
        &mut self,
        hovered: usize,
        pointer_y: f32,
        bounds: HoverBounds,
    ) -> Option<(usize, usize)> {
        let direction = DragDirection::between(self.dragged, hovered)?;
        if !should_commit(direction, pointer_y, bounds) {
            return None;
        }
        let from = self.dragged;
        self.dragged = hovered;
        Some((from, hovered))
    }
}
