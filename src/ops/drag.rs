//! Drag tracking for list, board and planner containers.
//!
//! A `ListDrag` only remembers what is being dragged and what it currently
//! hovers. Nothing is computed against the item set until release, so a
//! cancelled drag never touches state.

use crate::model::item::{Item, Membership};
use crate::ops::move_ops::{self, DropTarget, MovePlan};
use crate::ops::sequence::Side;

/// Drop indicator shown while hovering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropHint {
    Before,
    After,
    /// Empty container space: the item will be appended
    Inside,
}

impl From<Side> for DropHint {
    fn from(side: Side) -> Self {
        match side {
            Side::Before => DropHint::Before,
            Side::After => DropHint::After,
        }
    }
}

/// Which half of a row/card at `top` with `height` the pointer is in
pub fn pointer_side(pointer_y: f64, top: f64, height: f64) -> Side {
    if pointer_y < top + height / 2.0 {
        Side::Before
    } else {
        Side::After
    }
}

/// Geometry of the item under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct HoveredRow {
    pub id: String,
    pub top: f64,
    pub height: f64,
}

/// An in-progress drag of one item
#[derive(Debug, Clone)]
pub struct ListDrag {
    item_id: String,
    target: Option<DropTarget>,
}

impl ListDrag {
    pub fn begin(item_id: impl Into<String>) -> Self {
        ListDrag {
            item_id: item_id.into(),
            target: None,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn target(&self) -> Option<&DropTarget> {
        self.target.as_ref()
    }

    /// Pointer moved over `container`, optionally above a row
    pub fn hover(&mut self, container: &str, row: Option<&HoveredRow>, pointer_y: f64) -> DropHint {
        match row {
            Some(row) => {
                let side = pointer_side(pointer_y, row.top, row.height);
                self.target = Some(DropTarget {
                    container: container.to_string(),
                    over: Some((row.id.clone(), side)),
                });
                side.into()
            }
            None => {
                self.target = Some(DropTarget::end_of(container));
                DropHint::Inside
            }
        }
    }

    /// Pointer left every valid drop zone
    pub fn leave(&mut self) {
        self.target = None;
    }

    /// Pointer released: plan the move against the current item set.
    /// Releasing outside any drop zone yields an empty plan.
    pub fn release(self, items: &[Item], membership: Membership) -> MovePlan {
        match self.target {
            Some(target) => move_ops::plan_move(items, membership, &self.item_id, &target),
            None => MovePlan::default(),
        }
    }

    /// Escape or an invalid drop: discard without planning anything
    pub fn cancel(self) {}
}
