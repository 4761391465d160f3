use indexmap::{IndexMap, IndexSet};

use crate::model::item::{Item, Membership};
use crate::model::write::{OrderUpdate, Write};
use crate::ops::sequence::{self, Side};

/// Where a dragged item was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    /// Destination container key
    pub container: String,
    /// Hovered item and side, or `None` for empty container space
    pub over: Option<(String, Side)>,
}

impl DropTarget {
    /// Drop onto empty space in `container` (append)
    pub fn end_of(container: impl Into<String>) -> Self {
        DropTarget {
            container: container.into(),
            over: None,
        }
    }

    pub fn before(container: impl Into<String>, id: impl Into<String>) -> Self {
        DropTarget {
            container: container.into(),
            over: Some((id.into(), Side::Before)),
        }
    }

    pub fn after(container: impl Into<String>, id: impl Into<String>) -> Self {
        DropTarget {
            container: container.into(),
            over: Some((id.into(), Side::After)),
        }
    }

    fn over_ref(&self) -> Option<(&str, Side)> {
        self.over.as_ref().map(|(id, side)| (id.as_str(), *side))
    }
}

/// Kind of move a plan describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Reorder,
    /// Cross-container, appended at the end
    Transfer,
    /// Cross-container, spliced at a hovered item
    TransferAt,
}

/// The writes for one move gesture
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MovePlan {
    /// Order keys for every item whose container was reindexed, keyed by id
    pub orders: IndexMap<String, i64>,
    /// Container change for the dragged item (cross-container moves only)
    pub membership: Option<Write>,
    pub kind: Option<MoveKind>,
}

impl MovePlan {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty() && self.membership.is_none()
    }

    fn merge_orders(&mut self, updates: Vec<OrderUpdate>) {
        for update in updates {
            self.orders.insert(update.id, update.order);
        }
    }

    /// Flatten into one update set: the container change first, then orders
    pub fn into_writes(self) -> Vec<Write> {
        let mut writes = Vec::with_capacity(self.orders.len() + 1);
        if let Some(membership) = self.membership {
            writes.push(membership);
        }
        writes.extend(
            self.orders
                .into_iter()
                .map(|(id, order)| Write::Order { id, order }),
        );
        writes
    }
}

/// Stable-sorted members of one container
pub fn container(items: &[Item], membership: Membership, key: &str) -> Vec<Item> {
    let mut members: Vec<Item> = items
        .iter()
        .filter(|item| membership.key_of(item).as_deref() == Some(key))
        .cloned()
        .collect();
    sequence::stable_sort(&mut members);
    members
}

/// Distinct container keys in first-seen order
pub fn container_keys(items: &[Item], membership: Membership) -> Vec<String> {
    let keys: IndexSet<String> = items
        .iter()
        .filter_map(|item| membership.key_of(item))
        .collect();
    keys.into_iter().collect()
}

/// Plan the writes for dropping `dragged_id` on `target`.
///
/// An empty plan means there is nothing to persist: the item is back where
/// it started, or the gesture refers to items that no longer exist.
pub fn plan_move(
    items: &[Item],
    membership: Membership,
    dragged_id: &str,
    target: &DropTarget,
) -> MovePlan {
    let Some(dragged) = items.iter().find(|item| item.id == dragged_id) else {
        return MovePlan::default();
    };

    match membership.key_of(dragged) {
        Some(source_key) if source_key == target.container => {
            plan_reorder(items, membership, dragged, target)
        }
        source_key => plan_transfer(items, membership, dragged, source_key.as_deref(), target),
    }
}

fn plan_reorder(
    items: &[Item],
    membership: Membership,
    dragged: &Item,
    target: &DropTarget,
) -> MovePlan {
    let mut members = container(items, membership, &target.container);
    let Some(original) = members.iter().position(|item| item.id == dragged.id) else {
        return MovePlan::default();
    };
    let moving = members.remove(original);

    let Some(idx) = sequence::reinsertion_index(&members, target.over_ref()) else {
        return MovePlan::default();
    };
    if idx == original {
        return MovePlan::default();
    }

    members.insert(idx, moving);
    let mut plan = MovePlan {
        kind: Some(MoveKind::Reorder),
        ..Default::default()
    };
    plan.merge_orders(sequence::reindex(&members));
    plan
}

fn plan_transfer(
    items: &[Item],
    membership: Membership,
    dragged: &Item,
    source_key: Option<&str>,
    target: &DropTarget,
) -> MovePlan {
    let mut destination = container(items, membership, &target.container);
    let Some(idx) = sequence::reinsertion_index(&destination, target.over_ref()) else {
        return MovePlan::default();
    };

    let mut moving = dragged.clone();
    if membership.assign(&mut moving, &target.container).is_err() {
        return MovePlan::default();
    }
    destination.insert(idx, moving);

    let mut plan = MovePlan {
        membership: Some(Write::Container {
            id: dragged.id.clone(),
            membership,
            key: target.container.clone(),
        }),
        kind: Some(if target.over.is_some() {
            MoveKind::TransferAt
        } else {
            MoveKind::Transfer
        }),
        ..Default::default()
    };

    if let Some(source_key) = source_key {
        let mut source = container(items, membership, source_key);
        source.retain(|item| item.id != dragged.id);
        plan.merge_orders(sequence::reindex(&source));
    }
    plan.merge_orders(sequence::reindex(&destination));
    plan
}
