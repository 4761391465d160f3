use std::cmp::Ordering;

use crate::model::item::Ordered;
use crate::model::write::OrderUpdate;

/// Which half of the hovered item the pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// Container order: `order` ascending (absent sorts last), then most recent
/// fallback timestamp first, then id.
pub fn compare<T: Ordered>(a: &T, b: &T) -> Ordering {
    let a_order = a.order().unwrap_or(i64::MAX);
    let b_order = b.order().unwrap_or(i64::MAX);
    a_order
        .cmp(&b_order)
        .then_with(|| b.fallback_timestamp().cmp(a.fallback_timestamp()))
        .then_with(|| a.id().cmp(b.id()))
}

/// Sort a container in place by [`compare`]
pub fn stable_sort<T: Ordered>(items: &mut [T]) {
    items.sort_by(compare);
}

/// Sorted copy of a container
pub fn sorted<T: Ordered + Clone>(items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    stable_sort(&mut out);
    out
}

/// Index at which a dragged item lands in `container`, which must not
/// contain the dragged item.
///
/// `over` is the hovered item and pointer side. Hovering empty space
/// appends. Returns `None` when the hovered item is not in the container
/// (removed mid-drag, or the dragged item itself).
pub fn reinsertion_index<T: Ordered>(container: &[T], over: Option<(&str, Side)>) -> Option<usize> {
    let Some((target_id, side)) = over else {
        return Some(container.len());
    };
    let idx = container.iter().position(|t| t.id() == target_id)?;
    Some(match side {
        Side::Before => idx,
        Side::After => idx + 1,
    })
}

/// Dense zero-based order keys for the container as currently arranged
pub fn reindex<T: Ordered>(container: &[T]) -> Vec<OrderUpdate> {
    container
        .iter()
        .enumerate()
        .map(|(i, item)| OrderUpdate::new(item.id(), i as i64))
        .collect()
}
