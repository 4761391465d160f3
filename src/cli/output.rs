use serde::Serialize;

use crate::model::item::{Item, Membership};
use crate::ops::check::{CheckError, CheckResult, CheckWarning};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ContainerJson<'a> {
    pub membership: Membership,
    pub container: &'a str,
    pub items: &'a [Item],
}

#[derive(Serialize)]
pub struct DeletionJson<'a> {
    pub id: &'a str,
    pub deleted: bool,
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

/// One item: order key (or `-`), id, title, and its block if scheduled
pub fn format_item_line(item: &Item) -> String {
    let order = item
        .order
        .map(|o| o.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("{:>3}  {}  {}", order, item.id, item.title);
    if let Some(block) = &item.block {
        line.push_str(&format!("  [{} {}]", block.day, block.span_label()));
    }
    line
}

pub fn format_container_header(membership: Membership, key: &str) -> String {
    format!("== {} ({}) ==", key, membership)
}

/// A container's items, already in display order
pub fn format_container(membership: Membership, key: &str, items: &[Item]) -> Vec<String> {
    let mut lines = vec![format_container_header(membership, key)];
    if items.is_empty() {
        lines.push("  (empty)".to_string());
    }
    lines.extend(items.iter().map(format_item_line));
    lines
}

/// Confirmation printed after a grid gesture
pub fn format_placement(item: &Item) -> String {
    match &item.block {
        Some(block) => format!("{} scheduled {} {}", item.id, block.day, block.span_label()),
        None => format!("{} unscheduled", item.id),
    }
}

pub fn format_check(result: &CheckResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        for err in &result.errors {
            lines.push(match err {
                CheckError::DuplicateId { item_id } => format!("  {} is used by more than one item", item_id),
                CheckError::DuplicateOrder {
                    membership,
                    container,
                    order,
                    item_ids,
                } => format!(
                    "  [{} {}] order {} shared by {}",
                    membership,
                    container,
                    order,
                    item_ids.join(", ")
                ),
                CheckError::BlockOutOfBounds { item_id, start, end } => format!(
                    "  {} block {}-{} is outside the grid",
                    item_id,
                    crate::model::block::minute_label(*start),
                    crate::model::block::minute_label(*end)
                ),
                CheckError::BlockTooShort { item_id, minutes } => {
                    format!("  {} block is only {} minutes", item_id, minutes)
                }
                CheckError::InvalidBlockDay { item_id, day } => {
                    format!("  {} block has invalid day \"{}\"", item_id, day)
                }
            });
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            lines.push(String::new());
        }
        lines.push("Warnings:".to_string());
        for warn in &result.warnings {
            lines.push(match warn {
                CheckWarning::MissingOrder {
                    membership,
                    container,
                    item_id,
                } => format!("  [{} {}] {} has no order key", membership, container, item_id),
                CheckWarning::SparseOrder {
                    membership,
                    container,
                } => format!("  [{} {}] order keys are not dense", membership, container),
                CheckWarning::UnalignedBlock { item_id } => {
                    format!("  {} block is off the snap grid", item_id)
                }
            });
        }
    }
    if result.valid {
        lines.push("✓ board is valid".to_string());
    } else {
        lines.push("✗ board has errors".to_string());
    }
    lines
}
