use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::config::GridConfig;
use crate::model::item::{DAY_KEY_FORMAT, Item, Membership};
use crate::ops::move_ops;

const MEMBERSHIPS: [Membership; 3] = [Membership::Status, Membership::Section, Membership::Day];

/// Structured result from `lu check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A validation error (something that should be fixed).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// Two items share an id
    #[serde(rename = "duplicate_id")]
    DuplicateId { item_id: String },
    /// Two items in one container share an order key
    #[serde(rename = "duplicate_order")]
    DuplicateOrder {
        membership: Membership,
        container: String,
        order: i64,
        item_ids: Vec<String>,
    },
    /// A block starts before the grid opens or ends after it closes
    #[serde(rename = "block_out_of_bounds")]
    BlockOutOfBounds {
        item_id: String,
        start: i32,
        end: i32,
    },
    /// A block is shorter than the minimum duration
    #[serde(rename = "block_too_short")]
    BlockTooShort { item_id: String, minutes: i32 },
    /// A block's day is not a YYYY-MM-DD date
    #[serde(rename = "invalid_block_day")]
    InvalidBlockDay { item_id: String, day: String },
}

/// A validation warning (non-critical issue).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// Item sorts by its fallback timestamp only
    #[serde(rename = "missing_order")]
    MissingOrder {
        membership: Membership,
        container: String,
        item_id: String,
    },
    /// Order keys are unique but not 0..n-1
    #[serde(rename = "sparse_order")]
    SparseOrder {
        membership: Membership,
        container: String,
    },
    /// Block edges are not on the snap grid
    #[serde(rename = "unaligned_block")]
    UnalignedBlock { item_id: String },
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a board's items and return structured results.
///
/// Read-only. Checks performed:
/// 1. Item ids are unique
/// 2. Order keys are unique inside every container of every grouping
/// 3. Scheduled blocks are inside the grid and long enough
/// 4. Warnings for absent or sparse order keys and off-grid block edges
pub fn check_items(items: &[Item], grid: &GridConfig) -> CheckResult {
    let mut result = CheckResult::default();

    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for item in items {
        if !seen.insert(item.id.as_str()) && reported.insert(item.id.as_str()) {
            result.errors.push(CheckError::DuplicateId {
                item_id: item.id.clone(),
            });
        }
    }

    for membership in MEMBERSHIPS {
        for key in move_ops::container_keys(items, membership) {
            let members = move_ops::container(items, membership, &key);
            check_container(&members, membership, &key, &mut result);
        }
    }

    for item in items {
        check_block(item, grid, &mut result);
    }

    result.valid = result.errors.is_empty();
    result
}

// ---------------------------------------------------------------------------
// Per-container validation
// ---------------------------------------------------------------------------

fn check_container(members: &[Item], membership: Membership, key: &str, result: &mut CheckResult) {
    let mut by_order: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    let mut clean = true;

    for item in members {
        match item.order {
            Some(order) => by_order.entry(order).or_default().push(item.id.clone()),
            None => {
                clean = false;
                result.warnings.push(CheckWarning::MissingOrder {
                    membership,
                    container: key.to_string(),
                    item_id: item.id.clone(),
                });
            }
        }
    }

    for (order, item_ids) in &by_order {
        if item_ids.len() > 1 {
            clean = false;
            result.errors.push(CheckError::DuplicateOrder {
                membership,
                container: key.to_string(),
                order: *order,
                item_ids: item_ids.clone(),
            });
        }
    }

    let dense = by_order.keys().copied().eq(0..members.len() as i64);
    if clean && !dense {
        result.warnings.push(CheckWarning::SparseOrder {
            membership,
            container: key.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Per-block validation
// ---------------------------------------------------------------------------

fn check_block(item: &Item, grid: &GridConfig, result: &mut CheckResult) {
    let Some(block) = &item.block else {
        return;
    };

    if NaiveDate::parse_from_str(&block.day, DAY_KEY_FORMAT).is_err() {
        result.errors.push(CheckError::InvalidBlockDay {
            item_id: item.id.clone(),
            day: block.day.clone(),
        });
    }
    if block.start < grid.grid_start() || block.end > grid.grid_end() {
        result.errors.push(CheckError::BlockOutOfBounds {
            item_id: item.id.clone(),
            start: block.start,
            end: block.end,
        });
    }
    if block.duration() < i32::try_from(grid.min_duration).unwrap_or(i32::MAX) {
        result.errors.push(CheckError::BlockTooShort {
            item_id: item.id.clone(),
            minutes: block.duration(),
        });
    }

    let step = i32::try_from(grid.snap_minutes.max(1)).unwrap_or(i32::MAX);
    if block.start % step != 0 || block.end % step != 0 {
        result.warnings.push(CheckWarning::UnalignedBlock {
            item_id: item.id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::TimeBlock;
    use pretty_assertions::assert_eq;

    fn item(id: &str, status: &str, order: Option<i64>) -> Item {
        let mut item = Item::new(id, "2025-05-01T09:00:00Z");
        item.status = Some(status.into());
        item.order = order;
        item
    }

    #[test]
    fn dense_board_is_valid() {
        let items = vec![
            item("a", "todo", Some(0)),
            item("b", "todo", Some(1)),
            item("c", "done", Some(0)),
        ];
        let result = check_items(&items, &GridConfig::default());
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn duplicate_orders_are_errors() {
        let items = vec![
            item("a", "todo", Some(1)),
            item("b", "todo", Some(1)),
            item("c", "todo", Some(0)),
        ];
        let result = check_items(&items, &GridConfig::default());
        assert!(!result.valid);
        assert_eq!(
            result.errors,
            vec![CheckError::DuplicateOrder {
                membership: Membership::Status,
                container: "todo".into(),
                order: 1,
                item_ids: vec!["a".into(), "b".into()],
            }]
        );
    }

    #[test]
    fn absent_and_sparse_orders_are_warnings() {
        let items = vec![
            item("a", "todo", Some(0)),
            item("b", "todo", None),
            item("c", "done", Some(3)),
            item("d", "done", Some(7)),
        ];
        let result = check_items(&items, &GridConfig::default());
        assert!(result.valid);
        assert_eq!(
            result.warnings,
            vec![
                CheckWarning::MissingOrder {
                    membership: Membership::Status,
                    container: "todo".into(),
                    item_id: "b".into(),
                },
                CheckWarning::SparseOrder {
                    membership: Membership::Status,
                    container: "done".into(),
                },
            ]
        );
    }

    #[test]
    fn blocks_outside_grid_are_errors() {
        let mut early = item("early", "todo", Some(0));
        early.block = Some(TimeBlock::new("2025-05-05", 300, 360));
        let mut short = item("short", "todo", Some(1));
        short.block = Some(TimeBlock::new("2025-05-05", 600, 605));
        let mut bad_day = item("bad", "todo", Some(2));
        bad_day.block = Some(TimeBlock::new("someday", 600, 660));

        let result = check_items(&[early, short, bad_day], &GridConfig::default());
        assert_eq!(
            result.errors,
            vec![
                CheckError::BlockOutOfBounds {
                    item_id: "early".into(),
                    start: 300,
                    end: 360,
                },
                CheckError::BlockTooShort {
                    item_id: "short".into(),
                    minutes: 5,
                },
                CheckError::InvalidBlockDay {
                    item_id: "bad".into(),
                    day: "someday".into(),
                },
            ]
        );
        assert_eq!(
            result.warnings,
            vec![CheckWarning::UnalignedBlock {
                item_id: "short".into(),
            }]
        );
    }

    #[test]
    fn duplicate_ids_reported_once() {
        let items = vec![
            item("a", "todo", Some(0)),
            item("a", "done", Some(0)),
            item("a", "later", Some(0)),
        ];
        let result = check_items(&items, &GridConfig::default());
        assert_eq!(
            result.errors,
            vec![CheckError::DuplicateId {
                item_id: "a".into()
            }]
        );
    }
}
