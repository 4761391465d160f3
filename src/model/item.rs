use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::block::TimeBlock;

/// Date format used for planner day keys
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Error type for model-level attribute changes
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid day key: {0}")]
    InvalidDayKey(String),
}

/// Anything the sequencer can put in order.
///
/// An item with no `order` sorts after every item that has one; ties are
/// broken by the fallback timestamp, most recent first.
pub trait Ordered {
    fn id(&self) -> &str;
    fn order(&self) -> Option<i64>;
    /// RFC 3339 timestamp used as the tie-break
    fn fallback_timestamp(&self) -> &str;
}

/// A tracked item as the engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable item ID
    pub id: String,
    /// Display title (carried through, never edited here)
    #[serde(default)]
    pub title: String,
    /// Position inside the item's current container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Last-touched timestamp (RFC 3339)
    pub updated_at: String,
    /// Board column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// List section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Planner date (the time of day is kept across day moves)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDateTime>,
    /// Time-grid placement, if scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<TimeBlock>,
    /// Size hint used when dropping onto the time grid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate_minutes: Option<u32>,
}

impl Item {
    /// Create an item with only the ordering fields set
    pub fn new(id: impl Into<String>, updated_at: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            title: String::new(),
            order: None,
            updated_at: updated_at.into(),
            status: None,
            section: None,
            due: None,
            block: None,
            estimate_minutes: None,
        }
    }

    /// The key of the container this item belongs to under `membership`
    pub fn container_key(&self, membership: Membership) -> Option<String> {
        membership.key_of(self)
    }
}

impl Ordered for Item {
    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> Option<i64> {
        self.order
    }

    fn fallback_timestamp(&self) -> &str {
        &self.updated_at
    }
}

/// Which attribute defines container membership.
///
/// Boards group by status, lists by section, planners by the date part of
/// `due`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    Status,
    Section,
    Day,
}

impl Membership {
    pub fn key_of(self, item: &Item) -> Option<String> {
        match self {
            Membership::Status => item.status.clone(),
            Membership::Section => item.section.clone(),
            Membership::Day => item
                .due
                .map(|due| due.date().format(DAY_KEY_FORMAT).to_string()),
        }
    }

    /// Move `item` into the container identified by `key`.
    pub fn assign(self, item: &mut Item, key: &str) -> Result<(), ModelError> {
        match self {
            Membership::Status => item.status = Some(key.to_string()),
            Membership::Section => item.section = Some(key.to_string()),
            Membership::Day => {
                let date = NaiveDate::parse_from_str(key, DAY_KEY_FORMAT)
                    .map_err(|_| ModelError::InvalidDayKey(key.to_string()))?;
                let time = item.due.map(|d| d.time()).unwrap_or_default();
                item.due = Some(date.and_time(time));
            }
        }
        Ok(())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Membership::Status => "status",
            Membership::Section => "section",
            Membership::Day => "day",
        }
    }
}

impl std::fmt::Display for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Membership {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(Membership::Status),
            "section" => Ok(Membership::Section),
            "day" => Ok(Membership::Day),
            other => Err(format!("unknown membership: {}", other)),
        }
    }
}
