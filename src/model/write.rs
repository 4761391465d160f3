use serde::{Deserialize, Serialize};

use super::block::TimeBlock;
use super::item::Membership;

/// A dense order assignment produced by a reindex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: String,
    pub order: i64,
}

impl OrderUpdate {
    pub fn new(id: impl Into<String>, order: i64) -> Self {
        OrderUpdate {
            id: id.into(),
            order,
        }
    }
}

/// One field change on one item. Every gesture reduces to a list of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Write {
    /// Set the item's order key
    Order { id: String, order: i64 },
    /// Move the item into another container
    Container {
        id: String,
        membership: Membership,
        key: String,
    },
    /// Place the item on the time grid, or clear its placement
    Schedule {
        id: String,
        block: Option<TimeBlock>,
    },
}

impl Write {
    pub fn id(&self) -> &str {
        match self {
            Write::Order { id, .. } | Write::Container { id, .. } | Write::Schedule { id, .. } => {
                id
            }
        }
    }
}

impl From<OrderUpdate> for Write {
    fn from(update: OrderUpdate) -> Self {
        Write::Order {
            id: update.id,
            order: update.order,
        }
    }
}
