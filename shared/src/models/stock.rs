//! Stock item snapshots and manual stock movements

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The fields of a stock row that the reconciliation rules read
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSnapshot {
    pub id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub reorder_level: i32,
    pub supplier_id: Option<i64>,
}

/// A manual stock movement entered by staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Movement {
    /// Delivery from a supplier
    Receive { quantity: i32, received_by: String },
    /// Removal for internal use or distribution
    Issue {
        quantity: i32,
        issued_by: String,
        issued_to: Option<String>,
    },
}

impl Movement {
    /// The delta just entered, always reported as a positive count
    pub fn quantity(&self) -> i32 {
        match self {
            Movement::Receive { quantity, .. } | Movement::Issue { quantity, .. } => *quantity,
        }
    }

    pub fn kind(&self) -> MovementKind {
        match self {
            Movement::Receive { .. } => MovementKind::Receive,
            Movement::Issue { .. } => MovementKind::Issue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receive,
    Issue,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receive => "receive",
            MovementKind::Issue => "issue",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-movement columns written back onto the stock row.
///
/// A `None` actor or recipient leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementColumns {
    pub receive_quantity: i32,
    pub receive_by: Option<String>,
    pub issue_quantity: i32,
    pub issue_by: Option<String>,
    pub issue_to: Option<String>,
}
