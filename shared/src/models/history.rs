//! Audit trail drafts
//!
//! A draft carries everything a history row stores except the timestamps,
//! which the database assigns when the row is written.

use rust_decimal::Decimal;
use serde::Serialize;

use super::StockSnapshot;

/// An audit row about to be appended to the stock history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryDraft {
    pub stock_id: i64,
    pub item_name: String,
    /// Quantity after the mutation was applied
    pub quantity: i32,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub receive_quantity: Option<i32>,
    pub receive_by: Option<String>,
    pub issue_quantity: Option<i32>,
    pub issue_by: Option<String>,
    pub issue_to: Option<String>,
    pub created_by: Option<String>,
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<i64>,
}

impl HistoryDraft {
    /// Snapshot of an item with every movement field left blank
    pub fn from_snapshot(snapshot: &StockSnapshot) -> Self {
        Self {
            stock_id: snapshot.id,
            item_name: snapshot.item_name.clone(),
            quantity: snapshot.quantity,
            category: snapshot.category.clone(),
            brand: snapshot.brand.clone(),
            price: snapshot.price,
            receive_quantity: None,
            receive_by: None,
            issue_quantity: None,
            issue_by: None,
            issue_to: None,
            created_by: None,
            reorder_level: Some(snapshot.reorder_level),
            supplier_id: snapshot.supplier_id,
        }
    }

    /// Entry written when an item is first added
    pub fn item_created(snapshot: &StockSnapshot, created_by: &str) -> Self {
        Self {
            created_by: Some(created_by.to_string()),
            ..Self::from_snapshot(snapshot)
        }
    }

    /// True when neither a receive nor an issue delta is recorded
    pub fn is_creation(&self) -> bool {
        self.receive_quantity.is_none() && self.issue_quantity.is_none()
    }
}
