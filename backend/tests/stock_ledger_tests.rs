//! Stock reconciliation tests
//!
//! Tests for the quantity rules shared by every write path:
//! - Receive and issue movements and their history drafts
//! - POS sales and sale deletion
//! - Conservation of quantity over arbitrary operation sequences

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::ledger::{
    apply_movement, needs_reorder, plan_sale, restore_after_sale_deletion, LedgerError,
};
use shared::models::{HistoryDraft, Movement, StockSnapshot};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn snapshot(quantity: i32) -> StockSnapshot {
    StockSnapshot {
        id: 1,
        item_name: "Widget".to_string(),
        quantity,
        category: Some("Tools".to_string()),
        brand: Some("Acme".to_string()),
        price: Some(dec("2.50")),
        reorder_level: 5,
        supplier_id: Some(3),
    }
}

fn receive(quantity: i32) -> Movement {
    Movement::Receive {
        quantity,
        received_by: "alice".to_string(),
    }
}

fn issue(quantity: i32, to: Option<&str>) -> Movement {
    Movement::Issue {
        quantity,
        issued_by: "bob".to_string(),
        issued_to: to.map(String::from),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Item created with 10, receive 5, issue 3, sell 4, delete the sale
    #[test]
    fn test_item_lifecycle() {
        let mut item = snapshot(10);
        let created = HistoryDraft::item_created(&item, "alice");
        assert!(created.is_creation());
        assert_eq!(created.quantity, 10);
        assert_eq!(created.created_by.as_deref(), Some("alice"));

        let received = apply_movement(&item, &receive(5)).unwrap();
        assert_eq!(received.quantity, 15);
        assert_eq!(received.history.receive_quantity, Some(5));
        item.quantity = received.quantity;

        let issued = apply_movement(&item, &issue(3, Some("Workshop"))).unwrap();
        assert_eq!(issued.quantity, 12);
        assert_eq!(issued.history.issue_to.as_deref(), Some("Workshop"));
        item.quantity = issued.quantity;

        let sale = plan_sale(item.quantity, 4, dec("2.50"), None).unwrap();
        assert_eq!(sale.remaining_quantity, 8);
        assert_eq!(sale.subtotal, dec("10.00"));
        item.quantity = sale.remaining_quantity;

        let restored = restore_after_sale_deletion(Some(item.quantity), 4).unwrap();
        assert_eq!(restored, Some(12));
    }

    /// History snapshots carry the item's details at the time of the movement
    #[test]
    fn test_history_snapshot_fields() {
        let outcome = apply_movement(&snapshot(7), &receive(2)).unwrap();
        let history = outcome.history;
        assert_eq!(history.stock_id, 1);
        assert_eq!(history.item_name, "Widget");
        assert_eq!(history.brand.as_deref(), Some("Acme"));
        assert_eq!(history.reorder_level, Some(5));
        assert_eq!(history.supplier_id, Some(3));
        assert!(history.issue_quantity.is_none());
        assert!(!history.is_creation());
    }

    /// The last-movement columns only describe the latest movement
    #[test]
    fn test_movement_columns_reset_other_side() {
        let received = apply_movement(&snapshot(4), &receive(6)).unwrap();
        assert_eq!(received.columns.receive_quantity, 6);
        assert_eq!(received.columns.issue_quantity, 0);

        let issued = apply_movement(&snapshot(4), &issue(1, None)).unwrap();
        assert_eq!(issued.columns.receive_quantity, 0);
        assert_eq!(issued.columns.issue_quantity, 1);
        assert_eq!(issued.history.issue_to.as_deref(), Some(""));
    }

    /// Selling more than is on hand is refused and names both figures
    #[test]
    fn test_oversell_error_message() {
        let err = plan_sale(3, 5, dec("1.00"), None).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                requested: 5,
                available: 3
            }
        );
        assert_eq!(err.to_string(), "Insufficient stock: requested 5, available 3");
        assert_eq!(err.field(), "quantity_sold");
    }

    /// Deleting a sale of a deleted item restores nothing
    #[test]
    fn test_sale_deletion_after_item_deleted() {
        assert_eq!(restore_after_sale_deletion(None, 4).unwrap(), None);
    }

    /// A manual issue may take an item below zero
    #[test]
    fn test_issue_can_go_negative() {
        let outcome = apply_movement(&snapshot(2), &issue(5, None)).unwrap();
        assert_eq!(outcome.quantity, -3);
        assert!(needs_reorder(outcome.quantity, 5));
    }

    /// Reorder flag boundaries
    #[test]
    fn test_reorder_boundaries() {
        assert!(needs_reorder(5, 5));
        assert!(!needs_reorder(6, 5));
        assert!(!needs_reorder(0, 0));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Receive(i32),
    Issue(i32),
    Sell(i32),
    /// Delete the n-th still recorded sale, modulo the number of sales
    DeleteSale(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i32..500).prop_map(Op::Receive),
        (1i32..200).prop_map(Op::Issue),
        (1i32..200).prop_map(Op::Sell),
        (0usize..16).prop_map(Op::DeleteSale),
    ]
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    /// Property: the stored quantity always equals the initial quantity plus
    /// receipts minus issues minus sales still on record
    #[test]
    fn prop_quantity_is_conserved(
        initial in 0i32..1_000,
        ops in prop::collection::vec(op_strategy(), 0..40),
    ) {
        let mut item = snapshot(initial);
        let mut sales: Vec<i32> = Vec::new();
        let mut received = 0i64;
        let mut issued = 0i64;

        for op in ops {
            match op {
                Op::Receive(q) => {
                    let outcome = apply_movement(&item, &receive(q)).unwrap();
                    item.quantity = outcome.quantity;
                    received += i64::from(q);
                }
                Op::Issue(q) => {
                    let outcome = apply_movement(&item, &issue(q, None)).unwrap();
                    item.quantity = outcome.quantity;
                    issued += i64::from(q);
                }
                Op::Sell(q) => match plan_sale(item.quantity, q, dec("1.00"), None) {
                    Ok(plan) => {
                        prop_assert!(plan.remaining_quantity >= 0);
                        item.quantity = plan.remaining_quantity;
                        sales.push(q);
                    }
                    Err(LedgerError::InsufficientStock { requested, available }) => {
                        prop_assert_eq!(requested, q);
                        prop_assert!(requested > available);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {}", e),
                },
                Op::DeleteSale(n) => {
                    if !sales.is_empty() {
                        let sold = sales.remove(n % sales.len());
                        item.quantity = restore_after_sale_deletion(Some(item.quantity), sold)
                            .unwrap()
                            .unwrap();
                    }
                }
            }
        }

        let on_record: i64 = sales.iter().map(|&q| i64::from(q)).sum();
        prop_assert_eq!(
            i64::from(item.quantity),
            i64::from(initial) + received - issued - on_record
        );
    }

    /// Property: the history draft of a movement reports the quantity after it
    #[test]
    fn prop_history_matches_new_quantity(
        initial in -1_000i32..1_000,
        delta in 1i32..1_000,
        is_receive in any::<bool>(),
    ) {
        let movement = if is_receive { receive(delta) } else { issue(delta, Some("Shop")) };
        let outcome = apply_movement(&snapshot(initial), &movement).unwrap();
        prop_assert_eq!(outcome.history.quantity, outcome.quantity);
        prop_assert_eq!(outcome.quantity - initial, if is_receive { delta } else { -delta });
    }

    /// Property: a computed subtotal is quantity times price, a given one is kept
    #[test]
    fn prop_subtotal(
        quantity in 1i32..100,
        price in price_strategy(),
        given in prop::option::of(price_strategy()),
    ) {
        let plan = plan_sale(100, quantity, price, given).unwrap();
        match given {
            Some(subtotal) => prop_assert_eq!(plan.subtotal, subtotal),
            None => prop_assert_eq!(plan.subtotal, Decimal::from(quantity) * price),
        }
    }

    /// Property: zero and negative deltas are always rejected
    #[test]
    fn prop_non_positive_movement_rejected(delta in -1_000i32..=0) {
        prop_assert_eq!(
            apply_movement(&snapshot(10), &receive(delta)).unwrap_err(),
            LedgerError::NonPositiveQuantity(delta)
        );
        prop_assert!(plan_sale(10, delta, dec("1.00"), None).is_err());
    }
}
