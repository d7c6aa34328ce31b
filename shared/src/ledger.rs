//! Stock quantity reconciliation rules
//!
//! Every write path that touches `quantity` goes through one of these
//! functions: item creation, manual receive and issue, POS sale creation and
//! sale deletion. They are pure; the backend services call them between
//! locking the stock row and writing it back.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::{HistoryDraft, Movement, MovementColumns, StockSnapshot};

/// Violations of the stock reconciliation rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(i32),

    #[error("Quantity cannot be negative, got {0}")]
    NegativeQuantity(i32),

    #[error("Reorder level cannot be negative, got {0}")]
    NegativeReorderLevel(i32),

    #[error("Price cannot be negative")]
    NegativePrice,

    #[error("Price cannot exceed {}", MAX_PRICE)]
    PriceTooLarge,

    #[error("Subtotal must be between 0 and {}", MAX_SUBTOTAL)]
    SubtotalOutOfRange,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i32, available: i32 },

    #[error("Quantity out of range")]
    Overflow,
}

impl LedgerError {
    /// Input field the error refers to
    pub fn field(&self) -> &'static str {
        match self {
            LedgerError::NonPositiveQuantity(_)
            | LedgerError::NegativeQuantity(_)
            | LedgerError::Overflow => "quantity",
            LedgerError::NegativeReorderLevel(_) => "reorder_level",
            LedgerError::NegativePrice | LedgerError::PriceTooLarge => "price",
            LedgerError::SubtotalOutOfRange => "subtotal",
            LedgerError::InsufficientStock { .. } => "quantity_sold",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Largest unit price a `NUMERIC(10,2)` column holds
pub const MAX_PRICE: Decimal = Decimal::from_parts(1410065407, 2, 0, false, 2); // 99_999_999_99 with scale 2

/// Largest sale subtotal a `NUMERIC(15,2)` column holds
pub const MAX_SUBTOTAL: Decimal = Decimal::from_parts(2764472319, 232830, 0, false, 2); // 9_999_999_999_999_99 with scale 2

/// Result of applying a manual movement to a stock row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementOutcome {
    /// New authoritative quantity
    pub quantity: i32,
    pub columns: MovementColumns,
    pub history: HistoryDraft,
}

/// Check the initial values of a new item
pub fn validate_new_item(quantity: i32, reorder_level: i32, price: Option<Decimal>) -> LedgerResult<()> {
    if quantity < 0 {
        return Err(LedgerError::NegativeQuantity(quantity));
    }
    validate_reorder_level(reorder_level)?;
    validate_price(price)
}

pub fn validate_reorder_level(reorder_level: i32) -> LedgerResult<()> {
    if reorder_level < 0 {
        return Err(LedgerError::NegativeReorderLevel(reorder_level));
    }
    Ok(())
}

pub fn validate_price(price: Option<Decimal>) -> LedgerResult<()> {
    match price {
        Some(p) if p.is_sign_negative() && !p.is_zero() => Err(LedgerError::NegativePrice),
        Some(p) if p > MAX_PRICE => Err(LedgerError::PriceTooLarge),
        _ => Ok(()),
    }
}

fn validate_subtotal(subtotal: Decimal) -> LedgerResult<Decimal> {
    if (subtotal.is_sign_negative() && !subtotal.is_zero()) || subtotal > MAX_SUBTOTAL {
        return Err(LedgerError::SubtotalOutOfRange);
    }
    Ok(subtotal)
}

/// Apply a receive or issue to the current row.
///
/// Receive adds the delta and resets the stored issue delta to 0; issue
/// subtracts it and resets the stored receive delta. Issue does not refuse
/// to go below zero: manual issues are trusted the same way the stock edit
/// form is, callers decide whether to warn.
pub fn apply_movement(snapshot: &StockSnapshot, movement: &Movement) -> LedgerResult<MovementOutcome> {
    let delta = movement.quantity();
    if delta <= 0 {
        return Err(LedgerError::NonPositiveQuantity(delta));
    }

    let base = HistoryDraft::from_snapshot(snapshot);

    let outcome = match movement {
        Movement::Receive { received_by, .. } => {
            let quantity = snapshot
                .quantity
                .checked_add(delta)
                .ok_or(LedgerError::Overflow)?;
            MovementOutcome {
                quantity,
                columns: MovementColumns {
                    receive_quantity: delta,
                    receive_by: Some(received_by.clone()),
                    issue_quantity: 0,
                    issue_by: None,
                    issue_to: None,
                },
                history: HistoryDraft {
                    quantity,
                    receive_quantity: Some(delta),
                    receive_by: Some(received_by.clone()),
                    ..base
                },
            }
        }
        Movement::Issue {
            issued_by,
            issued_to,
            ..
        } => {
            let quantity = snapshot
                .quantity
                .checked_sub(delta)
                .ok_or(LedgerError::Overflow)?;
            MovementOutcome {
                quantity,
                columns: MovementColumns {
                    receive_quantity: 0,
                    receive_by: None,
                    issue_quantity: delta,
                    issue_by: Some(issued_by.clone()),
                    issue_to: issued_to.clone(),
                },
                history: HistoryDraft {
                    quantity,
                    issue_quantity: Some(delta),
                    issue_by: Some(issued_by.clone()),
                    issue_to: Some(issued_to.clone().unwrap_or_default()),
                    ..base
                },
            }
        }
    };

    Ok(outcome)
}

/// Stock and revenue effect of a new sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SalePlan {
    /// Quantity left on the item after the sale
    pub remaining_quantity: i32,
    pub subtotal: Decimal,
}

pub fn compute_subtotal(quantity_sold: i32, selling_price: Decimal) -> LedgerResult<Decimal> {
    Decimal::from(quantity_sold)
        .checked_mul(selling_price)
        .ok_or(LedgerError::Overflow)
        .and_then(validate_subtotal)
}

/// Validate a sale against the current quantity and work out its effect.
///
/// A subtotal supplied by the caller is kept as is once it is range-checked;
/// it is only computed when absent.
pub fn plan_sale(
    available: i32,
    quantity_sold: i32,
    selling_price: Decimal,
    subtotal: Option<Decimal>,
) -> LedgerResult<SalePlan> {
    if quantity_sold <= 0 {
        return Err(LedgerError::NonPositiveQuantity(quantity_sold));
    }
    validate_price(Some(selling_price))?;
    if quantity_sold > available {
        return Err(LedgerError::InsufficientStock {
            requested: quantity_sold,
            available,
        });
    }

    let subtotal = match subtotal {
        Some(given) => validate_subtotal(given)?,
        None => compute_subtotal(quantity_sold, selling_price)?,
    };

    Ok(SalePlan {
        remaining_quantity: available - quantity_sold,
        subtotal,
    })
}

/// Quantity to write back when a sale is deleted.
///
/// `None` means the item no longer exists and nothing can be restored.
pub fn restore_after_sale_deletion(
    item_quantity: Option<i32>,
    quantity_sold: i32,
) -> LedgerResult<Option<i32>> {
    item_quantity
        .map(|q| q.checked_add(quantity_sold).ok_or(LedgerError::Overflow))
        .transpose()
}

/// Whether an item should be flagged for restocking
pub fn needs_reorder(quantity: i32, reorder_level: i32) -> bool {
    reorder_level > 0 && quantity <= reorder_level
}
