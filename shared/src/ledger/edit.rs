//! Ledger adjustments for edits and cancellations of confirmed receipts

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::BalanceKey;

/// The ledger-relevant fields of a stock receipt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub item_id: Uuid,
    pub lot_no: String,
    pub location: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub import_date: NaiveDate,
}

impl ReceiptLine {
    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.item_id, self.lot_no.clone(), self.location.clone())
    }
}

/// What an edit of a confirmed receipt does to the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReceiptAdjustment {
    /// Item, lot or location changed: take the old quantity off the old row
    /// and receive the new line into its own row
    Relocate {
        from: BalanceKey,
        remove: Decimal,
        to: BalanceKey,
    },
    /// Same row, quantity changed by `delta` (may be negative)
    AdjustQuantity { key: BalanceKey, delta: Decimal },
    /// Same row and quantity; only price and expiry are refreshed
    RefreshAttributes { key: BalanceKey },
}

pub fn plan_receipt_adjustment(old: &ReceiptLine, new: &ReceiptLine) -> ReceiptAdjustment {
    let from = old.key();
    let to = new.key();

    if from != to {
        return ReceiptAdjustment::Relocate {
            from,
            remove: old.quantity,
            to,
        };
    }

    let delta = new.quantity - old.quantity;
    if delta.is_zero() {
        ReceiptAdjustment::RefreshAttributes { key: to }
    } else {
        ReceiptAdjustment::AdjustQuantity { key: to, delta }
    }
}

/// Outcome of taking quantity away from a row outside the issuing path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EditedQuantity {
    /// Nothing meaningful is left; the row is dropped
    Remove,
    Keep(Decimal),
}

/// Apply a signed change to a row's quantity; zero or less removes the row
pub fn reduce_for_edit(current: Decimal, delta: Decimal) -> EditedQuantity {
    let next = current + delta;
    if next <= Decimal::ZERO {
        EditedQuantity::Remove
    } else {
        EditedQuantity::Keep(next)
    }
}
