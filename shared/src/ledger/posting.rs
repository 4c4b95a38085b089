//! Posting confirmed receipts and approved issues onto a single ledger row

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use super::ReceiptLine;

/// The stored fields of a ledger row that a receipt can change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerPosition {
    pub quantity_balance: Decimal,
    pub unit_price: Option<Decimal>,
    pub expiry_date: NaiveDate,
    pub last_in_date: NaiveDate,
}

/// Merge a receipt into the row for its (item, lot, location)
///
/// A missing row starts from the receipt itself. An existing row gains the
/// quantity and the receipt date, keeps its price when the receipt has none,
/// and keeps its expiry unless `replace_expiry` is set.
pub fn merge_receipt(
    existing: Option<&LedgerPosition>,
    line: &ReceiptLine,
    replace_expiry: bool,
) -> LedgerPosition {
    match existing {
        None => LedgerPosition {
            quantity_balance: line.quantity,
            unit_price: line.unit_price,
            expiry_date: line.expiry_date,
            last_in_date: line.import_date,
        },
        Some(row) => LedgerPosition {
            quantity_balance: row.quantity_balance + line.quantity,
            unit_price: line.unit_price.or(row.unit_price),
            expiry_date: if replace_expiry {
                line.expiry_date
            } else {
                row.expiry_date
            },
            last_in_date: line.import_date,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("requested {requested} but only {available} on hand")]
pub struct Shortfall {
    pub requested: Decimal,
    pub available: Decimal,
}

/// Quantity left on a row after issuing `requested` from it
pub fn plan_issue(available: Decimal, requested: Decimal) -> Result<Decimal, Shortfall> {
    if requested > available {
        return Err(Shortfall {
            requested,
            available,
        });
    }
    Ok(available - requested)
}
