//! In-memory fold used to rebuild the whole balance ledger from history

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BalanceKey, BalanceStatus, DerivedBalance, ItemThresholds};

/// A confirmed receipt as read back for the rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptEntry {
    pub item_id: Uuid,
    pub lot_no: String,
    pub location: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub import_date: NaiveDate,
}

/// An approved issue as read back for the rebuild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEntry {
    pub stock_out_id: Uuid,
    pub item_id: Uuid,
    pub lot_no: String,
    pub quantity: Decimal,
    pub out_date: NaiveDate,
}

/// One ledger row produced by the rebuild, ready to persist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuiltBalance {
    pub key: BalanceKey,
    pub expiry_date: NaiveDate,
    pub quantity_balance: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub last_in_date: NaiveDate,
    pub last_out_date: Option<NaiveDate>,
    pub status: BalanceStatus,
    pub days_to_expiry: i64,
}

impl RebuiltBalance {
    pub fn is_negative(&self) -> bool {
        self.quantity_balance < Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRebuild {
    pub balances: Vec<RebuiltBalance>,
    /// Approved issues whose (item, lot) never appeared in a confirmed receipt
    pub unmatched_issues: Vec<IssueEntry>,
}

impl LedgerRebuild {
    pub fn negative_balances(&self) -> impl Iterator<Item = &RebuiltBalance> {
        self.balances.iter().filter(|b| b.is_negative())
    }
}

struct Accumulator {
    key: BalanceKey,
    expiry_date: NaiveDate,
    quantity: Decimal,
    unit_price: Option<Decimal>,
    last_in_date: NaiveDate,
    last_out_date: Option<NaiveDate>,
}

/// Fold receipts and issues into a fresh ledger
///
/// Receipts are applied in receipt-date order and issues in issue-date order;
/// the sort is stable so rows sharing a date keep the caller's order. Each
/// ledger row keeps the expiry of the first receipt that created it and the
/// most recent known unit price. An issue is charged against the first row
/// created for its item and lot, whatever the location. Quantities are not
/// clamped: an over-issued row comes back negative.
///
/// Items missing from `thresholds` are classified with a zero minimum and no
/// expiry alert window.
pub fn rebuild_ledger(
    mut receipts: Vec<ReceiptEntry>,
    mut issues: Vec<IssueEntry>,
    thresholds: &HashMap<Uuid, ItemThresholds>,
    today: NaiveDate,
) -> LedgerRebuild {
    receipts.sort_by_key(|r| r.import_date);
    issues.sort_by_key(|i| i.out_date);

    let mut rows: Vec<Accumulator> = Vec::new();
    let mut index: HashMap<BalanceKey, usize> = HashMap::new();
    let mut first_by_lot: HashMap<(Uuid, String), usize> = HashMap::new();

    for receipt in receipts {
        let key = BalanceKey::new(receipt.item_id, receipt.lot_no.clone(), receipt.location.clone());
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = rows.len();
                rows.push(Accumulator {
                    key: key.clone(),
                    expiry_date: receipt.expiry_date,
                    quantity: Decimal::ZERO,
                    unit_price: None,
                    last_in_date: receipt.import_date,
                    last_out_date: None,
                });
                index.insert(key, slot);
                first_by_lot
                    .entry((receipt.item_id, receipt.lot_no.clone()))
                    .or_insert(slot);
                slot
            }
        };

        let row = &mut rows[slot];
        row.quantity += receipt.quantity;
        row.last_in_date = receipt.import_date;
        if receipt.unit_price.is_some() {
            row.unit_price = receipt.unit_price;
        }
    }

    let mut unmatched_issues = Vec::new();
    for issue in issues {
        match first_by_lot.get(&(issue.item_id, issue.lot_no.clone())) {
            Some(&slot) => {
                let row = &mut rows[slot];
                row.quantity -= issue.quantity;
                row.last_out_date = Some(issue.out_date);
            }
            None => unmatched_issues.push(issue),
        }
    }

    let fallback = ItemThresholds::new(Decimal::ZERO, 0);
    let balances = rows
        .into_iter()
        .map(|row| {
            let item_thresholds = thresholds.get(&row.key.item_id).unwrap_or(&fallback);
            let derived = DerivedBalance::compute(
                row.quantity,
                row.unit_price,
                row.expiry_date,
                item_thresholds,
                today,
            );
            RebuiltBalance {
                key: row.key,
                expiry_date: row.expiry_date,
                quantity_balance: row.quantity,
                unit_price: row.unit_price,
                total_value: derived.total_value,
                last_in_date: row.last_in_date,
                last_out_date: row.last_out_date,
                status: derived.status,
                days_to_expiry: derived.days_to_expiry,
            }
        })
        .collect();

    LedgerRebuild {
        balances,
        unmatched_issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn receipt(item: Uuid, lot: &str, location: &str, qty: i64, price: Option<i64>, day: u32) -> ReceiptEntry {
        ReceiptEntry {
            item_id: item,
            lot_no: lot.to_string(),
            location: location.to_string(),
            expiry_date: date(2027, 1, 1),
            quantity: Decimal::from(qty),
            unit_price: price.map(Decimal::from),
            import_date: date(2026, 1, day),
        }
    }

    fn issue(item: Uuid, lot: &str, qty: i64, day: u32) -> IssueEntry {
        IssueEntry {
            stock_out_id: Uuid::new_v4(),
            item_id: item,
            lot_no: lot.to_string(),
            quantity: Decimal::from(qty),
            out_date: date(2026, 1, day),
        }
    }

    #[test]
    fn receipts_and_issues_net_out() {
        let item = Uuid::new_v4();
        let mut thresholds = HashMap::new();
        thresholds.insert(item, ItemThresholds::new(Decimal::from(10), 30));

        let rebuild = rebuild_ledger(
            vec![receipt(item, "L1", "Shelf A", 500, Some(5), 1)],
            vec![issue(item, "L1", 50, 2)],
            &thresholds,
            date(2026, 1, 3),
        );

        assert_eq!(rebuild.balances.len(), 1);
        let row = &rebuild.balances[0];
        assert_eq!(row.quantity_balance, Decimal::from(450));
        assert_eq!(row.total_value, Some(Decimal::from(2250)));
        assert_eq!(row.last_out_date, Some(date(2026, 1, 2)));
        assert_eq!(row.status, BalanceStatus::Normal);
    }

    #[test]
    fn later_price_wins_and_missing_price_keeps_previous() {
        let item = Uuid::new_v4();
        let rebuild = rebuild_ledger(
            vec![
                receipt(item, "L1", "Shelf A", 10, Some(5), 1),
                receipt(item, "L1", "Shelf A", 10, Some(7), 2),
                receipt(item, "L1", "Shelf A", 10, None, 3),
            ],
            vec![],
            &HashMap::new(),
            date(2026, 1, 4),
        );

        let row = &rebuild.balances[0];
        assert_eq!(row.quantity_balance, Decimal::from(30));
        assert_eq!(row.unit_price, Some(Decimal::from(7)));
        assert_eq!(row.last_in_date, date(2026, 1, 3));
    }

    #[test]
    fn issue_hits_first_location_for_the_lot() {
        let item = Uuid::new_v4();
        let rebuild = rebuild_ledger(
            vec![
                receipt(item, "L1", "Shelf A", 10, None, 1),
                receipt(item, "L1", "Shelf B", 10, None, 2),
            ],
            vec![issue(item, "L1", 15, 3)],
            &HashMap::new(),
            date(2026, 1, 4),
        );

        assert_eq!(rebuild.balances[0].key.location, "Shelf A");
        assert_eq!(rebuild.balances[0].quantity_balance, Decimal::from(-5));
        assert_eq!(rebuild.balances[1].quantity_balance, Decimal::from(10));
        assert_eq!(rebuild.negative_balances().count(), 1);
    }

    #[test]
    fn issue_without_receipt_is_reported() {
        let item = Uuid::new_v4();
        let rebuild = rebuild_ledger(
            vec![],
            vec![issue(item, "GHOST", 5, 1)],
            &HashMap::new(),
            date(2026, 1, 4),
        );

        assert!(rebuild.balances.is_empty());
        assert_eq!(rebuild.unmatched_issues.len(), 1);
    }

    #[test]
    fn input_order_does_not_matter_across_dates() {
        let item = Uuid::new_v4();
        let a = receipt(item, "L1", "Shelf A", 10, Some(5), 1);
        let b = receipt(item, "L1", "Shelf A", 20, Some(9), 5);

        let forward = rebuild_ledger(vec![a.clone(), b.clone()], vec![], &HashMap::new(), date(2026, 2, 1));
        let reverse = rebuild_ledger(vec![b, a], vec![], &HashMap::new(), date(2026, 2, 1));
        assert_eq!(forward, reverse);
    }
}
