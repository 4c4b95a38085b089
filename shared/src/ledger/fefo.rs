//! First-expired-first-out lot ordering and greedy allocation

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{days_to_expiry, BalanceStatus};

/// A ledger row as loaded for lot selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotBalance {
    pub lot_no: String,
    pub location: String,
    pub expiry_date: NaiveDate,
    pub last_in_date: NaiveDate,
    pub quantity_balance: Decimal,
    pub status: BalanceStatus,
}

/// A lot eligible for issuing, annotated at query time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableLot {
    pub lot_no: String,
    pub location: String,
    pub expiry_date: NaiveDate,
    pub last_in_date: NaiveDate,
    pub quantity_balance: Decimal,
    pub status: BalanceStatus,
    pub days_to_expiry: i64,
}

fn fefo_order(a: &LotBalance, b: &LotBalance) -> Ordering {
    a.expiry_date
        .cmp(&b.expiry_date)
        .then_with(|| a.last_in_date.cmp(&b.last_in_date))
        .then_with(|| a.lot_no.cmp(&b.lot_no))
        .then_with(|| a.location.cmp(&b.location))
}

/// Filter and order an item's ledger rows for issuing
///
/// Rows with no stock or an expiry on or before `today` are dropped. The
/// remainder is ordered by expiry date, then by the date the lot was last
/// received. Lot number and location settle any remaining tie so repeated
/// calls over the same rows always agree.
pub fn select_available_lots(candidates: Vec<LotBalance>, today: NaiveDate) -> Vec<AvailableLot> {
    let mut eligible: Vec<LotBalance> = candidates
        .into_iter()
        .filter(|lot| lot.quantity_balance > Decimal::ZERO && lot.expiry_date > today)
        .collect();

    eligible.sort_by(fefo_order);

    eligible
        .into_iter()
        .map(|lot| AvailableLot {
            days_to_expiry: days_to_expiry(lot.expiry_date, today),
            lot_no: lot.lot_no,
            location: lot.location,
            expiry_date: lot.expiry_date,
            last_in_date: lot.last_in_date,
            quantity_balance: lot.quantity_balance,
            status: lot.status,
        })
        .collect()
}

/// Quantity proposed from a single lot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotPick {
    pub lot_no: String,
    pub location: String,
    pub expiry_date: NaiveDate,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FefoAllocation {
    pub requested: Decimal,
    pub allocated: Decimal,
    pub shortfall: Decimal,
    pub picks: Vec<LotPick>,
}

impl FefoAllocation {
    pub fn is_complete(&self) -> bool {
        self.shortfall.is_zero()
    }
}

/// Walk lots in the given order, taking as much as each can give
///
/// `lots` is expected to come from [`select_available_lots`]. Non-positive
/// requests allocate nothing.
pub fn allocate_fefo(lots: &[AvailableLot], requested: Decimal) -> FefoAllocation {
    let requested = requested.max(Decimal::ZERO);
    let mut remaining = requested;
    let mut picks = Vec::new();

    for lot in lots {
        if remaining <= Decimal::ZERO {
            break;
        }
        if lot.quantity_balance <= Decimal::ZERO {
            continue;
        }

        let take = remaining.min(lot.quantity_balance);
        picks.push(LotPick {
            lot_no: lot.lot_no.clone(),
            location: lot.location.clone(),
            expiry_date: lot.expiry_date,
            quantity: take,
        });
        remaining -= take;
    }

    FefoAllocation {
        requested,
        allocated: requested - remaining,
        shortfall: remaining,
        picks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lot(lot_no: &str, expiry: NaiveDate, last_in: NaiveDate, qty: i64) -> LotBalance {
        LotBalance {
            lot_no: lot_no.to_string(),
            location: "Main store".to_string(),
            expiry_date: expiry,
            last_in_date: last_in,
            quantity_balance: Decimal::from(qty),
            status: BalanceStatus::Normal,
        }
    }

    #[test]
    fn orders_by_expiry_then_receipt() {
        let today = date(2026, 1, 1);
        let lots = vec![
            lot("C", date(2026, 9, 1), date(2025, 12, 1), 10),
            lot("B", date(2026, 6, 1), date(2025, 11, 15), 10),
            lot("A", date(2026, 6, 1), date(2025, 10, 1), 10),
        ];

        let ordered = select_available_lots(lots, today);
        let names: Vec<_> = ordered.iter().map(|l| l.lot_no.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(ordered[0].days_to_expiry, 151);
    }

    #[test]
    fn drops_empty_and_expired_lots() {
        let today = date(2026, 1, 1);
        let lots = vec![
            lot("EMPTY", date(2026, 6, 1), date(2025, 10, 1), 0),
            lot("TODAY", today, date(2025, 10, 1), 10),
            lot("PAST", date(2025, 12, 1), date(2025, 10, 1), 10),
            lot("OK", date(2026, 1, 2), date(2025, 10, 1), 10),
        ];

        let ordered = select_available_lots(lots, today);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].lot_no, "OK");
    }

    #[test]
    fn allocation_spills_into_later_lots() {
        let today = date(2026, 1, 1);
        let ordered = select_available_lots(
            vec![
                lot("A", date(2026, 3, 1), date(2025, 10, 1), 30),
                lot("B", date(2026, 4, 1), date(2025, 10, 1), 50),
            ],
            today,
        );

        let allocation = allocate_fefo(&ordered, Decimal::from(45));
        assert!(allocation.is_complete());
        assert_eq!(allocation.picks.len(), 2);
        assert_eq!(allocation.picks[0].quantity, Decimal::from(30));
        assert_eq!(allocation.picks[1].quantity, Decimal::from(15));
    }

    #[test]
    fn allocation_reports_shortfall() {
        let today = date(2026, 1, 1);
        let ordered = select_available_lots(
            vec![lot("A", date(2026, 3, 1), date(2025, 10, 1), 30)],
            today,
        );

        let allocation = allocate_fefo(&ordered, Decimal::from(45));
        assert_eq!(allocation.allocated, Decimal::from(30));
        assert_eq!(allocation.shortfall, Decimal::from(15));
    }

    #[test]
    fn zero_request_picks_nothing() {
        let allocation = allocate_fefo(&[], Decimal::ZERO);
        assert!(allocation.picks.is_empty());
        assert!(allocation.is_complete());
    }
}
