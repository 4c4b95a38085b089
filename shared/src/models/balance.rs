//! Stock balance ledger models and the balance status classifier

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ItemThresholds;
use crate::types::UnknownVariant;

/// Derived status of a ledger row
///
/// Exactly one status holds at a time. Rules are evaluated in a fixed order:
/// EXPIRED, then NEAR_EXPIRY, then LOW_STOCK, otherwise NORMAL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceStatus {
    Normal,
    LowStock,
    NearExpiry,
    Expired,
}

impl BalanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceStatus::Normal => "NORMAL",
            BalanceStatus::LowStock => "LOW_STOCK",
            BalanceStatus::NearExpiry => "NEAR_EXPIRY",
            BalanceStatus::Expired => "EXPIRED",
        }
    }

    pub fn label_th(&self) -> &'static str {
        match self {
            BalanceStatus::Normal => "ปกติ",
            BalanceStatus::LowStock => "ใกล้หมด",
            BalanceStatus::NearExpiry => "ใกล้หมดอายุ",
            BalanceStatus::Expired => "หมดอายุ",
        }
    }

    /// Anything other than NORMAL shows up on the dashboard alert counter
    pub fn is_alert(&self) -> bool {
        !matches!(self, BalanceStatus::Normal)
    }
}

impl FromStr for BalanceStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NORMAL" => Ok(BalanceStatus::Normal),
            "LOW_STOCK" => Ok(BalanceStatus::LowStock),
            "NEAR_EXPIRY" => Ok(BalanceStatus::NearExpiry),
            "EXPIRED" => Ok(BalanceStatus::Expired),
            other => Err(UnknownVariant::new("balance status", other)),
        }
    }
}

impl std::fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole calendar days from `today` until `expiry_date`; negative once past
pub fn days_to_expiry(expiry_date: NaiveDate, today: NaiveDate) -> i64 {
    (expiry_date - today).num_days()
}

/// Classify a ledger row as of `today`
pub fn classify_balance(
    quantity: Decimal,
    minimum_stock: Decimal,
    expiry_date: NaiveDate,
    alert_window_days: i32,
    today: NaiveDate,
) -> BalanceStatus {
    let days = days_to_expiry(expiry_date, today);

    if days <= 0 {
        BalanceStatus::Expired
    } else if days <= i64::from(alert_window_days) {
        BalanceStatus::NearExpiry
    } else if quantity <= minimum_stock {
        BalanceStatus::LowStock
    } else {
        BalanceStatus::Normal
    }
}

/// Value of a quantity at a unit price; unknown when the price is unknown
pub fn total_value(quantity: Decimal, unit_price: Option<Decimal>) -> Option<Decimal> {
    unit_price.map(|price| quantity * price)
}

/// Identity of one ledger row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub item_id: Uuid,
    pub lot_no: String,
    pub location: String,
}

impl BalanceKey {
    pub fn new(item_id: Uuid, lot_no: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            item_id,
            lot_no: lot_no.into(),
            location: location.into(),
        }
    }
}

/// The fields of a ledger row that are recomputed after every mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedBalance {
    pub total_value: Option<Decimal>,
    pub status: BalanceStatus,
    pub days_to_expiry: i64,
}

impl DerivedBalance {
    pub fn compute(
        quantity: Decimal,
        unit_price: Option<Decimal>,
        expiry_date: NaiveDate,
        thresholds: &ItemThresholds,
        today: NaiveDate,
    ) -> Self {
        Self {
            total_value: total_value(quantity, unit_price),
            status: classify_balance(
                quantity,
                thresholds.minimum_stock,
                expiry_date,
                thresholds.expiry_alert_days,
                today,
            ),
            days_to_expiry: days_to_expiry(expiry_date, today),
        }
    }
}
