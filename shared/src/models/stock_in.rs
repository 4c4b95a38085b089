//! Stock receipt (stock-in) models

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::UnknownVariant;

/// Lifecycle of a stock receipt
///
/// DRAFT → CONFIRMED → CANCELLED. Only CONFIRMED receipts count towards the
/// balance ledger. A confirmed receipt can still be edited; a cancelled one
/// cannot be touched again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockInStatus {
    Draft,
    Confirmed,
    Cancelled,
}

impl StockInStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockInStatus::Draft => "DRAFT",
            StockInStatus::Confirmed => "CONFIRMED",
            StockInStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self, StockInStatus::Draft)
    }

    pub fn can_edit(&self) -> bool {
        !matches!(self, StockInStatus::Cancelled)
    }

    pub fn can_cancel(&self) -> bool {
        !matches!(self, StockInStatus::Cancelled)
    }

    /// Whether the receipt currently contributes to the ledger
    pub fn affects_ledger(&self) -> bool {
        matches!(self, StockInStatus::Confirmed)
    }
}

impl FromStr for StockInStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(StockInStatus::Draft),
            "CONFIRMED" => Ok(StockInStatus::Confirmed),
            "CANCELLED" => Ok(StockInStatus::Cancelled),
            other => Err(UnknownVariant::new("stock-in status", other)),
        }
    }
}

impl std::fmt::Display for StockInStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_drafts_can_be_confirmed() {
        assert!(StockInStatus::Draft.can_confirm());
        assert!(!StockInStatus::Confirmed.can_confirm());
        assert!(!StockInStatus::Cancelled.can_confirm());
    }

    #[test]
    fn cancelled_receipts_are_frozen() {
        assert!(StockInStatus::Draft.can_edit());
        assert!(StockInStatus::Confirmed.can_edit());
        assert!(!StockInStatus::Cancelled.can_edit());
        assert!(!StockInStatus::Cancelled.can_cancel());
    }

    #[test]
    fn only_confirmed_receipts_touch_the_ledger() {
        assert!(StockInStatus::Confirmed.affects_ledger());
        assert!(!StockInStatus::Draft.affects_ledger());
        assert!(!StockInStatus::Cancelled.affects_ledger());
    }

    #[test]
    fn parses_storage_strings() {
        assert_eq!("CONFIRMED".parse::<StockInStatus>().unwrap(), StockInStatus::Confirmed);
        assert!("APPROVED".parse::<StockInStatus>().is_err());
    }
}
