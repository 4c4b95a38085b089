//! Stock issuance (stock-out) models

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::UnknownVariant;

/// Lifecycle of a stock issuance: DRAFT → APPROVED, or DRAFT → CANCELLED
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockOutStatus {
    Draft,
    Approved,
    Cancelled,
}

impl StockOutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOutStatus::Draft => "DRAFT",
            StockOutStatus::Approved => "APPROVED",
            StockOutStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn can_approve(&self) -> bool {
        matches!(self, StockOutStatus::Draft)
    }

    /// Approved issues are final; only drafts may be edited or cancelled
    pub fn can_edit(&self) -> bool {
        matches!(self, StockOutStatus::Draft)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, StockOutStatus::Draft)
    }

    pub fn affects_ledger(&self) -> bool {
        matches!(self, StockOutStatus::Approved)
    }
}

impl FromStr for StockOutStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(StockOutStatus::Draft),
            "APPROVED" => Ok(StockOutStatus::Approved),
            "CANCELLED" => Ok(StockOutStatus::Cancelled),
            other => Err(UnknownVariant::new("stock-out status", other)),
        }
    }
}

impl std::fmt::Display for StockOutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department recorded when the requester leaves it blank
pub const UNSPECIFIED_DEPARTMENT: &str = "ไม่ระบุ";
