//! User roles

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::UnknownVariant;

/// Role carried in the identity provider's token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    StockOfficer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::StockOfficer => "STOCK_OFFICER",
        }
    }

    pub fn label_th(&self) -> &'static str {
        match self {
            Role::Admin => "ผู้ดูแลระบบ",
            Role::StockOfficer => "เจ้าหน้าที่คลัง",
        }
    }

    /// Ledger repair is restricted to administrators
    pub fn can_recalculate_ledger(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "STOCK_OFFICER" => Ok(Role::StockOfficer),
            other => Err(UnknownVariant::new("role", other)),
        }
    }
}
