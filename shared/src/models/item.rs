//! Item master models

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::UnknownVariant;

/// Category of a stocked item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    Equipment,
    Tool,
    Chemical,
    TestKit,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Equipment => "EQUIPMENT",
            ItemCategory::Tool => "TOOL",
            ItemCategory::Chemical => "CHEMICAL",
            ItemCategory::TestKit => "TEST_KIT",
        }
    }

    /// Label shown to clinic staff
    pub fn label_th(&self) -> &'static str {
        match self {
            ItemCategory::Equipment => "อุปกรณ์",
            ItemCategory::Tool => "เครื่องมือ",
            ItemCategory::Chemical => "น้ำยา",
            ItemCategory::TestKit => "ชุดตรวจ",
        }
    }
}

impl FromStr for ItemCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUIPMENT" => Ok(ItemCategory::Equipment),
            "TOOL" => Ok(ItemCategory::Tool),
            "CHEMICAL" => Ok(ItemCategory::Chemical),
            "TEST_KIT" => Ok(ItemCategory::TestKit),
            other => Err(UnknownVariant::new("item category", other)),
        }
    }
}

impl std::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soft-delete flag shared by items and suppliers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "ACTIVE",
            RecordStatus::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(RecordStatus::Active),
            "INACTIVE" => Ok(RecordStatus::Inactive),
            other => Err(UnknownVariant::new("record status", other)),
        }
    }
}

/// The per-item limits the status classifier needs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ItemThresholds {
    /// At or below this quantity a lot is LOW_STOCK
    pub minimum_stock: Decimal,
    /// Days before expiry at which a lot becomes NEAR_EXPIRY
    pub expiry_alert_days: i32,
}

impl ItemThresholds {
    pub fn new(minimum_stock: Decimal, expiry_alert_days: i32) -> Self {
        Self {
            minimum_stock,
            expiry_alert_days,
        }
    }
}

/// Suggested alert windows offered when creating an item
pub const DEFAULT_EXPIRY_ALERT_OPTIONS: [i32; 4] = [30, 60, 90, 180];

/// Units of measure commonly used in the clinic
pub const COMMON_UNITS: &[&str] = &[
    "ชิ้น", "กล่อง", "หลอด", "ขวด", "แผ่น", "ชุด", "test", "vial", "ml", "L",
];
