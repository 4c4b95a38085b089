//! Item-level low stock assessment

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LowStockSeverity {
    /// Nothing on hand
    Critical,
    /// At or below half of the minimum
    High,
    /// At or below the minimum
    Medium,
}

impl LowStockSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            LowStockSeverity::Critical => "CRITICAL",
            LowStockSeverity::High => "HIGH",
            LowStockSeverity::Medium => "MEDIUM",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockAssessment {
    pub severity: LowStockSeverity,
    pub shortage: Decimal,
    pub percentage_remaining: Decimal,
    pub suggested_order_quantity: Decimal,
}

/// Assess an item's total on-hand quantity against its minimum
///
/// Returns `None` when the item is above its minimum. The suggested order is
/// the shortage scaled by `reorder_factor`, rounded up to a whole unit.
pub fn assess_low_stock(
    on_hand: Decimal,
    minimum_stock: Decimal,
    reorder_factor: Decimal,
) -> Option<LowStockAssessment> {
    if on_hand > minimum_stock {
        return None;
    }

    let severity = if on_hand <= Decimal::ZERO {
        LowStockSeverity::Critical
    } else if on_hand <= minimum_stock * Decimal::new(5, 1) {
        LowStockSeverity::High
    } else {
        LowStockSeverity::Medium
    };

    let shortage = (minimum_stock - on_hand).max(Decimal::ZERO);
    let percentage_remaining = if minimum_stock > Decimal::ZERO {
        (on_hand / minimum_stock * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };
    let suggested_order_quantity = if shortage > Decimal::ZERO {
        (shortage * reorder_factor).ceil()
    } else {
        Decimal::ZERO
    };

    Some(LowStockAssessment {
        severity,
        shortage,
        percentage_remaining,
        suggested_order_quantity,
    })
}
