//! Low-stock report and document numbering tests
//!
//! Tests for:
//! - Severity bands and reorder suggestions
//! - Item, supplier and daily document codes

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    assess_low_stock, daily_prefix, highest_code, next_item_code, next_stock_in_no, next_stock_out_no,
    next_supplier_code, LowStockSeverity,
};

fn factor() -> Decimal {
    Decimal::new(15, 1)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn above_minimum_is_not_reported() {
        assert!(assess_low_stock(Decimal::from(11), Decimal::from(10), factor()).is_none());
    }

    #[test]
    fn out_of_stock_is_critical() {
        let assessment = assess_low_stock(Decimal::ZERO, Decimal::from(10), factor()).unwrap();
        assert_eq!(assessment.severity, LowStockSeverity::Critical);
        assert_eq!(assessment.shortage, Decimal::from(10));
        assert_eq!(assessment.suggested_order_quantity, Decimal::from(15));
        assert_eq!(assessment.percentage_remaining, Decimal::ZERO);
    }

    #[test]
    fn half_of_minimum_is_high() {
        let assessment = assess_low_stock(Decimal::from(5), Decimal::from(10), factor()).unwrap();
        assert_eq!(assessment.severity, LowStockSeverity::High);
        assert_eq!(assessment.percentage_remaining, Decimal::from(50));
    }

    #[test]
    fn just_under_minimum_is_medium() {
        let assessment = assess_low_stock(Decimal::from(8), Decimal::from(10), factor()).unwrap();
        assert_eq!(assessment.severity, LowStockSeverity::Medium);
        assert_eq!(assessment.shortage, Decimal::from(2));
        assert_eq!(assessment.suggested_order_quantity, Decimal::from(3));
    }

    #[test]
    fn at_minimum_is_reported_with_nothing_to_order() {
        let assessment = assess_low_stock(Decimal::from(10), Decimal::from(10), factor()).unwrap();
        assert_eq!(assessment.severity, LowStockSeverity::Medium);
        assert_eq!(assessment.suggested_order_quantity, Decimal::ZERO);
    }

    #[test]
    fn severity_orders_critical_first() {
        let mut severities = vec![LowStockSeverity::Medium, LowStockSeverity::Critical, LowStockSeverity::High];
        severities.sort();
        assert_eq!(
            severities,
            vec![LowStockSeverity::Critical, LowStockSeverity::High, LowStockSeverity::Medium]
        );
    }

    #[test]
    fn master_codes_continue_from_last() {
        assert_eq!(next_item_code(None), "ITM-00001");
        assert_eq!(next_item_code(Some("ITM-00041")), "ITM-00042");
        assert_eq!(next_supplier_code(Some("SUP-00009")), "SUP-00010");
        assert_eq!(next_supplier_code(Some("garbage")), "SUP-00001");
    }

    #[test]
    fn item_codes_keep_increasing_past_five_digits() {
        let mut stored = vec!["ITM-99998".to_string()];
        for _ in 0..3 {
            let next = next_item_code(highest_code(stored.iter().map(String::as_str)));
            assert!(!stored.contains(&next));
            stored.push(next);
        }
        assert_eq!(stored, vec!["ITM-99998", "ITM-99999", "ITM-100000", "ITM-100001"]);
    }

    #[test]
    fn daily_numbers_keep_increasing_past_four_digits() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let issued = ["OUT-20260107-9999", "OUT-20260107-10000"];
        assert_eq!(
            next_stock_out_no(date, highest_code(issued)),
            "OUT-20260107-10001"
        );
    }

    #[test]
    fn document_numbers_restart_each_day() {
        let jan7 = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let jan8 = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();

        assert_eq!(daily_prefix("IN", jan7), "IN-20260107");
        assert_eq!(next_stock_in_no(jan7, None), "IN-20260107-0001");
        assert_eq!(next_stock_in_no(jan7, Some("IN-20260107-0012")), "IN-20260107-0013");
        assert_eq!(next_stock_in_no(jan8, Some("IN-20260107-0012")), "IN-20260108-0001");
        assert_eq!(next_stock_out_no(jan8, Some("OUT-20260108-0099")), "OUT-20260108-0100");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Reported exactly when on-hand is at or below the minimum
        #[test]
        fn prop_reported_iff_at_or_below_minimum(on_hand in 0i64..=1000, minimum in 0i64..=1000) {
            let assessment = assess_low_stock(Decimal::from(on_hand), Decimal::from(minimum), factor());
            prop_assert_eq!(assessment.is_some(), on_hand <= minimum);
        }

        /// The suggestion always covers the shortage
        #[test]
        fn prop_suggestion_covers_shortage(on_hand in 0i64..=1000, minimum in 1i64..=1000) {
            if let Some(assessment) = assess_low_stock(Decimal::from(on_hand), Decimal::from(minimum), factor()) {
                prop_assert_eq!(assessment.shortage, Decimal::from(minimum - on_hand));
                prop_assert!(assessment.suggested_order_quantity >= assessment.shortage);
            }
        }

        /// Sequence numbers increase by one within a day
        #[test]
        fn prop_daily_sequence_increments(seq in 1u32..9999) {
            let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
            let last = format!("OUT-20260301-{:04}", seq);
            let next = next_stock_out_no(date, Some(&last));
            let expected = format!("OUT-20260301-{:04}", seq + 1);
            prop_assert_eq!(next, expected);
        }
    }
}
