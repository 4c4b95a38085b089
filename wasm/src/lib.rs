//! WebAssembly module for the Clinic Stock Management Platform
//!
//! Provides client-side computation for:
//! - Balance status badges
//! - Days-to-expiry countdowns
//! - FEFO allocation previews in the stock-out lot picker

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::ledger::*;
pub use shared::models::*;

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("Invalid date '{}': {}", value, e))
}

fn to_decimal(value: f64) -> Result<Decimal, String> {
    Decimal::try_from(value).map_err(|e| format!("Invalid quantity {}: {}", value, e))
}

/// Today's date from the browser clock
fn browser_today() -> Result<NaiveDate, String> {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(
        now.get_full_year() as i32,
        now.get_month() + 1,
        now.get_date(),
    )
    .ok_or_else(|| "Browser returned an invalid date".to_string())
}

fn classify(
    quantity: f64,
    minimum_stock: f64,
    expiry_date: &str,
    alert_days: i32,
    today: &str,
) -> Result<BalanceStatus, String> {
    Ok(classify_balance(
        to_decimal(quantity)?,
        to_decimal(minimum_stock)?,
        parse_date(expiry_date)?,
        alert_days,
        parse_date(today)?,
    ))
}

/// Status badge for a balance row, e.g. `"NEAR_EXPIRY"`
#[wasm_bindgen]
pub fn classify_balance_status(
    quantity: f64,
    minimum_stock: f64,
    expiry_date: &str,
    alert_days: i32,
    today: &str,
) -> Result<String, JsValue> {
    classify(quantity, minimum_stock, expiry_date, alert_days, today)
        .map(|status| status.as_str().to_string())
        .map_err(|e| JsValue::from_str(&e))
}

/// Same as [`classify_balance_status`] using the browser's current date
#[wasm_bindgen]
pub fn classify_balance_status_today(
    quantity: f64,
    minimum_stock: f64,
    expiry_date: &str,
    alert_days: i32,
) -> Result<String, JsValue> {
    let today = browser_today().map_err(|e| JsValue::from_str(&e))?;
    let today = today.format("%Y-%m-%d").to_string();
    classify_balance_status(quantity, minimum_stock, expiry_date, alert_days, &today)
}

/// Thai label for a status string, falling back to the input
#[wasm_bindgen]
pub fn balance_status_label(status: &str) -> String {
    status
        .parse::<BalanceStatus>()
        .map(|s| s.label_th().to_string())
        .unwrap_or_else(|_| status.to_string())
}

#[wasm_bindgen]
pub fn days_until_expiry(expiry_date: &str, today: &str) -> Result<i32, JsValue> {
    let days = days_to_expiry(
        parse_date(expiry_date).map_err(|e| JsValue::from_str(&e))?,
        parse_date(today).map_err(|e| JsValue::from_str(&e))?,
    );
    Ok(days.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

/// Lot row as returned by `GET /api/v1/stock-out/lots`
#[derive(Debug, Deserialize)]
struct LotInput {
    lot_no: String,
    location: String,
    expiry_date: NaiveDate,
    last_in_date: NaiveDate,
    quantity_balance: Decimal,
    status: BalanceStatus,
}

fn preview(lots_json: &str, quantity: f64, today: &str) -> Result<FefoAllocation, String> {
    let lots: Vec<LotInput> =
        serde_json::from_str(lots_json).map_err(|e| format!("Invalid lots JSON: {}", e))?;
    let today = parse_date(today)?;

    let candidates = lots
        .into_iter()
        .map(|lot| LotBalance {
            lot_no: lot.lot_no,
            location: lot.location,
            expiry_date: lot.expiry_date,
            last_in_date: lot.last_in_date,
            quantity_balance: lot.quantity_balance,
            status: lot.status,
        })
        .collect();

    let available = select_available_lots(candidates, today);
    Ok(allocate_fefo(&available, to_decimal(quantity)?))
}

/// Preview which lots a requested quantity would be drawn from
///
/// Takes the lot list as JSON and returns the allocation as JSON.
#[wasm_bindgen]
pub fn preview_fefo_allocation(lots_json: &str, quantity: f64, today: &str) -> Result<String, JsValue> {
    let allocation = preview(lots_json, quantity, today).map_err(|e| JsValue::from_str(&e))?;

    if !allocation.is_complete() {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "FEFO preview short by {} units",
            allocation.shortfall
        )));
    }

    serde_json::to_string(&allocation).map_err(|e| JsValue::from_str(&e.to_string()))
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn today_classification_runs_in_browser() {
        let status = classify_balance_status_today(1.0, 0.0, "2999-01-01", 30).unwrap();
        assert_eq!(status, "NORMAL");
    }
}
