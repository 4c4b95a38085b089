//! Validation utilities for the clinic stock system
//!
//! Rules mirror the clinic's entry forms. Supplier contact checks follow
//! Thai formats.

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Quantity and Price Validations
// ============================================================================

/// Received and issued quantities must be strictly positive
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

/// Unit price is optional, but when given it cannot be negative
pub fn validate_unit_price(unit_price: Option<Decimal>) -> Result<(), &'static str> {
    match unit_price {
        Some(price) if price < Decimal::ZERO => Err("Unit price cannot be negative"),
        _ => Ok(()),
    }
}

pub fn validate_minimum_stock(minimum_stock: Decimal) -> Result<(), &'static str> {
    if minimum_stock < Decimal::ZERO {
        return Err("Minimum stock cannot be negative");
    }
    Ok(())
}

pub fn validate_alert_days(days: i32) -> Result<(), &'static str> {
    if days < 0 {
        return Err("Expiry alert days cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Lot and Date Validations
// ============================================================================

pub fn validate_lot_no(lot_no: &str) -> Result<(), &'static str> {
    if lot_no.trim().is_empty() {
        return Err("Lot number is required");
    }
    Ok(())
}

/// New receipts must expire strictly after the day they are entered
pub fn validate_future_expiry(expiry_date: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if expiry_date <= today {
        return Err("Expiry date must be in the future");
    }
    Ok(())
}

pub fn validate_required(value: &str, message: &'static str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err(message);
    }
    Ok(())
}

// ============================================================================
// Contact Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate Thai phone number format
/// Accepts: 0812345678, 081-234-5678, 02-123-4567, +66812345678
pub fn validate_thai_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        // Mobile
        10 if digits.starts_with('0') => Ok(()),
        // Bangkok landline
        9 if digits.starts_with('0') => Ok(()),
        11 if digits.starts_with("66") => Ok(()),
        _ => Err("Invalid Thai phone number format"),
    }
}

/// Validate Thai Tax ID (เลขประจำตัวผู้เสียภาษี)
pub fn validate_thai_tax_id(tax_id: &str) -> Result<(), &'static str> {
    let digits: String = tax_id.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 13 {
        return Err("Thai Tax ID must be 13 digits");
    }
    Ok(())
}
