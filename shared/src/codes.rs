//! Document and master-data code generation
//!
//! Codes are derived from the highest code already stored. The backend reads
//! that code and passes it in; a code that does not parse restarts the
//! sequence at 1.

use chrono::NaiveDate;

pub const ITEM_CODE_PREFIX: &str = "ITM";
pub const SUPPLIER_CODE_PREFIX: &str = "SUP";
pub const STOCK_IN_PREFIX: &str = "IN";
pub const STOCK_OUT_PREFIX: &str = "OUT";

fn trailing_sequence(code: &str) -> Option<u32> {
    code.rsplit('-').next()?.parse().ok()
}

/// Stored code with the largest trailing number
///
/// Text order puts `ITM-99999` after `ITM-100000`, so the sequence is compared
/// numerically. Codes without a number rank lowest.
pub fn highest_code<'a, I>(codes: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    codes
        .into_iter()
        .max_by_key(|code| (trailing_sequence(code), code.len(), *code))
}

fn next_master_code(prefix: &str, last: Option<&str>) -> String {
    let next = last.and_then(trailing_sequence).unwrap_or(0) + 1;
    format!("{}-{:05}", prefix, next)
}

/// `ITM-00001`, `ITM-00002`, ...
pub fn next_item_code(last: Option<&str>) -> String {
    next_master_code(ITEM_CODE_PREFIX, last)
}

/// `SUP-00001`, `SUP-00002`, ...
pub fn next_supplier_code(last: Option<&str>) -> String {
    next_master_code(SUPPLIER_CODE_PREFIX, last)
}

/// Prefix shared by every document number issued on `date`, e.g. `IN-20260107`
pub fn daily_prefix(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}", prefix, date.format("%Y%m%d"))
}

fn next_daily_no(prefix: &str, date: NaiveDate, last_for_day: Option<&str>) -> String {
    let day = daily_prefix(prefix, date);
    let next = last_for_day
        .filter(|code| code.starts_with(&day))
        .and_then(trailing_sequence)
        .unwrap_or(0)
        + 1;
    format!("{}-{:04}", day, next)
}

/// `IN-YYYYMMDD-NNNN`, sequenced per receipt date
pub fn next_stock_in_no(date: NaiveDate, last_for_day: Option<&str>) -> String {
    next_daily_no(STOCK_IN_PREFIX, date, last_for_day)
}

/// `OUT-YYYYMMDD-NNNN`, sequenced per issue date
pub fn next_stock_out_no(date: NaiveDate, last_for_day: Option<&str>) -> String {
    next_daily_no(STOCK_OUT_PREFIX, date, last_for_day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_codes() {
        assert_eq!(next_item_code(None), "ITM-00001");
        assert_eq!(next_supplier_code(None), "SUP-00001");
    }

    #[test]
    fn increments_master_codes() {
        assert_eq!(next_item_code(Some("ITM-00041")), "ITM-00042");
        assert_eq!(next_supplier_code(Some("SUP-00999")), "SUP-01000");
    }

    #[test]
    fn daily_numbers_restart_each_day() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        assert_eq!(next_stock_in_no(day, None), "IN-20260107-0001");
        assert_eq!(next_stock_in_no(day, Some("IN-20260107-0012")), "IN-20260107-0013");
        assert_eq!(next_stock_in_no(day, Some("IN-20260106-0012")), "IN-20260107-0001");
        assert_eq!(next_stock_out_no(day, Some("OUT-20260107-0003")), "OUT-20260107-0004");
    }

    #[test]
    fn highest_code_compares_numerically() {
        assert_eq!(highest_code(["ITM-99999", "ITM-100000", "ITM-00007"]), Some("ITM-100000"));
        assert_eq!(highest_code(["ITM-XYZ", "ITM-00002"]), Some("ITM-00002"));
        assert_eq!(highest_code(std::iter::empty()), None);
    }

    #[test]
    fn garbage_code_restarts_sequence() {
        assert_eq!(next_item_code(Some("ITM-XYZ")), "ITM-00001");
    }
}
