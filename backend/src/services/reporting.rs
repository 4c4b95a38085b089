//! Reporting service
//! Stock movement, balance and low stock reports (JSON only)

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    assess_low_stock, BalanceStatus, DateRange, ItemCategory, LowStockSeverity, RecordStatus,
    StockInStatus, StockOutStatus,
};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    StockIn,
    StockOut,
}

/// Which side of the ledger a movement report covers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    In,
    Out,
    #[default]
    All,
}

impl MovementKind {
    fn includes_in(self) -> bool {
        matches!(self, MovementKind::In | MovementKind::All)
    }

    fn includes_out(self) -> bool {
        matches!(self, MovementKind::Out | MovementKind::All)
    }
}

/// One confirmed receipt or approved issue
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Movement {
    #[sqlx(skip)]
    #[serde(rename = "type")]
    pub movement_type: Option<MovementType>,
    pub date: NaiveDate,
    pub transaction_no: String,
    pub item_code: String,
    pub item_name: String,
    pub category: String,
    pub lot_no: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub supplier: Option<String>,
    pub invoice_no: Option<String>,
    pub location: Option<String>,
    pub purpose: Option<String>,
    pub request_dept: Option<String>,
    pub request_by: Option<String>,
    pub approve_by: Option<String>,
    pub remark: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MovementSummary {
    pub total_transactions: usize,
    pub total_stock_in: Decimal,
    pub total_stock_out: Decimal,
    pub total_value_in: Decimal,
    pub net_movement: Decimal,
}

impl MovementSummary {
    pub fn from_movements(movements: &[Movement]) -> Self {
        let mut summary = MovementSummary {
            total_transactions: movements.len(),
            ..Default::default()
        };
        for movement in movements {
            match movement.movement_type {
                Some(MovementType::StockIn) => {
                    summary.total_stock_in += movement.quantity;
                    summary.total_value_in += movement.total_value.unwrap_or_default();
                }
                Some(MovementType::StockOut) => summary.total_stock_out += movement.quantity,
                None => {}
            }
        }
        summary.net_movement = summary.total_stock_in - summary.total_stock_out;
        summary
    }
}

#[derive(Debug, Deserialize)]
pub struct MovementReportFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub item_id: Option<Uuid>,
    #[serde(rename = "type", default)]
    pub kind: MovementKind,
}

#[derive(Debug, Serialize)]
pub struct MovementReport {
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub period: DateRange,
    pub item_id: Option<Uuid>,
    pub kind: MovementKind,
    pub summary: MovementSummary,
    pub movements: Vec<Movement>,
}

/// Combine receipts and issues, newest first
pub fn merge_movements(stock_ins: Vec<Movement>, stock_outs: Vec<Movement>) -> Vec<Movement> {
    let mut movements: Vec<Movement> = stock_ins
        .into_iter()
        .map(|m| Movement {
            movement_type: Some(MovementType::StockIn),
            ..m
        })
        .chain(stock_outs.into_iter().map(|m| Movement {
            movement_type: Some(MovementType::StockOut),
            ..m
        }))
        .collect();
    movements.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));
    movements
}

/// Ledger row in the balance report
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BalanceReportRow {
    pub item_code: String,
    pub item_name: String,
    pub category: String,
    pub unit: String,
    pub lot_no: String,
    pub expiry_date: NaiveDate,
    pub days_to_expiry: i64,
    pub location: String,
    pub quantity_balance: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub status: String,
    pub last_in_date: NaiveDate,
    pub last_out_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceReportFilter {
    pub category: Option<ItemCategory>,
    pub location: Option<String>,
    pub status: Option<BalanceStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceReportSummary {
    pub total_items: usize,
    pub total_value: Decimal,
    pub total_quantity: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub count: usize,
    pub total_value: Decimal,
    pub total_quantity: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BalanceBreakdown {
    pub by_category: BTreeMap<String, BreakdownEntry>,
    pub by_status: BTreeMap<String, BreakdownEntry>,
}

#[derive(Debug, Serialize)]
pub struct BalanceReport {
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub summary: BalanceReportSummary,
    pub breakdown: BalanceBreakdown,
    pub items: Vec<BalanceReportRow>,
}

/// Totals and per-category/per-status breakdown of report rows
pub fn summarize_balances(rows: &[BalanceReportRow]) -> (BalanceReportSummary, BalanceBreakdown) {
    let mut summary = BalanceReportSummary {
        total_items: rows.len(),
        ..Default::default()
    };
    let mut breakdown = BalanceBreakdown::default();

    for row in rows {
        let value = row.total_value.unwrap_or_default();
        summary.total_value += value;
        summary.total_quantity += row.quantity_balance;

        for entry in [
            breakdown.by_category.entry(row.category.clone()).or_default(),
            breakdown.by_status.entry(row.status.clone()).or_default(),
        ] {
            entry.count += 1;
            entry.total_value += value;
            entry.total_quantity += row.quantity_balance;
        }
    }

    (summary, breakdown)
}

#[derive(Debug, sqlx::FromRow)]
struct ItemStockRow {
    item_code: String,
    item_name: String,
    category: String,
    unit: String,
    minimum_stock: Decimal,
    responsible_person: Option<String>,
    storage_location: Option<String>,
    current_stock: Decimal,
    total_value: Decimal,
    lots_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LowStockItem {
    pub item_code: String,
    pub item_name: String,
    pub category: String,
    pub unit: String,
    pub current_stock: Decimal,
    pub minimum_stock: Decimal,
    pub shortage: Decimal,
    pub percentage_remaining: Decimal,
    pub total_value: Decimal,
    pub lots_count: i64,
    pub responsible_person: Option<String>,
    pub storage_location: Option<String>,
    pub suggested_order_quantity: Decimal,
    pub severity: LowStockSeverity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LowStockSummary {
    pub total_low_stock_items: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub total_value_at_risk: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LowStockReportFilter {
    pub category: Option<ItemCategory>,
}

#[derive(Debug, Serialize)]
pub struct LowStockReport {
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub summary: LowStockSummary,
    pub items: Vec<LowStockItem>,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Confirmed receipts and approved issues within a date window
    pub async fn movement_report(
        &self,
        filter: &MovementReportFilter,
        window_days: i64,
        generated_by: String,
    ) -> AppResult<MovementReport> {
        let today = Utc::now().date_naive();
        let period = DateRange::resolve(filter.date_from, filter.date_to, today, window_days);

        let stock_ins = if filter.kind.includes_in() {
            sqlx::query_as::<_, Movement>(
                r#"
                SELECT si.import_date AS date, si.stock_in_no AS transaction_no,
                       i.item_code, i.item_name, i.category, si.lot_no,
                       si.expiry_date, si.quantity_in AS quantity, i.unit,
                       si.unit_price, si.total_value, s.company_name AS supplier,
                       si.invoice_no, si.storage_location AS location,
                       NULL::text AS purpose, NULL::text AS request_dept,
                       si.import_by AS request_by, NULL::text AS approve_by,
                       si.remark_in AS remark, si.created_at
                FROM stock_ins si
                JOIN items i ON i.id = si.item_id
                LEFT JOIN suppliers s ON s.id = si.supplier_id
                WHERE si.status = $1
                  AND si.import_date BETWEEN $2 AND $3
                  AND ($4::uuid IS NULL OR si.item_id = $4)
                "#,
            )
            .bind(StockInStatus::Confirmed.as_str())
            .bind(period.start)
            .bind(period.end)
            .bind(filter.item_id)
            .fetch_all(&self.db)
            .await?
        } else {
            Vec::new()
        };

        let stock_outs = if filter.kind.includes_out() {
            sqlx::query_as::<_, Movement>(
                r#"
                SELECT so.out_date AS date, so.stock_out_no AS transaction_no,
                       i.item_code, i.item_name, i.category, so.lot_no,
                       NULL::date AS expiry_date, so.quantity_out AS quantity, i.unit,
                       NULL::numeric AS unit_price, NULL::numeric AS total_value,
                       NULL::text AS supplier, NULL::text AS invoice_no, NULL::text AS location,
                       so.purpose, so.request_dept, so.request_by, so.approve_by,
                       so.remark_out AS remark, so.created_at
                FROM stock_outs so
                JOIN items i ON i.id = so.item_id
                WHERE so.status = $1
                  AND so.out_date BETWEEN $2 AND $3
                  AND ($4::uuid IS NULL OR so.item_id = $4)
                "#,
            )
            .bind(StockOutStatus::Approved.as_str())
            .bind(period.start)
            .bind(period.end)
            .bind(filter.item_id)
            .fetch_all(&self.db)
            .await?
        } else {
            Vec::new()
        };

        let movements = merge_movements(stock_ins, stock_outs);
        let summary = MovementSummary::from_movements(&movements);

        tracing::debug!(
            start = %period.start,
            end = %period.end,
            transactions = summary.total_transactions,
            "Movement report generated"
        );

        Ok(MovementReport {
            generated_at: Utc::now(),
            generated_by,
            period,
            item_id: filter.item_id,
            kind: filter.kind,
            summary,
            movements,
        })
    }

    /// Ledger rows holding stock, with totals and breakdowns
    pub async fn balance_report(
        &self,
        filter: &BalanceReportFilter,
        generated_by: String,
    ) -> AppResult<BalanceReport> {
        let items = sqlx::query_as::<_, BalanceReportRow>(
            r#"
            SELECT i.item_code, i.item_name, i.category, i.unit, sb.lot_no, sb.expiry_date,
                   sb.days_to_expiry, sb.location, sb.quantity_balance, sb.unit_price,
                   sb.total_value, sb.status, sb.last_in_date, sb.last_out_date
            FROM stock_balances sb
            JOIN items i ON i.id = sb.item_id
            WHERE sb.quantity_balance > 0
              AND ($1::text IS NULL OR i.category = $1)
              AND ($2::text IS NULL OR sb.location ILIKE '%' || $2 || '%')
              AND ($3::text IS NULL OR sb.status = $3)
            ORDER BY i.item_name, sb.expiry_date
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(&filter.location)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        let (summary, breakdown) = summarize_balances(&items);

        Ok(BalanceReport {
            generated_at: Utc::now(),
            generated_by,
            summary,
            breakdown,
            items,
        })
    }

    /// Active items at or below their minimum stock, most severe first
    pub async fn low_stock_report(
        &self,
        filter: &LowStockReportFilter,
        reorder_factor: Decimal,
        generated_by: String,
    ) -> AppResult<LowStockReport> {
        let rows = sqlx::query_as::<_, ItemStockRow>(
            r#"
            SELECT i.item_code, i.item_name, i.category, i.unit, i.minimum_stock,
                   i.responsible_person, i.storage_location,
                   COALESCE(SUM(sb.quantity_balance), 0) AS current_stock,
                   COALESCE(SUM(sb.total_value), 0) AS total_value,
                   COUNT(sb.id) AS lots_count
            FROM items i
            LEFT JOIN stock_balances sb ON sb.item_id = i.id AND sb.quantity_balance > 0
            WHERE i.status = $1
              AND ($2::text IS NULL OR i.category = $2)
            GROUP BY i.id
            "#,
        )
        .bind(RecordStatus::Active.as_str())
        .bind(filter.category.map(|c| c.as_str()))
        .fetch_all(&self.db)
        .await?;

        let items = low_stock_items(rows, reorder_factor);
        let summary = LowStockSummary {
            total_low_stock_items: items.len(),
            critical_count: count_severity(&items, LowStockSeverity::Critical),
            high_count: count_severity(&items, LowStockSeverity::High),
            medium_count: count_severity(&items, LowStockSeverity::Medium),
            total_value_at_risk: items.iter().map(|i| i.total_value).sum(),
        };

        Ok(LowStockReport {
            generated_at: Utc::now(),
            generated_by,
            summary,
            items,
        })
    }
}

fn low_stock_items(rows: Vec<ItemStockRow>, reorder_factor: Decimal) -> Vec<LowStockItem> {
    let mut items: Vec<LowStockItem> = rows
        .into_iter()
        .filter_map(|row| {
            let assessment = assess_low_stock(row.current_stock, row.minimum_stock, reorder_factor)?;
            Some(LowStockItem {
                item_code: row.item_code,
                item_name: row.item_name,
                category: row.category,
                unit: row.unit,
                current_stock: row.current_stock,
                minimum_stock: row.minimum_stock,
                shortage: assessment.shortage,
                percentage_remaining: assessment.percentage_remaining,
                total_value: row.total_value,
                lots_count: row.lots_count,
                responsible_person: row.responsible_person,
                storage_location: row.storage_location,
                suggested_order_quantity: assessment.suggested_order_quantity,
                severity: assessment.severity,
            })
        })
        .collect();
    items.sort_by(|a, b| a.severity.cmp(&b.severity).then_with(|| a.item_code.cmp(&b.item_code)));
    items
}

fn count_severity(items: &[LowStockItem], severity: LowStockSeverity) -> usize {
    items.iter().filter(|i| i.severity == severity).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn movement(date: (i32, u32, u32), no: &str, qty: i64, value: Option<i64>) -> Movement {
        Movement {
            movement_type: None,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            transaction_no: no.into(),
            item_code: "ITM-00001".into(),
            item_name: "Gloves".into(),
            category: "EQUIPMENT".into(),
            lot_no: "L1".into(),
            expiry_date: None,
            quantity: Decimal::from(qty),
            unit: "box".into(),
            unit_price: None,
            total_value: value.map(Decimal::from),
            supplier: None,
            invoice_no: None,
            location: None,
            purpose: None,
            request_dept: None,
            request_by: None,
            approve_by: None,
            remark: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn item_row(code: &str, minimum: i64, on_hand: i64) -> ItemStockRow {
        ItemStockRow {
            item_code: code.into(),
            item_name: code.into(),
            category: "CHEMICAL".into(),
            unit: "bottle".into(),
            minimum_stock: Decimal::from(minimum),
            responsible_person: None,
            storage_location: None,
            current_stock: Decimal::from(on_hand),
            total_value: Decimal::ZERO,
            lots_count: 0,
        }
    }

    #[test]
    fn merges_newest_first_and_tags_type() {
        let merged = merge_movements(
            vec![movement((2026, 1, 1), "IN-1", 500, Some(2500)), movement((2026, 1, 5), "IN-2", 10, None)],
            vec![movement((2026, 1, 3), "OUT-1", 50, None)],
        );
        let order: Vec<&str> = merged.iter().map(|m| m.transaction_no.as_str()).collect();
        assert_eq!(order, ["IN-2", "OUT-1", "IN-1"]);
        assert_eq!(merged[1].movement_type, Some(MovementType::StockOut));
    }

    #[test]
    fn movement_summary_nets_in_and_out() {
        let merged = merge_movements(
            vec![movement((2026, 1, 1), "IN-1", 500, Some(2500))],
            vec![movement((2026, 1, 2), "OUT-1", 50, None)],
        );
        let summary = MovementSummary::from_movements(&merged);
        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.total_value_in, Decimal::from(2500));
        assert_eq!(summary.net_movement, Decimal::from(450));
    }

    #[test]
    fn movement_kind_parses_query_values() {
        let filter: MovementReportFilter = serde_json::from_str(r#"{"type":"OUT"}"#).unwrap();
        assert_eq!(filter.kind, MovementKind::Out);
        assert!(!filter.kind.includes_in());

        let default: MovementReportFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(default.kind, MovementKind::All);
    }

    #[test]
    fn low_stock_sorted_by_severity() {
        let items = low_stock_items(
            vec![
                item_row("ITM-00001", 10, 8),
                item_row("ITM-00002", 10, 50),
                item_row("ITM-00003", 10, 0),
                item_row("ITM-00004", 10, 4),
            ],
            Decimal::new(15, 1),
        );
        let codes: Vec<&str> = items.iter().map(|i| i.item_code.as_str()).collect();
        assert_eq!(codes, ["ITM-00003", "ITM-00004", "ITM-00001"]);
        assert_eq!(items[0].suggested_order_quantity, Decimal::from(15));
        assert_eq!(items[2].severity, LowStockSeverity::Medium);
    }

    #[test]
    fn balance_breakdown_groups_rows() {
        let row = |category: &str, status: &str, qty: i64, value: Option<i64>| BalanceReportRow {
            item_code: "ITM-00001".into(),
            item_name: "Reagent".into(),
            category: category.into(),
            unit: "kit".into(),
            lot_no: "L1".into(),
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            days_to_expiry: 100,
            location: "Fridge".into(),
            quantity_balance: Decimal::from(qty),
            unit_price: None,
            total_value: value.map(Decimal::from),
            status: status.into(),
            last_in_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            last_out_date: None,
        };

        let (summary, breakdown) = summarize_balances(&[
            row("TEST_KIT", "NORMAL", 10, Some(100)),
            row("TEST_KIT", "LOW_STOCK", 2, None),
            row("CHEMICAL", "NORMAL", 5, Some(50)),
        ]);

        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.total_value, Decimal::from(150));
        assert_eq!(summary.total_quantity, Decimal::from(17));
        assert_eq!(breakdown.by_category["TEST_KIT"].count, 2);
        assert_eq!(breakdown.by_status["NORMAL"].total_value, Decimal::from(150));
    }
}
