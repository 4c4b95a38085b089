//! Dashboard counters and recent activity

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{BalanceStatus, DateRange, RecordStatus, StockInStatus, StockOutStatus};

/// Number of entries in each top list
const TOP_ITEMS: i64 = 5;

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_inventory_value: Decimal,
    pub total_items: i64,
    pub total_suppliers: i64,
    pub low_stock_count: i64,
    pub near_expiry_count: i64,
    pub expired_count: i64,
    pub alerts_count: i64,
}

impl DashboardSummary {
    /// Fill the per-status counters from `(status, count)` pairs
    pub fn with_status_counts(mut self, counts: &[(String, i64)]) -> Self {
        for (status, count) in counts {
            match status.parse::<BalanceStatus>() {
                Ok(BalanceStatus::LowStock) => self.low_stock_count = *count,
                Ok(BalanceStatus::NearExpiry) => self.near_expiry_count = *count,
                Ok(BalanceStatus::Expired) => self.expired_count = *count,
                Ok(BalanceStatus::Normal) => {}
                Err(e) => tracing::warn!(error = %e, "Unexpected status in stock_balances"),
            }
        }
        self.alerts_count = self.low_stock_count + self.near_expiry_count + self.expired_count;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct RecentActivity {
    pub stock_ins: i64,
    pub stock_outs: i64,
    pub window_days: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ItemValue {
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub total_value: Decimal,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ItemIssued {
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
    pub quantity_out: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TopItems {
    pub by_value: Vec<ItemValue>,
    pub by_issue: Vec<ItemIssued>,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub summary: DashboardSummary,
    pub recent_activity: RecentActivity,
    pub top_items: TopItems,
}

/// Latest confirmed receipt or approved issue
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RecentTransaction {
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub id: Uuid,
    pub transaction_no: String,
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
    pub quantity: Decimal,
    pub lot_no: String,
    pub date: NaiveDate,
    pub purpose: Option<String>,
    pub request_dept: Option<String>,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RecentTransactions {
    pub transactions: Vec<RecentTransaction>,
    pub total: usize,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn stats(&self, window_days: i64) -> AppResult<DashboardStats> {
        let window = DateRange::trailing_days(Utc::now().date_naive(), window_days);

        let total_inventory_value: Decimal =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_value), 0) FROM stock_balances")
                .fetch_one(&self.db)
                .await?;

        let status_counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM stock_balances GROUP BY status")
                .fetch_all(&self.db)
                .await?;

        let (total_items, total_suppliers): (i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM items WHERE status = $1),
                   (SELECT COUNT(*) FROM suppliers WHERE status = $1)
            "#,
        )
        .bind(RecordStatus::Active.as_str())
        .fetch_one(&self.db)
        .await?;

        let (stock_ins, stock_outs): (i64, i64) = sqlx::query_as(
            r#"
            SELECT (SELECT COUNT(*) FROM stock_ins WHERE status = $1 AND import_date >= $3),
                   (SELECT COUNT(*) FROM stock_outs WHERE status = $2 AND out_date >= $3)
            "#,
        )
        .bind(StockInStatus::Confirmed.as_str())
        .bind(StockOutStatus::Approved.as_str())
        .bind(window.start)
        .fetch_one(&self.db)
        .await?;

        let by_value = sqlx::query_as::<_, ItemValue>(
            r#"
            SELECT i.id AS item_id, i.item_code, i.item_name,
                   COALESCE(SUM(sb.total_value), 0) AS total_value
            FROM stock_balances sb
            JOIN items i ON i.id = sb.item_id
            GROUP BY i.id
            ORDER BY total_value DESC
            LIMIT $1
            "#,
        )
        .bind(TOP_ITEMS)
        .fetch_all(&self.db)
        .await?;

        let by_issue = sqlx::query_as::<_, ItemIssued>(
            r#"
            SELECT i.id AS item_id, i.item_code, i.item_name, i.unit,
                   SUM(so.quantity_out) AS quantity_out
            FROM stock_outs so
            JOIN items i ON i.id = so.item_id
            WHERE so.status = $1 AND so.out_date >= $2
            GROUP BY i.id
            ORDER BY quantity_out DESC
            LIMIT $3
            "#,
        )
        .bind(StockOutStatus::Approved.as_str())
        .bind(window.start)
        .bind(TOP_ITEMS)
        .fetch_all(&self.db)
        .await?;

        let summary = DashboardSummary {
            total_inventory_value,
            total_items,
            total_suppliers,
            ..Default::default()
        }
        .with_status_counts(&status_counts);

        Ok(DashboardStats {
            summary,
            recent_activity: RecentActivity {
                stock_ins,
                stock_outs,
                window_days,
            },
            top_items: TopItems { by_value, by_issue },
        })
    }

    pub async fn recent_transactions(&self, limit: i64) -> AppResult<RecentTransactions> {
        let transactions = sqlx::query_as::<_, RecentTransaction>(
            r#"
            SELECT * FROM (
                SELECT 'STOCK_IN' AS transaction_type, si.id, si.stock_in_no AS transaction_no,
                       i.item_code, i.item_name, i.unit, si.quantity_in AS quantity, si.lot_no,
                       si.import_date AS date, NULL::text AS purpose, NULL::text AS request_dept,
                       si.status, si.created_at
                FROM stock_ins si
                JOIN items i ON i.id = si.item_id
                WHERE si.status = $1
                UNION ALL
                SELECT 'STOCK_OUT', so.id, so.stock_out_no,
                       i.item_code, i.item_name, i.unit, so.quantity_out, so.lot_no,
                       so.out_date, so.purpose, so.request_dept,
                       so.status, so.created_at
                FROM stock_outs so
                JOIN items i ON i.id = so.item_id
                WHERE so.status = $2
            ) t
            ORDER BY date DESC, created_at DESC
            LIMIT $3
            "#,
        )
        .bind(StockInStatus::Confirmed.as_str())
        .bind(StockOutStatus::Approved.as_str())
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(RecentTransactions {
            total: transactions.len(),
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerts_sum_non_normal_statuses() {
        let summary = DashboardSummary::default().with_status_counts(&[
            ("NORMAL".to_string(), 40),
            ("LOW_STOCK".to_string(), 3),
            ("NEAR_EXPIRY".to_string(), 2),
            ("EXPIRED".to_string(), 1),
        ]);
        assert_eq!(summary.low_stock_count, 3);
        assert_eq!(summary.expired_count, 1);
        assert_eq!(summary.alerts_count, 6);
    }

    #[test]
    fn missing_statuses_count_as_zero() {
        let summary = DashboardSummary::default().with_status_counts(&[("NORMAL".to_string(), 4)]);
        assert_eq!(summary.alerts_count, 0);
    }
}
