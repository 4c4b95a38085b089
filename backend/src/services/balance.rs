//! Stock balance ledger service
//!
//! Owns every write to `stock_balances`. Mutators that run as part of a
//! larger business operation take a `&mut PgConnection` so the caller can
//! keep the status flip and the ledger change in one transaction.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    merge_receipt, plan_issue, plan_receipt_adjustment, rebuild_ledger, reduce_for_edit,
    select_available_lots, AvailableLot, BalanceKey, BalanceStatus, DerivedBalance,
    EditedQuantity, IssueEntry, ItemThresholds, LedgerPosition, LotBalance, PaginatedResponse, Pagination, ReceiptAdjustment, ReceiptEntry,
    ReceiptLine, StockInStatus, StockOutStatus,
};

/// Stock balance service for the derived ledger
#[derive(Clone)]
pub struct BalanceService {
    db: PgPool,
}

/// One ledger row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockBalance {
    pub id: Uuid,
    pub item_id: Uuid,
    pub lot_no: String,
    pub expiry_date: NaiveDate,
    pub location: String,
    pub quantity_balance: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub last_in_date: NaiveDate,
    pub last_out_date: Option<NaiveDate>,
    pub status: String,
    pub days_to_expiry: i64,
    pub updated_at: DateTime<Utc>,
}

/// Ledger row joined with its item for listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockBalanceView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub category: String,
    pub unit: String,
    pub minimum_stock: Decimal,
    pub lot_no: String,
    pub expiry_date: NaiveDate,
    pub location: String,
    pub quantity_balance: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub last_in_date: NaiveDate,
    pub last_out_date: Option<NaiveDate>,
    pub status: String,
    pub days_to_expiry: i64,
}

/// Filters for the balance listing
#[derive(Debug, Default, Deserialize)]
pub struct BalanceFilter {
    pub search: Option<String>,
    pub status: Option<BalanceStatus>,
    pub location: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusTotal {
    pub status: String,
    pub count: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSummary {
    pub by_status: Vec<StatusTotal>,
    pub total_value: Decimal,
}

#[derive(Debug, Serialize)]
pub struct BalanceListResponse {
    #[serde(flatten)]
    pub page: PaginatedResponse<StockBalanceView>,
    pub summary: BalanceSummary,
}

/// Outcome of a full ledger rebuild
#[derive(Debug, Clone, Serialize)]
pub struct RecalculationSummary {
    pub total_records: usize,
    pub negative_balances: usize,
    pub unmatched_issues: usize,
}

#[derive(sqlx::FromRow)]
struct DerivationInput {
    quantity_balance: Decimal,
    unit_price: Option<Decimal>,
    expiry_date: NaiveDate,
    minimum_stock: Decimal,
    default_exp_alert: i32,
}

#[derive(sqlx::FromRow)]
struct ReceiptRow {
    item_id: Uuid,
    lot_no: String,
    storage_location: String,
    expiry_date: NaiveDate,
    quantity_in: Decimal,
    unit_price: Option<Decimal>,
    import_date: NaiveDate,
    status: String,
}

impl From<ReceiptRow> for ReceiptLine {
    fn from(row: ReceiptRow) -> Self {
        ReceiptLine {
            item_id: row.item_id,
            lot_no: row.lot_no,
            location: row.storage_location,
            expiry_date: row.expiry_date,
            quantity: row.quantity_in,
            unit_price: row.unit_price,
            import_date: row.import_date,
        }
    }
}

impl From<ReceiptRow> for ReceiptEntry {
    fn from(row: ReceiptRow) -> Self {
        ReceiptEntry {
            item_id: row.item_id,
            lot_no: row.lot_no,
            location: row.storage_location,
            expiry_date: row.expiry_date,
            quantity: row.quantity_in,
            unit_price: row.unit_price,
            import_date: row.import_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: Uuid,
    item_id: Uuid,
    lot_no: String,
    quantity_out: Decimal,
    out_date: NaiveDate,
    status: String,
}

impl From<IssueRow> for IssueEntry {
    fn from(row: IssueRow) -> Self {
        IssueEntry {
            stock_out_id: row.id,
            item_id: row.item_id,
            lot_no: row.lot_no,
            quantity: row.quantity_out,
            out_date: row.out_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LotRow {
    lot_no: String,
    location: String,
    expiry_date: NaiveDate,
    last_in_date: NaiveDate,
    quantity_balance: Decimal,
    status: String,
}

impl TryFrom<LotRow> for LotBalance {
    type Error = AppError;

    fn try_from(row: LotRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BalanceStatus>()
            .map_err(|e| AppError::BalanceError(e.to_string()))?;
        Ok(LotBalance {
            lot_no: row.lot_no,
            location: row.location,
            expiry_date: row.expiry_date,
            last_in_date: row.last_in_date,
            quantity_balance: row.quantity_balance,
            status,
        })
    }
}

const RECEIPT_COLUMNS: &str = "item_id, lot_no, storage_location, expiry_date, quantity_in, \
                               unit_price, import_date, status";

const VIEW_SELECT: &str = r#"
    SELECT sb.id, sb.item_id, i.item_code, i.item_name, i.category, i.unit, i.minimum_stock,
           sb.lot_no, sb.expiry_date, sb.location, sb.quantity_balance, sb.unit_price,
           sb.total_value, sb.last_in_date, sb.last_out_date, sb.status, sb.days_to_expiry
    FROM stock_balances sb
    JOIN items i ON i.id = sb.item_id
"#;

const VIEW_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR i.item_name ILIKE '%' || $1 || '%' OR sb.lot_no ILIKE '%' || $1 || '%')
      AND ($2::text IS NULL OR sb.status = $2)
      AND ($3::text IS NULL OR sb.location ILIKE '%' || $3 || '%')
      AND ($4::text IS NULL OR i.category = $4)
"#;

impl BalanceService {
    /// Create a new BalanceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Ledger mutators
    // ------------------------------------------------------------------

    /// Add a confirmed receipt to its (item, lot, location) row
    ///
    /// Creates the row on first receipt. On later receipts the quantity is
    /// incremented, the unit price is replaced when the receipt carries one
    /// and the row keeps the expiry date it was created with.
    pub async fn apply_stock_in(
        conn: &mut PgConnection,
        stock_in_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<StockBalance> {
        let receipt = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {} FROM stock_ins WHERE id = $1",
            RECEIPT_COLUMNS
        ))
        .bind(stock_in_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock in".to_string()))?;

        if receipt.status != StockInStatus::Confirmed.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "stock in must be CONFIRMED before it is applied to the ledger, current status: {}",
                receipt.status
            )));
        }

        let line = ReceiptLine::from(receipt);
        let balance = Self::receive(conn, &line, false, today).await?;

        tracing::info!(
            stock_in_id = %stock_in_id,
            balance_id = %balance.id,
            lot_no = %balance.lot_no,
            location = %balance.location,
            quantity = %line.quantity,
            balance = %balance.quantity_balance,
            "Stock in applied to ledger"
        );

        Ok(balance)
    }

    /// Deduct an approved issue from the ledger
    ///
    /// The row is matched on item and lot only. When the lot sits in more
    /// than one location the earliest-expiring, earliest-received row is
    /// charged. The row stays locked until commit, so two concurrent approvals
    /// cannot both draw the same quantity.
    pub async fn apply_stock_out(
        conn: &mut PgConnection,
        stock_out_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<StockBalance> {
        let issue = sqlx::query_as::<_, IssueRow>(
            "SELECT id, item_id, lot_no, quantity_out, out_date, status FROM stock_outs WHERE id = $1",
        )
        .bind(stock_out_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock out".to_string()))?;

        if issue.status != StockOutStatus::Approved.as_str() {
            return Err(AppError::InvalidStateTransition(format!(
                "stock out must be APPROVED before it is applied to the ledger, current status: {}",
                issue.status
            )));
        }

        let (balance_id, available) = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, quantity_balance
            FROM stock_balances
            WHERE item_id = $1 AND lot_no = $2 AND quantity_balance > 0
            ORDER BY expiry_date, last_in_date, location
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(issue.item_id)
        .bind(&issue.lot_no)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Stock balance for lot {}", issue.lot_no)))?;

        let remaining = plan_issue(available, issue.quantity_out).map_err(|shortfall| {
            AppError::InsufficientStock {
                lot_no: issue.lot_no.clone(),
                requested: shortfall.requested,
                available: shortfall.available,
            }
        })?;

        sqlx::query(
            r#"
            UPDATE stock_balances
            SET quantity_balance = $2, last_out_date = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(balance_id)
        .bind(remaining)
        .bind(issue.out_date)
        .execute(&mut *conn)
        .await?;

        let balance = Self::refresh_derived(conn, balance_id, today).await?;

        tracing::info!(
            stock_out_id = %stock_out_id,
            balance_id = %balance_id,
            lot_no = %issue.lot_no,
            quantity = %issue.quantity_out,
            balance = %balance.quantity_balance,
            "Stock out applied to ledger"
        );

        Ok(balance)
    }

    /// Move the ledger by the difference between two versions of a confirmed receipt
    pub async fn apply_receipt_edit(
        conn: &mut PgConnection,
        old: &ReceiptLine,
        new: &ReceiptLine,
        today: NaiveDate,
    ) -> AppResult<()> {
        match plan_receipt_adjustment(old, new) {
            ReceiptAdjustment::Relocate { from, remove, to } => {
                if !Self::shift_quantity(conn, &from, -remove, today).await? {
                    tracing::warn!(
                        item_id = %from.item_id,
                        lot_no = %from.lot_no,
                        location = %from.location,
                        "No ledger row for the receipt's previous lot/location"
                    );
                }
                Self::receive(conn, new, true, today).await?;
                tracing::info!(
                    from_lot = %from.lot_no,
                    from_location = %from.location,
                    to_lot = %to.lot_no,
                    to_location = %to.location,
                    "Confirmed receipt moved between ledger rows"
                );
            }
            ReceiptAdjustment::AdjustQuantity { key, delta } => {
                Self::require_row(conn, &key).await?;
                Self::shift_quantity(conn, &key, delta, today).await?;
                Self::refresh_attributes(conn, &key, new.unit_price, new.expiry_date, today).await?;
                tracing::info!(lot_no = %key.lot_no, delta = %delta, "Confirmed receipt quantity adjusted");
            }
            ReceiptAdjustment::RefreshAttributes { key } => {
                Self::require_row(conn, &key).await?;
                Self::refresh_attributes(conn, &key, new.unit_price, new.expiry_date, today).await?;
            }
        }
        Ok(())
    }

    /// Take a cancelled receipt's quantity back out of the ledger
    pub async fn reverse_stock_in(
        conn: &mut PgConnection,
        line: &ReceiptLine,
        today: NaiveDate,
    ) -> AppResult<()> {
        let key = line.key();
        if !Self::shift_quantity(conn, &key, -line.quantity, today).await? {
            tracing::warn!(
                item_id = %key.item_id,
                lot_no = %key.lot_no,
                location = %key.location,
                "Cancelled receipt had no ledger row to reverse"
            );
        }
        Ok(())
    }

    /// Merge a receipt into its row and recompute derived fields
    async fn receive(
        conn: &mut PgConnection,
        line: &ReceiptLine,
        replace_expiry: bool,
        today: NaiveDate,
    ) -> AppResult<StockBalance> {
        let existing = sqlx::query_as::<_, (Uuid, Decimal, Option<Decimal>, NaiveDate, NaiveDate)>(
            r#"
            SELECT id, quantity_balance, unit_price, expiry_date, last_in_date
            FROM stock_balances
            WHERE item_id = $1 AND lot_no = $2 AND location = $3
            FOR UPDATE
            "#,
        )
        .bind(line.item_id)
        .bind(&line.lot_no)
        .bind(&line.location)
        .fetch_optional(&mut *conn)
        .await?;

        let balance_id = match existing {
            Some((id, quantity_balance, unit_price, expiry_date, last_in_date)) => {
                let current = LedgerPosition {
                    quantity_balance,
                    unit_price,
                    expiry_date,
                    last_in_date,
                };
                let merged = merge_receipt(Some(&current), line, replace_expiry);
                sqlx::query(
                    r#"
                    UPDATE stock_balances
                    SET quantity_balance = $2, unit_price = $3, expiry_date = $4,
                        last_in_date = $5, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(merged.quantity_balance)
                .bind(merged.unit_price)
                .bind(merged.expiry_date)
                .bind(merged.last_in_date)
                .execute(&mut *conn)
                .await?;
                id
            }
            None => {
                let fresh = merge_receipt(None, line, replace_expiry);
                // A concurrent first receipt for the same row falls through to the upsert
                sqlx::query_scalar(
                    r#"
                    INSERT INTO stock_balances
                        (item_id, lot_no, expiry_date, location, quantity_balance, unit_price, last_in_date)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ON CONFLICT (item_id, lot_no, location) DO UPDATE SET
                        quantity_balance = stock_balances.quantity_balance + EXCLUDED.quantity_balance,
                        unit_price = COALESCE(EXCLUDED.unit_price, stock_balances.unit_price),
                        expiry_date = CASE WHEN $8 THEN EXCLUDED.expiry_date ELSE stock_balances.expiry_date END,
                        last_in_date = EXCLUDED.last_in_date,
                        updated_at = NOW()
                    RETURNING id
                    "#,
                )
                .bind(line.item_id)
                .bind(&line.lot_no)
                .bind(fresh.expiry_date)
                .bind(&line.location)
                .bind(fresh.quantity_balance)
                .bind(fresh.unit_price)
                .bind(fresh.last_in_date)
                .bind(replace_expiry)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        Self::refresh_derived(conn, balance_id, today).await
    }

    /// Apply a signed change to a row; returns false when the row does not exist
    ///
    /// A row that ends at zero or below is deleted.
    async fn shift_quantity(
        conn: &mut PgConnection,
        key: &BalanceKey,
        delta: Decimal,
        today: NaiveDate,
    ) -> AppResult<bool> {
        let current = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, quantity_balance FROM stock_balances
            WHERE item_id = $1 AND lot_no = $2 AND location = $3
            FOR UPDATE
            "#,
        )
        .bind(key.item_id)
        .bind(&key.lot_no)
        .bind(&key.location)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((balance_id, quantity)) = current else {
            return Ok(false);
        };

        match reduce_for_edit(quantity, delta) {
            EditedQuantity::Remove => {
                sqlx::query("DELETE FROM stock_balances WHERE id = $1")
                    .bind(balance_id)
                    .execute(&mut *conn)
                    .await?;
                tracing::info!(balance_id = %balance_id, lot_no = %key.lot_no, "Ledger row removed");
            }
            EditedQuantity::Keep(next) => {
                sqlx::query(
                    "UPDATE stock_balances SET quantity_balance = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(balance_id)
                .bind(next)
                .execute(&mut *conn)
                .await?;
                Self::refresh_derived(conn, balance_id, today).await?;
            }
        }

        Ok(true)
    }

    async fn require_row(conn: &mut PgConnection, key: &BalanceKey) -> AppResult<()> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM stock_balances WHERE item_id = $1 AND lot_no = $2 AND location = $3)",
        )
        .bind(key.item_id)
        .bind(&key.lot_no)
        .bind(&key.location)
        .fetch_one(&mut *conn)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(AppError::BalanceError(format!(
                "no ledger row for lot {} at '{}'",
                key.lot_no, key.location
            )))
        }
    }

    /// Carry an edited receipt's price and expiry onto its row, if it still exists
    async fn refresh_attributes(
        conn: &mut PgConnection,
        key: &BalanceKey,
        unit_price: Option<Decimal>,
        expiry_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<Option<StockBalance>> {
        let balance_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE stock_balances
            SET unit_price = COALESCE($4, unit_price), expiry_date = $5, updated_at = NOW()
            WHERE item_id = $1 AND lot_no = $2 AND location = $3
            RETURNING id
            "#,
        )
        .bind(key.item_id)
        .bind(&key.lot_no)
        .bind(&key.location)
        .bind(unit_price)
        .bind(expiry_date)
        .fetch_optional(&mut *conn)
        .await?;

        match balance_id {
            Some(id) => Ok(Some(Self::refresh_derived(conn, id, today).await?)),
            None => Ok(None),
        }
    }

    /// Recompute total value, status and days-to-expiry for one row
    async fn refresh_derived(
        conn: &mut PgConnection,
        balance_id: Uuid,
        today: NaiveDate,
    ) -> AppResult<StockBalance> {
        let input = sqlx::query_as::<_, DerivationInput>(
            r#"
            SELECT sb.quantity_balance, sb.unit_price, sb.expiry_date,
                   i.minimum_stock, i.default_exp_alert
            FROM stock_balances sb
            JOIN items i ON i.id = sb.item_id
            WHERE sb.id = $1
            "#,
        )
        .bind(balance_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::BalanceError(format!("item data missing for balance {}", balance_id)))?;

        let derived = DerivedBalance::compute(
            input.quantity_balance,
            input.unit_price,
            input.expiry_date,
            &ItemThresholds::new(input.minimum_stock, input.default_exp_alert),
            today,
        );

        let balance = sqlx::query_as::<_, StockBalance>(
            r#"
            UPDATE stock_balances
            SET total_value = $2, status = $3, days_to_expiry = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(balance_id)
        .bind(derived.total_value)
        .bind(derived.status.as_str())
        .bind(derived.days_to_expiry)
        .fetch_one(&mut *conn)
        .await?;

        Ok(balance)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Lots of an item that can be issued, soonest expiry first
    pub async fn get_available_lots(&self, item_id: Uuid) -> AppResult<Vec<AvailableLot>> {
        let today = Utc::now().date_naive();

        let rows = sqlx::query_as::<_, LotRow>(
            r#"
            SELECT lot_no, location, expiry_date, last_in_date, quantity_balance, status
            FROM stock_balances
            WHERE item_id = $1 AND quantity_balance > 0 AND expiry_date > $2
            "#,
        )
        .bind(item_id)
        .bind(today)
        .fetch_all(&self.db)
        .await?;

        let candidates = rows
            .into_iter()
            .map(LotBalance::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(select_available_lots(candidates, today))
    }

    /// Quantity on the row an issue of this lot would be charged against
    pub async fn lot_quantity(&self, item_id: Uuid, lot_no: &str) -> AppResult<Option<Decimal>> {
        let quantity: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT quantity_balance
            FROM stock_balances
            WHERE item_id = $1 AND lot_no = $2 AND quantity_balance > 0
            ORDER BY expiry_date, last_in_date, location
            LIMIT 1
            "#,
        )
        .bind(item_id)
        .bind(lot_no)
        .fetch_optional(&self.db)
        .await?;

        Ok(quantity)
    }

    pub async fn list_balances(
        &self,
        filter: &BalanceFilter,
        pagination: &Pagination,
    ) -> AppResult<BalanceListResponse> {
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, StockBalanceView>(&format!(
            r#"{} {}
            ORDER BY CASE sb.status
                         WHEN 'EXPIRED' THEN 0
                         WHEN 'NEAR_EXPIRY' THEN 1
                         WHEN 'LOW_STOCK' THEN 2
                         ELSE 3
                     END,
                     i.item_name, sb.expiry_date
            LIMIT $5 OFFSET $6"#,
            VIEW_SELECT, VIEW_FILTER
        ))
        .bind(&filter.search)
        .bind(status)
        .bind(&filter.location)
        .bind(&filter.category)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            r#"SELECT COUNT(*) FROM stock_balances sb JOIN items i ON i.id = sb.item_id {}"#,
            VIEW_FILTER
        ))
        .bind(&filter.search)
        .bind(status)
        .bind(&filter.location)
        .bind(&filter.category)
        .fetch_one(&self.db)
        .await?;

        let summary = self.summary().await?;

        Ok(BalanceListResponse {
            page: PaginatedResponse::new(rows, pagination, total.max(0) as u64),
            summary,
        })
    }

    /// Row count and value per status across the whole ledger
    pub async fn summary(&self) -> AppResult<BalanceSummary> {
        let by_status = sqlx::query_as::<_, StatusTotal>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_value), 0) AS total_value
            FROM stock_balances
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let total_value = by_status.iter().map(|s| s.total_value).sum();

        Ok(BalanceSummary {
            by_status,
            total_value,
        })
    }

    // ------------------------------------------------------------------
    // Recalculation
    // ------------------------------------------------------------------

    /// Rebuild the whole ledger from confirmed receipts and approved issues
    ///
    /// Runs in a single transaction: if anything fails the previous ledger is
    /// left untouched. Negative results are persisted and logged.
    pub async fn recalculate_all(&self) -> AppResult<RecalculationSummary> {
        let today = Utc::now().date_naive();
        tracing::info!("Recalculating stock balance ledger");

        let mut tx = self.db.begin().await?;

        let receipts: Vec<ReceiptEntry> = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {} FROM stock_ins WHERE status = $1 ORDER BY import_date, created_at, id",
            RECEIPT_COLUMNS
        ))
        .bind(StockInStatus::Confirmed.as_str())
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(ReceiptEntry::from)
        .collect();

        let issues: Vec<IssueEntry> = sqlx::query_as::<_, IssueRow>(
            r#"
            SELECT id, item_id, lot_no, quantity_out, out_date, status
            FROM stock_outs
            WHERE status = $1
            ORDER BY out_date, created_at, id
            "#,
        )
        .bind(StockOutStatus::Approved.as_str())
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(IssueEntry::from)
        .collect();

        let thresholds: HashMap<Uuid, ItemThresholds> =
            sqlx::query_as::<_, (Uuid, Decimal, i32)>(
                "SELECT id, minimum_stock, default_exp_alert FROM items",
            )
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, minimum, alert)| (id, ItemThresholds::new(minimum, alert)))
            .collect();

        let removed = sqlx::query("DELETE FROM stock_balances")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let rebuild = rebuild_ledger(receipts, issues, &thresholds, today);

        for balance in rebuild.negative_balances() {
            tracing::warn!(
                item_id = %balance.key.item_id,
                lot_no = %balance.key.lot_no,
                location = %balance.key.location,
                quantity = %balance.quantity_balance,
                "Negative balance after recalculation"
            );
        }
        for issue in &rebuild.unmatched_issues {
            tracing::warn!(
                stock_out_id = %issue.stock_out_id,
                item_id = %issue.item_id,
                lot_no = %issue.lot_no,
                "Approved stock out has no confirmed receipt for its lot"
            );
        }

        for balance in &rebuild.balances {
            sqlx::query(
                r#"
                INSERT INTO stock_balances
                    (item_id, lot_no, expiry_date, location, quantity_balance, unit_price,
                     total_value, last_in_date, last_out_date, status, days_to_expiry)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(balance.key.item_id)
            .bind(&balance.key.lot_no)
            .bind(balance.expiry_date)
            .bind(&balance.key.location)
            .bind(balance.quantity_balance)
            .bind(balance.unit_price)
            .bind(balance.total_value)
            .bind(balance.last_in_date)
            .bind(balance.last_out_date)
            .bind(balance.status.as_str())
            .bind(balance.days_to_expiry)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let summary = RecalculationSummary {
            total_records: rebuild.balances.len(),
            negative_balances: rebuild.negative_balances().count(),
            unmatched_issues: rebuild.unmatched_issues.len(),
        };

        tracing::info!(
            removed,
            total_records = summary.total_records,
            negative_balances = summary.negative_balances,
            unmatched_issues = summary.unmatched_issues,
            "Stock balance ledger recalculated"
        );

        Ok(summary)
    }
}
