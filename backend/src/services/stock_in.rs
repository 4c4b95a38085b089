//! Stock receipt (stock-in) workflow
//!
//! A receipt is created as DRAFT and only reaches the ledger when it is
//! confirmed. Confirmation, edits of a confirmed receipt and cancellation
//! each run in one transaction together with their ledger change.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    daily_prefix, highest_code, next_stock_in_no, non_blank, total_value, validate_future_expiry,
    validate_lot_no, validate_quantity, validate_unit_price, PaginatedResponse, Pagination,
    ReceiptLine, StockInStatus, STOCK_IN_PREFIX,
};
use crate::services::BalanceService;

/// Stock-in service
#[derive(Clone)]
pub struct StockInService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockIn {
    pub id: Uuid,
    pub stock_in_no: String,
    pub item_id: Uuid,
    pub lot_no: String,
    pub expiry_date: NaiveDate,
    pub quantity_in: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub supplier_id: Uuid,
    pub invoice_no: Option<String>,
    pub import_date: NaiveDate,
    pub import_by: Option<String>,
    pub storage_location: String,
    pub remark_in: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockIn {
    fn current_status(&self) -> AppResult<StockInStatus> {
        self.status
            .parse()
            .map_err(|e: shared::UnknownVariant| AppError::InternalError(e.into()))
    }

    /// The receipt as it contributes to the ledger
    fn line(&self) -> ReceiptLine {
        ReceiptLine {
            item_id: self.item_id,
            lot_no: self.lot_no.clone(),
            location: self.storage_location.clone(),
            expiry_date: self.expiry_date,
            quantity: self.quantity_in,
            unit_price: self.unit_price,
            import_date: self.import_date,
        }
    }
}

/// Receipt joined with its item and supplier for listings
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockInView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stock_in: StockIn,
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
    pub category: String,
    pub supplier_code: String,
    pub company_name: String,
}

/// Input for creating or updating a receipt
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StockInInput {
    pub item_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub lot_no: String,
    pub expiry_date: NaiveDate,
    pub quantity_in: Decimal,
    pub unit_price: Option<Decimal>,
    pub supplier_id: Uuid,
    pub invoice_no: Option<String>,
    pub import_date: NaiveDate,
    pub import_by: Option<String>,
    #[serde(default)]
    pub storage_location: String,
    pub remark_in: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StockInFilter {
    pub item_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub status: Option<StockInStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl StockInInput {
    fn check(&self, today: NaiveDate) -> AppResult<()> {
        self.validate()?;

        validate_lot_no(&self.lot_no).map_err(|msg| AppError::invalid("lot_no", msg, "กรุณากรอกเลข Lot"))?;
        validate_quantity(self.quantity_in)
            .map_err(|msg| AppError::invalid("quantity_in", msg, "จำนวนต้องมากกว่า 0"))?;
        validate_unit_price(self.unit_price)
            .map_err(|msg| AppError::invalid("unit_price", msg, "ราคาต้องมากกว่าหรือเท่ากับ 0"))?;
        validate_future_expiry(self.expiry_date, today)
            .map_err(|msg| AppError::invalid("expiry_date", msg, "วันหมดอายุต้องเป็นวันในอนาคต"))?;
        Ok(())
    }

    fn line(&self) -> ReceiptLine {
        ReceiptLine {
            item_id: self.item_id,
            lot_no: self.lot_no.trim().to_string(),
            location: self.storage_location.trim().to_string(),
            expiry_date: self.expiry_date,
            quantity: self.quantity_in,
            unit_price: self.unit_price,
            import_date: self.import_date,
        }
    }
}

const VIEW_SELECT: &str = r#"
    SELECT si.*, i.item_code, i.item_name, i.unit, i.category, s.supplier_code, s.company_name
    FROM stock_ins si
    JOIN items i ON i.id = si.item_id
    JOIN suppliers s ON s.id = si.supplier_id
"#;

const LIST_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR si.item_id = $1)
      AND ($2::uuid IS NULL OR si.supplier_id = $2)
      AND ($3::text IS NULL OR si.status = $3)
      AND ($4::date IS NULL OR si.import_date >= $4)
      AND ($5::date IS NULL OR si.import_date <= $5)
"#;

impl StockInService {
    /// Create a new StockInService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_stock_ins(
        &self,
        filter: &StockInFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockInView>> {
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, StockInView>(&format!(
            "{} {} ORDER BY si.import_date DESC, si.created_at DESC LIMIT $6 OFFSET $7",
            VIEW_SELECT, LIST_FILTER
        ))
        .bind(filter.item_id)
        .bind(filter.supplier_id)
        .bind(status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM stock_ins si {}", LIST_FILTER))
            .bind(filter.item_id)
            .bind(filter.supplier_id)
            .bind(status)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&self.db)
            .await?;

        Ok(PaginatedResponse::new(rows, pagination, total.max(0) as u64))
    }

    pub async fn get_stock_in(&self, stock_in_id: Uuid) -> AppResult<StockInView> {
        sqlx::query_as::<_, StockInView>(&format!("{} WHERE si.id = $1", VIEW_SELECT))
            .bind(stock_in_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock in".to_string()))
    }

    /// Record a receipt as DRAFT; the ledger is untouched until confirmation
    pub async fn create_stock_in(&self, user: &AuthUser, input: StockInInput) -> AppResult<StockIn> {
        let today = Utc::now().date_naive();
        input.check(today)?;

        let mut tx = self.db.begin().await?;
        Self::ensure_references(&mut tx, input.item_id, input.supplier_id).await?;

        sqlx::query("LOCK TABLE stock_ins IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let issued_today: Vec<String> =
            sqlx::query_scalar("SELECT stock_in_no FROM stock_ins WHERE stock_in_no LIKE $1 || '-%'")
                .bind(daily_prefix(STOCK_IN_PREFIX, input.import_date))
                .fetch_all(&mut *tx)
                .await?;
        let stock_in_no = next_stock_in_no(
            input.import_date,
            highest_code(issued_today.iter().map(String::as_str)),
        );

        let line = input.line();
        let import_by = non_blank(input.import_by).unwrap_or_else(|| user.display_name());

        let stock_in = sqlx::query_as::<_, StockIn>(
            r#"
            INSERT INTO stock_ins (stock_in_no, item_id, lot_no, expiry_date, quantity_in, unit_price,
                                   total_value, supplier_id, invoice_no, import_date, import_by,
                                   storage_location, remark_in, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(&stock_in_no)
        .bind(line.item_id)
        .bind(&line.lot_no)
        .bind(line.expiry_date)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(total_value(line.quantity, line.unit_price))
        .bind(input.supplier_id)
        .bind(non_blank(input.invoice_no))
        .bind(line.import_date)
        .bind(&import_by)
        .bind(&line.location)
        .bind(non_blank(input.remark_in))
        .bind(StockInStatus::Draft.as_str())
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(stock_in_id = %stock_in.id, stock_in_no = %stock_in.stock_in_no, "Stock in drafted");
        Ok(stock_in)
    }

    /// DRAFT → CONFIRMED, adding the receipt to the ledger
    pub async fn confirm_stock_in(&self, stock_in_id: Uuid, user: &AuthUser) -> AppResult<StockIn> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        let current = Self::lock(&mut tx, stock_in_id).await?;
        let status = current.current_status()?;
        if !status.can_confirm() {
            return Err(AppError::InvalidStateTransition(format!(
                "only DRAFT receipts can be confirmed, {} is {}",
                current.stock_in_no, status
            )));
        }

        let confirmed = Self::set_status(&mut tx, stock_in_id, StockInStatus::Confirmed, user.user_id).await?;

        if let Err(err) = BalanceService::apply_stock_in(&mut tx, stock_in_id, today).await {
            tracing::warn!(
                stock_in_id = %stock_in_id,
                error = %err,
                "Ledger update failed, confirmation rolled back"
            );
            return Err(err);
        }

        tx.commit().await?;

        tracing::info!(
            stock_in_id = %stock_in_id,
            stock_in_no = %confirmed.stock_in_no,
            confirmed_by = %user.user_id,
            "Stock in confirmed"
        );
        Ok(confirmed)
    }

    /// Edit a DRAFT or CONFIRMED receipt
    ///
    /// A confirmed receipt moves the ledger by the difference between its old
    /// and new contribution.
    pub async fn update_stock_in(
        &self,
        stock_in_id: Uuid,
        user: &AuthUser,
        input: StockInInput,
    ) -> AppResult<StockIn> {
        let today = Utc::now().date_naive();
        input.check(today)?;

        let mut tx = self.db.begin().await?;

        let current = Self::lock(&mut tx, stock_in_id).await?;
        let status = current.current_status()?;
        if !status.can_edit() {
            return Err(AppError::InvalidStateTransition(format!(
                "cancelled receipt {} cannot be edited",
                current.stock_in_no
            )));
        }
        Self::ensure_references(&mut tx, input.item_id, input.supplier_id).await?;

        let line = input.line();
        let import_by = non_blank(input.import_by).or_else(|| current.import_by.clone());

        let updated = sqlx::query_as::<_, StockIn>(
            r#"
            UPDATE stock_ins
            SET item_id = $2, lot_no = $3, expiry_date = $4, quantity_in = $5, unit_price = $6,
                total_value = $7, supplier_id = $8, invoice_no = $9, import_date = $10,
                import_by = $11, storage_location = $12, remark_in = $13,
                updated_by = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(stock_in_id)
        .bind(line.item_id)
        .bind(&line.lot_no)
        .bind(line.expiry_date)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(total_value(line.quantity, line.unit_price))
        .bind(input.supplier_id)
        .bind(non_blank(input.invoice_no))
        .bind(line.import_date)
        .bind(&import_by)
        .bind(&line.location)
        .bind(non_blank(input.remark_in))
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if status.affects_ledger() {
            BalanceService::apply_receipt_edit(&mut tx, &current.line(), &line, today).await?;
        }

        tx.commit().await?;

        tracing::info!(
            stock_in_id = %stock_in_id,
            status = %status,
            "Stock in updated"
        );
        Ok(updated)
    }

    /// Cancel a receipt; a confirmed receipt is taken back out of the ledger
    pub async fn cancel_stock_in(&self, stock_in_id: Uuid, user: &AuthUser) -> AppResult<StockIn> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        let current = Self::lock(&mut tx, stock_in_id).await?;
        let status = current.current_status()?;
        if !status.can_cancel() {
            return Err(AppError::InvalidStateTransition(format!(
                "receipt {} is already cancelled",
                current.stock_in_no
            )));
        }

        if status.affects_ledger() {
            BalanceService::reverse_stock_in(&mut tx, &current.line(), today).await?;
        }

        let cancelled = Self::set_status(&mut tx, stock_in_id, StockInStatus::Cancelled, user.user_id).await?;
        tx.commit().await?;

        tracing::info!(
            stock_in_id = %stock_in_id,
            previous_status = %status,
            "Stock in cancelled"
        );
        Ok(cancelled)
    }

    async fn lock(conn: &mut PgConnection, stock_in_id: Uuid) -> AppResult<StockIn> {
        sqlx::query_as::<_, StockIn>("SELECT * FROM stock_ins WHERE id = $1 FOR UPDATE")
            .bind(stock_in_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock in".to_string()))
    }

    async fn set_status(
        conn: &mut PgConnection,
        stock_in_id: Uuid,
        status: StockInStatus,
        user_id: Uuid,
    ) -> AppResult<StockIn> {
        let stock_in = sqlx::query_as::<_, StockIn>(
            r#"
            UPDATE stock_ins SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(stock_in_id)
        .bind(status.as_str())
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(stock_in)
    }

    async fn ensure_references(conn: &mut PgConnection, item_id: Uuid, supplier_id: Uuid) -> AppResult<()> {
        let (item_exists, supplier_exists): (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS(SELECT 1 FROM items WHERE id = $1),
                   EXISTS(SELECT 1 FROM suppliers WHERE id = $2)
            "#,
        )
        .bind(item_id)
        .bind(supplier_id)
        .fetch_one(&mut *conn)
        .await?;

        if !item_exists {
            return Err(AppError::invalid("item_id", "Item does not exist", "กรุณาเลือกสินค้า"));
        }
        if !supplier_exists {
            return Err(AppError::invalid("supplier_id", "Supplier does not exist", "กรุณาเลือกซัพพลายเออร์"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(today: NaiveDate) -> StockInInput {
        StockInInput {
            item_id: Uuid::new_v4(),
            lot_no: " L1 ".into(),
            expiry_date: today + Duration::days(365),
            quantity_in: Decimal::from(500),
            unit_price: Some(Decimal::from(5)),
            supplier_id: Uuid::new_v4(),
            invoice_no: None,
            import_date: today,
            import_by: None,
            storage_location: " Fridge A ".into(),
            remark_in: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn valid_receipt_passes() {
        assert!(input(today()).check(today()).is_ok());
    }

    #[test]
    fn rejects_expiry_today_or_earlier() {
        let mut receipt = input(today());
        receipt.expiry_date = today();
        assert!(matches!(
            receipt.check(today()),
            Err(AppError::Validation { field, .. }) if field == "expiry_date"
        ));
    }

    #[test]
    fn rejects_zero_quantity_and_negative_price() {
        let mut zero = input(today());
        zero.quantity_in = Decimal::ZERO;
        assert!(matches!(zero.check(today()), Err(AppError::Validation { field, .. }) if field == "quantity_in"));

        let mut negative = input(today());
        negative.unit_price = Some(Decimal::from(-1));
        assert!(matches!(negative.check(today()), Err(AppError::Validation { field, .. }) if field == "unit_price"));
    }

    #[test]
    fn ledger_line_is_trimmed() {
        let line = input(today()).line();
        assert_eq!(line.lot_no, "L1");
        assert_eq!(line.location, "Fridge A");
        assert_eq!(line.quantity, Decimal::from(500));
    }

    #[test]
    fn storage_location_defaults_to_empty() {
        let parsed: StockInInput = serde_json::from_str(&format!(
            r#"{{"item_id":"{}","lot_no":"L1","expiry_date":"2027-01-01","quantity_in":"10",
                "supplier_id":"{}","import_date":"2026-03-01"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(parsed.storage_location, "");
        assert_eq!(parsed.unit_price, None);
    }
}
