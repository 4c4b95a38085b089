//! Stock issuance (stock-out) workflow

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{
    allocate_fefo, daily_prefix, highest_code, next_stock_out_no, non_blank, validate_lot_no, validate_quantity,
    validate_required, AvailableLot, FefoAllocation, PaginatedResponse, Pagination, StockOutStatus,
    STOCK_OUT_PREFIX, UNSPECIFIED_DEPARTMENT,
};
use crate::services::BalanceService;

/// Stock-out service
#[derive(Clone)]
pub struct StockOutService {
    db: PgPool,
    balances: BalanceService,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockOut {
    pub id: Uuid,
    pub stock_out_no: String,
    pub item_id: Uuid,
    pub lot_no: String,
    pub quantity_out: Decimal,
    pub purpose: String,
    pub request_dept: String,
    pub request_by: Option<String>,
    pub approve_by: Option<String>,
    pub out_date: NaiveDate,
    pub remark_out: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockOut {
    fn current_status(&self) -> AppResult<StockOutStatus> {
        self.status
            .parse()
            .map_err(|e: shared::UnknownVariant| AppError::InternalError(e.into()))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockOutView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stock_out: StockOut,
    pub item_code: String,
    pub item_name: String,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StockOutInput {
    pub item_id: Uuid,
    /// Optional in the payload so a missing lot gets a field-level message
    pub lot_no: Option<String>,
    pub quantity_out: Decimal,
    #[validate(length(min = 1))]
    pub purpose: String,
    pub request_dept: Option<String>,
    pub request_by: Option<String>,
    pub out_date: NaiveDate,
    pub remark_out: Option<String>,
}

impl StockOutInput {
    /// Validate and return the trimmed lot number
    fn check(&self) -> AppResult<String> {
        self.validate()?;

        let lot_no = self.lot_no.as_deref().unwrap_or_default().trim().to_string();
        validate_lot_no(&lot_no)
            .map_err(|msg| AppError::invalid("lot_no", msg, "กรุณาเลือก Lot ที่ต้องการเบิก"))?;
        validate_quantity(self.quantity_out)
            .map_err(|msg| AppError::invalid("quantity_out", msg, "จำนวนต้องมากกว่า 0"))?;
        validate_required(&self.purpose, "Purpose is required")
            .map_err(|msg| AppError::invalid("purpose", msg, "กรุณากรอกวัตถุประสงค์"))?;
        Ok(lot_no)
    }

    fn department(&self) -> String {
        non_blank(self.request_dept.clone()).unwrap_or_else(|| UNSPECIFIED_DEPARTMENT.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StockOutFilter {
    pub item_id: Option<Uuid>,
    pub request_dept: Option<String>,
    pub status: Option<StockOutStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Issuable lots for an item, with an allocation preview when a quantity is given
#[derive(Debug, Serialize)]
pub struct LotAvailability {
    pub item_id: Uuid,
    pub lots: Vec<AvailableLot>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<FefoAllocation>,
}

const VIEW_SELECT: &str = r#"
    SELECT so.*, i.item_code, i.item_name, i.unit
    FROM stock_outs so
    JOIN items i ON i.id = so.item_id
"#;

const LIST_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR so.item_id = $1)
      AND ($2::text IS NULL OR so.request_dept ILIKE '%' || $2 || '%')
      AND ($3::text IS NULL OR so.status = $3)
      AND ($4::date IS NULL OR so.out_date >= $4)
      AND ($5::date IS NULL OR so.out_date <= $5)
"#;

impl StockOutService {
    /// Create a new StockOutService instance
    pub fn new(db: PgPool) -> Self {
        Self {
            balances: BalanceService::new(db.clone()),
            db,
        }
    }

    pub async fn list_stock_outs(
        &self,
        filter: &StockOutFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockOutView>> {
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, StockOutView>(&format!(
            "{} {} ORDER BY so.out_date DESC, so.created_at DESC LIMIT $6 OFFSET $7",
            VIEW_SELECT, LIST_FILTER
        ))
        .bind(filter.item_id)
        .bind(&filter.request_dept)
        .bind(status)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM stock_outs so {}", LIST_FILTER))
            .bind(filter.item_id)
            .bind(&filter.request_dept)
            .bind(status)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .fetch_one(&self.db)
            .await?;

        Ok(PaginatedResponse::new(rows, pagination, total.max(0) as u64))
    }

    pub async fn get_stock_out(&self, stock_out_id: Uuid) -> AppResult<StockOutView> {
        sqlx::query_as::<_, StockOutView>(&format!("{} WHERE so.id = $1", VIEW_SELECT))
            .bind(stock_out_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock out".to_string()))
    }

    /// FEFO-ordered lots for the lot picker
    pub async fn available_lots(&self, item_id: Uuid, quantity: Option<Decimal>) -> AppResult<LotAvailability> {
        let lots = self.balances.get_available_lots(item_id).await?;
        let allocation = quantity
            .filter(|q| *q > Decimal::ZERO)
            .map(|q| allocate_fefo(&lots, q));

        Ok(LotAvailability {
            item_id,
            total: lots.len(),
            lots,
            allocation,
        })
    }

    /// Record an issue request as DRAFT after checking the lot can cover it
    pub async fn create_stock_out(&self, user: &AuthUser, input: StockOutInput) -> AppResult<StockOut> {
        let lot_no = input.check()?;
        self.ensure_sufficient(input.item_id, &lot_no, input.quantity_out).await?;

        let mut tx = self.db.begin().await?;

        sqlx::query("LOCK TABLE stock_outs IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let issued_today: Vec<String> =
            sqlx::query_scalar("SELECT stock_out_no FROM stock_outs WHERE stock_out_no LIKE $1 || '-%'")
                .bind(daily_prefix(STOCK_OUT_PREFIX, input.out_date))
                .fetch_all(&mut *tx)
                .await?;
        let stock_out_no = next_stock_out_no(
            input.out_date,
            highest_code(issued_today.iter().map(String::as_str)),
        );

        let request_by = non_blank(input.request_by.clone()).unwrap_or_else(|| user.display_name());

        let stock_out = sqlx::query_as::<_, StockOut>(
            r#"
            INSERT INTO stock_outs (stock_out_no, item_id, lot_no, quantity_out, purpose, request_dept,
                                    request_by, out_date, remark_out, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&stock_out_no)
        .bind(input.item_id)
        .bind(&lot_no)
        .bind(input.quantity_out)
        .bind(input.purpose.trim())
        .bind(input.department())
        .bind(&request_by)
        .bind(input.out_date)
        .bind(non_blank(input.remark_out))
        .bind(StockOutStatus::Draft.as_str())
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(stock_out_id = %stock_out.id, stock_out_no = %stock_out.stock_out_no, "Stock out drafted");
        Ok(stock_out)
    }

    /// Edit a DRAFT issue request
    pub async fn update_stock_out(
        &self,
        stock_out_id: Uuid,
        user: &AuthUser,
        input: StockOutInput,
    ) -> AppResult<StockOut> {
        let lot_no = input.check()?;

        let current = self.get_stock_out(stock_out_id).await?.stock_out;
        let status = current.current_status()?;
        if !status.can_edit() {
            return Err(AppError::InvalidStateTransition(format!(
                "only DRAFT issues can be edited, {} is {}",
                current.stock_out_no, status
            )));
        }

        self.ensure_sufficient(input.item_id, &lot_no, input.quantity_out).await?;

        let request_by = non_blank(input.request_by.clone()).or(current.request_by);

        let updated = sqlx::query_as::<_, StockOut>(
            r#"
            UPDATE stock_outs
            SET item_id = $2, lot_no = $3, quantity_out = $4, purpose = $5, request_dept = $6,
                request_by = $7, out_date = $8, remark_out = $9, updated_by = $10, updated_at = NOW()
            WHERE id = $1 AND status = $11
            RETURNING *
            "#,
        )
        .bind(stock_out_id)
        .bind(input.item_id)
        .bind(&lot_no)
        .bind(input.quantity_out)
        .bind(input.purpose.trim())
        .bind(input.department())
        .bind(&request_by)
        .bind(input.out_date)
        .bind(non_blank(input.remark_out))
        .bind(user.user_id)
        .bind(StockOutStatus::Draft.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::InvalidStateTransition(format!("{} is no longer a draft", current.stock_out_no))
        })?;

        tracing::info!(stock_out_id = %stock_out_id, "Stock out updated");
        Ok(updated)
    }

    /// DRAFT → APPROVED, deducting the issue from the ledger
    pub async fn approve_stock_out(&self, stock_out_id: Uuid, user: &AuthUser) -> AppResult<StockOut> {
        let today = Utc::now().date_naive();
        let mut tx = self.db.begin().await?;

        let current = Self::lock(&mut tx, stock_out_id).await?;
        let status = current.current_status()?;
        if !status.can_approve() {
            return Err(AppError::InvalidStateTransition(format!(
                "only DRAFT issues can be approved, {} is {}",
                current.stock_out_no, status
            )));
        }

        let approved = sqlx::query_as::<_, StockOut>(
            r#"
            UPDATE stock_outs
            SET status = $2, approve_by = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(stock_out_id)
        .bind(StockOutStatus::Approved.as_str())
        .bind(user.display_name())
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Err(err) = BalanceService::apply_stock_out(&mut tx, stock_out_id, today).await {
            tracing::warn!(
                stock_out_id = %stock_out_id,
                error = %err,
                "Ledger update failed, approval rolled back"
            );
            return Err(err);
        }

        tx.commit().await?;

        tracing::info!(
            stock_out_id = %stock_out_id,
            stock_out_no = %approved.stock_out_no,
            approve_by = ?approved.approve_by,
            "Stock out approved"
        );
        Ok(approved)
    }

    /// DRAFT → CANCELLED
    pub async fn cancel_stock_out(&self, stock_out_id: Uuid, user: &AuthUser) -> AppResult<StockOut> {
        let mut tx = self.db.begin().await?;

        let current = Self::lock(&mut tx, stock_out_id).await?;
        let status = current.current_status()?;
        if !status.can_cancel() {
            return Err(AppError::InvalidStateTransition(format!(
                "only DRAFT issues can be cancelled, {} is {}",
                current.stock_out_no, status
            )));
        }

        let cancelled = sqlx::query_as::<_, StockOut>(
            r#"
            UPDATE stock_outs SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(stock_out_id)
        .bind(StockOutStatus::Cancelled.as_str())
        .bind(user.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(stock_out_id = %stock_out_id, "Stock out cancelled");
        Ok(cancelled)
    }

    async fn ensure_sufficient(&self, item_id: Uuid, lot_no: &str, requested: Decimal) -> AppResult<()> {
        let available = self
            .balances
            .lot_quantity(item_id, lot_no)
            .await?
            .unwrap_or(Decimal::ZERO);

        if available < requested {
            return Err(AppError::InsufficientStock {
                lot_no: lot_no.to_string(),
                requested,
                available,
            });
        }
        Ok(())
    }

    async fn lock(conn: &mut PgConnection, stock_out_id: Uuid) -> AppResult<StockOut> {
        sqlx::query_as::<_, StockOut>("SELECT * FROM stock_outs WHERE id = $1 FOR UPDATE")
            .bind(stock_out_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Stock out".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> StockOutInput {
        StockOutInput {
            item_id: Uuid::new_v4(),
            lot_no: Some(" L1 ".into()),
            quantity_out: Decimal::from(50),
            purpose: "Ward restock".into(),
            request_dept: None,
            request_by: None,
            out_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            remark_out: None,
        }
    }

    #[test]
    fn returns_trimmed_lot() {
        assert_eq!(input().check().unwrap(), "L1");
    }

    #[test]
    fn lot_is_required() {
        let mut missing = input();
        missing.lot_no = None;
        assert!(matches!(missing.check(), Err(AppError::Validation { field, .. }) if field == "lot_no"));

        let mut blank = input();
        blank.lot_no = Some("  ".into());
        assert!(matches!(blank.check(), Err(AppError::Validation { field, .. }) if field == "lot_no"));
    }

    #[test]
    fn purpose_and_quantity_are_checked() {
        let mut purpose = input();
        purpose.purpose = "   ".into();
        assert!(matches!(purpose.check(), Err(AppError::Validation { field, .. }) if field == "purpose"));

        let mut quantity = input();
        quantity.quantity_out = Decimal::new(-5, 1);
        assert!(matches!(quantity.check(), Err(AppError::Validation { field, .. }) if field == "quantity_out"));
    }

    #[test]
    fn department_defaults_to_unspecified() {
        assert_eq!(input().department(), UNSPECIFIED_DEPARTMENT);

        let mut named = input();
        named.request_dept = Some(" Lab ".into());
        assert_eq!(named.department(), "Lab");
    }
}
