//! Item master service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    highest_code, next_item_code, validate_alert_days, validate_minimum_stock, ItemCategory, PaginatedResponse,
    Pagination, RecordStatus,
};

/// Item master service
#[derive(Clone)]
pub struct ItemService {
    db: PgPool,
}

/// Item master record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub item_code: String,
    pub item_name: String,
    pub category: String,
    pub unit: String,
    pub minimum_stock: Decimal,
    pub default_exp_alert: i32,
    pub storage_location: Option<String>,
    pub responsible_person: Option<String>,
    pub remark: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item row in the listing, with the number of ledger rows it owns
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ItemSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: Item,
    pub balance_count: i64,
}

/// Ledger row as shown on the item detail page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ItemBalance {
    pub id: Uuid,
    pub lot_no: String,
    pub location: String,
    pub expiry_date: NaiveDate,
    pub quantity_balance: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub status: String,
    pub days_to_expiry: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub balances: Vec<ItemBalance>,
}

/// Input for creating or updating an item
#[derive(Debug, Deserialize, Validate)]
pub struct ItemInput {
    #[validate(length(min = 1, max = 255))]
    pub item_name: String,
    pub category: ItemCategory,
    #[validate(length(min = 1, max = 50))]
    pub unit: String,
    #[serde(default)]
    pub minimum_stock: Decimal,
    #[serde(default = "default_alert_days")]
    pub default_exp_alert: i32,
    pub storage_location: Option<String>,
    pub responsible_person: Option<String>,
    pub remark: Option<String>,
    pub status: Option<RecordStatus>,
}

fn default_alert_days() -> i32 {
    30
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemFilter {
    pub search: Option<String>,
    pub category: Option<ItemCategory>,
    pub status: Option<RecordStatus>,
}

impl ItemInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;

        if self.item_name.trim().is_empty() {
            return Err(AppError::invalid("item_name", "Item name is required", "กรุณากรอกชื่อสินค้า"));
        }
        if self.unit.trim().is_empty() {
            return Err(AppError::invalid("unit", "Unit is required", "กรุณาระบุหน่วยนับ"));
        }
        validate_minimum_stock(self.minimum_stock)
            .map_err(|msg| AppError::invalid("minimum_stock", msg, "จำนวนขั้นต่ำต้องไม่ติดลบ"))?;
        validate_alert_days(self.default_exp_alert).map_err(|msg| {
            AppError::invalid("default_exp_alert", msg, "จำนวนวันแจ้งเตือนต้องไม่ติดลบ")
        })?;
        Ok(())
    }
}

impl ItemService {
    /// Create a new ItemService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List items, newest first
    pub async fn list_items(
        &self,
        filter: &ItemFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ItemSummary>> {
        let category = filter.category.map(|c| c.as_str());
        let status = filter.status.map(|s| s.as_str());

        let items = sqlx::query_as::<_, ItemSummary>(
            r#"
            SELECT i.*,
                   (SELECT COUNT(*) FROM stock_balances sb WHERE sb.item_id = i.id) AS balance_count
            FROM items i
            WHERE ($1::text IS NULL OR i.item_code ILIKE '%' || $1 || '%' OR i.item_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR i.category = $2)
              AND ($3::text IS NULL OR i.status = $3)
            ORDER BY i.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&filter.search)
        .bind(category)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM items i
            WHERE ($1::text IS NULL OR i.item_code ILIKE '%' || $1 || '%' OR i.item_name ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR i.category = $2)
              AND ($3::text IS NULL OR i.status = $3)
            "#,
        )
        .bind(&filter.search)
        .bind(category)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total.max(0) as u64))
    }

    pub async fn get_item(&self, item_id: Uuid) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Item".to_string()))
    }

    /// Get an item with its ledger rows, most recently updated first
    pub async fn get_item_detail(&self, item_id: Uuid) -> AppResult<ItemDetail> {
        let item = self.get_item(item_id).await?;

        let balances = sqlx::query_as::<_, ItemBalance>(
            r#"
            SELECT id, lot_no, location, expiry_date, quantity_balance, unit_price,
                   total_value, status, days_to_expiry, updated_at
            FROM stock_balances
            WHERE item_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ItemDetail { item, balances })
    }

    /// Create an item with the next ITM code
    pub async fn create_item(&self, user_id: Uuid, input: ItemInput) -> AppResult<Item> {
        input.check()?;

        let mut tx = self.db.begin().await?;

        // Serialise code generation between concurrent creates
        sqlx::query("LOCK TABLE items IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let codes: Vec<String> = sqlx::query_scalar("SELECT item_code FROM items")
            .fetch_all(&mut *tx)
            .await?;
        let item_code = next_item_code(highest_code(codes.iter().map(String::as_str)));

        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (item_code, item_name, category, unit, minimum_stock, default_exp_alert,
                               storage_location, responsible_person, remark, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&item_code)
        .bind(input.item_name.trim())
        .bind(input.category.as_str())
        .bind(input.unit.trim())
        .bind(input.minimum_stock)
        .bind(input.default_exp_alert)
        .bind(&input.storage_location)
        .bind(&input.responsible_person)
        .bind(&input.remark)
        .bind(input.status.unwrap_or_default().as_str())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(item_id = %item.id, item_code = %item.item_code, "Item created");
        Ok(item)
    }

    pub async fn update_item(&self, item_id: Uuid, user_id: Uuid, input: ItemInput) -> AppResult<Item> {
        input.check()?;

        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items
            SET item_name = $2, category = $3, unit = $4, minimum_stock = $5,
                default_exp_alert = $6, storage_location = $7, responsible_person = $8,
                remark = $9, status = COALESCE($10, status), updated_by = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(input.item_name.trim())
        .bind(input.category.as_str())
        .bind(input.unit.trim())
        .bind(input.minimum_stock)
        .bind(input.default_exp_alert)
        .bind(&input.storage_location)
        .bind(&input.responsible_person)
        .bind(&input.remark)
        .bind(input.status.map(|s| s.as_str()))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        tracing::info!(item_id = %item.id, "Item updated");
        Ok(item)
    }

    /// Soft delete: the item is marked INACTIVE and keeps its history
    pub async fn deactivate_item(&self, item_id: Uuid, user_id: Uuid) -> AppResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(RecordStatus::Inactive.as_str())
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item".to_string()))?;

        tracing::info!(item_id = %item.id, "Item deactivated");
        Ok(item)
    }
}
