//! Supplier service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    highest_code, next_supplier_code, non_blank, validate_email, validate_thai_phone, validate_thai_tax_id,
    PaginatedResponse, Pagination, RecordStatus, SupplierContact,
};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub supplier_code: String,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub remark: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub supplier: Supplier,
    pub stock_in_count: i64,
}

/// Recent receipt shown on the supplier page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierReceipt {
    pub id: Uuid,
    pub stock_in_no: String,
    pub item_code: String,
    pub item_name: String,
    pub lot_no: String,
    pub quantity_in: Decimal,
    pub total_value: Option<Decimal>,
    pub import_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SupplierDetail {
    #[serde(flatten)]
    pub supplier: Supplier,
    pub recent_stock_ins: Vec<SupplierReceipt>,
}

/// Input for creating or updating a supplier
#[derive(Debug, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    #[serde(flatten)]
    pub contact: SupplierContact,
    pub tax_id: Option<String>,
    pub remark: Option<String>,
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub status: Option<RecordStatus>,
}

/// Number of receipts listed on the supplier detail page
const RECENT_RECEIPTS: i64 = 10;

impl SupplierInput {
    /// Validate and collapse blank optional fields
    fn normalized(self) -> AppResult<Self> {
        self.validate()?;

        if self.company_name.trim().is_empty() {
            return Err(AppError::invalid("company_name", "Company name is required", "กรุณากรอกชื่อบริษัท"));
        }

        let contact = self.contact.normalized();
        if let Some(email) = &contact.email {
            validate_email(email).map_err(|msg| AppError::invalid("email", msg, "กรุณากรอกอีเมลให้ถูกต้อง"))?;
        }
        if let Some(phone) = &contact.phone {
            validate_thai_phone(phone)
                .map_err(|msg| AppError::invalid("phone", msg, "รูปแบบเบอร์โทรศัพท์ไม่ถูกต้อง"))?;
        }

        let tax_id = non_blank(self.tax_id);
        if let Some(tax_id) = &tax_id {
            validate_thai_tax_id(tax_id)
                .map_err(|msg| AppError::invalid("tax_id", msg, "เลขประจำตัวผู้เสียภาษีต้องมี 13 หลัก"))?;
        }

        Ok(Self {
            company_name: self.company_name.trim().to_string(),
            contact,
            tax_id,
            remark: non_blank(self.remark),
            status: self.status,
        })
    }
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_suppliers(
        &self,
        filter: &SupplierFilter,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<SupplierSummary>> {
        let status = filter.status.map(|s| s.as_str());

        let suppliers = sqlx::query_as::<_, SupplierSummary>(
            r#"
            SELECT s.*,
                   (SELECT COUNT(*) FROM stock_ins si WHERE si.supplier_id = s.id) AS stock_in_count
            FROM suppliers s
            WHERE ($1::text IS NULL
                   OR s.supplier_code ILIKE '%' || $1 || '%'
                   OR s.company_name ILIKE '%' || $1 || '%'
                   OR s.contact_person ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR s.status = $2)
            ORDER BY s.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.search)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM suppliers s
            WHERE ($1::text IS NULL
                   OR s.supplier_code ILIKE '%' || $1 || '%'
                   OR s.company_name ILIKE '%' || $1 || '%'
                   OR s.contact_person ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR s.status = $2)
            "#,
        )
        .bind(&filter.search)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        Ok(PaginatedResponse::new(suppliers, pagination, total.max(0) as u64))
    }

    pub async fn get_supplier(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Supplier with its most recent receipts
    pub async fn get_supplier_detail(&self, supplier_id: Uuid) -> AppResult<SupplierDetail> {
        let supplier = self.get_supplier(supplier_id).await?;

        let recent_stock_ins = sqlx::query_as::<_, SupplierReceipt>(
            r#"
            SELECT si.id, si.stock_in_no, i.item_code, i.item_name, si.lot_no,
                   si.quantity_in, si.total_value, si.import_date, si.status
            FROM stock_ins si
            JOIN items i ON i.id = si.item_id
            WHERE si.supplier_id = $1
            ORDER BY si.import_date DESC, si.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(supplier_id)
        .bind(RECENT_RECEIPTS)
        .fetch_all(&self.db)
        .await?;

        Ok(SupplierDetail {
            supplier,
            recent_stock_ins,
        })
    }

    pub async fn create_supplier(&self, user_id: Uuid, input: SupplierInput) -> AppResult<Supplier> {
        let input = input.normalized()?;

        let mut tx = self.db.begin().await?;

        sqlx::query("LOCK TABLE suppliers IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let codes: Vec<String> = sqlx::query_scalar("SELECT supplier_code FROM suppliers")
            .fetch_all(&mut *tx)
            .await?;
        let supplier_code = next_supplier_code(highest_code(codes.iter().map(String::as_str)));

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            INSERT INTO suppliers (supplier_code, company_name, contact_person, phone, email,
                                   address, tax_id, remark, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(&supplier_code)
        .bind(&input.company_name)
        .bind(&input.contact.contact_person)
        .bind(&input.contact.phone)
        .bind(&input.contact.email)
        .bind(&input.contact.address)
        .bind(&input.tax_id)
        .bind(&input.remark)
        .bind(input.status.unwrap_or_default().as_str())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(supplier_id = %supplier.id, supplier_code = %supplier.supplier_code, "Supplier created");
        Ok(supplier)
    }

    pub async fn update_supplier(
        &self,
        supplier_id: Uuid,
        user_id: Uuid,
        input: SupplierInput,
    ) -> AppResult<Supplier> {
        let input = input.normalized()?;

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers
            SET company_name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                tax_id = $7, remark = $8, status = COALESCE($9, status),
                updated_by = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(supplier_id)
        .bind(&input.company_name)
        .bind(&input.contact.contact_person)
        .bind(&input.contact.phone)
        .bind(&input.contact.email)
        .bind(&input.contact.address)
        .bind(&input.tax_id)
        .bind(&input.remark)
        .bind(input.status.map(|s| s.as_str()))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        tracing::info!(supplier_id = %supplier.id, "Supplier updated");
        Ok(supplier)
    }

    /// Soft delete
    pub async fn deactivate_supplier(&self, supplier_id: Uuid, user_id: Uuid) -> AppResult<Supplier> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            UPDATE suppliers SET status = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(supplier_id)
        .bind(RecordStatus::Inactive.as_str())
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        tracing::info!(supplier_id = %supplier.id, "Supplier deactivated");
        Ok(supplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SupplierInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn blank_contact_fields_become_none() {
        let input = parse(r#"{"company_name":" Siam Medical ","email":"","phone":"  ","tax_id":""}"#)
            .normalized()
            .unwrap();
        assert_eq!(input.company_name, "Siam Medical");
        assert_eq!(input.contact.email, None);
        assert_eq!(input.contact.phone, None);
        assert_eq!(input.tax_id, None);
    }

    #[test]
    fn rejects_malformed_contact_details() {
        let bad_email = parse(r#"{"company_name":"Siam Medical","email":"nobody"}"#).normalized();
        assert!(matches!(bad_email, Err(AppError::Validation { field, .. }) if field == "email"));

        let bad_tax = parse(r#"{"company_name":"Siam Medical","tax_id":"12345"}"#).normalized();
        assert!(matches!(bad_tax, Err(AppError::Validation { field, .. }) if field == "tax_id"));
    }

    #[test]
    fn accepts_thai_phone() {
        let input = parse(r#"{"company_name":"Siam Medical","phone":"081-234-5678"}"#).normalized();
        assert!(input.is_ok());
    }
}
