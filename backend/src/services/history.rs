//! Stock history (audit trail) service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use shared::models::HistoryDraft;
use shared::types::{DateRange, PaginatedResponse, Pagination, HISTORY_PAGE_SIZE};
use shared::validation::contains_pattern;

/// History service
#[derive(Clone)]
pub struct HistoryService {
    db: PgPool,
}

/// A stored history entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub stock_id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub receive_quantity: Option<i32>,
    pub receive_by: Option<String>,
    pub issue_quantity: Option<i32>,
    pub issue_by: Option<String>,
    pub issue_to: Option<String>,
    pub created_by: Option<String>,
    pub reorder_level: Option<i32>,
    pub supplier_id: Option<i64>,
    pub supplier_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryFilter {
    pub item_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteInput {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResult {
    pub deleted: u64,
}

/// Append an entry to the history; runs inside the caller's transaction
pub async fn record_history(conn: &mut PgConnection, draft: &HistoryDraft) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO stock_history (
            stock_id, item_name, quantity, category, brand, price,
            receive_quantity, receive_by, issue_quantity, issue_by, issue_to,
            created_by, reorder_level, supplier_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id
        "#,
    )
    .bind(draft.stock_id)
    .bind(&draft.item_name)
    .bind(draft.quantity)
    .bind(&draft.category)
    .bind(&draft.brand)
    .bind(draft.price)
    .bind(draft.receive_quantity)
    .bind(&draft.receive_by)
    .bind(draft.issue_quantity)
    .bind(&draft.issue_by)
    .bind(&draft.issue_to)
    .bind(&draft.created_by)
    .bind(draft.reorder_level)
    .bind(draft.supplier_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

const HISTORY_FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR h.item_name ILIKE $1)
      AND ($2::text IS NULL OR h.brand ILIKE $2)
      AND ($3::text IS NULL OR h.category ILIKE $3)
      AND ($4::timestamptz IS NULL OR h.last_updated >= $4)
      AND ($5::timestamptz IS NULL OR h.last_updated < $5)
"#;

impl HistoryService {
    /// Create a new HistoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List history entries, newest first
    pub async fn list_history(
        &self,
        filter: &HistoryFilter,
        page: Option<u32>,
    ) -> AppResult<PaginatedResponse<HistoryEntry>> {
        let name = contains_pattern(filter.item_name.as_deref());
        let brand = contains_pattern(filter.brand.as_deref());
        let category = contains_pattern(filter.category.as_deref());
        let (from, until) = DateRange::new(filter.date_from, filter.date_to).bounds();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_history h {}",
            HISTORY_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(&brand)
        .bind(&category)
        .bind(from)
        .bind(until)
        .fetch_one(&self.db)
        .await?;

        let total = u64::try_from(total).unwrap_or_default();
        let pagination = Pagination::new(page, HISTORY_PAGE_SIZE).clamp_to(total);

        let entries = sqlx::query_as::<_, HistoryEntry>(&format!(
            r#"
            SELECT h.id, h.stock_id, h.item_name, h.quantity, h.category, h.brand, h.price,
                   h.receive_quantity, h.receive_by, h.issue_quantity, h.issue_by, h.issue_to,
                   h.created_by, h.reorder_level, h.supplier_id, sup.name AS supplier_name,
                   h."timestamp", h.last_updated
            FROM stock_history h
            LEFT JOIN suppliers sup ON sup.id = h.supplier_id
            {}
            ORDER BY h.last_updated DESC, h.id DESC
            LIMIT $6 OFFSET $7
            "#,
            HISTORY_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(&brand)
        .bind(&category)
        .bind(from)
        .bind(until)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(entries, pagination, total))
    }

    /// Purge a single entry
    pub async fn delete_entry(&self, entry_id: i64) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM stock_history WHERE id = $1")
            .bind(entry_id)
            .execute(&self.db)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found("History entry"));
        }

        Ok(())
    }

    /// Purge several entries at once; unknown ids are ignored
    pub async fn bulk_delete(&self, input: BulkDeleteInput) -> AppResult<BulkDeleteResult> {
        if input.ids.is_empty() {
            return Err(AppError::validation("ids", "No entries selected for deletion"));
        }

        let deleted = sqlx::query("DELETE FROM stock_history WHERE id = ANY($1)")
            .bind(&input.ids)
            .execute(&self.db)
            .await?;

        tracing::info!("{} history entries deleted", deleted.rows_affected());

        Ok(BulkDeleteResult {
            deleted: deleted.rows_affected(),
        })
    }
}
