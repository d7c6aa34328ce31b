//! Stock item service
//!
//! Every path that changes `quantity` locks the stock row with
//! `SELECT ... FOR UPDATE`, applies the rules from `shared::ledger`, writes the
//! row back and appends the history entry inside the same transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::external::PostCommit;
use crate::middleware::AuthUser;
use crate::services::history::record_history;
use crate::services::supplier::resolve_supplier;
use crate::services::conflict_on_unique;
use shared::ledger::{apply_movement, needs_reorder, validate_new_item, validate_price, validate_reorder_level};
use shared::models::{HistoryDraft, Movement, StockSnapshot};
use shared::types::{PaginatedResponse, Pagination, STOCK_PAGE_SIZE};
use shared::validation::{contains_pattern, normalize_name};

/// Stock item service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// A stock item as returned by the API
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockItem {
    pub id: i64,
    pub item_name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: i32,
    pub reorder_level: i32,
    pub supplier_id: Option<i64>,
    pub supplier_name: Option<String>,
    pub receive_quantity: i32,
    pub receive_by: Option<String>,
    pub issue_quantity: i32,
    pub issue_by: Option<String>,
    pub issue_to: Option<String>,
    pub created_by: Option<String>,
    pub added_by: Option<Uuid>,
    pub image_url: Option<String>,
    pub export_to_csv: bool,
    pub timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[sqlx(skip)]
    pub needs_reorder: bool,
}

impl StockItem {
    pub(crate) fn with_reorder_flag(mut self) -> Self {
        self.needs_reorder = needs_reorder(self.quantity, self.reorder_level);
        self
    }
}

/// Locked row used to apply the reconciliation rules
#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: i64,
    item_name: String,
    quantity: i32,
    category: Option<String>,
    brand: Option<String>,
    price: Option<Decimal>,
    reorder_level: i32,
    supplier_id: Option<i64>,
}

impl From<SnapshotRow> for StockSnapshot {
    fn from(row: SnapshotRow) -> Self {
        StockSnapshot {
            id: row.id,
            item_name: row.item_name,
            quantity: row.quantity,
            category: row.category,
            brand: row.brand,
            price: row.price,
            reorder_level: row.reorder_level,
            supplier_id: row.supplier_id,
        }
    }
}

/// Substring filters shared by the stock list and the CSV export
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockFilter {
    pub item_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
}

impl StockFilter {
    /// `ILIKE` patterns for item name, brand and category, in that order
    pub(crate) fn patterns(&self) -> (Option<String>, Option<String>, Option<String>) {
        (
            contains_pattern(self.item_name.as_deref()),
            contains_pattern(self.brand.as_deref()),
            contains_pattern(self.category.as_deref()),
        )
    }
}

/// `WHERE` clause matching `StockFilter::patterns` bound as $1..$3
pub(crate) const STOCK_FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR s.item_name ILIKE $1)
      AND ($2::text IS NULL OR s.brand ILIKE $2)
      AND ($3::text IS NULL OR s.category ILIKE $3)
"#;

/// Input for adding a stock item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockInput {
    #[validate(length(min = 1, max = 50))]
    pub item_name: String,
    #[serde(default)]
    pub quantity: i32,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 50))]
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default)]
    pub reorder_level: i32,
    /// Free-text supplier name, created when unknown
    #[validate(length(max = 100))]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub export_to_csv: bool,
}

/// Input for editing a stock item; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStockInput {
    #[validate(length(min = 1, max = 50))]
    pub item_name: Option<String>,
    #[validate(length(max = 50))]
    pub category: Option<String>,
    #[validate(length(max = 50))]
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub export_to_csv: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub quantity: i32,
    /// Switch the item to this supplier
    pub supplier_id: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IssueInput {
    pub quantity: i32,
    #[validate(length(max = 50))]
    pub issue_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderLevelInput {
    pub reorder_level: i32,
}

/// Price lookup used by the checkout screen
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductPrice {
    pub id: i64,
    pub item_name: String,
    pub price: Option<Decimal>,
    pub quantity: i32,
}

pub(crate) const STOCK_SELECT: &str = r#"
    SELECT s.id, s.item_name, s.category, s.brand, s.price, s.quantity, s.reorder_level,
           s.supplier_id, sup.name AS supplier_name,
           s.receive_quantity, s.receive_by, s.issue_quantity, s.issue_by, s.issue_to,
           s.created_by, s.added_by, s.image_url, s.export_to_csv, s."timestamp", s.last_updated
    FROM stock_items s
    LEFT JOIN suppliers sup ON sup.id = s.supplier_id
"#;

/// Fetch one item with its supplier name
pub(crate) async fn fetch_item(conn: &mut PgConnection, item_id: i64) -> AppResult<StockItem> {
    sqlx::query_as::<_, StockItem>(&format!("{} WHERE s.id = $1", STOCK_SELECT))
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(StockItem::with_reorder_flag)
        .ok_or_else(|| AppError::not_found("Stock item"))
}

/// Lock a stock row for the rest of the transaction
pub(crate) async fn lock_item(conn: &mut PgConnection, item_id: i64) -> AppResult<StockSnapshot> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        r#"
        SELECT id, item_name, quantity, category, brand, price, reorder_level, supplier_id
        FROM stock_items
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Stock item"))?;

    Ok(row.into())
}

fn duplicate_item() -> impl FnOnce(sqlx::Error) -> AppError {
    conflict_on_unique("Stock item with this name, brand and category")
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List stock items matching the filter, ordered by name
    pub async fn list_items(
        &self,
        filter: &StockFilter,
        page: Option<u32>,
    ) -> AppResult<PaginatedResponse<StockItem>> {
        let (name, brand, category) = filter.patterns();

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM stock_items s {}",
            STOCK_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(&brand)
        .bind(&category)
        .fetch_one(&self.db)
        .await?;

        let total = u64::try_from(total).unwrap_or_default();
        let pagination = Pagination::new(page, STOCK_PAGE_SIZE).clamp_to(total);

        let items = sqlx::query_as::<_, StockItem>(&format!(
            "{} {} ORDER BY s.item_name, s.id LIMIT $4 OFFSET $5",
            STOCK_SELECT, STOCK_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(&brand)
        .bind(&category)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StockItem::with_reorder_flag)
        .collect();

        Ok(PaginatedResponse::new(items, pagination, total))
    }

    pub async fn get_item(&self, item_id: i64) -> AppResult<StockItem> {
        let mut conn = self.db.acquire().await?;
        fetch_item(&mut conn, item_id).await
    }

    /// Add an item and write its creation history entry
    pub async fn create_item(&self, input: CreateStockInput, actor: &AuthUser) -> AppResult<StockItem> {
        input.validate()?;
        validate_new_item(input.quantity, input.reorder_level, input.price)?;
        let item_name = normalize_name(Some(&input.item_name))
            .ok_or_else(|| AppError::validation("item_name", "Item name is required"))?;

        let mut tx = self.db.begin().await?;

        let supplier_id = match normalize_name(input.supplier_name.as_deref()) {
            Some(name) => Some(resolve_supplier(&mut tx, &name).await?),
            None => None,
        };

        let item_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO stock_items (
                item_name, quantity, category, brand, price, reorder_level,
                supplier_id, created_by, added_by, export_to_csv
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&item_name)
        .bind(input.quantity)
        .bind(normalize_name(input.category.as_deref()))
        .bind(normalize_name(input.brand.as_deref()))
        .bind(input.price)
        .bind(input.reorder_level)
        .bind(supplier_id)
        .bind(&actor.username)
        .bind(actor.user_id)
        .bind(input.export_to_csv)
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_item())?;

        let snapshot = lock_item(&mut tx, item_id).await?;
        record_history(&mut tx, &HistoryDraft::item_created(&snapshot, &actor.username)).await?;

        let item = fetch_item(&mut tx, item_id).await?;
        tx.commit().await?;

        tracing::info!("{} added {} ({} in stock)", actor.username, item.item_name, item.quantity);
        Ok(item)
    }

    /// Edit item details; the quantity is overwritten without a history entry
    pub async fn update_item(&self, item_id: i64, input: UpdateStockInput) -> AppResult<StockItem> {
        input.validate()?;
        if let Some(quantity) = input.quantity {
            if quantity < 0 {
                return Err(AppError::validation("quantity", "Quantity cannot be negative"));
            }
        }
        validate_price(input.price)?;

        let item_name = match input.item_name.as_deref() {
            Some(name) => Some(
                normalize_name(Some(name))
                    .ok_or_else(|| AppError::validation("item_name", "Item name is required"))?,
            ),
            None => None,
        };

        let mut tx = self.db.begin().await?;
        let current = lock_item(&mut tx, item_id).await?;

        // An explicitly blank category or brand clears it
        let category = match input.category.as_deref() {
            Some(c) => normalize_name(Some(c)),
            None => current.category.clone(),
        };
        let brand = match input.brand.as_deref() {
            Some(b) => normalize_name(Some(b)),
            None => current.brand.clone(),
        };

        sqlx::query(
            r#"
            UPDATE stock_items
            SET item_name = $2, category = $3, brand = $4, price = COALESCE($5, price),
                quantity = $6, export_to_csv = COALESCE($7, export_to_csv), last_updated = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(item_name.unwrap_or(current.item_name))
        .bind(category)
        .bind(brand)
        .bind(input.price)
        .bind(input.quantity.unwrap_or(current.quantity))
        .bind(input.export_to_csv)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_item())?;

        let item = fetch_item(&mut tx, item_id).await?;
        tx.commit().await?;

        Ok(item)
    }

    /// Delete an item. Its sales keep a null item reference and its history
    /// stays. Returns the image cleanup to run after commit.
    pub async fn delete_item(&self, item_id: i64) -> AppResult<Vec<PostCommit>> {
        let image_url = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM stock_items WHERE id = $1 RETURNING image_url",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Stock item"))?;

        tracing::info!("Stock item {} deleted", item_id);

        Ok(image_url
            .into_iter()
            .map(|url| PostCommit::DeleteImage { url })
            .collect())
    }

    /// Point an item at a new image; the replaced image is returned for cleanup
    pub async fn set_image(
        &self,
        item_id: i64,
        image_url: Option<String>,
    ) -> AppResult<(StockItem, Vec<PostCommit>)> {
        let mut tx = self.db.begin().await?;

        let previous = sqlx::query_scalar::<_, Option<String>>(
            "SELECT image_url FROM stock_items WHERE id = $1 FOR UPDATE",
        )
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Stock item"))?;

        sqlx::query("UPDATE stock_items SET image_url = $2, last_updated = NOW() WHERE id = $1")
            .bind(item_id)
            .bind(&image_url)
            .execute(&mut *tx)
            .await?;

        let item = fetch_item(&mut tx, item_id).await?;
        tx.commit().await?;

        let cleanup = previous
            .filter(|old| Some(old) != image_url.as_ref())
            .map(|url| PostCommit::DeleteImage { url })
            .into_iter()
            .collect();

        Ok((item, cleanup))
    }

    /// Add delivered stock
    pub async fn receive(&self, item_id: i64, input: ReceiveInput, actor: &AuthUser) -> AppResult<StockItem> {
        let movement = Movement::Receive {
            quantity: input.quantity,
            received_by: actor.username.clone(),
        };
        self.apply(item_id, movement, input.supplier_id).await
    }

    /// Remove stock for internal use or distribution
    pub async fn issue(&self, item_id: i64, input: IssueInput, actor: &AuthUser) -> AppResult<StockItem> {
        input.validate()?;
        let movement = Movement::Issue {
            quantity: input.quantity,
            issued_by: actor.username.clone(),
            issued_to: normalize_name(input.issue_to.as_deref()),
        };
        self.apply(item_id, movement, None).await
    }

    async fn apply(
        &self,
        item_id: i64,
        movement: Movement,
        supplier_id: Option<i64>,
    ) -> AppResult<StockItem> {
        let mut tx = self.db.begin().await?;
        let mut snapshot = lock_item(&mut tx, item_id).await?;

        if let Some(supplier_id) = supplier_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
            )
            .bind(supplier_id)
            .fetch_one(&mut *tx)
            .await?;

            if !exists {
                return Err(AppError::not_found("Supplier"));
            }
            snapshot.supplier_id = Some(supplier_id);
        }

        let outcome = apply_movement(&snapshot, &movement)?;
        if outcome.quantity < 0 {
            tracing::warn!(
                "Issue of {} leaves {} (id {}) at {}",
                movement.quantity(),
                snapshot.item_name,
                item_id,
                outcome.quantity
            );
        }

        sqlx::query(
            r#"
            UPDATE stock_items
            SET quantity = $2,
                receive_quantity = $3, receive_by = COALESCE($4, receive_by),
                issue_quantity = $5, issue_by = COALESCE($6, issue_by),
                issue_to = COALESCE($7, issue_to),
                supplier_id = $8,
                last_updated = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(outcome.quantity)
        .bind(outcome.columns.receive_quantity)
        .bind(&outcome.columns.receive_by)
        .bind(outcome.columns.issue_quantity)
        .bind(&outcome.columns.issue_by)
        .bind(&outcome.columns.issue_to)
        .bind(snapshot.supplier_id)
        .execute(&mut *tx)
        .await?;

        record_history(&mut tx, &outcome.history).await?;

        let item = fetch_item(&mut tx, item_id).await?;
        tx.commit().await?;

        tracing::info!(
            "{} {} of {}, {} now in store",
            movement.kind(),
            movement.quantity(),
            item.item_name,
            item.quantity
        );
        Ok(item)
    }

    /// Change the restock threshold
    pub async fn set_reorder_level(&self, item_id: i64, input: ReorderLevelInput) -> AppResult<StockItem> {
        validate_reorder_level(input.reorder_level)?;

        let updated = sqlx::query(
            "UPDATE stock_items SET reorder_level = $2, last_updated = NOW() WHERE id = $1",
        )
        .bind(item_id)
        .bind(input.reorder_level)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("Stock item"));
        }

        self.get_item(item_id).await
    }

    pub async fn product_price(&self, item_id: i64) -> AppResult<ProductPrice> {
        sqlx::query_as::<_, ProductPrice>(
            "SELECT id, item_name, price, quantity FROM stock_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))
    }
}
