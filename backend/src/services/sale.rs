//! Point-of-sale service
//!
//! A sale decrements its item's quantity when recorded and gives it back when
//! deleted. The sale row is its own audit record; no history entry is written.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::stock::{lock_item, StockItem, STOCK_SELECT};
use shared::ledger::{plan_sale, restore_after_sale_deletion};
use shared::types::{
    display_or_na, DateRange, PaginatedResponse, Pagination, POS_SALES_PAGE_SIZE, SALES_PAGE_SIZE,
};
use shared::validation::contains_pattern;

/// Sale service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: i64,
    stock_id: Option<i64>,
    item_name: Option<String>,
    quantity_sold: i32,
    selling_price: Decimal,
    subtotal: Decimal,
    sold_by: Option<String>,
    sale_date: DateTime<Utc>,
}

/// A recorded sale. `item_name` is "N/A" once the item has been deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Sale {
    pub id: i64,
    pub stock_id: Option<i64>,
    pub item_name: String,
    pub quantity_sold: i32,
    pub selling_price: Decimal,
    pub subtotal: Decimal,
    pub sold_by: Option<String>,
    pub sale_date: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            stock_id: row.stock_id,
            item_name: display_or_na(row.item_name.as_deref()),
            quantity_sold: row.quantity_sold,
            selling_price: row.selling_price,
            subtotal: row.subtotal,
            sold_by: row.sold_by,
            sale_date: row.sale_date,
        }
    }
}

/// Input for recording a sale
#[derive(Debug, Deserialize)]
pub struct RecordSaleInput {
    pub stock_id: i64,
    pub quantity_sold: i32,
    /// Defaults to the item's list price
    pub selling_price: Option<Decimal>,
    /// Computed as quantity x price when absent
    pub subtotal: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub item_name: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// One page of sales plus totals over every matching sale
#[derive(Debug, Serialize)]
pub struct SalesPage {
    #[serde(flatten)]
    pub sales: PaginatedResponse<Sale>,
    pub total_revenue: Decimal,
    pub total_quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct DeletedSale {
    pub sale_id: i64,
    pub stock_id: Option<i64>,
    /// Item quantity after the sale was given back, if the item still exists
    pub restored_quantity: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PosQuery {
    /// Matches item name or brand
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
}

/// Everything the checkout screen shows
#[derive(Debug, Serialize)]
pub struct PosOverview {
    pub items: Vec<StockItem>,
    pub categories: Vec<String>,
    pub today_sales: PaginatedResponse<Sale>,
    pub today_total: Decimal,
    pub today_quantity: i64,
}

const SALE_SELECT: &str = r#"
    SELECT sa.id, sa.stock_id, s.item_name, sa.quantity_sold, sa.selling_price, sa.subtotal,
           sa.sold_by, sa.sale_date
    FROM sales sa
    LEFT JOIN stock_items s ON s.id = sa.stock_id
"#;

const SALE_FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR s.item_name ILIKE $1)
      AND ($2::timestamptz IS NULL OR sa.sale_date >= $2)
      AND ($3::timestamptz IS NULL OR sa.sale_date < $3)
"#;

async fn fetch_sale(conn: &mut PgConnection, sale_id: i64) -> AppResult<Sale> {
    sqlx::query_as::<_, SaleRow>(&format!("{} WHERE sa.id = $1", SALE_SELECT))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Sale::from)
        .ok_or_else(|| AppError::not_found("Sale"))
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale and take the sold quantity out of stock
    pub async fn record_sale(&self, input: RecordSaleInput, actor: &AuthUser) -> AppResult<Sale> {
        let mut tx = self.db.begin().await?;
        let item = lock_item(&mut tx, input.stock_id).await?;

        let selling_price = input
            .selling_price
            .or(item.price)
            .ok_or_else(|| AppError::validation("selling_price", "Item has no price, enter a selling price"))?;

        let plan = plan_sale(item.quantity, input.quantity_sold, selling_price, input.subtotal)?;

        sqlx::query("UPDATE stock_items SET quantity = $2, last_updated = NOW() WHERE id = $1")
            .bind(item.id)
            .bind(plan.remaining_quantity)
            .execute(&mut *tx)
            .await?;

        let sale_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO sales (stock_id, quantity_sold, selling_price, subtotal, sold_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(item.id)
        .bind(input.quantity_sold)
        .bind(selling_price)
        .bind(plan.subtotal)
        .bind(&actor.username)
        .fetch_one(&mut *tx)
        .await?;

        let sale = fetch_sale(&mut tx, sale_id).await?;
        tx.commit().await?;

        tracing::info!(
            "{} sold {} x {} for {}, {} left",
            actor.username,
            sale.quantity_sold,
            sale.item_name,
            sale.subtotal,
            plan.remaining_quantity
        );
        Ok(sale)
    }

    /// Delete a sale and give its quantity back to the item, if it still exists
    ///
    /// Locks the item row before the sale row, the same order as recording a sale.
    pub async fn delete_sale(&self, sale_id: i64) -> AppResult<DeletedSale> {
        let mut tx = self.db.begin().await?;

        let sold_from = sqlx::query_scalar::<_, Option<i64>>("SELECT stock_id FROM sales WHERE id = $1")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Sale"))?;

        let locked_quantity = match sold_from {
            Some(id) => sqlx::query_scalar::<_, i32>(
                "SELECT quantity FROM stock_items WHERE id = $1 FOR UPDATE",
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?,
            None => None,
        };

        let (stock_id, quantity_sold) = sqlx::query_as::<_, (Option<i64>, i32)>(
            "SELECT stock_id, quantity_sold FROM sales WHERE id = $1 FOR UPDATE",
        )
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Sale"))?;

        // The item may have been deleted between the two reads
        let current = if stock_id == sold_from { locked_quantity } else { None };

        let restored_quantity = restore_after_sale_deletion(current, quantity_sold)?;
        if let (Some(id), Some(quantity)) = (stock_id, restored_quantity) {
            sqlx::query("UPDATE stock_items SET quantity = $2, last_updated = NOW() WHERE id = $1")
                .bind(id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        match restored_quantity {
            Some(quantity) => tracing::info!("Sale {} deleted, stock restored to {}", sale_id, quantity),
            None => tracing::info!("Sale {} deleted, item no longer exists", sale_id),
        }

        Ok(DeletedSale {
            sale_id,
            stock_id,
            restored_quantity,
        })
    }

    /// List sales, newest first, with totals over the whole filtered set
    pub async fn list_sales(&self, filter: &SaleFilter, page: Option<u32>) -> AppResult<SalesPage> {
        self.sales_page(filter, page, SALES_PAGE_SIZE).await
    }

    async fn sales_page(&self, filter: &SaleFilter, page: Option<u32>, per_page: u32) -> AppResult<SalesPage> {
        let name = contains_pattern(filter.item_name.as_deref());
        let (from, until) = DateRange::new(filter.date_from, filter.date_to).bounds();

        let (count, total_revenue, total_quantity) = sqlx::query_as::<_, (i64, Decimal, i64)>(&format!(
            r#"
            SELECT COUNT(*), COALESCE(SUM(sa.subtotal), 0), COALESCE(SUM(sa.quantity_sold), 0)::bigint
            FROM sales sa
            LEFT JOIN stock_items s ON s.id = sa.stock_id
            {}
            "#,
            SALE_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(from)
        .bind(until)
        .fetch_one(&self.db)
        .await?;

        let total = u64::try_from(count).unwrap_or_default();
        let pagination = Pagination::new(page, per_page).clamp_to(total);

        let sales = sqlx::query_as::<_, SaleRow>(&format!(
            "{} {} ORDER BY sa.sale_date DESC, sa.id DESC LIMIT $4 OFFSET $5",
            SALE_SELECT, SALE_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(from)
        .bind(until)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(Sale::from)
        .collect();

        Ok(SalesPage {
            sales: PaginatedResponse::new(sales, pagination, total),
            total_revenue,
            total_quantity,
        })
    }

    /// In-stock items, their categories and today's sales
    pub async fn pos_overview(&self, query: &PosQuery) -> AppResult<PosOverview> {
        let search = contains_pattern(query.search.as_deref());
        let category = contains_pattern(query.category.as_deref());

        let items = sqlx::query_as::<_, StockItem>(&format!(
            r#"
            {}
            WHERE s.quantity > 0
              AND ($1::text IS NULL OR s.item_name ILIKE $1 OR s.brand ILIKE $1)
              AND ($2::text IS NULL OR s.category ILIKE $2)
            ORDER BY s.item_name, s.id
            "#,
            STOCK_SELECT
        ))
        .bind(&search)
        .bind(&category)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StockItem::with_reorder_flag)
        .collect();

        let categories = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT category
            FROM stock_items
            WHERE quantity > 0 AND category IS NOT NULL AND category <> ''
            ORDER BY category
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let today = Utc::now().date_naive();
        let today_filter = SaleFilter {
            item_name: None,
            date_from: Some(today),
            date_to: Some(today),
        };
        let today_page = self
            .sales_page(&today_filter, query.page, POS_SALES_PAGE_SIZE)
            .await?;

        Ok(PosOverview {
            items,
            categories,
            today_sales: today_page.sales,
            today_total: today_page.total_revenue,
            today_quantity: today_page.total_quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::stock::{CreateStockInput, IssueInput, ReceiveInput, StockService};
    use crate::services::test_actor;
    use crate::services::history::{HistoryFilter, HistoryService};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn widget(stock: &StockService, actor: &AuthUser) -> StockItem {
        let input: CreateStockInput = serde_json::from_value(serde_json::json!({
            "item_name": "Widget",
            "quantity": 10,
            "brand": "Acme",
            "price": "2.50",
            "reorder_level": 5,
        }))
        .unwrap();
        stock.create_item(input, actor).await.unwrap()
    }

    fn sell(stock_id: i64, quantity_sold: i32) -> RecordSaleInput {
        RecordSaleInput {
            stock_id,
            quantity_sold,
            selling_price: None,
            subtotal: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_widget_day(pool: PgPool) {
        let actor = test_actor(&pool, "alice").await;
        let stock = StockService::new(pool.clone());
        let sales = SaleService::new(pool.clone());
        let item = widget(&stock, &actor).await;

        let issue = IssueInput { quantity: 3, issue_to: Some("Workshop".to_string()) };
        assert_eq!(stock.issue(item.id, issue, &actor).await.unwrap().quantity, 7);

        let receive = ReceiveInput { quantity: 5, supplier_id: None };
        assert_eq!(stock.receive(item.id, receive, &actor).await.unwrap().quantity, 12);

        let sale = sales.record_sale(sell(item.id, 4), &actor).await.unwrap();
        assert_eq!(sale.selling_price, dec("2.50"));
        assert_eq!(sale.subtotal, dec("10.00"));
        assert_eq!(stock.get_item(item.id).await.unwrap().quantity, 8);

        let err = sales.record_sale(sell(item.id, 9), &actor).await.unwrap_err();
        assert!(matches!(err, AppError::Ledger(_)));
        assert_eq!(stock.get_item(item.id).await.unwrap().quantity, 8);

        let deleted = sales.delete_sale(sale.id).await.unwrap();
        assert_eq!(deleted.restored_quantity, Some(12));
        assert_eq!(stock.get_item(item.id).await.unwrap().quantity, 12);

        // Creation, issue and receive; sales write no history
        let history = HistoryService::new(pool)
            .list_history(&HistoryFilter::default(), None)
            .await
            .unwrap();
        assert_eq!(history.pagination.total_items, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_sale_outlives_its_item(pool: PgPool) {
        let actor = test_actor(&pool, "alice").await;
        let stock = StockService::new(pool.clone());
        let sales = SaleService::new(pool);
        let item = widget(&stock, &actor).await;

        let sale = sales.record_sale(sell(item.id, 4), &actor).await.unwrap();
        stock.delete_item(item.id).await.unwrap();

        let report = sales.list_sales(&SaleFilter::default(), None).await.unwrap();
        assert_eq!(report.sales.data.len(), 1);
        assert_eq!(report.sales.data[0].stock_id, None);
        assert_eq!(report.sales.data[0].item_name, "N/A");
        assert_eq!(report.total_revenue, dec("10.00"));

        let deleted = sales.delete_sale(sale.id).await.unwrap();
        assert_eq!(deleted.stock_id, None);
        assert_eq!(deleted.restored_quantity, None);

        let err = sales.delete_sale(sale.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_sale_alongside_item_delete(pool: PgPool) {
        let actor = test_actor(&pool, "alice").await;
        let stock = StockService::new(pool.clone());
        let sales = SaleService::new(pool.clone());
        let item = widget(&stock, &actor).await;
        let sale = sales.record_sale(sell(item.id, 4), &actor).await.unwrap();

        let (item_deleted, sale_deleted) = tokio::join!(stock.delete_item(item.id), sales.delete_sale(sale.id));
        item_deleted.unwrap();
        sale_deleted.unwrap();

        let remaining = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
