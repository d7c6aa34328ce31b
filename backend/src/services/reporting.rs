//! Reporting service for the inventory dashboard and CSV export

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::services::stock::{StockFilter, StockItem, STOCK_FILTER_CLAUSE, STOCK_SELECT};
use shared::types::{display_or_na, DateRange, NOT_AVAILABLE};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Column headings of the stock export, always written
pub const STOCK_CSV_HEADER: [&str; 12] = [
    "ID",
    "Item Name",
    "Quantity",
    "Category",
    "Brand",
    "Price",
    "Reorder Level",
    "Supplier",
    "Supplier Contact",
    "Created By",
    "Created Date",
    "Last Updated",
];

const CSV_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One stock item as exported
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StockExportRow {
    pub id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub reorder_level: i32,
    pub supplier_name: Option<String>,
    pub supplier_phone: Option<String>,
    pub created_by: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl StockExportRow {
    fn to_record(&self) -> [String; 12] {
        [
            self.id.to_string(),
            self.item_name.clone(),
            self.quantity.to_string(),
            display_or_na(self.category.as_deref()),
            display_or_na(self.brand.as_deref()),
            self.price.map_or_else(|| "0".to_string(), |p| p.to_string()),
            self.reorder_level.to_string(),
            display_or_na(self.supplier_name.as_deref()),
            match &self.supplier_name {
                Some(_) => display_or_na(self.supplier_phone.as_deref()),
                None => NOT_AVAILABLE.to_string(),
            },
            display_or_na(self.created_by.as_deref()),
            self.timestamp.format(CSV_DATE_FORMAT).to_string(),
            self.last_updated.format(CSV_DATE_FORMAT).to_string(),
        ]
    }
}

/// A rendered CSV download
#[derive(Debug)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

/// Inventory dashboard figures
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DashboardMetrics {
    pub total_items: i64,
    pub total_units: i64,
    pub low_stock_items: i64,
    pub out_of_stock_items: i64,
    pub stock_value: Decimal,
    pub supplier_count: i64,
    pub today_sales: i64,
    pub today_revenue: Decimal,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Export the stock items matching `filter` as CSV, ordered by name
    pub async fn export_stock_csv(&self, filter: &StockFilter) -> AppResult<CsvExport> {
        let (name, brand, category) = filter.patterns();

        let rows = sqlx::query_as::<_, StockExportRow>(&format!(
            r#"
            SELECT s.id, s.item_name, s.quantity, s.category, s.brand, s.price, s.reorder_level,
                   sup.name AS supplier_name, sup.phone_number AS supplier_phone,
                   s.created_by, s."timestamp", s.last_updated
            FROM stock_items s
            LEFT JOIN suppliers sup ON sup.id = s.supplier_id
            {}
            ORDER BY s.item_name, s.id
            "#,
            STOCK_FILTER_CLAUSE
        ))
        .bind(&name)
        .bind(&brand)
        .bind(&category)
        .fetch_all(&self.db)
        .await?;

        tracing::info!("Exporting {} stock items to CSV", rows.len());

        Ok(CsvExport {
            filename: export_filename(Utc::now()),
            body: Self::write_stock_csv(&rows)?,
        })
    }

    /// Render export rows, header first
    pub fn write_stock_csv(rows: &[StockExportRow]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(STOCK_CSV_HEADER)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        for row in rows {
            wtr.write_record(row.to_record())
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }

    /// Items at or below their reorder level, lowest stock first
    pub async fn low_stock_items(&self) -> AppResult<Vec<StockItem>> {
        let items = sqlx::query_as::<_, StockItem>(&format!(
            r#"
            {}
            WHERE s.reorder_level > 0 AND s.quantity <= s.reorder_level
            ORDER BY s.quantity, s.item_name
            "#,
            STOCK_SELECT
        ))
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(StockItem::with_reorder_flag)
        .collect();

        Ok(items)
    }

    /// Headline figures for the dashboard
    pub async fn get_dashboard_metrics(&self) -> AppResult<DashboardMetrics> {
        let (today_start, tomorrow_start) = DateRange::day(Utc::now().date_naive()).bounds();

        let metrics = sqlx::query_as::<_, DashboardMetrics>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM stock_items) AS total_items,
                (SELECT COALESCE(SUM(quantity), 0)::bigint FROM stock_items) AS total_units,
                (SELECT COUNT(*) FROM stock_items
                  WHERE reorder_level > 0 AND quantity <= reorder_level) AS low_stock_items,
                (SELECT COUNT(*) FROM stock_items WHERE quantity <= 0) AS out_of_stock_items,
                (SELECT COALESCE(SUM(price * GREATEST(quantity, 0)), 0) FROM stock_items) AS stock_value,
                (SELECT COUNT(*) FROM suppliers) AS supplier_count,
                (SELECT COUNT(*) FROM sales
                  WHERE sale_date >= $1 AND sale_date < $2) AS today_sales,
                (SELECT COALESCE(SUM(subtotal), 0) FROM sales
                  WHERE sale_date >= $1 AND sale_date < $2) AS today_revenue
            "#,
        )
        .bind(today_start)
        .bind(tomorrow_start)
        .fetch_one(&self.db)
        .await?;

        Ok(metrics)
    }
}

/// `inventory_export_<YYYYMMDD_HHMMSS>.csv`
pub fn export_filename(at: DateTime<Utc>) -> String {
    format!("inventory_export_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: i64, supplier: Option<&str>) -> StockExportRow {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        StockExportRow {
            id,
            item_name: "Widget".to_string(),
            quantity: 12,
            category: None,
            brand: Some("Acme".to_string()),
            price: Some(Decimal::new(250, 2)),
            reorder_level: 5,
            supplier_name: supplier.map(String::from),
            supplier_phone: None,
            created_by: Some("alice".to_string()),
            timestamp: at,
            last_updated: at,
        }
    }

    #[test]
    fn test_header_written_for_empty_export() {
        let csv = ReportingService::write_stock_csv(&[]).unwrap();
        assert_eq!(
            csv,
            "ID,Item Name,Quantity,Category,Brand,Price,Reorder Level,Supplier,Supplier Contact,Created By,Created Date,Last Updated\n"
        );
    }

    #[test]
    fn test_one_line_per_row() {
        let rows = vec![row(1, None), row(2, Some("Acme Supply")), row(3, None)];
        let csv = ReportingService::write_stock_csv(&rows).unwrap();
        assert_eq!(csv.lines().count(), rows.len() + 1);
    }

    #[test]
    fn test_missing_values_render_as_na() {
        let csv = ReportingService::write_stock_csv(&[row(7, None)]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert_eq!(
            line,
            "7,Widget,12,N/A,Acme,2.50,5,N/A,N/A,alice,2024-05-01 09:30,2024-05-01 09:30"
        );
    }

    #[test]
    fn test_missing_price_renders_as_zero() {
        let mut r = row(1, Some("Acme Supply"));
        r.price = None;
        let csv = ReportingService::write_stock_csv(&[r]).unwrap();
        let fields: Vec<&str> = csv.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(fields[5], "0");
        assert_eq!(fields[7], "Acme Supply");
        assert_eq!(fields[8], "N/A");
    }

    #[test]
    fn test_export_filename() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 5, 9).unwrap();
        assert_eq!(export_filename(at), "inventory_export_20241231_230509.csv");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_export_applies_filter(pool: PgPool) {
        let actor = crate::services::test_actor(&pool, "alice").await;
        let stock = crate::services::StockService::new(pool.clone());
        for (name, brand) in [("Widget", "Acme"), ("Sprocket", "Acme"), ("Gizmo", "Globex")] {
            let input = serde_json::from_value(serde_json::json!({
                "item_name": name,
                "brand": brand,
                "quantity": 3,
            }))
            .unwrap();
            stock.create_item(input, &actor).await.unwrap();
        }

        let reporting = ReportingService::new(pool);
        let acme = StockFilter {
            brand: Some("acme".to_string()),
            ..Default::default()
        };
        let export = reporting.export_stock_csv(&acme).await.unwrap();
        let lines: Vec<&str> = export.body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(",Sprocket,"));
        assert!(lines[2].contains(",Widget,"));

        let nothing = StockFilter {
            item_name: Some("no such item".to_string()),
            ..Default::default()
        };
        let export = reporting.export_stock_csv(&nothing).await.unwrap();
        assert_eq!(export.body.lines().count(), 1);
        assert!(export.body.starts_with("ID,Item Name"));
    }
}
