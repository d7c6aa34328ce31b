//! Supplier and brand directory
//!
//! Suppliers and brands are resolved by exact name and created on first use,
//! both when staff type a supplier name on a stock item and when a supplier's
//! comma-separated brand list is saved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::conflict_on_unique;
use shared::validation::{normalize_name, parse_brand_names};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

/// Supplier with its brands and the number of stock items it supplies
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub brands: Vec<String>,
    pub stock_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
}

/// Input for creating or replacing a supplier
#[derive(Debug, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    /// Comma-separated brand names; replaces the current brand set
    #[serde(default)]
    pub brand_names: String,
}

const SUPPLIER_SELECT: &str = r#"
    SELECT sup.id, sup.name, sup.phone_number, sup.email, sup.address,
           ARRAY(
               SELECT b.name::text
               FROM supplier_brands sb
               JOIN brands b ON b.id = sb.brand_id
               WHERE sb.supplier_id = sup.id
               ORDER BY b.name
           ) AS brands,
           (SELECT COUNT(*) FROM stock_items s WHERE s.supplier_id = sup.id) AS stock_count,
           sup.created_at, sup.updated_at
    FROM suppliers sup
"#;

/// Look up a supplier by exact name, creating it when absent
pub async fn resolve_supplier(conn: &mut PgConnection, name: &str) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO suppliers (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Look up a brand by exact name, creating it when absent
pub async fn resolve_brand(conn: &mut PgConnection, name: &str) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO brands (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Replace a supplier's brand set with the brands named in `brand_names`
async fn replace_brands(conn: &mut PgConnection, supplier_id: i64, brand_names: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM supplier_brands WHERE supplier_id = $1")
        .bind(supplier_id)
        .execute(&mut *conn)
        .await?;

    for name in parse_brand_names(brand_names) {
        let brand_id = resolve_brand(conn, &name).await?;
        sqlx::query(
            "INSERT INTO supplier_brands (supplier_id, brand_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(supplier_id)
        .bind(brand_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all suppliers ordered by name
    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!("{} ORDER BY sup.name", SUPPLIER_SELECT))
            .fetch_all(&self.db)
            .await?;

        Ok(suppliers)
    }

    pub async fn get_supplier(&self, supplier_id: i64) -> AppResult<Supplier> {
        let mut conn = self.db.acquire().await?;
        fetch_supplier(&mut conn, supplier_id).await
    }

    /// Create a supplier and its brand set
    pub async fn create_supplier(&self, input: SupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        let name = normalize_name(Some(&input.name))
            .ok_or_else(|| AppError::validation("name", "Supplier name is required"))?;

        let mut tx = self.db.begin().await?;

        let supplier_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO suppliers (name, phone_number, email, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&name)
        .bind(normalize_name(input.phone_number.as_deref()))
        .bind(normalize_name(input.email.as_deref()))
        .bind(normalize_name(input.address.as_deref()))
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("Supplier"))?;

        replace_brands(&mut tx, supplier_id, &input.brand_names).await?;
        let supplier = fetch_supplier(&mut tx, supplier_id).await?;

        tx.commit().await?;

        tracing::info!("Supplier {} created", supplier.name);
        Ok(supplier)
    }

    /// Replace a supplier's details and brand set
    pub async fn update_supplier(&self, supplier_id: i64, input: SupplierInput) -> AppResult<Supplier> {
        input.validate()?;
        let name = normalize_name(Some(&input.name))
            .ok_or_else(|| AppError::validation("name", "Supplier name is required"))?;

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = $2, phone_number = $3, email = $4, address = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(supplier_id)
        .bind(&name)
        .bind(normalize_name(input.phone_number.as_deref()))
        .bind(normalize_name(input.email.as_deref()))
        .bind(normalize_name(input.address.as_deref()))
        .execute(&mut *tx)
        .await
        .map_err(conflict_on_unique("Supplier"))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found("Supplier"));
        }

        replace_brands(&mut tx, supplier_id, &input.brand_names).await?;
        let supplier = fetch_supplier(&mut tx, supplier_id).await?;

        tx.commit().await?;

        Ok(supplier)
    }

    /// Delete a supplier; stock items and history entries keep a null reference
    pub async fn delete_supplier(&self, supplier_id: i64) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::not_found("Supplier"));
        }

        tracing::info!("Supplier {} deleted", supplier_id);
        Ok(())
    }

    pub async fn list_brands(&self) -> AppResult<Vec<Brand>> {
        let brands = sqlx::query_as::<_, Brand>("SELECT id, name FROM brands ORDER BY name")
            .fetch_all(&self.db)
            .await?;

        Ok(brands)
    }
}

async fn fetch_supplier(conn: &mut PgConnection, supplier_id: i64) -> AppResult<Supplier> {
    sqlx::query_as::<_, Supplier>(&format!("{} WHERE sup.id = $1", SUPPLIER_SELECT))
        .bind(supplier_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, email: Option<&str>) -> SupplierInput {
        SupplierInput {
            name: name.to_string(),
            phone_number: Some("555-0100".to_string()),
            email: email.map(String::from),
            address: None,
            brand_names: "Acme, Globex".to_string(),
        }
    }

    #[test]
    fn test_supplier_input_validation() {
        assert!(input("Acme Supply", Some("sales@acme.test")).validate().is_ok());
        assert!(input("Acme Supply", None).validate().is_ok());
        assert!(input("", None).validate().is_err());
        assert!(input("Acme Supply", Some("not-an-email")).validate().is_err());
    }

    async fn supplier_count(pool: &PgPool, name: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM suppliers WHERE name = $1")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_resolve_supplier_is_idempotent(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let first = resolve_supplier(&mut conn, "Acme Supply").await.unwrap();
        let second = resolve_supplier(&mut conn, "Acme Supply").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(supplier_count(&pool, "Acme Supply").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_resolution_creates_one_supplier(pool: PgPool) {
        let mut a = pool.acquire().await.unwrap();
        let mut b = pool.acquire().await.unwrap();
        let (first, second) = tokio::join!(
            resolve_supplier(&mut a, "Globex Trading"),
            resolve_supplier(&mut b, "Globex Trading"),
        );
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(supplier_count(&pool, "Globex Trading").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_supplier_brands_replaced_on_update(pool: PgPool) {
        let service = SupplierService::new(pool.clone());
        let created = service.create_supplier(input("Acme Supply", None)).await.unwrap();
        assert_eq!(created.brands, vec!["Acme", "Globex"]);

        let mut changed = input("Acme Supply", None);
        changed.brand_names = "Initech, Acme".to_string();
        let updated = service.update_supplier(created.id, changed).await.unwrap();
        assert_eq!(updated.brands, vec!["Acme", "Initech"]);

        let brands = service.list_brands().await.unwrap();
        assert_eq!(brands.len(), 3);
    }
}
