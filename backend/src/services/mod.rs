//! Business logic services for the Inventory & POS server

pub mod auth;
pub mod history;
pub mod reporting;
pub mod sale;
pub mod stock;
pub mod supplier;

pub use auth::AuthService;
pub use history::HistoryService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use stock::StockService;
pub use supplier::SupplierService;

use crate::error::AppError;

/// Map a unique-constraint violation to `DuplicateEntry`, anything else passes through
pub(crate) fn conflict_on_unique(what: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |err| {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return AppError::DuplicateEntry(what.to_string());
            }
        }
        AppError::DatabaseError(err)
    }
}

/// Insert an account and return it as the acting user
#[cfg(test)]
pub(crate) async fn test_actor(pool: &sqlx::PgPool, username: &str) -> crate::middleware::AuthUser {
    let user_id = sqlx::query_scalar::<_, uuid::Uuid>(
        "INSERT INTO users (username, password_hash) VALUES ($1, 'not-a-hash') RETURNING id",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .unwrap();

    crate::middleware::AuthUser {
        user_id,
        username: username.to_string(),
    }
}
