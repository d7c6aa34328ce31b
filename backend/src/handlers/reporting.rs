//! Reporting handlers for the dashboard and stock export

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{DashboardMetrics, ReportingService};
use crate::services::stock::{StockFilter, StockItem};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub item_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    let service = ReportingService::new(state.db.clone());
    let metrics = service.get_dashboard_metrics().await?;
    Ok(Json(metrics))
}

/// Items that need reordering
pub async fn get_low_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<StockItem>>> {
    let service = ReportingService::new(state.db.clone());
    let items = service.low_stock_items().await?;
    Ok(Json(items))
}

/// Download the filtered stock list as CSV
pub async fn export_stock_csv(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db.clone());

    let filter = StockFilter {
        item_name: query.item_name,
        brand: query.brand,
        category: query.category,
    };

    let export = service.export_stock_csv(&filter).await?;
    tracing::info!("{} downloaded {}", current_user.0.username, export.filename);

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.body,
    )
        .into_response())
}
