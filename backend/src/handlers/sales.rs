//! HTTP handlers for point-of-sale endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sale::{DeletedSale, PosOverview, PosQuery, RecordSaleInput, Sale, SaleFilter, SalesPage};
use crate::services::SaleService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub item_name: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<u32>,
}

/// Record a sale
pub async fn record_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordSaleInput>,
) -> AppResult<(StatusCode, Json<Sale>)> {
    let service = SaleService::new(state.db);
    let sale = service.record_sale(input, &current_user.0).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Delete a sale and put its quantity back in stock
pub async fn delete_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<i64>,
) -> AppResult<Json<DeletedSale>> {
    let service = SaleService::new(state.db);
    let deleted = service.delete_sale(sale_id).await?;
    tracing::info!("{} deleted sale {}", current_user.0.username, sale_id);
    Ok(Json(deleted))
}

/// Sales report
pub async fn list_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SalesQuery>,
) -> AppResult<Json<SalesPage>> {
    let filter = SaleFilter {
        item_name: query.item_name,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let service = SaleService::new(state.db);
    let page = service.list_sales(&filter, query.page).await?;
    Ok(Json(page))
}

/// Checkout screen data
pub async fn pos_overview(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<PosQuery>,
) -> AppResult<Json<PosOverview>> {
    let service = SaleService::new(state.db);
    let overview = service.pos_overview(&query).await?;
    Ok(Json(overview))
}
