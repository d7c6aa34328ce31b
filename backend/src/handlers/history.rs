//! HTTP handlers for stock history endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::history::{BulkDeleteInput, BulkDeleteResult, HistoryEntry, HistoryFilter};
use crate::services::HistoryService;
use crate::AppState;
use shared::types::PaginatedResponse;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub item_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<u32>,
}

/// List history entries
pub async fn list_history(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<PaginatedResponse<HistoryEntry>>> {
    let filter = HistoryFilter {
        item_name: query.item_name,
        brand: query.brand,
        category: query.category,
        date_from: query.date_from,
        date_to: query.date_to,
    };
    let service = HistoryService::new(state.db);
    let entries = service.list_history(&filter, query.page).await?;
    Ok(Json(entries))
}

/// Delete one history entry
pub async fn delete_history_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(entry_id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = HistoryService::new(state.db);
    service.delete_entry(entry_id).await?;
    tracing::info!("{} deleted history entry {}", current_user.0.username, entry_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Delete several history entries
pub async fn bulk_delete_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkDeleteInput>,
) -> AppResult<Json<BulkDeleteResult>> {
    let service = HistoryService::new(state.db);
    let result = service.bulk_delete(input).await?;
    tracing::info!(
        "{} bulk deleted {} history entries",
        current_user.0.username,
        result.deleted
    );
    Ok(Json(result))
}
