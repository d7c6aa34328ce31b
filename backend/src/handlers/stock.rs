//! HTTP handlers for stock item endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{run_post_commit, PostCommit};
use crate::middleware::CurrentUser;
use crate::services::stock::{
    CreateStockInput, IssueInput, ProductPrice, ReceiveInput, ReorderLevelInput, StockFilter,
    StockItem, UpdateStockInput,
};
use crate::services::StockService;
use crate::AppState;
use shared::types::PaginatedResponse;
use shared::validation::image_extension;

/// Multipart field carrying the image file
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Deserialize)]
pub struct StockListQuery {
    pub item_name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub page: Option<u32>,
}

impl StockListQuery {
    fn filter(&self) -> StockFilter {
        StockFilter {
            item_name: self.item_name.clone(),
            brand: self.brand.clone(),
            category: self.category.clone(),
        }
    }
}

/// Outcome of a stock quantity change
#[derive(Debug, Serialize)]
pub struct MovementResponse {
    pub item: StockItem,
    /// Set when the item is at or below its reorder level afterwards
    pub warning: Option<String>,
}

impl From<StockItem> for MovementResponse {
    fn from(item: StockItem) -> Self {
        let warning = item.needs_reorder.then(|| {
            format!(
                "{} is at or below its reorder level ({} left, reorder at {})",
                item.item_name, item.quantity, item.reorder_level
            )
        });
        Self { item, warning }
    }
}

/// List stock items
pub async fn list_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<StockListQuery>,
) -> AppResult<Json<PaginatedResponse<StockItem>>> {
    let service = StockService::new(state.db);
    let items = service.list_items(&query.filter(), query.page).await?;
    Ok(Json(items))
}

/// Get a single stock item
pub async fn get_stock_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<i64>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db);
    let item = service.get_item(item_id).await?;
    Ok(Json(item))
}

/// Add a stock item
pub async fn create_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockInput>,
) -> AppResult<(StatusCode, Json<StockItem>)> {
    let service = StockService::new(state.db);
    let item = service.create_item(input, &current_user.0).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Edit a stock item's details
pub async fn update_stock_item(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<i64>,
    Json(input): Json<UpdateStockInput>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db);
    let item = service.update_item(item_id, input).await?;
    Ok(Json(item))
}

/// Delete a stock item and its stored image
pub async fn delete_stock_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<i64>,
) -> AppResult<StatusCode> {
    let service = StockService::new(state.db.clone());
    let cleanup = service.delete_item(item_id).await?;
    tracing::info!("{} deleted stock item {}", current_user.0.username, item_id);

    run_post_commit(state.storage.as_ref(), cleanup).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Receive stock into an item
pub async fn receive_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<i64>,
    Json(input): Json<ReceiveInput>,
) -> AppResult<Json<MovementResponse>> {
    let service = StockService::new(state.db);
    let item = service.receive(item_id, input, &current_user.0).await?;
    Ok(Json(item.into()))
}

/// Issue stock out of an item
pub async fn issue_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<i64>,
    Json(input): Json<IssueInput>,
) -> AppResult<Json<MovementResponse>> {
    let service = StockService::new(state.db);
    let item = service.issue(item_id, input, &current_user.0).await?;
    Ok(Json(item.into()))
}

/// Set an item's reorder level
pub async fn set_reorder_level(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<i64>,
    Json(input): Json<ReorderLevelInput>,
) -> AppResult<Json<MovementResponse>> {
    let service = StockService::new(state.db);
    let item = service.set_reorder_level(item_id, input).await?;
    Ok(Json(item.into()))
}

/// Price and availability of one item
pub async fn get_product_price(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<i64>,
) -> AppResult<Json<ProductPrice>> {
    let service = StockService::new(state.db);
    let price = service.product_price(item_id).await?;
    Ok(Json(price))
}

/// Upload an image for an item, replacing any previous one
pub async fn upload_stock_image(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<i64>,
    mut multipart: Multipart,
) -> AppResult<Json<StockItem>> {
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| AppError::StorageError("Image storage is not configured".to_string()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(IMAGE_FIELD, format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let extension = field
            .file_name()
            .and_then(image_extension)
            .ok_or_else(|| AppError::validation(IMAGE_FIELD, "Unsupported image type"))?;
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(IMAGE_FIELD, format!("Could not read upload: {}", e)))?;

        upload = Some((extension, content_type, bytes));
        break;
    }

    let (extension, content_type, bytes) =
        upload.ok_or_else(|| AppError::validation(IMAGE_FIELD, "No image was uploaded"))?;
    if bytes.is_empty() {
        return Err(AppError::validation(IMAGE_FIELD, "Uploaded image is empty"));
    }

    let filename = format!("{}.{}", Uuid::new_v4(), extension);
    let url = storage.upload(&filename, &content_type, bytes.to_vec()).await?;

    let service = StockService::new(state.db.clone());
    match service.set_image(item_id, Some(url.clone())).await {
        Ok((item, cleanup)) => {
            run_post_commit(Some(storage), cleanup).await;
            Ok(Json(item))
        }
        Err(e) => {
            // The row never pointed at the new file
            run_post_commit(Some(storage), vec![PostCommit::DeleteImage { url }]).await;
            Err(e)
        }
    }
}

/// Remove an item's image
pub async fn delete_stock_image(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(item_id): Path<i64>,
) -> AppResult<Json<StockItem>> {
    let service = StockService::new(state.db.clone());
    let (item, cleanup) = service.set_image(item_id, None).await?;
    run_post_commit(state.storage.as_ref(), cleanup).await;
    Ok(Json(item))
}
