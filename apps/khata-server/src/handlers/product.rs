//! Product and stock-ledger routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, Caller};
use crate::handlers::ListQuery;
use crate::AppState;
use khata_core::{Product, StockMovementEntry};
use khata_db::service::stock_ledger::{NewProduct, StockAdjustment, StockReplayReport};

pub async fn create_product(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(request): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.engine.stock().create_product(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .engine
        .stock()
        .list_products(&ctx, &query.search, query.limit(), query.offset())
        .await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.engine.stock().get_product(&ctx, &id).await?))
}

/// Manual correction. `null` when the product is not stock-tracked.
pub async fn adjust_stock(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> ApiResult<Json<Option<StockMovementEntry>>> {
    let entry = state
        .engine
        .stock()
        .adjust_stock(&ctx, &id, adjustment)
        .await?;
    Ok(Json(entry))
}

pub async fn movements(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<StockMovementEntry>>> {
    Ok(Json(state.engine.stock().movements(&ctx, &id).await?))
}

pub async fn replay_stock(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<StockReplayReport>> {
    Ok(Json(state.engine.stock().replay_stock(&ctx, &id).await?))
}
