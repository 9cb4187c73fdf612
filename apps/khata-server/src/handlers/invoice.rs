//! # Invoice Routes
//!
//! ```text
//! POST   /invoices               create
//! GET    /invoices               list (from, to, search, status, sort, limit, offset)
//! GET    /invoices/{id}          get
//! PATCH  /invoices/{id}          partial update
//! DELETE /invoices/{id}          delete, returns the removed invoice
//! PUT    /invoices/{id}/status   status change (stock only)
//! GET    /invoices/{id}/receipt  receipt, ?format=text|json
//! ```

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Caller};
use crate::AppState;
use khata_core::receipt::TextReceiptRenderer;
use khata_core::{Invoice, InvoiceStatus};
use khata_db::service::invoice_manager::{
    CreateInvoiceRequest, InvoicePage, UpdateInvoiceRequest,
};
use khata_db::InvoiceFilter;

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: InvoiceStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReceiptQuery {
    #[serde(default)]
    pub format: ReceiptFormat,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(request): ApiJson<CreateInvoiceRequest>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    let invoice = state.engine.invoices().create(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
) -> ApiResult<Json<InvoicePage>> {
    debug!(owner_id = %ctx.owner_id, ?filter, "Listing invoices");
    let page = state.engine.invoices().list(&ctx, &filter).await?;
    Ok(Json(page))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.engine.invoices().get(&ctx, &id).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<UpdateInvoiceRequest>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.engine.invoices().update(&ctx, &id, patch).await?))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    Ok(Json(state.engine.invoices().delete(&ctx, &id).await?))
}

pub async fn change_status(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Json<Invoice>> {
    let invoice = state
        .engine
        .invoices()
        .change_status(&ctx, &id, change.status)
        .await?;
    Ok(Json(invoice))
}

pub async fn receipt(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<ReceiptQuery>,
) -> Result<Response, ApiError> {
    let artifact = state
        .engine
        .invoices()
        .generate_artifact(&ctx, &id, &TextReceiptRenderer::default())
        .await?;

    let response = match query.format {
        ReceiptFormat::Text => (
            [(header::CONTENT_TYPE, artifact.content_type)],
            artifact.body,
        )
            .into_response(),
        ReceiptFormat::Json => Json(artifact.receipt).into_response(),
    };
    Ok(response)
}
