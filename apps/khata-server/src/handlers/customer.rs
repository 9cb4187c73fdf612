//! Customer and customer-ledger routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, Caller};
use crate::handlers::ListQuery;
use crate::AppState;
use khata_core::{Customer, LedgerTransaction};
use khata_db::service::customer_ledger::{BalanceReport, NewCustomer, PaymentRequest};

pub async fn create_customer(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(request): ApiJson<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.engine.customers().create_customer(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    let customers = state
        .engine
        .customers()
        .list_customers(&ctx, &query.search, query.limit(), query.offset())
        .await?;
    Ok(Json(customers))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.engine.customers().get_customer(&ctx, &id).await?))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<PaymentRequest>,
) -> ApiResult<(StatusCode, Json<LedgerTransaction>)> {
    let tx = state
        .engine
        .customers()
        .record_payment(&ctx, &id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub async fn transactions(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<LedgerTransaction>>> {
    Ok(Json(state.engine.customers().transactions(&ctx, &id).await?))
}

/// Replays the ledger and reports whether it matches the stored balance.
pub async fn verify_balance(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<BalanceReport>> {
    Ok(Json(state.engine.customers().verify_balance(&ctx, &id).await?))
}
