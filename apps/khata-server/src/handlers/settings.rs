//! Per-owner tax settings read by invoice creation and updates.

use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::error::ApiResult;
use crate::extract::{ApiJson, Caller};
use crate::AppState;
use khata_core::validation::validate_tax_rate_bps;
use khata_core::TaxSettings;
use khata_db::ServiceError;

pub async fn get_tax(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> ApiResult<Json<TaxSettings>> {
    let settings = state
        .engine
        .db()
        .settings()
        .tax_settings(&ctx.owner_id)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(settings))
}

pub async fn put_tax(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    ApiJson(settings): ApiJson<TaxSettings>,
) -> ApiResult<Json<TaxSettings>> {
    validate_tax_rate_bps(settings.rate_bps).map_err(ServiceError::from)?;

    state
        .engine
        .db()
        .settings()
        .set_tax_settings(&ctx.owner_id, settings)
        .await
        .map_err(ServiceError::from)?;

    info!(
        owner_id = %ctx.owner_id,
        enabled = settings.enabled,
        rate_bps = settings.rate_bps,
        "Tax settings updated"
    );
    Ok(Json(settings))
}
