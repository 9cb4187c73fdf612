//! Request extractors.
//!
//! Identity comes from the upstream auth gateway as plain headers; this
//! server never authenticates on its own.

use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use khata_db::CallerContext;

pub const OWNER_HEADER: &str = "x-owner-id";
pub const USER_HEADER: &str = "x-user-id";

/// The calling owner and actor, from `x-owner-id` / `x-user-id`.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerContext);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, ApiError> {
    match parts.headers.get(name) {
        Some(value) => value
            .to_str()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{} is not valid text", name))),
        None => Ok(None),
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let owner = header(parts, OWNER_HEADER)?
            .ok_or_else(|| ApiError::validation(format!("{} header is required", OWNER_HEADER)))?;
        let actor = header(parts, USER_HEADER)?;

        let ctx = CallerContext::new(owner, actor)?;
        Ok(Caller(ctx))
    }
}

/// `Json` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// `Query` whose rejection is an [`ApiError`].
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}
