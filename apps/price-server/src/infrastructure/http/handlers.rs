//! Price and dead-letter query handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::HttpState;
use crate::application::ports::DeadLetter;
use crate::domain::price::{Price, PriceStore, StoreError};

/// API error returned by query handlers.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            StoreError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub(super) async fn vendor_prices<S: PriceStore + 'static>(
    State(state): State<HttpState<S>>,
    Path(vendor_id): Path<String>,
) -> Result<Json<Vec<Price>>, ApiError> {
    Ok(Json(state.queries.by_vendor(&vendor_id)?))
}

pub(super) async fn instrument_prices<S: PriceStore + 'static>(
    State(state): State<HttpState<S>>,
    Path(instrument_id): Path<String>,
) -> Result<Json<Vec<Price>>, ApiError> {
    Ok(Json(state.queries.by_instrument(&instrument_id)?))
}

pub(super) async fn dead_letters<S: PriceStore + 'static>(
    State(state): State<HttpState<S>>,
) -> Json<Vec<DeadLetter>> {
    Json(state.dead_letters.snapshot())
}
