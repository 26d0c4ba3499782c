use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SubmitQuotePayload {
    pub vendor_id: Uuid,
    pub amount: BigDecimal,
}

pub async fn submit_quote(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<SubmitQuotePayload>,
) -> Result<impl IntoResponse, AppError> {
    let quote = state
        .quotes
        .submit_quote(order_id, payload.vendor_id, payload.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(quote)))
}

pub async fn select_quote(
    State(state): State<AppState>,
    Path((order_id, vendor_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.quotes.select_quote(order_id, vendor_id).await?;

    Ok(Json(order))
}

pub async fn list_quotes(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let quotes = state.quotes.list_quotes(order_id).await?;

    Ok(Json(quotes))
}
