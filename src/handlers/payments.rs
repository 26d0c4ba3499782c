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
use crate::services::payments::PaymentConfirmation;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentPayload {
    pub vendor_id: Uuid,
    pub user_email: String,
}

pub async fn create_payment_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let payment_order = state
        .payments
        .create_payment_order(order_id, payload.vendor_id, &payload.user_email)
        .await?;

    Ok((StatusCode::CREATED, Json(payment_order)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentPayload {
    pub vendor_id: Uuid,
    pub processor_order_id: String,
    pub processor_payment_id: String,
    pub signature: String,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = state
        .payments
        .verify_payment(
            order_id,
            payload.vendor_id,
            PaymentConfirmation {
                remote_order_id: payload.processor_order_id,
                remote_payment_id: payload.processor_payment_id,
                signature: payload.signature,
            },
        )
        .await?;

    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct RefundPayload {
    pub payment_id: String,
    pub amount: Option<BigDecimal>,
    pub reason: Option<String>,
}

pub async fn process_refund(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<RefundPayload>,
) -> Result<impl IntoResponse, AppError> {
    let reason = payload.reason.unwrap_or_else(|| "not specified".to_string());
    let result = state
        .payments
        .process_refund(order_id, &payload.payment_id, payload.amount, &reason)
        .await?;

    Ok(Json(result))
}
