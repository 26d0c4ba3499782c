use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::db::models::{Order, OrderType};
use crate::db::queries;
use crate::error::AppError;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct CreateOrderPayload {
    pub user_email: String,
    pub order_type: OrderType,
    pub pickup_pincode: String,
    pub destination_pincode: String,
    pub referring_vendor_id: Option<Uuid>,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_email("user_email", &payload.user_email)?;
    validation::validate_pincode("pickup_pincode", &payload.pickup_pincode)?;
    validation::validate_pincode("destination_pincode", &payload.destination_pincode)?;

    if let Some(referring_vendor_id) = payload.referring_vendor_id {
        queries::get_vendor(&state.db, referring_vendor_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Referring vendor {} not found",
                    referring_vendor_id
                ))
            })?;
    }

    let order = Order::new(
        validation::sanitize_string(&payload.user_email),
        payload.order_type,
        validation::sanitize_string(&payload.pickup_pincode),
        validation::sanitize_string(&payload.destination_pincode),
        payload.referring_vendor_id,
    );
    let inserted = queries::insert_order(&state.db, &order).await?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = queries::get_order(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;

    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub user_email: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let limit = filter.limit.unwrap_or(20);
    let offset = filter.offset.unwrap_or(0);

    let orders = match (&filter.user_email, filter.vendor_id) {
        (Some(email), None) => {
            queries::list_orders_for_user(&state.db, email, limit, offset).await?
        }
        (None, Some(vendor_id)) => queries::list_orders_for_vendor(&state.db, vendor_id).await?,
        _ => {
            return Err(AppError::Validation(
                "exactly one of user_email or vendor_id is required".to_string(),
            ));
        }
    };

    Ok(Json(orders))
}
