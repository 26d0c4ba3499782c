use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::AppState;
use crate::db::models::{DeliveryStatus, Rider, RiderStatus};
use crate::db::queries;
use crate::error::AppError;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct AssignRiderPayload {
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
}

pub async fn assign_rider(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AssignRiderPayload>,
) -> Result<impl IntoResponse, AppError> {
    let pickup = match (payload.pickup_lat, payload.pickup_lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "pickup_lat and pickup_lng must be provided together".to_string(),
            ));
        }
    };

    let delivery = state.delivery.assign_rider(order_id, pickup).await?;

    Ok((StatusCode::CREATED, Json(delivery)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: DeliveryStatus,
    pub note: Option<String>,
}

pub async fn update_delivery_status(
    State(state): State<AppState>,
    Path(delivery_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let delivery = state
        .delivery
        .update_delivery_status(delivery_id, payload.status, payload.note)
        .await?;

    Ok(Json(delivery))
}

pub async fn get_delivery(
    State(state): State<AppState>,
    Path(delivery_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let delivery = queries::get_delivery(&state.db, delivery_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Delivery {} not found", delivery_id)))?;
    let events = queries::list_delivery_events(&state.db, delivery_id).await?;

    Ok(Json(json!({ "delivery": delivery, "events": events })))
}

/// Display-only classification of the order's span, from pincode centroids.
pub async fn order_distance_category(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = queries::get_order(&state.db, order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    let category = state
        .delivery
        .distance_category(&order.pickup_pincode, &order.destination_pincode)
        .await?;

    Ok(Json(json!({ "order_id": order_id, "category": category })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRiderPayload {
    pub name: String,
}

/// New riders start in `pending` until an operator activates them.
pub async fn register_rider(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRiderPayload>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_required("name", &payload.name)?;

    let rider = Rider {
        id: Uuid::new_v4(),
        name: validation::sanitize_string(&payload.name),
        status: RiderStatus::Pending,
        current_lat: None,
        current_lng: None,
        completed_deliveries: 0,
        location_updated_at: None,
        created_at: Utc::now(),
    };
    let inserted = queries::insert_rider(&state.db, &rider).await?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

#[derive(Debug, Deserialize)]
pub struct RiderStatusPayload {
    pub status: RiderStatus,
}

pub async fn set_rider_status(
    State(state): State<AppState>,
    Path(rider_id): Path<Uuid>,
    Json(payload): Json<RiderStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    queries::get_rider(&state.db, rider_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Rider {} not found", rider_id)))?;
    queries::set_rider_status(&state.db, rider_id, payload.status).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct RiderLocationPayload {
    pub lat: f64,
    pub lng: f64,
}

pub async fn update_rider_location(
    State(state): State<AppState>,
    Path(rider_id): Path<Uuid>,
    Json(payload): Json<RiderLocationPayload>,
) -> Result<impl IntoResponse, AppError> {
    state
        .delivery
        .update_rider_location(rider_id, payload.lat, payload.lng)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
