use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::db::models::Vendor;
use crate::db::queries;
use crate::error::AppError;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct RegisterVendorPayload {
    pub name: String,
    pub email: String,
    pub service_areas: Vec<String>,
}

pub async fn register_vendor(
    State(state): State<AppState>,
    Json(payload): Json<RegisterVendorPayload>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_required("name", &payload.name)?;
    validation::validate_email("email", &payload.email)?;
    for area in &payload.service_areas {
        validation::validate_pincode("service_areas", area)?;
    }

    let id = Uuid::new_v4();
    let vendor = Vendor {
        id,
        name: validation::sanitize_string(&payload.name),
        email: validation::sanitize_string(&payload.email),
        service_areas: payload
            .service_areas
            .iter()
            .map(|a| validation::sanitize_string(a))
            .collect(),
        referral_code: format!("REF-{}", &id.simple().to_string()[..8].to_uppercase()),
        commission_rate: state.rates.standard,
        discounted_commissions_used: 0,
        created_at: Utc::now(),
    };
    let inserted = queries::insert_vendor(&state.db, &vendor).await?;

    Ok((StatusCode::CREATED, Json(inserted)))
}

pub async fn get_vendor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let vendor = queries::get_vendor(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", id)))?;

    Ok(Json(vendor))
}

pub async fn get_commission_discount(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let discount = state.commission.check_vendor_commission_discount(id).await?;

    Ok(Json(discount))
}

pub async fn list_commission_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    queries::get_vendor(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vendor {} not found", id)))?;
    let history = state.commission.list_commission_history(id).await?;

    Ok(Json(history))
}
