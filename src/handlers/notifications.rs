use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

pub async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state.outbox.get_notification(id).await?;

    Ok(Json(notification))
}

pub async fn resend_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let resend = state.outbox.resend(id).await?;

    Ok((StatusCode::CREATED, Json(resend)))
}
