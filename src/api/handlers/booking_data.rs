use axum::{extract::{rejection::{JsonRejection, QueryRejection}, Query, State}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{AdminDataQuery, SaveSettingsRequest};
use crate::api::dtos::responses::{AdminDataResponse, BookingDataResponse, SuccessResponse};
use crate::error::AppError;
use std::sync::Arc;

/// What the customer booking page needs: operating hours and the grid.
pub async fn get_booking_data(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.booking_service.settings().await?;
    let time_blocks = state.booking_service.time_blocks().await?;
    Ok(Json(BookingDataResponse { settings, time_blocks }))
}

pub async fn get_admin_data(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AdminDataQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let status = query.status_filter()?;

    let snapshot = state.booking_service.snapshot().await?;
    let reservations = snapshot
        .ledger
        .search(status, query.search.as_deref())
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(AdminDataResponse {
        pending_count: snapshot.ledger.pending_count(),
        settings: snapshot.settings,
        time_blocks: snapshot.grid,
        reservations,
    }))
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveSettingsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    state.booking_service.save_settings(&payload.settings).await?;
    Ok(Json(SuccessResponse { success: true }))
}
