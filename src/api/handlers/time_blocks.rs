use axum::{extract::{rejection::JsonRejection, State}, response::IntoResponse, Json};
use chrono::NaiveDate;
use crate::state::AppState;
use crate::api::dtos::requests::{DateRangeRequest, DragRequest, SaveTimeBlocksRequest, ToggleRequest};
use crate::api::dtos::responses::TimeBlocksResponse;
use crate::domain::services::admin_calendar::{close_dates, open_dates, toggle_dates, DragSelection};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

fn require_dates(dates: &[NaiveDate]) -> Result<(), AppError> {
    if dates.is_empty() {
        return Err(AppError::Validation("At least one date is required".into()));
    }
    Ok(())
}

pub async fn save_time_blocks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SaveTimeBlocksRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let time_blocks = state.booking_service.save_time_blocks(&payload.time_blocks).await?;
    Ok(Json(TimeBlocksResponse { success: true, time_blocks, changed: None }))
}

pub async fn open_time_blocks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DateRangeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    require_dates(&payload.dates)?;

    let (time_blocks, changed) = state
        .booking_service
        .update_grid(|grid, settings| {
            let slots = payload.slots.clone().unwrap_or_else(|| settings.daily_slots());
            open_dates(grid, &payload.dates, &slots)
        })
        .await?;

    info!("Opened {} slots over {} dates", changed, payload.dates.len());
    Ok(Json(TimeBlocksResponse { success: true, time_blocks, changed: Some(changed) }))
}

pub async fn close_time_blocks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DateRangeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    require_dates(&payload.dates)?;

    let (time_blocks, changed) = state
        .booking_service
        .update_grid(|grid, settings| {
            let slots = payload.slots.clone().unwrap_or_else(|| settings.daily_slots());
            close_dates(grid, &payload.dates, &slots)
        })
        .await?;

    info!("Closed {} slots over {} dates", changed, payload.dates.len());
    Ok(Json(TimeBlocksResponse { success: true, time_blocks, changed: Some(changed) }))
}

pub async fn toggle_time_block(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    require_dates(&payload.dates)?;

    let (time_blocks, changed) = state
        .booking_service
        .update_grid(|grid, _| toggle_dates(grid, &payload.dates, payload.time))
        .await?;

    Ok(Json(TimeBlocksResponse { success: true, time_blocks, changed: Some(changed) }))
}

pub async fn drag_time_blocks(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DragRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    require_dates(&payload.dates)?;
    let Some((first, rest)) = payload.times.split_first() else {
        return Err(AppError::Validation("At least one time is required".into()));
    };

    let (time_blocks, changed) = state
        .booking_service
        .update_grid(|grid, _| {
            let Some(mut selection) = DragSelection::start(grid, payload.dates[0], *first) else {
                return 0;
            };
            for time in rest {
                selection.extend(grid, *time);
            }
            selection.finish(grid, &payload.dates)
        })
        .await?;

    info!("Drag applied to {} slots", changed);
    Ok(Json(TimeBlocksResponse { success: true, time_blocks, changed: Some(changed) }))
}
