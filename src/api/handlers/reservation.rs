use axum::{extract::{rejection::JsonRejection, State}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{CreateReservationRequest, SendEmailRequest, UpdateReservationRequest};
use crate::api::dtos::responses::{ReservationCreatedResponse, SuccessResponse, TimeBlocksResponse};
use crate::domain::services::ledger::{LedgerChange, ReservationAction};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let draft = payload.reservation.into_draft()?;

    let (reservation, time_blocks) = state.booking_service.create_reservation(draft).await?;
    state.notifier.booking_received(&reservation);

    Ok(Json(ReservationCreatedResponse { success: true, reservation, time_blocks }))
}

pub async fn update_reservation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateReservationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(mut payload) = payload?;
    let schedules = payload.schedule_entries()?;
    let action = ReservationAction::parse(&payload.action, schedules)?;
    info!("update_reservation: {} on {}", payload.action, payload.reservation_id);

    let (change, time_blocks) = state
        .booking_service
        .update_reservation(&payload.reservation_id, action)
        .await?;

    if let LedgerChange::Confirmed(reservation) = &change {
        state.notifier.reservation_confirmed(reservation);
    }

    Ok(Json(TimeBlocksResponse { success: true, time_blocks, changed: None }))
}

/// Sends the intake questionnaire, then records that it went out.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendEmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    let notifier = state.notifier.clone();
    state
        .booking_service
        .deliver_and_mark_email_sent(&payload.reservation_id, |reservation| async move {
            notifier.send_intake_email(&reservation).await
        })
        .await?;

    info!("Intake email sent for {}", payload.reservation_id);
    Ok(Json(SuccessResponse { success: true }))
}
