use axum::{
    body::Body,
    extract::Request,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use crate::state::AppState;
use crate::api::handlers::{booking_data, health, reservation, time_blocks};
use tower_http::{
    trace::TraceLayer,
    classify::ServerErrorsFailureClass,
};
use tracing::{info_span, Span, error, info};
use uuid::Uuid;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))

        // Customer booking page
        .route("/api/get-booking-data", get(booking_data::get_booking_data))
        .route("/api/create-reservation", post(reservation::create_reservation))

        // Admin
        .route("/api/get-data", get(booking_data::get_admin_data))
        .route("/api/save-settings", post(booking_data::save_settings))
        .route("/api/update-reservation", post(reservation::update_reservation))
        .route("/api/send-email", post(reservation::send_email))

        // Admin calendar
        .route("/api/save-time-blocks", post(time_blocks::save_time_blocks))
        .route("/api/time-blocks/open", post(time_blocks::open_time_blocks))
        .route("/api/time-blocks/close", post(time_blocks::close_time_blocks))
        .route("/api/time-blocks/toggle", post(time_blocks::toggle_time_block))
        .route("/api/time-blocks/drag", post(time_blocks::drag_time_blocks))

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = Uuid::new_v4().to_string();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|request: &Request<Body>, _span: &Span| {
                    info!("started processing request: {} {}", request.method(), request.uri().path());
                })
                .on_response(|response: &axum::http::Response<Body>, latency: Duration, _span: &Span| {
                    info!(
                        status = response.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "finished processing request"
                    );
                })
                .on_failure(|error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    error!("request failed: {:?}", error);
                })
        )
        .with_state(state)
}
