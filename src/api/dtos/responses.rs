use serde::Serialize;
use crate::domain::models::reservation::Reservation;
use crate::domain::models::settings::OperatingConfig;
use crate::domain::services::availability::AvailabilityGrid;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDataResponse {
    pub settings: OperatingConfig,
    pub time_blocks: AvailabilityGrid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDataResponse {
    pub settings: OperatingConfig,
    pub time_blocks: AvailabilityGrid,
    pub reservations: Vec<Reservation>,
    pub pending_count: usize,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlocksResponse {
    pub success: bool,
    pub time_blocks: AvailabilityGrid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCreatedResponse {
    pub success: bool,
    pub reservation: Reservation,
    pub time_blocks: AvailabilityGrid,
}
