use chrono::NaiveDate;
use serde::Deserialize;
use crate::domain::models::course::CourseKind;
use crate::domain::models::reservation::{CustomerProfile, ReservationDraft, ReservationStatus, ScheduleEntry};
use crate::domain::models::settings::OperatingConfig;
use crate::domain::models::slot::SlotTime;
use crate::domain::services::availability::AvailabilityGrid;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct AdminDataQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

impl AdminDataQuery {
    /// Empty and `all` mean no status filter.
    pub fn status_filter(&self) -> Result<Option<ReservationStatus>, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some("pending") => Ok(Some(ReservationStatus::Pending)),
            Some("confirmed") => Ok(Some(ReservationStatus::Confirmed)),
            Some(other) => Err(AppError::Validation(format!("Unknown status filter: {}", other))),
        }
    }
}

#[derive(Deserialize)]
pub struct SaveSettingsRequest {
    pub settings: OperatingConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTimeBlocksRequest {
    pub time_blocks: AvailabilityGrid,
}

/// Bulk open/close. Without `slots` every slot of the configured day is used.
#[derive(Deserialize)]
pub struct DateRangeRequest {
    pub dates: Vec<NaiveDate>,
    pub slots: Option<Vec<SlotTime>>,
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub dates: Vec<NaiveDate>,
    pub time: SlotTime,
}

/// A finished drag: the first time is where the press started.
#[derive(Deserialize)]
pub struct DragRequest {
    pub dates: Vec<NaiveDate>,
    pub times: Vec<SlotTime>,
}

/// Schedule entry as sent by clients; either half may be missing.
#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
}

impl ScheduleRequest {
    pub fn into_entry(self) -> Result<ScheduleEntry, AppError> {
        let (Some(date), Some(time)) = (self.date, self.time) else {
            return Err(AppError::Validation("Each schedule needs both a date and a time".into()));
        };
        let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| AppError::Validation(format!("Invalid date format: {}", date)))?;
        Ok(ScheduleEntry::new(date, time.parse()?))
    }
}

fn into_entries(schedules: Vec<ScheduleRequest>) -> Result<Vec<ScheduleEntry>, AppError> {
    schedules.into_iter().map(ScheduleRequest::into_entry).collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPayload {
    pub course: CourseKind,
    pub sessions: Option<u32>,
    #[serde(default)]
    pub schedules: Vec<ScheduleRequest>,
    #[serde(flatten)]
    pub customer: CustomerProfile,
}

impl ReservationPayload {
    pub fn into_draft(self) -> Result<ReservationDraft, AppError> {
        if self.schedules.is_empty() {
            return Err(AppError::Validation("At least one schedule is required".into()));
        }
        Ok(ReservationDraft {
            course: self.course,
            sessions: self.sessions,
            schedules: into_entries(self.schedules)?,
            customer: self.customer,
        })
    }
}

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub reservation: ReservationPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    pub action: String,
    pub reservation_id: String,
    pub schedules: Option<Vec<ScheduleRequest>>,
}

impl UpdateReservationRequest {
    pub fn schedule_entries(&mut self) -> Result<Option<Vec<ScheduleEntry>>, AppError> {
        self.schedules.take().map(into_entries).transpose()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub reservation_id: String,
}
