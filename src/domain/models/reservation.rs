use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use crate::domain::models::course::CourseKind;
use crate::domain::models::slot::SlotTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
}

/// One session of a reservation. Ordering is `(date, time)`, which is also
/// the order sessions are numbered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub date: NaiveDate,
    pub time: SlotTime,
}

impl ScheduleEntry {
    pub fn new(date: NaiveDate, time: SlotTime) -> Self {
        Self { date, time }
    }
}

/// Intake fields collected from the customer. Kept as plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerProfile {
    pub customer_name: String,
    pub customer_age: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub customer_region: String,
    pub customer_company: String,
    pub customer_position: String,
    pub customer_interview_date: String,
    pub interview_types: Vec<String>,
    pub consult_method: String,
    pub referrals: Vec<String>,
    pub receipt: bool,
    pub receipt_number: String,
    pub refund_agree: bool,
    pub privacy_agree: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    pub course: CourseKind,
    pub course_name: String,
    pub price: u64,
    pub sessions: u32,
    pub schedules: Vec<ScheduleEntry>,
    #[serde(flatten)]
    pub customer: CustomerProfile,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub email_sent: bool,
    /// Slot interval the coverage windows were reserved with. Set while
    /// confirmed so a later interval change still releases the same slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub held_interval: Option<u32>,
}

/// What a customer submits. Price, id, status and timestamps are assigned
/// by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDraft {
    pub course: CourseKind,
    #[serde(default)]
    pub sessions: Option<u32>,
    pub schedules: Vec<ScheduleEntry>,
    #[serde(flatten)]
    pub customer: CustomerProfile,
}

/// `YS` + creation day + four random upper-case alphanumerics.
pub fn generate_reservation_id(day: NaiveDate) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("YS{}{}", day.format("%Y%m%d"), suffix)
}
