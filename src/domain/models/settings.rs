use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use crate::domain::models::slot::SlotTime;
use crate::domain::services::slot_clock::generate_slots;
use crate::error::AppError;

/// Admin-controlled operating hours. Stored under the `settings` key;
/// missing fields fall back to [`OperatingConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatingConfig {
    /// 0 = Sunday .. 6 = Saturday
    pub weekdays: Vec<u8>,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    /// Slot spacing in minutes.
    pub interval: u32,
}

impl Default for OperatingConfig {
    /// Monday to Friday, 09:00 to 18:00, hourly slots.
    fn default() -> Self {
        Self {
            weekdays: vec![1, 2, 3, 4, 5],
            start_time: SlotTime::from_minutes(9 * 60),
            end_time: SlotTime::from_minutes(18 * 60),
            interval: 60,
        }
    }
}

impl OperatingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.weekdays.is_empty() {
            return Err(AppError::Validation("At least one operating weekday is required".into()));
        }
        if let Some(day) = self.weekdays.iter().find(|d| **d > 6) {
            return Err(AppError::Validation(format!("Weekday {} is out of range (0-6)", day)));
        }
        if self.start_time >= self.end_time {
            return Err(AppError::Validation("End time must be later than start time".into()));
        }
        if self.interval == 0 {
            return Err(AppError::Validation("Interval must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn is_operating_day(&self, date: NaiveDate) -> bool {
        let day = date.weekday().num_days_from_sunday() as u8;
        self.weekdays.contains(&day)
    }

    /// Every slot of an operating day.
    pub fn daily_slots(&self) -> Vec<SlotTime> {
        generate_slots(self.start_time, self.end_time, self.interval)
    }
}
