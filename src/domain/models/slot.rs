use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use crate::domain::services::slot_clock::BLOCK_MINUTES;
use crate::error::AppError;

/// A time of day stored as minutes after midnight and written as `HH:MM`.
///
/// Clock times entered by people are `00:00` to `23:59`. Values up to
/// [`SlotTime::LATEST`] also exist: a coverage window starting late in the
/// day keeps plain arithmetic instead of wrapping onto the next morning, and
/// those keys must survive a round trip through storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u32);

impl SlotTime {
    /// Exclusive upper bound of any stored slot: midnight plus one coverage window.
    pub const LATEST: SlotTime = SlotTime(24 * 60 + BLOCK_MINUTES);

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// A clock time. `None` unless `hour <= 23` and `minute <= 59`.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        if hour > 23 || minute >= 60 {
            return None;
        }
        Some(Self(hour * 60 + minute))
    }

    pub const fn minutes(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// Splits `H:MM` / `HH:MM` into digits-only hour and minute parts.
fn split_hm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.trim().split_once(':')?;
    let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
        return None;
    }
    Some((h.parse().ok()?, m.parse().ok()?))
}

impl FromStr for SlotTime {
    type Err = AppError;

    /// Parses a clock time; anything past `23:59` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        split_hm(s)
            .and_then(|(hour, minute)| SlotTime::from_hm(hour, minute))
            .ok_or_else(|| AppError::Validation(format!("Invalid time format (HH:MM): {}", s)))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    /// Accepts clock times and the overhang keys written by coverage windows,
    /// i.e. everything below [`SlotTime::LATEST`].
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        split_hm(&raw)
            .filter(|(_, minute)| *minute < 60)
            .and_then(|(hour, minute)| hour.checked_mul(60)?.checked_add(minute))
            .map(SlotTime::from_minutes)
            .filter(|slot| *slot < SlotTime::LATEST)
            .ok_or_else(|| de::Error::custom(format!("Invalid time format (HH:MM): {}", raw)))
    }
}

/// Status of one slot on one date. Anything not recorded is `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    #[default]
    Unavailable,
    Available,
    Booked,
}
