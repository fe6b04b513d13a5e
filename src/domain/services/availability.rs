use std::collections::BTreeMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::domain::models::slot::{SlotStatus, SlotTime};
use crate::domain::services::slot_clock::{coverage_window, BLOCK_MINUTES};

/// Per-date, per-slot availability. Serialized as
/// `{ "YYYY-MM-DD": { "HH:MM": "available" | "unavailable" | "booked" } }`.
///
/// A missing date or slot reads as `Unavailable`. `Booked` is only ever
/// written by [`reserve`](Self::reserve) and only cleared by
/// [`release`](Self::release); every other writer skips booked slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvailabilityGrid {
    days: BTreeMap<NaiveDate, BTreeMap<SlotTime, SlotStatus>>,
}

impl AvailabilityGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, date: NaiveDate, slot: SlotTime) -> SlotStatus {
        self.days
            .get(&date)
            .and_then(|slots| slots.get(&slot))
            .copied()
            .unwrap_or_default()
    }

    /// Direct admin write. Returns false when skipped: the slot is booked,
    /// or the caller asked for `Booked`, which only `reserve` may produce.
    pub fn set_status(&mut self, date: NaiveDate, slot: SlotTime, status: SlotStatus) -> bool {
        if status == SlotStatus::Booked || self.status(date, slot) == SlotStatus::Booked {
            return false;
        }
        self.days.entry(date).or_default().insert(slot, status);
        true
    }

    /// Flips available <-> unavailable. Booked slots are left alone.
    pub fn toggle(&mut self, date: NaiveDate, slot: SlotTime) -> bool {
        let next = match self.status(date, slot) {
            SlotStatus::Available => SlotStatus::Unavailable,
            SlotStatus::Unavailable => SlotStatus::Available,
            SlotStatus::Booked => return false,
        };
        self.set_status(date, slot, next)
    }

    pub fn open_range(&mut self, date: NaiveDate, slots: &[SlotTime]) -> usize {
        self.write_range(date, slots, SlotStatus::Available)
    }

    pub fn close_range(&mut self, date: NaiveDate, slots: &[SlotTime]) -> usize {
        self.write_range(date, slots, SlotStatus::Unavailable)
    }

    fn write_range(&mut self, date: NaiveDate, slots: &[SlotTime], status: SlotStatus) -> usize {
        slots
            .iter()
            .filter(|slot| self.set_status(date, **slot, status))
            .count()
    }

    /// Marks the coverage window of a session at `start` as booked.
    pub fn reserve(&mut self, date: NaiveDate, start: SlotTime, interval: u32) {
        let day = self.days.entry(date).or_default();
        for slot in coverage_window(start, interval, BLOCK_MINUTES) {
            day.insert(slot, SlotStatus::Booked);
        }
    }

    /// Returns the booked slots of the window at `start` to `Available`.
    /// Slots in any other state are untouched, so repeated calls are no-ops.
    pub fn release(&mut self, date: NaiveDate, start: SlotTime, interval: u32) {
        let Some(day) = self.days.get_mut(&date) else {
            return;
        };
        for slot in coverage_window(start, interval, BLOCK_MINUTES) {
            if let Some(status) = day.get_mut(&slot)
                && *status == SlotStatus::Booked
            {
                *status = SlotStatus::Available;
            }
        }
    }

    /// The first slot of the window at `start` that is already booked.
    pub fn booked_in_window(&self, date: NaiveDate, start: SlotTime, interval: u32) -> Option<SlotTime> {
        coverage_window(start, interval, BLOCK_MINUTES)
            .into_iter()
            .find(|slot| self.status(date, *slot) == SlotStatus::Booked)
    }

    pub fn is_date_open(&self, date: NaiveDate) -> bool {
        self.days
            .get(&date)
            .is_some_and(|slots| slots.values().any(|s| *s == SlotStatus::Available))
    }

    /// Available slots of a date in ascending order.
    pub fn available_slots(&self, date: NaiveDate) -> Vec<SlotTime> {
        self.days
            .get(&date)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|(_, status)| **status == SlotStatus::Available)
                    .map(|(slot, _)| *slot)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn slots_on(&self, date: NaiveDate) -> impl Iterator<Item = (SlotTime, SlotStatus)> + '_ {
        self.days
            .get(&date)
            .into_iter()
            .flat_map(|slots| slots.iter().map(|(slot, status)| (*slot, *status)))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    /// Applies a grid edited wholesale by the admin. Every entry goes through
    /// [`set_status`](Self::set_status), so booked slots can neither be
    /// created nor cleared this way, and slots missing from `incoming` keep
    /// their current status.
    pub fn merge_admin_edits(&mut self, incoming: &AvailabilityGrid) -> usize {
        let mut applied = 0;
        for (date, slots) in &incoming.days {
            for (slot, status) in slots {
                if self.status(*date, *slot) != *status && self.set_status(*date, *slot, *status) {
                    applied += 1;
                }
            }
        }
        applied
    }
}
