//! Admin-side edits of the availability grid that span several dates or
//! several slots at once. Everything funnels into
//! [`AvailabilityGrid::set_status`], so booked slots are never touched.

use chrono::NaiveDate;
use crate::domain::models::slot::{SlotStatus, SlotTime};
use crate::domain::services::availability::AvailabilityGrid;

pub fn open_dates(grid: &mut AvailabilityGrid, dates: &[NaiveDate], slots: &[SlotTime]) -> usize {
    dates.iter().map(|date| grid.open_range(*date, slots)).sum()
}

pub fn close_dates(grid: &mut AvailabilityGrid, dates: &[NaiveDate], slots: &[SlotTime]) -> usize {
    dates.iter().map(|date| grid.close_range(*date, slots)).sum()
}

pub fn toggle_dates(grid: &mut AvailabilityGrid, dates: &[NaiveDate], slot: SlotTime) -> usize {
    dates.iter().filter(|date| grid.toggle(**date, slot)).count()
}

/// A press-drag-release gesture over the slots of one or more dates.
///
/// The slot under the initial press decides the mode: an available slot
/// starts a closing drag, anything else an opening drag. Booked slots can
/// neither start nor join a drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSelection {
    anchor_date: NaiveDate,
    mode: SlotStatus,
    times: Vec<SlotTime>,
}

impl DragSelection {
    pub fn start(grid: &AvailabilityGrid, anchor_date: NaiveDate, time: SlotTime) -> Option<Self> {
        let mode = match grid.status(anchor_date, time) {
            SlotStatus::Booked => return None,
            SlotStatus::Available => SlotStatus::Unavailable,
            SlotStatus::Unavailable => SlotStatus::Available,
        };
        Some(Self { anchor_date, mode, times: vec![time] })
    }

    pub fn extend(&mut self, grid: &AvailabilityGrid, time: SlotTime) -> bool {
        if grid.status(self.anchor_date, time) == SlotStatus::Booked || self.times.contains(&time) {
            return false;
        }
        self.times.push(time);
        true
    }

    pub fn mode(&self) -> SlotStatus {
        self.mode
    }

    pub fn times(&self) -> &[SlotTime] {
        &self.times
    }

    /// Applies the drag to every target date and returns how many slots changed.
    pub fn finish(self, grid: &mut AvailabilityGrid, dates: &[NaiveDate]) -> usize {
        let mut changed = 0;
        for date in dates {
            for time in &self.times {
                if grid.set_status(*date, *time, self.mode) {
                    changed += 1;
                }
            }
        }
        changed
    }
}
