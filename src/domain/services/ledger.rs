use std::collections::HashSet;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::domain::models::course::Course;
use crate::domain::models::reservation::{
    generate_reservation_id, Reservation, ReservationDraft, ReservationStatus, ScheduleEntry,
};
use crate::domain::models::settings::OperatingConfig;
use crate::domain::models::slot::SlotStatus;
use crate::domain::services::availability::AvailabilityGrid;
use crate::error::AppError;

/// Admin mutations accepted by [`ReservationLedger::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationAction {
    Confirm,
    Delete,
    EditSchedules(Vec<ScheduleEntry>),
    MarkEmailSent,
}

impl ReservationAction {
    pub fn parse(action: &str, schedules: Option<Vec<ScheduleEntry>>) -> Result<Self, AppError> {
        match action {
            "confirm" => Ok(Self::Confirm),
            "delete" => Ok(Self::Delete),
            "edit_schedules" => {
                let schedules = schedules
                    .ok_or_else(|| AppError::Validation("New schedules are required".into()))?;
                Ok(Self::EditSchedules(schedules))
            }
            "mark_email_sent" => Ok(Self::MarkEmailSent),
            other => Err(AppError::Validation(format!("Invalid action: {}", other))),
        }
    }
}

/// Result of a ledger mutation, carrying the reservation as it stands
/// afterwards (or as it was, for deletions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerChange {
    Confirmed(Reservation),
    AlreadyConfirmed(Reservation),
    Deleted(Reservation),
    Rescheduled(Reservation),
    EmailMarked(Reservation),
}

impl LedgerChange {
    pub fn reservation(&self) -> &Reservation {
        match self {
            LedgerChange::Confirmed(r)
            | LedgerChange::AlreadyConfirmed(r)
            | LedgerChange::Deleted(r)
            | LedgerChange::Rescheduled(r)
            | LedgerChange::EmailMarked(r) => r,
        }
    }

    /// Whether the grid or the reservation list changed.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, LedgerChange::AlreadyConfirmed(_))
    }
}

/// The authoritative reservation list.
///
/// Only confirmed reservations hold slots: confirming reserves every
/// session's coverage window, and deleting or rescheduling a confirmed
/// reservation releases them. Pending reservations never touch the grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationLedger {
    reservations: Vec<Reservation>,
}

impl ReservationLedger {
    pub fn new(reservations: Vec<Reservation>) -> Self {
        Self { reservations }
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn get(&self, id: &str) -> Option<&Reservation> {
        self.reservations.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Pending)
            .count()
    }

    /// Admin list view. `query` matches the customer name case-insensitively
    /// or the phone number ignoring separators.
    pub fn search(&self, status: Option<ReservationStatus>, query: Option<&str>) -> Vec<&Reservation> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let needle = query.map(str::to_lowercase);
        let digits: Option<String> = query
            .map(|q| q.chars().filter(|c| c.is_ascii_digit()).collect())
            .filter(|d: &String| !d.is_empty());

        self.reservations
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .filter(|r| {
                let Some(needle) = &needle else {
                    return true;
                };
                let phone: String = r.customer.customer_phone.chars().filter(|c| c.is_ascii_digit()).collect();
                r.customer.customer_name.to_lowercase().contains(needle.as_str())
                    || r.customer.customer_phone.contains(needle.as_str())
                    || digits.as_ref().is_some_and(|d| phone.contains(d.as_str()))
            })
            .collect()
    }

    fn index_of(&self, id: &str) -> Result<usize, AppError> {
        self.reservations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Validates a customer draft against the current grid and appends it
    /// as a pending reservation. The grid is only read.
    pub fn create(
        &mut self,
        draft: ReservationDraft,
        grid: &AvailabilityGrid,
        settings: &OperatingConfig,
        today: NaiveDate,
    ) -> Result<Reservation, AppError> {
        let course = Course::resolve(draft.course, draft.sessions)?;

        if draft.schedules.len() != course.sessions() as usize {
            return Err(AppError::Validation(format!(
                "Expected {} schedules, got {}",
                course.sessions(),
                draft.schedules.len()
            )));
        }

        let mut seen_dates = HashSet::new();
        if let Some(dup) = draft.schedules.iter().find(|s| !seen_dates.insert(s.date)) {
            return Err(AppError::Validation(format!(
                "Only one session per day can be booked ({})", dup.date
            )));
        }

        for entry in &draft.schedules {
            if entry.date < today {
                return Err(AppError::Validation(format!("Cannot book in the past ({})", entry.date)));
            }
            if !settings.is_operating_day(entry.date) {
                return Err(AppError::Conflict(format!("{} is not an operating day", entry.date)));
            }
            if grid.status(entry.date, entry.time) != SlotStatus::Available {
                return Err(AppError::Conflict(format!(
                    "Slot {} {} is no longer available", entry.date, entry.time
                )));
            }
            if let Some(slot) = grid.booked_in_window(entry.date, entry.time, settings.interval) {
                return Err(AppError::Conflict(format!(
                    "Session at {} {} overlaps a booked slot at {}", entry.date, entry.time, slot
                )));
            }
        }

        let mut schedules = draft.schedules;
        schedules.sort();

        let reservation = Reservation {
            id: self.fresh_id(today),
            course: course.kind(),
            course_name: course.display_name(),
            price: course.price(),
            sessions: course.sessions(),
            schedules,
            customer: draft.customer,
            status: ReservationStatus::Pending,
            created_at: Utc::now(),
            email_sent: false,
            held_interval: None,
        };

        self.reservations.push(reservation.clone());
        Ok(reservation)
    }

    fn fresh_id(&self, today: NaiveDate) -> String {
        loop {
            let id = generate_reservation_id(today);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    pub fn apply(
        &mut self,
        id: &str,
        action: ReservationAction,
        grid: &mut AvailabilityGrid,
        interval: u32,
    ) -> Result<LedgerChange, AppError> {
        match action {
            ReservationAction::Confirm => self.confirm(id, grid, interval),
            ReservationAction::Delete => self.delete(id, grid, interval).map(LedgerChange::Deleted),
            ReservationAction::EditSchedules(schedules) => {
                self.edit_schedules(id, schedules, grid, interval).map(LedgerChange::Rescheduled)
            }
            ReservationAction::MarkEmailSent => self.mark_email_sent(id).map(LedgerChange::EmailMarked),
        }
    }

    /// `pending -> confirmed`, reserving every session. A second call is a
    /// no-op. Fails with `Conflict` if any session would land on a slot
    /// already booked by someone else; the grid is untouched in that case.
    pub fn confirm(
        &mut self,
        id: &str,
        grid: &mut AvailabilityGrid,
        interval: u32,
    ) -> Result<LedgerChange, AppError> {
        let idx = self.index_of(id)?;
        if self.reservations[idx].status == ReservationStatus::Confirmed {
            return Ok(LedgerChange::AlreadyConfirmed(self.reservations[idx].clone()));
        }

        let mut staged = grid.clone();
        reserve_all(&mut staged, &self.reservations[idx].schedules, interval)?;
        *grid = staged;

        let reservation = &mut self.reservations[idx];
        reservation.status = ReservationStatus::Confirmed;
        reservation.held_interval = Some(interval);
        info!("Reservation confirmed: {}", reservation.id);
        Ok(LedgerChange::Confirmed(reservation.clone()))
    }

    /// Removes a reservation. A confirmed one gives back its windows,
    /// measured with the interval they were reserved with.
    pub fn delete(
        &mut self,
        id: &str,
        grid: &mut AvailabilityGrid,
        interval: u32,
    ) -> Result<Reservation, AppError> {
        let idx = self.index_of(id)?;
        let removed = self.reservations.remove(idx);

        if removed.status == ReservationStatus::Confirmed {
            let held = removed.held_interval.unwrap_or(interval);
            for entry in &removed.schedules {
                grid.release(entry.date, entry.time, held);
            }
        }

        info!("Reservation deleted: {}", removed.id);
        Ok(removed)
    }

    /// Replaces the sessions of a reservation. The session count is not
    /// re-checked against the purchase. For confirmed reservations the old
    /// windows are released with the interval they were reserved with and
    /// the new ones reserved with the current interval, as one step.
    pub fn edit_schedules(
        &mut self,
        id: &str,
        new_schedules: Vec<ScheduleEntry>,
        grid: &mut AvailabilityGrid,
        interval: u32,
    ) -> Result<Reservation, AppError> {
        if new_schedules.is_empty() {
            return Err(AppError::Validation("New schedules must not be empty".into()));
        }
        let idx = self.index_of(id)?;

        let mut schedules = new_schedules;
        schedules.sort();

        let confirmed = self.reservations[idx].status == ReservationStatus::Confirmed;
        if confirmed {
            let held = self.reservations[idx].held_interval.unwrap_or(interval);
            let mut staged = grid.clone();
            for entry in &self.reservations[idx].schedules {
                staged.release(entry.date, entry.time, held);
            }
            reserve_all(&mut staged, &schedules, interval)?;
            *grid = staged;
        }

        let reservation = &mut self.reservations[idx];
        reservation.schedules = schedules;
        if confirmed {
            reservation.held_interval = Some(interval);
        }
        info!("Reservation rescheduled: {}", reservation.id);
        Ok(reservation.clone())
    }

    pub fn mark_email_sent(&mut self, id: &str) -> Result<Reservation, AppError> {
        let idx = self.index_of(id)?;
        let reservation = &mut self.reservations[idx];
        reservation.email_sent = true;
        Ok(reservation.clone())
    }
}

fn reserve_all(grid: &mut AvailabilityGrid, schedules: &[ScheduleEntry], interval: u32) -> Result<(), AppError> {
    for entry in schedules {
        if let Some(slot) = grid.booked_in_window(entry.date, entry.time, interval) {
            return Err(AppError::Conflict(format!(
                "Slot {} {} is already booked", entry.date, slot
            )));
        }
        grid.reserve(entry.date, entry.time, interval);
    }
    Ok(())
}
