use chrono::NaiveDate;
use serde::Serialize;
use crate::domain::models::course::{Course, CourseKind};
use crate::domain::models::reservation::{CustomerProfile, ReservationDraft, ScheduleEntry};
use crate::domain::models::settings::OperatingConfig;
use crate::domain::models::slot::SlotTime;
use crate::domain::services::availability::AvailabilityGrid;
use crate::domain::services::slot_clock::windows_overlap;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    CourseSelection,
    SchedulePicking,
    CustomerDetails,
    Submitted,
}

/// How a slot is presented to the customer while picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SlotOffer {
    Selected { session: usize },
    Offerable,
    /// Overlaps the coverage window of a chosen session, or its own window
    /// runs into a booked slot.
    BlockedByWindow,
    /// Another session already sits on this date.
    OneSessionPerDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotOption {
    pub time: SlotTime,
    #[serde(flatten)]
    pub offer: SlotOffer,
}

/// Customer-side selection state for one booking attempt.
///
/// Works on a snapshot of the grid. Nothing here is authoritative: the
/// ledger re-validates every entry when the draft is submitted.
#[derive(Debug, Clone)]
pub struct BookingSession {
    settings: OperatingConfig,
    grid: AvailabilityGrid,
    today: NaiveDate,
    course: Option<Course>,
    selections: Vec<ScheduleEntry>,
    step: BookingStep,
}

impl BookingSession {
    pub fn new(settings: OperatingConfig, grid: AvailabilityGrid, today: NaiveDate) -> Self {
        Self {
            settings,
            grid,
            today,
            course: None,
            selections: Vec::new(),
            step: BookingStep::CourseSelection,
        }
    }

    pub fn step(&self) -> BookingStep {
        self.step
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn total_sessions(&self) -> u32 {
        self.course.as_ref().map(Course::sessions).unwrap_or(0)
    }

    fn expect_step(&self, step: BookingStep) -> Result<(), AppError> {
        if self.step != step {
            return Err(AppError::Validation(format!(
                "Not allowed in step {:?}", self.step
            )));
        }
        Ok(())
    }

    /// Fixes the session count and moves on to slot picking. Any earlier
    /// picks are dropped since they were made for a different count.
    pub fn select_course(&mut self, kind: CourseKind, sessions: Option<u32>) -> Result<&Course, AppError> {
        self.expect_step(BookingStep::CourseSelection)?;
        let course = Course::resolve(kind, sessions)?;
        if self.course.as_ref() != Some(&course) {
            self.selections.clear();
        }
        self.step = BookingStep::SchedulePicking;
        Ok(self.course.insert(course))
    }

    pub fn is_date_selectable(&self, date: NaiveDate) -> bool {
        date >= self.today && self.settings.is_operating_day(date) && self.grid.is_date_open(date)
    }

    /// Every slot of `date` the grid reports available, plus this draft's
    /// own pick on that date, each with its offer state.
    pub fn slot_options(&self, date: NaiveDate) -> Vec<SlotOption> {
        if !self.is_date_selectable(date) {
            return Vec::new();
        }
        self.grid
            .available_slots(date)
            .into_iter()
            .map(|time| SlotOption { time, offer: self.offer_for(date, time) })
            .collect()
    }

    fn offer_for(&self, date: NaiveDate, time: SlotTime) -> SlotOffer {
        let interval = self.settings.interval;
        let same_day: Vec<&ScheduleEntry> = self.selections.iter().filter(|s| s.date == date).collect();

        if let Some(entry) = same_day.iter().find(|s| s.time == time) {
            return SlotOffer::Selected { session: self.session_number(entry).unwrap_or(0) };
        }
        if same_day.iter().any(|s| windows_overlap(s.time, time, interval)) {
            return SlotOffer::BlockedByWindow;
        }
        if !same_day.is_empty() {
            return SlotOffer::OneSessionPerDay;
        }
        if self.grid.booked_in_window(date, time, interval).is_some() {
            return SlotOffer::BlockedByWindow;
        }
        SlotOffer::Offerable
    }

    /// Selects an offerable slot, or deselects an already chosen one.
    /// Returns whether the slot is selected afterwards.
    pub fn toggle(&mut self, date: NaiveDate, time: SlotTime) -> Result<bool, AppError> {
        self.expect_step(BookingStep::SchedulePicking)?;
        let entry = ScheduleEntry::new(date, time);
        if self.remove(entry) {
            return Ok(false);
        }

        if !self.is_date_selectable(date) || !self.grid.available_slots(date).contains(&time) {
            return Err(AppError::Validation(format!("{} {} cannot be selected", date, time)));
        }
        match self.offer_for(date, time) {
            SlotOffer::Offerable => {}
            SlotOffer::OneSessionPerDay => {
                return Err(AppError::Validation(format!(
                    "Only one session per day can be booked ({})", date
                )));
            }
            _ => return Err(AppError::Validation(format!("{} {} overlaps another session", date, time))),
        }
        if self.remaining() == 0 {
            return Err(AppError::Validation(format!(
                "All {} sessions are already chosen", self.total_sessions()
            )));
        }

        let pos = self.selections.binary_search(&entry).unwrap_or_else(|p| p);
        self.selections.insert(pos, entry);
        Ok(true)
    }

    pub fn remove(&mut self, entry: ScheduleEntry) -> bool {
        match self.selections.binary_search(&entry) {
            Ok(pos) => {
                self.selections.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Chosen sessions in `(date, time)` order.
    pub fn selections(&self) -> &[ScheduleEntry] {
        &self.selections
    }

    /// 1-based position of `entry` among the chosen sessions.
    pub fn session_number(&self, entry: &ScheduleEntry) -> Option<usize> {
        self.selections.binary_search(entry).ok().map(|i| i + 1)
    }

    pub fn remaining(&self) -> u32 {
        self.total_sessions().saturating_sub(self.selections.len() as u32)
    }

    pub fn proceed_to_details(&mut self) -> Result<(), AppError> {
        self.expect_step(BookingStep::SchedulePicking)?;
        if self.selections.len() as u32 != self.total_sessions() {
            return Err(AppError::Validation(format!(
                "Choose exactly {} sessions ({} chosen)",
                self.total_sessions(),
                self.selections.len()
            )));
        }
        self.step = BookingStep::CustomerDetails;
        Ok(())
    }

    pub fn back(&mut self) {
        self.step = match self.step {
            BookingStep::CustomerDetails => BookingStep::SchedulePicking,
            BookingStep::SchedulePicking | BookingStep::CourseSelection => BookingStep::CourseSelection,
            BookingStep::Submitted => BookingStep::Submitted,
        };
    }

    /// Builds the draft to hand to the ledger. The session state is left
    /// as is so a failed submission can be retried.
    pub fn draft(&self, customer: CustomerProfile) -> Result<ReservationDraft, AppError> {
        self.expect_step(BookingStep::CustomerDetails)?;
        let course = self
            .course
            .as_ref()
            .ok_or_else(|| AppError::Validation("No course selected".into()))?;
        Ok(ReservationDraft {
            course: course.kind(),
            sessions: Some(course.sessions()),
            schedules: self.selections.clone(),
            customer,
        })
    }

    pub fn mark_submitted(&mut self) {
        self.step = BookingStep::Submitted;
    }

    /// Swaps in a fresh grid snapshot and drops picks that are no longer
    /// offerable. Returns the dropped entries.
    pub fn refresh(&mut self, grid: AvailabilityGrid) -> Vec<ScheduleEntry> {
        self.grid = grid;
        let picks = std::mem::take(&mut self.selections);
        let mut dropped = Vec::new();
        for entry in picks {
            let still_open = self.is_date_selectable(entry.date)
                && self.grid.available_slots(entry.date).contains(&entry.time)
                && self.grid.booked_in_window(entry.date, entry.time, self.settings.interval).is_none();
            if still_open {
                self.selections.push(entry);
            } else {
                dropped.push(entry);
            }
        }
        if !dropped.is_empty() && self.step == BookingStep::CustomerDetails {
            self.step = BookingStep::SchedulePicking;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> SlotTime {
        s.parse().unwrap()
    }

    fn session(sessions: u32) -> BookingSession {
        let settings = OperatingConfig::default();
        let mut grid = AvailabilityGrid::new();
        for date in ["2025-03-10", "2025-03-11", "2025-03-12"] {
            grid.open_range(d(date), &settings.daily_slots());
        }
        let mut s = BookingSession::new(settings, grid, d("2025-03-05"));
        s.select_course(CourseKind::Custom, Some(sessions)).unwrap();
        s
    }

    fn offer(s: &BookingSession, date: &str, time: &str) -> Option<SlotOffer> {
        s.slot_options(d(date)).into_iter().find(|o| o.time == t(time)).map(|o| o.offer)
    }

    #[test]
    fn test_select_course_fixes_session_count() {
        let mut s = BookingSession::new(OperatingConfig::default(), AvailabilityGrid::new(), d("2025-03-05"));
        assert_eq!(s.step(), BookingStep::CourseSelection);
        let course = s.select_course(CourseKind::Perfect, None).unwrap();
        assert_eq!(course.sessions(), 5);
        assert_eq!(s.step(), BookingStep::SchedulePicking);
        assert_eq!(s.remaining(), 5);
    }

    #[test]
    fn test_selection_blocks_window_and_rest_of_day() {
        let mut s = session(2);
        assert!(s.toggle(d("2025-03-10"), t("10:00")).unwrap());

        assert_eq!(offer(&s, "2025-03-10", "10:00"), Some(SlotOffer::Selected { session: 1 }));
        assert_eq!(offer(&s, "2025-03-10", "11:00"), Some(SlotOffer::BlockedByWindow));
        assert_eq!(offer(&s, "2025-03-10", "15:00"), Some(SlotOffer::OneSessionPerDay));
        assert_eq!(offer(&s, "2025-03-10", "09:00"), Some(SlotOffer::BlockedByWindow));
        assert_eq!(offer(&s, "2025-03-10", "13:00"), Some(SlotOffer::OneSessionPerDay));
        assert_eq!(offer(&s, "2025-03-11", "10:00"), Some(SlotOffer::Offerable));

        assert!(matches!(s.toggle(d("2025-03-10"), t("15:00")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_deselect_reopens_date() {
        let mut s = session(2);
        s.toggle(d("2025-03-10"), t("10:00")).unwrap();
        assert!(!s.toggle(d("2025-03-10"), t("10:00")).unwrap());

        assert!(s.selections().is_empty());
        assert!(s
            .slot_options(d("2025-03-10"))
            .iter()
            .all(|o| o.offer == SlotOffer::Offerable));
    }

    #[test]
    fn test_session_numbers_follow_sorted_order() {
        let mut s = session(3);
        s.toggle(d("2025-03-12"), t("09:00")).unwrap();
        s.toggle(d("2025-03-10"), t("16:00")).unwrap();
        s.toggle(d("2025-03-11"), t("13:00")).unwrap();

        assert_eq!(s.session_number(&ScheduleEntry::new(d("2025-03-10"), t("16:00"))), Some(1));
        assert_eq!(s.session_number(&ScheduleEntry::new(d("2025-03-12"), t("09:00"))), Some(3));
        assert_eq!(offer(&s, "2025-03-11", "13:00"), Some(SlotOffer::Selected { session: 2 }));
    }

    #[test]
    fn test_cannot_pick_more_than_purchased() {
        let mut s = session(1);
        s.toggle(d("2025-03-10"), t("10:00")).unwrap();
        assert_eq!(s.remaining(), 0);
        assert!(matches!(s.toggle(d("2025-03-11"), t("10:00")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_unselectable_dates() {
        let s = session(1);
        // Past, weekend, and a weekday nobody opened.
        assert!(!s.is_date_selectable(d("2025-03-03")));
        assert!(!s.is_date_selectable(d("2025-03-09")));
        assert!(!s.is_date_selectable(d("2025-03-13")));
        assert!(s.slot_options(d("2025-03-13")).is_empty());
        assert!(s.is_date_selectable(d("2025-03-10")));
    }

    #[test]
    fn test_slot_running_into_booked_is_blocked() {
        let settings = OperatingConfig::default();
        let mut grid = AvailabilityGrid::new();
        grid.open_range(d("2025-03-10"), &settings.daily_slots());
        grid.reserve(d("2025-03-10"), t("12:00"), 60);
        let mut s = BookingSession::new(settings, grid, d("2025-03-05"));
        s.select_course(CourseKind::Custom, Some(1)).unwrap();

        assert_eq!(offer(&s, "2025-03-10", "11:00"), Some(SlotOffer::BlockedByWindow));
        assert_eq!(offer(&s, "2025-03-10", "12:00"), None);
        assert_eq!(offer(&s, "2025-03-10", "10:00"), Some(SlotOffer::Offerable));
        assert!(s.toggle(d("2025-03-10"), t("11:00")).is_err());
    }

    #[test]
    fn test_steps_and_draft() {
        let mut s = session(2);
        s.toggle(d("2025-03-11"), t("10:00")).unwrap();
        assert!(s.proceed_to_details().is_err());
        s.toggle(d("2025-03-10"), t("14:00")).unwrap();
        s.proceed_to_details().unwrap();
        assert_eq!(s.step(), BookingStep::CustomerDetails);

        let draft = s
            .draft(CustomerProfile { customer_name: "Park".into(), ..Default::default() })
            .unwrap();
        assert_eq!(draft.course, CourseKind::Custom);
        assert_eq!(draft.sessions, Some(2));
        assert_eq!(draft.schedules[0], ScheduleEntry::new(d("2025-03-10"), t("14:00")));

        s.back();
        assert_eq!(s.step(), BookingStep::SchedulePicking);
        assert!(s.draft(CustomerProfile::default()).is_err());
    }

    #[test]
    fn test_refresh_drops_taken_slots() {
        let mut s = session(2);
        s.toggle(d("2025-03-10"), t("10:00")).unwrap();
        s.toggle(d("2025-03-11"), t("10:00")).unwrap();
        s.proceed_to_details().unwrap();

        let settings = OperatingConfig::default();
        let mut grid = AvailabilityGrid::new();
        for date in ["2025-03-10", "2025-03-11"] {
            grid.open_range(d(date), &settings.daily_slots());
        }
        grid.reserve(d("2025-03-11"), t("10:00"), 60);

        let dropped = s.refresh(grid);
        assert_eq!(dropped, vec![ScheduleEntry::new(d("2025-03-11"), t("10:00"))]);
        assert_eq!(s.selections().len(), 1);
        assert_eq!(s.step(), BookingStep::SchedulePicking);
    }
}
