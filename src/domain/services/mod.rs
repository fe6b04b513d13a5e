pub mod admin_calendar;
pub mod availability;
pub mod booking_service;
pub mod booking_session;
pub mod ledger;
pub mod notification;
pub mod slot_clock;
