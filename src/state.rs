use std::sync::Arc;
use crate::domain::services::booking_service::BookingService;
use crate::domain::services::notification::NotificationDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub booking_service: Arc<BookingService>,
    pub notifier: Arc<NotificationDispatcher>,
}
