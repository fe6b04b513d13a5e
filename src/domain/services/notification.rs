use std::sync::Arc;
use serde_json::json;
use tera::{Context, Tera};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use crate::domain::models::message::{Channel, OutboundMessage};
use crate::domain::models::reservation::{Reservation, ScheduleEntry};
use crate::domain::ports::NotificationService;
use crate::error::AppError;

const BOOKING_RECEIVED: &str = "booking_received.txt";
const CONFIRMED_CUSTOMER: &str = "confirmed_customer.txt";
const CONFIRMED_ADMIN: &str = "confirmed_admin.txt";
const CONFIRMED_STAFF: &str = "confirmed_staff.txt";
const INTAKE_EMAIL: &str = "intake_email.html";

const INTAKE_SUBJECT: &str = "[Consulting] Pre-session questionnaire";

pub fn default_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (BOOKING_RECEIVED, include_str!("../../templates/booking_received.txt")),
        (CONFIRMED_CUSTOMER, include_str!("../../templates/confirmed_customer.txt")),
        (CONFIRMED_ADMIN, include_str!("../../templates/confirmed_admin.txt")),
        (CONFIRMED_STAFF, include_str!("../../templates/confirmed_staff.txt")),
        (INTAKE_EMAIL, include_str!("../../templates/intake_email.html")),
    ])
    .map_err(|e| AppError::InternalWithMsg(format!("Failed to load message templates: {}", e)))?;
    Ok(tera)
}

/// `"1. 2025-03-10 (Mon) 10:00"`, numbered by the sorted order.
pub fn schedule_lines(schedules: &[ScheduleEntry]) -> Vec<String> {
    let mut sorted = schedules.to_vec();
    sorted.sort();
    sorted
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{}. {}", i + 1, format_entry(entry)))
        .collect()
}

fn format_entry(entry: &ScheduleEntry) -> String {
    format!("{} ({}) {}", entry.date.format("%Y-%m-%d"), entry.date.format("%a"), entry.time)
}

/// `950000` -> `"950,000 KRW"`
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{} KRW", grouped)
}

fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

fn message_context(reservation: &Reservation) -> Result<Context, AppError> {
    let c = &reservation.customer;
    let receipt = if c.receipt {
        format!("Requested ({})", or_dash(&c.receipt_number))
    } else {
        "Not requested".to_string()
    };
    let first_session = reservation
        .schedules
        .iter()
        .min()
        .map(format_entry)
        .unwrap_or_else(|| "-".to_string());

    Context::from_value(json!({
        "customer_name": or_dash(&c.customer_name),
        "customer_phone": or_dash(&c.customer_phone),
        "customer_email": or_dash(&c.customer_email),
        "customer_company": or_dash(&c.customer_company),
        "customer_position": or_dash(&c.customer_position),
        "customer_interview_date": or_dash(&c.customer_interview_date),
        "consult_method": or_dash(&c.consult_method),
        "interview_types": or_dash(&c.interview_types.join(", ")),
        "receipt": receipt,
        "course_name": reservation.course_name,
        "price": format_price(reservation.price),
        "schedule_lines": schedule_lines(&reservation.schedules),
        "first_session": first_session,
    }))
    .map_err(|e| AppError::InternalWithMsg(format!("Failed to build message context: {}", e)))
}

/// Fire-and-forget side channel for ledger changes. Deliveries run on
/// their own tasks; a failed channel is logged and never reaches the
/// caller.
pub struct NotificationDispatcher {
    service: Arc<dyn NotificationService>,
    templates: Tera,
    admin_phone: String,
    staff_phone: Option<String>,
}

impl NotificationDispatcher {
    pub fn new(
        service: Arc<dyn NotificationService>,
        templates: Tera,
        admin_phone: String,
        staff_phone: Option<String>,
    ) -> Self {
        Self { service, templates, admin_phone, staff_phone }
    }

    fn render(&self, template: &str, reservation: &Reservation) -> Result<String, AppError> {
        let context = message_context(reservation)?;
        self.templates
            .render(template, &context)
            .map_err(|e| AppError::InternalWithMsg(format!("Failed to render {}: {}", template, e)))
    }

    /// Admin notice for a new pending reservation: chat first, SMS if the
    /// chat channel fails.
    pub fn booking_received(&self, reservation: &Reservation) -> Option<JoinHandle<()>> {
        let body = match self.render(BOOKING_RECEIVED, reservation) {
            Ok(body) => body,
            Err(e) => {
                error!("Skipping booking notice for {}: {}", reservation.id, e);
                return None;
            }
        };
        let service = self.service.clone();
        let admin = self.admin_phone.clone();
        let span = info_span!("notification", kind = "booking_received", reservation_id = %reservation.id);

        Some(tokio::spawn(
            async move {
                let message = OutboundMessage::text(body);
                match service.send(Channel::Chat, &admin, &message).await {
                    Ok(()) => info!("Admin notified over chat"),
                    Err(e) => {
                        warn!("Chat notice failed, falling back to SMS: {}", e);
                        if let Err(e) = service.send(Channel::Sms, &admin, &message).await {
                            error!("SMS fallback failed: {}", e);
                        }
                    }
                }
            }
            .instrument(span),
        ))
    }

    /// SMS to the customer, the admin and, when configured, the staff
    /// phone. Each delivery is independent of the others.
    pub fn reservation_confirmed(&self, reservation: &Reservation) -> Option<JoinHandle<()>> {
        let mut deliveries = Vec::new();
        let customer_phone = normalize_phone(&reservation.customer.customer_phone);
        if customer_phone.is_empty() {
            warn!("Reservation {} has no customer phone; skipping customer SMS", reservation.id);
        } else {
            deliveries.push((customer_phone, CONFIRMED_CUSTOMER));
        }
        deliveries.push((self.admin_phone.clone(), CONFIRMED_ADMIN));
        if let Some(staff) = &self.staff_phone {
            deliveries.push((staff.clone(), CONFIRMED_STAFF));
        }

        let mut messages = Vec::with_capacity(deliveries.len());
        for (recipient, template) in deliveries {
            match self.render(template, reservation) {
                Ok(body) => messages.push((recipient, template, OutboundMessage::text(body))),
                Err(e) => error!("Skipping {} for {}: {}", template, reservation.id, e),
            }
        }
        if messages.is_empty() {
            return None;
        }

        let service = self.service.clone();
        let span = info_span!("notification", kind = "reservation_confirmed", reservation_id = %reservation.id);
        Some(tokio::spawn(
            async move {
                for (recipient, template, message) in messages {
                    match service.send(Channel::Sms, &recipient, &message).await {
                        Ok(()) => info!("Sent {}", template),
                        Err(e) => warn!("Failed to send {}: {}", template, e),
                    }
                }
            }
            .instrument(span),
        ))
    }

    /// Sends the intake questionnaire email. Unlike the notices above this
    /// is the primary operation of its request, so failures are returned.
    pub async fn send_intake_email(&self, reservation: &Reservation) -> Result<(), AppError> {
        let recipient = reservation.customer.customer_email.trim();
        if recipient.is_empty() {
            return Err(AppError::Validation(format!(
                "Reservation {} has no customer email", reservation.id
            )));
        }
        let body = self.render(INTAKE_EMAIL, reservation)?;
        let message = OutboundMessage::email(INTAKE_SUBJECT, body);

        self.service
            .send(Channel::Email, recipient, &message)
            .instrument(info_span!("notification", kind = "intake_email", reservation_id = %reservation.id))
            .await
            .map_err(|e| match e {
                AppError::Notification(msg) => AppError::Notification(msg),
                other => AppError::Notification(other.to_string()),
            })
    }
}
