use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// IANA zone used to decide what "today" is for past-date checks.
    pub timezone: String,
    pub messaging_service_url: String,
    pub messaging_service_token: String,
    pub chat_service_url: Option<String>,
    pub chat_template_id: Option<String>,
    pub sms_sender: String,
    pub admin_phone: String,
    pub staff_phone: Option<String>,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub mail_from: String,
    pub mail_reply_to: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            timezone: env::var("BOOKING_TIMEZONE").unwrap_or_else(|_| "Asia/Seoul".to_string()),
            messaging_service_url: env::var("MESSAGING_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/sms".to_string()),
            messaging_service_token: env::var("MESSAGING_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            chat_service_url: optional("CHAT_SERVICE_URL"),
            chat_template_id: optional("CHAT_TEMPLATE_ID"),
            sms_sender: env::var("SMS_SENDER").expect("SMS_SENDER must be set"),
            admin_phone: env::var("ADMIN_PHONE").expect("ADMIN_PHONE must be set"),
            staff_phone: optional("STAFF_PHONE"),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            mail_from: env::var("MAIL_FROM").unwrap_or_else(|_| "bookings@localhost".to_string()),
            mail_reply_to: env::var("MAIL_REPLY_TO").unwrap_or_else(|_| "bookings@localhost".to_string()),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
