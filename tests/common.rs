use consult_booking::{
    api::router::create_router,
    config::Config,
    domain::models::message::{Channel, OutboundMessage},
    domain::ports::NotificationService,
    error::AppError,
    infra::factory::build_state,
    infra::repositories::sqlite_kv_store::SqliteKvStore,
    state::AppState,
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    Router,
};
use std::str::FromStr;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc, Weekday};
use tower::ServiceExt;
use serde_json::Value;

pub const ADMIN_PHONE: &str = "01000000000";
pub const STAFF_PHONE: &str = "01099990000";

#[derive(Default)]
pub struct RecordingNotificationService {
    pub sent: Mutex<Vec<(Channel, String, OutboundMessage)>>,
    pub failing: Mutex<Vec<Channel>>,
}

#[async_trait]
impl NotificationService for RecordingNotificationService {
    async fn send(&self, channel: Channel, recipient: &str, message: &OutboundMessage) -> Result<(), AppError> {
        if self.failing.lock().unwrap().contains(&channel) {
            return Err(AppError::Notification(format!("{:?} gateway unavailable", channel)));
        }
        self.sent.lock().unwrap().push((channel, recipient.to_string(), message.clone()));
        Ok(())
    }
}

#[allow(dead_code)]
impl RecordingNotificationService {
    pub fn fail(&self, channel: Channel) {
        self.failing.lock().unwrap().push(channel);
    }

    pub fn sent(&self) -> Vec<(Channel, String, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub messages: Arc<RecordingNotificationService>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            timezone: "Asia/Seoul".to_string(),
            messaging_service_url: "http://localhost".to_string(),
            messaging_service_token: "token".to_string(),
            chat_service_url: None,
            chat_template_id: None,
            sms_sender: "0212345678".to_string(),
            admin_phone: ADMIN_PHONE.to_string(),
            staff_phone: Some(STAFF_PHONE.to_string()),
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            mail_from: "bookings@example.com".to_string(),
            mail_reply_to: "bookings@example.com".to_string(),
        };

        let messages = Arc::new(RecordingNotificationService::default());
        let state = Arc::new(build_state(
            &config,
            Arc::new(SqliteKvStore::new(pool.clone())),
            messages.clone(),
        ));

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            messages,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        ).await.unwrap();
        read(response).await
    }

    pub async fn post(&self, uri: &str, payload: Value) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap()
        ).await.unwrap();
        read(response).await
    }

    /// Waits for spawned notification tasks to deliver `count` messages.
    pub async fn wait_for_messages(&self, count: usize) -> Vec<(Channel, String, OutboundMessage)> {
        for _ in 0..50 {
            let sent = self.messages.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.messages.sent()
    }
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// A Monday at least a week ahead in the business timezone.
#[allow(dead_code)]
pub fn future_monday() -> NaiveDate {
    let mut day = Utc::now().with_timezone(&chrono_tz::Asia::Seoul).date_naive() + chrono::Duration::days(7);
    while day.weekday() != Weekday::Mon {
        day = day.succ_opt().unwrap();
    }
    day
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
    }
}
