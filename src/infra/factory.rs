use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use chrono_tz::Tz;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::ports::{KeyValueStore, NotificationService};
use crate::domain::services::booking_service::BookingService;
use crate::domain::services::notification::{default_templates, NotificationDispatcher};
use crate::infra::messaging::http_messaging_service::HttpMessagingService;
use crate::infra::repositories::{
    postgres_kv_store::PostgresKvStore, sqlite_kv_store::SqliteKvStore,
};

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    let store: Arc<dyn KeyValueStore> =
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            info!("Initializing PostgreSQL connection...");

            let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
            opts = opts.log_statements(LevelFilter::Debug)
                .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect_with(opts)
                .await
                .expect("Failed to connect to Postgres");

            run_postgres_migrations(&pool).await;
            Arc::new(PostgresKvStore::new(pool))
        } else {
            info!("Initializing SQLite connection with WAL Mode...");

            let opts = SqliteConnectOptions::from_str(database_url)
                .expect("Invalid SQLite connection string")
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .log_statements(LevelFilter::Debug)
                .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(opts)
                .await
                .expect("Failed to connect to SQLite");

            run_sqlite_migrations(&pool).await;
            Arc::new(SqliteKvStore::new(pool))
        };

    let messaging: Arc<dyn NotificationService> = Arc::new(HttpMessagingService::from_config(config));
    build_state(config, store, messaging)
}

/// Wires the services around an already constructed store and messaging
/// gateway.
pub fn build_state(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    messaging: Arc<dyn NotificationService>,
) -> AppState {
    let tz = Tz::from_str(&config.timezone).expect("BOOKING_TIMEZONE must be an IANA zone name");
    let templates = default_templates().expect("Failed to load message templates");

    AppState {
        booking_service: Arc::new(BookingService::new(store, tz)),
        notifier: Arc::new(NotificationDispatcher::new(
            messaging,
            templates,
            config.admin_phone.clone(),
            config.staff_phone.clone(),
        )),
    }
}

async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
