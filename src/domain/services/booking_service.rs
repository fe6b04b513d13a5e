use std::future::Future;
use std::sync::Arc;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use crate::domain::models::reservation::{Reservation, ReservationDraft};
use crate::domain::models::settings::OperatingConfig;
use crate::domain::ports::{KeyValueStore, RESERVATIONS_KEY, SETTINGS_KEY, TIME_BLOCKS_KEY};
use crate::domain::services::availability::AvailabilityGrid;
use crate::domain::services::ledger::{LedgerChange, ReservationAction, ReservationLedger};
use crate::error::AppError;

/// Everything persisted, read in one go.
#[derive(Debug, Clone, Default)]
pub struct BookingSnapshot {
    pub settings: OperatingConfig,
    pub grid: AvailabilityGrid,
    pub ledger: ReservationLedger,
}

/// Owns the read-modify-write cycle over the store. Each mutation loads the
/// records it needs, changes them in memory and writes them back under one
/// lock, with grid and ledger going out in a single `set_many` batch.
pub struct BookingService {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
    tz: Tz,
}

impl BookingService {
    pub fn new(store: Arc<dyn KeyValueStore>, tz: Tz) -> Self {
        Self { store, write_lock: Mutex::new(()), tz }
    }

    /// Current calendar day in the business timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, AppError> {
        match self.store.get(key).await? {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                error!("Stored value under '{}' is malformed: {}", key, e);
                AppError::Persistence(format!("{}: {}", key, e))
            }),
        }
    }

    fn encode<T: Serialize>(key: &str, value: &T) -> Result<Value, AppError> {
        serde_json::to_value(value).map_err(|e| AppError::InternalWithMsg(format!("encoding {}: {}", key, e)))
    }

    pub async fn settings(&self) -> Result<OperatingConfig, AppError> {
        self.load(SETTINGS_KEY).await
    }

    pub async fn time_blocks(&self) -> Result<AvailabilityGrid, AppError> {
        self.load(TIME_BLOCKS_KEY).await
    }

    pub async fn snapshot(&self) -> Result<BookingSnapshot, AppError> {
        Ok(BookingSnapshot {
            settings: self.load(SETTINGS_KEY).await?,
            grid: self.load(TIME_BLOCKS_KEY).await?,
            ledger: self.load(RESERVATIONS_KEY).await?,
        })
    }

    pub async fn save_settings(&self, settings: &OperatingConfig) -> Result<(), AppError> {
        settings.validate()?;
        let _guard = self.write_lock.lock().await;
        self.store.set(SETTINGS_KEY, &Self::encode(SETTINGS_KEY, settings)?).await?;
        info!("Operating settings saved: weekdays={:?} {}-{} every {}m",
            settings.weekdays, settings.start_time, settings.end_time, settings.interval);
        Ok(())
    }

    /// Merges a grid edited by the admin into the stored one.
    pub async fn save_time_blocks(&self, incoming: &AvailabilityGrid) -> Result<AvailabilityGrid, AppError> {
        let (grid, applied) = self.update_grid(|grid, _| grid.merge_admin_edits(incoming)).await?;
        info!("Time blocks saved ({} slots changed)", applied);
        Ok(grid)
    }

    /// Runs an admin edit against the stored grid and persists the result.
    pub async fn update_grid<F, R>(&self, edit: F) -> Result<(AvailabilityGrid, R), AppError>
    where
        F: FnOnce(&mut AvailabilityGrid, &OperatingConfig) -> R,
    {
        let _guard = self.write_lock.lock().await;
        let settings: OperatingConfig = self.load(SETTINGS_KEY).await?;
        let mut grid: AvailabilityGrid = self.load(TIME_BLOCKS_KEY).await?;

        let outcome = edit(&mut grid, &settings);
        self.store.set(TIME_BLOCKS_KEY, &Self::encode(TIME_BLOCKS_KEY, &grid)?).await?;
        Ok((grid, outcome))
    }

    /// Validates a customer draft against the stored grid and records it as
    /// pending. The grid itself is not written.
    pub async fn create_reservation(&self, draft: ReservationDraft) -> Result<(Reservation, AvailabilityGrid), AppError> {
        let today = self.today();
        let _guard = self.write_lock.lock().await;
        let BookingSnapshot { settings, grid, mut ledger } = self.snapshot().await?;

        let reservation = ledger.create(draft, &grid, &settings, today).map_err(|e| {
            warn!("Reservation rejected: {}", e);
            e
        })?;

        self.store
            .set(RESERVATIONS_KEY, &Self::encode(RESERVATIONS_KEY, &ledger)?)
            .await?;
        info!("Reservation created: {} ({} sessions)", reservation.id, reservation.schedules.len());
        Ok((reservation, grid))
    }

    pub async fn update_reservation(
        &self,
        id: &str,
        action: ReservationAction,
    ) -> Result<(LedgerChange, AvailabilityGrid), AppError> {
        let _guard = self.write_lock.lock().await;
        let BookingSnapshot { settings, mut grid, mut ledger } = self.snapshot().await?;

        let change = ledger.apply(id, action, &mut grid, settings.interval)?;

        if change.is_mutation() {
            self.store
                .set_many(&[
                    (TIME_BLOCKS_KEY, Self::encode(TIME_BLOCKS_KEY, &grid)?),
                    (RESERVATIONS_KEY, Self::encode(RESERVATIONS_KEY, &ledger)?),
                ])
                .await?;
        }
        Ok((change, grid))
    }

    /// Runs `deliver` for a stored reservation and records the email as sent.
    /// The lock is held across delivery, so the reservation cannot be deleted
    /// or edited between the lookup and the flag write. A failed delivery
    /// leaves the flag untouched.
    pub async fn deliver_and_mark_email_sent<F, Fut>(&self, id: &str, deliver: F) -> Result<Reservation, AppError>
    where
        F: FnOnce(Reservation) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let _guard = self.write_lock.lock().await;
        let mut ledger: ReservationLedger = self.load(RESERVATIONS_KEY).await?;
        let reservation = ledger
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))?;

        deliver(reservation).await?;

        let updated = ledger.mark_email_sent(id)?;
        self.store
            .set(RESERVATIONS_KEY, &Self::encode(RESERVATIONS_KEY, &ledger)?)
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use async_trait::async_trait;
    use chrono::{Datelike, Weekday};
    use crate::domain::models::course::CourseKind;
    use crate::domain::models::reservation::{CustomerProfile, ReservationStatus, ScheduleEntry};
    use crate::domain::models::slot::{SlotStatus, SlotTime};

    #[derive(Default)]
    struct MemoryStore {
        data: std::sync::Mutex<HashMap<String, Value>>,
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &Value) -> Result<(), AppError> {
            self.data.lock().unwrap().insert(key.to_string(), value.clone());
            Ok(())
        }

        async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), AppError> {
            let mut data = self.data.lock().unwrap();
            for (key, value) in entries {
                data.insert(key.to_string(), value.clone());
            }
            Ok(())
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl KeyValueStore for UnreachableStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>, AppError> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn set(&self, _key: &str, _value: &Value) -> Result<(), AppError> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn set_many(&self, _entries: &[(&str, Value)]) -> Result<(), AppError> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    fn t(s: &str) -> SlotTime {
        s.parse().unwrap()
    }

    fn service() -> (BookingService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (BookingService::new(store.clone(), chrono_tz::Asia::Seoul), store)
    }

    /// First Monday at least a week ahead, so "today" never gets in the way.
    fn next_monday(service: &BookingService) -> NaiveDate {
        let mut day = service.today() + chrono::Duration::days(7);
        while day.weekday() != Weekday::Mon {
            day += chrono::Duration::days(1);
        }
        day
    }

    fn draft(date: NaiveDate, time: &str) -> ReservationDraft {
        ReservationDraft {
            course: CourseKind::Custom,
            sessions: Some(1),
            schedules: vec![ScheduleEntry::new(date, t(time))],
            customer: CustomerProfile { customer_name: "Choi".into(), ..Default::default() },
        }
    }

    #[tokio::test]
    async fn test_empty_store_reads_defaults() {
        let (service, _) = service();
        let snapshot = service.snapshot().await.unwrap();
        assert_eq!(snapshot.settings, OperatingConfig::default());
        assert_eq!(snapshot.grid, AvailabilityGrid::new());
        assert!(snapshot.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_value_is_persistence_error() {
        let (service, store) = service();
        store.set(TIME_BLOCKS_KEY, &serde_json::json!({"2025-03-10": {"10:00": "maybe"}})).await.unwrap();
        assert!(matches!(service.time_blocks().await, Err(AppError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_invalid_settings_are_not_stored() {
        let (service, store) = service();
        let bad = OperatingConfig { weekdays: vec![], ..Default::default() };
        assert!(matches!(service.save_settings(&bad).await, Err(AppError::Validation(_))));
        assert!(store.get(SETTINGS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_lifecycle_persists_grid_and_ledger_together() {
        let (service, store) = service();
        let monday = next_monday(&service);

        service
            .update_grid(|grid, settings| grid.open_range(monday, &settings.daily_slots()))
            .await
            .unwrap();

        let (reservation, grid) = service.create_reservation(draft(monday, "10:00")).await.unwrap();
        assert_eq!(grid.status(monday, t("10:00")), SlotStatus::Available);

        let (change, grid) = service
            .update_reservation(&reservation.id, ReservationAction::Confirm)
            .await
            .unwrap();
        assert_eq!(change.reservation().status, ReservationStatus::Confirmed);
        assert_eq!(grid.status(monday, t("11:00")), SlotStatus::Booked);

        let stored_grid: AvailabilityGrid =
            serde_json::from_value(store.get(TIME_BLOCKS_KEY).await.unwrap().unwrap()).unwrap();
        let stored_ledger: ReservationLedger =
            serde_json::from_value(store.get(RESERVATIONS_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(stored_grid, grid);
        assert_eq!(stored_ledger.get(&reservation.id).unwrap().status, ReservationStatus::Confirmed);

        // A second customer can no longer take the confirmed window.
        let late = service.create_reservation(draft(monday, "11:00")).await;
        assert!(matches!(late, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_save_time_blocks_cannot_clear_booked() {
        let (service, _) = service();
        let monday = next_monday(&service);
        service
            .update_grid(|grid, settings| grid.open_range(monday, &settings.daily_slots()))
            .await
            .unwrap();
        let (reservation, _) = service.create_reservation(draft(monday, "14:00")).await.unwrap();
        service.update_reservation(&reservation.id, ReservationAction::Confirm).await.unwrap();

        let mut edited = AvailabilityGrid::new();
        edited.set_status(monday, t("14:00"), SlotStatus::Unavailable);
        edited.set_status(monday, t("09:00"), SlotStatus::Unavailable);
        let grid = service.save_time_blocks(&edited).await.unwrap();

        assert_eq!(grid.status(monday, t("14:00")), SlotStatus::Booked);
        assert_eq!(grid.status(monday, t("09:00")), SlotStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_fast() {
        let service = BookingService::new(Arc::new(UnreachableStore), chrono_tz::Asia::Seoul);
        assert!(matches!(service.snapshot().await, Err(AppError::Database(_))));
        let result = service.update_reservation("YS20250310ABCD", ReservationAction::Confirm).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_concurrent_confirms_do_not_double_book() {
        let (service, _) = service();
        let service = Arc::new(service);
        let monday = next_monday(&service);
        service
            .update_grid(|grid, settings| grid.open_range(monday, &settings.daily_slots()))
            .await
            .unwrap();

        let (a, _) = service.create_reservation(draft(monday, "10:00")).await.unwrap();
        let (b, _) = service.create_reservation(draft(monday, "11:00")).await.unwrap();

        let first = tokio::spawn({
            let service = service.clone();
            async move { service.update_reservation(&a.id, ReservationAction::Confirm).await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.update_reservation(&b.id, ReservationAction::Confirm).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results.iter().filter(|r| matches!(r, Err(AppError::Conflict(_)))).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_email_delivery_marks_flag_only_on_success() {
        let (service, _) = service();
        let monday = next_monday(&service);
        service
            .update_grid(|grid, settings| grid.open_range(monday, &settings.daily_slots()))
            .await
            .unwrap();
        let (reservation, _) = service.create_reservation(draft(monday, "10:00")).await.unwrap();

        let failed = service
            .deliver_and_mark_email_sent(&reservation.id, |_| async {
                Err(AppError::Notification("mail gateway down".into()))
            })
            .await;
        assert!(matches!(failed, Err(AppError::Notification(_))));
        assert!(!service.snapshot().await.unwrap().ledger.get(&reservation.id).unwrap().email_sent);

        let sent = service
            .deliver_and_mark_email_sent(&reservation.id, |r| async move {
                assert!(!r.email_sent);
                Ok(())
            })
            .await
            .unwrap();
        assert!(sent.email_sent);
        assert!(service.snapshot().await.unwrap().ledger.get(&reservation.id).unwrap().email_sent);
    }

    #[tokio::test]
    async fn test_email_to_unknown_reservation_is_never_delivered() {
        let (service, _) = service();
        let delivered = std::sync::atomic::AtomicBool::new(false);
        let result = service
            .deliver_and_mark_email_sent("YS20250310ZZZZ", |_| async {
                delivered.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(!delivered.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_delete_waits_for_email_in_flight() {
        let (service, _) = service();
        let service = Arc::new(service);
        let monday = next_monday(&service);
        service
            .update_grid(|grid, settings| grid.open_range(monday, &settings.daily_slots()))
            .await
            .unwrap();
        let (reservation, _) = service.create_reservation(draft(monday, "10:00")).await.unwrap();

        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let email = tokio::spawn({
            let service = service.clone();
            let id = reservation.id.clone();
            async move {
                service
                    .deliver_and_mark_email_sent(&id, |_| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok(())
                    })
                    .await
            }
        });
        started_rx.await.unwrap();

        let delete = tokio::spawn({
            let service = service.clone();
            let id = reservation.id.clone();
            async move { service.update_reservation(&id, ReservationAction::Delete).await }
        });
        tokio::task::yield_now().await;
        assert!(!delete.is_finished());

        release_tx.send(()).unwrap();
        assert!(email.await.unwrap().unwrap().email_sent);
        delete.await.unwrap().unwrap();
        assert!(service.snapshot().await.unwrap().ledger.get(&reservation.id).is_none());
    }
}
