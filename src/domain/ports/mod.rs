use async_trait::async_trait;
use serde_json::Value;
use crate::domain::models::message::{Channel, OutboundMessage};
use crate::error::AppError;

pub const SETTINGS_KEY: &str = "settings";
pub const TIME_BLOCKS_KEY: &str = "time_blocks";
pub const RESERVATIONS_KEY: &str = "reservations";

/// Request/response key-value persistence. No cross-call transactions:
/// `set_many` is the only way to write several records as one unit.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, AppError>;
    async fn set(&self, key: &str, value: &Value) -> Result<(), AppError>;
    async fn set_many(&self, entries: &[(&str, Value)]) -> Result<(), AppError>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, channel: Channel, recipient: &str, message: &OutboundMessage) -> Result<(), AppError>;
}
