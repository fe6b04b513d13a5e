pub mod postgres_kv_store;
pub mod sqlite_kv_store;
