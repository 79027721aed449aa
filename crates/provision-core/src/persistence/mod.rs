use crate::models::{CoreError, PinRecord};

pub type PersistenceResult<T> = Result<T, CoreError>;

pub trait MigrationStore: Send + Sync {
    fn current_version(&self) -> PersistenceResult<i64>;

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()>;
}

/// Pins keyed by case-insensitive package id.
pub trait PinStore: Send + Sync {
    fn upsert_pin(&self, pin: &PinRecord) -> PersistenceResult<()>;

    fn remove_pin(&self, package_id: &str) -> PersistenceResult<()>;

    fn get_pin(&self, package_id: &str) -> PersistenceResult<Option<PinRecord>>;

    fn list_pins(&self) -> PersistenceResult<Vec<PinRecord>>;
}
