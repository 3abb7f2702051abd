mod schema;
mod sqlite;

pub use schema::{AVAILABILITY_QUERY, CURRENT_SCHEMA_VERSION};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::*;

/// Looks up candidate sales managers.
///
/// Implementations may match products loosely (any one requested product is
/// enough); callers must still check that every requested product is covered.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn find_by_criteria(
        &self,
        language: &str,
        products: &[String],
        rating: &str,
    ) -> Result<Vec<SalesManager>, StoreError>;
}

/// Slot calendar for sales managers.
#[async_trait]
pub trait SlotLedger: Send + Sync {
    /// Every slot, booked or not, of the given managers starting on `date` (UTC).
    async fn find_all_slots(&self, date: NaiveDate, manager_ids: &[i64]) -> Result<Vec<Slot>, StoreError>;

    /// The whole availability computation pushed into the store.
    async fn find_availability_from_db(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Vec<AvailabilityEntry>, StoreError>;
}

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "sqlite: {e}"),
            StoreError::Io(e) => write!(f, "io: {e}"),
            StoreError::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            StoreError::Io(e) => Some(e),
            StoreError::Unavailable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}
