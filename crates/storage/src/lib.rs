//! Storage layer for location analysis results
//!
//! Results live in one append-only CSV table. The [`LocationStore`] trait is the
//! interface the service layer depends on; [`CsvLocationStore`] implements it.
//!
//! # Example
//!
//! ```rust,no_run
//! use drone_locate_storage::{CsvLocationStore, LocationStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CsvLocationStore::open("location_data.csv")?;
//!     match store.latest()? {
//!         Some(record) => println!("{} at {}", record.uuid, record.coordinates),
//!         None => println!("No location data available"),
//!     }
//!     Ok(())
//! }
//! ```

use drone_locate_common::LocationRecord;
use thiserror::Error;

pub mod csv_store;

pub use csv_store::{CsvLocationStore, COLUMNS};

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<csv::Error> for StorageError {
    fn from(err: csv::Error) -> Self {
        StorageError::Csv(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Append-only table of location records.
///
/// Implementations serialize access internally so concurrent requests cannot
/// interleave or drop rows. Calls may block on file I/O.
pub trait LocationStore: Send + Sync {
    /// Add one record after every existing one
    fn append(&self, record: &LocationRecord) -> StorageResult<()>;

    /// Most recently appended record, or `None` when the table is empty or absent
    fn latest(&self) -> StorageResult<Option<LocationRecord>>;

    /// Every record in append order; empty when the table is empty or absent
    fn all(&self) -> StorageResult<Vec<LocationRecord>>;
}
