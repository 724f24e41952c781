//! CSV-backed location store

use drone_locate_common::LocationRecord;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::{LocationStore, StorageError, StorageResult};

/// Header row of the results table, in column order
pub const COLUMNS: [&str; 7] = [
    "UUID",
    "Video Path",
    "Image Path",
    "Location Description",
    "Coordinates",
    "Confidence Score",
    "Timestamp",
];

/// Append-only CSV table guarded by a single in-process lock
#[derive(Debug)]
pub struct CsvLocationStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvLocationStore {
    /// Open the table at `path`, creating it (and its parent directory) with a
    /// header row if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self {
            path,
            lock: Mutex::new(()),
        };
        if store.is_empty_file()? {
            let mut writer = csv::Writer::from_path(&store.path)?;
            writer.write_record(COLUMNS)?;
            writer.flush()?;
            info!("Created location table at {}", store.path.display());
        }
        Ok(store)
    }

    /// Path of the backing CSV file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> StorageResult<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// True when the file is absent or has no bytes (not even a header)
    fn is_empty_file(&self) -> StorageResult<bool> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    fn read_all(&self) -> StorageResult<Vec<LocationRecord>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::Reader::from_reader(file);
        let records = reader
            .deserialize()
            .collect::<Result<Vec<LocationRecord>, csv::Error>>()?;
        Ok(records)
    }
}

impl LocationStore for CsvLocationStore {
    fn append(&self, record: &LocationRecord) -> StorageResult<()> {
        let _guard = self.guard()?;

        let needs_header = self.is_empty_file()?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        debug!("Appended record {} to {}", record.uuid, self.path.display());
        Ok(())
    }

    fn latest(&self) -> StorageResult<Option<LocationRecord>> {
        let _guard = self.guard()?;
        Ok(self.read_all()?.pop())
    }

    fn all(&self) -> StorageResult<Vec<LocationRecord>> {
        let _guard = self.guard()?;
        self.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("location_data.csv");
        CsvLocationStore::open(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.trim_end(),
            "UUID,Video Path,Image Path,Location Description,Coordinates,Confidence Score,Timestamp"
        );
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("results.csv");
        let store = CsvLocationStore::open(&path).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_open_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("location_data.csv");
        let existing = "UUID,Video Path,Image Path,Location Description,Coordinates,Confidence Score,Timestamp\n\
                        abc,v.mp4,i.png,desc,\"35.0,62.0\",8,2024-01-02 03:04:05\n";
        std::fs::write(&path, existing).unwrap();

        let store = CsvLocationStore::open(&path).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].uuid, "abc");
        assert_eq!(all[0].coordinates.to_string(), "35,62");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), existing);
    }
}
