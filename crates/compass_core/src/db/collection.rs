//! Whole-file JSON array collections with corruption recovery.

use super::backup::backup_corrupt_file;
use crate::error::AppError;
use crate::normalize::RawRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A record type persisted in a [`JsonCollection`].
pub trait CollectionRecord: Serialize + DeserializeOwned {
    /// Collection label used in logs.
    const KIND: &'static str;

    /// Canonicalize a raw record before it is decoded.
    fn normalize(raw: RawRecord) -> RawRecord;
}

/// One JSON array file plus the mutex serializing its read-modify-write spans.
pub struct JsonCollection<T> {
    path: PathBuf,
    lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: CollectionRecord> JsonCollection<T> {
    /// Bind a collection to `path`, creating an empty array file if missing.
    ///
    /// # Errors
    /// Returns an error when the parent directory or file cannot be created.
    pub fn open(path: PathBuf) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            write_atomic(&path, b"[]\n")?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
            _record: PhantomData,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`; a panicked holder leaves nothing torn.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load every record, normalized.
    ///
    /// `migrate` sees each raw object before normalization and returns `true`
    /// when it changed something that must be written back. A `migrate` error
    /// aborts the load before anything is rewritten.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or rewritten, or when
    /// `migrate` fails; malformed content is recovered in place.
    pub fn load<M>(&self, migrate: M) -> Result<Vec<T>, AppError>
    where
        M: FnMut(&mut RawRecord) -> Result<bool, AppError>,
    {
        let _guard = self.guard();
        self.load_locked(migrate)
    }

    /// Run a read-modify-write span under the collection mutex.
    ///
    /// The file is rewritten only when `mutate` returns `Ok`.
    ///
    /// # Errors
    /// Propagates load, write, and `mutate` errors.
    pub fn modify<M, F, R>(&self, migrate: M, mutate: F) -> Result<R, AppError>
    where
        M: FnMut(&mut RawRecord) -> Result<bool, AppError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, AppError>,
    {
        let _guard = self.guard();
        let mut records = self.load_locked(migrate)?;
        let result = mutate(&mut records)?;
        self.write_locked(&records)?;
        Ok(result)
    }

    fn read_array(&self) -> Result<Vec<Value>, AppError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                write_atomic(&self.path, b"[]\n")?;
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(items)) => Ok(items),
            _ => {
                let backup = backup_corrupt_file(&self.path)?;
                tracing::warn!(
                    "{} collection {:?} was malformed; reset to empty (backup at {:?})",
                    T::KIND,
                    self.path,
                    backup
                );
                write_atomic(&self.path, b"[]\n")?;
                Ok(Vec::new())
            }
        }
    }

    fn load_locked<M>(&self, mut migrate: M) -> Result<Vec<T>, AppError>
    where
        M: FnMut(&mut RawRecord) -> Result<bool, AppError>,
    {
        let items = self.read_array()?;
        let mut records = Vec::with_capacity(items.len());
        let mut migrated = false;
        let mut dropped = 0usize;

        for (index, item) in items.into_iter().enumerate() {
            let Value::Object(mut raw) = item else {
                tracing::warn!("{} #{} is not an object; dropping it", T::KIND, index);
                dropped += 1;
                continue;
            };
            migrated |= migrate(&mut raw)?;
            let normalized = T::normalize(raw);
            match serde_json::from_value::<T>(Value::Object(normalized)) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!("{} #{} could not be decoded ({}); dropping it", T::KIND, index, err);
                    dropped += 1;
                }
            }
        }

        if dropped > 0 {
            let backup = backup_corrupt_file(&self.path)?;
            tracing::warn!(
                "dropped {} undecodable {} record(s); original kept at {:?}",
                dropped,
                T::KIND,
                backup
            );
        }
        if dropped > 0 || migrated {
            self.write_locked(&records)?;
        }
        Ok(records)
    }

    fn write_locked(&self, records: &[T]) -> Result<(), AppError> {
        let mut bytes = serde_json::to_vec_pretty(records)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes).map_err(|err| {
            tracing::error!("failed to write {} collection {:?}: {}", T::KIND, self.path, err);
            err
        })
    }
}

/// Replace `path` with `bytes` via a sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::StorageMessage(format!("invalid collection path {:?}", path)))?;
    let temp_path = path.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));
    fs::write(&temp_path, bytes)?;
    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }
    Ok(())
}
