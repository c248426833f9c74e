use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use fathr_core::{CollectionError, MeasurementCollection, MeasurementRecord, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Stable identifier handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self, StorageError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StorageError::InvalidInput(
                "user id cannot be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = StorageError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<UserId> for String {
    fn from(user: UserId) -> Self {
        user.0
    }
}

/// The persistence collaborator: an eventually consistent list of records
/// per user. Scoring never calls it; callers hand scorers a snapshot.
pub trait RecordStore: Send {
    fn append(&mut self, user: &UserId, record: MeasurementRecord) -> Result<(), StorageError>;
    fn delete(&mut self, user: &UserId, id: &RecordId) -> Result<bool, StorageError>;
    /// Drops every record the user owns and returns how many were removed.
    fn delete_all_for_user(&mut self, user: &UserId) -> Result<usize, StorageError>;
    /// Newest first.
    fn list_for_user(&self, user: &UserId) -> Vec<MeasurementRecord>;
    /// Oldest first.
    fn load_collection(&self, user: &UserId) -> MeasurementCollection;
    fn stats(&self) -> serde_json::Value;
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Persisted {
    users: BTreeMap<UserId, MeasurementCollection>,
}

/// JSON document store, rewritten in full after each mutation. The in-memory
/// map only changes once the new document is on disk.
pub struct PersistentRecordStore {
    path: PathBuf,
    users: BTreeMap<UserId, MeasurementCollection>,
}

impl PersistentRecordStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        if !path.exists() {
            let persisted = Persisted::default();
            let bytes = serde_json::to_vec_pretty(&persisted)?;
            fs::write(&path, bytes)?;
        }

        let bytes = fs::read(&path)?;
        let persisted: Persisted = serde_json::from_slice(&bytes)?;
        let mut seen = HashSet::new();
        for record in persisted.users.values().flat_map(MeasurementCollection::records) {
            if !seen.insert(record.id) {
                return Err(CollectionError::DuplicateId(record.id).into());
            }
        }
        let total: usize = persisted.users.values().map(MeasurementCollection::len).sum();
        info!(
            path = %path.display(),
            users = persisted.users.len(),
            records = total,
            "opened record store"
        );

        Ok(Self {
            path,
            users: persisted.users,
        })
    }

    pub fn append(&mut self, user: &UserId, record: MeasurementRecord) -> Result<(), StorageError> {
        if self.users.values().any(|c| c.get(&record.id).is_some()) {
            return Err(CollectionError::DuplicateId(record.id).into());
        }

        let id = record.id;
        let mut next = self.users.clone();
        next.entry(user.clone()).or_default().push(record)?;
        self.commit(next)?;
        debug!(user = %user, record = %id, "appended record");
        Ok(())
    }

    pub fn delete(&mut self, user: &UserId, id: &RecordId) -> Result<bool, StorageError> {
        if self.users.get(user).and_then(|c| c.get(id)).is_none() {
            return Ok(false);
        }

        let mut next = self.users.clone();
        if let Some(collection) = next.get_mut(user) {
            collection.remove(id);
        }
        self.commit(next)?;
        debug!(user = %user, record = %id, "deleted record");
        Ok(true)
    }

    pub fn delete_all_for_user(&mut self, user: &UserId) -> Result<usize, StorageError> {
        let count = self.users.get(user).map_or(0, MeasurementCollection::len);
        if count == 0 {
            return Ok(0);
        }

        let mut next = self.users.clone();
        next.remove(user);
        self.commit(next)?;
        info!(user = %user, records = count, "deleted all records for user");
        Ok(count)
    }

    pub fn list_for_user(&self, user: &UserId) -> Vec<MeasurementRecord> {
        self.users
            .get(user)
            .map(MeasurementCollection::newest_first)
            .unwrap_or_default()
    }

    pub fn load_collection(&self, user: &UserId) -> MeasurementCollection {
        self.users.get(user).cloned().unwrap_or_default()
    }

    pub fn stats(&self) -> serde_json::Value {
        let records: usize = self.users.values().map(MeasurementCollection::len).sum();
        serde_json::json!({
            "users": self.users.len(),
            "records": records,
            "path": self.path,
        })
    }

    fn commit(&mut self, next: BTreeMap<UserId, MeasurementCollection>) -> Result<(), StorageError> {
        let persisted = PersistedRef { users: &next };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        fs::write(&self.path, bytes)?;
        self.users = next;
        Ok(())
    }
}

#[derive(Serialize)]
struct PersistedRef<'a> {
    users: &'a BTreeMap<UserId, MeasurementCollection>,
}

impl RecordStore for PersistentRecordStore {
    fn append(&mut self, user: &UserId, record: MeasurementRecord) -> Result<(), StorageError> {
        Self::append(self, user, record)
    }

    fn delete(&mut self, user: &UserId, id: &RecordId) -> Result<bool, StorageError> {
        Self::delete(self, user, id)
    }

    fn delete_all_for_user(&mut self, user: &UserId) -> Result<usize, StorageError> {
        Self::delete_all_for_user(self, user)
    }

    fn list_for_user(&self, user: &UserId) -> Vec<MeasurementRecord> {
        Self::list_for_user(self, user)
    }

    fn load_collection(&self, user: &UserId) -> MeasurementCollection {
        Self::load_collection(self, user)
    }

    fn stats(&self) -> serde_json::Value {
        Self::stats(self)
    }
}
