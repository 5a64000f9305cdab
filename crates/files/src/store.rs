//! JSON-file storage service implementation.
//!
//! One JSON array file per collection under a single data directory, matching
//! the layout written by earlier deployments:
//!
//! ```text
//! <data_dir>/
//!   patients.json
//!   doctors.json
//!   appointments.json
//!   medical_records.json
//!   prescriptions.json
//!   bills.json
//!   inventory.json
//!   notifications.json
//! ```
//!
//! Writes are whole-file truncate-and-rewrite of the collection, performed
//! synchronously inside the core's critical section. Entities are upserted
//! by their key field (`id`, `billId`, `itemName`, ...), so a repeated
//! persist of the same entity overwrites it in place. Failures propagate to
//! the core, which rolls its in-memory mutation back.

use chrono::{DateTime, Utc};
use clinic_core::{EntityKind, Notify, Persist, PersistError, RecordKey, StoreSnapshot};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::FilesError;

const NOTIFICATIONS_COLLECTION: &str = "notifications";

/// A recorded low-stock notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "itemName")]
    pub item_name: String,
    pub message: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// JSON-file implementation of the core's persistence and notification
/// collaborators.
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    /// Creates a store rooted at `data_dir`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `FilesError::CreateDir` if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, FilesError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|source| FilesError::CreateDir {
            path: data_dir.clone(),
            source,
        })?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.json"))
    }

    /// Reads a collection file as raw JSON values. A missing or empty file
    /// is an empty collection, matching first-run behaviour.
    fn read_entries(&self, path: &Path) -> Result<Vec<Value>, FilesError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(FilesError::Read {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|source| FilesError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    fn write_entries(&self, path: &Path, entries: &[Value]) -> Result<(), FilesError> {
        let body = serde_json::to_string_pretty(entries).map_err(FilesError::Encode)?;
        fs::write(path, body).map_err(|source| FilesError::Write {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads one collection into typed entities, skipping entries that no
    /// longer deserialize rather than refusing to start.
    fn load_collection<T: DeserializeOwned>(&self, kind: EntityKind) -> Result<Vec<T>, FilesError> {
        let path = self.collection_path(kind.collection());
        let mut entities = Vec::new();

        for entry in self.read_entries(&path)? {
            match serde_json::from_value(entry) {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    tracing::warn!(collection = %kind, %err, "skipping malformed stored entry");
                }
            }
        }

        Ok(entities)
    }

    /// Loads all previously stored collections for seeding a
    /// `DirectoryStore` at startup.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` on unreadable or structurally invalid files
    /// (individual malformed entries are skipped with a warning instead).
    pub fn load_snapshot(&self) -> Result<StoreSnapshot, FilesError> {
        Ok(StoreSnapshot {
            patients: self.load_collection(EntityKind::Patient)?,
            doctors: self.load_collection(EntityKind::Doctor)?,
            appointments: self.load_collection(EntityKind::Appointment)?,
            medical_records: self.load_collection(EntityKind::MedicalRecord)?,
            prescriptions: self.load_collection(EntityKind::Prescription)?,
            bills: self.load_collection(EntityKind::Bill)?,
            inventory: self.load_collection(EntityKind::Inventory)?,
        })
    }

    /// All recorded low-stock notifications, in insertion order.
    pub fn notifications(&self) -> Result<Vec<Notification>, FilesError> {
        let path = self.collection_path(NOTIFICATIONS_COLLECTION);
        let mut notifications = Vec::new();

        for entry in self.read_entries(&path)? {
            match serde_json::from_value(entry) {
                Ok(notification) => notifications.push(notification),
                Err(err) => {
                    tracing::warn!(%err, "skipping malformed stored notification");
                }
            }
        }

        Ok(notifications)
    }
}

fn key_matches(entry: &Value, key_field: &str, key: &RecordKey) -> bool {
    let value = entry.get(key_field);
    match key {
        RecordKey::Id(id) => value.and_then(Value::as_i64) == Some(*id),
        RecordKey::Name(name) => value.and_then(Value::as_str) == Some(name.as_str()),
    }
}

impl Persist for JsonFileStore {
    fn persist(&self, kind: EntityKind, entity: &Value) -> Result<(), PersistError> {
        let key_field = kind.key_field();
        let Some(key) = entity.get(key_field) else {
            return Err(PersistError::Backend(format!(
                "{kind} entity is missing its key field `{key_field}`"
            )));
        };

        let path = self.collection_path(kind.collection());
        let mut entries = self.read_entries(&path)?;

        match entries.iter_mut().find(|e| e.get(key_field) == Some(key)) {
            Some(slot) => *slot = entity.clone(),
            None => entries.push(entity.clone()),
        }

        self.write_entries(&path, &entries)?;
        Ok(())
    }

    fn remove(&self, kind: EntityKind, key: &RecordKey) -> Result<(), PersistError> {
        let key_field = kind.key_field();
        let path = self.collection_path(kind.collection());
        let mut entries = self.read_entries(&path)?;

        let before = entries.len();
        entries.retain(|entry| !key_matches(entry, key_field, key));
        if entries.len() == before {
            // Nothing stored under that key; compensation is already done.
            return Ok(());
        }

        self.write_entries(&path, &entries)?;
        Ok(())
    }
}

impl Notify for JsonFileStore {
    fn notify(&self, item_name: &str, message: &str) -> Result<(), PersistError> {
        let path = self.collection_path(NOTIFICATIONS_COLLECTION);
        let mut entries = self.read_entries(&path)?;

        let next_id = entries
            .iter()
            .filter_map(|entry| entry.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;

        let notification = Notification {
            id: next_id,
            item_name: item_name.to_owned(),
            message: message.to_owned(),
            created_at: Utc::now(),
        };

        entries.push(serde_json::to_value(&notification).map_err(PersistError::Encode)?);
        self.write_entries(&path, &entries)?;

        tracing::info!(item_name, notification_id = next_id, "notification recorded");
        Ok(())
    }
}
