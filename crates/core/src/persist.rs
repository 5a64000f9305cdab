//! Outbound collaborator interfaces.
//!
//! The core never touches files or tables itself. Every committed mutation is
//! mirrored through [`Persist`] before the operation is considered
//! successful, and low-stock events are delivered through [`Notify`]. The
//! adapters behind these traits (a JSON-file store, a relational table, an
//! in-memory double in tests) are interchangeable; the core must not depend
//! on which one is wired in.

use serde_json::Value;

/// The durable collections the store mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Patient,
    Doctor,
    Appointment,
    MedicalRecord,
    Prescription,
    Bill,
    Inventory,
}

impl EntityKind {
    /// Stable collection name, used by adapters for file or table names.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Patient => "patients",
            EntityKind::Doctor => "doctors",
            EntityKind::Appointment => "appointments",
            EntityKind::MedicalRecord => "medical_records",
            EntityKind::Prescription => "prescriptions",
            EntityKind::Bill => "bills",
            EntityKind::Inventory => "inventory",
        }
    }

    /// The serialized field that uniquely keys an entity of this kind.
    pub fn key_field(self) -> &'static str {
        match self {
            EntityKind::Patient | EntityKind::Doctor | EntityKind::Appointment => "id",
            EntityKind::MedicalRecord => "recordId",
            EntityKind::Prescription => "prescriptionId",
            EntityKind::Bill => "billId",
            EntityKind::Inventory => "itemName",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.collection())
    }
}

/// Identifies one entity within a durable collection.
///
/// Every kind is keyed by its integer id except inventory, which is unique
/// by item name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Id(i64),
    Name(String),
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{id}"),
            RecordKey::Name(name) => f.write_str(name),
        }
    }
}

/// Errors reported by persistence and notification collaborators.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to read durable store: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write durable store: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to encode entity: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("durable store rejected the operation: {0}")]
    Backend(String),
}

/// Synchronous durable mirror of the directory store.
///
/// `persist` is called with the full serialized entity after every in-memory
/// create or update, inside the store's critical section. It must upsert the
/// entity by its [`EntityKind::key_field`] and report success or failure
/// synchronously; on failure the store rolls the in-memory mutation back.
///
/// `remove` exists for compensating rollback only: when a later step of a
/// multi-step operation fails, already-persisted earlier steps are deleted so
/// memory and durable state stay consistent.
pub trait Persist: Send + Sync {
    fn persist(&self, kind: EntityKind, entity: &Value) -> Result<(), PersistError>;

    fn remove(&self, kind: EntityKind, key: &RecordKey) -> Result<(), PersistError>;
}

/// Delivery channel for low-stock notifications.
///
/// Storage and delivery are the collaborator's concern; the core only
/// produces the event.
pub trait Notify: Send + Sync {
    fn notify(&self, item_name: &str, message: &str) -> Result<(), PersistError>;
}
