//! # Clinic Files
//!
//! JSON-file persistence collaborator for the clinic backend.
//!
//! Implements the core's [`Persist`](clinic_core::Persist) and
//! [`Notify`](clinic_core::Notify) traits over one JSON array file per
//! entity collection (`patients.json`, `doctors.json`, ...), preserving the
//! field names of previously stored data, and provides the startup bootstrap
//! that loads those files back into a
//! [`StoreSnapshot`](clinic_core::StoreSnapshot).
//!
//! The adapter is interchangeable with any other `Persist` implementation
//! (e.g. a relational table); the core does not depend on which is wired in.

pub mod store;

pub use store::{JsonFileStore, Notification};

use clinic_core::PersistError;
use std::path::PathBuf;

/// Errors raised by the JSON-file storage layer.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error("failed to create data directory {path}: {source}", path = path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}", path = path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}", path = path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}", path = path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode entity: {0}")]
    Encode(serde_json::Error),
}

impl From<FilesError> for PersistError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::CreateDir { source, .. } | FilesError::Read { source, .. } => {
                PersistError::Read(source)
            }
            FilesError::Write { source, .. } => PersistError::Write(source),
            FilesError::Parse { path, source } => PersistError::Backend(format!(
                "failed to parse {}: {source}",
                path.display()
            )),
            FilesError::Encode(source) => PersistError::Encode(source),
        }
    }
}
