//! # Clinic Core
//!
//! Core business logic for the clinic operations backend: appointment
//! scheduling, the billing and insurance-claim lifecycle, patient/doctor
//! registries, and medication inventory with low-stock notification.
//!
//! The crate is pure domain logic. Persistence and notification delivery are
//! reached only through the [`Persist`] and [`Notify`] collaborator traits;
//! HTTP routing, process startup and storage mechanics live in `clinic-run`
//! and `clinic-files`.
//!
//! All state is owned by a single [`DirectoryStore`] shared across request
//! handlers. Mutations hold one write lock for their whole
//! read-check-then-write sequence and are mirrored to durable storage before
//! they are considered committed; a failed mirror rolls the in-memory change
//! back.

pub mod billing;
pub mod constants;
pub mod error;
pub mod inventory;
pub mod models;
pub mod persist;
pub mod scheduler;
pub mod store;
pub mod validation;

pub use error::{ClinicError, ClinicResult};
pub use models::{
    Appointment, Bill, ClaimStatus, Doctor, InventoryItem, MedicalRecord, Patient, Prescription,
};
pub use persist::{EntityKind, Notify, Persist, PersistError, RecordKey};
pub use scheduler::BookingConfirmation;
pub use store::{DirectoryStore, StoreSnapshot};
