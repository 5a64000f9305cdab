use crate::persist::PersistError;

/// Errors returned by clinic core operations.
///
/// Each variant corresponds to a distinct failure class that the HTTP layer
/// maps to its own status code: malformed input, unknown entity reference,
/// scheduling conflict, illegal claim transition, or a failed durable write.
#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("doctor {doctor_id} already has an appointment on {date} at {time}")]
    SlotTaken {
        doctor_id: i64,
        date: String,
        time: String,
    },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistError),
}

impl ClinicError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        ClinicError::NotFound { entity, id }
    }
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;
