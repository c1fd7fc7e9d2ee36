use thiserror::Error;

use deckbot_core::errors::CollaboratorError;

pub mod appointment;
pub mod memory;

pub use appointment::SqlAppointmentRepository;
pub use memory::InMemoryAppointmentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("appointment {0} not found")]
    NotFound(i64),
}

impl From<RepositoryError> for CollaboratorError {
    fn from(error: RepositoryError) -> Self {
        CollaboratorError::Persistence(error.to_string())
    }
}
