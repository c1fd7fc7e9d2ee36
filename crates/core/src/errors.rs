use thiserror::Error;

use crate::domain::{FieldName, FlowKind};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("field `{0}` was already collected in this session")]
    FieldAlreadyCollected(FieldName),
    #[error("field `{field}` cannot hold {value}")]
    FieldTypeMismatch { field: FieldName, value: String },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures reported by the systems behind the collaborator ports.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("proposal generation failed: {0}")]
    Generation(String),
    #[error("document rendering failed: {0}")]
    Render(String),
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("message channel failed: {0}")]
    Channel(String),
}

/// Everything that can go wrong while handling one inbound event. None of
/// these are fatal to the process; the worst outcome is a discarded session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("input for `{field}` rejected: {reason}")]
    ValidationRejected { field: FieldName, reason: String },
    #[error("choice `{choice}` is not valid here")]
    UnrecognizedChoice { choice: String },
    #[error("{flow:?} flow confirmed with missing fields: {missing:?}")]
    MissingInformation { flow: FlowKind, missing: Vec<FieldName> },
    #[error("proposal generation failed: {0}")]
    GenerationFailure(String),
    #[error("document rendering failed: {0}")]
    RenderFailure(String),
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
    #[error("message channel failed: {0}")]
    ChannelFailure(String),
    #[error("session was lost before this event arrived")]
    SessionRestartDetected,
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl FlowError {
    /// True for re-prompts that never leave the current step.
    pub fn is_recoverable_locally(&self) -> bool {
        matches!(
            self,
            Self::ValidationRejected { .. }
                | Self::UnrecognizedChoice { .. }
                | Self::SessionRestartDetected
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationRejected { .. } => "validation_rejected",
            Self::UnrecognizedChoice { .. } => "unrecognized_choice",
            Self::MissingInformation { .. } => "missing_information",
            Self::GenerationFailure(_) => "generation_failure",
            Self::RenderFailure(_) => "render_failure",
            Self::PersistenceFailure(_) => "persistence_failure",
            Self::ChannelFailure(_) => "channel_failure",
            Self::SessionRestartDetected => "session_restart_detected",
            Self::Domain(_) => "domain_invariant",
        }
    }
}

impl From<CollaboratorError> for FlowError {
    fn from(value: CollaboratorError) -> Self {
        match value {
            CollaboratorError::Generation(message) => Self::GenerationFailure(message),
            CollaboratorError::Render(message) => Self::RenderFailure(message),
            CollaboratorError::Persistence(message) => Self::PersistenceFailure(message),
            CollaboratorError::Channel(message) => Self::ChannelFailure(message),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use crate::domain::{FieldName, FlowKind};
    use crate::errors::{CollaboratorError, FlowError};

    #[test]
    fn step_level_errors_stay_local() {
        let rejected = FlowError::ValidationRejected {
            field: FieldName::Email,
            reason: "formato".to_owned(),
        };
        assert!(rejected.is_recoverable_locally());
        assert!(FlowError::UnrecognizedChoice { choice: "x".to_owned() }.is_recoverable_locally());
    }

    #[test]
    fn collaborator_errors_escalate() {
        let error = FlowError::from(CollaboratorError::Render("wkhtmltopdf exited 1".to_owned()));
        assert_eq!(error, FlowError::RenderFailure("wkhtmltopdf exited 1".to_owned()));
        assert!(!error.is_recoverable_locally());

        let missing = FlowError::MissingInformation {
            flow: FlowKind::Quotation,
            missing: vec![FieldName::Need],
        };
        assert!(!missing.is_recoverable_locally());
        assert_eq!(missing.code(), "missing_information");
    }
}
