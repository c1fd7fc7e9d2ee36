pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod orchestrator;
pub mod ports;
pub mod reminders;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use audit::{AuditEvent, AuditKind, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use domain::{
    AppointmentCandidate, AppointmentRecord, AppointmentStatus, FlowKind, ProposalRequest,
    ProposalType, Session, StructuredProposal, UserId,
};
pub use errors::{ApplicationError, CollaboratorError, DomainError, FlowError};
pub use flows::{ChoiceId, FlowEngine, InboundEvent, InboundKind};
pub use orchestrator::{Collaborators, FlowOrchestrator, HandleOutcome};
pub use ports::{
    Clock, DocumentRenderer, MessageChannel, ProposalGenerator, RenderedDocument, SchedulingStore,
    SystemClock,
};
pub use reminders::{ReminderReport, ReminderSettings, ReminderSweep};
pub use session::{InMemorySessionStore, SessionStore};
