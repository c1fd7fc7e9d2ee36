pub mod appointment;
pub mod dates;
pub mod proposal;
pub mod session;

pub use appointment::{AppointmentCandidate, AppointmentRecord, AppointmentStatus};
pub use proposal::{EcommercePresence, ProposalRequest, ProposalType, StructuredProposal};
pub use session::{
    AcceptedValue, AppointmentFields, AppointmentStep, FieldName, FlowKind, FlowProgress,
    LifecycleStatus, QuotationFields, QuotationStep, Session, UserId,
};
