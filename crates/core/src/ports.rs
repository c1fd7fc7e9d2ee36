//! Narrow interfaces to the systems the bot talks to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AppointmentCandidate, AppointmentRecord, AppointmentStatus, ProposalRequest,
    StructuredProposal, UserId,
};
use crate::errors::CollaboratorError;
use crate::flows::prompts::ChoicePrompt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), mime_type: "application/pdf".to_owned(), bytes }
    }
}

#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send_text(&self, to: &UserId, body: &str) -> Result<(), CollaboratorError>;
    async fn send_choice_prompt(
        &self,
        to: &UserId,
        prompt: &ChoicePrompt,
    ) -> Result<(), CollaboratorError>;
    async fn send_document(
        &self,
        to: &UserId,
        document: &RenderedDocument,
        caption: &str,
    ) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait ProposalGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &ProposalRequest,
    ) -> Result<StructuredProposal, CollaboratorError>;
}

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, proposal: &StructuredProposal)
        -> Result<RenderedDocument, CollaboratorError>;
}

#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn create_appointment(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<AppointmentRecord, CollaboratorError>;

    /// Pending, not yet reminded, scheduled within `[from, until]`.
    async fn upcoming_unreminded(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError>;

    async fn mark_reminder_sent(&self, id: i64) -> Result<(), CollaboratorError>;

    async fn update_status(
        &self,
        id: i64,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, CollaboratorError>;

    async fn list_for_contact(
        &self,
        contact: &UserId,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
