//! Collaborator fakes shared by the crate's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::proposal::{
    Deliverables, Investment, ProjectObjective, ProposalCover, ProposalMetadata, ResponsibleTeam,
    SchedulePhase, TeamMember, WhyUs,
};
use crate::domain::{
    AppointmentCandidate, AppointmentRecord, AppointmentStatus, ProposalRequest,
    StructuredProposal, UserId,
};
use crate::errors::CollaboratorError;
use crate::flows::prompts::ChoicePrompt;
use crate::ports::{
    Clock, DocumentRenderer, MessageChannel, ProposalGenerator, RenderedDocument, SchedulingStore,
};

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 15, 0, 0).single().unwrap_or_default()
}

#[derive(Clone, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(fixed_now())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sent {
    Text { to: UserId, body: String },
    Choice { to: UserId, prompt: ChoicePrompt },
    Document { to: UserId, file_name: String, caption: String },
}

impl Sent {
    pub fn body(&self) -> &str {
        match self {
            Self::Text { body, .. } => body,
            Self::Choice { prompt, .. } => &prompt.body,
            Self::Document { caption, .. } => caption,
        }
    }
}

type FailWhen = Box<dyn Fn(&Sent) -> bool + Send + Sync>;

#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
    fail_when: Option<FailWhen>,
    delay: Option<Duration>,
}

impl RecordingChannel {
    pub fn failing_when(predicate: impl Fn(&Sent) -> bool + Send + Sync + 'static) -> Self {
        Self { fail_when: Some(Box::new(predicate)), ..Self::default() }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent().iter().map(|sent| sent.body().to_owned()).collect()
    }

    async fn record(&self, message: Sent) -> Result<(), CollaboratorError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_when.as_ref().is_some_and(|fail| fail(&message)) {
            return Err(CollaboratorError::Channel("scripted channel failure".to_owned()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageChannel for RecordingChannel {
    async fn send_text(&self, to: &UserId, body: &str) -> Result<(), CollaboratorError> {
        self.record(Sent::Text { to: to.clone(), body: body.to_owned() }).await
    }

    async fn send_choice_prompt(
        &self,
        to: &UserId,
        prompt: &ChoicePrompt,
    ) -> Result<(), CollaboratorError> {
        self.record(Sent::Choice { to: to.clone(), prompt: prompt.clone() }).await
    }

    async fn send_document(
        &self,
        to: &UserId,
        document: &RenderedDocument,
        caption: &str,
    ) -> Result<(), CollaboratorError> {
        self.record(Sent::Document {
            to: to.clone(),
            file_name: document.file_name.clone(),
            caption: caption.to_owned(),
        })
        .await
    }
}

pub fn sample_proposal(client: &str) -> StructuredProposal {
    StructuredProposal {
        cover: ProposalCover { subtitle: format!("Tienda Shopify para {client}") },
        objective: ProjectObjective {
            main_objective: "Lanzar el canal digital".to_owned(),
            specific_objectives: vec!["Migrar catálogo".to_owned()],
            summary: "Vender más en línea".to_owned(),
        },
        team: ResponsibleTeam {
            introduction: "Equipo senior".to_owned(),
            members: vec![TeamMember {
                role: "Project Manager".to_owned(),
                description: "Coordina entregas".to_owned(),
            }],
            closing: "Metodología ágil".to_owned(),
        },
        why_us: WhyUs { paragraphs: vec!["Más de 60 marcas acompañadas".to_owned()] },
        deliverables: Deliverables { items: vec!["Tema personalizado".to_owned()] },
        investment: Investment {
            total: "$6.000.000 COP".to_owned(),
            duration: "6 semanas".to_owned(),
            schedule: vec![SchedulePhase {
                phase: "Descubrimiento".to_owned(),
                description: "Talleres".to_owned(),
            }],
            includes: vec!["Soporte 30 días".to_owned()],
        },
        metadata: ProposalMetadata {
            id: "PROP-1736521200000".to_owned(),
            date: "10 de enero de 2025".to_owned(),
            client: client.to_owned(),
            proposal_type: "CRO (Optimización de Conversión)".to_owned(),
        },
    }
}

pub struct ScriptedGenerator {
    outcome: Result<(), CollaboratorError>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn succeeding() -> Self {
        Self { outcome: Ok(()), calls: AtomicUsize::new(0), delay: None }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(CollaboratorError::Generation(message.to_owned())),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::succeeding() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProposalGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: &ProposalRequest,
    ) -> Result<StructuredProposal, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone().map(|()| sample_proposal(&request.company_name))
    }
}

pub struct StubRenderer {
    fail: bool,
    calls: AtomicUsize,
}

impl StubRenderer {
    pub fn succeeding() -> Self {
        Self { fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { fail: true, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(
        &self,
        proposal: &StructuredProposal,
    ) -> Result<RenderedDocument, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollaboratorError::Render("wkhtmltopdf exited with status 1".to_owned()));
        }
        Ok(RenderedDocument::pdf(proposal.document_file_name(), b"%PDF-1.4".to_vec()))
    }
}

#[derive(Default)]
pub struct MemorySchedulingStore {
    records: Mutex<Vec<AppointmentRecord>>,
    fail: bool,
}

impl MemorySchedulingStore {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn with_records(records: Vec<AppointmentRecord>) -> Self {
        Self { records: Mutex::new(records), fail: false }
    }

    pub fn records(&self) -> Vec<AppointmentRecord> {
        self.records.lock().map(|records| records.clone()).unwrap_or_default()
    }

    fn check(&self) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Persistence("database is locked".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl SchedulingStore for MemorySchedulingStore {
    async fn create_appointment(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<AppointmentRecord, CollaboratorError> {
        self.check()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| CollaboratorError::Persistence("poisoned".to_owned()))?;
        let id = i64::try_from(records.len()).unwrap_or_default() + 1;
        let record = AppointmentRecord::from_candidate(id, candidate, fixed_now());
        records.push(record.clone());
        Ok(record)
    }

    async fn upcoming_unreminded(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError> {
        self.check()?;
        Ok(self
            .records()
            .into_iter()
            .filter(|record| record.is_due_for_reminder(from, until))
            .collect())
    }

    async fn mark_reminder_sent(&self, id: i64) -> Result<(), CollaboratorError> {
        self.check()?;
        if let Ok(mut records) = self.records.lock() {
            for record in records.iter_mut().filter(|record| record.id == id) {
                record.reminder_sent = true;
            }
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id: i64,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, CollaboratorError> {
        self.check()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| CollaboratorError::Persistence("poisoned".to_owned()))?;
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| CollaboratorError::Persistence(format!("appointment {id} not found")))?;
        record.status = status;
        Ok(record.clone())
    }

    async fn list_for_contact(
        &self,
        contact: &UserId,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError> {
        self.check()?;
        Ok(self.records().into_iter().filter(|record| &record.contact_user_id == contact).collect())
    }
}

/// Keeps a shared handle while handing the trait object to the orchestrator.
pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
