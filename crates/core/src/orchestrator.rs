//! Drives one inbound event through the flow engine and its collaborators.
//!
//! Events for the same user are admitted strictly in arrival order through
//! the [`UserSequencer`]; the session is read once, the transition is computed
//! once, effects run in order, and exactly one session change is committed.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::{AuditEvent, AuditKind, AuditSink};
use crate::domain::{
    AppointmentCandidate, FlowKind, FlowProgress, LifecycleStatus, ProposalRequest, Session,
    UserId,
};
use crate::errors::FlowError;
use crate::flows::engine::{Effect, FlowEngine, SessionChange, Transition};
use crate::flows::events::InboundEvent;
use crate::flows::prompts::{
    PromptSpec, BOOKING_FAILED, DELIVERY_FAILED, DOCUMENT_CAPTION, GENERATING_NOTICE,
    GENERATION_FAILED,
};
use crate::ports::{Clock, DocumentRenderer, MessageChannel, ProposalGenerator, SchedulingStore};
use crate::session::{SessionStore, UserSequencer};

/// Everything the orchestrator talks to besides the pure engine.
#[derive(Clone)]
pub struct Collaborators {
    pub sessions: Arc<dyn SessionStore>,
    pub channel: Arc<dyn MessageChannel>,
    pub generator: Arc<dyn ProposalGenerator>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub scheduling: Arc<dyn SchedulingStore>,
    pub audit: Arc<dyn AuditSink>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandleOutcome {
    pub user_id: UserId,
    pub correlation_id: String,
    /// Flow and step the user is in after the event, if any.
    pub flow: Option<FlowKind>,
    pub step: Option<String>,
    /// Set when the event closed a session.
    pub closed: Option<LifecycleStatus>,
    pub error: Option<FlowError>,
}

#[derive(Clone)]
pub struct FlowOrchestrator {
    engine: Arc<FlowEngine>,
    deps: Collaborators,
    sequencer: UserSequencer,
}

impl FlowOrchestrator {
    pub fn new(engine: FlowEngine, deps: Collaborators) -> Self {
        Self { engine: Arc::new(engine), deps, sequencer: UserSequencer::default() }
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.deps.sessions
    }

    /// Reserves the user's turn immediately and returns a future that runs
    /// the event once every earlier event for that user has finished. The
    /// future owns its state, so callers may spawn it.
    pub fn handle(
        &self,
        event: InboundEvent,
    ) -> impl Future<Output = HandleOutcome> + Send + 'static {
        let ticket = self.sequencer.enter(&event.user_id);
        let this = self.clone();
        async move {
            let _turn = ticket.admit().await;
            this.process(event).await
        }
    }

    async fn process(&self, event: InboundEvent) -> HandleOutcome {
        let user_id = event.user_id.clone();
        let correlation_id =
            event.message_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

        let now = self.deps.clock.now();
        let session = self.deps.sessions.get(&user_id).await;
        let from_step = session.as_ref().map(|session| session.progress.step_name());
        let Transition { mut change, effects, rejection } =
            if self.deps.sessions.first_contact(&user_id).await {
                self.engine.apply_on_first_contact(&event, session.as_ref(), now)
            } else {
                self.engine.apply(&event, session.as_ref(), now)
            };
        let recovery_kind = recovery_kind(session.as_ref(), &change, &effects);

        let mut failure = None;
        for effect in effects {
            if let Err(error) = self.execute(&user_id, effect).await {
                failure = Some(error);
                break;
            }
        }

        if let Some(error) = &failure {
            warn!(
                event_name = "flow.collaborator_failed",
                correlation_id = %correlation_id,
                user_id = %user_id,
                error_code = error.code(),
                error = %error,
                "discarding session after collaborator failure"
            );
            change = SessionChange::Delete(LifecycleStatus::Abandoned);
            for prompt in self.engine.planner().recovery(recovery_kind, recovery_reason(error)) {
                if let Err(send_error) = self.send(&user_id, &prompt).await {
                    warn!(
                        event_name = "flow.recovery_undelivered",
                        correlation_id = %correlation_id,
                        user_id = %user_id,
                        error = %send_error,
                        "recovery prompt could not be delivered"
                    );
                    break;
                }
            }
        }

        let after = self.commit(&user_id, &change, session.as_ref(), now).await;
        let to_step = after.as_ref().map(|progress| progress.step_name());

        let (kind, error_code) = match (&failure, &rejection) {
            (Some(error), _) => (AuditKind::CollaboratorFailed, Some(error.code())),
            (None, Some(error)) => (AuditKind::InputRejected, Some(error.code())),
            (None, None) => (AuditKind::TransitionApplied, None),
        };
        let mut record = AuditEvent::new(kind, user_id.clone(), correlation_id.clone(), now)
            .message_id(event.message_id.clone())
            .detail("input", event.kind.label())
            .detail("from_step", from_step.clone().unwrap_or_default())
            .detail("to_step", to_step.clone().unwrap_or_default());
        if let Some(code) = error_code {
            record = record.detail("error_code", code);
        }
        if let Some(error) = &failure {
            record = record.detail("error", error.to_string());
        }
        self.deps.audit.emit(record);
        let event_name = kind.event_name();

        info!(
            event_name,
            correlation_id = %correlation_id,
            user_id = %user_id,
            from_step = from_step.as_deref().unwrap_or("-"),
            to_step = to_step.as_deref().unwrap_or("-"),
            "inbound event handled"
        );

        HandleOutcome {
            user_id,
            correlation_id,
            flow: after.as_ref().map(FlowProgress::kind),
            step: to_step,
            closed: match change {
                SessionChange::Delete(status) => Some(status),
                _ => None,
            },
            error: failure.or(rejection),
        }
    }

    async fn execute(&self, user_id: &UserId, effect: Effect) -> Result<(), FlowError> {
        match effect {
            Effect::Send(prompt) => self.send(user_id, &prompt).await,
            Effect::GenerateProposal(request) => self.deliver_proposal(user_id, &request).await,
            Effect::BookAppointment(candidate) => self.book(user_id, candidate).await,
        }
    }

    async fn send(&self, user_id: &UserId, prompt: &PromptSpec) -> Result<(), FlowError> {
        match prompt {
            PromptSpec::FreeText { body } => self.deps.channel.send_text(user_id, body).await?,
            PromptSpec::Choice(choice) => {
                self.deps.channel.send_choice_prompt(user_id, choice).await?
            }
        }
        Ok(())
    }

    async fn deliver_proposal(
        &self,
        user_id: &UserId,
        request: &ProposalRequest,
    ) -> Result<(), FlowError> {
        self.deps.channel.send_text(user_id, GENERATING_NOTICE).await?;

        let proposal = self.deps.generator.generate(request).await?;
        info!(
            event_name = "proposal.generated",
            user_id = %user_id,
            proposal_id = %proposal.metadata.id,
            "proposal generated"
        );
        let document = self.deps.renderer.render(&proposal).await?;
        self.deps.channel.send_document(user_id, &document, DOCUMENT_CAPTION).await?;
        info!(
            event_name = "proposal.delivered",
            user_id = %user_id,
            file_name = %document.file_name,
            bytes = document.bytes.len(),
            "proposal document delivered"
        );

        let planner = self.engine.planner();
        let notices =
            [planner.proposal_delivered(), planner.after_completion(FlowKind::Quotation)];
        self.follow_up(user_id, notices).await;
        Ok(())
    }

    async fn book(
        &self,
        user_id: &UserId,
        candidate: AppointmentCandidate,
    ) -> Result<(), FlowError> {
        let record = self.deps.scheduling.create_appointment(candidate).await?;
        info!(
            event_name = "appointment.booked",
            user_id = %user_id,
            appointment_id = record.id,
            scheduled_at = %record.scheduled_at,
            "appointment booked"
        );

        let planner = self.engine.planner();
        let notices = [
            planner.appointment_booked(record.id),
            planner.after_completion(FlowKind::Appointment),
        ];
        self.follow_up(user_id, notices).await;
        Ok(())
    }

    /// Notices sent after the document or booking went through. The flow is
    /// complete at that point, so an undelivered notice is only logged.
    async fn follow_up(&self, user_id: &UserId, notices: [PromptSpec; 2]) {
        for notice in &notices {
            if let Err(error) = self.send(user_id, notice).await {
                warn!(
                    event_name = "flow.follow_up_undelivered",
                    user_id = %user_id,
                    error = %error,
                    "completion notice could not be delivered"
                );
                break;
            }
        }
    }

    /// Applies the single session change and returns the resulting progress.
    async fn commit(
        &self,
        user_id: &UserId,
        change: &SessionChange,
        before: Option<&Session>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<FlowProgress> {
        match change {
            SessionChange::Keep => before.map(|session| session.progress.clone()),
            SessionChange::Start(kind) => {
                Some(self.deps.sessions.create(user_id, *kind, now).await.progress)
            }
            SessionChange::Put(session) => {
                let progress = session.progress.clone();
                self.deps.sessions.put(session.clone()).await;
                Some(progress)
            }
            SessionChange::Delete(_) => {
                self.deps.sessions.delete(user_id).await;
                None
            }
        }
    }
}

/// The flow whose retry button a recovery menu should offer.
fn recovery_kind(
    session: Option<&Session>,
    change: &SessionChange,
    effects: &[Effect],
) -> FlowKind {
    if let Some(session) = session {
        return session.kind();
    }
    if let SessionChange::Start(kind) = change {
        return *kind;
    }
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::BookAppointment(_) => Some(FlowKind::Appointment),
            Effect::GenerateProposal(_) => Some(FlowKind::Quotation),
            Effect::Send(_) => None,
        })
        .unwrap_or(FlowKind::Quotation)
}

fn recovery_reason(error: &FlowError) -> &'static str {
    match error {
        FlowError::GenerationFailure(_) | FlowError::RenderFailure(_) => GENERATION_FAILED,
        FlowError::PersistenceFailure(_) => BOOKING_FAILED,
        _ => DELIVERY_FAILED,
    }
}
