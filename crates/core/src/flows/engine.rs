use chrono::{DateTime, FixedOffset, Utc};

use crate::domain::{
    AcceptedValue, AppointmentCandidate, FlowKind, FlowProgress, LifecycleStatus, ProposalRequest,
    Session,
};
use crate::errors::{DomainError, FlowError};
use crate::flows::definitions::{
    choice_value, AppointmentFlow, FieldRecord, FlowDefinition, QuotationFlow, StepInput, TextRule,
};
use crate::flows::events::{ChoiceId, InboundEvent, InboundKind, Selection};
use crate::flows::prompts::{
    PromptPlanner, PromptSpec, MISSING_INFORMATION, UNRECOGNIZED_CHOICE, UNSUPPORTED_MESSAGE,
    USE_BUTTONS,
};
use crate::flows::validators;

/// The single session mutation produced by one inbound event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionChange {
    Keep,
    Start(FlowKind),
    Put(Session),
    Delete(LifecycleStatus),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Send(PromptSpec),
    GenerateProposal(ProposalRequest),
    BookAppointment(AppointmentCandidate),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub change: SessionChange,
    pub effects: Vec<Effect>,
    /// Locally handled failure, kept for audit.
    pub rejection: Option<FlowError>,
}

impl Transition {
    fn keep(prompts: impl IntoIterator<Item = PromptSpec>) -> Self {
        Self {
            change: SessionChange::Keep,
            effects: prompts.into_iter().map(Effect::Send).collect(),
            rejection: None,
        }
    }

    fn rejected(mut self, error: FlowError) -> Self {
        self.rejection = Some(error);
        self
    }
}

#[derive(Clone, Copy, Debug)]
enum StepEvent<'a> {
    Text(&'a str),
    Choice(ChoiceId),
}

/// Deterministic transition function over both form flows. Performs no I/O;
/// the orchestrator executes the returned effects.
#[derive(Clone, Debug)]
pub struct FlowEngine {
    quotation: QuotationFlow,
    appointment: AppointmentFlow,
    planner: PromptPlanner,
    offset: FixedOffset,
}

impl FlowEngine {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            quotation: QuotationFlow,
            appointment: AppointmentFlow,
            planner: PromptPlanner::new(offset),
            offset,
        }
    }

    pub fn planner(&self) -> &PromptPlanner {
        &self.planner
    }

    pub fn apply(
        &self,
        event: &InboundEvent,
        session: Option<&Session>,
        now: DateTime<Utc>,
    ) -> Transition {
        match (&event.kind, session) {
            (InboundKind::Unsupported { .. }, _) => Transition::keep([
                PromptSpec::text(UNSUPPORTED_MESSAGE),
                self.planner.main_menu(),
            ]),
            (InboundKind::FreeText(_), None) => Transition::keep([self.planner.main_menu()]),
            (InboundKind::FreeText(text), Some(session)) => {
                self.step_event(session, StepEvent::Text(text), now)
            }
            (InboundKind::Choice(Selection::Unrecognized(raw)), None) => {
                Transition::keep([self.planner.main_menu()])
                    .rejected(FlowError::UnrecognizedChoice { choice: raw.clone() })
            }
            (InboundKind::Choice(Selection::Unrecognized(raw)), Some(session)) => {
                self.unrecognized(session, raw)
            }
            (InboundKind::Choice(Selection::Choice(choice)), session) => {
                self.choice(*choice, session, now)
            }
        }
    }

    /// Same as [`FlowEngine::apply`] for the user's first event since the
    /// process started. Without a session the user may have been mid-flow
    /// before a restart, so the expiry notice precedes the regular handling.
    pub fn apply_on_first_contact(
        &self,
        event: &InboundEvent,
        session: Option<&Session>,
        now: DateTime<Utc>,
    ) -> Transition {
        let transition = self.apply(event, session, now);
        if session.is_some() || transition.rejection == Some(FlowError::SessionRestartDetected) {
            return transition;
        }

        let effects = std::iter::once(Effect::Send(self.planner.session_expired()))
            .chain(transition.effects)
            .collect();
        Transition {
            change: transition.change,
            effects,
            rejection: transition.rejection.or(Some(FlowError::SessionRestartDetected)),
        }
    }

    fn choice(
        &self,
        choice: ChoiceId,
        session: Option<&Session>,
        now: DateTime<Utc>,
    ) -> Transition {
        let discard = |session: Option<&Session>| match session {
            Some(_) => SessionChange::Delete(LifecycleStatus::Abandoned),
            None => SessionChange::Keep,
        };

        match choice {
            ChoiceId::StartQuotation | ChoiceId::NewQuotation => self.start(FlowKind::Quotation),
            ChoiceId::StartAppointment => self.start(FlowKind::Appointment),
            ChoiceId::Info => Transition::keep([self.planner.info(), self.planner.next_steps()]),
            ChoiceId::Help => Transition::keep([self.planner.help(), self.planner.next_steps()]),
            ChoiceId::BackToMenu => Transition {
                change: discard(session),
                effects: vec![Effect::Send(self.planner.main_menu())],
                rejection: None,
            },
            ChoiceId::Cancel => Transition {
                change: discard(session),
                effects: vec![
                    Effect::Send(self.planner.cancelled(session.map(Session::kind))),
                    Effect::Send(self.planner.main_menu()),
                ],
                rejection: None,
            },
            ChoiceId::ConfirmQuotation | ChoiceId::ConfirmAppointment => match session {
                None => self.expired(),
                Some(session) => self.confirm(session, choice),
            },
            ChoiceId::EcommerceYes
            | ChoiceId::EcommerceNo
            | ChoiceId::ProposalShopify
            | ChoiceId::ProposalCro
            | ChoiceId::ProposalBoth => match session {
                None => self.expired(),
                Some(session) => self.step_event(session, StepEvent::Choice(choice), now),
            },
        }
    }

    fn start(&self, kind: FlowKind) -> Transition {
        Transition {
            change: SessionChange::Start(kind),
            effects: vec![Effect::Send(self.planner.plan(&FlowProgress::start(kind)))],
            rejection: None,
        }
    }

    /// A flow button arrived but no session exists: the process restarted
    /// while the user was mid-flow.
    fn expired(&self) -> Transition {
        Transition::keep([self.planner.session_expired(), self.planner.main_menu()])
            .rejected(FlowError::SessionRestartDetected)
    }

    fn unrecognized(&self, session: &Session, raw: &str) -> Transition {
        let prompts =
            [PromptSpec::text(UNRECOGNIZED_CHOICE), self.planner.plan(&session.progress)];
        Transition::keep(prompts)
            .rejected(FlowError::UnrecognizedChoice { choice: raw.to_owned() })
    }

    fn step_event(
        &self,
        session: &Session,
        input: StepEvent<'_>,
        now: DateTime<Utc>,
    ) -> Transition {
        match &session.progress {
            FlowProgress::Quotation { step, fields } => {
                self.advance(&self.quotation, session, *step, fields, input, now)
            }
            FlowProgress::Appointment { step, fields } => {
                self.advance(&self.appointment, session, *step, fields, input, now)
            }
        }
    }

    fn advance<D: FlowDefinition>(
        &self,
        flow: &D,
        session: &Session,
        step: D::Step,
        fields: &D::Fields,
        input: StepEvent<'_>,
        now: DateTime<Utc>,
    ) -> Transition {
        let accepted = match (flow.input(step), input) {
            (StepInput::FreeText(rule), StepEvent::Text(text)) => {
                let Some(field) = flow.field(step) else {
                    return self.broken(session, DomainError::InvariantViolation(format!(
                        "free-text step {step:?} declares no field"
                    )));
                };
                match self.validate(rule, text, now) {
                    Ok(value) => (field, value),
                    Err(reason) => {
                        return Transition::keep([PromptSpec::text(reason.clone())])
                            .rejected(FlowError::ValidationRejected { field, reason });
                    }
                }
            }
            (StepInput::Choice(_) | StepInput::Review, StepEvent::Text(_)) => {
                return Transition::keep([PromptSpec::text(USE_BUTTONS)]);
            }
            (StepInput::Choice(options), StepEvent::Choice(choice))
                if options.contains(&choice) =>
            {
                match (flow.field(step), choice_value(choice)) {
                    (Some(field), Some(value)) => (field, value),
                    _ => return self.unrecognized(session, choice.as_str()),
                }
            }
            (_, StepEvent::Choice(choice)) => return self.unrecognized(session, choice.as_str()),
        };

        let (field, value) = accepted;
        let next = flow.successor(step, &value);
        let mut updated_fields = fields.clone();
        if let Err(error) = updated_fields.record(field, value) {
            return self.broken(session, error);
        }

        let progress = flow.progress(next, updated_fields);
        let prompt = self.planner.plan(&progress);
        let updated = Session { progress, updated_at: now, ..session.clone() };
        Transition {
            change: SessionChange::Put(updated),
            effects: vec![Effect::Send(prompt)],
            rejection: None,
        }
    }

    fn validate(
        &self,
        rule: TextRule,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<AcceptedValue, String> {
        let result = match rule {
            TextRule::NonEmpty => validators::non_empty(text).map(AcceptedValue::Text),
            TextRule::Email => validators::email(text).map(AcceptedValue::Text),
            TextRule::FutureDateTime => {
                validators::future_datetime(text, now, self.offset).map(AcceptedValue::Instant)
            }
        };
        result.map_err(|rejection| rejection.reason)
    }

    fn confirm(&self, session: &Session, choice: ChoiceId) -> Transition {
        match &session.progress {
            FlowProgress::Quotation { fields, .. } if choice == self.quotation.confirm_choice() => {
                match fields.to_request() {
                    Some(request) => Self::complete(Effect::GenerateProposal(request)),
                    None => self.missing(FlowKind::Quotation, fields),
                }
            }
            FlowProgress::Appointment { fields, .. }
                if choice == self.appointment.confirm_choice() =>
            {
                match fields.to_candidate(&session.user_id) {
                    Some(candidate) => Self::complete(Effect::BookAppointment(candidate)),
                    None => self.missing(FlowKind::Appointment, fields),
                }
            }
            _ => self.unrecognized(session, choice.as_str()),
        }
    }

    fn complete(effect: Effect) -> Transition {
        Transition {
            change: SessionChange::Delete(LifecycleStatus::Completed),
            effects: vec![effect],
            rejection: None,
        }
    }

    fn missing(&self, flow: FlowKind, fields: &impl FieldRecord) -> Transition {
        Transition {
            change: SessionChange::Delete(LifecycleStatus::Abandoned),
            effects: self
                .planner
                .recovery(flow, MISSING_INFORMATION)
                .into_iter()
                .map(Effect::Send)
                .collect(),
            rejection: Some(FlowError::MissingInformation { flow, missing: fields.missing() }),
        }
    }

    fn broken(&self, session: &Session, error: DomainError) -> Transition {
        Transition {
            change: SessionChange::Delete(LifecycleStatus::Abandoned),
            effects: self
                .planner
                .recovery(session.kind(), MISSING_INFORMATION)
                .into_iter()
                .map(Effect::Send)
                .collect(),
            rejection: Some(FlowError::Domain(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    use super::{Effect, FlowEngine, SessionChange, Transition};
    use crate::domain::{
        AppointmentStep, EcommercePresence, FieldName, FlowKind, FlowProgress, LifecycleStatus,
        ProposalType, QuotationStep, Session, UserId,
    };
    use crate::errors::FlowError;
    use crate::flows::events::InboundEvent;
    use crate::flows::prompts::{PromptSpec, MISSING_INFORMATION, USE_BUTTONS};
    use crate::flows::validators::{EMPTY_ANSWER, INVALID_DATETIME_FORMAT, INVALID_EMAIL};

    const USER: &str = "573001112233";

    fn engine() -> FlowEngine {
        FlowEngine::new(FixedOffset::west_opt(5 * 3600).expect("valid offset"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 15, 0, 0).single().expect("valid instant")
    }

    /// Applies the transition's session change the way the store would.
    fn commit(current: Option<Session>, transition: &Transition) -> Option<Session> {
        match &transition.change {
            SessionChange::Keep => current,
            SessionChange::Start(kind) => Some(Session::start(UserId::new(USER), *kind, now())),
            SessionChange::Put(session) => Some(session.clone()),
            SessionChange::Delete(_) => None,
        }
    }

    fn drive(events: &[InboundEvent]) -> (Option<Session>, Vec<Transition>) {
        let engine = engine();
        let mut session = None;
        let mut transitions = Vec::new();
        for event in events {
            let transition = engine.apply(event, session.as_ref(), now());
            session = commit(session, &transition);
            transitions.push(transition);
        }
        (session, transitions)
    }

    fn sent_bodies(transition: &Transition) -> Vec<String> {
        transition
            .effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Send(prompt) => Some(prompt.body().to_owned()),
                _ => None,
            })
            .collect()
    }

    fn quotation_events() -> Vec<InboundEvent> {
        vec![
            InboundEvent::choice(USER, "btn_cotizacion"),
            InboundEvent::text(USER, "  TechStore "),
            InboundEvent::text(USER, "Venta de tecnología"),
            InboundEvent::text(USER, "Pocas ventas online"),
            InboundEvent::choice(USER, "ecommerce_si"),
            InboundEvent::choice(USER, "propuesta_ambas"),
        ]
    }

    fn appointment_events() -> Vec<InboundEvent> {
        vec![
            InboundEvent::choice(USER, "btn_agendar_cita"),
            InboundEvent::text(USER, "ana@digitdeck.co"),
            InboundEvent::text(USER, "Ana Gómez"),
            InboundEvent::text(USER, "Auditoría CRO"),
        ]
    }

    #[test]
    fn start_then_first_answer_advances_to_activity() {
        let (session, transitions) = drive(&quotation_events()[..2]);

        assert_eq!(transitions[0].change, SessionChange::Start(FlowKind::Quotation));
        let session = session.expect("session exists");
        let FlowProgress::Quotation { step, fields } = &session.progress else {
            panic!("quotation flow expected");
        };
        assert_eq!(*step, QuotationStep::Activity);
        assert_eq!(fields.company_name.as_deref(), Some("TechStore"));
        assert!(sent_bodies(&transitions[1])[0].contains("Pregunta 2 de 5"));
    }

    #[test]
    fn full_quotation_collects_exactly_five_fields() {
        let mut events = quotation_events();
        events.push(InboundEvent::choice(USER, "btn_confirmar_cotizacion"));
        let (session, transitions) = drive(&events);

        let review = &transitions[5];
        let SessionChange::Put(review_session) = &review.change else {
            panic!("proposal type must advance to review");
        };
        let names: Vec<_> =
            review_session.collected_fields().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                FieldName::CompanyName,
                FieldName::Activity,
                FieldName::Need,
                FieldName::HasEcommerce,
                FieldName::ProposalType
            ]
        );

        let confirm = &transitions[6];
        assert_eq!(confirm.change, SessionChange::Delete(LifecycleStatus::Completed));
        let [Effect::GenerateProposal(request)] = confirm.effects.as_slice() else {
            panic!("confirm must request generation exactly once");
        };
        assert_eq!(request.company_name, "TechStore");
        assert_eq!(request.activity, "Venta de tecnología");
        assert_eq!(request.need, "Pocas ventas online");
        assert_eq!(request.has_ecommerce, EcommercePresence::Yes);
        assert_eq!(request.proposal_type, ProposalType::ShopifyAndCro);
        assert!(session.is_none());
    }

    #[test]
    fn blank_text_never_advances_any_free_text_step() {
        let engine = engine();
        let quotation = [1usize, 2, 3].map(|prefix| (quotation_events(), prefix, EMPTY_ANSWER));
        let appointment = [
            (1usize, INVALID_EMAIL),
            (2, EMPTY_ANSWER),
            (3, EMPTY_ANSWER),
            (4, INVALID_DATETIME_FORMAT),
        ]
        .map(|(prefix, reason)| (appointment_events(), prefix, reason));

        for (events, prefix, reason) in quotation.into_iter().chain(appointment) {
            let session = drive(&events[..prefix]).0.expect("session exists");
            let step = session.progress.step_name();
            for blank in ["", "   ", "\n\t"] {
                let event = InboundEvent::text(USER, blank);
                let transition = engine.apply(&event, Some(&session), now());
                assert_eq!(transition.change, SessionChange::Keep, "{step}");
                assert_eq!(sent_bodies(&transition), vec![reason.to_owned()], "{step}");
                assert!(matches!(
                    transition.rejection,
                    Some(FlowError::ValidationRejected { .. })
                ));
                let kept = commit(Some(session.clone()), &transition).expect("session kept");
                assert_eq!(kept.collected_fields(), session.collected_fields(), "{step}");
            }
        }
    }

    #[test]
    fn free_text_at_choice_steps_asks_for_buttons() {
        let engine = engine();
        for prefix in [4usize, 5, 6] {
            let (session, _) = drive(&quotation_events()[..prefix]);
            let session = session.expect("session exists");
            let transition = engine.apply(&InboundEvent::text(USER, "sí"), Some(&session), now());
            assert_eq!(transition.change, SessionChange::Keep);
            assert_eq!(sent_bodies(&transition), vec![USE_BUTTONS.to_owned()]);
        }
    }

    #[test]
    fn out_of_set_choice_is_unrecognized_and_reprompts() {
        let engine = engine();
        let (session, _) = drive(&quotation_events()[..4]);
        let session = session.expect("session exists");

        for raw in ["propuesta_cro", "btn_confirmar_cita", "btn_descuento"] {
            let transition = engine.apply(&InboundEvent::choice(USER, raw), Some(&session), now());
            assert_eq!(transition.change, SessionChange::Keep, "{raw}");
            assert_eq!(
                transition.rejection,
                Some(FlowError::UnrecognizedChoice { choice: raw.to_owned() })
            );
            let bodies = sent_bodies(&transition);
            assert!(bodies[1].contains("¿Tiene tienda ecommerce?"), "{raw} must re-prompt");
        }
    }

    #[test]
    fn rejection_then_valid_answer_matches_direct_answer() {
        let engine = engine();
        let (start, _) = drive(&quotation_events()[..1]);
        let start = start.expect("session exists");

        let direct = engine.apply(&InboundEvent::text(USER, "TechStore"), Some(&start), now());
        let rejected = engine.apply(&InboundEvent::text(USER, " "), Some(&start), now());
        assert_eq!(rejected.change, SessionChange::Keep);
        let retried = engine.apply(&InboundEvent::text(USER, "TechStore"), Some(&start), now());

        assert_eq!(direct, retried);
    }

    #[test]
    fn confirm_with_incomplete_fields_discards_session() {
        let mut events = quotation_events()[..2].to_vec();
        events.push(InboundEvent::choice(USER, "btn_confirmar_cotizacion"));
        let (session, transitions) = drive(&events);

        let confirm = &transitions[2];
        assert!(session.is_none());
        assert_eq!(confirm.change, SessionChange::Delete(LifecycleStatus::Abandoned));
        assert!(matches!(
            &confirm.rejection,
            Some(FlowError::MissingInformation { flow: FlowKind::Quotation, missing })
                if missing.len() == 4
        ));
        assert!(sent_bodies(confirm)[0].contains(MISSING_INFORMATION));
    }

    #[test]
    fn flow_buttons_without_session_report_expiry() {
        let engine = engine();
        for raw in ["ecommerce_no", "propuesta_shopify", "btn_confirmar_cotizacion", "btn_confirmar_cita"] {
            let transition = engine.apply(&InboundEvent::choice(USER, raw), None, now());
            assert_eq!(transition.change, SessionChange::Keep);
            assert_eq!(transition.rejection, Some(FlowError::SessionRestartDetected));
            let bodies = sent_bodies(&transition);
            assert!(bodies[0].contains("Sesión Expirada"));
            assert!(bodies[1].contains("¡Bienvenido!"));
        }
    }

    #[test]
    fn free_text_without_session_shows_menu() {
        let transition = engine().apply(&InboundEvent::text(USER, "hola"), None, now());
        assert_eq!(transition.change, SessionChange::Keep);
        assert_eq!(transition.rejection, None);
        let [Effect::Send(PromptSpec::Choice(menu))] = transition.effects.as_slice() else {
            panic!("main menu expected");
        };
        assert_eq!(menu.header.as_deref(), Some("Digit Deck"));
    }

    #[test]
    fn first_text_after_restart_reports_expiry_before_the_menu() {
        let event = InboundEvent::text(USER, "Venta de tecnología");
        let transition = engine().apply_on_first_contact(&event, None, now());

        assert_eq!(transition.change, SessionChange::Keep);
        assert_eq!(transition.rejection, Some(FlowError::SessionRestartDetected));
        let bodies = sent_bodies(&transition);
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].contains("Sesión Expirada"));
        assert!(bodies[1].contains("¡Bienvenido!"));
    }

    #[test]
    fn first_menu_selection_after_restart_still_starts_the_flow() {
        let event = InboundEvent::choice(USER, "btn_cotizacion");
        let transition = engine().apply_on_first_contact(&event, None, now());

        assert_eq!(transition.change, SessionChange::Start(FlowKind::Quotation));
        let bodies = sent_bodies(&transition);
        assert!(bodies[0].contains("Sesión Expirada"));
        assert!(bodies[1].contains("Pregunta 1 de 5"));
    }

    #[test]
    fn first_flow_button_after_restart_gets_a_single_notice() {
        let event = InboundEvent::choice(USER, "ecommerce_si");
        let transition = engine().apply_on_first_contact(&event, None, now());

        let notices =
            sent_bodies(&transition).iter().filter(|body| body.contains("Sesión Expirada")).count();
        assert_eq!(notices, 1);
        assert_eq!(transition.rejection, Some(FlowError::SessionRestartDetected));
    }

    #[test]
    fn first_contact_with_a_live_session_is_a_plain_step() {
        let (session, _) = drive(&quotation_events()[..1]);
        let engine = engine();
        let event = InboundEvent::text(USER, "TechStore");

        assert_eq!(
            engine.apply_on_first_contact(&event, session.as_ref(), now()),
            engine.apply(&event, session.as_ref(), now())
        );
    }

    #[test]
    fn cancel_discards_and_names_the_flow() {
        let (session, _) = drive(&quotation_events()[..3]);
        let transition = engine().apply(&InboundEvent::choice(USER, "btn_cancelar"), session.as_ref(), now());
        assert_eq!(transition.change, SessionChange::Delete(LifecycleStatus::Abandoned));
        assert_eq!(sent_bodies(&transition)[0], "❌ Cotización cancelada.");

        let idle = engine().apply(&InboundEvent::choice(USER, "btn_volver_menu"), None, now());
        assert_eq!(idle.change, SessionChange::Keep);
    }

    #[test]
    fn restarting_mid_flow_replaces_the_session() {
        let (session, _) = drive(&quotation_events()[..3]);
        let transition =
            engine().apply(&InboundEvent::choice(USER, "btn_agendar_cita"), session.as_ref(), now());
        assert_eq!(transition.change, SessionChange::Start(FlowKind::Appointment));
    }

    #[test]
    fn appointment_flow_books_a_validated_candidate() {
        let events = [
            InboundEvent::choice(USER, "btn_agendar_cita"),
            InboundEvent::text(USER, "ana@b"),
            InboundEvent::text(USER, "ana@digitdeck.co"),
            InboundEvent::text(USER, "Ana Gómez"),
            InboundEvent::text(USER, "Auditoría CRO"),
            InboundEvent::text(USER, "25/01/2020 14:30"),
            InboundEvent::text(USER, "25/01/2025 14:30"),
            InboundEvent::choice(USER, "btn_confirmar_cotizacion"),
            InboundEvent::choice(USER, "btn_confirmar_cita"),
        ];
        let (session, transitions) = drive(&events);

        assert_eq!(sent_bodies(&transitions[1]), vec![INVALID_EMAIL.to_owned()]);
        assert!(matches!(
            transitions[5].rejection,
            Some(FlowError::ValidationRejected { field: FieldName::RequestedAt, .. })
        ));
        let SessionChange::Put(review) = &transitions[6].change else {
            panic!("valid date must advance");
        };
        assert!(matches!(
            review.progress,
            FlowProgress::Appointment { step: AppointmentStep::Review, .. }
        ));
        assert!(matches!(transitions[7].rejection, Some(FlowError::UnrecognizedChoice { .. })));

        let [Effect::BookAppointment(candidate)] = transitions[8].effects.as_slice() else {
            panic!("confirm must book exactly once");
        };
        assert_eq!(candidate.contact_user_id, UserId::new(USER));
        assert_eq!(candidate.contact_email, "ana@digitdeck.co");
        let expected = now() + Duration::days(15) + Duration::hours(4) + Duration::minutes(30);
        assert_eq!(candidate.scheduled_at, expected);
        assert!(session.is_none());
    }

    #[test]
    fn unsupported_messages_get_menu_without_change() {
        let (session, _) = drive(&quotation_events()[..2]);
        let event = InboundEvent {
            user_id: UserId::new(USER),
            message_id: None,
            kind: crate::flows::events::InboundKind::Unsupported { message_type: "image".to_owned() },
        };
        let transition = engine().apply(&event, session.as_ref(), now());
        assert_eq!(transition.change, SessionChange::Keep);
        assert_eq!(transition.effects.len(), 2);
    }
}
