use std::fmt::Debug;

use crate::domain::{
    AcceptedValue, AppointmentFields, AppointmentStep, EcommercePresence, FieldName, FlowKind,
    FlowProgress, ProposalType, QuotationFields, QuotationStep,
};
use crate::errors::DomainError;
use crate::flows::events::ChoiceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextRule {
    NonEmpty,
    Email,
    FutureDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepInput {
    FreeText(TextRule),
    Choice(&'static [ChoiceId]),
    /// Waits for the flow's confirm button or cancel.
    Review,
}

pub trait FieldRecord: Clone {
    fn record(&mut self, field: FieldName, value: AcceptedValue) -> Result<(), DomainError>;
    fn missing(&self) -> Vec<FieldName>;
}

impl FieldRecord for QuotationFields {
    fn record(&mut self, field: FieldName, value: AcceptedValue) -> Result<(), DomainError> {
        QuotationFields::record(self, field, value)
    }

    fn missing(&self) -> Vec<FieldName> {
        QuotationFields::missing(self)
    }
}

impl FieldRecord for AppointmentFields {
    fn record(&mut self, field: FieldName, value: AcceptedValue) -> Result<(), DomainError> {
        AppointmentFields::record(self, field, value)
    }

    fn missing(&self) -> Vec<FieldName> {
        AppointmentFields::missing(self)
    }
}

/// Static description of one conversational form.
pub trait FlowDefinition {
    type Step: Copy + Eq + Debug;
    type Fields: FieldRecord;

    fn first_step(&self) -> Self::Step;
    fn input(&self, step: Self::Step) -> StepInput;
    /// Field written when `step` accepts a value. `None` only for review.
    fn field(&self, step: Self::Step) -> Option<FieldName>;
    fn successor(&self, step: Self::Step, accepted: &AcceptedValue) -> Self::Step;
    fn confirm_choice(&self) -> ChoiceId;
    fn progress(&self, step: Self::Step, fields: Self::Fields) -> FlowProgress;

    fn initial_progress(&self) -> FlowProgress
    where
        Self::Fields: Default,
    {
        self.progress(self.first_step(), Self::Fields::default())
    }
}

/// Progress of a freshly started flow of `kind`.
pub fn start_of(kind: FlowKind) -> FlowProgress {
    match kind {
        FlowKind::Quotation => QuotationFlow.initial_progress(),
        FlowKind::Appointment => AppointmentFlow.initial_progress(),
    }
}

/// Value carried by a button that answers a form step.
pub fn choice_value(choice: ChoiceId) -> Option<AcceptedValue> {
    match choice {
        ChoiceId::EcommerceYes => Some(AcceptedValue::Ecommerce(EcommercePresence::Yes)),
        ChoiceId::EcommerceNo => Some(AcceptedValue::Ecommerce(EcommercePresence::No)),
        ChoiceId::ProposalShopify => {
            Some(AcceptedValue::Proposal(ProposalType::ShopifyDevelopment))
        }
        ChoiceId::ProposalCro => Some(AcceptedValue::Proposal(ProposalType::Cro)),
        ChoiceId::ProposalBoth => Some(AcceptedValue::Proposal(ProposalType::ShopifyAndCro)),
        _ => None,
    }
}

const ECOMMERCE_OPTIONS: &[ChoiceId] = &[ChoiceId::EcommerceYes, ChoiceId::EcommerceNo];
const PROPOSAL_OPTIONS: &[ChoiceId] =
    &[ChoiceId::ProposalShopify, ChoiceId::ProposalCro, ChoiceId::ProposalBoth];

#[derive(Clone, Copy, Debug, Default)]
pub struct QuotationFlow;

impl FlowDefinition for QuotationFlow {
    type Step = QuotationStep;
    type Fields = QuotationFields;

    fn first_step(&self) -> QuotationStep {
        QuotationStep::CompanyName
    }

    fn input(&self, step: QuotationStep) -> StepInput {
        match step {
            QuotationStep::CompanyName | QuotationStep::Activity | QuotationStep::Need => {
                StepInput::FreeText(TextRule::NonEmpty)
            }
            QuotationStep::HasEcommerce => StepInput::Choice(ECOMMERCE_OPTIONS),
            QuotationStep::ProposalType => StepInput::Choice(PROPOSAL_OPTIONS),
            QuotationStep::Review => StepInput::Review,
        }
    }

    fn field(&self, step: QuotationStep) -> Option<FieldName> {
        match step {
            QuotationStep::CompanyName => Some(FieldName::CompanyName),
            QuotationStep::Activity => Some(FieldName::Activity),
            QuotationStep::Need => Some(FieldName::Need),
            QuotationStep::HasEcommerce => Some(FieldName::HasEcommerce),
            QuotationStep::ProposalType => Some(FieldName::ProposalType),
            QuotationStep::Review => None,
        }
    }

    fn successor(&self, step: QuotationStep, accepted: &AcceptedValue) -> QuotationStep {
        match (step, accepted) {
            (QuotationStep::CompanyName, _) => QuotationStep::Activity,
            (QuotationStep::Activity, _) => QuotationStep::Need,
            (QuotationStep::Need, _) => QuotationStep::HasEcommerce,
            (QuotationStep::HasEcommerce, _) => QuotationStep::ProposalType,
            // Shopify, CRO and the combined offer all converge on review.
            (QuotationStep::ProposalType, AcceptedValue::Proposal(_)) => QuotationStep::Review,
            (QuotationStep::ProposalType, _) | (QuotationStep::Review, _) => step,
        }
    }

    fn confirm_choice(&self) -> ChoiceId {
        ChoiceId::ConfirmQuotation
    }

    fn progress(&self, step: QuotationStep, fields: QuotationFields) -> FlowProgress {
        FlowProgress::Quotation { step, fields }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AppointmentFlow;

impl FlowDefinition for AppointmentFlow {
    type Step = AppointmentStep;
    type Fields = AppointmentFields;

    fn first_step(&self) -> AppointmentStep {
        AppointmentStep::Email
    }

    fn input(&self, step: AppointmentStep) -> StepInput {
        match step {
            AppointmentStep::Email => StepInput::FreeText(TextRule::Email),
            AppointmentStep::ContactName | AppointmentStep::Service => {
                StepInput::FreeText(TextRule::NonEmpty)
            }
            AppointmentStep::RequestedAt => StepInput::FreeText(TextRule::FutureDateTime),
            AppointmentStep::Review => StepInput::Review,
        }
    }

    fn field(&self, step: AppointmentStep) -> Option<FieldName> {
        match step {
            AppointmentStep::Email => Some(FieldName::Email),
            AppointmentStep::ContactName => Some(FieldName::ContactName),
            AppointmentStep::Service => Some(FieldName::Service),
            AppointmentStep::RequestedAt => Some(FieldName::RequestedAt),
            AppointmentStep::Review => None,
        }
    }

    fn successor(&self, step: AppointmentStep, _accepted: &AcceptedValue) -> AppointmentStep {
        match step {
            AppointmentStep::Email => AppointmentStep::ContactName,
            AppointmentStep::ContactName => AppointmentStep::Service,
            AppointmentStep::Service => AppointmentStep::RequestedAt,
            AppointmentStep::RequestedAt | AppointmentStep::Review => AppointmentStep::Review,
        }
    }

    fn confirm_choice(&self) -> ChoiceId {
        ChoiceId::ConfirmAppointment
    }

    fn progress(&self, step: AppointmentStep, fields: AppointmentFields) -> FlowProgress {
        FlowProgress::Appointment { step, fields }
    }
}
