use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::appointment::AppointmentCandidate;
use crate::domain::proposal::{EcommercePresence, ProposalRequest, ProposalType};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Quotation,
    Appointment,
}

impl FlowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quotation => "quotation",
            Self::Appointment => "appointment",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Active,
    Completed,
    Abandoned,
}

/// Field names as they appear in audit metadata and proposal prompts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldName {
    CompanyName,
    Activity,
    Need,
    HasEcommerce,
    ProposalType,
    Email,
    ContactName,
    Service,
    RequestedAt,
}

impl FieldName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CompanyName => "companyName",
            Self::Activity => "activity",
            Self::Need => "need",
            Self::HasEcommerce => "hasEcommerce",
            Self::ProposalType => "proposalType",
            Self::Email => "email",
            Self::ContactName => "contactName",
            Self::Service => "service",
            Self::RequestedAt => "requestedAt",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotationStep {
    CompanyName,
    Activity,
    Need,
    HasEcommerce,
    ProposalType,
    Review,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStep {
    Email,
    ContactName,
    Service,
    RequestedAt,
    Review,
}

/// A value that passed its step's validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AcceptedValue {
    Text(String),
    Ecommerce(EcommercePresence),
    Proposal(ProposalType),
    Instant(DateTime<Utc>),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationFields {
    pub company_name: Option<String>,
    pub activity: Option<String>,
    pub need: Option<String>,
    pub has_ecommerce: Option<EcommercePresence>,
    pub proposal_type: Option<ProposalType>,
}

impl QuotationFields {
    pub fn record(&mut self, field: FieldName, value: AcceptedValue) -> Result<(), DomainError> {
        match (field, value) {
            (FieldName::CompanyName, AcceptedValue::Text(text)) => {
                set_once(&mut self.company_name, text, field)
            }
            (FieldName::Activity, AcceptedValue::Text(text)) => {
                set_once(&mut self.activity, text, field)
            }
            (FieldName::Need, AcceptedValue::Text(text)) => set_once(&mut self.need, text, field),
            (FieldName::HasEcommerce, AcceptedValue::Ecommerce(presence)) => {
                set_once(&mut self.has_ecommerce, presence, field)
            }
            (FieldName::ProposalType, AcceptedValue::Proposal(kind)) => {
                set_once(&mut self.proposal_type, kind, field)
            }
            (field, value) => Err(DomainError::FieldTypeMismatch {
                field,
                value: format!("{value:?}"),
            }),
        }
    }

    pub fn missing(&self) -> Vec<FieldName> {
        let mut missing = Vec::new();
        if self.company_name.is_none() {
            missing.push(FieldName::CompanyName);
        }
        if self.activity.is_none() {
            missing.push(FieldName::Activity);
        }
        if self.need.is_none() {
            missing.push(FieldName::Need);
        }
        if self.has_ecommerce.is_none() {
            missing.push(FieldName::HasEcommerce);
        }
        if self.proposal_type.is_none() {
            missing.push(FieldName::ProposalType);
        }
        missing
    }

    /// Only a fully collected form turns into a generator request.
    pub fn to_request(&self) -> Option<ProposalRequest> {
        Some(ProposalRequest {
            company_name: self.company_name.clone()?,
            activity: self.activity.clone()?,
            need: self.need.clone()?,
            has_ecommerce: self.has_ecommerce?,
            proposal_type: self.proposal_type?,
        })
    }

    fn collected(&self) -> Vec<(FieldName, String)> {
        let mut fields = Vec::new();
        if let Some(value) = &self.company_name {
            fields.push((FieldName::CompanyName, value.clone()));
        }
        if let Some(value) = &self.activity {
            fields.push((FieldName::Activity, value.clone()));
        }
        if let Some(value) = &self.need {
            fields.push((FieldName::Need, value.clone()));
        }
        if let Some(value) = self.has_ecommerce {
            fields.push((FieldName::HasEcommerce, value.label().to_owned()));
        }
        if let Some(value) = self.proposal_type {
            fields.push((FieldName::ProposalType, value.label().to_owned()));
        }
        fields
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFields {
    pub email: Option<String>,
    pub contact_name: Option<String>,
    pub service: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
}

impl AppointmentFields {
    pub fn record(&mut self, field: FieldName, value: AcceptedValue) -> Result<(), DomainError> {
        match (field, value) {
            (FieldName::Email, AcceptedValue::Text(text)) => set_once(&mut self.email, text, field),
            (FieldName::ContactName, AcceptedValue::Text(text)) => {
                set_once(&mut self.contact_name, text, field)
            }
            (FieldName::Service, AcceptedValue::Text(text)) => {
                set_once(&mut self.service, text, field)
            }
            (FieldName::RequestedAt, AcceptedValue::Instant(at)) => {
                set_once(&mut self.requested_at, at, field)
            }
            (field, value) => Err(DomainError::FieldTypeMismatch {
                field,
                value: format!("{value:?}"),
            }),
        }
    }

    pub fn missing(&self) -> Vec<FieldName> {
        let mut missing = Vec::new();
        if self.email.is_none() {
            missing.push(FieldName::Email);
        }
        if self.contact_name.is_none() {
            missing.push(FieldName::ContactName);
        }
        if self.service.is_none() {
            missing.push(FieldName::Service);
        }
        if self.requested_at.is_none() {
            missing.push(FieldName::RequestedAt);
        }
        missing
    }

    pub fn to_candidate(&self, contact: &UserId) -> Option<AppointmentCandidate> {
        Some(AppointmentCandidate {
            contact_user_id: contact.clone(),
            contact_email: self.email.clone()?,
            contact_name: self.contact_name.clone()?,
            service: self.service.clone()?,
            scheduled_at: self.requested_at?,
        })
    }

    fn collected(&self) -> Vec<(FieldName, String)> {
        let mut fields = Vec::new();
        if let Some(value) = &self.email {
            fields.push((FieldName::Email, value.clone()));
        }
        if let Some(value) = &self.contact_name {
            fields.push((FieldName::ContactName, value.clone()));
        }
        if let Some(value) = &self.service {
            fields.push((FieldName::Service, value.clone()));
        }
        if let Some(value) = self.requested_at {
            fields.push((FieldName::RequestedAt, value.to_rfc3339()));
        }
        fields
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, field: FieldName) -> Result<(), DomainError> {
    if slot.is_some() {
        return Err(DomainError::FieldAlreadyCollected(field));
    }
    *slot = Some(value);
    Ok(())
}

/// Step tag and collected fields travel together so a quotation step can
/// never be paired with appointment fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowProgress {
    Quotation { step: QuotationStep, fields: QuotationFields },
    Appointment { step: AppointmentStep, fields: AppointmentFields },
}

impl FlowProgress {
    pub fn start(kind: FlowKind) -> Self {
        crate::flows::definitions::start_of(kind)
    }

    pub fn kind(&self) -> FlowKind {
        match self {
            Self::Quotation { .. } => FlowKind::Quotation,
            Self::Appointment { .. } => FlowKind::Appointment,
        }
    }

    pub fn step_name(&self) -> String {
        match self {
            Self::Quotation { step, .. } => format!("{step:?}"),
            Self::Appointment { step, .. } => format!("{step:?}"),
        }
    }

    pub fn collected_fields(&self) -> Vec<(FieldName, String)> {
        match self {
            Self::Quotation { fields, .. } => fields.collected(),
            Self::Appointment { fields, .. } => fields.collected(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub progress: FlowProgress,
    pub status: LifecycleStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn start(user_id: UserId, kind: FlowKind, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            progress: FlowProgress::start(kind),
            status: LifecycleStatus::Active,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> FlowKind {
        self.progress.kind()
    }

    /// Accepted fields in step order.
    pub fn collected_fields(&self) -> Vec<(FieldName, String)> {
        self.progress.collected_fields()
    }
}
