use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Every button identifier the bot ever emits. Anything else arriving from the
/// channel is kept verbatim as [`Selection::Unrecognized`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceId {
    StartQuotation,
    StartAppointment,
    Info,
    Help,
    NewQuotation,
    BackToMenu,
    Cancel,
    EcommerceYes,
    EcommerceNo,
    ProposalShopify,
    ProposalCro,
    ProposalBoth,
    ConfirmQuotation,
    ConfirmAppointment,
}

impl ChoiceId {
    pub const ALL: [ChoiceId; 14] = [
        Self::StartQuotation,
        Self::StartAppointment,
        Self::Info,
        Self::Help,
        Self::NewQuotation,
        Self::BackToMenu,
        Self::Cancel,
        Self::EcommerceYes,
        Self::EcommerceNo,
        Self::ProposalShopify,
        Self::ProposalCro,
        Self::ProposalBoth,
        Self::ConfirmQuotation,
        Self::ConfirmAppointment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartQuotation => "btn_cotizacion",
            Self::StartAppointment => "btn_agendar_cita",
            Self::Info => "btn_info",
            Self::Help => "btn_ayuda",
            Self::NewQuotation => "btn_nueva_cotizacion",
            Self::BackToMenu => "btn_volver_menu",
            Self::Cancel => "btn_cancelar",
            Self::EcommerceYes => "ecommerce_si",
            Self::EcommerceNo => "ecommerce_no",
            Self::ProposalShopify => "propuesta_shopify",
            Self::ProposalCro => "propuesta_cro",
            Self::ProposalBoth => "propuesta_ambas",
            Self::ConfirmQuotation => "btn_confirmar_cotizacion",
            Self::ConfirmAppointment => "btn_confirmar_cita",
        }
    }

    pub fn parse(raw: &str) -> Selection {
        Self::ALL
            .into_iter()
            .find(|choice| choice.as_str() == raw)
            .map(Selection::Choice)
            .unwrap_or_else(|| Selection::Unrecognized(raw.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Choice(ChoiceId),
    Unrecognized(String),
}

impl Selection {
    pub fn raw(&self) -> &str {
        match self {
            Self::Choice(choice) => choice.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundKind {
    FreeText(String),
    Choice(Selection),
    /// Media, locations, stickers and anything else that is neither text nor
    /// a button reply.
    Unsupported { message_type: String },
}

impl InboundKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FreeText(_) => "free_text",
            Self::Choice(_) => "choice",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: UserId,
    /// Channel message id, used for read receipts and as correlation id.
    pub message_id: Option<String>,
    pub kind: InboundKind,
}

impl InboundEvent {
    pub fn text(user_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            message_id: None,
            kind: InboundKind::FreeText(body.into()),
        }
    }

    pub fn choice(user_id: impl Into<String>, raw_id: &str) -> Self {
        Self {
            user_id: UserId::new(user_id),
            message_id: None,
            kind: InboundKind::Choice(ChoiceId::parse(raw_id)),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }
}
