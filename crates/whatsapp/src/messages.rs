//! Outbound Cloud API payloads.

use serde::Serialize;
use thiserror::Error;

use deckbot_core::flows::prompts::ChoicePrompt;

/// Reply buttons per interactive message.
pub const MAX_BUTTONS: usize = 3;
/// Characters shown on a reply button before WhatsApp rejects the payload.
pub const MAX_BUTTON_TITLE_CHARS: usize = 20;
pub const MAX_BODY_CHARS: usize = 1024;
pub const MAX_HEADER_CHARS: usize = 60;

const MESSAGING_PRODUCT: &str = "whatsapp";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("interactive message needs 1..={MAX_BUTTONS} buttons, got {0}")]
    ButtonCount(usize),
    #[error("interactive body exceeds {MAX_BODY_CHARS} characters")]
    BodyTooLong,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    messaging_product: &'static str,
    recipient_type: &'static str,
    pub to: String,
    #[serde(flatten)]
    pub content: MessageContent,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextBody },
    Interactive { interactive: Interactive },
    Document { document: DocumentRef },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextBody {
    pub preview_url: bool,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Interactive {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<InteractiveHeader>,
    pub body: InteractiveText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<InteractiveText>,
    pub action: ButtonAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractiveHeader {
    #[serde(rename = "type")]
    kind: &'static str,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InteractiveText {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonAction {
    pub buttons: Vec<ReplyButton>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyButton {
    #[serde(rename = "type")]
    kind: &'static str,
    pub reply: ButtonReply,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub id: String,
    pub filename: String,
    pub caption: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadReceipt {
    messaging_product: &'static str,
    status: &'static str,
    pub message_id: String,
}

impl OutboundMessage {
    fn new(to: &str, content: MessageContent) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            recipient_type: "individual",
            to: to.to_owned(),
            content,
        }
    }

    pub fn text(to: &str, body: impl Into<String>) -> Self {
        let text = TextBody { preview_url: false, body: body.into() };
        Self::new(to, MessageContent::Text { text })
    }

    pub fn buttons(to: &str, prompt: &ChoicePrompt) -> Result<Self, PayloadError> {
        if prompt.options.is_empty() || prompt.options.len() > MAX_BUTTONS {
            return Err(PayloadError::ButtonCount(prompt.options.len()));
        }
        if prompt.body.chars().count() > MAX_BODY_CHARS {
            return Err(PayloadError::BodyTooLong);
        }

        let buttons = prompt
            .options
            .iter()
            .map(|option| ReplyButton {
                kind: "reply",
                reply: ButtonReply {
                    id: option.id.as_str().to_owned(),
                    title: clip(&option.label, MAX_BUTTON_TITLE_CHARS),
                },
            })
            .collect();

        let interactive = Interactive {
            kind: "button",
            header: prompt.header.as_deref().map(|text| InteractiveHeader {
                kind: "text",
                text: clip(text, MAX_HEADER_CHARS),
            }),
            body: InteractiveText { text: prompt.body.clone() },
            footer: prompt
                .footer
                .as_deref()
                .map(|text| InteractiveText { text: clip(text, MAX_HEADER_CHARS) }),
            action: ButtonAction { buttons },
        };
        Ok(Self::new(to, MessageContent::Interactive { interactive }))
    }

    pub fn document(
        to: &str,
        media_id: impl Into<String>,
        file_name: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self::new(
            to,
            MessageContent::Document {
                document: DocumentRef {
                    id: media_id.into(),
                    filename: file_name.into(),
                    caption: caption.into(),
                },
            },
        )
    }

    pub fn kind(&self) -> &'static str {
        match self.content {
            MessageContent::Text { .. } => "text",
            MessageContent::Interactive { .. } => "interactive",
            MessageContent::Document { .. } => "document",
        }
    }
}

impl ReadReceipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self { messaging_product: MESSAGING_PRODUCT, status: "read", message_id: message_id.into() }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
