//! Decoding of Cloud API webhook notifications into core inbound events.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use deckbot_core::domain::UserId;
use deckbot_core::flows::events::{ChoiceId, InboundEvent, InboundKind};

pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// The business number itself; echoes from it must never start a flow.
pub const BUSINESS_SENDER: &str = "16465894168";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook body is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("webhook object `{0}` is not a WhatsApp business account notification")]
    UnexpectedObject(String),
}

#[derive(Debug, Deserialize)]
struct Notification {
    object: String,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<WireMessage>,
    #[serde(default)]
    statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    from: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    message_type: String,
    #[serde(default)]
    text: Option<WireText>,
    #[serde(default)]
    interactive: Option<WireInteractive>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    body: String,
}

#[derive(Debug, Deserialize)]
struct WireInteractive {
    #[serde(default)]
    button_reply: Option<WireReply>,
    #[serde(default)]
    list_reply: Option<WireReply>,
}

#[derive(Debug, Deserialize)]
struct WireReply {
    id: String,
}

/// What one webhook notification carried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WebhookBatch {
    pub events: Vec<InboundEvent>,
    /// Delivery and read status updates, which need no reply.
    pub status_updates: usize,
    pub ignored_senders: usize,
}

#[derive(Clone, Debug)]
pub struct WebhookDecoder {
    ignored_senders: Vec<String>,
}

impl Default for WebhookDecoder {
    fn default() -> Self {
        Self { ignored_senders: vec![BUSINESS_SENDER.to_owned()] }
    }
}

impl WebhookDecoder {
    pub fn new(ignored_senders: Vec<String>) -> Self {
        Self { ignored_senders }
    }

    pub fn decode_str(&self, body: &str) -> Result<WebhookBatch, WebhookError> {
        self.decode(serde_json::from_str(body)?)
    }

    pub fn decode_value(&self, body: serde_json::Value) -> Result<WebhookBatch, WebhookError> {
        self.decode(serde_json::from_value(body)?)
    }

    fn decode(&self, notification: Notification) -> Result<WebhookBatch, WebhookError> {
        if notification.object != BUSINESS_ACCOUNT_OBJECT {
            return Err(WebhookError::UnexpectedObject(notification.object));
        }

        let mut batch = WebhookBatch::default();
        let values = notification
            .entry
            .into_iter()
            .flat_map(|entry| entry.changes)
            .map(|change| change.value);
        for value in values {
            batch.status_updates += value.statuses.len();
            for message in value.messages {
                if self.ignored_senders.iter().any(|sender| *sender == message.from) {
                    debug!(
                        event_name = "whatsapp.sender_ignored",
                        from = %message.from,
                        "ignoring message"
                    );
                    batch.ignored_senders += 1;
                    continue;
                }
                batch.events.push(to_event(message));
            }
        }
        Ok(batch)
    }
}

fn to_event(message: WireMessage) -> InboundEvent {
    let kind = match (message.message_type.as_str(), message.text, message.interactive) {
        ("text", Some(text), _) => InboundKind::FreeText(text.body),
        ("interactive", _, Some(interactive)) => {
            match interactive.button_reply.or(interactive.list_reply) {
                Some(reply) => InboundKind::Choice(ChoiceId::parse(&reply.id)),
                None => InboundKind::Unsupported { message_type: message.message_type },
            }
        }
        _ => InboundKind::Unsupported { message_type: message.message_type },
    };
    InboundEvent { user_id: UserId::new(message.from), message_id: message.id, kind }
}
