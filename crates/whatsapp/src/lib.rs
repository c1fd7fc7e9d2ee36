//! WhatsApp Cloud API channel for deckbot.
//!
//! - **Messages** (`messages`) - outbound text, reply-button and document payloads
//! - **Client** (`client`) - Graph API client; the bot's `MessageChannel`
//! - **Events** (`events`) - webhook notifications decoded into core events
//! - **Runner** (`runner`) - inbound event loop with reconnect back-off
//!
//! ```text
//! webhook relay → InboundTransport → InboundRunner → FlowOrchestrator
//!                                                        ↓
//!                              Cloud API ← CloudApiClient (MessageChannel)
//! ```

pub mod client;
pub mod events;
pub mod messages;
pub mod runner;

pub use client::CloudApiClient;
pub use events::{WebhookBatch, WebhookDecoder, WebhookError};
pub use messages::{OutboundMessage, PayloadError, ReadReceipt};
pub use runner::{
    ChannelTransport, InboundDispatcher, InboundRunner, InboundTransport, JsonLinesTransport,
    ReadReceipts, ReconnectPolicy, TransportError,
};
