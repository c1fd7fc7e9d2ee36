use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use deckbot_core::errors::CollaboratorError;
use deckbot_core::flows::events::InboundEvent;
use deckbot_core::orchestrator::FlowOrchestrator;

use crate::client::CloudApiClient;
use crate::events::WebhookDecoder;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Source of decoded inbound events. Acknowledging a message marks it read.
#[async_trait]
pub trait InboundTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError>;
    async fn acknowledge(&self, message_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

#[async_trait]
pub trait ReadReceipts: Send + Sync {
    async fn mark_as_read(&self, message_id: &str) -> Result<(), CollaboratorError>;
}

#[async_trait]
impl ReadReceipts for CloudApiClient {
    async fn mark_as_read(&self, message_id: &str) -> Result<(), CollaboratorError> {
        CloudApiClient::mark_as_read(self, message_id).await
    }
}

/// Hands one event to whatever processes it and returns the task doing so.
pub trait InboundDispatcher: Send + Sync {
    fn dispatch(&self, event: InboundEvent) -> JoinHandle<()>;
}

impl InboundDispatcher for FlowOrchestrator {
    fn dispatch(&self, event: InboundEvent) -> JoinHandle<()> {
        // The user's turn is reserved here, before spawning, so events from
        // one user are processed in arrival order.
        let handled = self.handle(event);
        tokio::spawn(async move {
            let outcome = handled.await;
            if let Some(error) = &outcome.error {
                warn!(
                    event_name = "ingress.whatsapp.event_failed",
                    user_id = %outcome.user_id,
                    correlation_id = %outcome.correlation_id,
                    error = %error,
                    "inbound event finished with an error"
                );
            }
        })
    }
}

async fn acknowledge_with(
    receipts: &Option<Arc<dyn ReadReceipts>>,
    message_id: &str,
) -> Result<(), TransportError> {
    match receipts {
        Some(receipts) => receipts
            .mark_as_read(message_id)
            .await
            .map_err(|error| TransportError::Acknowledge(error.to_string())),
        None => Ok(()),
    }
}

/// Lets any ingress (an HTTP endpoint, a queue consumer, a test) push
/// already-decoded events into the runner.
pub struct ChannelTransport {
    receiver: Mutex<mpsc::Receiver<InboundEvent>>,
    receipts: Option<Arc<dyn ReadReceipts>>,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<InboundEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { receiver: Mutex::new(receiver), receipts: None }, sender)
    }

    pub fn with_read_receipts(mut self, receipts: Arc<dyn ReadReceipts>) -> Self {
        self.receipts = Some(receipts);
        self
    }
}

#[async_trait]
impl InboundTransport for ChannelTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError> {
        Ok(self.receiver.lock().await.recv().await)
    }

    async fn acknowledge(&self, message_id: &str) -> Result<(), TransportError> {
        acknowledge_with(&self.receipts, message_id).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.receiver.lock().await.close();
        Ok(())
    }
}

/// Reads one raw webhook notification per line, e.g. piped from a webhook
/// relay. Lines that do not decode are logged and skipped.
pub struct JsonLinesTransport<R> {
    lines: Mutex<Lines<R>>,
    pending: Mutex<VecDeque<InboundEvent>>,
    decoder: WebhookDecoder,
    receipts: Option<Arc<dyn ReadReceipts>>,
}

impl JsonLinesTransport<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> JsonLinesTransport<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
            pending: Mutex::new(VecDeque::new()),
            decoder: WebhookDecoder::default(),
            receipts: None,
        }
    }

    pub fn with_decoder(mut self, decoder: WebhookDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_read_receipts(mut self, receipts: Arc<dyn ReadReceipts>) -> Self {
        self.receipts = Some(receipts);
        self
    }
}

#[async_trait]
impl<R> InboundTransport for JsonLinesTransport<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError> {
        let mut pending = self.pending.lock().await;
        let mut lines = self.lines.lock().await;
        loop {
            if let Some(event) = pending.pop_front() {
                return Ok(Some(event));
            }

            let Some(line) =
                lines.next_line().await.map_err(|error| TransportError::Receive(error.to_string()))?
            else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            match self.decoder.decode_str(&line) {
                Ok(batch) => {
                    debug!(
                        event_name = "ingress.whatsapp.webhook_decoded",
                        events = batch.events.len(),
                        status_updates = batch.status_updates,
                        ignored_senders = batch.ignored_senders,
                        "webhook notification decoded"
                    );
                    pending.extend(batch.events);
                }
                Err(error) => {
                    warn!(
                        event_name = "ingress.whatsapp.webhook_rejected",
                        error = %error,
                        "skipping undecodable webhook line"
                    );
                }
            }
        }
    }

    async fn acknowledge(&self, message_id: &str) -> Result<(), TransportError> {
        acknowledge_with(&self.receipts, message_id).await
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub struct InboundRunner {
    transport: Arc<dyn InboundTransport>,
    dispatcher: Arc<dyn InboundDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl InboundRunner {
    pub fn new(
        transport: Arc<dyn InboundTransport>,
        dispatcher: Arc<dyn InboundDispatcher>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Pumps events until the transport closes, reconnecting with back-off on
    /// failure. In-flight events are awaited before returning.
    pub async fn start(&self) -> Result<()> {
        let mut in_flight = Vec::new();
        self.pump_with_retries(&mut in_flight).await;
        drain(in_flight).await;
        Ok(())
    }

    /// Like [`InboundRunner::start`], but stops reading as soon as `shutdown`
    /// resolves and then gives in-flight events at most `grace` to finish.
    pub async fn run_until<F>(&self, shutdown: F, grace: Duration) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut in_flight = Vec::new();
        let interrupted = tokio::select! {
            () = self.pump_with_retries(&mut in_flight) => false,
            () = shutdown => true,
        };

        let pending = in_flight.len();
        if tokio::time::timeout(grace, drain(in_flight)).await.is_err() {
            warn!(
                event_name = "ingress.whatsapp.drain_timeout",
                pending,
                grace_ms = grace.as_millis() as u64,
                "in-flight events did not finish within the shutdown grace period"
            );
        }
        debug!(interrupted, "inbound runner stopped");
        Ok(())
    }

    async fn pump_with_retries(&self, in_flight: &mut Vec<JoinHandle<()>>) {
        for attempt in 0..=self.reconnect_policy.max_retries {
            let Err(transport_error) = self.connect_and_pump(attempt, in_flight).await else {
                return;
            };
            warn!(
                attempt,
                max_retries = self.reconnect_policy.max_retries,
                error = %transport_error,
                "inbound transport failed"
            );

            if attempt >= self.reconnect_policy.max_retries {
                warn!(
                    max_retries = self.reconnect_policy.max_retries,
                    "inbound transport retries exhausted; continuing process without crash"
                );
                return;
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn connect_and_pump(
        &self,
        attempt: u32,
        in_flight: &mut Vec<JoinHandle<()>>,
    ) -> Result<(), TransportError> {
        info!(attempt, "opening inbound transport");
        self.transport.connect().await?;
        info!(attempt, "inbound transport connected");

        loop {
            let Some(event) = self.transport.next_event().await? else {
                info!(attempt, "inbound transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let message_id = event.message_id.clone().unwrap_or_default();

            info!(
                event_name = "ingress.whatsapp.message_received",
                user_id = %event.user_id,
                message_id = %message_id,
                kind = event.kind.label(),
                "received whatsapp message"
            );

            if !message_id.is_empty() {
                if let Err(error) = self.transport.acknowledge(&message_id).await {
                    warn!(
                        event_name = "ingress.whatsapp.read_receipt",
                        message_id = %message_id,
                        error = %error,
                        "failed to mark message as read"
                    );
                } else {
                    debug!(
                        event_name = "ingress.whatsapp.read_receipt",
                        message_id = %message_id,
                        "marked message as read"
                    );
                }
            }

            in_flight.retain(|handle| !handle.is_finished());
            in_flight.push(self.dispatcher.dispatch(event));
        }
    }
}

async fn drain(in_flight: Vec<JoinHandle<()>>) {
    let draining = in_flight.len();
    for handle in in_flight {
        if let Err(error) = handle.await {
            warn!(error = %error, "inbound event task panicked");
        }
    }
    debug!(draining, "inbound runner drained");
}
