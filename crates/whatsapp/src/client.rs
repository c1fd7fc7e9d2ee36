use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use deckbot_core::config::WhatsAppConfig;
use deckbot_core::domain::UserId;
use deckbot_core::errors::CollaboratorError;
use deckbot_core::flows::prompts::ChoicePrompt;
use deckbot_core::ports::{MessageChannel, RenderedDocument};

use crate::messages::{OutboundMessage, ReadReceipt};

/// Graph API client bound to one business phone number.
#[derive(Clone)]
pub struct CloudApiClient {
    http: Client,
    base_url: String,
    phone_number_id: String,
    access_token: SecretString,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    id: String,
}

impl CloudApiClient {
    pub fn new(
        base_url: impl Into<String>,
        phone_number_id: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let http = Client::builder().timeout(timeout).build().map_err(|error| {
            CollaboratorError::Channel(format!("failed to build WhatsApp HTTP client: {error}"))
        })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            phone_number_id: phone_number_id.into(),
            access_token,
        })
    }

    pub fn from_config(config: &WhatsAppConfig) -> Result<Self, CollaboratorError> {
        Self::new(
            config.api_base_url.clone(),
            config.phone_number_id.clone(),
            config.access_token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn messages_url(&self) -> String {
        format!("{}/{}/messages", self.base_url, self.phone_number_id)
    }

    pub fn media_url(&self) -> String {
        format!("{}/{}/media", self.base_url, self.phone_number_id)
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<(), CollaboratorError> {
        let request = self.http.post(self.messages_url()).json(message);
        self.execute(request, message.kind()).await?;
        debug!(
            event_name = "whatsapp.message_sent",
            kind = message.kind(),
            to = %message.to,
            "message accepted by cloud api"
        );
        Ok(())
    }

    /// Uploads the document and returns the media id WhatsApp assigned it.
    pub async fn upload_media(
        &self,
        document: &RenderedDocument,
    ) -> Result<String, CollaboratorError> {
        let part = multipart::Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)
            .map_err(|error| CollaboratorError::Channel(format!("invalid media type: {error}")))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("messaging_product", "whatsapp")
            .text("type", document.mime_type.clone());

        let request = self.http.post(self.media_url()).multipart(form);
        let response = self.execute(request, "media").await?;
        let uploaded: MediaUploadResponse = response.json().await.map_err(|error| {
            CollaboratorError::Channel(format!("media upload returned no id: {error}"))
        })?;
        debug!(
            event_name = "whatsapp.media_uploaded",
            media_id = %uploaded.id,
            file_name = %document.file_name,
            bytes = document.bytes.len(),
            "document uploaded"
        );
        Ok(uploaded.id)
    }

    pub async fn mark_as_read(&self, message_id: &str) -> Result<(), CollaboratorError> {
        let request = self.http.post(self.messages_url()).json(&ReadReceipt::new(message_id));
        self.execute(request, "read_receipt").await.map(|_| ())
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        kind: &'static str,
    ) -> Result<Response, CollaboratorError> {
        let response = request
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|error| {
                CollaboratorError::Channel(format!("{kind} request failed: {error}"))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            event_name = "whatsapp.request_rejected",
            kind,
            status = status.as_u16(),
            body = %truncate(&body, 300),
            "cloud api rejected request"
        );
        Err(CollaboratorError::Channel(format!(
            "{kind} request returned {status}: {}",
            truncate(&body, 300)
        )))
    }
}

#[async_trait]
impl MessageChannel for CloudApiClient {
    async fn send_text(&self, to: &UserId, body: &str) -> Result<(), CollaboratorError> {
        self.send(&OutboundMessage::text(to.as_str(), body)).await
    }

    async fn send_choice_prompt(
        &self,
        to: &UserId,
        prompt: &ChoicePrompt,
    ) -> Result<(), CollaboratorError> {
        let message = OutboundMessage::buttons(to.as_str(), prompt)
            .map_err(|error| CollaboratorError::Channel(error.to_string()))?;
        self.send(&message).await
    }

    async fn send_document(
        &self,
        to: &UserId,
        document: &RenderedDocument,
        caption: &str,
    ) -> Result<(), CollaboratorError> {
        let media_id = self.upload_media(document).await?;
        self.send(&OutboundMessage::document(to.as_str(), media_id, &document.file_name, caption))
            .await
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
