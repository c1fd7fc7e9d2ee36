use std::sync::Arc;

use deckbot_agent::{ChatCompletionsClient, LlmProposalGenerator};
use deckbot_core::config::{AppConfig, ConfigError, LoadOptions};
use deckbot_core::errors::CollaboratorError;
use deckbot_core::{
    Collaborators, FlowEngine, FlowOrchestrator, InMemorySessionStore, SessionStore, SystemClock,
    TracingAuditSink,
};
use deckbot_db::{connect_with_config, migrations, DbPool, SqlAppointmentRepository};
use deckbot_whatsapp::CloudApiClient;
use thiserror::Error;
use tracing::info;

use crate::health::HealthState;
use crate::pdf::{PdfError, PdfRenderer};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: FlowOrchestrator,
    pub channel: Arc<CloudApiClient>,
    pub health: HealthState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("whatsapp client setup failed: {0}")]
    Channel(#[source] CollaboratorError),
    #[error("llm client setup failed: {0}")]
    Llm(String),
    #[error("document renderer setup failed: {0}")]
    Documents(#[from] PdfError),
}

#[cfg(test)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    bootstrap_with_config(AppConfig::load(options)?).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let offset = config.flows.utc_offset()?;

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let channel = Arc::new(
        CloudApiClient::from_config(&config.whatsapp).map_err(BootstrapError::Channel)?,
    );
    let llm = ChatCompletionsClient::from_config(&config.llm)
        .map_err(|error| BootstrapError::Llm(format!("{error:#}")))?;
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        endpoint = %llm.endpoint(),
        model = %llm.settings().model,
        "llm client configured"
    );
    let renderer = Arc::new(PdfRenderer::from_config(&config.documents)?);
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::default());

    let collaborators = Collaborators {
        sessions: sessions.clone(),
        channel: channel.clone(),
        generator: Arc::new(LlmProposalGenerator::new(Arc::new(llm), offset)),
        renderer: renderer.clone(),
        scheduling: Arc::new(SqlAppointmentRepository::new(db_pool.clone())),
        audit: Arc::new(TracingAuditSink),
        clock: Arc::new(SystemClock),
    };
    let orchestrator = FlowOrchestrator::new(FlowEngine::new(offset), collaborators);
    let health = HealthState::new(db_pool.clone(), sessions, renderer.is_available());

    Ok(Application { config, db_pool, orchestrator, channel, health })
}

#[cfg(test)]
mod tests {
    use deckbot_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
    use deckbot_core::domain::UserId;

    use crate::bootstrap::bootstrap;

    fn options(database_url: String) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url),
                llm_provider: Some(LlmProvider::Ollama),
                whatsapp_access_token: Some("EAAG-test".to_string()),
                whatsapp_phone_number_id: Some("1098765".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    fn temp_database_url() -> String {
        let path = std::env::temp_dir().join(format!("deckbot-bootstrap-{}.db", uuid::Uuid::new_v4()));
        format!("sqlite://{}", path.display())
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_whatsapp_credentials() {
        let mut options = options("sqlite::memory:".to_string());
        options.overrides.whatsapp_phone_number_id = Some("+57 300".to_string());

        let message = bootstrap(options).await.err().expect("error").to_string();
        assert!(message.contains("whatsapp.phone_number_id"));
    }

    #[tokio::test]
    async fn bootstrap_wires_schema_and_orchestrator() {
        let app = bootstrap(options(temp_database_url())).await.expect("bootstrap should succeed");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'appointment'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("schema query");
        assert_eq!(table_count, 1);
        assert_eq!(app.channel.messages_url(), "https://graph.facebook.com/v18.0/1098765/messages");

        assert_eq!(app.orchestrator.sessions().active_count().await, 0);
        assert!(app.orchestrator.sessions().get(&UserId::new("57300")).await.is_none());

        app.db_pool.close().await;
    }
}
