//! Readiness endpoint for orchestrators and uptime probes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use deckbot_core::SessionStore;
use deckbot_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    sessions: Arc<dyn SessionStore>,
    pdf_converter_found: bool,
}

impl HealthState {
    pub fn new(
        db_pool: DbPool,
        sessions: Arc<dyn SessionStore>,
        pdf_converter_found: bool,
    ) -> Self {
        Self { db_pool, sessions, pdf_converter_found }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    pub readiness: Readiness,
    pub detail: String,
}

impl Component {
    fn new(readiness: Readiness, detail: impl Into<String>) -> Self {
        Self { readiness, detail: detail.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub readiness: Readiness,
    pub database: Component,
    pub documents: Component,
    pub active_sessions: usize,
    pub checked_at: DateTime<Utc>,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(readiness))
        .route("/health/live", get(|| async { StatusCode::NO_CONTENT }))
        .with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind((bind_address, port)).await?;
    let local_address = listener.local_addr()?;

    info!(
        event_name = "system.health.listening",
        correlation_id = "bootstrap",
        address = %local_address,
        "health endpoint listening"
    );

    tokio::spawn(async move {
        if let Err(serve_error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.stopped",
                correlation_id = "bootstrap",
                error = %serve_error,
                "health endpoint stopped serving"
            );
        }
    });

    Ok(())
}

/// Ready only when the database answers. A missing PDF converter degrades
/// quotations but leaves the bot usable, so it is reported, not gated on.
pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let database = match deckbot_db::ping(&state.db_pool).await {
        Ok(()) => Component::new(Readiness::Ready, "appointment store answered"),
        Err(ping_error) => Component::new(
            Readiness::Unavailable,
            format!("appointment store unreachable: {ping_error}"),
        ),
    };
    let documents = if state.pdf_converter_found {
        Component::new(Readiness::Ready, "wkhtmltopdf available")
    } else {
        Component::new(Readiness::Degraded, "wkhtmltopdf not found; proposals cannot be rendered")
    };

    let readiness = match (database.readiness, documents.readiness) {
        (Readiness::Unavailable, _) => Readiness::Unavailable,
        (_, Readiness::Ready) => Readiness::Ready,
        _ => Readiness::Degraded,
    };
    let status_code = if readiness == Readiness::Unavailable {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    let report = HealthReport {
        readiness,
        database,
        documents,
        active_sessions: state.sessions.active_count().await,
        checked_at: Utc::now(),
    };
    (status_code, Json(report))
}
