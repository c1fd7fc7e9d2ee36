//! Audit trail of handled inbound events.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    TransitionApplied,
    InputRejected,
    CollaboratorFailed,
}

impl AuditKind {
    pub fn event_name(self) -> &'static str {
        match self {
            Self::TransitionApplied => "flow.transition_applied",
            Self::InputRejected => "flow.input_rejected",
            Self::CollaboratorFailed => "flow.collaborator_failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub kind: AuditKind,
    pub user_id: UserId,
    pub correlation_id: String,
    pub message_id: Option<String>,
    pub details: BTreeMap<&'static str, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        kind: AuditKind,
        user_id: UserId,
        correlation_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            user_id,
            correlation_id: correlation_id.into(),
            message_id: None,
            details: BTreeMap::new(),
            occurred_at,
        }
    }

    pub fn message_id(mut self, message_id: Option<String>) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn detail(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.details.insert(key, value.into());
        self
    }

    pub fn detail_value(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Keeps events in memory for assertions.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn of_kind(&self, kind: AuditKind) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|event| event.kind == kind).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

/// Writes audit events into the structured log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let details = serde_json::to_string(&event.details).unwrap_or_default();
        let message_id = event.message_id.as_deref().unwrap_or("-");
        if event.kind == AuditKind::CollaboratorFailed {
            warn!(
                event_name = event.kind.event_name(),
                correlation_id = %event.correlation_id,
                user_id = %event.user_id,
                message_id,
                details = %details,
                "audit"
            );
        } else {
            info!(
                event_name = event.kind.event_name(),
                correlation_id = %event.correlation_id,
                user_id = %event.user_id,
                message_id,
                details = %details,
                "audit"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{AuditEvent, AuditKind, AuditSink, InMemoryAuditSink, TracingAuditSink};
    use crate::domain::UserId;

    #[test]
    fn in_memory_sink_filters_by_kind() {
        let sink = InMemoryAuditSink::default();
        let user = UserId::new("573001112233");
        sink.emit(
            AuditEvent::new(AuditKind::TransitionApplied, user.clone(), "wamid.HBgM", Utc::now())
                .message_id(Some("wamid.HBgM".to_owned()))
                .detail("from_step", "company_name")
                .detail("to_step", "activity"),
        );
        sink.emit(
            AuditEvent::new(AuditKind::InputRejected, user, "corr-2", Utc::now())
                .detail("error_code", "validation_rejected"),
        );

        let applied = sink.of_kind(AuditKind::TransitionApplied);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].message_id.as_deref(), Some("wamid.HBgM"));
        assert_eq!(applied[0].detail_value("to_step"), Some("activity"));
        assert_eq!(
            sink.of_kind(AuditKind::InputRejected)[0].detail_value("error_code"),
            Some("validation_rejected")
        );
        assert!(sink.of_kind(AuditKind::CollaboratorFailed).is_empty());
    }

    #[test]
    fn tracing_sink_accepts_failures_without_a_subscriber() {
        let event = AuditEvent::new(
            AuditKind::CollaboratorFailed,
            UserId::new("57300"),
            "corr-9",
            Utc::now(),
        )
        .detail("error_code", "render_failure");

        assert_eq!(event.kind.event_name(), "flow.collaborator_failed");
        TracingAuditSink.emit(event);
    }
}
