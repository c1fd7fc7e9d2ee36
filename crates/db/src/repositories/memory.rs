use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use deckbot_core::domain::{
    AppointmentCandidate, AppointmentRecord, AppointmentStatus, UserId,
};
use deckbot_core::errors::CollaboratorError;
use deckbot_core::ports::SchedulingStore;

use super::RepositoryError;

/// Scheduling store for local runs and tests; ids start at 1.
#[derive(Default)]
pub struct InMemoryAppointmentRepository {
    records: RwLock<BTreeMap<i64, AppointmentRecord>>,
}

#[async_trait]
impl SchedulingStore for InMemoryAppointmentRepository {
    async fn create_appointment(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<AppointmentRecord, CollaboratorError> {
        let mut records = self.records.write().await;
        let id = records.keys().next_back().copied().unwrap_or(0) + 1;
        let record = AppointmentRecord::from_candidate(id, candidate, Utc::now());
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn upcoming_unreminded(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError> {
        let records = self.records.read().await;
        let mut due: Vec<_> = records
            .values()
            .filter(|record| record.is_due_for_reminder(from, until))
            .cloned()
            .collect();
        due.sort_by_key(|record| record.scheduled_at);
        Ok(due)
    }

    async fn mark_reminder_sent(&self, id: i64) -> Result<(), CollaboratorError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        record.reminder_sent = true;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(
        &self,
        id: i64,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, CollaboratorError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(RepositoryError::NotFound(id))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn list_for_contact(
        &self,
        contact: &UserId,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError> {
        let records = self.records.read().await;
        let mut listed: Vec<_> =
            records.values().filter(|record| &record.contact_user_id == contact).cloned().collect();
        listed.sort_by_key(|record| record.scheduled_at);
        Ok(listed)
    }
}
