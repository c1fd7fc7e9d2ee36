use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{info, warn};

use crate::config::RemindersConfig;
use crate::domain::dates::spanish_long_datetime;
use crate::domain::AppointmentRecord;
use crate::errors::{ApplicationError, CollaboratorError};
use crate::ports::{MessageChannel, SchedulingStore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReminderSettings {
    pub lookahead: chrono::Duration,
    pub spacing: Duration,
}

impl From<&RemindersConfig> for ReminderSettings {
    fn from(config: &RemindersConfig) -> Self {
        Self {
            lookahead: chrono::Duration::hours(i64::from(config.lookahead_hours)),
            spacing: Duration::from_millis(config.send_spacing_ms),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub due: usize,
    pub sent: Vec<i64>,
    pub failed: Vec<i64>,
}

/// One pass over pending appointments that start within the lookahead window
/// and have not been reminded yet.
pub struct ReminderSweep {
    store: Arc<dyn SchedulingStore>,
    channel: Arc<dyn MessageChannel>,
    settings: ReminderSettings,
    offset: FixedOffset,
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn SchedulingStore>,
        channel: Arc<dyn MessageChannel>,
        settings: ReminderSettings,
        offset: FixedOffset,
    ) -> Self {
        Self { store, channel, settings, offset }
    }

    pub async fn due(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRecord>, ApplicationError> {
        Ok(self.store.upcoming_unreminded(now, now + self.settings.lookahead).await?)
    }

    /// A failed send or mark is counted and logged; only the initial query
    /// aborts the pass.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<ReminderReport, ApplicationError> {
        let due = self.due(now).await?;
        let mut report = ReminderReport { due: due.len(), ..ReminderReport::default() };
        if due.is_empty() {
            info!(event_name = "reminders.none_due", "no upcoming appointments need a reminder");
            return Ok(report);
        }

        for (index, record) in due.iter().enumerate() {
            if index > 0 && !self.settings.spacing.is_zero() {
                tokio::time::sleep(self.settings.spacing).await;
            }
            match self.remind(record).await {
                Ok(()) => {
                    info!(
                        event_name = "reminders.sent",
                        appointment_id = record.id,
                        user_id = %record.contact_user_id,
                        "appointment reminder sent"
                    );
                    report.sent.push(record.id);
                }
                Err(error) => {
                    warn!(
                        event_name = "reminders.failed",
                        appointment_id = record.id,
                        error = %error,
                        "appointment reminder failed"
                    );
                    report.failed.push(record.id);
                }
            }
        }

        info!(
            event_name = "reminders.completed",
            due = report.due,
            sent = report.sent.len(),
            failed = report.failed.len(),
            "reminder sweep completed"
        );
        Ok(report)
    }

    async fn remind(&self, record: &AppointmentRecord) -> Result<(), CollaboratorError> {
        let body = reminder_text(record, self.offset);
        self.channel.send_text(&record.contact_user_id, &body).await?;
        self.store.mark_reminder_sent(record.id).await
    }
}

pub fn reminder_text(record: &AppointmentRecord, offset: FixedOffset) -> String {
    format!(
        "🔔 *RECORDATORIO DE CITA*\n\n\
         Hola {name}! 👋\n\n\
         Este es un recordatorio de tu cita con Digit Deck:\n\n\
         📅 *Fecha:* {date}\n\
         💼 *Servicio:* {service}\n\
         📧 *Email:* {email}\n\n\
         🆔 ID de cita: #{id}\n\n\
         ¿Necesitas reprogramar? Escríbenos y te ayudamos. 😊",
        name = record.contact_name,
        date = spanish_long_datetime(record.scheduled_at, offset),
        service = record.service,
        email = record.contact_email,
        id = record.id,
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{FixedOffset, TimeZone, Utc};

    use super::{reminder_text, ReminderSettings, ReminderSweep};
    use crate::domain::{AppointmentCandidate, AppointmentRecord, AppointmentStatus, UserId};
    use crate::testing::{fixed_now, shared, MemorySchedulingStore, RecordingChannel, Sent};

    fn bogota() -> FixedOffset {
        FixedOffset::west_opt(5 * 3600).expect("valid offset")
    }

    fn record(id: i64, user: &str, hours_ahead: i64) -> AppointmentRecord {
        AppointmentRecord::from_candidate(
            id,
            AppointmentCandidate {
                contact_user_id: UserId::new(user),
                contact_email: "ana@techstore.co".to_owned(),
                contact_name: "Ana".to_owned(),
                service: "Auditoría CRO".to_owned(),
                scheduled_at: fixed_now() + chrono::Duration::hours(hours_ahead),
            },
            fixed_now(),
        )
    }

    fn settings() -> ReminderSettings {
        ReminderSettings { lookahead: chrono::Duration::hours(24), spacing: Duration::ZERO }
    }

    #[tokio::test]
    async fn sweep_reminds_only_due_appointments_once() {
        let mut cancelled = record(3, "57302", 3);
        cancelled.status = AppointmentStatus::Cancelled;
        let store = shared(MemorySchedulingStore::with_records(vec![
            record(1, "57300", 2),
            record(2, "57301", 48),
            cancelled,
        ]));
        let channel = shared(RecordingChannel::default());
        let sweep = ReminderSweep::new(store.clone(), channel.clone(), settings(), bogota());

        let report = sweep.run_once(fixed_now()).await.expect("sweep runs");
        assert_eq!(report.due, 1);
        assert_eq!(report.sent, vec![1]);
        assert!(report.failed.is_empty());
        assert!(matches!(
            channel.sent().as_slice(),
            [Sent::Text { to, .. }] if to == &UserId::new("57300")
        ));

        let again = sweep.run_once(fixed_now()).await.expect("second sweep runs");
        assert_eq!(again.due, 0);
        assert_eq!(channel.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_is_counted_and_left_unreminded() {
        let store = shared(MemorySchedulingStore::with_records(vec![
            record(1, "57300", 2),
            record(2, "57301", 5),
        ]));
        let channel = Arc::new(RecordingChannel::failing_when(|sent| {
            matches!(sent, Sent::Text { to, .. } if to == &UserId::new("57300"))
        }));
        let sweep = ReminderSweep::new(store.clone(), channel, settings(), bogota());

        let report = sweep.run_once(fixed_now()).await.expect("sweep runs");
        assert_eq!(report.sent, vec![2]);
        assert_eq!(report.failed, vec![1]);
        let first = store.records().into_iter().find(|record| record.id == 1);
        assert_eq!(first.map(|record| record.reminder_sent), Some(false));
    }

    #[tokio::test]
    async fn query_failure_aborts_the_pass() {
        let sweep = ReminderSweep::new(
            shared(MemorySchedulingStore::failing()),
            shared(RecordingChannel::default()),
            settings(),
            bogota(),
        );
        assert!(sweep.run_once(fixed_now()).await.is_err());
    }

    #[test]
    fn reminder_text_uses_local_long_date() {
        let mut appointment = record(7, "57300", 0);
        appointment.scheduled_at = Utc.with_ymd_and_hms(2026, 10, 18, 2, 15, 0).single().expect("valid");
        let text = reminder_text(&appointment, bogota());
        assert!(text.contains("sábado, 17 de octubre de 2026, 21:15"));
        assert!(text.contains("🆔 ID de cita: #7"));
        assert!(text.contains("Auditoría CRO"));
    }
}
