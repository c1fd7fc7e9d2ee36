use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use deckbot_core::domain::{
    AppointmentCandidate, AppointmentRecord, AppointmentStatus, UserId,
};
use deckbot_core::errors::CollaboratorError;
use deckbot_core::ports::{Clock, SchedulingStore, SystemClock};

use super::RepositoryError;
use crate::DbPool;

const COLUMNS: &str = "id, contact_user_id, contact_email, contact_name, service, scheduled_at,
                       status, reminder_sent, created_at, updated_at";

pub struct SqlAppointmentRepository {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl SqlAppointmentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<AppointmentRecord>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM appointment WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_appointment).transpose()
    }

    pub async fn insert(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let now = self.clock.now();
        let result = sqlx::query(
            "INSERT INTO appointment (contact_user_id, contact_email, contact_name, service,
                                      scheduled_at, status, reminder_sent, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(candidate.contact_user_id.as_str())
        .bind(&candidate.contact_email)
        .bind(&candidate.contact_name)
        .bind(&candidate.service)
        .bind(timestamp(candidate.scheduled_at))
        .bind(AppointmentStatus::Pending.as_str())
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await?;

        Ok(AppointmentRecord::from_candidate(result.last_insert_rowid(), candidate, now))
    }

    pub async fn due_for_reminder(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM appointment
             WHERE status = 'pending' AND reminder_sent = 0
               AND scheduled_at >= ? AND scheduled_at <= ?
             ORDER BY scheduled_at ASC"
        ))
        .bind(timestamp(from))
        .bind(timestamp(until))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_appointment).collect()
    }

    pub async fn set_reminder_sent(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE appointment SET reminder_sent = 1, updated_at = ? WHERE id = ?",
        )
        .bind(timestamp(self.clock.now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    pub async fn set_status(
        &self,
        id: i64,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let result = sqlx::query("UPDATE appointment SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(timestamp(self.clock.now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        self.find_by_id(id).await?.ok_or(RepositoryError::NotFound(id))
    }

    pub async fn cancel(&self, id: i64) -> Result<AppointmentRecord, RepositoryError> {
        self.set_status(id, AppointmentStatus::Cancelled).await
    }

    pub async fn for_contact(
        &self,
        contact: &UserId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM appointment
             WHERE contact_user_id = ?
             ORDER BY scheduled_at ASC"
        ))
        .bind(contact.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_appointment).collect()
    }
}

/// Fixed-width UTC form so lexical order in SQLite matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn row_to_appointment(row: &sqlx::sqlite::SqliteRow) -> Result<AppointmentRecord, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: i64 = row.try_get("id").map_err(decode)?;
    let contact_user_id: String = row.try_get("contact_user_id").map_err(decode)?;
    let contact_email: String = row.try_get("contact_email").map_err(decode)?;
    let contact_name: String = row.try_get("contact_name").map_err(decode)?;
    let service: String = row.try_get("service").map_err(decode)?;
    let scheduled_at: String = row.try_get("scheduled_at").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;
    let reminder_sent: bool = row.try_get("reminder_sent").map_err(decode)?;
    let created_at: String = row.try_get("created_at").map_err(decode)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode)?;

    Ok(AppointmentRecord {
        id,
        contact_user_id: UserId::new(contact_user_id),
        contact_email,
        contact_name,
        service,
        scheduled_at: parse_timestamp("scheduled_at", &scheduled_at)?,
        status: status.parse().map_err(RepositoryError::Decode)?,
        reminder_sent,
        created_at: parse_timestamp("created_at", &created_at)?,
        updated_at: parse_timestamp("updated_at", &updated_at)?,
    })
}

#[async_trait]
impl SchedulingStore for SqlAppointmentRepository {
    async fn create_appointment(
        &self,
        candidate: AppointmentCandidate,
    ) -> Result<AppointmentRecord, CollaboratorError> {
        Ok(self.insert(candidate).await?)
    }

    async fn upcoming_unreminded(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError> {
        Ok(self.due_for_reminder(from, until).await?)
    }

    async fn mark_reminder_sent(&self, id: i64) -> Result<(), CollaboratorError> {
        Ok(self.set_reminder_sent(id).await?)
    }

    async fn update_status(
        &self,
        id: i64,
        status: AppointmentStatus,
    ) -> Result<AppointmentRecord, CollaboratorError> {
        Ok(self.set_status(id, status).await?)
    }

    async fn list_for_contact(
        &self,
        contact: &UserId,
    ) -> Result<Vec<AppointmentRecord>, CollaboratorError> {
        Ok(self.for_contact(contact).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use deckbot_core::domain::{AppointmentCandidate, AppointmentStatus, UserId};
    use deckbot_core::errors::CollaboratorError;
    use deckbot_core::ports::{Clock, SchedulingStore};

    use super::SqlAppointmentRepository;
    use crate::repositories::RepositoryError;
    use crate::{connect_with_settings, migrations};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).single().expect("valid instant")
    }

    fn candidate(user: &str, hours_ahead: i64) -> AppointmentCandidate {
        AppointmentCandidate {
            contact_user_id: UserId::new(user),
            contact_email: "ana@techstore.co".to_string(),
            contact_name: "Ana Gómez".to_string(),
            service: "Auditoría CRO".to_string(),
            scheduled_at: now() + Duration::hours(hours_ahead),
        }
    }

    async fn setup() -> SqlAppointmentRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlAppointmentRepository::new(pool).with_clock(Arc::new(FixedClock(now())))
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_persists_fields() {
        let repo = setup().await;

        let first = repo.create_appointment(candidate("57300", 4)).await.expect("create");
        let second = repo.create_appointment(candidate("57300", 30)).await.expect("create");

        assert!(second.id > first.id);
        let stored = repo.find_by_id(first.id).await.expect("find").expect("exists");
        assert_eq!(stored, first);
        assert_eq!(stored.status, AppointmentStatus::Pending);
        assert!(!stored.reminder_sent);
        assert_eq!(stored.created_at, now());
    }

    #[tokio::test]
    async fn reminder_window_excludes_reminded_cancelled_and_far_appointments() {
        let repo = setup().await;
        let due = repo.create_appointment(candidate("57300", 2)).await.expect("create");
        let reminded = repo.create_appointment(candidate("57301", 3)).await.expect("create");
        let cancelled = repo.create_appointment(candidate("57302", 5)).await.expect("create");
        repo.create_appointment(candidate("57303", 48)).await.expect("create");
        repo.create_appointment(candidate("57304", -1)).await.expect("create");

        repo.mark_reminder_sent(reminded.id).await.expect("mark");
        repo.cancel(cancelled.id).await.expect("cancel");

        let window = repo
            .upcoming_unreminded(now(), now() + Duration::hours(24))
            .await
            .expect("query window");
        assert_eq!(window.iter().map(|record| record.id).collect::<Vec<_>>(), vec![due.id]);
    }

    #[tokio::test]
    async fn status_update_returns_the_stored_record() {
        let repo = setup().await;
        let created = repo.create_appointment(candidate("57300", 4)).await.expect("create");

        let confirmed =
            repo.update_status(created.id, AppointmentStatus::Confirmed).await.expect("update");
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert_eq!(confirmed.id, created.id);

        let missing = repo.update_status(9_999, AppointmentStatus::Cancelled).await;
        assert!(matches!(missing, Err(CollaboratorError::Persistence(message)) if message.contains("9999")));
        let marked = repo.set_reminder_sent(9_999).await;
        assert!(matches!(marked, Err(RepositoryError::NotFound(9_999))));
    }

    #[tokio::test]
    async fn list_for_contact_is_ordered_by_schedule() {
        let repo = setup().await;
        let later = repo.create_appointment(candidate("57300", 30)).await.expect("create");
        let sooner = repo.create_appointment(candidate("57300", 3)).await.expect("create");
        repo.create_appointment(candidate("57399", 1)).await.expect("create");

        let listed = repo.list_for_contact(&UserId::new("57300")).await.expect("list");
        let ids: Vec<_> = listed.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);
    }
}
