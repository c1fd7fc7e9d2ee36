use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::session::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown appointment status `{other}`")),
        }
    }
}

/// What the flow engine hands to the scheduling store. Identity is assigned
/// by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCandidate {
    pub contact_user_id: UserId,
    pub contact_email: String,
    pub contact_name: String,
    pub service: String,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: i64,
    pub contact_user_id: UserId,
    pub contact_email: String,
    pub contact_name: String,
    pub service: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRecord {
    pub fn from_candidate(id: i64, candidate: AppointmentCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            contact_user_id: candidate.contact_user_id,
            contact_email: candidate.contact_email,
            contact_name: candidate.contact_name,
            service: candidate.service,
            scheduled_at: candidate.scheduled_at,
            status: AppointmentStatus::Pending,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_due_for_reminder(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Pending
            && !self.reminder_sent
            && self.scheduled_at >= from
            && self.scheduled_at <= until
    }
}
