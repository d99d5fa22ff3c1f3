use chrono::{DateTime, Utc};
use aurora_addict_shared::{ParticipantResponse, ParticipantStatus, PaymentStatus};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub hunt_id: Uuid,
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    /// `None` on free hunts
    pub payment_status: Option<PaymentStatus>,
    pub joined_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Insertion order, breaks `joined_at` ties in the waitlist
    pub seq: i64,
    pub updated_at: DateTime<Utc>,
}

/// The `(status, payment_status)` pair every transition operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipationState {
    pub status: ParticipantStatus,
    pub payment_status: Option<PaymentStatus>,
}

impl ParticipationState {
    pub const fn new(status: ParticipantStatus, payment_status: Option<PaymentStatus>) -> Self {
        Self { status, payment_status }
    }
}

impl fmt::Display for ParticipationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payment_status {
            Some(payment_status) => write!(f, "{} (payment {})", self.status, payment_status),
            None => write!(f, "{}", self.status),
        }
    }
}

impl Participant {
    pub fn state(&self) -> ParticipationState {
        ParticipationState::new(self.status, self.payment_status)
    }

    pub fn set_state(&mut self, state: ParticipationState) {
        self.status = state.status;
        self.payment_status = state.payment_status;
    }

    /// Confirmed rows are the ones reflected in the user's joined counter
    pub fn is_counted(&self) -> bool {
        self.status == ParticipantStatus::Confirmed
    }

    pub fn to_response(&self) -> ParticipantResponse {
        ParticipantResponse {
            id: self.id,
            hunt_id: self.hunt_id,
            user_id: self.user_id,
            status: self.status,
            payment_status: self.payment_status,
            joined_at: self.joined_at,
            paid_at: self.paid_at,
            updated_at: self.updated_at,
        }
    }
}
