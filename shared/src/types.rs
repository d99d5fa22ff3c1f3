use serde::{Deserialize, Serialize};
use std::fmt;

// User-related enums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Organizer,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Organizer => write!(f, "organizer"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

// Participant-related enums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Pending,
    Confirmed,
    Waitlisted,
    Cancelled,
}

impl ParticipantStatus {
    /// Cancelled is the only terminal status
    pub fn is_live(&self) -> bool {
        !matches!(self, ParticipantStatus::Cancelled)
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantStatus::Pending => write!(f, "pending"),
            ParticipantStatus::Confirmed => write!(f, "confirmed"),
            ParticipantStatus::Waitlisted => write!(f, "waitlisted"),
            ParticipantStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// Payment sub-state, only present on paid hunts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    MarkedPaid,
    Confirmed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::MarkedPaid => write!(f, "marked_paid"),
            PaymentStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Organizer decision on a marked-paid (or unpaid) participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum PaymentDecision {
    Confirm,
    Reject,
}

/// Organizer decision on a join request for an approval-gated hunt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}
