use crate::types::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// Hunt DTOs
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_hunt"))]
pub struct CreateHuntRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub location: String,

    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    #[serde(default)]
    pub is_paid: bool,

    pub price: Option<Decimal>,

    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,

    #[serde(default)]
    pub requires_approval: bool,
}

fn validate_new_hunt(request: &CreateHuntRequest) -> Result<(), ValidationError> {
    if request.end_date <= request.start_date {
        return Err(ValidationError::new("end_before_start"));
    }

    match (request.is_paid, request.price) {
        (true, Some(price)) if price > Decimal::ZERO => {}
        (true, _) => return Err(ValidationError::new("paid_hunt_requires_price")),
        (false, Some(_)) => return Err(ValidationError::new("free_hunt_with_price")),
        (false, None) => {}
    }

    if request.is_paid && request.requires_approval {
        return Err(ValidationError::new("paid_hunt_with_approval"));
    }

    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHuntRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    #[validate(range(min = 1, max = 10000))]
    pub capacity: Option<i32>,

    /// Drops the seat limit; cannot be combined with `capacity`
    #[serde(default)]
    pub clear_capacity: bool,

    #[serde(default)]
    pub clear_description: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntResponse {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub timezone: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_paid: bool,
    pub price: Option<Decimal>,
    pub capacity: Option<i32>,
    pub requires_approval: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub confirmed_count: i64,
    pub waitlisted_count: i64,
    pub pending_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Participant DTOs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantResponse {
    pub id: Uuid,
    pub hunt_id: Uuid,
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    pub payment_status: Option<PaymentStatus>,
    pub joined_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationChangeResponse {
    pub participant: ParticipantResponse,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveHuntResponse {
    pub participant: ParticipantResponse,
    pub promoted_user_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRejectedResponse {
    pub hunt_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
}

// Counter repair DTOs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRecomputeResponse {
    pub user_id: Uuid,
    pub cached_hunts_joined_count: i64,
    pub previous_count: i64,
    pub repaired: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterBackfillResponse {
    pub users_checked: usize,
    pub users_repaired: usize,
}

// Sweep DTOs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub success: bool,
    pub processed_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl SweepResponse {
    pub fn completed(processed_count: usize, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            processed_count,
            timestamp,
        }
    }

    pub fn failed(timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            processed_count: 0,
            timestamp,
        }
    }
}
