use chrono::{DateTime, Utc};
use aurora_addict_shared::{CreateHuntRequest, HuntResponse, UpdateHuntRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use crate::error::AppError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Hunt {
    pub id: Uuid,
    /// Organizer
    pub user_id: Uuid,
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
    /// Set by the sweep once the waitlist is frozen ahead of start
    pub started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Live participation counts for one hunt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct HuntCounts {
    pub confirmed: i64,
    pub waitlisted: i64,
    pub pending: i64,
}

impl Hunt {
    pub fn from_request(organizer_id: Uuid, request: &CreateHuntRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: organizer_id,
            title: request.title.clone(),
            description: request.description.clone(),
            location: request.location.clone(),
            timezone: request.timezone.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            is_paid: request.is_paid,
            price: request.price,
            capacity: request.capacity,
            requires_approval: request.requires_approval,
            started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_organizer(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Joins close once the start instant is reached
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date
    }

    /// No promotion happens once the sweep froze the waitlist or the hunt began
    pub fn is_waitlist_frozen(&self, now: DateTime<Utc>) -> bool {
        self.started_at.is_some() || self.has_started(now)
    }

    /// Applies an organizer edit. Payment terms are fixed at creation.
    pub fn apply_update(&mut self, request: &UpdateHuntRequest) -> Result<(), AppError> {
        if request.clear_capacity && request.capacity.is_some() {
            return Err(AppError::Validation("Capacity cannot be set and cleared at once".to_string()));
        }
        if request.clear_description && request.description.is_some() {
            return Err(AppError::Validation("Description cannot be set and cleared at once".to_string()));
        }

        if let Some(title) = &request.title {
            self.title = title.clone();
        }
        if let Some(description) = &request.description {
            self.description = Some(description.clone());
        } else if request.clear_description {
            self.description = None;
        }
        if let Some(location) = &request.location {
            self.location = location.clone();
        }
        if let Some(timezone) = &request.timezone {
            self.timezone = Some(timezone.clone());
        }
        if let Some(start_date) = request.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = request.end_date {
            self.end_date = end_date;
        }
        if let Some(capacity) = request.capacity {
            self.capacity = Some(capacity);
        } else if request.clear_capacity {
            self.capacity = None;
        }

        if self.end_date <= self.start_date {
            return Err(AppError::Validation("End date must be after start date".to_string()));
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn to_response(&self, counts: HuntCounts) -> HuntResponse {
        HuntResponse {
            id: self.id,
            organizer_id: self.user_id,
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            timezone: self.timezone.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            is_paid: self.is_paid,
            price: self.price,
            capacity: self.capacity,
            requires_approval: self.requires_approval,
            started_at: self.started_at,
            confirmed_count: counts.confirmed,
            waitlisted_count: counts.waitlisted,
            pending_count: counts.pending,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
