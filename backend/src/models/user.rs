use chrono::{DateTime, Utc};
use aurora_addict_shared::UserRole;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Account row. Accounts are owned by the platform's account service; the
/// participation core only reads them and maintains the joined counter.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    /// Number of participations with status `confirmed`
    pub cached_hunts_joined_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: &str, email: &str, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            role,
            cached_hunts_joined_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
