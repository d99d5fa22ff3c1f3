//! Storage seam for the participation core.
//!
//! Every mutating operation runs inside a [`StoreTx`]. Implementations must
//! serialize transactions that call [`StoreTx::lock_hunt`] for the same hunt,
//! and must discard all writes of a transaction that is rolled back or
//! dropped without commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Hunt, HuntCounts, Participant, ParticipationState, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ParticipationStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;

    async fn find_hunt(&self, hunt_id: Uuid) -> Result<Option<Hunt>, AppError>;

    async fn hunt_counts(&self, hunt_id: Uuid) -> Result<HuntCounts, AppError>;

    /// Participants of a hunt ordered by `joined_at`, then `seq`
    async fn list_participants(&self, hunt_id: Uuid) -> Result<Vec<Participant>, AppError>;

    async fn find_participant(&self, hunt_id: Uuid, user_id: Uuid) -> Result<Option<Participant>, AppError>;

    /// Rows that joined before `cutoff` and are still pending, or still
    /// waitlisted on a hunt whose waitlist is not frozen
    async fn stale_participants(&self, cutoff: DateTime<Utc>) -> Result<Vec<Participant>, AppError>;

    /// Unfrozen hunts starting at or before `freeze_before`
    async fn hunts_to_freeze(&self, freeze_before: DateTime<Utc>) -> Result<Vec<Uuid>, AppError>;

    /// Unfrozen, unstarted hunts with waitlisted rows and at least one free seat
    async fn hunts_with_promotable_waitlist(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError>;

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, AppError>;
}

#[async_trait]
pub trait StoreTx: Send {
    /// Takes the per-hunt lock for the rest of the transaction
    async fn lock_hunt(&mut self, hunt_id: Uuid) -> Result<Option<Hunt>, AppError>;

    async fn insert_hunt(&mut self, hunt: &Hunt) -> Result<Hunt, AppError>;

    async fn update_hunt(&mut self, hunt: &Hunt) -> Result<Hunt, AppError>;

    /// Sets `started_at` if still unset; returns whether this call set it
    async fn mark_hunt_started(&mut self, hunt_id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError>;

    async fn count_confirmed(&mut self, hunt_id: Uuid) -> Result<i64, AppError>;

    async fn find_participant(&mut self, hunt_id: Uuid, user_id: Uuid) -> Result<Option<Participant>, AppError>;

    async fn find_participant_by_id(&mut self, participant_id: Uuid) -> Result<Option<Participant>, AppError>;

    async fn insert_participant(
        &mut self,
        hunt_id: Uuid,
        user_id: Uuid,
        state: ParticipationState,
        joined_at: DateTime<Utc>,
    ) -> Result<Participant, AppError>;

    /// Reuses a cancelled row for a new join: fresh `joined_at` and `seq`,
    /// payment timestamp cleared
    async fn reset_participant(
        &mut self,
        participant_id: Uuid,
        state: ParticipationState,
        joined_at: DateTime<Utc>,
    ) -> Result<Participant, AppError>;

    /// Persists `status`, `payment_status` and `paid_at` of the given row
    async fn save_participant(&mut self, participant: &Participant) -> Result<Participant, AppError>;

    async fn delete_participant(&mut self, participant_id: Uuid) -> Result<(), AppError>;

    /// Oldest waitlisted participant by `joined_at`, then `seq`
    async fn next_waitlisted(&mut self, hunt_id: Uuid) -> Result<Option<Participant>, AppError>;

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Adds `delta` to the cached joined counter, clamped at zero
    async fn adjust_joined_count(&mut self, user_id: Uuid, delta: i64) -> Result<(), AppError>;

    async fn count_user_confirmed(&mut self, user_id: Uuid) -> Result<i64, AppError>;

    async fn set_joined_count(&mut self, user_id: Uuid, count: i64) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Commits on success and rolls back on failure, returning the operation's result
pub async fn complete<R>(tx: Box<dyn StoreTx>, result: Result<R, AppError>) -> Result<R, AppError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}
