use async_trait::async_trait;
use aurora_addict_shared::{ParticipantStatus, ERROR_ALREADY_JOINED, ERROR_PARTICIPANT_NOT_FOUND};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{ParticipationStore, StoreTx};
use crate::error::AppError;
use crate::models::{Hunt, HuntCounts, Participant, ParticipationState, User};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    hunts: HashMap<Uuid, Hunt>,
    participants: HashMap<Uuid, Participant>,
    next_seq: i64,
}

impl MemoryState {
    fn counts(&self, hunt_id: Uuid) -> HuntCounts {
        let mut counts = HuntCounts::default();
        for participant in self.participants.values().filter(|p| p.hunt_id == hunt_id) {
            match participant.status {
                ParticipantStatus::Confirmed => counts.confirmed += 1,
                ParticipantStatus::Waitlisted => counts.waitlisted += 1,
                ParticipantStatus::Pending => counts.pending += 1,
                ParticipantStatus::Cancelled => {}
            }
        }
        counts
    }

    fn find_participant(&self, hunt_id: Uuid, user_id: Uuid) -> Option<Participant> {
        self.participants
            .values()
            .find(|p| p.hunt_id == hunt_id && p.user_id == user_id)
            .cloned()
    }

    fn next_seq(&mut self) -> i64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn user_mut(&mut self, user_id: Uuid) -> Option<&mut User> {
        self.users.get_mut(&user_id)
    }
}

fn sorted_by_queue_order(mut participants: Vec<Participant>) -> Vec<Participant> {
    participants.sort_by_key(|p| (p.joined_at, p.seq));
    participants
}

/// In-process store used by tests and local runs.
///
/// A single async mutex serializes every transaction. The state is
/// snapshotted on `begin` and restored unless the transaction commits.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) -> User {
        let mut state = self.state.lock().await;
        state.users.insert(user.id, user.clone());
        user
    }

    pub async fn user(&self, user_id: Uuid) -> Option<User> {
        self.state.lock().await.users.get(&user_id).cloned()
    }

    /// Overwrites a cached counter without touching participations
    pub async fn overwrite_joined_count(&self, user_id: Uuid, count: i64) {
        if let Some(user) = self.state.lock().await.user_mut(user_id) {
            user.cached_hunts_joined_count = count;
        }
    }

    /// Moves a participation's `joined_at` into the past
    pub async fn backdate_participant(&self, participant_id: Uuid, joined_at: DateTime<Utc>) -> Result<(), AppError> {
        let mut state = self.state.lock().await;
        let participant = state
            .participants
            .get_mut(&participant_id)
            .ok_or_else(|| AppError::NotFound(ERROR_PARTICIPANT_NOT_FOUND.to_string()))?;
        participant.joined_at = joined_at;
        Ok(())
    }
}

pub struct MemoryStoreTx {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl MemoryStoreTx {
    fn participant_mut(&mut self, participant_id: Uuid) -> Result<&mut Participant, AppError> {
        self.guard
            .participants
            .get_mut(&participant_id)
            .ok_or_else(|| AppError::NotFound(ERROR_PARTICIPANT_NOT_FOUND.to_string()))
    }

    fn restore(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl Drop for MemoryStoreTx {
    fn drop(&mut self) {
        self.restore();
    }
}

#[async_trait]
impl ParticipationStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = Some(guard.clone());
        Ok(Box::new(MemoryStoreTx { guard, snapshot }))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_hunt(&self, hunt_id: Uuid) -> Result<Option<Hunt>, AppError> {
        Ok(self.state.lock().await.hunts.get(&hunt_id).cloned())
    }

    async fn hunt_counts(&self, hunt_id: Uuid) -> Result<HuntCounts, AppError> {
        Ok(self.state.lock().await.counts(hunt_id))
    }

    async fn list_participants(&self, hunt_id: Uuid) -> Result<Vec<Participant>, AppError> {
        let state = self.state.lock().await;
        let participants = state
            .participants
            .values()
            .filter(|p| p.hunt_id == hunt_id)
            .cloned()
            .collect();
        Ok(sorted_by_queue_order(participants))
    }

    async fn find_participant(&self, hunt_id: Uuid, user_id: Uuid) -> Result<Option<Participant>, AppError> {
        Ok(self.state.lock().await.find_participant(hunt_id, user_id))
    }

    async fn stale_participants(&self, cutoff: DateTime<Utc>) -> Result<Vec<Participant>, AppError> {
        let state = self.state.lock().await;
        let participants = state
            .participants
            .values()
            .filter(|p| p.joined_at < cutoff)
            .filter(|p| match p.status {
                ParticipantStatus::Pending => true,
                ParticipantStatus::Waitlisted => state
                    .hunts
                    .get(&p.hunt_id)
                    .map_or(false, |h| h.started_at.is_none()),
                _ => false,
            })
            .cloned()
            .collect();
        Ok(sorted_by_queue_order(participants))
    }

    async fn hunts_to_freeze(&self, freeze_before: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().await;
        let mut hunts: Vec<&Hunt> = state
            .hunts
            .values()
            .filter(|h| h.started_at.is_none() && h.start_date <= freeze_before)
            .collect();
        hunts.sort_by_key(|h| h.start_date);
        Ok(hunts.into_iter().map(|h| h.id).collect())
    }

    async fn hunts_with_promotable_waitlist(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().await;
        let mut hunts: Vec<&Hunt> = state
            .hunts
            .values()
            .filter(|h| !h.is_waitlist_frozen(now))
            .filter(|h| {
                let counts = state.counts(h.id);
                counts.waitlisted > 0 && crate::policy::has_free_slot(h.capacity, counts.confirmed)
            })
            .collect();
        hunts.sort_by_key(|h| h.start_date);
        Ok(hunts.into_iter().map(|h| h.id).collect())
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().await;
        let mut users: Vec<&User> = state.users.values().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users.into_iter().map(|u| u.id).collect())
    }
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn lock_hunt(&mut self, hunt_id: Uuid) -> Result<Option<Hunt>, AppError> {
        Ok(self.guard.hunts.get(&hunt_id).cloned())
    }

    async fn insert_hunt(&mut self, hunt: &Hunt) -> Result<Hunt, AppError> {
        self.guard.hunts.insert(hunt.id, hunt.clone());
        Ok(hunt.clone())
    }

    async fn update_hunt(&mut self, hunt: &Hunt) -> Result<Hunt, AppError> {
        let mut updated = hunt.clone();
        updated.updated_at = Utc::now();
        self.guard.hunts.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn mark_hunt_started(&mut self, hunt_id: Uuid, at: DateTime<Utc>) -> Result<bool, AppError> {
        match self.guard.hunts.get_mut(&hunt_id) {
            Some(hunt) if hunt.started_at.is_none() => {
                hunt.started_at = Some(at);
                hunt.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn count_confirmed(&mut self, hunt_id: Uuid) -> Result<i64, AppError> {
        Ok(self.guard.counts(hunt_id).confirmed)
    }

    async fn find_participant(&mut self, hunt_id: Uuid, user_id: Uuid) -> Result<Option<Participant>, AppError> {
        Ok(self.guard.find_participant(hunt_id, user_id))
    }

    async fn find_participant_by_id(&mut self, participant_id: Uuid) -> Result<Option<Participant>, AppError> {
        Ok(self.guard.participants.get(&participant_id).cloned())
    }

    async fn insert_participant(
        &mut self,
        hunt_id: Uuid,
        user_id: Uuid,
        state: ParticipationState,
        joined_at: DateTime<Utc>,
    ) -> Result<Participant, AppError> {
        if self.guard.find_participant(hunt_id, user_id).is_some() {
            return Err(AppError::Conflict(ERROR_ALREADY_JOINED.to_string()));
        }

        let participant = Participant {
            id: Uuid::new_v4(),
            hunt_id,
            user_id,
            status: state.status,
            payment_status: state.payment_status,
            joined_at,
            paid_at: None,
            seq: self.guard.next_seq(),
            updated_at: Utc::now(),
        };
        self.guard.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    async fn reset_participant(
        &mut self,
        participant_id: Uuid,
        state: ParticipationState,
        joined_at: DateTime<Utc>,
    ) -> Result<Participant, AppError> {
        let seq = self.guard.next_seq();
        let participant = self.participant_mut(participant_id)?;
        participant.set_state(state);
        participant.joined_at = joined_at;
        participant.paid_at = None;
        participant.seq = seq;
        participant.updated_at = Utc::now();
        Ok(participant.clone())
    }

    async fn save_participant(&mut self, participant: &Participant) -> Result<Participant, AppError> {
        let stored = self.participant_mut(participant.id)?;
        stored.set_state(participant.state());
        stored.paid_at = participant.paid_at;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_participant(&mut self, participant_id: Uuid) -> Result<(), AppError> {
        self.guard.participants.remove(&participant_id);
        Ok(())
    }

    async fn next_waitlisted(&mut self, hunt_id: Uuid) -> Result<Option<Participant>, AppError> {
        Ok(self
            .guard
            .participants
            .values()
            .filter(|p| p.hunt_id == hunt_id && p.status == ParticipantStatus::Waitlisted)
            .min_by_key(|p| (p.joined_at, p.seq))
            .cloned())
    }

    async fn find_user(&mut self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.guard.users.get(&user_id).cloned())
    }

    async fn adjust_joined_count(&mut self, user_id: Uuid, delta: i64) -> Result<(), AppError> {
        if let Some(user) = self.guard.user_mut(user_id) {
            user.cached_hunts_joined_count = (user.cached_hunts_joined_count + delta).max(0);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn count_user_confirmed(&mut self, user_id: Uuid) -> Result<i64, AppError> {
        let count = self
            .guard
            .participants
            .values()
            .filter(|p| p.user_id == user_id && p.status == ParticipantStatus::Confirmed)
            .count();
        Ok(count as i64)
    }

    async fn set_joined_count(&mut self, user_id: Uuid, count: i64) -> Result<(), AppError> {
        if let Some(user) = self.guard.user_mut(user_id) {
            user.cached_hunts_joined_count = count;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut tx = self;
        tx.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        let mut tx = self;
        tx.restore();
        Ok(())
    }
}
