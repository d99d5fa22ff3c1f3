use aurora_addict_shared::{
    ParticipantStatus, PaymentDecision, ReviewDecision, ERROR_ALREADY_CANCELLED, ERROR_ALREADY_JOINED,
    ERROR_ALREADY_REVIEWED, ERROR_HUNT_NOT_FOUND, ERROR_HUNT_STARTED, ERROR_ORGANIZER_CANNOT_JOIN,
    ERROR_ORGANIZER_CANNOT_LEAVE, ERROR_ORGANIZER_ONLY, ERROR_PARTICIPANT_NOT_FOUND, ERROR_USER_NOT_FOUND,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Hunt, Participant, ParticipationState};
use crate::policy::{self, payment, JoinOutcome};
use crate::repositories::{complete, ParticipationStore, StoreTx};
use crate::services::counter_service::reconcile_user_counter;
use crate::services::event_bus::{EventBus, ParticipationEvent};


/// Join, leave, payment and review transitions. Each operation is a single
/// store transaction holding the hunt lock; events go out after commit.
#[derive(Clone)]
pub struct ParticipationService {
    store: Arc<dyn ParticipationStore>,
    events: EventBus,
}

/// Result of leaving or removing a participant
#[derive(Debug, Clone)]
pub struct Departure {
    pub participant: Participant,
    /// Waitlisted participant who took the freed seat
    pub promoted: Option<Participant>,
}

/// Identity of a participation removed by a payment rejection
#[derive(Debug, Clone, Copy)]
pub struct RejectedPayment {
    pub hunt_id: Uuid,
    pub user_id: Uuid,
}

/// Outcome of an organizer payment decision
#[derive(Debug, Clone)]
pub enum PaymentResolution {
    Confirmed(Participant),
    Rejected(RejectedPayment),
}

pub(crate) async fn lock_hunt(tx: &mut dyn StoreTx, hunt_id: Uuid) -> Result<Hunt, AppError> {
    tx.lock_hunt(hunt_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ERROR_HUNT_NOT_FOUND.to_string()))
}

async fn find_participant(tx: &mut dyn StoreTx, hunt_id: Uuid, user_id: Uuid) -> Result<Participant, AppError> {
    tx.find_participant(hunt_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(ERROR_PARTICIPANT_NOT_FOUND.to_string()))
}

fn require_organizer(hunt: &Hunt, user_id: Uuid) -> Result<(), AppError> {
    if !hunt.is_organizer(user_id) {
        return Err(AppError::Forbidden(ERROR_ORGANIZER_ONLY.to_string()));
    }
    Ok(())
}

fn status_event(participant: &Participant, at: DateTime<Utc>) -> Option<ParticipationEvent> {
    let (hunt_id, user_id) = (participant.hunt_id, participant.user_id);
    match participant.status {
        ParticipantStatus::Confirmed => Some(ParticipationEvent::ParticipantConfirmed { hunt_id, user_id, at }),
        ParticipantStatus::Waitlisted => Some(ParticipationEvent::ParticipantWaitlisted { hunt_id, user_id, at }),
        ParticipantStatus::Cancelled => Some(ParticipationEvent::ParticipantCancelled { hunt_id, user_id, at }),
        ParticipantStatus::Pending => None,
    }
}

/// Persists a state change, keeping the joined counter in step and
/// recording the resulting event
pub(crate) async fn transition(
    tx: &mut dyn StoreTx,
    mut participant: Participant,
    next: ParticipationState,
    at: DateTime<Utc>,
    events: &mut Vec<ParticipationEvent>,
) -> Result<Participant, AppError> {
    let was_counted = participant.is_counted();
    participant.set_state(next);
    let saved = tx.save_participant(&participant).await?;

    match (was_counted, saved.is_counted()) {
        (false, true) => tx.adjust_joined_count(saved.user_id, 1).await?,
        (true, false) => tx.adjust_joined_count(saved.user_id, -1).await?,
        _ => {}
    }

    if let Some(event) = status_event(&saved, at) {
        events.push(event);
    }
    Ok(saved)
}

/// Moves the oldest waitlisted participant out of the waitlist if the hunt
/// has a free seat and is not frozen
pub(crate) async fn promote_locked(
    tx: &mut dyn StoreTx,
    hunt: &Hunt,
    now: DateTime<Utc>,
    events: &mut Vec<ParticipationEvent>,
) -> Result<Option<Participant>, AppError> {
    if hunt.is_waitlist_frozen(now) {
        return Ok(None);
    }

    let confirmed = tx.count_confirmed(hunt.id).await?;
    if !policy::has_free_slot(hunt.capacity, confirmed) {
        return Ok(None);
    }

    let next = match tx.next_waitlisted(hunt.id).await? {
        Some(next) => next,
        None => return Ok(None),
    };

    let target = payment::promotion_target(next.payment_status);
    let promoted = transition(tx, next, target, now, events).await?;
    info!(
        "Promoted user {} on hunt {} from waitlist to {}",
        promoted.user_id,
        hunt.id,
        promoted.state()
    );
    Ok(Some(promoted))
}

/// Promotes until the hunt is full, frozen or out of waitlisted participants
pub(crate) async fn fill_free_slots(
    tx: &mut dyn StoreTx,
    hunt: &Hunt,
    now: DateTime<Utc>,
    events: &mut Vec<ParticipationEvent>,
) -> Result<Vec<Participant>, AppError> {
    let mut promoted = Vec::new();
    while let Some(participant) = promote_locked(tx, hunt, now, events).await? {
        promoted.push(participant);
    }
    Ok(promoted)
}

/// Cancels a live participant and hands a freed seat to the waitlist
pub(crate) async fn cancel_locked(
    tx: &mut dyn StoreTx,
    hunt: &Hunt,
    participant: Participant,
    now: DateTime<Utc>,
    events: &mut Vec<ParticipationEvent>,
) -> Result<Departure, AppError> {
    if !participant.status.is_live() {
        return Err(AppError::InvalidTransition(ERROR_ALREADY_CANCELLED.to_string()));
    }

    let freed_seat = participant.is_counted();
    let next = ParticipationState::new(ParticipantStatus::Cancelled, participant.payment_status);
    let cancelled = transition(tx, participant, next, now, events).await?;

    let promoted = if freed_seat {
        fill_free_slots(tx, hunt, now, events)
            .await?
            .into_iter()
            .find(|p| p.is_counted())
    } else {
        None
    };

    Ok(Departure {
        participant: cancelled,
        promoted,
    })
}

impl ParticipationService {
    pub fn new(store: Arc<dyn ParticipationStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub async fn join_hunt(&self, user_id: Uuid, hunt_id: Uuid) -> Result<Participant, AppError> {
        debug!("User {} joining hunt {}", user_id, hunt_id);

        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result = Self::join_in_tx(tx.as_mut(), user_id, hunt_id, Utc::now(), &mut events).await;
        let participant = complete(tx, result).await?;
        self.events.publish_all(events);

        info!("User {} joined hunt {} as {}", user_id, hunt_id, participant.state());
        Ok(participant)
    }

    async fn join_in_tx(
        tx: &mut dyn StoreTx,
        user_id: Uuid,
        hunt_id: Uuid,
        now: DateTime<Utc>,
        events: &mut Vec<ParticipationEvent>,
    ) -> Result<Participant, AppError> {
        let hunt = lock_hunt(tx, hunt_id).await?;

        if hunt.is_organizer(user_id) {
            return Err(AppError::Forbidden(ERROR_ORGANIZER_CANNOT_JOIN.to_string()));
        }
        if hunt.is_waitlist_frozen(now) {
            return Err(AppError::InvalidTransition(ERROR_HUNT_STARTED.to_string()));
        }
        if tx.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(ERROR_USER_NOT_FOUND.to_string()));
        }

        let existing = tx.find_participant(hunt_id, user_id).await?;
        if existing.as_ref().map_or(false, |p| p.status.is_live()) {
            return Err(AppError::Conflict(ERROR_ALREADY_JOINED.to_string()));
        }

        let confirmed = tx.count_confirmed(hunt_id).await?;
        let state = policy::entry_state(&hunt, confirmed);

        let participant = match existing {
            Some(cancelled) => tx.reset_participant(cancelled.id, state, now).await?,
            None => tx.insert_participant(hunt_id, user_id, state, now).await?,
        };

        if participant.is_counted() {
            tx.adjust_joined_count(user_id, 1).await?;
        }
        if let Some(event) = status_event(&participant, now) {
            events.push(event);
        }

        Ok(participant)
    }

    pub async fn leave_hunt(&self, user_id: Uuid, hunt_id: Uuid) -> Result<Departure, AppError> {
        let now = Utc::now();
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Departure, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            if hunt.is_organizer(user_id) {
                return Err(AppError::Forbidden(ERROR_ORGANIZER_CANNOT_LEAVE.to_string()));
            }
            let participant = find_participant(tx.as_mut(), hunt_id, user_id).await?;
            cancel_locked(tx.as_mut(), &hunt, participant, now, &mut events).await
        }
        .await;
        let departure = complete(tx, result).await?;
        self.events.publish_all(events);

        info!("User {} left hunt {}", user_id, hunt_id);
        Ok(departure)
    }

    /// Organizer cancels someone else's participation
    pub async fn remove_participant(
        &self,
        organizer_id: Uuid,
        hunt_id: Uuid,
        participant_user_id: Uuid,
    ) -> Result<Departure, AppError> {
        let now = Utc::now();
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Departure, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            require_organizer(&hunt, organizer_id)?;
            let participant = find_participant(tx.as_mut(), hunt_id, participant_user_id).await?;
            cancel_locked(tx.as_mut(), &hunt, participant, now, &mut events).await
        }
        .await;
        let departure = complete(tx, result).await?;
        self.events.publish_all(events);

        info!(
            "Organizer {} removed user {} from hunt {}",
            organizer_id, participant_user_id, hunt_id
        );
        Ok(departure)
    }

    pub async fn mark_paid(&self, user_id: Uuid, hunt_id: Uuid) -> Result<Participant, AppError> {
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Participant, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            if !hunt.is_paid {
                return Err(AppError::InvalidTransition("Hunt does not require payment".to_string()));
            }
            let participant = find_participant(tx.as_mut(), hunt_id, user_id).await?;
            let next = payment::mark_paid(participant.state())?;
            transition(tx.as_mut(), participant, next, Utc::now(), &mut events).await
        }
        .await;
        let participant = complete(tx, result).await?;
        self.events.publish_all(events);

        info!("User {} marked payment for hunt {} as paid", user_id, hunt_id);
        Ok(participant)
    }

    pub async fn resolve_payment(
        &self,
        organizer_id: Uuid,
        hunt_id: Uuid,
        participant_user_id: Uuid,
        decision: PaymentDecision,
    ) -> Result<PaymentResolution, AppError> {
        match decision {
            PaymentDecision::Confirm => self
                .confirm_payment(organizer_id, hunt_id, participant_user_id)
                .await
                .map(PaymentResolution::Confirmed),
            PaymentDecision::Reject => self
                .reject_payment(organizer_id, hunt_id, participant_user_id)
                .await
                .map(PaymentResolution::Rejected),
        }
    }

    /// Confirms a reported payment; a full hunt keeps the payer waitlisted
    pub async fn confirm_payment(
        &self,
        organizer_id: Uuid,
        hunt_id: Uuid,
        participant_user_id: Uuid,
    ) -> Result<Participant, AppError> {
        let now = Utc::now();
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Participant, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            require_organizer(&hunt, organizer_id)?;
            let mut participant = find_participant(tx.as_mut(), hunt_id, participant_user_id).await?;

            let confirmed = tx.count_confirmed(hunt_id).await?;
            let outcome = policy::decide_join_outcome(hunt.capacity, confirmed);
            let next = payment::confirm(participant.state(), outcome)?;

            participant.paid_at = Some(now);
            transition(tx.as_mut(), participant, next, now, &mut events).await
        }
        .await;
        let participant = complete(tx, result).await?;
        self.events.publish_all(events);

        info!(
            "Organizer {} confirmed payment of user {} for hunt {}, now {}",
            organizer_id,
            participant_user_id,
            hunt_id,
            participant.status
        );
        Ok(participant)
    }

    /// Rejects an unpaid participation by deleting it
    pub async fn reject_payment(
        &self,
        organizer_id: Uuid,
        hunt_id: Uuid,
        participant_user_id: Uuid,
    ) -> Result<RejectedPayment, AppError> {
        let mut tx = self.store.begin().await?;
        let result: Result<RejectedPayment, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            require_organizer(&hunt, organizer_id)?;
            let participant = find_participant(tx.as_mut(), hunt_id, participant_user_id).await?;
            payment::check_rejectable(participant.state())?;

            tx.delete_participant(participant.id).await?;
            if participant.is_counted() {
                warn!(
                    "Rejected participation {} was counted as confirmed",
                    participant.id
                );
            }
            reconcile_user_counter(tx.as_mut(), participant_user_id).await?;

            Ok(RejectedPayment {
                hunt_id,
                user_id: participant_user_id,
            })
        }
        .await;
        let rejected = complete(tx, result).await?;

        info!(
            "Organizer {} rejected payment of user {} for hunt {}",
            organizer_id, participant_user_id, hunt_id
        );
        Ok(rejected)
    }

    /// Organizer decision on a join request of an approval-gated hunt
    pub async fn review_join_request(
        &self,
        organizer_id: Uuid,
        hunt_id: Uuid,
        participant_user_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<Participant, AppError> {
        let now = Utc::now();
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Participant, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            require_organizer(&hunt, organizer_id)?;
            let participant = find_participant(tx.as_mut(), hunt_id, participant_user_id).await?;

            if participant.payment_status.is_some() {
                return Err(AppError::InvalidTransition(
                    "Paid participations are settled through payment review".to_string(),
                ));
            }
            if participant.status != ParticipantStatus::Pending {
                return Err(AppError::Conflict(ERROR_ALREADY_REVIEWED.to_string()));
            }

            let next = match decision {
                ReviewDecision::Approve => {
                    let confirmed = tx.count_confirmed(hunt_id).await?;
                    let outcome: JoinOutcome = policy::decide_join_outcome(hunt.capacity, confirmed);
                    ParticipationState::new(outcome.status(), None)
                }
                ReviewDecision::Reject => ParticipationState::new(ParticipantStatus::Cancelled, None),
            };
            transition(tx.as_mut(), participant, next, now, &mut events).await
        }
        .await;
        let participant = complete(tx, result).await?;
        self.events.publish_all(events);

        info!(
            "Organizer {} reviewed join request of user {} for hunt {}: {}",
            organizer_id, participant_user_id, hunt_id, participant.status
        );
        Ok(participant)
    }

    /// Promotes the oldest waitlisted participant if a seat is free.
    /// Returns whether anyone left the waitlist.
    pub async fn promote_next_waitlisted(&self, hunt_id: Uuid) -> Result<bool, AppError> {
        self.promote_at(hunt_id, Utc::now()).await
    }

    pub(crate) async fn promote_at(&self, hunt_id: Uuid, now: DateTime<Utc>) -> Result<bool, AppError> {
        let mut events = Vec::new();
        let mut tx = self.store.begin().await?;
        let result: Result<Option<Participant>, AppError> = async {
            let hunt = lock_hunt(tx.as_mut(), hunt_id).await?;
            promote_locked(tx.as_mut(), &hunt, now, &mut events).await
        }
        .await;
        let promoted = complete(tx, result).await?;
        self.events.publish_all(events);

        Ok(promoted.is_some())
    }

    pub async fn list_participants(&self, hunt_id: Uuid) -> Result<Vec<Participant>, AppError> {
        if self.store.find_hunt(hunt_id).await?.is_none() {
            return Err(AppError::NotFound(ERROR_HUNT_NOT_FOUND.to_string()));
        }
        self.store.list_participants(hunt_id).await
    }

    pub async fn get_participation(&self, user_id: Uuid, hunt_id: Uuid) -> Result<Participant, AppError> {
        self.store
            .find_participant(hunt_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(ERROR_PARTICIPANT_NOT_FOUND.to_string()))
    }
}
