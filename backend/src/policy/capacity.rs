use aurora_addict_shared::{ParticipantStatus, PaymentStatus};

use crate::models::{Hunt, ParticipationState};

/// Outcome of asking for a confirmed seat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Confirmed,
    Waitlisted,
}

impl JoinOutcome {
    pub fn status(self) -> ParticipantStatus {
        match self {
            JoinOutcome::Confirmed => ParticipantStatus::Confirmed,
            JoinOutcome::Waitlisted => ParticipantStatus::Waitlisted,
        }
    }
}

/// A seat is available when the hunt is unlimited or below capacity
pub fn decide_join_outcome(capacity: Option<i32>, confirmed_count: i64) -> JoinOutcome {
    if has_free_slot(capacity, confirmed_count) {
        JoinOutcome::Confirmed
    } else {
        JoinOutcome::Waitlisted
    }
}

/// Remaining confirmed seats, `None` when unlimited
pub fn free_slots(capacity: Option<i32>, confirmed_count: i64) -> Option<i64> {
    capacity.map(|capacity| (i64::from(capacity) - confirmed_count).max(0))
}

pub fn has_free_slot(capacity: Option<i32>, confirmed_count: i64) -> bool {
    free_slots(capacity, confirmed_count).map_or(true, |slots| slots > 0)
}

/// State a fresh join lands in.
///
/// Paid hunts always enter the payment gate and approval-gated hunts wait for
/// the organizer; neither consumes a seat until confirmed.
pub fn entry_state(hunt: &Hunt, confirmed_count: i64) -> ParticipationState {
    if hunt.is_paid {
        return ParticipationState::new(ParticipantStatus::Pending, Some(PaymentStatus::Pending));
    }
    if hunt.requires_approval {
        return ParticipationState::new(ParticipantStatus::Pending, None);
    }
    ParticipationState::new(decide_join_outcome(hunt.capacity, confirmed_count).status(), None)
}
