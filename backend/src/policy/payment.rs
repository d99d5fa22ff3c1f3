//! Payment sub-state machine for paid hunts.
//!
//! ```text
//! (pending, pending) --mark_paid--> (pending, marked_paid)
//! (pending, marked_paid) --confirm--> (confirmed | waitlisted, confirmed)
//! (pending, pending) --reject--> row removed
//! ```

use aurora_addict_shared::{ParticipantStatus, PaymentStatus};

use crate::error::AppError;
use crate::models::ParticipationState;
use crate::policy::JoinOutcome;

const AWAITING_PAYMENT: ParticipationState =
    ParticipationState::new(ParticipantStatus::Pending, Some(PaymentStatus::Pending));

fn require_paid_hunt(state: ParticipationState) -> Result<(), AppError> {
    if state.payment_status.is_none() {
        return Err(AppError::InvalidTransition("Hunt does not require payment".to_string()));
    }
    Ok(())
}

/// The participant reports an out-of-band payment
pub fn mark_paid(state: ParticipationState) -> Result<ParticipationState, AppError> {
    require_paid_hunt(state)?;
    if state != AWAITING_PAYMENT {
        return Err(AppError::InvalidTransition(format!(
            "Cannot mark paid from {}",
            state
        )));
    }
    Ok(ParticipationState::new(ParticipantStatus::Pending, Some(PaymentStatus::MarkedPaid)))
}

/// The organizer confirms a reported payment. A full hunt keeps the payer
/// waitlisted with their payment on record.
pub fn confirm(state: ParticipationState, outcome: JoinOutcome) -> Result<ParticipationState, AppError> {
    require_paid_hunt(state)?;
    if state != ParticipationState::new(ParticipantStatus::Pending, Some(PaymentStatus::MarkedPaid)) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot confirm payment from {}",
            state
        )));
    }
    Ok(ParticipationState::new(outcome.status(), Some(PaymentStatus::Confirmed)))
}

/// Only an unpaid, unreported participation can be rejected
pub fn check_rejectable(state: ParticipationState) -> Result<(), AppError> {
    require_paid_hunt(state)?;
    if state != AWAITING_PAYMENT {
        return Err(AppError::InvalidTransition(format!(
            "Cannot reject payment from {}",
            state
        )));
    }
    Ok(())
}

/// Where a waitlisted participant lands once a seat frees up.
///
/// Free hunt rows and paid rows with a confirmed payment take the seat; any
/// other paid row goes back through the payment gate.
pub fn promotion_target(payment_status: Option<PaymentStatus>) -> ParticipationState {
    match payment_status {
        None => ParticipationState::new(ParticipantStatus::Confirmed, None),
        Some(PaymentStatus::Confirmed) => {
            ParticipationState::new(ParticipantStatus::Confirmed, Some(PaymentStatus::Confirmed))
        }
        Some(_) => AWAITING_PAYMENT,
    }
}
