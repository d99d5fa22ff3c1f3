use actix_web::{delete, get, post, web, HttpResponse, Result};
use aurora_addict_shared::{
    LeaveHuntResponse, ParticipantResponse, ParticipantStatus, ParticipationChangeResponse,
    PaymentDecision, PaymentRejectedResponse, PaymentStatus, ReviewDecision,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::Participant;
use crate::services::{Departure, ParticipationService, PaymentResolution};

fn status_message(participant: &Participant) -> &'static str {
    match (participant.status, participant.payment_status) {
        (ParticipantStatus::Confirmed, _) => "You're confirmed for this hunt",
        (ParticipantStatus::Waitlisted, Some(PaymentStatus::Confirmed)) => {
            "Payment confirmed, you keep your place on the waitlist"
        }
        (ParticipantStatus::Waitlisted, _) => "Hunt is full, you've been added to the waitlist",
        (ParticipantStatus::Pending, Some(PaymentStatus::MarkedPaid)) => {
            "Payment reported, waiting for the organizer to confirm it"
        }
        (ParticipantStatus::Pending, Some(_)) => "Payment required to confirm your spot",
        (ParticipantStatus::Pending, None) => "Join request sent to the organizer",
        (ParticipantStatus::Cancelled, _) => "Participation cancelled",
    }
}

fn change_response(participant: &Participant) -> ParticipationChangeResponse {
    ParticipationChangeResponse {
        participant: participant.to_response(),
        message: status_message(participant).to_string(),
    }
}

fn departure_response(departure: &Departure) -> LeaveHuntResponse {
    let promoted_user_id = departure.promoted.as_ref().map(|p| p.user_id);
    let message = match promoted_user_id {
        Some(_) => "Participation cancelled, the next waitlisted participant took the spot",
        None => "Participation cancelled",
    };

    LeaveHuntResponse {
        participant: departure.participant.to_response(),
        promoted_user_id,
        message: message.to_string(),
    }
}

#[get("/{hunt_id}/participants")]
pub async fn list_participants(
    path: web::Path<Uuid>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let participants: Vec<ParticipantResponse> = participation_service
        .list_participants(path.into_inner())
        .await?
        .iter()
        .map(Participant::to_response)
        .collect();

    Ok(HttpResponse::Ok().json(participants))
}

/// The caller's own participation
#[get("/{hunt_id}/participation")]
pub async fn get_participation(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let participant = participation_service
        .get_participation(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(change_response(&participant)))
}

#[post("/{hunt_id}/join")]
pub async fn join_hunt(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let hunt_id = path.into_inner();
    debug!("User {} joining hunt {}", user.user_id, hunt_id);

    let participant = participation_service.join_hunt(user.user_id, hunt_id).await?;
    Ok(HttpResponse::Created().json(change_response(&participant)))
}

#[post("/{hunt_id}/leave")]
pub async fn leave_hunt(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let hunt_id = path.into_inner();
    debug!("User {} leaving hunt {}", user.user_id, hunt_id);

    let departure = participation_service.leave_hunt(user.user_id, hunt_id).await?;
    Ok(HttpResponse::Ok().json(departure_response(&departure)))
}

#[post("/{hunt_id}/mark-paid")]
pub async fn mark_paid(
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let participant = participation_service
        .mark_paid(user.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(change_response(&participant)))
}

/// Organizer settles a reported payment: `{"action": "confirm" | "reject"}`
#[post("/{hunt_id}/participants/{user_id}/payment")]
pub async fn resolve_payment(
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
    decision: web::Json<PaymentDecision>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let (hunt_id, participant_user_id) = path.into_inner();
    debug!(
        "Organizer {} resolving payment of user {} for hunt {}",
        user.user_id, participant_user_id, hunt_id
    );

    let resolution = participation_service
        .resolve_payment(user.user_id, hunt_id, participant_user_id, decision.into_inner())
        .await?;

    match resolution {
        PaymentResolution::Confirmed(participant) => Ok(HttpResponse::Ok().json(change_response(&participant))),
        PaymentResolution::Rejected(rejected) => Ok(HttpResponse::Ok().json(PaymentRejectedResponse {
            hunt_id: rejected.hunt_id,
            user_id: rejected.user_id,
            message: "Payment rejected, participation removed".to_string(),
        })),
    }
}

/// Organizer decides a join request: `{"action": "approve" | "reject"}`
#[post("/{hunt_id}/participants/{user_id}/review")]
pub async fn review_join_request(
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
    decision: web::Json<ReviewDecision>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let (hunt_id, participant_user_id) = path.into_inner();

    let participant = participation_service
        .review_join_request(user.user_id, hunt_id, participant_user_id, decision.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(change_response(&participant)))
}

#[delete("/{hunt_id}/participants/{user_id}")]
pub async fn remove_participant(
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
    participation_service: web::Data<ParticipationService>,
) -> Result<HttpResponse, AppError> {
    let (hunt_id, participant_user_id) = path.into_inner();

    let departure = participation_service
        .remove_participant(user.user_id, hunt_id, participant_user_id)
        .await?;
    Ok(HttpResponse::Ok().json(departure_response(&departure)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn participant(status: ParticipantStatus, payment_status: Option<PaymentStatus>) -> Participant {
        let now = Utc::now();
        Participant {
            id: Uuid::new_v4(),
            hunt_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status,
            payment_status,
            joined_at: now,
            paid_at: None,
            seq: 1,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            status_message(&participant(ParticipantStatus::Waitlisted, None)),
            "Hunt is full, you've been added to the waitlist"
        );
        assert_eq!(
            status_message(&participant(ParticipantStatus::Pending, Some(PaymentStatus::Pending))),
            "Payment required to confirm your spot"
        );
        assert_eq!(
            status_message(&participant(ParticipantStatus::Pending, None)),
            "Join request sent to the organizer"
        );
    }

    #[test]
    fn test_departure_reports_promoted_user() {
        let promoted = participant(ParticipantStatus::Confirmed, None);
        let departure = Departure {
            participant: participant(ParticipantStatus::Cancelled, None),
            promoted: Some(promoted.clone()),
        };

        let response = departure_response(&departure);
        assert_eq!(response.promoted_user_id, Some(promoted.user_id));
        assert_eq!(response.participant.status, ParticipantStatus::Cancelled);
    }
}
