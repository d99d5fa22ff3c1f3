//! Unit tests for the row-level rules on hunts and participants

use super::*;
use aurora_addict_shared::{CreateHuntRequest, ParticipantStatus, PaymentStatus, UpdateHuntRequest};
use chrono::{Duration, Utc};
use uuid::Uuid;

fn sample_hunt() -> Hunt {
    let start = Utc::now() + Duration::days(2);
    let request = CreateHuntRequest {
        title: "Abisko aurora watch".to_string(),
        description: Some("Lake shore, bring layers".to_string()),
        location: "Abisko".to_string(),
        timezone: Some("Europe/Stockholm".to_string()),
        start_date: start,
        end_date: start + Duration::hours(5),
        is_paid: false,
        price: None,
        capacity: Some(2),
        requires_approval: false,
    };
    Hunt::from_request(Uuid::new_v4(), &request)
}

#[test]
fn test_hunt_start_gating() {
    let mut hunt = sample_hunt();
    let before = hunt.start_date - Duration::minutes(30);

    assert!(!hunt.has_started(before));
    assert!(!hunt.is_waitlist_frozen(before));
    assert!(hunt.has_started(hunt.start_date));

    hunt.started_at = Some(before);
    assert!(!hunt.has_started(before));
    assert!(hunt.is_waitlist_frozen(before));
}

#[test]
fn test_apply_update_keeps_window_valid() {
    let mut hunt = sample_hunt();
    let update = UpdateHuntRequest {
        end_date: Some(hunt.start_date - Duration::hours(1)),
        ..Default::default()
    };
    assert!(matches!(hunt.apply_update(&update), Err(crate::error::AppError::Validation(_))));

    let mut hunt = sample_hunt();
    let update = UpdateHuntRequest {
        title: Some("Moved to the ridge".to_string()),
        capacity: Some(5),
        ..Default::default()
    };
    hunt.apply_update(&update).unwrap();
    assert_eq!(hunt.title, "Moved to the ridge");
    assert_eq!(hunt.capacity, Some(5));
    assert!(!hunt.is_paid);
}

#[test]
fn test_apply_update_clears_optional_fields() {
    let mut hunt = sample_hunt();
    let update = UpdateHuntRequest {
        clear_capacity: true,
        clear_description: true,
        ..Default::default()
    };
    hunt.apply_update(&update).unwrap();
    assert_eq!(hunt.capacity, None);
    assert_eq!(hunt.description, None);

    let mut hunt = sample_hunt();
    let update = UpdateHuntRequest {
        capacity: Some(4),
        clear_capacity: true,
        ..Default::default()
    };
    assert!(matches!(hunt.apply_update(&update), Err(crate::error::AppError::Validation(_))));
    assert_eq!(hunt.capacity, Some(2));
}

#[test]
fn test_hunt_response_carries_counts() {
    let hunt = sample_hunt();
    let response = hunt.to_response(HuntCounts { confirmed: 2, waitlisted: 1, pending: 0 });
    assert_eq!(response.organizer_id, hunt.user_id);
    assert_eq!(response.confirmed_count, 2);
    assert_eq!(response.waitlisted_count, 1);
}

#[test]
fn test_participation_state_display() {
    let free = ParticipationState::new(ParticipantStatus::Waitlisted, None);
    assert_eq!(free.to_string(), "waitlisted");

    let paid = ParticipationState::new(ParticipantStatus::Pending, Some(PaymentStatus::MarkedPaid));
    assert_eq!(paid.to_string(), "pending (payment marked_paid)");
}
