use super::*;
use crate::models::{Hunt, User};
use crate::repositories::MemoryStore;
use crate::services::counter_service::CounterService;
use crate::services::hunt_service::HuntService;
use crate::services::participation_service::ParticipationService;
use aurora_addict_shared::{CreateHuntRequest, PaymentStatus, UserRole};
use rust_decimal::Decimal;

struct Fixture {
    store: MemoryStore,
    participation: ParticipationService,
    hunts: HuntService,
    sweep: SweepService,
    organizer: User,
}

async fn setup() -> Fixture {
    let store = MemoryStore::new();
    let events = EventBus::new();
    let shared: Arc<dyn ParticipationStore> = Arc::new(store.clone());
    let organizer = store
        .add_user(User::new("organizer", "organizer@example.com", UserRole::Organizer))
        .await;

    Fixture {
        participation: ParticipationService::new(shared.clone(), events.clone()),
        hunts: HuntService::new(shared.clone(), events.clone()),
        sweep: SweepService::new(shared, events, SweepConfig::default()),
        store,
        organizer,
    }
}

impl Fixture {
    async fn user(&self, name: &str) -> User {
        self.store
            .add_user(User::new(name, &format!("{}@example.com", name), UserRole::User))
            .await
    }

    async fn hunt_starting_in(&self, lead: Duration, capacity: Option<i32>, is_paid: bool, requires_approval: bool) -> Hunt {
        let start = Utc::now() + lead;
        let request = CreateHuntRequest {
            title: "Aurora chase".to_string(),
            description: None,
            location: "Rovaniemi".to_string(),
            timezone: Some("Europe/Helsinki".to_string()),
            start_date: start,
            end_date: start + Duration::hours(4),
            is_paid,
            price: is_paid.then(|| Decimal::from(30)),
            capacity,
            requires_approval,
        };
        self.hunts.create_hunt(self.organizer.id, request).await.unwrap()
    }

    async fn participation(&self, hunt_id: Uuid, user_id: Uuid) -> Participant {
        self.participation.get_participation(user_id, hunt_id).await.unwrap()
    }
}

#[tokio::test]
async fn test_stale_pending_payment_expires_after_ttl() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(20), Some(5), true, false).await;
    let alice = f.user("alice").await;
    let bob = f.user("bob").await;

    let stale = f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    f.participation.join_hunt(bob.id, hunt.id).await.unwrap();

    let now = Utc::now();
    f.store.backdate_participant(stale.id, now - Duration::days(8)).await.unwrap();

    let report = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(report.expired_payments, 1);
    assert_eq!(report.processed_count, 1);

    let expired = f.participation(hunt.id, alice.id).await;
    assert_eq!(expired.status, ParticipantStatus::Cancelled);
    assert_eq!(expired.payment_status, Some(PaymentStatus::Pending));

    let fresh = f.participation(hunt.id, bob.id).await;
    assert_eq!(fresh.status, ParticipantStatus::Pending);

    // Already processed rows are left alone
    let rerun = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(rerun, SweepReport::default());
}

#[tokio::test]
async fn test_marked_paid_participation_also_expires() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(20), Some(5), true, false).await;
    let alice = f.user("alice").await;

    let participant = f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    f.participation.mark_paid(alice.id, hunt.id).await.unwrap();

    let now = Utc::now();
    f.store.backdate_participant(participant.id, now - Duration::days(8)).await.unwrap();

    let report = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(report.expired_payments, 1);

    let expired = f.participation(hunt.id, alice.id).await;
    assert_eq!(expired.status, ParticipantStatus::Cancelled);
    assert_eq!(expired.payment_status, Some(PaymentStatus::MarkedPaid));
}

#[tokio::test]
async fn test_stale_join_request_expires() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(20), None, false, true).await;
    let alice = f.user("alice").await;

    let request = f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    let now = Utc::now();
    f.store.backdate_participant(request.id, now - Duration::days(7) - Duration::minutes(1)).await.unwrap();

    let report = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(report.expired_requests, 1);
    assert_eq!(report.expired_payments, 0);
    assert_eq!(f.participation(hunt.id, alice.id).await.status, ParticipantStatus::Cancelled);
}

#[tokio::test]
async fn test_stale_waitlist_entry_expires_but_confirmed_row_is_kept() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(20), Some(1), false, false).await;
    let alice = f.user("alice").await;
    let bob = f.user("bob").await;

    let confirmed = f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    let waitlisted = f.participation.join_hunt(bob.id, hunt.id).await.unwrap();

    let now = Utc::now();
    f.store.backdate_participant(confirmed.id, now - Duration::days(30)).await.unwrap();
    f.store.backdate_participant(waitlisted.id, now - Duration::days(8)).await.unwrap();

    let report = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(report.expired_waitlist, 1);
    assert_eq!(report.processed_count, 1);
    assert_eq!(f.participation(hunt.id, alice.id).await.status, ParticipantStatus::Confirmed);
    assert_eq!(f.participation(hunt.id, bob.id).await.status, ParticipantStatus::Cancelled);
    assert_eq!(f.store.user(alice.id).await.unwrap().cached_hunts_joined_count, 1);
    assert_eq!(f.store.user(bob.id).await.unwrap().cached_hunts_joined_count, 0);

    let rerun = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(rerun, SweepReport::default());
}

#[tokio::test]
async fn test_frozen_waitlist_is_not_expired() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::minutes(30), Some(1), false, false).await;
    let alice = f.user("alice").await;
    let bob = f.user("bob").await;

    f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    let waitlisted = f.participation.join_hunt(bob.id, hunt.id).await.unwrap();

    let report = f.sweep.run_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.frozen_hunts, 1);

    let now = Utc::now();
    f.store.backdate_participant(waitlisted.id, now - Duration::days(8)).await.unwrap();

    let rerun = f.sweep.run_sweep(now).await.unwrap();
    assert_eq!(rerun.expired_waitlist, 0);
    assert_eq!(f.participation(hunt.id, bob.id).await.status, ParticipantStatus::Waitlisted);
}

#[tokio::test]
async fn test_waitlist_freezes_before_start() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::minutes(30), Some(1), false, false).await;
    let alice = f.user("alice").await;
    let bob = f.user("bob").await;

    f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    f.participation.join_hunt(bob.id, hunt.id).await.unwrap();

    let report = f.sweep.run_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.frozen_hunts, 1);
    assert!(f.store.find_hunt(hunt.id).await.unwrap().unwrap().started_at.is_some());

    // A seat freed after the freeze stays empty
    let departure = f.participation.leave_hunt(alice.id, hunt.id).await.unwrap();
    assert!(departure.promoted.is_none());
    assert!(!f.participation.promote_next_waitlisted(hunt.id).await.unwrap());

    let rerun = f.sweep.run_sweep(Utc::now()).await.unwrap();
    assert_eq!(rerun.frozen_hunts, 0);
    assert_eq!(rerun.promotions, 0);
    assert_eq!(f.participation(hunt.id, bob.id).await.status, ParticipantStatus::Waitlisted);
}

#[tokio::test]
async fn test_hunts_outside_freeze_window_stay_open() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::hours(3), Some(1), false, false).await;

    let report = f.sweep.run_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.frozen_hunts, 0);
    assert!(f.store.find_hunt(hunt.id).await.unwrap().unwrap().started_at.is_none());
}

#[tokio::test]
async fn test_promotion_pass_fills_free_seats() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(2), Some(1), false, false).await;
    let alice = f.user("alice").await;
    let bob = f.user("bob").await;

    let confirmed = f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    f.participation.join_hunt(bob.id, hunt.id).await.unwrap();

    // Free a seat behind the service's back, as an interrupted write would
    let mut tx = f.store.begin().await.unwrap();
    let mut freed = confirmed.clone();
    freed.status = ParticipantStatus::Cancelled;
    tx.save_participant(&freed).await.unwrap();
    tx.adjust_joined_count(alice.id, -1).await.unwrap();
    tx.commit().await.unwrap();

    let report = f.sweep.run_sweep(Utc::now()).await.unwrap();
    assert_eq!(report.promotions, 1);
    assert_eq!(f.participation(hunt.id, bob.id).await.status, ParticipantStatus::Confirmed);
    assert_eq!(f.store.user(bob.id).await.unwrap().cached_hunts_joined_count, 1);

    let rerun = f.sweep.run_sweep(Utc::now()).await.unwrap();
    assert_eq!(rerun.promotions, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_overbook() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(20), Some(1), false, false).await;
    let counters = CounterService::new(Arc::new(f.store.clone()));

    let mut users = Vec::new();
    for i in 0..8 {
        users.push(f.user(&format!("chaser{}", i)).await);
    }

    let joins = users.iter().map(|user| {
        let participation = f.participation.clone();
        let (user_id, hunt_id) = (user.id, hunt.id);
        tokio::spawn(async move { participation.join_hunt(user_id, hunt_id).await })
    });
    let joined: Vec<Participant> = futures_util::future::join_all(joins)
        .await
        .into_iter()
        .map(|handle| handle.unwrap().unwrap())
        .collect();

    let confirmed = joined.iter().filter(|p| p.status == ParticipantStatus::Confirmed).count();
    let waitlisted = joined.iter().filter(|p| p.status == ParticipantStatus::Waitlisted).count();
    assert_eq!(confirmed, 1);
    assert_eq!(waitlisted, 7);

    let response = f.hunts.get_hunt(hunt.id).await.unwrap();
    assert_eq!(response.confirmed_count, 1);
    assert_eq!(response.waitlisted_count, 7);

    for user in &users {
        let recount = counters.recompute_cached_counters(user.id).await.unwrap();
        assert!(!recount.repaired, "counter drifted for {}", user.username);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_leave_racing_sweep_promotes_exactly_once() {
    let f = setup().await;
    let hunt = f.hunt_starting_in(Duration::days(20), Some(1), false, false).await;
    let counters = CounterService::new(Arc::new(f.store.clone()));
    let alice = f.user("alice").await;
    let bob = f.user("bob").await;
    let carol = f.user("carol").await;

    f.participation.join_hunt(alice.id, hunt.id).await.unwrap();
    f.participation.join_hunt(bob.id, hunt.id).await.unwrap();
    f.participation.join_hunt(carol.id, hunt.id).await.unwrap();

    let leave = {
        let participation = f.participation.clone();
        let (user_id, hunt_id) = (alice.id, hunt.id);
        tokio::spawn(async move { participation.leave_hunt(user_id, hunt_id).await })
    };
    let sweep = {
        let sweep = f.sweep.clone();
        tokio::spawn(async move { sweep.run_sweep(Utc::now()).await })
    };
    let (departure, report) = tokio::join!(leave, sweep);
    let departure = departure.unwrap().unwrap();
    let report = report.unwrap().unwrap();

    // Whichever side freed the seat, only one of them fills it
    let promoted_by_leave = usize::from(departure.promoted.is_some());
    assert_eq!(promoted_by_leave + report.promotions, 1);

    assert_eq!(f.participation(hunt.id, bob.id).await.status, ParticipantStatus::Confirmed);
    assert_eq!(f.participation(hunt.id, carol.id).await.status, ParticipantStatus::Waitlisted);

    let response = f.hunts.get_hunt(hunt.id).await.unwrap();
    assert_eq!(response.confirmed_count, 1);

    for user in [&alice, &bob, &carol] {
        let recount = counters.recompute_cached_counters(user.id).await.unwrap();
        assert!(!recount.repaired, "counter drifted for {}", user.username);
    }
}
