use chrono::{NaiveDate, TimeZone, Utc};
use rosterdeck_core::service::projection::{filter_collection, sections_by_flag};
use rosterdeck_core::{
    AppState, CollectionService, Entity, Outcome, Store, Task, TaskDraft, TaskFlag, TaskStats,
    TaskStatus, TaskStatusFilter, User, UserDraft, UserFlag, UserPatch, UserStats,
    UserStatusFilter,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Clock that advances one millisecond per call.
fn ticking_clock(start_ms: i64) -> rosterdeck_core::service::Clock {
    let tick = Arc::new(AtomicU64::new(0));
    Arc::new(move || {
        let offset = tick.fetch_add(1, Ordering::SeqCst) as i64;
        Utc.timestamp_millis_opt(start_ms + offset).unwrap()
    })
}

fn seeded_user(id: u64, name: &str, active: bool) -> User {
    User::from_draft(
        id,
        UserDraft {
            name: Some(name.to_string()),
            is_active: Some(active),
            ..UserDraft::default()
        },
        Utc::now(),
    )
}

#[test]
fn create_toggle_delete_scenario() {
    let service = CollectionService::with_clock(
        Store::new(AppState::new(vec![seeded_user(1, "A", true)])),
        ticking_clock(1_700_000_000_000),
    );

    let b = service.create(UserDraft {
        name: Some("B".to_string()),
        ..UserDraft::default()
    });
    let state = service.state();
    assert_eq!(state.collection.len(), 2);
    assert!(b > 1);
    assert!(!state.collection[1].is_active);

    assert_eq!(service.toggle(b, UserFlag::Active), Outcome::Applied);
    assert!(service.get(b).unwrap().is_active);

    assert_eq!(service.delete(1), Outcome::Applied);
    let state = service.state();
    assert_eq!(state.collection.len(), 1);
    assert_eq!(state.collection[0].id, b);
    assert_eq!(state.collection[0].name, "B");
    assert!(state.collection[0].is_active);
}

#[test]
fn ids_stay_unique_under_a_frozen_clock() {
    let frozen: rosterdeck_core::service::Clock =
        Arc::new(|| Utc.timestamp_millis_opt(1_000).unwrap());
    let service: CollectionService<User> =
        CollectionService::with_clock(Store::new(AppState::new(Vec::new())), frozen);

    let ids: Vec<u64> = (0..50).map(|_| service.create(UserDraft::default())).collect();

    let mut unique = ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(ids[0], 1_000);
}

#[test]
fn create_from_inside_a_subscriber_keeps_ids_unique() {
    let service = Arc::new(CollectionService::with_clock(
        Store::new(AppState::<User>::new(Vec::new())),
        Arc::new(|| Utc.timestamp_millis_opt(5_000).unwrap()),
    ));

    let nested = Arc::clone(&service);
    service.store().subscribe(move |state: &Arc<AppState<User>>| {
        if state.collection.len() == 1 {
            nested.create(UserDraft {
                name: Some("echo".to_string()),
                ..UserDraft::default()
            });
        }
    });

    let first = service.create(UserDraft::default());

    let state = service.state();
    assert_eq!(state.collection.len(), 2);
    assert_eq!(state.collection[0].id, first);
    assert_ne!(state.collection[0].id, state.collection[1].id);
    service.store().dispose();
}

#[test]
fn update_preserves_order_and_unmentioned_fields() {
    let service = CollectionService::new(Store::new(AppState::new(vec![
        seeded_user(1, "A", true),
        seeded_user(2, "B", true),
        seeded_user(3, "C", false),
    ])));

    let outcome = service.update(
        2,
        UserPatch {
            name: Some("Bee".to_string()),
            ..UserPatch::default()
        },
    );

    assert_eq!(outcome, Outcome::Applied);
    let state = service.state();
    let names: Vec<&str> = state.collection.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["A", "Bee", "C"]);
    assert!(service.get(2).unwrap().is_active);
}

#[test]
fn filtering_and_stats_follow_collection_changes() {
    let service = CollectionService::new(Store::new(AppState::new(vec![
        seeded_user(1, "Leanne", true),
        seeded_user(2, "Ervin", false),
    ])));
    service.toggle(2, UserFlag::Active);

    let state = service.state();
    let active = filter_collection(&state.collection, "", UserStatusFilter::Active);
    assert_eq!(active.len(), 2);
    let (on, off) = sections_by_flag(&state.collection, UserFlag::Active);
    assert_eq!((on.len(), off.len()), (2, 0));
    assert_eq!(UserStats::from_users(&state.collection).active, 2);
}

#[test]
fn task_dashboard_counts_overdue_open_tasks() {
    let created = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
    let service: CollectionService<Task> = CollectionService::with_clock(
        Store::new(AppState::new(Vec::new())),
        Arc::new(move || created),
    );
    let due = |day| NaiveDate::from_ymd_opt(2024, 2, day);

    let late = service.create(TaskDraft {
        title: Some("File taxes".to_string()),
        due_date: due(5),
        ..TaskDraft::default()
    });
    let done = service.create(TaskDraft {
        title: Some("Book flights".to_string()),
        due_date: due(3),
        ..TaskDraft::default()
    });
    service.create(TaskDraft {
        title: Some("Plan trip".to_string()),
        due_date: due(20),
        ..TaskDraft::default()
    });
    service.toggle(done, TaskFlag::Completed);

    let state = service.state();
    let today = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
    let stats = TaskStats::from_tasks(&state.collection, today);
    assert_eq!((stats.total, stats.completed, stats.pending, stats.overdue), (3, 1, 2, 1));
    assert_eq!(stats.in_progress, 0);

    let pending = filter_collection(&state.collection, "TAX", TaskStatusFilter::Pending);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, late);

    assert_eq!(service.set_status(late, TaskStatus::InProgress), Outcome::Applied);
    let state = service.state();
    let stats = TaskStats::from_tasks(&state.collection, today);
    assert_eq!((stats.in_progress, stats.pending, stats.overdue), (1, 2, 1));
    let working = TaskStatusFilter::parse("In Progress").unwrap();
    assert_eq!(filter_collection(&state.collection, "", working)[0].id, late);
}

#[test]
fn create_then_delete_restores_prior_collection() {
    let service = CollectionService::new(Store::new(AppState::new(vec![
        seeded_user(1, "A", true),
        seeded_user(2, "B", false),
    ])));
    let before = service.state();

    let id = service.create(UserDraft {
        name: Some("Temp".to_string()),
        ..UserDraft::default()
    });
    assert_eq!(service.delete(id), Outcome::Applied);

    let after = service.state();
    assert_eq!(after.collection.len(), before.collection.len());
    assert_eq!(*after.collection, *before.collection);
}
