use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use horizon_connect_lib::error::{RegistrationError, StoreError};
use horizon_connect_lib::models::{Event, EventId};
use horizon_connect_lib::registration::{
    FormHint, Registration, RegistrationForm, RegistrationState,
};
use horizon_connect_lib::scope::ScreenScope;
use horizon_connect_lib::store::{EventStore, SqliteEventStore};

/// Wraps a store and counts every call that would hit the network.
struct CountingStore {
    inner: SqliteEventStore,
    calls: AtomicUsize,
    fail_writes: bool,
}

impl CountingStore {
    fn new(inner: SqliteEventStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            fail_writes: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_events().await
    }

    async fn get_event(&self, id: &EventId) -> Result<Event, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_event(id).await
    }

    async fn update_spots(&self, id: &EventId, spots: u32) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.update_spots(id, spots).await
    }

    async fn decrement_spots(&self, id: &EventId, expected: u32) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::Http("connection reset".into()));
        }
        self.inner.decrement_spots(id, expected).await
    }
}

async fn store_with_spots(id: &str, spots: u32) -> SqliteEventStore {
    let store = SqliteEventStore::open_in_memory().unwrap();
    store.update_spots(&EventId::from(id), spots).await.unwrap();
    store
}

#[tokio::test]
async fn last_spot_then_blocked_locally() {
    let counting = Arc::new(CountingStore::new(store_with_spots("1", 1).await));
    let mut registration = Registration::new(counting.clone(), "1");

    assert!(matches!(registration.load().await, RegistrationState::Ready(_)));
    assert_eq!(registration.state().event().map(|e| e.spots), Some(1));
    let updated = registration.confirm().await.unwrap();
    assert_eq!(updated.spots, 0);
    assert!(matches!(registration.state(), RegistrationState::Success(e) if e.spots == 0));

    let calls_before = counting.calls();
    let err = registration.confirm().await.unwrap_err();
    assert!(matches!(err, RegistrationError::NoSpotsLeft));
    assert_eq!(counting.calls(), calls_before, "blocked attempt must not reach the store");
    assert_eq!(counting.get_event(&EventId::from("1")).await.unwrap().spots, 0);
}

#[tokio::test]
async fn zero_spots_stay_ready() {
    let counting = Arc::new(CountingStore::new(store_with_spots("3", 0).await));
    let mut registration = Registration::new(counting.clone(), "3");
    registration.load().await;
    let calls_before = counting.calls();

    let err = registration.confirm().await.unwrap_err();
    assert!(matches!(err, RegistrationError::NoSpotsLeft));
    assert_eq!(err.user_message(), "No spots left");
    assert!(matches!(registration.state(), RegistrationState::Ready(_)));
    assert_eq!(counting.calls(), calls_before);
}

#[tokio::test]
async fn concurrent_registrations_take_one_spot() {
    let store: Arc<dyn EventStore> = Arc::new(store_with_spots("2", 1).await);
    let mut first = Registration::new(store.clone(), "2");
    let mut second = Registration::new(store.clone(), "2");
    first.load().await;
    second.load().await;

    let (a, b) = tokio::join!(first.confirm(), second.confirm());
    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let exhausted = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(RegistrationError::NoSpotsLeft)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(exhausted, 1);
    assert_eq!(store.get_event(&EventId::from("2")).await.unwrap().spots, 0);
}

#[tokio::test]
async fn stale_snapshot_is_a_conflict() {
    let store: Arc<dyn EventStore> = Arc::new(store_with_spots("2", 5).await);
    let mut registration = Registration::new(store.clone(), "2");
    registration.load().await;
    store.update_spots(&EventId::from("2"), 3).await.unwrap();

    let err = registration.confirm().await.unwrap_err();
    assert!(matches!(err, RegistrationError::Conflict));
    assert!(matches!(registration.state(), RegistrationState::Ready(e) if e.spots == 5));
    assert_eq!(store.get_event(&EventId::from("2")).await.unwrap().spots, 3);
}

#[tokio::test]
async fn failed_write_returns_to_ready() {
    let mut counting = CountingStore::new(store_with_spots("1", 4).await);
    counting.fail_writes = true;
    let counting = Arc::new(counting);
    let mut registration = Registration::new(counting.clone(), "1");
    registration.load().await;

    let err = registration.confirm().await.unwrap_err();
    assert!(matches!(err, RegistrationError::Submission(_)));
    assert_eq!(err.user_message(), "Registration failed. Try again.");
    assert!(matches!(registration.state(), RegistrationState::Ready(e) if e.spots == 4));
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let store: Arc<dyn EventStore> = Arc::new(SqliteEventStore::open_in_memory().unwrap());
    let mut registration = Registration::new(store, "99");
    assert_eq!(registration.load().await, &RegistrationState::NotFound);
    assert!(matches!(
        registration.confirm().await,
        Err(RegistrationError::NotReady)
    ));
}

#[tokio::test]
async fn left_screen_keeps_state() {
    let store: Arc<dyn EventStore> = Arc::new(SqliteEventStore::open_in_memory().unwrap());
    let mut registration = Registration::new(store.clone(), "1");
    registration.leave();
    assert_eq!(registration.load().await, &RegistrationState::Idle);
    assert_eq!(store.get_event(&EventId::from("1")).await.unwrap().spots, 10);
}

#[tokio::test]
async fn leaving_a_shared_screen_keeps_the_loaded_snapshot() {
    let store: Arc<dyn EventStore> = Arc::new(SqliteEventStore::open_in_memory().unwrap());
    let screen = ScreenScope::new();
    let mut registration = Registration::with_scope(store.clone(), "2", screen.clone());
    assert_eq!(registration.event_id(), &EventId::from(2_i64));
    registration.load().await;

    screen.leave();
    assert!(matches!(
        registration.confirm().await,
        Err(RegistrationError::Cancelled)
    ));
    assert!(matches!(registration.state(), RegistrationState::Ready(e) if e.spots == 25));
    assert_eq!(store.get_event(&EventId::from("2")).await.unwrap().spots, 25);
}

#[test]
fn form_hints_never_block() {
    let form = RegistrationForm {
        full_name: " ".into(),
        email: "bob.jobs".into(),
        phone: String::new(),
    };
    assert_eq!(form.hints(), [FormHint::MissingName, FormHint::EmailFormat]);

    let form = RegistrationForm {
        full_name: "Bob Jobs".into(),
        email: "bob@example.com".into(),
        phone: String::new(),
    };
    assert!(form.hints().is_empty());
}
