//! Shared fixtures for the booking service tests

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;

use super::checkout::{CheckoutConfig, CheckoutService, DirectCheckout};
use super::reconciler::PaymentReconciler;
use crate::application::ports::{
    CheckoutSession, CreateSessionRequest, GatewayError, PaymentGateway, SessionSnapshot,
    SessionStatus,
};
use crate::domain::booking::{Booking, BookingRepository, BookingStatus, SlotRef};
use crate::domain::game::{Game, GameRepository, GameStatus};
use crate::domain::slot::{
    Category, PriceMap, Slot, SlotCollection, SlotRepository, SlotStatus, SlotWindow,
};
use crate::domain::sub_venue::{SubVenue, SubVenueRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::storage::InMemoryRepositoryProvider;

// ── Fake gateway ───────────────────────────────────────────────

#[derive(Default)]
struct FakeState {
    sessions: HashMap<String, SessionSnapshot>,
    requests: Vec<CreateSessionRequest>,
    expired: Vec<String>,
    fail_next_create: bool,
    fail_retrieve: bool,
    failing_retrieves: HashSet<String>,
    counter: u32,
}

/// Scripted in-process payment gateway
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn fail_next_create(&self) {
        self.state.lock().unwrap().fail_next_create = true;
    }

    pub fn fail_retrieve(&self, fail: bool) {
        self.state.lock().unwrap().fail_retrieve = fail;
    }

    pub fn fail_retrieve_of(&self, session_id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_retrieves
            .insert(session_id.to_string());
    }

    pub fn set_status(&self, session_id: &str, status: SessionStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.sessions.get_mut(session_id) {
            session.status = status;
        }
    }

    pub fn complete(&self, session_id: &str, payment_intent_id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.sessions.get_mut(session_id) {
            session.status = SessionStatus::Complete;
            session.payment_intent_id = Some(payment_intent_id.to_string());
        }
    }

    pub fn session(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.state.lock().unwrap().sessions.get(session_id).cloned()
    }

    pub fn last_request(&self) -> Option<CreateSessionRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn expired_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().expired.clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.fail_next_create) {
            return Err(GatewayError::Transport("connection reset".into()));
        }
        state.counter += 1;
        let id = format!("cs_test_{}", state.counter);
        state.sessions.insert(
            id.clone(),
            SessionSnapshot {
                id: id.clone(),
                status: SessionStatus::Open,
                payment_intent_id: None,
                metadata: request.metadata.clone(),
            },
        );
        state.requests.push(request);
        Ok(CheckoutSession {
            url: format!("https://pay.test/{}", id),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionSnapshot, GatewayError> {
        let state = self.state.lock().unwrap();
        if state.fail_retrieve || state.failing_retrieves.contains(session_id) {
            return Err(GatewayError::Transport("timeout".into()));
        }
        state
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                status: 404,
                message: format!("No such checkout session: {}", session_id),
            })
    }

    async fn expire_session(&self, session_id: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        let Some(session) = state.sessions.get_mut(session_id) else {
            return Err(GatewayError::Rejected {
                status: 404,
                message: format!("No such checkout session: {}", session_id),
            });
        };
        if session.status != SessionStatus::Open {
            return Err(GatewayError::Rejected {
                status: 400,
                message: "Only open sessions can be expired".into(),
            });
        }
        session.status = SessionStatus::Expired;
        state.expired.push(session_id.to_string());
        Ok(())
    }
}

// ── Lossy booking store ────────────────────────────────────────

/// Booking store whose `save` commits, then reports a storage error
/// as if the acknowledgement was lost.
pub struct LostAckBookings {
    inner: Arc<dyn RepositoryProvider>,
}

#[async_trait]
impl BookingRepository for LostAckBookings {
    async fn save(&self, booking: &Booking) -> DomainResult<()> {
        self.inner.bookings().save(booking).await?;
        Err(DomainError::Storage("connection reset after write".into()))
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>> {
        self.inner.bookings().find_by_id(id).await
    }

    async fn find_by_session_id(&self, session_id: &str) -> DomainResult<Option<Booking>> {
        self.inner.bookings().find_by_session_id(session_id).await
    }

    async fn find_for_payer(&self, payer_id: &str) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().find_for_payer(payer_id).await
    }

    async fn find_active_for_game(&self, game_id: &str) -> DomainResult<Option<Booking>> {
        self.inner.bookings().find_active_for_game(game_id).await
    }

    async fn find_stale_pending(&self, opened_before: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        self.inner.bookings().find_stale_pending(opened_before).await
    }

    async fn update(&self, booking: &Booking) -> DomainResult<()> {
        self.inner.bookings().update(booking).await
    }

    async fn compare_and_update(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_session: Option<&str>,
    ) -> DomainResult<bool> {
        self.inner
            .bookings()
            .compare_and_update(booking, expected_status, expected_session)
            .await
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.inner.bookings().delete(id).await
    }
}

/// Shares every store with the fixture except bookings, which lose save acks
pub struct LostAckRepos {
    inner: Arc<dyn RepositoryProvider>,
    bookings: LostAckBookings,
}

impl RepositoryProvider for LostAckRepos {
    fn slots(&self) -> &dyn SlotRepository {
        self.inner.slots()
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn games(&self) -> &dyn GameRepository {
        self.inner.games()
    }

    fn sub_venues(&self) -> &dyn SubVenueRepository {
        self.inner.sub_venues()
    }
}

// ── Fixture ────────────────────────────────────────────────────

/// One sub-venue with one available Cricket slot two days ahead
pub struct Fixture {
    pub repos: Arc<dyn RepositoryProvider>,
    pub gateway: Arc<FakeGateway>,
    pub sub_venue_id: String,
    pub slot: SlotRef,
}

impl Fixture {
    pub async fn new() -> Self {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());

        let sub_venue = SubVenue {
            id: "sv1".into(),
            venue_id: "v1".into(),
            name: "Court 1".into(),
            latitude: 12.9716,
            longitude: 77.5946,
            categories: vec![Category::Cricket, Category::Football],
            created_at: Utc::now(),
        };
        repos.sub_venues().save(&sub_venue).await.unwrap();

        let slot = add_available_slot(repos.as_ref(), &sub_venue.id, 2).await;

        Self {
            repos,
            gateway: Arc::new(FakeGateway::default()),
            sub_venue_id: sub_venue.id,
            slot,
        }
    }

    /// Another available Cricket slot `days_ahead` days out
    pub async fn add_slot(&self, days_ahead: i64) -> SlotRef {
        add_available_slot(self.repos.as_ref(), &self.sub_venue_id, days_ahead).await
    }

    pub fn lost_ack_repos(&self) -> Arc<dyn RepositoryProvider> {
        Arc::new(LostAckRepos {
            inner: self.repos.clone(),
            bookings: LostAckBookings {
                inner: self.repos.clone(),
            },
        })
    }

    pub fn checkout_service(&self, payment_bypass: bool) -> CheckoutService {
        CheckoutService::new(
            self.repos.clone(),
            self.gateway.clone(),
            CheckoutConfig {
                payment_bypass,
                ..CheckoutConfig::default()
            },
        )
    }

    pub fn reconciler(&self) -> PaymentReconciler {
        PaymentReconciler::new(self.repos.clone(), self.gateway.clone())
    }

    pub fn direct(&self, payer_id: &str, category: Category) -> DirectCheckout {
        DirectCheckout {
            payer_id: payer_id.into(),
            sub_venue_id: self.sub_venue_id.clone(),
            collection_id: self.slot.collection_id.clone(),
            slot_id: self.slot.slot_id.clone(),
            category,
        }
    }

    pub async fn current_slot(&self) -> Slot {
        self.repos
            .slots()
            .find_slot(&self.slot.collection_id, &self.slot.slot_id)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn booking(&self, id: &str) -> Booking {
        self.repos.bookings().find_by_id(id).await.unwrap().unwrap()
    }

    pub async fn add_game(&self, host_id: &str, player_count: i32, status: GameStatus) -> Game {
        let game = Game {
            id: uuid::Uuid::new_v4().to_string(),
            host_id: host_id.into(),
            sub_venue_id: self.sub_venue_id.clone(),
            slot: self.slot.clone(),
            category: Category::Cricket,
            min_players: 4,
            max_players: 22,
            player_count,
            status,
            created_at: Utc::now(),
        };
        self.repos.games().save(&game).await.unwrap();
        game
    }

    pub async fn game_status(&self, id: &str) -> GameStatus {
        self.repos.games().find_by_id(id).await.unwrap().unwrap().status
    }
}

async fn add_available_slot(
    repos: &dyn RepositoryProvider,
    sub_venue_id: &str,
    days_ahead: i64,
) -> SlotRef {
    let date = Utc::now().date_naive() + Duration::days(days_ahead);
    let start = date
        .and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap())
        .and_utc();
    let mut collection = SlotCollection::new_blocked_day(
        sub_venue_id,
        date,
        vec![SlotWindow {
            start_at: start,
            end_at: start + Duration::hours(1),
        }],
    )
    .unwrap();
    collection.slots[0].status = SlotStatus::Available;
    collection.slots[0].prices = PriceMap::new().with(Category::Cricket, Decimal::from(1000));

    let slot = SlotRef::new(&collection.id, &collection.slots[0].id);
    repos.slots().save_collection(collection).await.unwrap();
    slot
}
