//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::game::GameRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::slot::SlotRepository;
use crate::domain::sub_venue::SubVenueRepository;

use super::booking_repository::SeaOrmBookingRepository;
use super::game_repository::SeaOrmGameRepository;
use super::slot_repository::SeaOrmSlotRepository;
use super::sub_venue_repository::SeaOrmSubVenueRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let slot = repos.slots().find_slot(&collection_id, &slot_id).await?;
/// let booking = repos.bookings().find_by_session_id("cs_123").await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    slots: SeaOrmSlotRepository,
    bookings: SeaOrmBookingRepository,
    games: SeaOrmGameRepository,
    sub_venues: SeaOrmSubVenueRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            slots: SeaOrmSlotRepository::new(db.clone()),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            games: SeaOrmGameRepository::new(db.clone()),
            sub_venues: SeaOrmSubVenueRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn slots(&self) -> &dyn SlotRepository {
        &self.slots
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn games(&self) -> &dyn GameRepository {
        &self.games
    }

    fn sub_venues(&self) -> &dyn SubVenueRepository {
        &self.sub_venues
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, NaiveTime, Utc};
    use rust_decimal::Decimal;
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::domain::booking::{Booking, BookingSnapshot, BookingStatus, SlotRef};
    use crate::domain::game::{Game, GameStatus};
    use crate::domain::slot::{Category, PriceMap, SlotCollection, SlotStatus, SlotWindow};
    use crate::domain::sub_venue::SubVenue;
    use crate::infrastructure::database::migrator::Migrator;

    async fn provider() -> SeaOrmRepositoryProvider {
        // One connection, so every query sees the same in-memory database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmRepositoryProvider::new(db)
    }

    /// Sub-venue sv1 with one available Cricket slot tomorrow at 18:00.
    async fn seed(repos: &SeaOrmRepositoryProvider) -> SlotRef {
        repos
            .sub_venues()
            .save(&SubVenue {
                id: "sv1".into(),
                venue_id: "v1".into(),
                name: "Court 1".into(),
                latitude: 12.97,
                longitude: 77.59,
                categories: vec![Category::Cricket],
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let date = Utc::now().date_naive() + Duration::days(1);
        let start = date
            .and_time(NaiveTime::from_hms_opt(18, 0, 0).unwrap())
            .and_utc();
        let mut collection = SlotCollection::new_blocked_day(
            "sv1",
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

    #[tokio::test]
    async fn collection_roundtrip_and_duplicate_day() {
        let repos = provider().await;
        let slot = seed(&repos).await;

        let collection = repos
            .slots()
            .find_collection(&slot.collection_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(collection.slots.len(), 1);
        assert_eq!(
            collection.slots[0].prices.get(Category::Cricket),
            Some(Decimal::from(1000))
        );

        let again = SlotCollection::new_blocked_day(
            "sv1",
            collection.date,
            vec![SlotWindow {
                start_at: collection.slots[0].start_at,
                end_at: collection.slots[0].end_at,
            }],
        )
        .unwrap();
        let err = repos.slots().save_collection(again).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn concurrent_claims_have_one_winner() {
        let repos = Arc::new(provider().await);
        let slot = seed(&repos).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repos = repos.clone();
                let slot = slot.clone();
                tokio::spawn(async move {
                    repos
                        .slots()
                        .claim(
                            &slot.collection_id,
                            &slot.slot_id,
                            Category::Cricket,
                            &format!("b{}", i),
                        )
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);

        let stored = repos
            .slots()
            .find_slot(&slot.collection_id, &slot.slot_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SlotStatus::Booked);
        assert_eq!(stored.booked_for, Some(Category::Cricket));
        assert!(stored.held_by.is_some());

        assert!(repos
            .slots()
            .release(&slot.collection_id, &slot.slot_id)
            .await
            .unwrap());
        let stored = repos
            .slots()
            .find_slot(&slot.collection_id, &slot.slot_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SlotStatus::Available);
        assert!(stored.booked_for.is_none() && stored.held_by.is_none());
    }

    #[tokio::test]
    async fn booking_update_writes_only_payment_fields() {
        let repos = provider().await;
        let slot = seed(&repos).await;
        let start = Utc::now() + Duration::days(1);

        let booking = Booking::new_pending(
            "b1",
            "u1",
            None,
            BookingSnapshot {
                venue_id: "v1".into(),
                sub_venue_id: "sv1".into(),
                slot,
                category: Category::Cricket,
                latitude: 12.97,
                longitude: 77.59,
                start_at: start,
                end_at: start + Duration::hours(1),
                amount: 100_000,
                currency: "inr".into(),
            },
            "cs_1",
        );
        repos.bookings().save(&booking).await.unwrap();

        let mut paid = repos
            .bookings()
            .find_by_session_id("cs_1")
            .await
            .unwrap()
            .unwrap();
        paid.mark_paid(Some("pi_1".into())).unwrap();
        repos.bookings().update(&paid).await.unwrap();

        let stored = repos.bookings().find_by_id("b1").await.unwrap().unwrap();
        assert_eq!(stored.status(), BookingStatus::Paid);
        assert_eq!(stored.payment_intent_id(), Some("pi_1"));
        assert_eq!(stored.snapshot().amount, 100_000);
        assert_eq!(stored.snapshot().category, Category::Cricket);

        assert!(repos
            .bookings()
            .find_stale_pending(Utc::now() + Duration::minutes(1))
            .await
            .unwrap()
            .is_empty());

        let err = repos.bookings().save(&booking).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn conditional_writes_respect_current_owner() {
        let repos = provider().await;
        let slot = seed(&repos).await;
        let (cid, sid) = (&slot.collection_id, &slot.slot_id);

        repos.slots().claim(cid, sid, Category::Cricket, "b2").await.unwrap();
        assert!(!repos.slots().release_held_by(cid, sid, "b1").await.unwrap());
        let stored = repos.slots().find_slot(cid, sid).await.unwrap().unwrap();
        assert!(stored.is_held_by("b2"));

        assert!(repos.slots().release_held_by(cid, sid, "b2").await.unwrap());
        assert!(repos.slots().release_held_by(cid, sid, "b2").await.unwrap());

        let start = Utc::now() + Duration::days(1);
        let booking = Booking::new_pending(
            "b1",
            "u1",
            None,
            BookingSnapshot {
                venue_id: "v1".into(),
                sub_venue_id: "sv1".into(),
                slot,
                category: Category::Cricket,
                latitude: 12.97,
                longitude: 77.59,
                start_at: start,
                end_at: start + Duration::hours(1),
                amount: 100_000,
                currency: "inr".into(),
            },
            "cs_1",
        );
        repos.bookings().save(&booking).await.unwrap();

        let mut failed = booking.clone();
        failed.mark_failed().unwrap();
        repos.bookings().update(&failed).await.unwrap();

        // A writer still expecting Pending on cs_1 must lose.
        let mut retried = booking.clone();
        retried.restart_payment("cs_2").unwrap();
        assert!(!repos
            .bookings()
            .compare_and_update(&retried, BookingStatus::Pending, Some("cs_1"))
            .await
            .unwrap());
        assert_eq!(
            repos.bookings().find_by_id("b1").await.unwrap().unwrap().status(),
            BookingStatus::Failed
        );

        assert!(repos
            .bookings()
            .compare_and_update(&retried, BookingStatus::Failed, Some("cs_1"))
            .await
            .unwrap());
        let stored = repos.bookings().find_by_id("b1").await.unwrap().unwrap();
        assert_eq!(stored.status(), BookingStatus::Pending);
        assert_eq!(stored.session_id(), Some("cs_2"));
    }

    #[tokio::test]
    async fn game_status_and_active_booking_lookup() {
        let repos = provider().await;
        let slot = seed(&repos).await;

        let game = Game {
            id: "g1".into(),
            host_id: "host".into(),
            sub_venue_id: "sv1".into(),
            slot: slot.clone(),
            category: Category::Cricket,
            min_players: 2,
            max_players: 10,
            player_count: 4,
            status: GameStatus::Open,
            created_at: Utc::now(),
        };
        repos.games().save(&game).await.unwrap();
        repos.games().update_status("g1", GameStatus::Full).await.unwrap();
        assert_eq!(
            repos.games().find_by_id("g1").await.unwrap().unwrap().status,
            GameStatus::Full
        );
        assert_eq!(
            repos
                .games()
                .update_status("nope", GameStatus::Open)
                .await
                .unwrap_err()
                .kind(),
            "not_found"
        );

        assert!(repos
            .bookings()
            .find_active_for_game("g1")
            .await
            .unwrap()
            .is_none());
    }
}
