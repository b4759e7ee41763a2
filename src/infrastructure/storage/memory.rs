//! In-memory repositories backed by `DashMap`
//!
//! Conditional writes (slot claims, unbooked updates) run under the shard
//! write guard of `get_mut`, so they are atomic just like the SQL
//! `UPDATE ... WHERE status = ...` used by the SeaORM repositories.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::booking::{Booking, BookingParts, BookingRepository, BookingStatus};
use crate::domain::game::{Game, GameRepository, GameStatus};
use crate::domain::slot::{Category, Slot, SlotCollection, SlotRepository, SlotStatus};
use crate::domain::sub_venue::{SubVenue, SubVenueRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

// ── Slots ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemorySlotRepository {
    collections: DashMap<String, SlotCollection>,
    by_day: DashMap<(String, NaiveDate), String>,
}

#[async_trait]
impl SlotRepository for InMemorySlotRepository {
    async fn save_collection(&self, collection: SlotCollection) -> DomainResult<()> {
        match self
            .by_day
            .entry((collection.sub_venue_id.clone(), collection.date))
        {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "Slots for sub-venue {} on {} already exist",
                collection.sub_venue_id, collection.date
            ))),
            Entry::Vacant(v) => {
                v.insert(collection.id.clone());
                self.collections.insert(collection.id.clone(), collection);
                Ok(())
            }
        }
    }

    async fn find_collection(&self, id: &str) -> DomainResult<Option<SlotCollection>> {
        Ok(self.collections.get(id).map(|c| c.clone()))
    }

    async fn find_collection_for_date(
        &self,
        sub_venue_id: &str,
        date: NaiveDate,
    ) -> DomainResult<Option<SlotCollection>> {
        let id = self
            .by_day
            .get(&(sub_venue_id.to_string(), date))
            .map(|id| id.clone());
        Ok(id.and_then(|id| self.collections.get(&id).map(|c| c.clone())))
    }

    async fn find_slot(&self, collection_id: &str, slot_id: &str) -> DomainResult<Option<Slot>> {
        Ok(self
            .collections
            .get(collection_id)
            .and_then(|c| c.find_slot(slot_id).cloned()))
    }

    async fn claim(
        &self,
        collection_id: &str,
        slot_id: &str,
        category: Category,
        holder: &str,
    ) -> DomainResult<bool> {
        let Some(mut collection) = self.collections.get_mut(collection_id) else {
            return Ok(false);
        };
        match collection.slots.iter_mut().find(|s| s.id == slot_id) {
            Some(slot) if slot.status == SlotStatus::Available => {
                slot.status = SlotStatus::Booked;
                slot.booked_for = Some(category);
                slot.held_by = Some(holder.to_string());
                slot.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, collection_id: &str, slot_id: &str) -> DomainResult<bool> {
        let Some(mut collection) = self.collections.get_mut(collection_id) else {
            return Ok(false);
        };
        match collection.slots.iter_mut().find(|s| s.id == slot_id) {
            Some(slot) => {
                slot.status = SlotStatus::Available;
                slot.booked_for = None;
                slot.held_by = None;
                slot.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn release_held_by(
        &self,
        collection_id: &str,
        slot_id: &str,
        holder: &str,
    ) -> DomainResult<bool> {
        let Some(mut collection) = self.collections.get_mut(collection_id) else {
            return Ok(false);
        };
        match collection.slots.iter_mut().find(|s| s.id == slot_id) {
            Some(slot) if slot.held_by.as_deref().map_or(true, |h| h == holder) => {
                slot.status = SlotStatus::Available;
                slot.booked_for = None;
                slot.held_by = None;
                slot.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_unbooked(&self, updated: &Slot) -> DomainResult<bool> {
        let Some(mut collection) = self.collections.get_mut(&updated.collection_id) else {
            return Ok(false);
        };
        match collection.slots.iter_mut().find(|s| s.id == updated.id) {
            Some(slot) if slot.status != SlotStatus::Booked => {
                slot.start_at = updated.start_at;
                slot.end_at = updated.end_at;
                slot.prices = updated.prices.clone();
                slot.status = updated.status;
                slot.updated_at = updated.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ── Bookings ───────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: DashMap<String, Booking>,
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn save(&self, booking: &Booking) -> DomainResult<()> {
        match self.bookings.entry(booking.id.clone()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "Booking {} already exists",
                booking.id
            ))),
            Entry::Vacant(v) => {
                v.insert(booking.clone());
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(id).map(|b| b.clone()))
    }

    async fn find_by_session_id(&self, session_id: &str) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|b| b.session_id() == Some(session_id))
            .map(|b| b.clone()))
    }

    async fn find_for_payer(&self, payer_id: &str) -> DomainResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.payer_id == payer_id)
            .map(|b| b.clone())
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn find_active_for_game(&self, game_id: &str) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|b| {
                b.game_id.as_deref() == Some(game_id)
                    && matches!(b.status(), BookingStatus::Pending | BookingStatus::Paid)
            })
            .map(|b| b.clone()))
    }

    async fn find_stale_pending(&self, opened_before: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                b.status() == BookingStatus::Pending
                    && b.session_id().is_some()
                    && b.session_opened_at() < opened_before
            })
            .map(|b| b.clone())
            .collect())
    }

    async fn update(&self, booking: &Booking) -> DomainResult<()> {
        let Some(mut existing) = self.bookings.get_mut(&booking.id) else {
            return Err(DomainError::not_found("Booking", "id", &booking.id));
        };
        *existing = with_payment_fields(&existing, booking);
        Ok(())
    }

    async fn compare_and_update(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
        expected_session: Option<&str>,
    ) -> DomainResult<bool> {
        let Some(mut existing) = self.bookings.get_mut(&booking.id) else {
            return Err(DomainError::not_found("Booking", "id", &booking.id));
        };
        if existing.status() != expected_status || existing.session_id() != expected_session {
            return Ok(false);
        }
        *existing = with_payment_fields(&existing, booking);
        Ok(true)
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        self.bookings.remove(id);
        Ok(())
    }
}

/// Only the payment fields move; the stored snapshot wins.
fn with_payment_fields(existing: &Booking, booking: &Booking) -> Booking {
    Booking::restore(BookingParts {
        id: existing.id.clone(),
        payer_id: existing.payer_id.clone(),
        game_id: existing.game_id.clone(),
        snapshot: existing.snapshot().clone(),
        status: booking.status(),
        session_id: booking.session_id().map(str::to_string),
        payment_intent_id: booking.payment_intent_id().map(str::to_string),
        created_at: existing.created_at,
        session_opened_at: booking.session_opened_at(),
        updated_at: booking.updated_at(),
    })
}

// ── Games & sub-venues ─────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryGameRepository {
    games: DashMap<String, Game>,
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Game>> {
        Ok(self.games.get(id).map(|g| g.clone()))
    }

    async fn update_status(&self, id: &str, status: GameStatus) -> DomainResult<()> {
        let Some(mut game) = self.games.get_mut(id) else {
            return Err(DomainError::not_found("Game", "id", id));
        };
        game.status = status;
        Ok(())
    }

    async fn save(&self, game: &Game) -> DomainResult<()> {
        self.games.insert(game.id.clone(), game.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySubVenueRepository {
    sub_venues: DashMap<String, SubVenue>,
}

#[async_trait]
impl SubVenueRepository for InMemorySubVenueRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<SubVenue>> {
        Ok(self.sub_venues.get(id).map(|s| s.clone()))
    }

    async fn save(&self, sub_venue: &SubVenue) -> DomainResult<()> {
        self.sub_venues
            .insert(sub_venue.id.clone(), sub_venue.clone());
        Ok(())
    }
}

// ── Provider ───────────────────────────────────────────────────

/// In-memory storage for development and testing
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    slots: InMemorySlotRepository,
    bookings: InMemoryBookingRepository,
    games: InMemoryGameRepository,
    sub_venues: InMemorySubVenueRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
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
