//! Slot catalog: day creation and per-slot edits by venue admins.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::slot::{Slot, SlotCollection, SlotUpdate, SlotWindow};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

pub struct SlotCatalogService {
    repos: Arc<dyn RepositoryProvider>,
}

impl SlotCatalogService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Create a sub-venue's slots for `date`. All start `blocked`.
    pub async fn create_day(
        &self,
        sub_venue_id: &str,
        date: NaiveDate,
        windows: Vec<SlotWindow>,
    ) -> DomainResult<SlotCollection> {
        self.repos
            .sub_venues()
            .find_by_id(sub_venue_id)
            .await?
            .ok_or_else(|| DomainError::not_found("SubVenue", "id", sub_venue_id))?;

        let collection = SlotCollection::new_blocked_day(sub_venue_id, date, windows)?;
        self.repos.slots().save_collection(collection.clone()).await?;

        info!(
            sub_venue_id,
            %date,
            collection_id = %collection.id,
            slots = collection.slots.len(),
            "Slot day created"
        );
        Ok(collection)
    }

    pub async fn get_day(&self, sub_venue_id: &str, date: NaiveDate) -> DomainResult<SlotCollection> {
        self.repos
            .slots()
            .find_collection_for_date(sub_venue_id, date)
            .await?
            .ok_or_else(|| DomainError::not_found("SlotCollection", "date", date.to_string()))
    }

    /// Edit one slot. A claim that lands first wins with *conflict*.
    pub async fn update_slot(
        &self,
        collection_id: &str,
        slot_id: &str,
        update: SlotUpdate,
    ) -> DomainResult<Slot> {
        let mut slot = self
            .repos
            .slots()
            .find_slot(collection_id, slot_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Slot", "id", slot_id))?;

        if update.is_empty() {
            return Ok(slot);
        }
        slot.apply_update(update)?;

        if !self.repos.slots().update_unbooked(&slot).await? {
            return Err(DomainError::Conflict(
                "Slot was booked while it was being edited".to_string(),
            ));
        }

        info!(collection_id, slot_id, status = %slot.status, "Slot updated");
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::testing::Fixture;
    use crate::domain::slot::{Category, PriceMap, SlotStatus};
    use chrono::{Duration, NaiveTime, Utc};
    use rust_decimal::Decimal;

    fn window(date: NaiveDate, hour: u32) -> SlotWindow {
        let start = date
            .and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap())
            .and_utc();
        SlotWindow {
            start_at: start,
            end_at: start + Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn create_day_starts_blocked_and_rejects_duplicates() {
        let fx = Fixture::new().await;
        let catalog = SlotCatalogService::new(fx.repos.clone());
        let date = Utc::now().date_naive() + Duration::days(5);

        let day = catalog
            .create_day("sv1", date, vec![window(date, 9), window(date, 7)])
            .await
            .unwrap();
        assert_eq!(day.slots.len(), 2);
        assert!(day.slots.iter().all(|s| s.status == SlotStatus::Blocked));
        assert!(day.slots[0].start_at < day.slots[1].start_at);

        let fetched = catalog.get_day("sv1", date).await.unwrap();
        assert_eq!(fetched.id, day.id);

        let err = catalog
            .create_day("sv1", date, vec![window(date, 12)])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn create_day_validates_input() {
        let fx = Fixture::new().await;
        let catalog = SlotCatalogService::new(fx.repos.clone());
        let date = Utc::now().date_naive() + Duration::days(5);

        let err = catalog
            .create_day("missing", date, vec![window(date, 9)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");

        let overlap = SlotWindow {
            start_at: window(date, 9).start_at + Duration::minutes(30),
            end_at: window(date, 10).end_at,
        };
        let err = catalog
            .create_day("sv1", date, vec![window(date, 9), overlap])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[tokio::test]
    async fn booked_slot_edits_are_rejected() {
        let fx = Fixture::new().await;
        let catalog = SlotCatalogService::new(fx.repos.clone());
        fx.repos
            .slots()
            .claim(&fx.slot.collection_id, &fx.slot.slot_id, Category::Cricket, "b1")
            .await
            .unwrap();
        let slot = fx.current_slot().await;

        let err = catalog
            .update_slot(
                &fx.slot.collection_id,
                &fx.slot.slot_id,
                SlotUpdate {
                    start_at: Some(slot.start_at - Duration::hours(1)),
                    ..SlotUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invariant_violation");
        assert_eq!(fx.current_slot().await.start_at, slot.start_at);
    }

    #[tokio::test]
    async fn available_requires_a_price() {
        let fx = Fixture::new().await;
        let catalog = SlotCatalogService::new(fx.repos.clone());

        let err = catalog
            .update_slot(
                &fx.slot.collection_id,
                &fx.slot.slot_id,
                SlotUpdate {
                    prices: Some(PriceMap::new()),
                    ..SlotUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation");

        let updated = catalog
            .update_slot(
                &fx.slot.collection_id,
                &fx.slot.slot_id,
                SlotUpdate {
                    prices: Some(PriceMap::new().with(Category::Football, Decimal::from(800))),
                    status: Some(SlotStatus::Blocked),
                    ..SlotUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, SlotStatus::Blocked);
        assert_eq!(fx.current_slot().await.prices.get(Category::Football), Some(Decimal::from(800)));
    }

    #[tokio::test]
    async fn setting_booked_directly_is_rejected() {
        let fx = Fixture::new().await;
        let catalog = SlotCatalogService::new(fx.repos.clone());

        let err = catalog
            .update_slot(
                &fx.slot.collection_id,
                &fx.slot.slot_id,
                SlotUpdate {
                    status: Some(SlotStatus::Booked),
                    ..SlotUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invariant_violation");
    }
}
