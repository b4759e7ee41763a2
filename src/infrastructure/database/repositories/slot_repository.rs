//! SeaORM implementation of SlotRepository

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait, UpdateResult,
};
use tracing::debug;

use crate::domain::slot::{Category, PriceMap, Slot, SlotCollection, SlotRepository, SlotStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{slot, slot_collection};

pub struct SeaOrmSlotRepository {
    db: DatabaseConnection,
}

impl SeaOrmSlotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load_slots(&self, collection_id: &str) -> DomainResult<Vec<Slot>> {
        slot::Entity::find()
            .filter(slot::Column::CollectionId.eq(collection_id))
            .order_by_asc(slot::Column::StartAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(model_to_slot)
            .collect()
    }

    async fn with_slots(
        &self,
        model: Option<slot_collection::Model>,
    ) -> DomainResult<Option<SlotCollection>> {
        let Some(model) = model else {
            return Ok(None);
        };
        let slots = self.load_slots(&model.id).await?;
        Ok(Some(SlotCollection {
            id: model.id,
            sub_venue_id: model.sub_venue_id,
            date: model.date,
            slots,
            created_at: model.created_at,
        }))
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_slot(m: slot::Model) -> DomainResult<Slot> {
    let prices: PriceMap = serde_json::from_str(&m.prices)
        .map_err(|e| DomainError::Storage(format!("Corrupt prices on slot {}: {}", m.id, e)))?;
    let booked_for = m
        .booked_for
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    Ok(Slot {
        id: m.id,
        collection_id: m.collection_id,
        start_at: m.start_at,
        end_at: m.end_at,
        status: SlotStatus::from_str(&m.status),
        prices,
        booked_for,
        held_by: m.held_by,
        updated_at: m.updated_at,
    })
}

fn prices_json(prices: &PriceMap) -> DomainResult<String> {
    serde_json::to_string(prices).map_err(|e| DomainError::Storage(e.to_string()))
}

fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── SlotRepository impl ─────────────────────────────────────────

#[async_trait]
impl SlotRepository for SeaOrmSlotRepository {
    async fn save_collection(&self, collection: SlotCollection) -> DomainResult<()> {
        debug!(
            collection_id = %collection.id,
            sub_venue_id = %collection.sub_venue_id,
            date = %collection.date,
            "Saving slot collection"
        );

        let duplicate = || {
            DomainError::Conflict(format!(
                "Slots for sub-venue {} on {} already exist",
                collection.sub_venue_id, collection.date
            ))
        };

        let txn = self.db.begin().await?;

        let header = slot_collection::ActiveModel {
            id: Set(collection.id.clone()),
            sub_venue_id: Set(collection.sub_venue_id.clone()),
            date: Set(collection.date),
            created_at: Set(collection.created_at),
        };
        if let Err(e) = header.insert(&txn).await {
            return Err(if is_unique_violation(&e) {
                duplicate()
            } else {
                e.into()
            });
        }

        for s in &collection.slots {
            slot::ActiveModel {
                id: Set(s.id.clone()),
                collection_id: Set(collection.id.clone()),
                start_at: Set(s.start_at),
                end_at: Set(s.end_at),
                status: Set(s.status.as_str().to_string()),
                prices: Set(prices_json(&s.prices)?),
                booked_for: Set(s.booked_for.map(|c| c.as_str().to_string())),
                held_by: Set(s.held_by.clone()),
                updated_at: Set(s.updated_at),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn find_collection(&self, id: &str) -> DomainResult<Option<SlotCollection>> {
        let model = slot_collection::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        self.with_slots(model).await
    }

    async fn find_collection_for_date(
        &self,
        sub_venue_id: &str,
        date: NaiveDate,
    ) -> DomainResult<Option<SlotCollection>> {
        let model = slot_collection::Entity::find()
            .filter(slot_collection::Column::SubVenueId.eq(sub_venue_id))
            .filter(slot_collection::Column::Date.eq(date))
            .one(&self.db)
            .await?;
        self.with_slots(model).await
    }

    async fn find_slot(&self, collection_id: &str, slot_id: &str) -> DomainResult<Option<Slot>> {
        slot::Entity::find_by_id(slot_id.to_string())
            .filter(slot::Column::CollectionId.eq(collection_id))
            .one(&self.db)
            .await?
            .map(model_to_slot)
            .transpose()
    }

    async fn claim(
        &self,
        collection_id: &str,
        slot_id: &str,
        category: Category,
        holder: &str,
    ) -> DomainResult<bool> {
        let result: UpdateResult = slot::Entity::update_many()
            .col_expr(
                slot::Column::Status,
                Expr::value(SlotStatus::Booked.as_str()),
            )
            .col_expr(slot::Column::BookedFor, Expr::value(category.as_str()))
            .col_expr(slot::Column::HeldBy, Expr::value(holder))
            .col_expr(slot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(slot::Column::Id.eq(slot_id))
            .filter(slot::Column::CollectionId.eq(collection_id))
            .filter(slot::Column::Status.eq(SlotStatus::Available.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn release(&self, collection_id: &str, slot_id: &str) -> DomainResult<bool> {
        let result: UpdateResult = slot::Entity::update_many()
            .col_expr(
                slot::Column::Status,
                Expr::value(SlotStatus::Available.as_str()),
            )
            .col_expr(slot::Column::BookedFor, Expr::value(Option::<String>::None))
            .col_expr(slot::Column::HeldBy, Expr::value(Option::<String>::None))
            .col_expr(slot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(slot::Column::Id.eq(slot_id))
            .filter(slot::Column::CollectionId.eq(collection_id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn release_held_by(
        &self,
        collection_id: &str,
        slot_id: &str,
        holder: &str,
    ) -> DomainResult<bool> {
        let result: UpdateResult = slot::Entity::update_many()
            .col_expr(
                slot::Column::Status,
                Expr::value(SlotStatus::Available.as_str()),
            )
            .col_expr(slot::Column::BookedFor, Expr::value(Option::<String>::None))
            .col_expr(slot::Column::HeldBy, Expr::value(Option::<String>::None))
            .col_expr(slot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(slot::Column::Id.eq(slot_id))
            .filter(slot::Column::CollectionId.eq(collection_id))
            .filter(
                Condition::any()
                    .add(slot::Column::HeldBy.eq(holder))
                    .add(slot::Column::HeldBy.is_null()),
            )
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn update_unbooked(&self, updated: &Slot) -> DomainResult<bool> {
        let result: UpdateResult = slot::Entity::update_many()
            .col_expr(slot::Column::StartAt, Expr::value(updated.start_at))
            .col_expr(slot::Column::EndAt, Expr::value(updated.end_at))
            .col_expr(slot::Column::Prices, Expr::value(prices_json(&updated.prices)?))
            .col_expr(slot::Column::Status, Expr::value(updated.status.as_str()))
            .col_expr(slot::Column::UpdatedAt, Expr::value(updated.updated_at))
            .filter(slot::Column::Id.eq(updated.id.as_str()))
            .filter(slot::Column::CollectionId.eq(updated.collection_id.as_str()))
            .filter(slot::Column::Status.ne(SlotStatus::Booked.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
