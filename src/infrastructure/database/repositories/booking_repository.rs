//! SeaORM implementation of BookingRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, UpdateMany, UpdateResult,
};
use tracing::debug;

use crate::domain::booking::{
    Booking, BookingParts, BookingRepository, BookingSnapshot, BookingStatus, SlotRef,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::booking;

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    Ok(Booking::restore(BookingParts {
        snapshot: BookingSnapshot {
            venue_id: m.venue_id,
            sub_venue_id: m.sub_venue_id,
            slot: SlotRef::new(m.collection_id, m.slot_id),
            category: m.category.parse()?,
            latitude: m.latitude,
            longitude: m.longitude,
            start_at: m.start_at,
            end_at: m.end_at,
            amount: m.amount,
            currency: m.currency,
        },
        id: m.id,
        payer_id: m.payer_id,
        game_id: m.game_id,
        status: BookingStatus::from_str(&m.status),
        session_id: m.session_id,
        payment_intent_id: m.payment_intent_id,
        created_at: m.created_at,
        session_opened_at: m.session_opened_at,
        updated_at: m.updated_at,
    }))
}

fn models_to_domain(models: Vec<booking::Model>) -> DomainResult<Vec<Booking>> {
    models.into_iter().map(model_to_domain).collect()
}

/// Update of the payment columns for one booking. Snapshot columns are never
/// part of an update.
fn payment_fields(b: &Booking) -> UpdateMany<booking::Entity> {
    booking::Entity::update_many()
        .col_expr(booking::Column::Status, Expr::value(b.status().as_str()))
        .col_expr(
            booking::Column::SessionId,
            Expr::value(b.session_id().map(str::to_string)),
        )
        .col_expr(
            booking::Column::PaymentIntentId,
            Expr::value(b.payment_intent_id().map(str::to_string)),
        )
        .col_expr(
            booking::Column::SessionOpenedAt,
            Expr::value(b.session_opened_at()),
        )
        .col_expr(booking::Column::UpdatedAt, Expr::value(b.updated_at()))
        .filter(booking::Column::Id.eq(b.id.as_str()))
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn save(&self, b: &Booking) -> DomainResult<()> {
        debug!(booking_id = %b.id, status = %b.status(), "Saving booking");

        let s = b.snapshot();
        let model = booking::ActiveModel {
            id: Set(b.id.clone()),
            payer_id: Set(b.payer_id.clone()),
            game_id: Set(b.game_id.clone()),
            venue_id: Set(s.venue_id.clone()),
            sub_venue_id: Set(s.sub_venue_id.clone()),
            collection_id: Set(s.slot.collection_id.clone()),
            slot_id: Set(s.slot.slot_id.clone()),
            category: Set(s.category.as_str().to_string()),
            latitude: Set(s.latitude),
            longitude: Set(s.longitude),
            start_at: Set(s.start_at),
            end_at: Set(s.end_at),
            amount: Set(s.amount),
            currency: Set(s.currency.clone()),
            status: Set(b.status().as_str().to_string()),
            session_id: Set(b.session_id().map(str::to_string)),
            payment_intent_id: Set(b.payment_intent_id().map(str::to_string)),
            session_opened_at: Set(b.session_opened_at()),
            created_at: Set(b.created_at),
            updated_at: Set(b.updated_at()),
        };

        match model.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Err(
                DomainError::Conflict(format!("Booking {} or its session already exists", b.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>> {
        booking::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_session_id(&self, session_id: &str) -> DomainResult<Option<Booking>> {
        booking::Entity::find()
            .filter(booking::Column::SessionId.eq(session_id))
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_for_payer(&self, payer_id: &str) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::PayerId.eq(payer_id))
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn find_active_for_game(&self, game_id: &str) -> DomainResult<Option<Booking>> {
        booking::Entity::find()
            .filter(booking::Column::GameId.eq(game_id))
            .filter(booking::Column::Status.is_in([
                BookingStatus::Pending.as_str(),
                BookingStatus::Paid.as_str(),
            ]))
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_stale_pending(&self, opened_before: DateTime<Utc>) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::Status.eq(BookingStatus::Pending.as_str()))
            .filter(booking::Column::SessionId.is_not_null())
            .filter(booking::Column::SessionOpenedAt.lt(opened_before))
            .order_by_asc(booking::Column::SessionOpenedAt)
            .all(&self.db)
            .await?;
        models_to_domain(models)
    }

    async fn update(&self, b: &Booking) -> DomainResult<()> {
        debug!(booking_id = %b.id, status = %b.status(), "Updating booking payment state");

        let result = payment_fields(b).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Booking", "id", &b.id));
        }
        Ok(())
    }

    async fn compare_and_update(
        &self,
        b: &Booking,
        expected_status: BookingStatus,
        expected_session: Option<&str>,
    ) -> DomainResult<bool> {
        debug!(
            booking_id = %b.id,
            status = %b.status(),
            expected = %expected_status,
            "Conditionally updating booking payment state"
        );

        let query = payment_fields(b)
            .filter(booking::Column::Status.eq(expected_status.as_str()));
        let query = match expected_session {
            Some(session_id) => query.filter(booking::Column::SessionId.eq(session_id)),
            None => query.filter(booking::Column::SessionId.is_null()),
        };
        let result: UpdateResult = query.exec(&self.db).await?;

        Ok(result.rows_affected == 1)
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        booking::Entity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
