//! SeaORM implementation of GameRepository

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, UpdateResult};
use tracing::debug;

use crate::domain::booking::SlotRef;
use crate::domain::game::{Game, GameRepository, GameStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::game;

pub struct SeaOrmGameRepository {
    db: DatabaseConnection,
}

impl SeaOrmGameRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: game::Model) -> DomainResult<Game> {
    Ok(Game {
        category: m.category.parse()?,
        id: m.id,
        host_id: m.host_id,
        sub_venue_id: m.sub_venue_id,
        slot: SlotRef::new(m.collection_id, m.slot_id),
        min_players: m.min_players,
        max_players: m.max_players,
        player_count: m.player_count,
        status: GameStatus::from_str(&m.status),
        created_at: m.created_at,
    })
}

#[async_trait]
impl GameRepository for SeaOrmGameRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Game>> {
        game::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn update_status(&self, id: &str, status: GameStatus) -> DomainResult<()> {
        debug!(game_id = id, %status, "Updating game status");

        let result: UpdateResult = game::Entity::update_many()
            .col_expr(game::Column::Status, Expr::value(status.as_str()))
            .filter(game::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("Game", "id", id));
        }
        Ok(())
    }

    async fn save(&self, g: &Game) -> DomainResult<()> {
        let model = game::ActiveModel {
            id: Set(g.id.clone()),
            host_id: Set(g.host_id.clone()),
            sub_venue_id: Set(g.sub_venue_id.clone()),
            collection_id: Set(g.slot.collection_id.clone()),
            slot_id: Set(g.slot.slot_id.clone()),
            category: Set(g.category.as_str().to_string()),
            min_players: Set(g.min_players),
            max_players: Set(g.max_players),
            player_count: Set(g.player_count),
            status: Set(g.status.as_str().to_string()),
            created_at: Set(g.created_at),
        };

        game::Entity::insert(model)
            .on_conflict(
                OnConflict::column(game::Column::Id)
                    .update_columns([
                        game::Column::MinPlayers,
                        game::Column::MaxPlayers,
                        game::Column::PlayerCount,
                        game::Column::Status,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
