//! Game repository interface

use async_trait::async_trait;

use super::model::{Game, GameStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Find game by ID
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Game>>;

    /// Set the game status; the only field this crate writes
    async fn update_status(&self, id: &str, status: GameStatus) -> DomainResult<()>;

    /// Insert a game (seeding and tests; games are created elsewhere)
    async fn save(&self, game: &Game) -> DomainResult<()>;
}
