//! Keeps a game's Open/Full status in step with its booking's payment.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::game::GameStatus;
use crate::domain::{DomainResult, RepositoryProvider};

pub struct GameSynchronizer {
    repos: Arc<dyn RepositoryProvider>,
}

impl GameSynchronizer {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Payment started or succeeded: the game's slot is taken.
    pub async fn mark_full(&self, game_id: &str) -> DomainResult<()> {
        self.transition(game_id, GameStatus::Full).await
    }

    /// Payment failed: undo any Full that assumed it would succeed.
    pub async fn reopen(&self, game_id: &str) -> DomainResult<()> {
        self.transition(game_id, GameStatus::Open).await
    }

    async fn transition(&self, game_id: &str, status: GameStatus) -> DomainResult<()> {
        let Some(game) = self.repos.games().find_by_id(game_id).await? else {
            debug!(game_id, "Game not found, skipping status sync");
            return Ok(());
        };

        if game.status.is_terminal() {
            debug!(game_id, current = %game.status, "Game is terminal, leaving status");
            return Ok(());
        }
        if game.status == status {
            return Ok(());
        }

        self.repos.games().update_status(game_id, status).await?;
        info!(game_id, from = %game.status, to = %status, "Game status synced");
        Ok(())
    }
}
