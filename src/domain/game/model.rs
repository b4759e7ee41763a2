//! Game domain entity

use chrono::{DateTime, Utc};

use crate::domain::booking::SlotRef;
use crate::domain::slot::Category;

/// Game status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Accepting players, or booking not yet confirmed
    Open,
    /// Slot booked (or payment in flight)
    Full,
    Completed,
    Cancelled,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Full => "Full",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Full" => Self::Full,
            "Completed" => Self::Completed,
            "Cancelled" => Self::Cancelled,
            _ => Self::Open,
        }
    }

    /// Completed and Cancelled games are never reopened or filled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hosted group game wrapping one slot reservation
#[derive(Debug, Clone)]
pub struct Game {
    pub id: String,
    pub host_id: String,
    pub sub_venue_id: String,
    pub slot: SlotRef,
    pub category: Category,
    pub min_players: i32,
    pub max_players: i32,
    pub player_count: i32,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    pub fn has_min_players(&self) -> bool {
        self.player_count >= self.min_players
    }
}
