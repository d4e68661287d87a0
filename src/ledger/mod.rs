pub mod client;
pub mod types;

pub use client::{LedgerClient, OddsUpdater};
pub use types::{Game, GameOdds, GameResult, GameStatus};

use anyhow::Result;
use async_trait::async_trait;

/// Query side of the ledger. Behind a trait so the monitor can be driven
/// by a scripted ledger in tests.
#[async_trait]
pub trait GameLedger: Send + Sync {
    /// Returns the ledger's full game set.
    async fn fetch_all_games(&self) -> Result<Vec<Game>>;

    /// Returns a single game, or None if the ledger no longer knows it.
    async fn fetch_game(&self, game_id: &str) -> Result<Option<Game>>;
}

/// Mutation side of the ledger: asks it to recompute and store odds for a
/// game. Fire-and-forget, no retry.
#[async_trait]
pub trait OddsSink: Send + Sync {
    async fn update_odds(&self, game_id: &str, odds: &GameOdds) -> Result<bool>;
}
