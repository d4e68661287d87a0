use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Pending,
    Active,
    Finished,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

/// A game as the ledger reports it. The oracle only ever holds read-only
/// copies; the ledger owns the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub white_player: String,
    pub black_player: String,
    pub status: GameStatus,
    pub current_fen: String,
    pub move_count: u32,
    #[serde(default)]
    pub result: Option<GameResult>,
    #[serde(default)]
    pub created_at: i64,
}

/// The odds record shipped to the ledger for one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOdds {
    /// Basis points, 10000 = 1.00x payout.
    pub white_win: u32,
    pub black_win: u32,
    pub draw: u32,
    /// Centipawn evaluation the odds were derived from.
    pub evaluation: i32,
    pub last_updated: DateTime<Utc>,
}
