pub mod analyzer;
pub mod uci;

pub use analyzer::PositionAnalyzer;
pub use uci::{UciEngine, UciEngineConfig};

use crate::odds::OddsTriple;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Evaluation of a single position. Superseded by later analyses of the
/// same game, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineAnalysis {
    pub fen: String,
    /// Signed centipawns, positive favors White. Forced mates saturate at
    /// ±MATE_SCORE.
    pub evaluation: i32,
    pub best_move: Option<String>,
    /// Deepest search depth the engine reported.
    pub depth: u32,
    pub odds: OddsTriple,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to launch engine: {0}")]
    Unavailable(String),

    #[error("engine did not report ready within {0:?}")]
    StartTimeout(Duration),

    #[error("analysis did not complete within {0:?}")]
    AnalysisTimeout(Duration),

    #[error("engine process closed its output stream")]
    ProcessTerminated,

    #[error("engine i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Capability interface over the engine subprocess. The analyzer and
/// monitor depend on this instead of `UciEngine` so they can run against a
/// scripted implementation in tests.
#[async_trait]
pub trait PositionEngine: Send + Sync {
    async fn analyze_position(&self, fen: &str, depth: u32) -> Result<EngineAnalysis, EngineError>;
}
