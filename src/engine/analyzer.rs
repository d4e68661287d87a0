use super::{EngineAnalysis, EngineError, PositionEngine};
use std::sync::Arc;
use tracing::{error, info};

/// Thin façade over the engine: runs one evaluation, logs the outcome in
/// human units, and hands failures back to the caller untouched. No
/// retry; the next monitoring cycle is the retry mechanism.
pub struct PositionAnalyzer {
    engine: Arc<dyn PositionEngine>,
}

impl PositionAnalyzer {
    pub fn new(engine: Arc<dyn PositionEngine>) -> Self {
        Self { engine }
    }

    pub async fn analyze(&self, fen: &str, depth: u32) -> Result<EngineAnalysis, EngineError> {
        let analysis = match self.engine.analyze_position(fen, depth).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!("position analysis failed: {e}");
                return Err(e);
            }
        };

        info!("position analysis: {}", analysis.fen);
        info!(
            "  evaluation: {} cp ({:.2} pawns), depth {}",
            analysis.evaluation,
            analysis.evaluation as f64 / 100.0,
            analysis.depth
        );
        info!(
            "  best move: {}",
            analysis.best_move.as_deref().unwrap_or("none")
        );
        info!(
            "  odds: W {:.2}x B {:.2}x D {:.2}x",
            analysis.odds.white_win as f64 / 10_000.0,
            analysis.odds.black_win as f64 / 10_000.0,
            analysis.odds.draw as f64 / 10_000.0
        );

        Ok(analysis)
    }
}
