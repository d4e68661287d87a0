use crate::engine::{PositionAnalyzer, PositionEngine};
use crate::ledger::types::{Game, GameOdds, GameStatus};
use crate::ledger::{GameLedger, OddsSink};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A cached game is re-analyzed after this long even if its move count has
/// not changed.
const RECHECK_AFTER_SECS: i64 = 60;

/// The oracle's own record of a game it has analyzed.
#[derive(Debug, Clone)]
pub struct CachedGameState {
    pub game: Game,
    pub last_analysis: Option<crate::engine::EngineAnalysis>,
    pub last_checked: DateTime<Utc>,
}

/// Polls the ledger, decides which games need re-analysis, and pushes
/// fresh odds. The cache is only ever touched by one monitoring cycle at
/// a time; the scheduler enforces that.
pub struct GameMonitor {
    analyzer: PositionAnalyzer,
    ledger: Arc<dyn GameLedger>,
    odds_sink: Arc<dyn OddsSink>,
    cache: DashMap<String, CachedGameState>,
    search_depth: u32,
}

impl GameMonitor {
    pub fn new(
        engine: Arc<dyn PositionEngine>,
        ledger: Arc<dyn GameLedger>,
        odds_sink: Arc<dyn OddsSink>,
        search_depth: u32,
    ) -> Self {
        Self {
            analyzer: PositionAnalyzer::new(engine),
            ledger,
            odds_sink,
            cache: DashMap::new(),
            search_depth,
        }
    }

    /// Queries the ledger for the full game set. A failed query is logged
    /// and comes back as an empty list: no data this cycle, never "all
    /// games ended".
    pub async fn fetch_active_games(&self) -> Vec<Game> {
        match self.ledger.fetch_all_games().await {
            Ok(games) => games,
            Err(e) => {
                error!("failed to fetch active games: {e:#}");
                Vec::new()
            }
        }
    }

    /// Re-checks a single game and, when warranted, runs the analysis
    /// chain. Any failure in that chain is logged and leaves the previous
    /// cache entry untouched.
    pub async fn monitor_game(&self, game_id: &str) {
        let game = match self.ledger.fetch_game(game_id).await {
            Ok(Some(game)) => game,
            Ok(None) => {
                warn!("game not found, evicting: {game_id}");
                self.cache.remove(game_id);
                return;
            }
            Err(e) => {
                error!("failed to fetch game {game_id}: {e:#}");
                return;
            }
        };

        match game.status {
            GameStatus::Active => {
                let wants_analysis = match self.cache.get(game_id) {
                    Some(entry) => should_analyze(Some(entry.value()), &game),
                    None => true,
                };
                if !wants_analysis {
                    return;
                }

                info!("analyzing game {} (move {})", game.id, game.move_count);

                let analysis = match self
                    .analyzer
                    .analyze(&game.current_fen, self.search_depth)
                    .await
                {
                    Ok(analysis) => analysis,
                    Err(e) => {
                        error!("failed to analyze game {}: {e}", game.id);
                        return;
                    }
                };

                let odds = GameOdds {
                    white_win: analysis.odds.white_win,
                    black_win: analysis.odds.black_win,
                    draw: analysis.odds.draw,
                    evaluation: analysis.evaluation,
                    last_updated: Utc::now(),
                };

                match self.odds_sink.update_odds(&game.id, &odds).await {
                    Ok(true) => {}
                    Ok(false) => warn!("ledger refused odds update for game {}", game.id),
                    Err(e) => warn!("failed to push odds for game {}: {e:#}", game.id),
                }

                // The entry is refreshed even when the push fails, so the
                // next move-count diff fires at the right time; the next
                // cycle is the retry mechanism.
                self.cache.insert(
                    game.id.clone(),
                    CachedGameState {
                        game,
                        last_analysis: Some(analysis),
                        last_checked: Utc::now(),
                    },
                );
            }
            GameStatus::Finished => {
                info!("game finished: {} result {:?}", game.id, game.result);
                self.cache.remove(game_id);
            }
            other => {
                debug!("game {} not active (status {:?}), skipping", game.id, other);
            }
        }
    }

    /// Runs one full monitoring pass: fetch a snapshot, monitor every
    /// Active game in it, then evict cached ids the same snapshot no
    /// longer reports as Active. A failed snapshot query skips the pass
    /// entirely so a ledger outage is never mistaken for every game
    /// ending.
    pub async fn monitor_all_games(&self) {
        let games = match self.ledger.fetch_all_games().await {
            Ok(games) => games,
            Err(e) => {
                error!("failed to fetch active games: {e:#}");
                return;
            }
        };

        info!("monitoring {} active games", games.len());

        for game in &games {
            if game.status == GameStatus::Active {
                self.monitor_game(&game.id).await;
            }
        }

        // A cached id survives only while the snapshot still reports it
        // Active; a game that finished or vanished between passes is
        // swept here even if monitor_game never saw it.
        let stale: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| {
                !games
                    .iter()
                    .any(|g| g.id == *entry.key() && g.status == GameStatus::Active)
            })
            .map(|entry| entry.key().clone())
            .collect();

        for game_id in stale {
            info!("removing stale game from cache: {game_id}");
            self.cache.remove(&game_id);
        }
    }

    /// Cache size, for observability only.
    pub fn get_active_game_count(&self) -> usize {
        self.cache.len()
    }
}

/// A game warrants analysis on first sight, whenever its move count moved,
/// or when the cached entry has gone unchecked past the re-check window.
fn should_analyze(cached: Option<&CachedGameState>, game: &Game) -> bool {
    match cached {
        None => true,
        Some(state) => {
            state.game.move_count != game.move_count
                || Utc::now() - state.last_checked > chrono::Duration::seconds(RECHECK_AFTER_SECS)
        }
    }
}
