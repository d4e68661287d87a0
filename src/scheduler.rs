use crate::monitor::GameMonitor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Drives the monitor on a fixed cadence with at-most-one-cycle-in-flight:
/// a tick that lands while a cycle is still running is skipped outright,
/// never queued.
pub struct GameScheduler {
    monitor: Arc<GameMonitor>,
    interval: Duration,
    cycle_running: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl GameScheduler {
    pub fn new(monitor: Arc<GameMonitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            cycle_running: Arc::new(AtomicBool::new(false)),
            ticker: None,
        }
    }

    /// Runs exactly one cycle inline. Used to prime the cache before
    /// periodic operation begins.
    pub async fn run_once(&self) {
        info!("running single monitoring cycle");
        self.monitor.monitor_all_games().await;
        info!(
            "monitoring cycle complete, {} games cached",
            self.monitor.get_active_game_count()
        );
    }

    /// Starts the periodic ticker. The first cycle fires one interval from
    /// now; call `run_once` first if the cache should be primed
    /// immediately.
    pub fn start(&mut self) {
        if self.ticker.is_some() {
            warn!("scheduler already running");
            return;
        }

        let monitor = Arc::clone(&self.monitor);
        let cycle_running = Arc::clone(&self.cycle_running);
        let interval = self.interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // consume it so cycles start one full interval from now.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if cycle_running.swap(true, Ordering::SeqCst) {
                    warn!("previous monitoring cycle still running, skipping tick");
                    continue;
                }

                let monitor = Arc::clone(&monitor);
                let cycle_running = Arc::clone(&cycle_running);
                tokio::spawn(async move {
                    info!("=== game monitoring cycle ===");
                    monitor.monitor_all_games().await;
                    info!(
                        "active games in cache: {}",
                        monitor.get_active_game_count()
                    );
                    cycle_running.store(false, Ordering::SeqCst);
                });
            }
        }));

        info!(
            "game monitoring scheduler started, polling every {:?}",
            self.interval
        );
    }

    /// Cancels future ticks. A cycle already in flight runs to completion
    /// on its own task.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            info!("scheduler stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineAnalysis, EngineError, PositionEngine};
    use crate::ledger::types::{Game, GameOdds};
    use crate::ledger::{GameLedger, OddsSink};
    use crate::monitor::GameMonitor;
    use crate::odds::compute_odds;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct InstantEngine;

    #[async_trait]
    impl PositionEngine for InstantEngine {
        async fn analyze_position(
            &self,
            fen: &str,
            depth: u32,
        ) -> Result<EngineAnalysis, EngineError> {
            Ok(EngineAnalysis {
                fen: fen.to_string(),
                evaluation: 0,
                best_move: None,
                depth,
                odds: compute_odds(0),
            })
        }
    }

    /// Ledger whose snapshot query takes a configurable amount of (tokio)
    /// time, to simulate cycles outlasting the polling interval.
    struct SlowLedger {
        fetch_delay: Duration,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl GameLedger for SlowLedger {
        async fn fetch_all_games(&self) -> Result<Vec<Game>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.fetch_delay).await;
            Ok(Vec::new())
        }

        async fn fetch_game(&self, _game_id: &str) -> Result<Option<Game>> {
            Ok(None)
        }
    }

    struct NullSink;

    #[async_trait]
    impl OddsSink for NullSink {
        async fn update_odds(&self, _game_id: &str, _odds: &GameOdds) -> Result<bool> {
            Ok(true)
        }
    }

    fn slow_monitor(fetch_delay: Duration) -> (Arc<GameMonitor>, Arc<SlowLedger>) {
        let ledger = Arc::new(SlowLedger {
            fetch_delay,
            fetches: AtomicUsize::new(0),
        });
        let monitor = Arc::new(GameMonitor::new(
            Arc::new(InstantEngine),
            ledger.clone(),
            Arc::new(NullSink),
            15,
        ));
        (monitor, ledger)
    }

    #[tokio::test]
    async fn run_once_performs_exactly_one_cycle() {
        let (monitor, ledger) = slow_monitor(Duration::from_millis(0));
        let scheduler = GameScheduler::new(monitor, Duration::from_secs(30));

        scheduler.run_once().await;

        assert_eq!(ledger.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn overlong_cycles_cause_skipped_ticks() {
        // Cycles take 120ms against a 50ms interval: ticks at 100ms and
        // 150ms land mid-cycle and must be dropped, not queued.
        let (monitor, ledger) = slow_monitor(Duration::from_millis(120));
        let mut scheduler = GameScheduler::new(monitor, Duration::from_millis(50));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(400)).await;
        scheduler.stop();

        let fetches = ledger.fetches.load(Ordering::SeqCst);
        // Eight ticks elapsed; with skipping, a cycle starts only every
        // third tick or so.
        assert!(fetches >= 2, "expected at least 2 cycles, got {fetches}");
        assert!(fetches <= 4, "expected skipped ticks, got {fetches} cycles");
    }

    #[tokio::test(start_paused = true)]
    async fn fast_cycles_tick_every_interval() {
        let (monitor, ledger) = slow_monitor(Duration::from_millis(0));
        let mut scheduler = GameScheduler::new(monitor, Duration::from_millis(50));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(375)).await;
        scheduler.stop();

        let fetches = ledger.fetches.load(Ordering::SeqCst);
        assert!(
            (6..=8).contains(&fetches),
            "expected roughly one cycle per tick, got {fetches}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_future_ticks() {
        let (monitor, ledger) = slow_monitor(Duration::from_millis(0));
        let mut scheduler = GameScheduler::new(monitor, Duration::from_millis(50));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.stop();
        let fetches_at_stop = ledger.fetches.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(ledger.fetches.load(Ordering::SeqCst), fetches_at_stop);
    }
}
