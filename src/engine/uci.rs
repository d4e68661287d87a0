use super::{EngineAnalysis, EngineError};
use crate::odds::{self, MATE_SCORE};
use regex::Regex;
use std::process::Stdio;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct UciEngineConfig {
    /// Engine executable; resolved through PATH.
    pub command: String,
    pub args: Vec<String>,
    pub threads: u32,
    pub hash_mb: u32,
    pub ready_timeout: Duration,
    pub search_timeout: Duration,
}

impl Default for UciEngineConfig {
    fn default() -> Self {
        Self {
            command: "stockfish".to_string(),
            args: Vec::new(),
            threads: 4,
            hash_mb: 256,
            ready_timeout: Duration::from_secs(5),
            search_timeout: Duration::from_secs(10),
        }
    }
}

/// The engine's stdio, locked as a unit: the output stream cannot be
/// demultiplexed across overlapping searches, so every request takes the
/// pair exclusively.
#[derive(Debug)]
struct EngineIo {
    stdin: ChildStdin,
    lines: Lines<BufReader<ChildStdout>>,
    /// True while a `go` has been issued whose terminal bestmove has not
    /// been consumed, i.e. a previous request timed out mid-search.
    search_pending: bool,
}

impl EngineIo {
    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        self.stdin.write_all(command.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn next_line(&mut self) -> Result<String, EngineError> {
        match self.lines.next_line().await? {
            Some(line) => Ok(line),
            None => Err(EngineError::ProcessTerminated),
        }
    }

    async fn wait_for_ready(&mut self) -> Result<(), EngineError> {
        loop {
            if self.next_line().await?.trim() == "readyok" {
                return Ok(());
            }
        }
    }

    async fn drain_to_bestmove(&mut self) -> Result<(), EngineError> {
        loop {
            if self.next_line().await?.starts_with("bestmove") {
                return Ok(());
            }
        }
    }
}

/// Owns exactly one engine subprocess for its lifetime. Construction is
/// initialization: a started engine cannot be started again, and `stop` is
/// idempotent.
#[derive(Debug)]
pub struct UciEngine {
    io: Mutex<EngineIo>,
    child: StdMutex<Option<Child>>,
    parser: SearchParser,
    search_timeout: Duration,
}

impl UciEngine {
    /// Spawns the engine, runs the UCI handshake, and waits for the
    /// readiness token.
    pub async fn start(config: &UciEngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Unavailable(format!("{}: {}", config.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Unavailable("engine stdout not captured".to_string()))?;

        let mut io = EngineIo {
            stdin,
            lines: BufReader::new(stdout).lines(),
            search_pending: false,
        };

        io.send("uci").await?;
        io.send(&format!("setoption name Threads value {}", config.threads))
            .await?;
        io.send(&format!("setoption name Hash value {}", config.hash_mb))
            .await?;
        io.send("isready").await?;

        timeout(config.ready_timeout, io.wait_for_ready())
            .await
            .map_err(|_| EngineError::StartTimeout(config.ready_timeout))??;

        info!("engine initialized: {}", config.command);

        Ok(Self {
            io: Mutex::new(io),
            child: StdMutex::new(Some(child)),
            parser: SearchParser::new()?,
            search_timeout: config.search_timeout,
        })
    }

    /// Evaluates one position to the requested depth. Concurrent callers
    /// queue on the stdio lock; the request fails with `AnalysisTimeout`
    /// if the engine never reports a best move.
    pub async fn analyze_position(
        &self,
        fen: &str,
        depth: u32,
    ) -> Result<EngineAnalysis, EngineError> {
        let mut io = self.io.lock().await;

        // A request that timed out leaves its search running; the engine
        // answers isready even mid-search, so readyok alone would not
        // flush it and its eventual bestmove would terminate this request
        // instead. Stop the old search and consume its terminal bestmove
        // first.
        if io.search_pending {
            io.send("stop").await?;
            timeout(self.search_timeout, io.drain_to_bestmove())
                .await
                .map_err(|_| EngineError::AnalysisTimeout(self.search_timeout))??;
            io.search_pending = false;
        }

        // Sync point: drains any remaining output ahead of the new search.
        io.send("isready").await?;
        timeout(self.search_timeout, io.wait_for_ready())
            .await
            .map_err(|_| EngineError::AnalysisTimeout(self.search_timeout))??;

        io.send(&format!("position fen {fen}")).await?;
        io.send(&format!("go depth {depth}")).await?;
        io.search_pending = true;

        let search = timeout(self.search_timeout, async {
            let mut state = SearchState::default();
            loop {
                let line = io.next_line().await?;
                debug!("engine: {line}");
                if let Some(best_move) = self.parser.feed(&mut state, &line) {
                    return Ok::<_, EngineError>((state, best_move));
                }
            }
        })
        .await;

        let (state, best_move) = match search {
            Ok(result) => result?,
            Err(_) => return Err(EngineError::AnalysisTimeout(self.search_timeout)),
        };
        io.search_pending = false;

        Ok(EngineAnalysis {
            fen: fen.to_string(),
            evaluation: state.evaluation,
            best_move,
            depth: state.depth,
            odds: odds::compute_odds(state.evaluation),
        })
    }

    /// Quits the engine if it is idle and force-kills the subprocess. Safe
    /// to call repeatedly or while an analysis is in flight; a killed
    /// subprocess fails that analysis with a process-termination error.
    pub async fn stop(&self) {
        if let Ok(mut io) = self.io.try_lock() {
            let _ = io.send("quit").await;
        }

        let child = match self.child.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };

        if let Some(mut child) = child {
            let _ = child.start_kill();
            let _ = child.wait().await;
            info!("engine stopped");
        }
    }
}

#[async_trait::async_trait]
impl super::PositionEngine for UciEngine {
    async fn analyze_position(&self, fen: &str, depth: u32) -> Result<EngineAnalysis, EngineError> {
        UciEngine::analyze_position(self, fen, depth).await
    }
}

/// Partial results for one search. Reset for every request so one search's
/// best move is never paired with another search's score.
#[derive(Debug, Default)]
struct SearchState {
    depth: u32,
    evaluation: i32,
}

#[derive(Debug)]
struct SearchParser {
    depth_re: Regex,
    cp_re: Regex,
    mate_re: Regex,
    bestmove_re: Regex,
}

impl SearchParser {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            depth_re: Regex::new(r"\bdepth (\d+)")?,
            cp_re: Regex::new(r"score cp (-?\d+)")?,
            mate_re: Regex::new(r"score mate (-?\d+)")?,
            bestmove_re: Regex::new(r"^bestmove ([a-h][1-8][a-h][1-8][qrbn]?)")?,
        })
    }

    /// Feeds one output line into the search. Returns `Some(best_move)`
    /// when the terminal bestmove line arrives; the engine streams
    /// progressively deeper results, so the latest score token and the
    /// deepest depth token win.
    fn feed(&self, state: &mut SearchState, line: &str) -> Option<Option<String>> {
        if let Some(cap) = self.depth_re.captures(line) {
            if let Ok(depth) = cap[1].parse::<u32>() {
                state.depth = state.depth.max(depth);
            }
        }

        if let Some(cap) = self.cp_re.captures(line) {
            if let Ok(cp) = cap[1].parse::<i32>() {
                state.evaluation = cp;
            }
        }

        if let Some(cap) = self.mate_re.captures(line) {
            if let Ok(mate_in) = cap[1].parse::<i32>() {
                state.evaluation = if mate_in > 0 { MATE_SCORE } else { -MATE_SCORE };
            }
        }

        if line.starts_with("bestmove") {
            return Some(self.bestmove_re.captures(line).map(|cap| cap[1].to_string()));
        }

        None
    }
}
