use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub oracle: OracleConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Search depth per analysis; 15 keeps a single evaluation around 2s.
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(default = "default_hash_mb")]
    pub hash_mb: u32,
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
}

fn default_polling_interval() -> u64 { 30 }
fn default_engine_command() -> String { "stockfish".to_string() }
fn default_depth() -> u32 { 15 }
fn default_threads() -> u32 { 4 }
fn default_hash_mb() -> u32 { 256 }
fn default_ready_timeout() -> u64 { 5 }
fn default_search_timeout() -> u64 { 10 }

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }
}

/// Deployment identity, supplied by the environment (populated by the
/// deployment script). Missing identifiers abort startup before any work
/// begins.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub game_app_id: String,
    pub betting_app_id: String,
    pub service_url: String,
    pub chain_id: String,
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            game_app_id: std::env::var("GAME_APP_ID").context("GAME_APP_ID not set")?,
            betting_app_id: std::env::var("BETTING_APP_ID").context("BETTING_APP_ID not set")?,
            chain_id: std::env::var("ORACLE_CHAIN_ID").context("ORACLE_CHAIN_ID not set")?,
            service_url: std::env::var("LEDGER_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:9001".to_string()),
        })
    }
}
