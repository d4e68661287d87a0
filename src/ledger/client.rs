use super::types::{Game, GameOdds};
use super::{GameLedger, OddsSink};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

const GAME_FIELDS: &str =
    "id white_player black_player status current_fen move_count result created_at";

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// One POST round-trip against a ledger application endpoint.
async fn post_graphql(
    client: &Client,
    endpoint: &str,
    query: &str,
    variables: Value,
) -> Result<Value> {
    let response: GraphQlResponse = client
        .post(endpoint)
        .json(&json!({ "query": query, "variables": variables }))
        .send()
        .await
        .context("ledger request failed")?
        .json()
        .await
        .context("ledger response was not valid JSON")?;

    if let Some(errors) = response.errors {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        bail!("ledger rejected request: {}", messages.join("; "));
    }

    response.data.context("ledger response carried no data")
}

fn application_endpoint(service_url: &str, chain_id: &str, application_id: &str) -> String {
    format!(
        "{}/chains/{}/applications/{}",
        service_url.trim_end_matches('/'),
        chain_id,
        application_id
    )
}

/// Query client for the game application.
pub struct LedgerClient {
    client: Client,
    endpoint: String,
}

impl LedgerClient {
    pub fn new(service_url: &str, chain_id: &str, game_application_id: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: application_endpoint(service_url, chain_id, game_application_id),
        }
    }
}

#[async_trait]
impl GameLedger for LedgerClient {
    async fn fetch_all_games(&self) -> Result<Vec<Game>> {
        let query = format!("query GetActiveGames {{ activeGames {{ {GAME_FIELDS} }} }}");
        let data = post_graphql(&self.client, &self.endpoint, &query, json!({})).await?;

        serde_json::from_value(data["activeGames"].clone())
            .context("malformed activeGames payload")
    }

    async fn fetch_game(&self, game_id: &str) -> Result<Option<Game>> {
        let query =
            format!("query GetGame($gameId: String!) {{ game(gameId: $gameId) {{ {GAME_FIELDS} }} }}");
        let data = post_graphql(
            &self.client,
            &self.endpoint,
            &query,
            json!({ "gameId": game_id }),
        )
        .await?;

        if data["game"].is_null() {
            return Ok(None);
        }

        serde_json::from_value(data["game"].clone())
            .map(Some)
            .context("malformed game payload")
    }
}

/// Mutation client for the betting application. The ledger recomputes and
/// stores odds from the centipawn evaluation alone; the full triple stays
/// local for logging.
pub struct OddsUpdater {
    client: Client,
    endpoint: String,
}

impl OddsUpdater {
    pub fn new(service_url: &str, chain_id: &str, betting_application_id: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: application_endpoint(service_url, chain_id, betting_application_id),
        }
    }
}

#[async_trait]
impl OddsSink for OddsUpdater {
    async fn update_odds(&self, game_id: &str, odds: &GameOdds) -> Result<bool> {
        const MUTATION: &str = "mutation UpdateOdds($gameId: String!, $evaluation: Int!) { updateOdds(gameId: $gameId, evaluation: $evaluation) }";

        let data = post_graphql(
            &self.client,
            &self.endpoint,
            MUTATION,
            json!({ "gameId": game_id, "evaluation": odds.evaluation }),
        )
        .await?;

        let accepted = data["updateOdds"].as_bool().unwrap_or(true);
        if accepted {
            info!(
                "odds updated for game {}: evaluation {} cp",
                game_id, odds.evaluation
            );
        }

        Ok(accepted)
    }
}
