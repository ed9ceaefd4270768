use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    config::{AdapterConfig, BatchConfig},
    models::{SourceQuery, TranslationResult},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct RestToGraphqlRequest {
    pub config: AdapterConfig,
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlToRestRequest {
    pub config: AdapterConfig,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
    /// Replaces `config.batch` when present
    #[serde(default)]
    pub batch: Option<BatchConfig>,
}

impl GraphqlToRestRequest {
    fn into_parts(self) -> (AdapterConfig, SourceQuery) {
        let mut config = self.config;
        if let Some(batch) = self.batch {
            config.batch = batch;
        }
        let source = SourceQuery {
            query: self.query,
            variables: self.variables,
        };
        (config, source)
    }
}

fn respond(result: TranslationResult) -> (StatusCode, Json<TranslationResult>) {
    let status = match result.error() {
        None => StatusCode::OK,
        Some(report) => report.error.http_status(),
    };
    (status, Json(result))
}

/// Translate an inbound webhook event into the GraphQL order mutation
pub async fn rest_to_graphql_handler(
    State(state): State<AppState>,
    Json(request): Json<RestToGraphqlRequest>,
) -> (StatusCode, Json<TranslationResult>) {
    info!(target_endpoint = %request.config.target_endpoint, "REST to GraphQL request received");
    let result = state.engine.rest_to_graphql(&request.config, &request.payload).await;
    respond(result)
}

/// Sync catalog items from the GraphQL source to the REST target
pub async fn graphql_to_rest_handler(
    State(state): State<AppState>,
    Json(request): Json<GraphqlToRestRequest>,
) -> (StatusCode, Json<TranslationResult>) {
    let (config, source) = request.into_parts();
    info!(
        target_endpoint = %config.target_endpoint,
        batch = config.batch.enabled,
        "GraphQL to REST request received"
    );
    let result = state.engine.graphql_to_rest(&config, &source).await;
    respond(result)
}

pub async fn health_checker_handler() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "Protocol bridge is running",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
