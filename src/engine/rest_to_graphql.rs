use serde_json::{json, Value};
use tracing::{debug, info, info_span, warn, Instrument};

use super::AdapterEngine;
use crate::config::AdapterConfig;
use crate::error::context::ErrorContext;
use crate::error::Result;
use crate::infrastructure::{parse_endpoint, validate_auth, GraphqlClient};
use crate::models::{Protocol, TranslationMetadata, TranslationResult};
use crate::transform::{transform, validate_webhook_event, Direction, MutationBuilder};

pub(super) async fn run(engine: &AdapterEngine, config: &AdapterConfig, payload: &Value) -> TranslationResult {
    let context = ErrorContext::new("rest_to_graphql", "translate")
        .with_context("target_endpoint", json!(config.target_endpoint));
    let metadata = TranslationMetadata::new(Protocol::Rest, Protocol::Graphql, context.correlation_id);
    let span = info_span!("rest_to_graphql", invocation_id = %context.correlation_id);

    match translate(engine, config, payload, &context).instrument(span).await {
        Ok(data) => {
            info!(invocation_id = %context.correlation_id, "Webhook event translated");
            TranslationResult::succeeded(data, metadata)
        }
        Err(error) => {
            warn!(
                invocation_id = %context.correlation_id,
                error_kind = error.kind(),
                error = %error,
                "Webhook event translation failed"
            );
            TranslationResult::failed(error, config.debug, metadata)
        }
    }
}

async fn translate(
    engine: &AdapterEngine,
    config: &AdapterConfig,
    payload: &Value,
    context: &ErrorContext,
) -> Result<Value> {
    debug!(context = %context.format_context(), "Translating webhook event");
    validate_webhook_event(payload)?;
    let endpoint = parse_endpoint("targetEndpoint", &config.target_endpoint)?;
    validate_auth("targetAuth", &config.target_auth)?;

    let variables = transform(payload, Direction::RestToGraphql, &config.field_mappings)?;
    let operation = MutationBuilder::order_create(&variables)?;
    debug!(variables = %operation.variables, "Order mutation built");

    let client = GraphqlClient::new(engine.http_client(), config.request_timeout());
    let response = engine
        .retry_manager(config)
        .execute_with_retry(
            || client.execute(&endpoint, &operation, &config.target_auth),
            &context.create_child_context("order_create"),
        )
        .await?;

    Ok(json!({
        "variables": operation.variables,
        "response": response,
    }))
}
