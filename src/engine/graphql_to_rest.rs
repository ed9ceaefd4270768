use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use super::AdapterEngine;
use crate::config::{AdapterConfig, AuthConfig};
use crate::core::batch::BatchCoordinator;
use crate::error::context::ErrorContext;
use crate::error::retry::RetryManager;
use crate::error::{AdapterError, Result};
use crate::infrastructure::{parse_endpoint, validate_auth, GraphqlClient, RestClient};
use crate::models::{Protocol, SourceQuery, TranslationMetadata, TranslationResult};
use crate::transform::{flatten_connection, get_path, transform, Direction, GraphqlOperation};

pub(super) async fn run(
    engine: &AdapterEngine,
    config: &AdapterConfig,
    source: &SourceQuery,
    cancel: Option<CancellationToken>,
) -> TranslationResult {
    let context = ErrorContext::new("graphql_to_rest", "sync")
        .with_context("target_endpoint", json!(config.target_endpoint))
        .with_context("batch", json!(config.batch.enabled));
    let metadata = TranslationMetadata::new(Protocol::Graphql, Protocol::Rest, context.correlation_id);
    let span = info_span!("graphql_to_rest", invocation_id = %context.correlation_id);

    match sync(engine, config, source, cancel, &context).instrument(span).await {
        Ok(data) => {
            info!(invocation_id = %context.correlation_id, "Catalog sync finished");
            TranslationResult::succeeded(data, metadata)
        }
        Err(error) => {
            warn!(
                invocation_id = %context.correlation_id,
                error_kind = error.kind(),
                error = %error,
                "Catalog sync failed"
            );
            TranslationResult::failed(error, config.debug, metadata)
        }
    }
}

/// Label of a flattened item in batch outcomes: its id, else its title,
/// else its position.
pub fn item_label(index: usize, item: &Value) -> String {
    ["id", "title"]
        .iter()
        .find_map(|path| match get_path(item, path) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| format!("item-{}", index))
}

async fn sync(
    engine: &AdapterEngine,
    config: &AdapterConfig,
    source: &SourceQuery,
    cancel: Option<CancellationToken>,
    context: &ErrorContext,
) -> Result<Value> {
    debug!(context = %context.format_context(), "Starting catalog sync");
    let source_endpoint = config
        .source_endpoint
        .as_deref()
        .filter(|endpoint| !endpoint.trim().is_empty())
        .ok_or_else(|| AdapterError::validation("sourceEndpoint", "is required for GraphQL to REST"))?;
    let source_url = parse_endpoint("sourceEndpoint", source_endpoint)?;
    let target_url = parse_endpoint("targetEndpoint", &config.target_endpoint)?;
    let source_auth = config.source_auth.clone().unwrap_or_default();
    validate_auth("sourceAuth", &source_auth)?;
    validate_auth("targetAuth", &config.target_auth)?;

    let operation = GraphqlOperation::source_query(source.query.as_deref(), source.variables.as_ref());
    let retry = engine.retry_manager(config);
    let graphql = GraphqlClient::new(engine.http_client(), config.request_timeout());

    let raw = retry
        .execute_with_retry(
            || graphql.execute(&source_url, &operation, &source_auth),
            &context.create_child_context("fetch_source"),
        )
        .await?;

    let items = flatten_connection(&raw);
    info!(items = items.len(), batch = config.batch.enabled, "Source items flattened");

    let target = Target {
        retry: &retry,
        rest: RestClient::new(engine.http_client(), config.request_timeout()),
        url: &target_url,
        config,
        context,
    };

    if config.batch.enabled && !items.is_empty() {
        let mut coordinator = BatchCoordinator::new(
            config.batch.size,
            config.inter_batch_delay(),
            engine.sleeper(),
        );
        if let Some(token) = cancel {
            coordinator = coordinator.with_cancellation(token);
        }

        let target = &target;
        let outcomes = coordinator
            .run(&items, item_label, move |item| {
                let body = transform(item, Direction::GraphqlToRest, &config.field_mappings);
                async move { target.deliver(body?).await }
            })
            .await;

        let succeeded = outcomes.iter().filter(|outcome| outcome.success()).count();
        return Ok(json!({
            "items": outcomes,
            "total": outcomes.len(),
            "succeeded": succeeded,
            "failed": outcomes.len() - succeeded,
        }));
    }

    let mut responses = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        debug!(item_label = %item_label(index, item), "Delivering item");
        let body = transform(item, Direction::GraphqlToRest, &config.field_mappings)?;
        responses.push(target.deliver(body).await?);
    }

    Ok(match responses.len() {
        1 => responses.remove(0),
        _ => Value::Array(responses),
    })
}

/// REST side of one sync, shared read-only by every item.
struct Target<'a> {
    retry: &'a RetryManager,
    rest: RestClient<'a>,
    url: &'a Url,
    config: &'a AdapterConfig,
    context: &'a ErrorContext,
}

impl Target<'_> {
    async fn deliver(&self, body: Value) -> Result<Value> {
        let auth: &AuthConfig = &self.config.target_auth;
        self.retry
            .execute_with_retry(
                || self.rest.execute(self.url, self.config.rest_method, &body, auth),
                &self.context.create_child_context("deliver_item"),
            )
            .await
    }
}
