//! Entry points for both translation directions.

pub mod graphql_to_rest;
pub mod rest_to_graphql;

use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::config::AdapterConfig;
use crate::core::pacing::{Sleeper, TokioSleeper};
use crate::error::retry::{RetryManager, RetryPolicy};
use crate::error::Result;
use crate::infrastructure::USER_AGENT;
use crate::models::{SourceQuery, TranslationResult};

/// Stateless executor for adapter invocations.
///
/// Holds only collaborators: a pooled HTTP client, the delay source used
/// for backoff and batch pacing, the backoff shape, and optionally a
/// tracing dispatch that receives every log event of an invocation.
/// Nothing from one invocation is kept for the next.
#[derive(Clone)]
pub struct AdapterEngine {
    client: Client,
    sleeper: Arc<dyn Sleeper>,
    retry_policy: RetryPolicy,
    dispatch: Option<Dispatch>,
}

impl AdapterEngine {
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> AdapterEngineBuilder {
        AdapterEngineBuilder::default()
    }

    /// Translate one inbound webhook event into the order mutation.
    pub async fn rest_to_graphql(&self, config: &AdapterConfig, payload: &Value) -> TranslationResult {
        self.scoped(rest_to_graphql::run(self, config, payload)).await
    }

    /// Pull items from the GraphQL source and push each to the REST target.
    pub async fn graphql_to_rest(&self, config: &AdapterConfig, source: &SourceQuery) -> TranslationResult {
        self.scoped(graphql_to_rest::run(self, config, source, None)).await
    }

    /// [`graphql_to_rest`](Self::graphql_to_rest) whose batch run stops
    /// starting new groups once `token` is cancelled.
    pub async fn graphql_to_rest_cancellable(
        &self,
        config: &AdapterConfig,
        source: &SourceQuery,
        token: CancellationToken,
    ) -> TranslationResult {
        self.scoped(graphql_to_rest::run(self, config, source, Some(token)))
            .await
    }

    /// Retry manager for one invocation, honoring its attempt budget.
    pub fn retry_manager(&self, config: &AdapterConfig) -> RetryManager {
        RetryManager::with_sleeper(
            self.retry_policy.clone().with_max_attempts(config.max_attempts),
            self.sleeper.clone(),
        )
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    pub fn sleeper(&self) -> Arc<dyn Sleeper> {
        self.sleeper.clone()
    }

    async fn scoped<F: Future>(&self, future: F) -> F::Output {
        match &self.dispatch {
            Some(dispatch) => future.with_subscriber(dispatch.clone()).await,
            None => future.await,
        }
    }
}

#[derive(Default)]
pub struct AdapterEngineBuilder {
    client: Option<Client>,
    sleeper: Option<Arc<dyn Sleeper>>,
    retry_policy: Option<RetryPolicy>,
    dispatch: Option<Dispatch>,
}

impl AdapterEngineBuilder {
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Backoff shape; the attempt count still comes from each config.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Route engine logs to `dispatch` instead of the global subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn build(self) -> Result<AdapterEngine> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().user_agent(USER_AGENT).build()?,
        };

        Ok(AdapterEngine {
            client,
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper)),
            retry_policy: self.retry_policy.unwrap_or_default(),
            dispatch: self.dispatch,
        })
    }
}
