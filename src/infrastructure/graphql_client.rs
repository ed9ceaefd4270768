use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{apply_extra_headers, rate_limit_error, USER_AGENT};
use crate::config::AuthConfig;
use crate::error::{AdapterError, RemoteErrorDetail, Result};
use crate::transform::GraphqlOperation;

/// Vendor access-token header of the GraphQL remote
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

pub struct GraphqlClient<'a> {
    client: &'a Client,
    timeout: Duration,
}

impl<'a> GraphqlClient<'a> {
    pub fn new(client: &'a Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// POST `operation` and return the `data` member of the response.
    pub async fn execute(
        &self,
        endpoint: &Url,
        operation: &GraphqlOperation,
        auth: &AuthConfig,
    ) -> Result<Value> {
        let request = self
            .client
            .post(endpoint.clone())
            .timeout(self.timeout)
            .header(ACCESS_TOKEN_HEADER, auth.token.as_str())
            .header("User-Agent", USER_AGENT)
            .json(operation);

        let response = apply_extra_headers(request, auth).send().await?;
        let status = response.status();
        debug!(endpoint = %endpoint, status = status.as_u16(), "GraphQL response received");

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limit_error(response.headers()));
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(AdapterError::transport(
                Some(status.as_u16()),
                Some(text),
                format!("GraphQL endpoint returned HTTP {}", status.as_u16()),
            ));
        }

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            AdapterError::transport(
                Some(status.as_u16()),
                Some(text.clone()),
                format!("GraphQL response is not JSON: {}", e),
            )
        })?;

        interpret_response(body)
    }
}

/// Separate a GraphQL response body into its data or a protocol error.
///
/// Top-level `errors` and any mutation payload `userErrors` are failures
/// even when the transport succeeded.
pub fn interpret_response(mut body: Value) -> Result<Value> {
    let errors = remote_errors(body.get("errors"));
    if !errors.is_empty() {
        return Err(AdapterError::remote_protocol(errors));
    }

    let data = body.get_mut("data").map(Value::take).unwrap_or(Value::Null);
    if data.is_null() {
        return Err(AdapterError::remote_protocol(vec![RemoteErrorDetail::new(
            "response contained no data",
            None,
        )]));
    }

    if let Some(fields) = data.as_object() {
        let user_errors: Vec<RemoteErrorDetail> = fields
            .values()
            .flat_map(|payload| remote_errors(payload.get("userErrors")))
            .collect();
        if !user_errors.is_empty() {
            return Err(AdapterError::remote_protocol(user_errors));
        }
    }

    Ok(data)
}

fn remote_errors(list: Option<&Value>) -> Vec<RemoteErrorDetail> {
    list.and_then(Value::as_array)
        .map(|entries| entries.iter().map(remote_error).collect())
        .unwrap_or_default()
}

fn remote_error(entry: &Value) -> RemoteErrorDetail {
    let message = entry
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| entry.to_string());
    // `path` on GraphQL errors, `field` on userErrors
    let path = entry
        .get("path")
        .or_else(|| entry.get("field"))
        .and_then(join_path);
    RemoteErrorDetail::new(message, path)
}

fn join_path(segments: &Value) -> Option<String> {
    match segments {
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|s| match s {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("."),
        ),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
