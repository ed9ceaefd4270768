use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{apply_extra_headers, body_to_value, rate_limit_error, USER_AGENT};
use crate::config::{AuthConfig, RestMethod};
use crate::error::{AdapterError, Result};

pub struct RestClient<'a> {
    client: &'a Client,
    timeout: Duration,
}

impl<'a> RestClient<'a> {
    pub fn new(client: &'a Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Send `body` to `endpoint` with `method`.
    ///
    /// Reads carry the flattened body in the query string, everything else
    /// sends it form-encoded.
    pub async fn execute(
        &self,
        endpoint: &Url,
        method: RestMethod,
        body: &Value,
        auth: &AuthConfig,
    ) -> Result<Value> {
        let pairs = flatten_form_pairs(body);

        let request = if method.is_read() {
            let mut url = endpoint.clone();
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs.iter());
            }
            self.client.request(method.as_reqwest(), url)
        } else {
            self.client
                .request(method.as_reqwest(), endpoint.clone())
                .form(&pairs)
        };

        let request = request
            .timeout(self.timeout)
            .bearer_auth(&auth.token)
            .header("User-Agent", USER_AGENT);

        let response = apply_extra_headers(request, auth).send().await?;
        let status = response.status();
        debug!(
            endpoint = %endpoint,
            method = ?method,
            status = status.as_u16(),
            fields = pairs.len(),
            "REST response received"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limit_error(response.headers()));
        }

        let text = response.text().await?;
        if !status.is_success() {
            return Err(AdapterError::transport(
                Some(status.as_u16()),
                Some(text),
                format!("REST endpoint returned HTTP {}", status.as_u16()),
            ));
        }

        Ok(body_to_value(&text))
    }
}

/// Flatten a JSON value into bracket-notation key/value pairs.
///
/// `{"metadata": {"id": 1}, "tags": ["a"]}` becomes `metadata[id]=1` and
/// `tags[0]=a`. Nulls are skipped.
pub fn flatten_form_pairs(body: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match body {
        Value::Object(fields) => {
            for (key, value) in fields {
                push_pairs(key.clone(), value, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                push_pairs(index.to_string(), value, &mut pairs);
            }
        }
        _ => {}
    }
    pairs
}

fn push_pairs(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (child, value) in fields {
                push_pairs(format!("{}[{}]", key, child), value, pairs);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                push_pairs(format!("{}[{}]", key, index), value, pairs);
            }
        }
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Bool(_) | Value::Number(_) => pairs.push((key, value.to_string())),
    }
}
