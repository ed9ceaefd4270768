use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AdapterError, ErrorReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Rest,
    Graphql,
}

/// Envelope metadata, stamped once at the orchestrator boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetadata {
    pub source_protocol: Protocol,
    pub target_protocol: Protocol,
    pub timestamp_utc: DateTime<Utc>,
    pub invocation_id: Uuid,
}

impl TranslationMetadata {
    pub fn new(source_protocol: Protocol, target_protocol: Protocol, invocation_id: Uuid) -> Self {
        Self {
            source_protocol,
            target_protocol,
            timestamp_utc: Utc::now(),
            invocation_id,
        }
    }
}

/// Uniform result of one adapter invocation.
///
/// Exactly one of `data` and `error` is set, matching `success`. Fields are
/// private so the pairing can only be built through the two constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorReport>,
    metadata: TranslationMetadata,
}

impl TranslationResult {
    pub fn succeeded(data: Value, metadata: TranslationMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata,
        }
    }

    pub fn failed(error: AdapterError, debug: bool, metadata: TranslationMetadata) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorReport::from_error(error, debug)),
            metadata,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&ErrorReport> {
        self.error.as_ref()
    }

    pub fn metadata(&self) -> &TranslationMetadata {
        &self.metadata
    }
}

/// Result of one item inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemOutcome {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    item_label: String,
}

impl BatchItemOutcome {
    pub fn succeeded(item_label: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            item_label: item_label.into(),
        }
    }

    pub fn failed(item_label: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            item_label: item_label.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn item_label(&self) -> &str {
        &self.item_label
    }
}

/// Source side of a GraphQL to REST invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub variables: Option<Value>,
}

impl SourceQuery {
    pub fn new(query: impl Into<String>, variables: Value) -> Self {
        Self {
            query: Some(query.into()),
            variables: Some(variables),
        }
    }
}
