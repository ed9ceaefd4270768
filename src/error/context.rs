use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Correlation context for one adapter invocation.
///
/// Created at the orchestrator boundary and threaded into retry and batch
/// logging so every event of an invocation shares one correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique correlation ID, also reported as the envelope's invocation id
    pub correlation_id: Uuid,
    /// Component where the work is happening
    pub component: String,
    /// Operation being performed
    pub operation: String,
    /// When the context was opened
    pub timestamp: DateTime<Utc>,
    /// Additional context information as key-value pairs
    pub additional_context: HashMap<String, serde_json::Value>,
}

impl ErrorContext {
    /// Create a new error context with a fresh correlation id
    pub fn new(component: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::with_correlation_id(Uuid::new_v4(), component, operation)
    }

    /// Create a new error context with a known correlation ID
    pub fn with_correlation_id(
        correlation_id: Uuid,
        component: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            component: component.into(),
            operation: operation.into(),
            timestamp: Utc::now(),
            additional_context: HashMap::new(),
        }
    }

    /// Add additional context information
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.additional_context.insert(key.into(), value);
        self
    }

    /// Context for a nested step of the same invocation. Keeps the
    /// correlation id so per-item logs group under their invocation.
    pub fn create_child_context(&self, operation: impl Into<String>) -> Self {
        Self {
            correlation_id: self.correlation_id,
            component: self.component.clone(),
            operation: operation.into(),
            timestamp: Utc::now(),
            additional_context: HashMap::new(),
        }
    }

    pub fn format_context(&self) -> String {
        let mut formatted = format!(
            "correlation_id={}, component={}, operation={}, timestamp={}",
            self.correlation_id,
            self.component,
            self.operation,
            self.timestamp.to_rfc3339()
        );

        let mut extra: Vec<_> = self.additional_context.iter().collect();
        extra.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in extra {
            formatted.push_str(&format!(", {}={}", key, value));
        }
        formatted
    }
}
