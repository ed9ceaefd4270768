//! Protocol bridge - bidirectional REST webhook / GraphQL adapter engine
//!
//! Translates payment webhook events into GraphQL order mutations and
//! syncs GraphQL catalog items out to REST endpoints, with retry, batch
//! pacing and a uniform result envelope.

use std::sync::Arc;

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod infrastructure;
pub mod models;
pub mod routes;
pub mod transform;

// Re-export commonly used types
pub use config::{AdapterConfig, AuthConfig, BatchConfig, RestMethod};
pub use engine::AdapterEngine;
pub use error::{AdapterError, ErrorReport, Result};
pub use models::{BatchItemOutcome, SourceQuery, TranslationResult};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AdapterEngine>,
}

impl AppState {
    pub fn new(engine: AdapterEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
