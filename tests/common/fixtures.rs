use protocol_bridge::{
    core::pacing::RecordingSleeper, error::retry::RetryPolicy, AdapterConfig, AdapterEngine,
    AuthConfig, BatchConfig,
};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

pub const SHOP_TOKEN: &str = "shpat_test_token";
pub const REST_TOKEN: &str = "sk_test_token";

/// The canonical payment webhook event.
pub fn payment_event() -> Value {
    json!({
        "type": "payment_intent.succeeded",
        "data": {"object": {
            "id": "pi_1",
            "amount": 5000,
            "currency": "usd",
            "customer": {"email": "a@b.com", "name": "John Doe"},
            "metadata": {"product_id": "X", "quantity": "2"}
        }}
    })
}

pub fn order_created() -> Value {
    json!({"data": {"orderCreate": {"order": {"id": "1"}, "userErrors": []}}})
}

/// Two-product connection response of the catalog query.
pub fn products_response() -> Value {
    json!({"data": {"products": {"edges": [
        {"node": {
            "id": "gid://shop/Product/1",
            "title": "Shirt",
            "variants": {"edges": [{"node": {"price": "19.99"}}]}
        }},
        {"node": {
            "id": "gid://shop/Product/2",
            "title": "Hat",
            "variants": {"edges": [{"node": {"price": "5.00"}}]}
        }}
    ]}}})
}

pub fn single_product_response() -> Value {
    json!({"data": {"products": {"edges": [
        {"node": {
            "id": "gid://shop/Product/1",
            "title": "Shirt",
            "variants": {"edges": [{"node": {"price": "19.99"}}]}
        }}
    ]}}})
}

/// Engine whose delays are recorded instead of slept, without jitter.
pub fn test_engine() -> (AdapterEngine, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let engine = AdapterEngine::builder()
        .with_http_client(reqwest::Client::builder().no_proxy().build().unwrap())
        .with_sleeper(Arc::new(sleeper.clone()))
        .with_retry_policy(RetryPolicy {
            jitter_ms: 0,
            ..RetryPolicy::default()
        })
        .build()
        .unwrap();
    (engine, sleeper)
}

pub fn order_config(graphql_url: String) -> AdapterConfig {
    AdapterConfig::new(graphql_url, AuthConfig::new(SHOP_TOKEN))
}

pub fn sync_config(source_url: String, target_url: String) -> AdapterConfig {
    AdapterConfig::new(target_url, AuthConfig::new(REST_TOKEN))
        .with_source(source_url, AuthConfig::new(SHOP_TOKEN))
}

pub fn batch(size: usize, inter_batch_delay_ms: u64) -> BatchConfig {
    BatchConfig {
        enabled: true,
        size,
        inter_batch_delay_ms,
    }
}

/// In-memory log sink for an engine dispatch.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
