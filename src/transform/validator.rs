use serde_json::Value;

use super::accessor::get_path;
use crate::error::{AdapterError, Result};

/// Discriminator path of an inbound webhook event
pub const EVENT_TYPE_PATH: &str = "type";
/// The only webhook event the REST to GraphQL adapter accepts
pub const SUPPORTED_EVENT_TYPE: &str = "payment_intent.succeeded";
/// Paths that must be present on a supported webhook event, in check order
pub const WEBHOOK_REQUIRED_PATHS: [&str; 3] = [
    "data.object.amount",
    "data.object.currency",
    "data.object.customer.email",
];

/// Check that every path in `required_paths` is present and non-empty.
///
/// Fails on the first offending path in declaration order. Null, empty
/// strings and empty containers count as missing.
pub fn validate(payload: &Value, required_paths: &[&str]) -> Result<()> {
    for path in required_paths {
        match get_path(payload, path) {
            Some(value) if !is_empty(value) => {}
            _ => return Err(AdapterError::validation(*path, "is required")),
        }
    }
    Ok(())
}

/// Validate an inbound webhook event before it is translated.
pub fn validate_webhook_event(payload: &Value) -> Result<()> {
    match get_path(payload, EVENT_TYPE_PATH) {
        Some(Value::String(event_type)) if event_type == SUPPORTED_EVENT_TYPE => {}
        Some(Value::String(event_type)) if !event_type.is_empty() => {
            return Err(AdapterError::validation(
                EVENT_TYPE_PATH,
                format!(
                    "unsupported event type '{}', expected '{}'",
                    event_type, SUPPORTED_EVENT_TYPE
                ),
            ))
        }
        Some(other) if !is_empty(other) => {
            return Err(AdapterError::validation(EVENT_TYPE_PATH, "must be a string"))
        }
        _ => return Err(AdapterError::validation(EVENT_TYPE_PATH, "is required")),
    }

    validate(payload, &WEBHOOK_REQUIRED_PATHS)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event() -> Value {
        json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {
                "amount": 5000,
                "currency": "usd",
                "customer": {"email": "a@b.com", "name": "John Doe"}
            }}
        })
    }

    fn field_of(result: Result<()>) -> String {
        match result.unwrap_err() {
            AdapterError::ValidationError { field, .. } => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_event_passes() {
        assert!(validate_webhook_event(&event()).is_ok());
    }

    #[test]
    fn test_unknown_event_type_names_discriminator() {
        let mut payload = event();
        payload["type"] = json!("charge.refunded");
        let err = validate_webhook_event(&payload).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(err.to_string().contains("charge.refunded"));
        assert_eq!(field_of(Err(err)), "type");
    }

    #[test]
    fn test_missing_event_type() {
        let mut payload = event();
        payload.as_object_mut().unwrap().remove("type");
        assert_eq!(field_of(validate_webhook_event(&payload)), "type");
    }

    #[test]
    fn test_first_missing_path_in_declaration_order() {
        let payload = json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {"amount": 100}}
        });
        assert_eq!(
            field_of(validate_webhook_event(&payload)),
            "data.object.currency"
        );
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let mut payload = event();
        payload["data"]["object"]["customer"]["email"] = json!("  ");
        assert_eq!(
            field_of(validate_webhook_event(&payload)),
            "data.object.customer.email"
        );
    }

    #[test]
    fn test_zero_amount_is_present() {
        let mut payload = event();
        payload["data"]["object"]["amount"] = json!(0);
        assert!(validate_webhook_event(&payload).is_ok());
    }

    #[test]
    fn test_generic_validate() {
        let payload = json!({"a": {"b": 1}, "c": []});
        assert!(validate(&payload, &["a.b"]).is_ok());
        assert_eq!(field_of(validate(&payload, &["a.b", "c"])), "c");
        assert!(validate(&payload, &[]).is_ok());
    }
}
