//! Declarative field mapping between the webhook and GraphQL wire shapes.
//!
//! Each direction has a default rule table (`target <- source` paths plus a
//! normalization). Caller overrides are layered on top: an override for a
//! known target swaps that rule's source path and keeps its normalization,
//! an override for a new target copies the source verbatim.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::accessor::{get_path, set_path};
use crate::error::{AdapterError, Result};

/// Fixed provenance tag stamped on every payload synced out of GraphQL
pub const PROVENANCE_TAG: &str = "graphql-adapter";
/// Where a flattened catalog item keeps its price
pub const ITEM_PRICE_PATH: &str = "variants.0.price";

const DESCRIPTION_TARGET: &str = "description";
const PROVENANCE_TARGET: &str = "metadata.source";
const SYNCED_AT_TARGET: &str = "metadata.synced_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    RestToGraphql,
    GraphqlToRest,
}

/// How a source value is normalized on its way to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Verbatim,
    /// Part of a full name before the first space
    FirstName,
    /// Part of a full name after the first space, `""` when there is none
    LastName,
    /// Integer minor units rendered as a two-decimal string
    MinorUnitsToDecimal,
    UpperCase,
    /// Integer parsed from a number or string, with a fallback
    IntegerOrDefault(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub target: String,
    pub source: String,
    pub normalization: Normalization,
}

impl FieldRule {
    fn new(target: &str, source: &str, normalization: Normalization) -> Self {
        Self {
            target: target.to_string(),
            source: source.to_string(),
            normalization,
        }
    }
}

/// The built-in rule table for `direction`.
pub fn default_rules(direction: Direction) -> Vec<FieldRule> {
    use Normalization::*;
    match direction {
        Direction::RestToGraphql => vec![
            FieldRule::new("email", "data.object.customer.email", Verbatim),
            FieldRule::new("firstName", "data.object.customer.name", FirstName),
            FieldRule::new("lastName", "data.object.customer.name", LastName),
            FieldRule::new("totalPrice", "data.object.amount", MinorUnitsToDecimal),
            FieldRule::new("currency", "data.object.currency", UpperCase),
            FieldRule::new("productId", "data.object.metadata.product_id", Verbatim),
            FieldRule::new("quantity", "data.object.metadata.quantity", IntegerOrDefault(1)),
            FieldRule::new("sourceReference", "data.object.id", Verbatim),
        ],
        Direction::GraphqlToRest => vec![
            FieldRule::new("name", "title", Verbatim),
            FieldRule::new("metadata.source_id", "id", Verbatim),
            FieldRule::new("metadata.title", "title", Verbatim),
            FieldRule::new("metadata.price", ITEM_PRICE_PATH, Verbatim),
        ],
    }
}

/// Default rules with `overrides` (target path -> source path) applied.
pub fn resolve_rules(direction: Direction, overrides: &BTreeMap<String, String>) -> Vec<FieldRule> {
    let mut rules = default_rules(direction);
    for (target, source) in overrides {
        match rules.iter_mut().find(|rule| &rule.target == target) {
            Some(rule) => rule.source = source.clone(),
            None => rules.push(FieldRule::new(target, source, Normalization::Verbatim)),
        }
    }
    rules
}

/// Map `source` into the target shape of `direction`.
pub fn transform(
    source: &Value,
    direction: Direction,
    overrides: &BTreeMap<String, String>,
) -> Result<Value> {
    transform_at(source, direction, overrides, Utc::now())
}

/// [`transform`] with an explicit synchronization timestamp.
pub fn transform_at(
    source: &Value,
    direction: Direction,
    overrides: &BTreeMap<String, String>,
    synced_at: DateTime<Utc>,
) -> Result<Value> {
    let rules = resolve_rules(direction, overrides);
    let mapped = rules
        .iter()
        .try_fold(Value::Object(Map::new()), |target, rule| {
            apply_rule(source, rule).map(|value| set_path(&target, &rule.target, value))
        })?;

    Ok(match direction {
        Direction::RestToGraphql => mapped,
        Direction::GraphqlToRest => [
            (DESCRIPTION_TARGET, Value::String(describe_item(source))),
            (PROVENANCE_TARGET, Value::String(PROVENANCE_TAG.to_string())),
            (
                SYNCED_AT_TARGET,
                Value::String(synced_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ),
        ]
        .into_iter()
        .filter(|(target, _)| !overrides.contains_key(*target))
        .fold(mapped, |target, (path, value)| set_path(&target, path, value)),
    })
}

fn apply_rule(source: &Value, rule: &FieldRule) -> Result<Value> {
    let raw = get_path(source, &rule.source);
    let text = raw.and_then(Value::as_str);

    Ok(match rule.normalization {
        Normalization::Verbatim => raw.cloned().unwrap_or(Value::Null),
        Normalization::FirstName => Value::String(split_full_name(text.unwrap_or_default()).0),
        Normalization::LastName => Value::String(split_full_name(text.unwrap_or_default()).1),
        Normalization::MinorUnitsToDecimal => {
            let minor = raw.and_then(parse_integer).ok_or_else(|| {
                AdapterError::validation(&rule.source, "must be an integer amount in minor units")
            })?;
            Value::String(format_minor_units(minor))
        }
        Normalization::UpperCase => text
            .map(|s| Value::String(s.to_uppercase()))
            .unwrap_or(Value::Null),
        Normalization::IntegerOrDefault(default) => {
            Value::from(raw.and_then(parse_integer).unwrap_or(default))
        }
    })
}

/// Split on the first space. The remainder, spaces included, is the last
/// name; a single-word name has an empty last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    match full_name.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (full_name.to_string(), String::new()),
    }
}

/// Render integer minor units with exactly two decimals (`5000` -> `"50.00"`).
pub fn format_minor_units(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let magnitude = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

/// Largest magnitude an `f64` holds with every integer below it exact.
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integers that fit `i64` exactly. Floats count only when whole and within
/// ±2^53; anything else, `u64` values above `i64::MAX` included, is `None`.
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT_INTEGER)
            .map(|f| f as i64),
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn describe_item(item: &Value) -> String {
    let title = get_path(item, "title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("untitled item");

    let price = get_path(item, ITEM_PRICE_PATH).and_then(|price| match price {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    match price {
        Some(price) => format!("Imported from catalog: {} at {}", title, price),
        None => format!("Imported from catalog: {}", title),
    }
}
